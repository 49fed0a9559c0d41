use tracing::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = lib_ember_bench::init().await {
        error!("❌ Benchmark failed: {e:#}");
        return Err(e);
    }
    Ok(())
}
