/// Event bus module - broken down into manageable components
mod core;
mod dispatch;
mod management;
mod registration;
mod stats;
mod tests;

pub use core::EventBus;
pub use stats::BusStats;
