//! Tests for registration, dispatch and lifecycle of the event bus

#[cfg(test)]
mod tests {
    use crate::config::BusSettings;
    use crate::scheduler::{pending_microtasks, run_microtasks, TokioScheduler};
    use crate::{EventBus, Handler};
    use serde_json::{json, Value};
    use std::panic::AssertUnwindSafe;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    type Calls = Arc<Mutex<Vec<Vec<Value>>>>;

    /// Handler that records the arguments of every call.
    fn recorder() -> (Handler, Calls) {
        let calls: Calls = Arc::new(Mutex::new(Vec::new()));
        let sink = calls.clone();
        let handler = Handler::new(move |args: &[Value]| sink.lock().unwrap().push(args.to_vec()));
        (handler, calls)
    }

    fn counter() -> (Handler, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        let handler = Handler::new(move |_: &[Value]| {
            hits.fetch_add(1, Ordering::Relaxed);
        });
        (handler, count)
    }

    /// Handler that appends `tag` to a shared log.
    fn tagged(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> Handler {
        let log = log.clone();
        Handler::new(move |_: &[Value]| log.lock().unwrap().push(tag))
    }

    #[test]
    fn test_register_and_emit() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("testEvent", handler);

        bus.emit("testEvent", &[json!("Luke")]);

        assert_eq!(*calls.lock().unwrap(), vec![vec![json!("Luke")]]);
    }

    #[test]
    fn test_emit_passes_every_argument() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("move", handler);

        bus.emit("move", &[json!(1), json!({"x": 2}), Value::Null]);
        bus.emit("move", &[]);

        let calls = calls.lock().unwrap();
        assert_eq!(calls[0], vec![json!(1), json!({"x": 2}), Value::Null]);
        assert!(calls[1].is_empty());
    }

    #[test]
    fn test_emit_without_handlers_is_noop() {
        let bus = EventBus::new();
        bus.emit("nobody", &[json!(1)]);
        bus.emit_async("nobody", &[json!(1)]);
        assert_eq!(pending_microtasks(), 0);
        assert_eq!(bus.stats().immediate_emits, 0);
    }

    #[test]
    fn test_event_names_are_exact_and_case_sensitive() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        bus.on("Ready", handler);

        bus.emit("ready", &[]);
        bus.emit("Ready ", &[]);
        bus.emit("Ready", &[]);

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_emit_one_million_times() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        bus.on("testEvent", handler);

        for _ in 0..1_000_000 {
            bus.emit("testEvent", &[]);
        }

        assert_eq!(count.load(Ordering::Relaxed), 1_000_000);
    }

    #[test]
    fn test_one_million_registrations_delivered_in_order_before_emit_returns() {
        let bus = EventBus::new();
        let next = Arc::new(AtomicUsize::new(0));
        let in_order = Arc::new(AtomicUsize::new(0));

        for expected in 0..1_000_000usize {
            let next = next.clone();
            let in_order = in_order.clone();
            bus.on(
                "e",
                Handler::new(move |_: &[Value]| {
                    if next.fetch_add(1, Ordering::Relaxed) == expected {
                        in_order.fetch_add(1, Ordering::Relaxed);
                    }
                }),
            );
        }
        assert_eq!(bus.listener_count("e"), 1_000_000);

        bus.emit("e", &[]);

        assert_eq!(next.load(Ordering::Relaxed), 1_000_000);
        assert_eq!(in_order.load(Ordering::Relaxed), 1_000_000);
    }

    #[test]
    fn test_same_handler_registered_twice_runs_twice() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        bus.on("tick", handler.clone());
        bus.on("tick", handler);

        bus.emit("tick", &[]);

        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_remove_an_event_listener() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("testEvent", handler.clone());
        bus.off("testEvent", Some(&handler));

        bus.emit("testEvent", &[json!("Skywalker")]);

        assert!(calls.lock().unwrap().is_empty());
        assert!(!bus.has_listeners("testEvent"));
    }

    #[test]
    fn test_off_is_silent_for_unknown_handlers_and_events() {
        let bus = EventBus::new();
        let (registered, count) = counter();
        let (stranger, _) = counter();
        bus.on("a", registered);

        bus.off("a", Some(&stranger));
        bus.off("missing", Some(&stranger));
        bus.off("missing", None);

        bus.emit("a", &[]);
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_off_without_handler_drops_the_entry() {
        let bus = EventBus::new();
        let (first, first_count) = counter();
        let (second, second_count) = counter();
        bus.on("a", first);
        bus.on("a", second);

        bus.off("a", None);
        bus.emit("a", &[]);

        assert_eq!(first_count.load(Ordering::Relaxed), 0);
        assert_eq!(second_count.load(Ordering::Relaxed), 0);
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_on_off_sequence_matches_insertion_order_model() {
        let bus = EventBus::new();
        let handlers: Vec<Handler> = (0..4).map(|_| counter().0).collect();
        let mut model: Vec<Handler> = Vec::new();

        // (index, add?) pairs covering promotion, duplicates and demotion
        let steps = [
            (0, true),
            (1, true),
            (0, true),
            (2, true),
            (0, false),
            (3, true),
            (1, true),
            (2, false),
            (1, false),
            (3, false),
        ];

        for (index, add) in steps {
            let handler = &handlers[index];
            if add {
                bus.on("e", handler.clone());
                model.push(handler.clone());
            } else {
                bus.off("e", Some(handler));
                model.retain(|h| h != handler);
            }
            assert_eq!(bus.listeners("e"), model);
            assert_eq!(bus.has_listeners("e"), !model.is_empty());
        }
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_once_fires_a_single_time_with_first_arguments() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.once("testEvent", handler);

        bus.emit("testEvent", &[json!("Im your father")]);
        bus.emit("testEvent", &[json!("Noooo")]);

        assert_eq!(*calls.lock().unwrap(), vec![vec![json!("Im your father")]]);
        assert!(!bus.has_listeners("testEvent"));
    }

    #[test]
    fn test_once_is_removed_before_handler_runs() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let hits = count.clone();
        let reentrant = bus.clone();

        bus.once(
            "ping",
            Handler::new(move |_: &[Value]| {
                hits.fetch_add(1, Ordering::Relaxed);
                assert!(!reentrant.has_listeners("ping"));
                reentrant.emit("ping", &[]);
            }),
        );
        bus.emit("ping", &[]);

        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_once_called_repeatedly_registers_independent_wrappers() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        let first = bus.once("e", handler.clone());
        let second = bus.once("e", handler.clone());
        bus.once("e", handler);

        assert_ne!(first, second);
        assert_eq!(bus.listener_count("e"), 3);

        bus.emit("e", &[]);
        bus.emit("e", &[]);

        assert_eq!(count.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_once_can_be_cancelled_with_returned_handle() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        let wrapper = bus.once("e", handler.clone());

        // The original handle is not what the bus stores
        bus.off("e", Some(&handler));
        assert_eq!(bus.listener_count("e"), 1);

        bus.off("e", Some(&wrapper));
        bus.emit("e", &[]);
        assert_eq!(count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_once_fires_once_across_pending_deferred_batches() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.once("e", handler);

        bus.emit_async("e", &[json!(1)]);
        bus.emit_async("e", &[json!(2)]);
        run_microtasks();

        assert_eq!(*calls.lock().unwrap(), vec![vec![json!(1)]]);
    }

    #[test]
    fn test_remove_all_listeners() {
        let bus = EventBus::new();
        let (first, first_count) = counter();
        let (second, second_count) = counter();
        bus.on("event1", first);
        bus.on("event2", second);

        bus.remove_all_listeners(None);
        bus.emit("event1", &[]);
        bus.emit("event2", &[]);

        assert_eq!(first_count.load(Ordering::Relaxed), 0);
        assert_eq!(second_count.load(Ordering::Relaxed), 0);
        assert!(bus.event_names().is_empty());
    }

    #[test]
    fn test_remove_all_listeners_for_one_event() {
        let bus = EventBus::new();
        let (mock_a, a_count) = counter();
        let (mock_b, b_count) = counter();
        bus.on("event1", mock_a);
        bus.on("event2", mock_b);

        bus.remove_all_listeners(Some("event1"));
        bus.emit("event1", &[]);
        bus.emit("event2", &[]);

        assert_eq!(a_count.load(Ordering::Relaxed), 0);
        assert_eq!(b_count.load(Ordering::Relaxed), 1);
        assert_eq!(bus.event_names(), vec!["event2".to_string()]);
    }

    #[test]
    fn test_handler_removed_during_emit_still_receives_current_emission() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let late = tagged(&log, "late");
        let remover = {
            let bus = bus.clone();
            let late = late.clone();
            let log = log.clone();
            Handler::new(move |_: &[Value]| {
                log.lock().unwrap().push("remover");
                bus.off("e", Some(&late));
            })
        };
        bus.on("e", remover);
        bus.on("e", late);

        bus.emit("e", &[]);
        bus.emit("e", &[]);

        assert_eq!(*log.lock().unwrap(), vec!["remover", "late", "remover"]);
    }

    #[test]
    fn test_handler_added_during_emit_waits_for_next_emission() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let added = tagged(&log, "added");
        let adder = {
            let bus = bus.clone();
            let log = log.clone();
            Handler::new(move |_: &[Value]| {
                log.lock().unwrap().push("adder");
                bus.on("e", added.clone());
            })
        };
        bus.once("e", adder);

        bus.emit("e", &[]);
        assert_eq!(*log.lock().unwrap(), vec!["adder"]);

        bus.emit("e", &[]);
        assert_eq!(*log.lock().unwrap(), vec!["adder", "added"]);
    }

    #[test]
    fn test_emit_is_synchronous() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("event1", handler);

        bus.emit_sync("event1", &[json!("synchronous")]);

        assert_eq!(*calls.lock().unwrap(), vec![vec![json!("synchronous")]]);
        assert_eq!(pending_microtasks(), 0);
    }

    #[test]
    fn test_emit_async_runs_after_current_work() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("asyncEvent", handler);

        bus.emit_async("asyncEvent", &[json!("Hello")]);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(pending_microtasks(), 1);

        assert_eq!(run_microtasks(), 1);
        assert_eq!(*calls.lock().unwrap(), vec![vec![json!("Hello")]]);
    }

    #[test]
    fn test_deferred_snapshot_ignores_removal_after_scheduling() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("x", handler.clone());

        bus.emit_async("x", &[json!("scheduled")]);
        bus.off("x", Some(&handler));
        run_microtasks();

        assert_eq!(*calls.lock().unwrap(), vec![vec![json!("scheduled")]]);
    }

    #[test]
    fn test_deferred_snapshot_ignores_addition_after_scheduling() {
        let bus = EventBus::new();
        let (first, first_count) = counter();
        let (late, late_count) = counter();
        bus.on("x", first);

        bus.emit_async("x", &[]);
        bus.on("x", late);
        run_microtasks();

        assert_eq!(first_count.load(Ordering::Relaxed), 1);
        assert_eq!(late_count.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_deferred_batches_run_in_schedule_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = tagged(&log, "a");
        let b = tagged(&log, "b");
        bus.on("x", a.clone());
        bus.on("y", b);

        bus.emit_async("x", &[]);
        bus.emit_async("y", &[]);
        bus.off("x", Some(&a));
        bus.emit_async("x", &[]);
        bus.emit_async("y", &[]);

        assert_eq!(pending_microtasks(), 3);
        run_microtasks();
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "b"]);
    }

    #[test]
    fn test_deferred_default_mode() {
        let bus = EventBus::deferred();
        let (handler, count) = counter();
        bus.on("e", handler);

        bus.emit("e", &[]);
        assert_eq!(count.load(Ordering::Relaxed), 0);

        bus.emit_sync("e", &[]);
        assert_eq!(count.load(Ordering::Relaxed), 1);

        run_microtasks();
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_destroy_emit_sync_does_not_panic() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("asyncEvent", handler);

        bus.destroy();
        bus.emit("asyncEvent", &[json!("Oh look at me, look at me")]);

        assert!(calls.lock().unwrap().is_empty());
        assert!(bus.is_destroyed());
    }

    #[test]
    fn test_destroy_emit_async_does_not_panic() {
        let bus = EventBus::new();
        let (handler, calls) = recorder();
        bus.on("asyncEvent", handler);

        bus.destroy();
        bus.emit_async("asyncEvent", &[json!("Imma event!")]);
        run_microtasks();

        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_destroy_suppresses_batches_scheduled_before_it() {
        let bus = EventBus::new();
        let (handler, count) = counter();
        bus.on("e", handler);

        bus.emit_async("e", &[]);
        bus.destroy();
        run_microtasks();

        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(bus.stats().deferred_delivered, 0);
    }

    #[test]
    fn test_registration_after_destroy_is_inert() {
        let bus = EventBus::new();
        bus.destroy();
        let (handler, count) = counter();
        bus.on("e", handler.clone());
        bus.once("e", handler.clone());
        bus.off("e", Some(&handler));
        bus.remove_all_listeners(None);
        bus.destroy();

        bus.emit("e", &[]);
        bus.emit_async("e", &[]);
        run_microtasks();

        assert_eq!(count.load(Ordering::Relaxed), 0);
        assert_eq!(bus.listener_count("e"), 0);
    }

    #[test]
    fn test_panicking_handler_propagates_and_leaves_bus_usable() {
        let bus = EventBus::new();
        let (after, after_count) = counter();
        bus.on("boom", Handler::new(|_: &[Value]| panic!("handler failure")));
        bus.on("boom", after);
        let (other, other_count) = counter();
        bus.on("fine", other);

        let result = std::panic::catch_unwind(AssertUnwindSafe(|| bus.emit("boom", &[])));
        assert!(result.is_err());
        assert_eq!(after_count.load(Ordering::Relaxed), 0);

        bus.emit("fine", &[]);
        assert_eq!(other_count.load(Ordering::Relaxed), 1);
        assert_eq!(bus.listener_count("boom"), 2);
    }

    #[test]
    fn test_panicking_deferred_batch_does_not_block_other_batches() {
        let bus = EventBus::new();
        bus.on("boom", Handler::new(|_: &[Value]| panic!("deferred failure")));
        let (other, other_count) = counter();
        bus.on("fine", other);

        bus.emit_async("boom", &[]);
        bus.emit_async("fine", &[]);

        assert!(std::panic::catch_unwind(run_microtasks).is_err());
        run_microtasks();

        assert_eq!(other_count.load(Ordering::Relaxed), 1);
        assert!(bus.has_listeners("boom"));
    }

    #[test]
    fn test_stats_track_activity() {
        let bus = EventBus::new();
        let (handler, _) = counter();
        bus.on("a", handler.clone());
        bus.on("a", handler.clone());
        bus.on("b", handler.clone());

        bus.emit("a", &[]);
        bus.emit("missing", &[]);
        bus.emit_async("b", &[]);
        run_microtasks();
        bus.off("a", Some(&handler));
        bus.destroy();

        let stats = bus.stats();
        assert_eq!(stats.handlers_registered, 3);
        assert_eq!(stats.immediate_emits, 1);
        assert_eq!(stats.deferred_scheduled, 1);
        assert_eq!(stats.deferred_delivered, 1);
        assert_eq!(stats.handlers_removed, 3);
    }

    #[test]
    fn test_clones_share_state() {
        let bus = EventBus::new();
        let other = bus.clone();
        let (handler, count) = counter();
        other.on("e", handler);

        bus.emit("e", &[]);

        assert!(bus.ptr_eq(&other));
        assert!(!bus.ptr_eq(&EventBus::new()));
        assert_eq!(count.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_tokio_scheduler_delivers_snapshot() {
        let bus = EventBus::with_scheduler(BusSettings::deferred(), Arc::new(TokioScheduler::spawn()));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Value>();
        let handler = Handler::new(move |args: &[Value]| {
            let _ = tx.send(args[0].clone());
        });
        bus.on("tick", handler.clone());

        bus.emit("tick", &[json!(1)]);
        bus.off("tick", Some(&handler));
        bus.emit("tick", &[json!(2)]);

        assert_eq!(rx.recv().await, Some(json!(1)));
        drop(handler);
        assert_eq!(rx.recv().await, None);
    }
}
