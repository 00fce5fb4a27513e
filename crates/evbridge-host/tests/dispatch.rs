//! Router behavior: fan-out, ordering, isolation, malformed payloads.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use evbridge_core::channel::{ChannelKey, Scope};
use evbridge_core::protocol::{Envelope, GlobalEvent, Payload};
use evbridge_host::dispatch::{DispatchLimits, PushOutcome, Router};
use evbridge_host::obs::BridgeMetrics;
use evbridge_host::ChannelRegistry;

use common::{Faulty, Recorder};

fn router() -> (Arc<ChannelRegistry>, Arc<BridgeMetrics>, Router) {
    let registry = Arc::new(ChannelRegistry::new());
    let metrics = Arc::new(BridgeMetrics::default());
    let limits = DispatchLimits {
        max_payload_bytes: 256,
        slow_listener_warn: Duration::from_millis(50),
    };
    let router = Router::new(Arc::clone(&registry), Arc::clone(&metrics), limits);
    (registry, metrics, router)
}

#[test]
fn unknown_key_is_no_listener() {
    let (_, metrics, router) = router();
    let key = ChannelKey::global("never_registered").unwrap();

    assert_eq!(router.push_json(&key, "connection", "{}"), PushOutcome::NoListener);
    assert_eq!(router.push(&key, &Envelope::named("x")), PushOutcome::NoListener);
    assert_eq!(router.push_wire(&key, "not even json"), PushOutcome::NoListener);

    assert_eq!(
        metrics.pushes.get(&[("scope", "global"), ("outcome", "no_listener")]),
        3
    );
    assert_eq!(metrics.decode_errors.get(&[("scope", "global")]), 0);
}

#[test]
fn pushes_arrive_in_order() {
    let (registry, _, router) = router();
    let key = ChannelKey::session("s1").unwrap();
    let rec = Recorder::new("rec", Scope::Session);
    registry.register(key.clone(), rec.clone()).unwrap();

    for name in ["e1", "e2", "e3"] {
        assert!(router.push_json(&key, name, "{}").is_dispatched());
    }
    assert_eq!(rec.names(), vec!["e1", "e2", "e3"]);
}

#[test]
fn fan_out_follows_registration_order() {
    let (registry, _, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for id in ["first", "second", "third"] {
        let order = Arc::clone(&order);
        let id_owned = id.to_string();
        let listener = evbridge_host::GlobalListener::from_fn(id, move |_ev: GlobalEvent| {
            order.lock().unwrap().push(id_owned.clone());
            Ok(())
        });
        registry.register(key.clone(), Arc::new(listener)).unwrap();
    }

    let outcome = router.push_json(&key, "config_updated", "");
    assert_eq!(outcome.report().unwrap().delivered, 3);
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
}

#[test]
fn same_listener_twice_delivers_once() {
    let (registry, _, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();
    registry.register(key.clone(), rec.clone()).unwrap();

    router.push_json(&key, "connection", "{}");
    assert_eq!(rec.count(), 1);
}

#[test]
fn unregister_then_push_is_no_listener() {
    let (registry, _, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();
    registry.unregister(&key);

    assert_eq!(router.push_json(&key, "connection", "{}"), PushOutcome::NoListener);
    assert_eq!(rec.count(), 0);
}

#[test]
fn failing_listener_does_not_block_sibling() {
    let (registry, metrics, router) = router();
    let key = ChannelKey::global("main").unwrap();
    registry
        .register(
            key.clone(),
            Arc::new(Faulty {
                id: "faulty".into(),
                scope: Scope::Global,
                panic: false,
            }),
        )
        .unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();

    let report = router.push_json(&key, "connection", r#"{"id":1}"#).report().unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(rec.names(), vec!["connection"]);
    assert_eq!(
        metrics
            .listener_failures
            .get(&[("scope", "global"), ("kind", "error")]),
        1
    );
}

#[test]
fn panicking_listener_does_not_block_sibling() {
    let (registry, metrics, router) = router();
    let key = ChannelKey::session("s1").unwrap();
    registry
        .register(
            key.clone(),
            Arc::new(Faulty {
                id: "boom".into(),
                scope: Scope::Session,
                panic: true,
            }),
        )
        .unwrap();
    let rec = Recorder::new("rec", Scope::Session);
    registry.register(key.clone(), rec.clone()).unwrap();

    for _ in 0..2 {
        let report = router.push_json(&key, "close", "{}").report().unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
    }
    assert_eq!(rec.count(), 2);
    assert_eq!(
        metrics
            .listener_failures
            .get(&[("scope", "session"), ("kind", "panic")]),
        2
    );
}

#[test]
fn malformed_payload_reaches_error_path() {
    let (registry, metrics, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();

    let report = router
        .push_json(&key, "connection", "{\"id\": 1,")
        .report()
        .unwrap();
    assert!(report.malformed);
    assert_eq!(report.delivered, 1);
    assert_eq!(rec.count(), 0);
    assert_eq!(
        *rec.malformed.lock().unwrap(),
        vec![("connection".to_string(), "{\"id\": 1,".to_string())]
    );
    assert_eq!(metrics.decode_errors.get(&[("scope", "global")]), 1);
}

#[test]
fn oversized_payload_takes_malformed_path() {
    let (registry, _, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();

    let big = format!("{{\"text\":\"{}\"}}", "x".repeat(300));
    let report = router.push_json(&key, "chat_server_mode", &big).report().unwrap();
    assert!(report.malformed);
    assert_eq!(rec.malformed.lock().unwrap().len(), 1);
}

#[test]
fn wire_push_extracts_name() {
    let (registry, _, router) = router();
    let key = ChannelKey::session("s1").unwrap();
    let rec = Recorder::new("rec", Scope::Session);
    registry.register(key.clone(), rec.clone()).unwrap();

    router.push_wire(&key, r#"{"type":"rgba","display":0}"#);
    let events = rec.events.lock().unwrap();
    assert_eq!(events[0].0, "rgba");
    assert_eq!(events[0].1, Payload::new().with("display", 0));
}

#[test]
fn listener_may_unregister_itself_during_dispatch() {
    let (registry, _, router) = router();
    let key = ChannelKey::global("main").unwrap();
    let reg2 = Arc::clone(&registry);
    let key2 = key.clone();
    let once = evbridge_host::GlobalListener::from_fn("once", move |_ev: GlobalEvent| {
        reg2.unregister_listener(&key2, "once");
        Ok(())
    });
    registry.register(key.clone(), Arc::new(once)).unwrap();
    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec.clone()).unwrap();

    // the in-flight push still reaches both
    assert_eq!(router.push_json(&key, "language", "").report().unwrap().delivered, 2);
    assert_eq!(router.push_json(&key, "language", "").report().unwrap().delivered, 1);
    assert_eq!(rec.count(), 2);
}

#[test]
fn dispatch_duration_is_observed() {
    let (registry, metrics, router) = router();
    let key = ChannelKey::global("main").unwrap();
    registry
        .register(key.clone(), Recorder::new("rec", Scope::Global))
        .unwrap();
    router.push_json(&key, "language", "");
    router.push_json(&key, "language", "");
    assert_eq!(metrics.dispatch_duration.count(&[("scope", "global")]), 2);
    assert!(metrics.render().contains("evbridge_dispatch_duration_micros_count{scope=\"global\"} 2"));
}

#[test]
fn push_where_every_listener_fails_is_not_counted_delivered() {
    let (registry, metrics, router) = router();
    let key = ChannelKey::global("main").unwrap();
    registry
        .register(
            key.clone(),
            Arc::new(Faulty {
                id: "faulty".into(),
                scope: Scope::Global,
                panic: false,
            }),
        )
        .unwrap();

    let report = router.push_json(&key, "language", "").report().unwrap();
    assert_eq!(report.delivered, 0);
    assert_eq!(report.failed, 1);
    assert_eq!(metrics.pushes.get(&[("scope", "global"), ("outcome", "all_failed")]), 1);
    assert_eq!(metrics.pushes.get(&[("scope", "global"), ("outcome", "delivered")]), 0);

    let rec = Recorder::new("rec", Scope::Global);
    registry.register(key.clone(), rec).unwrap();
    router.push_json(&key, "language", "");
    assert_eq!(metrics.pushes.get(&[("scope", "global"), ("outcome", "delivered")]), 1);
}
