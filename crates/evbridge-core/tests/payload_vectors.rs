//! Payload and envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use evbridge_core::protocol::{Envelope, Payload};
use evbridge_core::ErrorClass;

fn load(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}")).unwrap()
}

#[test]
fn parse_full_payload() {
    let p = Payload::parse(&load("connection_full.json")).unwrap();
    assert_eq!(p.i64_or_default("id"), 1);
    assert_eq!(p.str_or_default("peer_id"), "peer_456");
    assert!(p.bool_or_default("connected"));
}

#[test]
fn mistyped_fields_take_zero_values() {
    let p = Payload::parse(&load("connection_mistyped.json")).unwrap();
    assert_eq!(p.i64_or_default("id"), 0);
    assert_eq!(p.str_or_default("peer_id"), "");
    assert!(!p.bool_or_default("connected"));
    assert!(p.contains_key("extra"));
}

#[test]
fn missing_fields_take_zero_values() {
    let p = Payload::parse(&load("video_frame_partial.json")).unwrap();
    assert_eq!(p.u32_or_default("width"), 1920);
    assert_eq!(p.u32_or_default("height"), 0);
    assert_eq!(p.str_or_default("reason"), "");
}

#[test]
fn negative_and_oversized_ints_do_not_fit_u32() {
    let p = Payload::parse(r#"{"a": -1, "b": 4294967296, "c": 1.5}"#).unwrap();
    assert_eq!(p.u32_or_default("a"), 0);
    assert_eq!(p.u32_or_default("b"), 0);
    assert_eq!(p.u32_or_default("c"), 0);
    assert_eq!(p.i64_or_default("a"), -1);
    assert_eq!(p.u64_or_default("b"), 4_294_967_296);
}

#[test]
fn empty_text_is_empty_payload() {
    assert!(Payload::parse("").unwrap().is_empty());
    assert!(Payload::parse("  \n").unwrap().is_empty());
    assert!(Payload::parse("{}").unwrap().is_empty());
}

#[test]
fn non_object_is_decode_error() {
    let err = Payload::parse(&load("not_an_object.json")).expect_err("must fail");
    assert_eq!(err.class(), ErrorClass::Decode);

    let err = Payload::parse("{\"id\": ").expect_err("must fail");
    assert_eq!(err.class().as_str(), "DECODE");
}

#[test]
fn wire_envelope_takes_name_key() {
    let env = Envelope::from_wire(&load("wire_client_remove.json")).unwrap();
    assert_eq!(env.name, "on_client_remove");
    assert!(!env.payload.contains_key("name"));
    // the engine sends scalars as text
    assert_eq!(env.payload.i64_or_default("id"), 0);
    assert_eq!(env.payload.text_i64_or_default("id"), 7);
    assert!(env.payload.text_bool_or_default("close"));
}

#[test]
fn wire_envelope_falls_back_to_type_key() {
    let env = Envelope::from_wire(&load("wire_rgba.json")).unwrap();
    assert_eq!(env.name, "rgba");
    assert_eq!(env.payload.i64_or_default("display"), 2);
}

#[test]
fn wire_envelope_without_name_is_unnamed() {
    let env = Envelope::from_wire(r#"{"name": 5, "x": true}"#).unwrap();
    assert_eq!(env.name, "");
    assert!(env.payload.contains_key("name"));
}

#[test]
fn wire_shape_round_trips_name() {
    let env = Envelope::new("theme", Payload::new().with("dark", "true"));
    let back = Envelope::from_wire(&env.to_wire()).unwrap();
    assert_eq!(back, env);
}

#[test]
fn text_scalars_parse_or_default() {
    let p = Payload::parse(r#"{"a":"42","b":" -3 ","c":"x","d":12,"t":"true","f":"false","n":"yes","j":true}"#).unwrap();
    assert_eq!(p.text_i64_or_default("a"), 42);
    assert_eq!(p.text_i64_or_default("b"), -3);
    assert_eq!(p.text_i64_or_default("c"), 0);
    assert_eq!(p.text_i64_or_default("d"), 12);
    assert_eq!(p.text_i64_or_default("missing"), 0);
    assert!(p.text_bool_or_default("t"));
    assert!(!p.text_bool_or_default("f"));
    assert!(!p.text_bool_or_default("n"));
    assert!(p.text_bool_or_default("j"));
}

#[test]
fn first_str_entry_skips_reserved_keys() {
    let p = Payload::parse(r#"{"name":"x","send":"/tmp/a.txt"}"#).unwrap();
    assert_eq!(
        p.first_str_entry(&["name"]),
        Some(("send".to_string(), "/tmp/a.txt".to_string()))
    );
    assert_eq!(Payload::new().first_str_entry(&["name"]), None);
}
