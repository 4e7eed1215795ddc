#![allow(missing_docs, dead_code)]

use ojson::{Mode, Options, Value};

pub const ORIGINAL: &str = r#"
{
    "store": "corner shop",
    "open": true,
    "manager": null,
    "items": [
        {
            "sku": 1001,
            "name": "tea",
            "price": 2.5,
            "tags": [
                "hot",
                "loose leaf"
            ]
        },
        {
            "sku": 1002,
            "name": "café au lait",
            "price": 0.25,
            "tags": []
        }
    ],
    "ledger": {
        "opening": -1200,
        "notes": "line one\nline \"two\"",
        "audits": {}
    }
}"#;

/// Routes `tracing` output to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn strict() -> Options {
    Options::with_mode(Mode::Strict)
}

pub fn object() -> Options {
    Options::with_mode(Mode::Object)
}

pub fn original() -> Value {
    ojson::parse(ORIGINAL, &strict()).unwrap()
}

/// A map holding itself under `"self"` and a shared list twice.
pub fn tangled() -> Value {
    let shared = Value::array([1.into(), "two".into()]);
    let root = Value::map([("first", shared.clone()), ("second", shared)]);
    if let Value::Map(map) = &root {
        map.borrow_mut().insert("self".into(), root.clone());
    }
    root
}

#[test]
fn compact_dump_matches_serde_json() {
    let reference: serde_json::Value = serde_json::from_str(ORIGINAL).unwrap();
    let expected = serde_json::to_string(&reference).unwrap();
    assert_eq!(ojson::dump(&original(), &strict()).unwrap(), expected);
}
