//! `load_ir_mappings` against a real (temp-file) store: end-to-end
//! seed-file ingestion plus idempotent re-run behavior.

use std::io::Write;

use findata_core::config::load_ir_mappings;

mod common;
use common::*;

fn write_seed_file(dir: &std::path::Path, json: &str) -> std::path::PathBuf {
    let path = dir.join("ir_mappings.json");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(json.as_bytes()).unwrap();
    path
}

#[test]
fn loads_seed_file_into_the_store() {
    let (store, tmp) = make_test_store();
    let path = write_seed_file(
        tmp.path(),
        r#"{
            "companies": [
                {
                    "ticker": "RELIANCE",
                    "company_name": "Reliance Industries",
                    "ir_base_url": "https://www.ril.com/ir",
                    "market": "NSE",
                    "country": "IN"
                },
                {
                    "ticker": "TCS",
                    "company_name": "Tata Consultancy Services",
                    "ir_base_url": "https://www.tcs.com/ir",
                    "market": "NSE",
                    "country": "IN"
                }
            ]
        }"#,
    );

    let count = load_ir_mappings(&store, path.to_str().unwrap()).unwrap();
    assert_eq!(count, 2);

    let repo = store.ir_mappings().unwrap();
    let reliance = repo.get("RELIANCE").unwrap().unwrap();
    assert_eq!(reliance.company_name, "Reliance Industries");
    assert!(reliance.is_active);
}

#[test]
fn reloading_the_same_file_is_idempotent() {
    let (store, tmp) = make_test_store();
    let path = write_seed_file(
        tmp.path(),
        r#"{
            "companies": [
                {
                    "ticker": "TCS",
                    "company_name": "Tata Consultancy Services",
                    "ir_base_url": "https://www.tcs.com/ir",
                    "market": "NSE",
                    "country": "IN"
                }
            ]
        }"#,
    );

    load_ir_mappings(&store, path.to_str().unwrap()).unwrap();
    load_ir_mappings(&store, path.to_str().unwrap()).unwrap();

    let repo = store.ir_mappings().unwrap();
    let entry = repo.get("TCS").unwrap().unwrap();
    assert_eq!(entry.company_name, "Tata Consultancy Services");
}

#[test]
fn missing_file_is_a_fatal_error_not_a_panic() {
    let (store, tmp) = make_test_store();
    let missing = tmp.path().join("does_not_exist.json");
    let err = load_ir_mappings(&store, missing.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, findata_core::error::CoreError::Fatal(_)));
}
