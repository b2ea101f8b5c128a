//! Check query building, page math and error mapping against the JSON
//! vectors in `test-vectors/`.
//!
//! Vectors are shared data rather than code so another client of the same API
//! can be held to the same expectations.

use std::str::FromStr;

use serde_json::Value;
use showtrack_core::api::with_query;
use showtrack_core::client::check_status;
use showtrack_core::{ApiError, FilterChange, FilterState, HttpResponse, PageResult, SortOrder};

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

fn str_field<'a>(case: &'a Value, key: &str) -> Option<&'a str> {
    case.get(key).and_then(Value::as_str)
}

fn u32_field(case: &Value, key: &str) -> Option<u32> {
    case.get(key).and_then(Value::as_u64).map(|n| n as u32)
}

/// Build a `FilterState` from the defaults plus whatever the vector sets.
fn filter_from(value: &Value) -> FilterState {
    let mut filter = FilterState::default();
    if let Some(v) = str_field(value, "search") {
        filter.search = v.to_string();
    }
    if let Some(v) = str_field(value, "genre") {
        filter.genre = v.to_string();
    }
    if let Some(v) = str_field(value, "type") {
        filter.show_type = v.to_string();
    }
    if let Some(v) = str_field(value, "status") {
        filter.status = v.to_string();
    }
    if let Some(v) = str_field(value, "sort_by") {
        filter.sort_by = v.to_string();
    }
    if let Some(v) = str_field(value, "sort_order") {
        filter.sort_order = SortOrder::from_str(v).unwrap();
    }
    if let Some(v) = u32_field(value, "page") {
        filter.page = v;
    }
    if let Some(v) = u32_field(value, "per_page") {
        filter.per_page = v;
    }
    filter
}

fn change_from(value: &Value) -> FilterChange {
    let text = || value["value"].as_str().unwrap().to_string();
    let number = || value["value"].as_u64().unwrap() as u32;
    match value["kind"].as_str().unwrap() {
        "search" => FilterChange::Search(text()),
        "genre" => FilterChange::Genre(text()),
        "type" => FilterChange::Type(text()),
        "status" => FilterChange::Status(text()),
        "sort_by" => FilterChange::SortBy(text()),
        "sort_order" => FilterChange::SortOrder(SortOrder::from_str(&text()).unwrap()),
        "page" => FilterChange::Page(number()),
        "per_page" => FilterChange::PerPage(number()),
        other => panic!("unknown change kind: {other}"),
    }
}

#[test]
fn show_query_vectors() {
    for case in cases(include_str!("../../test-vectors/show_queries.json")) {
        let name = case["name"].as_str().unwrap();
        let filter = filter_from(&case["filter"]);

        let endpoint = with_query("/tvshows", &filter.query_pairs());

        assert_eq!(endpoint, case["expected_endpoint"].as_str().unwrap(), "{name}");
    }
}

#[test]
fn filter_change_vectors() {
    for case in cases(include_str!("../../test-vectors/filter_changes.json")) {
        let name = case["name"].as_str().unwrap();
        let mut filter = FilterState {
            page: u32_field(&case, "start_page").unwrap(),
            ..FilterState::default()
        };
        let before = filter.clone();

        let result = filter.apply(change_from(&case["change"]));

        match str_field(&case, "expected_error") {
            Some("validation") => {
                assert!(matches!(result, Err(ApiError::Validation(_))), "{name}: {result:?}");
                assert_eq!(filter, before, "{name}: rejected change must not touch state");
            }
            Some(other) => panic!("{name}: unknown expected_error {other}"),
            None => {
                result.unwrap();
                assert_eq!(filter.page, u32_field(&case, "expected_page").unwrap(), "{name}");
            }
        }
    }
}

#[test]
fn pagination_vectors() {
    for case in cases(include_str!("../../test-vectors/pagination.json")) {
        let name = case["name"].as_str().unwrap();
        let page = u32_field(&case, "page").unwrap();
        let per_page = u32_field(&case, "per_page").unwrap();
        let total = case["total"].as_u64().unwrap();

        let result = PageResult::<()>::new(Vec::new(), page, per_page, total);

        assert_eq!(result.pages, u32_field(&case, "pages").unwrap(), "{name}: pages");
        assert_eq!(result.has_prev, case["has_prev"].as_bool().unwrap(), "{name}: has_prev");
        assert_eq!(result.has_next, case["has_next"].as_bool().unwrap(), "{name}: has_next");
    }
}

#[test]
fn error_vectors() {
    for case in cases(include_str!("../../test-vectors/errors.json")) {
        let name = case["name"].as_str().unwrap();
        let status = case["status"].as_u64().unwrap() as u16;
        let body = case["body"].as_str().unwrap().to_string();

        let result = check_status(HttpResponse::new(status, body));

        match &case["expected"] {
            Value::Null => assert!(result.is_ok(), "{name}: {result:?}"),
            expected => {
                let err = result.unwrap_err();
                assert_eq!(
                    err,
                    ApiError::Http {
                        status: expected["status"].as_u64().unwrap() as u16,
                        message: expected["message"].as_str().unwrap().to_string(),
                    },
                    "{name}"
                );
            }
        }
    }
}
