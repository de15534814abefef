use std::{fs, path::PathBuf};

use miujsag_core::engine::SearchEngine;
use miujsag_core::format::format_response;
use miujsag_core::models::{Article, Category, SearchRequest, SearchResult, Site};
use miujsag_core::{InMemoryEngine, Miujsag, SearchError};
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

const FIXED_TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchContractFixture {
    engine_response: Value,
    search_result: SearchResult,
    error_payload_indexing: Value,
}

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("search_contract_fixture.json")
}

fn load_fixture() -> SearchContractFixture {
    let raw = fs::read_to_string(fixture_path()).expect("read search contract fixture");
    serde_json::from_str(&raw).expect("parse search contract fixture")
}

fn load_fixture_raw_value() -> Value {
    let raw = fs::read_to_string(fixture_path()).expect("read search contract fixture raw");
    serde_json::from_str(&raw).expect("parse search contract fixture raw")
}

#[test]
fn engine_response_formats_to_contract_result() {
    let fixture = load_fixture();
    let formatted = format_response(&fixture.engine_response);
    assert_eq!(formatted, fixture.search_result);
}

#[test]
fn search_result_serializes_to_contract_shape() {
    let fixture = load_fixture();
    let raw = load_fixture_raw_value();

    let formatted = format_response(&fixture.engine_response);
    let serialized = serde_json::to_value(&formatted).expect("serialize search result");
    assert_eq!(serialized, raw["search_result"]);
}

#[test]
fn indexing_error_payload_matches_contract() {
    let fixture = load_fixture();
    let err = SearchError::Indexing {
        document_id: "1812".to_string(),
        source: Box::new(SearchError::Connectivity("connection refused".to_string())),
    };
    let mut serialized =
        serde_json::to_value(err.to_payload("index_document")).expect("serialize payload");

    let trace_id = serialized
        .get("trace_id")
        .and_then(Value::as_str)
        .expect("trace_id string");
    Uuid::parse_str(trace_id).expect("trace_id must be a UUID");
    serialized["trace_id"] = Value::String(FIXED_TRACE_ID.to_string());

    assert_eq!(serialized, fixture.error_payload_indexing);
}

#[test]
fn public_api_indexes_and_searches_through_in_memory_engine() {
    let app = Miujsag::new(InMemoryEngine::new(), "miujsag");
    app.ensure_index().expect("ensure index");

    let article: Article = serde_json::from_value(serde_json::json!({
        "id": "1",
        "title": "Go concurrency patterns",
        "url": "http://x/a",
        "content": "a  b   c",
        "published_at": chrono::Utc::now().to_rfc3339()
    }))
    .expect("article");
    let site = Site {
        id: 1,
        name: "Eng".to_string(),
        slug: Some("eng".to_string()),
    };
    let category = Category {
        id: 5,
        name: "Backend".to_string(),
        slug: None,
    };

    app.index_document(&article, &site, &category)
        .expect("index");
    assert!(app.engine().exists("miujsag").expect("exists"));

    let result = app
        .search(&SearchRequest::new("concurrency").with_sites([1]).with_categories([5]))
        .expect("search");
    assert_eq!(result.total, 1);
    assert_eq!(result.articles[0].title, "Go concurrency patterns");
}
