use std::sync::Arc;
use std::thread;

use chrono::{Duration, Utc};
use serde_json::Value;

use crate::engine::{InMemoryEngine, SearchEngine};
use crate::error::{Result, SearchError};
use crate::models::{
    Article, Category, IndexOutcome, SearchRequest, SearchResult, Site, SkipReason, SortMode,
};
use crate::query::PAGE_SIZE;

use super::Miujsag;

const INDEX: &str = "miujsag";

fn app() -> Miujsag<Arc<InMemoryEngine>> {
    let app = Miujsag::new(Arc::new(InMemoryEngine::new()), INDEX);
    app.ensure_index().expect("ensure index");
    app
}

fn article(id: &str, url: &str, title: &str, content: Option<&str>) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        url: url.to_string(),
        description: String::new(),
        content: content.map(ToString::to_string),
        published_at: Utc::now() - Duration::days(1),
        estimated_read_time: 3,
        image: None,
    }
}

fn eng() -> Site {
    Site {
        id: 1,
        name: "Eng".to_string(),
        slug: Some("eng".to_string()),
    }
}

fn backend() -> Category {
    Category {
        id: 5,
        name: "Backend".to_string(),
        slug: None,
    }
}

fn count(app: &Miujsag<Arc<InMemoryEngine>>) -> usize {
    app.engine()
        .document_count(INDEX)
        .expect("count")
        .expect("index exists")
}

#[test]
fn scenario_index_then_search_with_filters() {
    let app = app();
    let doc = article("1", "http://x/a", "Go concurrency patterns", Some("a  b   c"));
    let outcome = app
        .index_document(&doc, &eng(), &backend())
        .expect("index");
    assert_eq!(outcome, IndexOutcome::Inserted);

    let stored = app
        .engine()
        .document(INDEX, "1")
        .expect("read")
        .expect("stored");
    assert_eq!(stored["content"], "a b c");

    let result = app
        .search(
            &SearchRequest::new("concurrency")
                .with_sites([1])
                .with_categories([5]),
        )
        .expect("search");
    assert_eq!(result.total, 1);
    assert_eq!(result.articles.len(), 1);
    let hit = &result.articles[0];
    assert_eq!(hit.title, "Go concurrency patterns");
    assert!(hit.highlight.is_some());

    let payload = serde_json::to_value(hit).expect("serialize");
    assert!(payload.get("content").is_none());
    assert_eq!(payload["Site"]["slug"], "eng");
}

#[test]
fn scenario_same_url_twice_keeps_one_document() {
    let app = app();
    let first = article("1", "http://x/a", "Original", Some("body"));
    let second = article("2", "http://x/a", "Resubmitted", Some("other body"));
    let other_site = Site {
        id: 2,
        name: "Ops".to_string(),
        slug: None,
    };
    let other_category = Category {
        id: 9,
        name: "Infra".to_string(),
        slug: Some("infra".to_string()),
    };

    assert_eq!(
        app.index_document(&first, &eng(), &backend())
            .expect("first"),
        IndexOutcome::Inserted
    );
    assert_eq!(
        app.index_document(&second, &other_site, &other_category)
            .expect("second"),
        IndexOutcome::Skipped(SkipReason::AlreadyExists)
    );
    assert_eq!(count(&app), 1);

    let kept = app
        .engine()
        .document(INDEX, "1")
        .expect("read")
        .expect("kept");
    assert_eq!(kept["title"], "Original");
    assert_eq!(kept["site"]["id"], 1);
}

#[test]
fn scenario_no_match_returns_empty_result() {
    let app = app();
    app.index_document(
        &article("1", "http://x/a", "Go concurrency patterns", Some("a b c")),
        &eng(),
        &backend(),
    )
    .expect("index");

    let result = app
        .search(&SearchRequest::new("xyz-nomatch"))
        .expect("search");
    assert_eq!(result, SearchResult::default());
}

#[test]
fn url_prefix_is_not_treated_as_duplicate() {
    let app = app();
    app.index_document(&article("1", "http://x/a", "A", None), &eng(), &backend())
        .expect("first");
    let outcome = app
        .index_document(&article("2", "http://x/ab", "AB", None), &eng(), &backend())
        .expect("second");
    assert_eq!(outcome, IndexOutcome::Inserted);
    assert_eq!(count(&app), 2);
}

#[test]
fn ensure_index_is_idempotent_and_applies_mapping() {
    let app = app();
    app.ensure_index().expect("second ensure");
    app.ensure_index().expect("third ensure");
    let schema = app
        .engine()
        .schema(INDEX)
        .expect("read")
        .expect("schema");
    assert_eq!(
        schema["mappings"]["properties"]["published_at"]["type"],
        "date"
    );
}

#[test]
fn reset_index_drops_documents_and_recreates_index() {
    let app = app();
    app.index_document(&article("1", "http://x/a", "A", None), &eng(), &backend())
        .expect("index");
    assert_eq!(count(&app), 1);

    app.reset_index().expect("reset");
    assert_eq!(count(&app), 0);
    assert!(app.engine().schema(INDEX).expect("read").is_some());
}

#[test]
fn reset_index_works_when_index_is_missing() {
    let app = Miujsag::new(InMemoryEngine::new(), INDEX);
    app.reset_index().expect("reset");
    assert!(app.engine().exists(INDEX).expect("exists"));
}

#[test]
fn search_window_excludes_old_articles_and_date_sort_orders_newest_first() {
    let app = app();
    let now = Utc::now();
    let mut old = article("old", "http://x/old", "Rust history", None);
    old.published_at = now - Duration::days(30);
    let mut older = article("older", "http://x/older", "Rust async", None);
    older.published_at = now - Duration::days(3);
    let mut newer = article("newer", "http://x/newer", "Rust traits", None);
    newer.published_at = now - Duration::hours(2);
    for doc in [&old, &older, &newer] {
        app.index_document(doc, &eng(), &backend()).expect("index");
    }

    let recent = app
        .search_at(&SearchRequest::new("rust").sorted_by(SortMode::Date), now)
        .expect("search");
    let titles = recent
        .articles
        .iter()
        .map(|a| a.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["Rust traits", "Rust async"]);

    let everything = app
        .search_at(
            &SearchRequest::new("rust").between(now - Duration::days(60), now),
            now,
        )
        .expect("search");
    assert_eq!(everything.total, 3);
}

#[test]
fn total_counts_all_matches_beyond_one_page() {
    let app = app();
    for n in 0..(PAGE_SIZE + 5) {
        let doc = article(
            &format!("{n}"),
            &format!("http://x/{n}"),
            "Weekly kernel digest",
            Some("scheduler news"),
        );
        app.index_document(&doc, &eng(), &backend()).expect("index");
    }

    let first_page = app.search(&SearchRequest::new("kernel")).expect("page 1");
    assert_eq!(first_page.total, (PAGE_SIZE + 5) as u64);
    assert_eq!(first_page.articles.len(), PAGE_SIZE);

    let second_page = app
        .search(&SearchRequest::new("kernel").with_skip(PAGE_SIZE))
        .expect("page 2");
    assert_eq!(second_page.articles.len(), 5);
}

#[test]
fn site_filter_restricts_results() {
    let app = app();
    let ops = Site {
        id: 2,
        name: "Ops".to_string(),
        slug: Some("ops".to_string()),
    };
    app.index_document(&article("1", "http://x/1", "Kubernetes tips", None), &eng(), &backend())
        .expect("index 1");
    app.index_document(&article("2", "http://x/2", "Kubernetes traps", None), &ops, &backend())
        .expect("index 2");

    let only_ops = app
        .search(&SearchRequest::new("kubernetes").with_sites([2]))
        .expect("search");
    assert_eq!(only_ops.total, 1);
    assert_eq!(only_ops.articles[0].site.name, "Ops");

    let all = app
        .search(&SearchRequest::new("kubernetes"))
        .expect("search");
    assert_eq!(all.total, 2);
}

#[test]
fn blank_query_is_rejected_before_reaching_engine() {
    let app = Miujsag::new(
        ScriptedEngine::failing(Op::Query, || {
            SearchError::Connectivity("must not be called".to_string())
        }),
        INDEX,
    );
    let err = app.search(&SearchRequest::new("   ")).expect_err("blank");
    assert!(matches!(err, SearchError::Query(_)));
}

#[test]
fn search_failure_is_an_error_not_an_empty_result() {
    let app = Miujsag::new(
        ScriptedEngine::failing(Op::Query, || {
            SearchError::Connectivity("connection refused".to_string())
        }),
        INDEX,
    );
    let err = app.search(&SearchRequest::new("rust")).expect_err("down");
    assert!(matches!(err, SearchError::Connectivity(_)));
}

#[test]
fn search_on_missing_index_is_a_schema_error() {
    let app = Miujsag::new(InMemoryEngine::new(), INDEX);
    let err = app
        .search(&SearchRequest::new("rust"))
        .expect_err("no index yet");
    assert!(matches!(err, SearchError::Schema(_)), "{err:?}");
}

#[test]
fn lookup_failure_reports_indexing_error_with_document_id() {
    let app = Miujsag::new(
        ScriptedEngine::failing(Op::Query, || SearchError::Timeout("5000ms".to_string())),
        INDEX,
    );
    let err = app
        .index_document(&article("doc-7", "http://x/7", "T", None), &eng(), &backend())
        .expect_err("timeout");
    assert_eq!(err.document_id(), Some("doc-7"));
    assert!(matches!(
        err,
        SearchError::Indexing { ref source, .. } if matches!(**source, SearchError::Timeout(_))
    ));
}

#[test]
fn write_failure_reports_indexing_error_with_document_id() {
    let app = Miujsag::new(
        ScriptedEngine::failing(Op::Upsert, || SearchError::Engine {
            status: 429,
            reason: "es_rejected_execution_exception".to_string(),
        }),
        INDEX,
    );
    app.ensure_index().expect("ensure");
    let err = app
        .index_document(&article("doc-8", "http://x/8", "T", None), &eng(), &backend())
        .expect_err("rejected");
    assert_eq!(err.document_id(), Some("doc-8"));
    assert_eq!(err.code(), "INDEXING_ERROR");
}

#[test]
fn empty_url_is_rejected_as_indexing_error() {
    let app = app();
    let err = app
        .index_document(&article("doc-9", "  ", "T", None), &eng(), &backend())
        .expect_err("no url");
    assert_eq!(err.document_id(), Some("doc-9"));
    assert_eq!(count(&app), 0);
}

#[test]
fn schema_failures_are_classified() {
    let unreachable = Miujsag::new(
        ScriptedEngine::failing(Op::Exists, || {
            SearchError::Connectivity("no route to host".to_string())
        }),
        INDEX,
    );
    assert!(matches!(
        unreachable.ensure_index().expect_err("down"),
        SearchError::Connectivity(_)
    ));

    let rejected = Miujsag::new(
        ScriptedEngine::failing(Op::Create, || SearchError::Engine {
            status: 400,
            reason: "illegal_argument_exception: bad settings".to_string(),
        }),
        INDEX,
    );
    assert!(matches!(
        rejected.ensure_index().expect_err("rejected"),
        SearchError::Schema(_)
    ));
    assert!(matches!(
        rejected.reset_index().expect_err("rejected"),
        SearchError::Schema(_)
    ));
}

#[test]
fn concurrent_indexing_of_distinct_urls_from_shared_client() {
    let app = app();
    let handles = (0..8)
        .map(|n| {
            let app = app.clone();
            thread::spawn(move || {
                let doc = article(&format!("{n}"), &format!("http://x/{n}"), "Parallel", None);
                app.index_document(&doc, &eng(), &backend())
            })
        })
        .collect::<Vec<_>>();

    for handle in handles {
        let outcome = handle.join().expect("join").expect("index");
        assert!(outcome.is_inserted());
    }
    assert_eq!(count(&app), 8);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Exists,
    Create,
    Upsert,
    Query,
}

/// In-memory engine that fails one operation with a fixed error.
struct ScriptedEngine {
    inner: InMemoryEngine,
    fail_on: Op,
    error: fn() -> SearchError,
}

impl ScriptedEngine {
    fn failing(fail_on: Op, error: fn() -> SearchError) -> Self {
        Self {
            inner: InMemoryEngine::new(),
            fail_on,
            error,
        }
    }

    fn check(&self, op: Op) -> Result<()> {
        if op == self.fail_on {
            return Err((self.error)());
        }
        Ok(())
    }
}

impl SearchEngine for ScriptedEngine {
    fn exists(&self, index: &str) -> Result<bool> {
        self.check(Op::Exists)?;
        self.inner.exists(index)
    }

    fn create_index(&self, index: &str, schema: &Value) -> Result<()> {
        self.check(Op::Create)?;
        self.inner.create_index(index, schema)
    }

    fn delete_index(&self, index: &str, ignore_missing: bool) -> Result<()> {
        self.inner.delete_index(index, ignore_missing)
    }

    fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<()> {
        self.check(Op::Upsert)?;
        self.inner.upsert(index, id, body)
    }

    fn query(&self, index: &str, dsl: &Value) -> Result<Value> {
        self.check(Op::Query)?;
        self.inner.query(index, dsl)
    }
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn facade_is_shareable_across_threads() {
    assert_send_sync::<Miujsag<InMemoryEngine>>();
    assert_send_sync::<Miujsag>();
}
