use std::collections::BTreeSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

use crate::error::{Result, SearchError};
use crate::models::{SearchRequest, SortMode};
use crate::schema::URL_EXACT_FIELD;

pub const PAGE_SIZE: usize = 20;
pub const FUZZINESS: u32 = 1;
pub const PREFIX_LENGTH: u32 = 2;
pub const SEARCH_FIELDS: [&str; 3] = ["title", "description", "content"];
pub const HIGHLIGHT_FIELD: &str = "content";
/// Length of the leading `content` excerpt returned when no term matched in it.
pub const NO_MATCH_FRAGMENT_CHARS: usize = 150;

/// Rejects requests the engine would either misread or answer with nothing.
pub fn validate_request(request: &SearchRequest, now: DateTime<Utc>) -> Result<()> {
    if request.query.trim().is_empty() {
        return Err(SearchError::Query("query must not be blank".to_string()));
    }
    let (from, until) = request.window(now);
    if from > until {
        return Err(SearchError::Query(format!(
            "date range is inverted: from {} is after until {}",
            format_date(from),
            format_date(until)
        )));
    }
    Ok(())
}

/// Translates `request` into a search body. `now` anchors the default window.
#[must_use]
pub fn build_query(request: &SearchRequest, now: DateTime<Utc>) -> Value {
    let (from, until) = request.window(now);

    let mut must = vec![json!({
        "multi_match": {
            "query": request.query,
            "fields": SEARCH_FIELDS,
            "fuzziness": FUZZINESS,
            "prefix_length": PREFIX_LENGTH,
        }
    })];
    must.extend(terms_clause("site.id", &request.sites));
    must.extend(terms_clause("category.id", &request.categories));

    json!({
        "from": request.skip,
        "size": PAGE_SIZE,
        "track_total_hits": true,
        "query": {
            "bool": {
                "must": must,
                "filter": [
                    { "range": { "published_at": { "lte": format_date(until) } } },
                    { "range": { "published_at": { "gte": format_date(from) } } },
                ],
            }
        },
        "highlight": {
            "fields": { HIGHLIGHT_FIELD: {} },
            "number_of_fragments": 1,
            "no_match_size": NO_MATCH_FRAGMENT_CHARS,
        },
        "_source": { "excludes": [HIGHLIGHT_FIELD] },
        "sort": [sort_clause(request.sort)],
    })
}

/// Exact lookup of documents stored under `url`; only existence matters.
#[must_use]
pub fn build_url_lookup_query(url: &str) -> Value {
    json!({
        "size": 1,
        "_source": false,
        "query": {
            "bool": {
                "filter": [{ "term": { URL_EXACT_FIELD: url } }]
            }
        }
    })
}

// An empty `terms` list matches no document, so an unrestricted dimension
// must produce no clause at all.
fn terms_clause(field: &str, ids: &BTreeSet<i64>) -> Option<Value> {
    if ids.is_empty() {
        return None;
    }
    Some(json!({ "terms": { field: ids } }))
}

fn sort_clause(sort: SortMode) -> Value {
    match sort {
        SortMode::Date => json!({ "published_at": { "order": "desc" } }),
        SortMode::Relevance => json!({ "_score": { "order": "desc" } }),
    }
}

fn format_date(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}
