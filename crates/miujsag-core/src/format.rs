use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::{ArticleSummary, SearchResult, SiteSummary};
use crate::query::HIGHLIGHT_FIELD;

/// Maps a raw engine search response onto [`SearchResult`].
///
/// A response without a hits array yields an empty result. Hits carrying no
/// `_source` object are dropped; `total` still reports the engine's count.
#[must_use]
pub fn format_response(response: &Value) -> SearchResult {
    let Some(hits) = response.pointer("/hits/hits").and_then(Value::as_array) else {
        return SearchResult::default();
    };

    let total = response
        .pointer("/hits/total")
        .and_then(parse_total)
        .unwrap_or(hits.len() as u64);
    let articles = hits.iter().filter_map(summarize_hit).collect();

    SearchResult { total, articles }
}

/// Older engines report a bare integer, newer ones `{ "value": n, "relation": .. }`.
fn parse_total(raw: &Value) -> Option<u64> {
    raw.as_u64()
        .or_else(|| raw.get("value").and_then(Value::as_u64))
}

fn summarize_hit(hit: &Value) -> Option<ArticleSummary> {
    let source = hit.get("_source")?.as_object()?;
    let text = |key: &str| {
        source
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let site = source.get("site");
    Some(ArticleSummary {
        title: text("title"),
        url: text("url"),
        description: text("description"),
        estimated_read_time: source
            .get("estimated_read_time")
            .and_then(Value::as_u64)
            .and_then(|minutes| u32::try_from(minutes).ok()),
        published_at: source.get("published_at").and_then(parse_date),
        image: source
            .get("image")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        site: SiteSummary {
            name: site
                .and_then(|site| site.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            slug: site
                .and_then(|site| site.get("slug"))
                .and_then(Value::as_str)
                .map(ToString::to_string),
        },
        highlight: hit
            .get("highlight")
            .and_then(|highlight| highlight.get(HIGHLIGHT_FIELD))
            .and_then(first_fragment),
    })
}

fn first_fragment(raw: &Value) -> Option<String> {
    let fragment = match raw {
        Value::Array(items) => items.iter().find_map(Value::as_str),
        Value::String(single) => Some(single.as_str()),
        _ => None,
    }?;
    (!fragment.is_empty()).then(|| fragment.to_string())
}

fn parse_date(raw: &Value) -> Option<DateTime<Utc>> {
    match raw {
        Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        Value::Number(millis) => millis.as_i64().and_then(DateTime::from_timestamp_millis),
        _ => None,
    }
}
