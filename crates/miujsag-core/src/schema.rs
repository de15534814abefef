use serde_json::{Value, json};

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};

/// Keyword sub-field of `url` used for exact lookups.
pub const URL_EXACT_FIELD: &str = "url.raw";

/// Settings and mapping applied when the article index is created.
///
/// `url.raw` carries no `ignore_above`: a url too long to index as a keyword
/// is rejected on write instead of being stored unfindable by the duplicate
/// lookup.
///
/// `site` and `category` are single embedded objects, so they are mapped as
/// plain `object` fields: `site.id` and `category.id` stay directly
/// filterable with `terms` without wrapping queries in `nested`.
#[must_use]
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "dynamic": "strict",
            "properties": {
                "title": { "type": "text" },
                "url": {
                    "type": "text",
                    "fields": {
                        "raw": { "type": "keyword" }
                    }
                },
                "description": { "type": "text" },
                "content": { "type": "text" },
                "published_at": { "type": "date" },
                "estimated_read_time": { "type": "integer" },
                "image": { "type": "keyword", "index": false },
                "site": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "long" },
                        "name": { "type": "text" },
                        "slug": { "type": "keyword" }
                    }
                },
                "category": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "long" },
                        "name": { "type": "text" }
                    }
                }
            }
        }
    })
}

/// Creates `index` with [`index_mapping`] unless it already exists.
///
/// Returns `true` when this call created the index. Losing a creation race
/// to another caller counts as "already exists".
pub fn ensure_index<E: SearchEngine + ?Sized>(engine: &E, index: &str) -> Result<bool> {
    let exists = engine.exists(index).map_err(|err| schema_failure(index, err))?;
    if exists {
        tracing::debug!(index, "index already present");
        return Ok(false);
    }
    create(engine, index)
}

/// Drops `index` with all of its documents, then recreates it.
pub fn reset_index<E: SearchEngine + ?Sized>(engine: &E, index: &str) -> Result<()> {
    engine
        .delete_index(index, true)
        .map_err(|err| schema_failure(index, err))?;
    tracing::info!(index, "index deleted");
    create(engine, index)?;
    Ok(())
}

fn create<E: SearchEngine + ?Sized>(engine: &E, index: &str) -> Result<bool> {
    match engine.create_index(index, &index_mapping()) {
        Ok(()) => {
            tracing::info!(index, "index created");
            Ok(true)
        }
        Err(err) if err.is_already_exists() => {
            tracing::debug!(index, "index created concurrently");
            Ok(false)
        }
        Err(err) => Err(schema_failure(index, err)),
    }
}

fn schema_failure(index: &str, err: SearchError) -> SearchError {
    let err = match err {
        SearchError::Engine { status, reason } => SearchError::Schema(format!(
            "index {index} rejected with status {status}: {reason}"
        )),
        other => other,
    };
    tracing::warn!(index, error = %err, "index lifecycle call failed");
    err
}
