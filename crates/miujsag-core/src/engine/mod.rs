use serde_json::Value;

use crate::error::Result;

mod elasticsearch;
mod memory;

pub use elasticsearch::ElasticsearchEngine;
pub use memory::InMemoryEngine;

/// The capabilities this crate needs from a full-text engine.
///
/// Implementations report transport failures as `Connectivity`/`Timeout`
/// and non-success replies as `Engine { status, reason }`; classifying them
/// further is left to the caller.
pub trait SearchEngine: Send + Sync {
    fn exists(&self, index: &str) -> Result<bool>;

    fn create_index(&self, index: &str, schema: &Value) -> Result<()>;

    fn delete_index(&self, index: &str, ignore_missing: bool) -> Result<()>;

    fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<()>;

    /// Runs `dsl` and returns the engine's raw response body.
    fn query(&self, index: &str, dsl: &Value) -> Result<Value>;
}

impl<E: SearchEngine + ?Sized> SearchEngine for std::sync::Arc<E> {
    fn exists(&self, index: &str) -> Result<bool> {
        (**self).exists(index)
    }

    fn create_index(&self, index: &str, schema: &Value) -> Result<()> {
        (**self).create_index(index, schema)
    }

    fn delete_index(&self, index: &str, ignore_missing: bool) -> Result<()> {
        (**self).delete_index(index, ignore_missing)
    }

    fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<()> {
        (**self).upsert(index, id, body)
    }

    fn query(&self, index: &str, dsl: &Value) -> Result<Value> {
        (**self).query(index, dsl)
    }
}
