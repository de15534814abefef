use crate::config::ElasticsearchConfig;
use crate::engine::{ElasticsearchEngine, SearchEngine};
use crate::error::Result;

mod indexing_service;
mod schema_service;
mod search_service;

/// Article index facade: one engine, one index name.
///
/// Cloning is cheap when the engine is; every call is independent, so one
/// instance can serve concurrent callers.
#[derive(Clone)]
pub struct Miujsag<E = ElasticsearchEngine> {
    engine: E,
    index: String,
}

impl<E> std::fmt::Debug for Miujsag<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Miujsag")
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}

impl Miujsag<ElasticsearchEngine> {
    pub fn from_env() -> Result<Self> {
        Self::from_config(ElasticsearchConfig::from_env()?)
    }

    pub fn from_config(config: ElasticsearchConfig) -> Result<Self> {
        let index = config.index.clone();
        Ok(Self::new(ElasticsearchEngine::new(config)?, index))
    }
}

impl<E: SearchEngine> Miujsag<E> {
    pub fn new(engine: E, index: impl Into<String>) -> Self {
        Self {
            engine,
            index: index.into(),
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn index_name(&self) -> &str {
        &self.index
    }
}

#[cfg(test)]
mod tests;
