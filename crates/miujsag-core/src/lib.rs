// Public fallible APIs in this crate share one concrete error contract (`SearchError`).
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod config;
pub mod engine;
pub mod error;
pub mod format;
pub mod logging;
pub mod models;
pub mod normalize;
pub mod query;
pub mod schema;
pub(crate) mod text;

pub use client::Miujsag;
pub use engine::{ElasticsearchEngine, InMemoryEngine, SearchEngine};
pub use error::{Result, SearchError};
pub use logging::init_logging;
