use chrono::{DateTime, Utc};

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::format::format_response;
use crate::models::{SearchRequest, SearchResult};
use crate::query::{build_query, validate_request};

use super::Miujsag;

impl<E: SearchEngine> Miujsag<E> {
    /// Runs `request` with its date window anchored at the current time.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        self.search_at(request, Utc::now())
    }

    pub fn search_at(&self, request: &SearchRequest, now: DateTime<Utc>) -> Result<SearchResult> {
        validate_request(request, now)?;
        let dsl = build_query(request, now);
        let response = self
            .engine
            .query(&self.index, &dsl)
            .map_err(|err| classify_search_failure(&self.index, err))?;

        let result = format_response(&response);
        tracing::debug!(
            index = %self.index,
            query = %request.query,
            skip = request.skip,
            sort = request.sort.as_str(),
            total = result.total,
            returned = result.articles.len(),
            "search completed"
        );
        Ok(result)
    }
}

/// Engine replies split by status: 404 means the index is missing, other 4xx
/// replies reject the query itself, and 5xx replies mean the engine is unable
/// to serve.
fn classify_search_failure(index: &str, err: SearchError) -> SearchError {
    let err = match err {
        SearchError::Engine { status: 404, reason } => SearchError::Schema(format!(
            "index {index} is missing, run ensure_index first: {reason}"
        )),
        SearchError::Engine { status, reason } if status >= 500 => SearchError::Connectivity(
            format!("engine failed with status {status}: {reason}"),
        ),
        SearchError::Engine { status, reason } => {
            SearchError::Query(format!("engine rejected query with status {status}: {reason}"))
        }
        other => other,
    };
    tracing::warn!(index, error = %err, "search failed");
    err
}
