use serde_json::Value;

use crate::engine::SearchEngine;
use crate::error::{Result, SearchError};
use crate::models::{Article, Category, IndexOutcome, Site, SkipReason};
use crate::normalize::normalize;
use crate::query::build_url_lookup_query;

use super::Miujsag;

impl<E: SearchEngine> Miujsag<E> {
    /// Stores `article` under its id unless a document with the same url exists.
    ///
    /// The lookup and the write are two separate engine calls, so concurrent
    /// submissions of one url may both be inserted.
    pub fn index_document(
        &self,
        article: &Article,
        site: &Site,
        category: &Category,
    ) -> Result<IndexOutcome> {
        self.try_index_document(article, site, category)
            .map_err(|err| {
                tracing::warn!(
                    index = %self.index,
                    document_id = %article.id,
                    url = %article.url,
                    error = %err,
                    "indexing failed"
                );
                SearchError::indexing(&article.id, err)
            })
    }

    fn try_index_document(
        &self,
        article: &Article,
        site: &Site,
        category: &Category,
    ) -> Result<IndexOutcome> {
        validate_article(article)?;

        if self.url_already_indexed(&article.url)? {
            tracing::debug!(
                index = %self.index,
                document_id = %article.id,
                url = %article.url,
                "url already indexed, skipping"
            );
            return Ok(IndexOutcome::Skipped(SkipReason::AlreadyExists));
        }

        let body = serde_json::to_value(normalize(article, site, category))?;
        self.engine.upsert(&self.index, &article.id, &body)?;
        tracing::info!(
            index = %self.index,
            document_id = %article.id,
            url = %article.url,
            "document indexed"
        );
        Ok(IndexOutcome::Inserted)
    }

    fn url_already_indexed(&self, url: &str) -> Result<bool> {
        let response = self
            .engine
            .query(&self.index, &build_url_lookup_query(url))?;
        Ok(lookup_hit_count(&response) > 0)
    }
}

fn validate_article(article: &Article) -> Result<()> {
    if article.id.trim().is_empty() {
        return Err(SearchError::Validation(
            "document id must not be empty".to_string(),
        ));
    }
    if article.url.trim().is_empty() {
        return Err(SearchError::Validation(
            "document url must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn lookup_hit_count(response: &Value) -> u64 {
    let returned = response
        .pointer("/hits/hits")
        .and_then(Value::as_array)
        .map_or(0, Vec::len) as u64;
    let total = response.pointer("/hits/total").and_then(|total| {
        total
            .as_u64()
            .or_else(|| total.get("value").and_then(Value::as_u64))
    });
    total.unwrap_or(0).max(returned)
}
