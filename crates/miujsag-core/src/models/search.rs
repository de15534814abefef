use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SearchError;

pub const DEFAULT_WINDOW_DAYS: i64 = 7;

/// Deserializes through [`FromStr`], so payloads accept the same aliases as
/// the parser.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum SortMode {
    #[default]
    Relevance,
    Date,
}

impl SortMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::Date => "date",
        }
    }
}

impl TryFrom<String> for SortMode {
    type Error = SearchError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl FromStr for SortMode {
    type Err = SearchError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "relevance" | "score" | "_score" => Ok(Self::Relevance),
            "date" => Ok(Self::Date),
            other => Err(SearchError::Query(format!(
                "unknown sort mode: {other} (expected relevance|date)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default)]
    pub sites: BTreeSet<i64>,
    #[serde(default)]
    pub categories: BTreeSet<i64>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub skip: usize,
    #[serde(default)]
    pub sort: SortMode,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            sites: BTreeSet::new(),
            categories: BTreeSet::new(),
            from: None,
            until: None,
            skip: 0,
            sort: SortMode::default(),
        }
    }

    #[must_use]
    pub fn with_sites(mut self, sites: impl IntoIterator<Item = i64>) -> Self {
        self.sites = sites.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = i64>) -> Self {
        self.categories = categories.into_iter().collect();
        self
    }

    #[must_use]
    pub fn between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self.until = Some(until);
        self
    }

    #[must_use]
    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    #[must_use]
    pub fn sorted_by(mut self, sort: SortMode) -> Self {
        self.sort = sort;
        self
    }

    /// Resolves the date window against `now`: missing bounds become the
    /// trailing [`DEFAULT_WINDOW_DAYS`] ending at `now`.
    #[must_use]
    pub fn window(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let until = self.until.unwrap_or(now);
        let from = self
            .from
            .unwrap_or_else(|| until - chrono::Duration::days(DEFAULT_WINDOW_DAYS));
        (from, until)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub total: u64,
    pub articles: Vec<ArticleSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleSummary {
    pub title: String,
    pub url: String,
    pub description: String,
    pub estimated_read_time: Option<u32>,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(rename = "Site")]
    pub site: SiteSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteSummary {
    pub name: String,
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyExists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum IndexOutcome {
    Inserted,
    Skipped(SkipReason),
}

impl IndexOutcome {
    #[must_use]
    pub const fn is_inserted(self) -> bool {
        matches!(self, Self::Inserted)
    }
}
