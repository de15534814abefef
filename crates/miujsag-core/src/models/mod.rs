mod article;
mod search;

pub use article::{Article, Category, IndexableArticle, IndexedCategory, IndexedSite, Site};
pub use search::{
    ArticleSummary, DEFAULT_WINDOW_DAYS, IndexOutcome, SearchRequest, SearchResult, SiteSummary,
    SkipReason, SortMode,
};
