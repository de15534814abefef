use crate::error::{Result, SearchError};

mod env;

pub const ENV_ELASTICSEARCH_URL: &str = "MIUJSAG_ELASTICSEARCH_URL";
pub const ENV_INDEX: &str = "MIUJSAG_INDEX";
pub const ENV_TIMEOUT_MS: &str = "MIUJSAG_ELASTICSEARCH_TIMEOUT_MS";
pub const ENV_USERNAME: &str = "MIUJSAG_ELASTICSEARCH_USERNAME";
pub const ENV_PASSWORD: &str = "MIUJSAG_ELASTICSEARCH_PASSWORD";
pub const ENV_API_KEY: &str = "MIUJSAG_ELASTICSEARCH_API_KEY";
pub const ENV_LOG: &str = "MIUJSAG_LOG";

pub const DEFAULT_INDEX: &str = "miujsag";
pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineAuth {
    Basic { username: String, password: String },
    ApiKey(String),
}

#[derive(Clone, PartialEq, Eq)]
pub struct ElasticsearchConfig {
    pub base_url: String,
    pub index: String,
    pub timeout_ms: u64,
    pub auth: Option<EngineAuth>,
}

impl std::fmt::Debug for ElasticsearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchConfig")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .field("timeout_ms", &self.timeout_ms)
            .field("auth", &self.auth.as_ref().map(auth_kind))
            .finish()
    }
}

impl ElasticsearchConfig {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: env::normalize_base_url(base_url),
            index: DEFAULT_INDEX.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            auth: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let base_url = env::non_empty(lookup(ENV_ELASTICSEARCH_URL))
            .ok_or_else(|| SearchError::Validation(format!("{ENV_ELASTICSEARCH_URL} is not set")))?;
        let index = env::non_empty(lookup(ENV_INDEX)).unwrap_or_else(|| DEFAULT_INDEX.to_string());
        let timeout_ms = env::parse_u64_at_least(
            lookup(ENV_TIMEOUT_MS).as_deref(),
            DEFAULT_TIMEOUT_MS,
            1,
        );

        let api_key = env::non_empty(lookup(ENV_API_KEY));
        let username = env::non_empty(lookup(ENV_USERNAME));
        let password = lookup(ENV_PASSWORD).filter(|value| !value.is_empty());
        let auth = match (api_key, username, password) {
            (Some(key), _, _) => Some(EngineAuth::ApiKey(key)),
            (None, Some(username), Some(password)) => Some(EngineAuth::Basic { username, password }),
            _ => None,
        };

        Ok(Self {
            base_url: env::normalize_base_url(&base_url),
            index,
            timeout_ms,
            auth,
        })
    }
}

fn auth_kind(auth: &EngineAuth) -> &'static str {
    match auth {
        EngineAuth::Basic { .. } => "basic",
        EngineAuth::ApiKey(_) => "api-key",
    }
}

#[must_use]
pub fn log_filter_from_env() -> Option<String> {
    env::non_empty(std::env::var(ENV_LOG).ok())
}
