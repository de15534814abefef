use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::config::{ElasticsearchConfig, EngineAuth};
use crate::error::{Result, SearchError};
use crate::text::truncate_text;

use super::SearchEngine;

const MAX_REASON_CHARS: usize = 240;

#[derive(Clone)]
pub struct ElasticsearchEngine {
    config: ElasticsearchConfig,
    base: Url,
    http: Client,
}

impl std::fmt::Debug for ElasticsearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchEngine")
            .field("base_url", &self.config.base_url)
            .field("index", &self.config.index)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchEngine {
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let base = Url::parse(&config.base_url).map_err(|e| {
            SearchError::Validation(format!("invalid engine url {}: {e}", config.base_url))
        })?;
        if base.cannot_be_a_base() {
            return Err(SearchError::Validation(format!(
                "engine url cannot carry paths: {}",
                config.base_url
            )));
        }

        let mut headers = HeaderMap::new();
        if let Some(EngineAuth::ApiKey(key)) = &config.auth {
            let mut value = HeaderValue::from_str(&format!("ApiKey {key}")).map_err(|e| {
                SearchError::Validation(format!("invalid MIUJSAG_ELASTICSEARCH_API_KEY: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self { config, base, http })
    }

    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    pub fn health(&self) -> Result<bool> {
        let resp = self.request(Method::GET, &[])?.send()?;
        Ok(resp.status().is_success())
    }

    pub fn server_version(&self) -> Result<Option<String>> {
        let resp = self.request(Method::GET, &[])?.send()?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let value = resp.json::<Value>()?;
        Ok(value
            .pointer("/version/number")
            .and_then(Value::as_str)
            .map(ToString::to_string))
    }

    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| {
                SearchError::Validation(format!(
                    "engine url cannot carry paths: {}",
                    self.config.base_url
                ))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let builder = self.http.request(method, url);
        Ok(match &self.config.auth {
            Some(EngineAuth::Basic { username, password }) => {
                builder.basic_auth(username, Some(password))
            }
            _ => builder,
        })
    }
}

impl SearchEngine for ElasticsearchEngine {
    fn exists(&self, index: &str) -> Result<bool> {
        let resp = self.request(Method::HEAD, &[index])?.send()?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(engine_error(resp)),
        }
    }

    fn create_index(&self, index: &str, schema: &Value) -> Result<()> {
        let resp = self.request(Method::PUT, &[index])?.json(schema).send()?;
        ensure_success(resp)
    }

    fn delete_index(&self, index: &str, ignore_missing: bool) -> Result<()> {
        let resp = self.request(Method::DELETE, &[index])?.send()?;
        if ignore_missing && resp.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        ensure_success(resp)
    }

    fn upsert(&self, index: &str, id: &str, body: &Value) -> Result<()> {
        let resp = self
            .request(Method::PUT, &[index, "_doc", id])?
            .query(&[("refresh", "wait_for")])
            .json(body)
            .send()?;
        ensure_success(resp)
    }

    fn query(&self, index: &str, dsl: &Value) -> Result<Value> {
        let resp = self
            .request(Method::POST, &[index, "_search"])?
            .json(dsl)
            .send()?;
        if !resp.status().is_success() {
            return Err(engine_error(resp));
        }
        Ok(resp.json::<Value>()?)
    }
}

fn ensure_success(resp: Response) -> Result<()> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(engine_error(resp))
    }
}

fn engine_error(resp: Response) -> SearchError {
    let status = resp.status().as_u16();
    let body = resp.text().unwrap_or_default();
    SearchError::Engine {
        status,
        reason: error_reason(&body),
    }
}

/// Extracts `type: reason` from an engine error body, falling back to the raw text.
pub(crate) fn error_reason(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().and_then(|value| value.get("error"));
    match error {
        Some(Value::String(message)) => message.clone(),
        Some(error) => {
            let kind = error.get("type").and_then(Value::as_str);
            let reason = error.get("reason").and_then(Value::as_str);
            match (kind, reason) {
                (Some(kind), Some(reason)) => format!("{kind}: {reason}"),
                (Some(kind), None) => kind.to_string(),
                (None, Some(reason)) => reason.to_string(),
                (None, None) => truncate_text(&error.to_string(), MAX_REASON_CHARS),
            }
        }
        None if body.trim().is_empty() => "empty response body".to_string(),
        None => truncate_text(body.trim(), MAX_REASON_CHARS),
    }
}
