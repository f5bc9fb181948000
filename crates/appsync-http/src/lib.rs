//! JSON-over-HTTP plumbing shared by the workspace and inventory clients.

use std::time::Duration;

use appsync_core::RecordError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

pub const CRATE_NAME: &str = "appsync-http";

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub user_agent: Option<String>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            user_agent: None,
        }
    }
}

/// Failure talking to either catalog. Any of these aborts the fetch phase of
/// a sync; during the apply phase they are recorded against a single item.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("http status {status} for {url}: {body}")]
    HttpStatus {
        status: u16,
        url: String,
        body: String,
    },
    #[error("unexpected response shape from {url}: {source}")]
    Schema {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),
}

impl CatalogError {
    pub fn status(&self) -> Option<u16> {
        match self {
            CatalogError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authenticated client for one base URL. Every request carries a bearer
/// token plus whatever fixed headers the API demands.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        bearer_token: &str,
        extra_headers: &[(&str, &str)],
        config: &HttpClientConfig,
    ) -> Result<Self, CatalogError> {
        let mut builder = reqwest::Client::builder()
            .gzip(true)
            .brotli(true)
            .timeout(config.timeout);
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build()?;
        Self::with_http_client(base_url, bearer_token, extra_headers, client)
    }

    /// Use a preconfigured reqwest client; auth headers are still applied
    /// per request.
    pub fn with_http_client(
        base_url: impl Into<String>,
        bearer_token: &str,
        extra_headers: &[(&str, &str)],
        client: reqwest::Client,
    ) -> Result<Self, CatalogError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(CatalogError::InvalidConfig("empty base url".to_string()));
        }

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {bearer_token}"))
            .map_err(|_| CatalogError::InvalidConfig("api key is not a valid header value".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        for (name, value) in extra_headers {
            let value = HeaderValue::from_str(value).map_err(|_| {
                CatalogError::InvalidConfig(format!("invalid value for header {name}"))
            })?;
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| CatalogError::InvalidConfig(format!("invalid header name {name}")))?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            base_url,
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let url = self.url(path);
        let body = self.execute(Method::GET, &url, |r| r).await?;
        decode(&url, &body)
    }

    pub async fn get_json_query<T, Q>(&self, path: &str, query: &Q) -> Result<T, CatalogError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let url = self.url(path);
        let body = self.execute(Method::GET, &url, |r| r.query(query)).await?;
        decode(&url, &body)
    }

    pub async fn post_json<B, T>(&self, path: &str, payload: &B) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, payload).await
    }

    pub async fn put_json<B, T>(&self, path: &str, payload: &B) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, payload).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, payload: &B) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, payload).await
    }

    /// Response body is ignored; any 2xx counts as success.
    pub async fn delete(&self, path: &str) -> Result<(), CatalogError> {
        let url = self.url(path);
        self.execute(Method::DELETE, &url, |r| r).await?;
        Ok(())
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, payload: &B) -> Result<T, CatalogError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let body = self.execute(method, &url, |r| r.json(payload)).await?;
        decode(&url, &body)
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        build: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<String, CatalogError> {
        debug!(%method, url, "catalog request");
        let request = build(
            self.client
                .request(method.clone(), url)
                .headers(self.headers.clone()),
        );
        let resp = request.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            debug!(%method, url, status = status.as_u16(), "catalog request rejected");
            return Err(CatalogError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }
        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, CatalogError> {
    serde_json::from_str(body).map_err(|source| CatalogError::Schema {
        url: url.to_string(),
        source,
    })
}
