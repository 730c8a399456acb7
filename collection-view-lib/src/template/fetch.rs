//! Template definition retrieval

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::TemplateDefinition;
use crate::error::FetchError;

/// Source of template definitions.
///
/// Implementations perform the actual retrieval; deduplication and storage
/// are handled by [`TemplateCache`](super::TemplateCache).
#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    /// Retrieves the definition for `name`.
    async fn fetch(&self, name: &str) -> Result<TemplateDefinition, FetchError>;

    /// Retrieves the definition for `name` without suspending.
    ///
    /// Used by call sites that cannot await, such as synchronous size
    /// queries. Must not be called from inside an async task.
    fn fetch_blocking(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        Err(FetchError::BlockingUnsupported(name.to_string()))
    }
}

/// Fetches template definitions from an HTTP server.
///
/// Definitions are requested with `GET {base}/{prefix}/{name}` using JSON
/// headers, with the name percent-encoded.
///
/// # Example
///
/// ```ignore
/// use collection_view_lib::template::HttpTemplateFetcher;
///
/// let fetcher = HttpTemplateFetcher::new("https://host/Thingworx")?
///     .with_header("appKey", "secret")
///     .with_timeout(Duration::from_secs(10));
/// ```
#[derive(Debug, Clone)]
pub struct HttpTemplateFetcher {
    base_url: Url,
    path_prefix: String,
    headers: Vec<(String, String)>,
    http_client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpTemplateFetcher {
    /// Creates a fetcher for the given server base URL.
    pub fn new(base_url: &str) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(base_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self {
            base_url,
            path_prefix: "Mashups".to_string(),
            headers: Vec::new(),
            http_client: reqwest::Client::new(),
            timeout: None,
        })
    }

    /// Sets the path segment between the base URL and the template name.
    ///
    /// Default: `Mashups`
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = prefix.into();
        self
    }

    /// Adds a header sent with every request (session keys, cookies).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the URL a definition is requested from.
    pub fn definition_url(&self, name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            self.path_prefix.trim_matches('/'),
            urlencoding::encode(name)
        )
    }

    fn fetch_with_blocking_client(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        let client = reqwest::blocking::Client::new();
        let mut request = client
            .get(self.definition_url(name))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().map_err(|e| FetchError::network(name, e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| FetchError::network(name, e))?;
        parse_definition(name, status, &body)
    }
}

#[async_trait]
impl TemplateFetcher for HttpTemplateFetcher {
    async fn fetch(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        let url = self.definition_url(name);
        debug!("Fetching template '{}' from {}", name, url);

        let mut request = self
            .http_client
            .get(&url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json");
        for (key, value) in &self.headers {
            request = request.header(key.as_str(), value.as_str());
        }
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|e| FetchError::network(name, e))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| FetchError::network(name, e))?;
        parse_definition(name, status, &body)
    }

    fn fetch_blocking(&self, name: &str) -> Result<TemplateDefinition, FetchError> {
        self.fetch_with_blocking_client(name)
    }
}

/// Turns a raw server response into a definition.
///
/// Payloads that omit the name get the requested one.
pub(crate) fn parse_definition(name: &str, status: u16, body: &str) -> Result<TemplateDefinition, FetchError> {
    match status {
        200..=299 => {}
        404 => return Err(FetchError::NotFound(name.to_string())),
        _ => return Err(FetchError::http(name, status)),
    }

    let mut definition: TemplateDefinition =
        serde_json::from_str(body).map_err(|e| FetchError::parse(name, e))?;
    if definition.name.is_empty() {
        definition.name = name.to_string();
    }
    Ok(definition)
}
