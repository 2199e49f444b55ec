//! HTTP implementation of [`ErpSource`]

pub mod response;

use async_trait::async_trait;
use erpdash_config::Config;
use erpdash_core::{CoreError, CoreResult, DocumentUpload, ErpSource, Method, Record, Resource};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::time::Duration;

use crate::response::{api_error, parse_body, parse_list};

/// Upper bound on `next` links followed for one listing
pub const MAX_LIST_PAGES: usize = 500;

/// Client for the upstream ERP REST API
#[derive(Debug, Clone)]
pub struct HttpErpSource {
    client: reqwest::Client,
    base_url: String,
    follow_pagination: bool,
}

impl HttpErpSource {
    /// Build a client from the upstream section of the config
    pub fn from_config(config: &Config) -> CoreResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.upstream.timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url(),
            follow_pagination: config.upstream.follow_pagination,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a relative API path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
            Method::Patch => self.client.patch(url),
            Method::Delete => self.client.delete(url),
        }
    }

    /// Send a request and return the body of a success response
    async fn execute(&self, method: Method, url: &str, builder: reqwest::RequestBuilder) -> CoreResult<Value> {
        log::debug!(target: "erpdash::client", "{} {}", method, url);

        let response = builder.send().await.map_err(|e| {
            log::warn!(target: "erpdash::client", "{} {} failed: {}", method, url, e);
            CoreError::Network {
                message: if e.is_timeout() {
                    format!("Request to {} timed out", url)
                } else {
                    e.to_string()
                },
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Network {
            message: format!("Failed to read response body: {}", e),
        })?;

        if !status.is_success() {
            let error = api_error(status.as_u16(), &body);
            log::warn!(target: "erpdash::client", "{} {} returned {}: {}", method, url, status, error);
            return Err(error);
        }

        parse_body(&body)
    }
}

#[async_trait]
impl ErpSource for HttpErpSource {
    async fn list(&self, resource: Resource, query: &[(String, String)]) -> CoreResult<Vec<Record>> {
        let first = self.url(resource.path());
        let body = self
            .execute(Method::Get, &first, self.client.get(&first).query(query))
            .await?;
        let mut page = parse_list(body)?;
        let mut records = std::mem::take(&mut page.records);
        let mut seen = vec![first];

        while let Some(next) = page.next.take().filter(|_| self.follow_pagination) {
            if seen.contains(&next) || seen.len() >= MAX_LIST_PAGES {
                log::warn!(
                    target: "erpdash::client",
                    "Stopped following {} pagination at {}",
                    resource.label(),
                    next
                );
                break;
            }
            // next links already carry the query string
            let body = self.execute(Method::Get, &next, self.client.get(&next)).await?;
            page = parse_list(body)?;
            records.append(&mut page.records);
            seen.push(next);
        }

        log::debug!(target: "erpdash::client", "Loaded {} {}", records.len(), resource.label());
        Ok(records)
    }

    async fn fetch(&self, path: &str, query: &[(String, String)]) -> CoreResult<Value> {
        let url = self.url(path);
        self.execute(Method::Get, &url, self.client.get(&url).query(query))
            .await
    }

    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> CoreResult<Value> {
        let url = self.url(path);
        let builder = match body {
            Some(ref json) => self.request(method, &url).json(json),
            None => self.request(method, &url),
        };
        self.execute(method, &url, builder).await
    }

    async fn upload(
        &self,
        method: Method,
        path: &str,
        fields: Vec<(String, String)>,
        document: Option<DocumentUpload>,
    ) -> CoreResult<Value> {
        let url = self.url(path);
        let mut form = Form::new();
        for (name, value) in fields {
            form = form.text(name, value);
        }
        if let Some(document) = document {
            let mut part = Part::bytes(document.bytes).file_name(document.file_name);
            if let Some(content_type) = document.content_type {
                part = part.mime_str(&content_type).map_err(|e| CoreError::Validation {
                    message: format!("Invalid document content type: {}", e),
                })?;
            }
            form = form.part("document", part);
        }
        self.execute(method, &url, self.request(method, &url).multipart(form))
            .await
    }
}
