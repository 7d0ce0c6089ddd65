// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::HttpConfig;

/// Thin wrapper around a configured [`reqwest::Client`].
///
/// Knows its own timeout so that elapsed requests surface as
/// [`AppError::Timeout`] rather than a generic transport error.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_secs: u64,
}

/// Create a configured asynchronous HTTP client.
pub fn create_client(config: &HttpConfig) -> Result<HttpClient> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(HttpClient {
        client,
        timeout_secs: config.timeout_secs,
    })
}

impl HttpClient {
    /// Fetch a document as text.
    ///
    /// `file://` URIs are read from the local filesystem.
    pub async fn get_text(&self, uri: &str) -> Result<String> {
        let url = Url::parse(uri)?;
        if url.scheme() == "file" {
            let path = url
                .to_file_path()
                .map_err(|_| AppError::invalid_document(uri, "not a valid file path"))?;
            log::debug!("Reading {}", path.display());
            return Ok(tokio::fs::read_to_string(&path).await?);
        }

        log::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.map_transport(uri, e))?
            .error_for_status()?;
        response.text().await.map_err(|e| self.map_transport(uri, e))
    }

    /// POST an XML document and return the response body.
    ///
    /// A non-success status becomes an [`AppError::Sink`] attributed to `sink`;
    /// server errors are marked retryable.
    pub async fn post_xml(&self, sink: &str, url: &str, xml: String) -> Result<String> {
        log::trace!("POST {} ({} bytes)", url, xml.len());
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(xml)
            .send()
            .await
            .map_err(|e| self.map_transport(url, e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_transport(url, e))?;
        if status.is_success() {
            Ok(body)
        } else if status.is_server_error() {
            Err(AppError::sink_retryable(sink, format!("HTTP {status}: {body}")))
        } else {
            Err(AppError::sink(sink, format!("HTTP {status}: {body}")))
        }
    }

    fn map_transport(&self, url: &str, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout {
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            AppError::Http(error)
        }
    }
}
