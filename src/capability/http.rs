//! Shared HTTP plumbing for capability clients
//!
//! Maps reqwest failures onto the capability error taxonomy:
//! timeouts become `CapabilityTimeout`, transport and status failures become
//! `CapabilityUnavailable`, undecodable bodies become
//! `CapabilityMalformedResponse`.

use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::CapabilityKind;

/// Longest slice of an error body kept in messages
const MAX_ERROR_BODY: usize = 512;

/// How requests authenticate
#[derive(Debug, Clone)]
pub enum Auth {
    None,
    Bearer(Secret),
    Basic { username: String, password: Secret },
}

/// One configured remote endpoint
#[derive(Debug)]
pub struct HttpEndpoint {
    kind: CapabilityKind,
    base_url: String,
    client: Client,
    auth: Auth,
    timeout_secs: u64,
    total_requests: RwLock<u64>,
    failed_requests: RwLock<u64>,
}

impl HttpEndpoint {
    pub fn new(kind: CapabilityKind, base_url: &str, timeout_secs: u64, auth: Auth) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(crate::version::build_info().user_agent())
            .build()
            .map_err(|e| Error::unavailable(kind, format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            auth,
            timeout_secs,
            total_requests: RwLock::new(0),
            failed_requests: RwLock::new(0),
        })
    }

    pub fn kind(&self) -> CapabilityKind {
        self.kind
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join a path onto the base URL
    pub fn url(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Start a request with authentication applied
    pub fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.auth {
            Auth::None => builder,
            Auth::Bearer(token) => builder.bearer_auth(token.expose()),
            Auth::Basic { username, password } => {
                builder.basic_auth(username, Some(password.expose()))
            }
        }
    }

    /// Send and require a success status
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        *self.total_requests.write() += 1;

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                *self.failed_requests.write() += 1;
                return Err(self.transport_error(e));
            }
        };

        let status = response.status();
        trace!(capability = %self.kind, status = status.as_u16(), "Response received");

        if status.is_success() {
            return Ok(response);
        }

        *self.failed_requests.write() += 1;
        let body = response.text().await.unwrap_or_default();
        debug!(capability = %self.kind, status = status.as_u16(), "Capability returned error status");

        Err(Error::CapabilityUnavailable {
            capability: self.kind.to_string(),
            message: format!("HTTP {}: {}", status, truncate(&body, MAX_ERROR_BODY)),
            status: Some(status.as_u16()),
        })
    }

    /// Send and decode a JSON body into `T`
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            Error::malformed(
                self.kind,
                format!(
                    "{} (body: {})",
                    e,
                    truncate(&String::from_utf8_lossy(&bytes), MAX_ERROR_BODY)
                ),
            )
        })
    }

    /// Send and return the raw body
    pub async fn send_bytes(&self, builder: RequestBuilder) -> Result<Vec<u8>> {
        let response = self.send(builder).await?;
        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        Ok(bytes.to_vec())
    }

    pub async fn send_text(&self, builder: RequestBuilder) -> Result<String> {
        let response = self.send(builder).await?;
        response.text().await.map_err(|e| self.transport_error(e))
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::CapabilityTimeout {
                capability: self.kind.to_string(),
                timeout_secs: self.timeout_secs,
            }
        } else if e.is_decode() {
            Error::malformed(self.kind, e.to_string())
        } else {
            Error::CapabilityUnavailable {
                capability: self.kind.to_string(),
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            }
        }
    }

    /// (total, failed) request counters
    pub fn stats(&self) -> (u64, u64) {
        (*self.total_requests.read(), *self.failed_requests.read())
    }
}

/// Cut a string to at most `max` characters
pub fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
