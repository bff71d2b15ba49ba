//! Web scrape client (Firecrawl)

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::config::ScrapeSettings;
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ScrapedPage {
    pub url: String,
    pub markdown: String,
}

#[derive(Debug, Serialize)]
struct ScrapeBody<'a> {
    url: &'a str,
    formats: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct ScrapeResponse {
    success: bool,
    #[serde(default)]
    data: Option<ScrapeData>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScrapeData {
    #[serde(default)]
    markdown: Option<String>,
}

pub struct FirecrawlClient {
    endpoint: HttpEndpoint,
}

impl FirecrawlClient {
    pub fn new(settings: &ScrapeSettings, api_key: &Secret) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::WebScrape,
                &settings.base_url,
                settings.timeout_secs,
                Auth::Bearer(api_key.clone()),
            )?,
        })
    }
}

#[async_trait]
impl Capability for FirecrawlClient {
    type Request = ScrapeRequest;
    type Response = ScrapedPage;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::WebScrape
    }

    async fn invoke(&self, request: ScrapeRequest) -> Result<ScrapedPage> {
        let body = ScrapeBody {
            url: &request.url,
            formats: ["markdown"],
        };
        let url = self.endpoint.url("v1/scrape");
        let response: ScrapeResponse = self
            .endpoint
            .send_json(self.endpoint.request(Method::POST, &url).json(&body))
            .await?;

        if !response.success {
            return Err(Error::rejected(
                CapabilityKind::WebScrape,
                format!(
                    "{}: {}",
                    request.url,
                    response.error.unwrap_or_else(|| "scrape failed".to_string())
                ),
            ));
        }

        let markdown = response
            .data
            .and_then(|d| d.markdown)
            .ok_or_else(|| Error::malformed(CapabilityKind::WebScrape, "response has no data.markdown"))?;

        Ok(ScrapedPage {
            url: request.url,
            markdown,
        })
    }
}
