//! Web search client
//!
//! Google Custom Search when a key and engine id are configured, otherwise
//! the DuckDuckGo HTML endpoint (no key) parsed with `scraper`.

use async_trait::async_trait;
use reqwest::Method;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SearchSettings;
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub snippet: String,
}

enum Engine {
    Google { api_key: Secret, engine_id: String },
    DuckDuckGo,
}

pub struct WebSearchClient {
    endpoint: HttpEndpoint,
    engine: Engine,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct GoogleResponse {
    #[serde(default)]
    items: Vec<GoogleItem>,
}

#[derive(Debug, Deserialize)]
struct GoogleItem {
    #[serde(default)]
    title: String,
    link: String,
    #[serde(default)]
    snippet: String,
}

impl WebSearchClient {
    pub fn google(settings: &SearchSettings, api_key: &Secret, engine_id: &Secret) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::WebSearch,
                &settings.google_url,
                settings.timeout_secs,
                Auth::None,
            )?,
            engine: Engine::Google {
                api_key: api_key.clone(),
                engine_id: engine_id.expose().to_string(),
            },
            max_results: settings.max_results,
        })
    }

    pub fn duckduckgo(settings: &SearchSettings) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::WebSearch,
                &settings.duckduckgo_url,
                settings.timeout_secs,
                Auth::None,
            )?,
            engine: Engine::DuckDuckGo,
            max_results: settings.max_results,
        })
    }

    pub fn engine_name(&self) -> &'static str {
        match self.engine {
            Engine::Google { .. } => "google",
            Engine::DuckDuckGo => "duckduckgo",
        }
    }

    async fn search_google(&self, api_key: &Secret, engine_id: &str, query: &str) -> Result<Vec<SearchHit>> {
        let num = self.max_results.min(10).to_string();
        let builder = self
            .endpoint
            .request(Method::GET, self.endpoint.base_url())
            .query(&[
                ("key", api_key.expose()),
                ("cx", engine_id),
                ("q", query),
                ("num", num.as_str()),
            ]);
        let response: GoogleResponse = self.endpoint.send_json(builder).await?;

        Ok(response
            .items
            .into_iter()
            .take(self.max_results)
            .map(|item| SearchHit {
                title: item.title,
                url: item.link,
                snippet: item.snippet,
            })
            .collect())
    }

    async fn search_duckduckgo(&self, query: &str) -> Result<Vec<SearchHit>> {
        let builder = self
            .endpoint
            .request(Method::GET, self.endpoint.base_url())
            .query(&[("q", query)]);
        let html = self.endpoint.send_text(builder).await?;
        parse_duckduckgo(&html, self.max_results)
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::Internal(format!("Invalid selector '{}': {}", css, e)))
}

/// Extract result links from the DuckDuckGo HTML page
fn parse_duckduckgo(html: &str, max_results: usize) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);
    let result_sel = selector("div.result")?;
    let link_sel = selector("a.result__a")?;
    let snippet_sel = selector(".result__snippet")?;

    let mut hits = Vec::new();
    for result in document.select(&result_sel) {
        let Some(link) = result.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(url) = resolve_duckduckgo_href(href) else {
            continue;
        };

        let title = link.text().collect::<String>().trim().to_string();
        let snippet = result
            .select(&snippet_sel)
            .next()
            .map(|s| s.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        hits.push(SearchHit { title, url, snippet });
        if hits.len() >= max_results {
            break;
        }
    }

    if hits.is_empty() && !html.contains("result") {
        return Err(Error::malformed(
            CapabilityKind::WebSearch,
            "search page contained no result markup",
        ));
    }

    Ok(hits)
}

/// DuckDuckGo wraps targets as `//duckduckgo.com/l/?uddg=<encoded>`
fn resolve_duckduckgo_href(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = url::Url::parse(&absolute).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(k, _)| k == "uddg")
            .map(|(_, v)| v.into_owned());
    }

    match parsed.scheme() {
        "http" | "https" => Some(parsed.to_string()),
        _ => None,
    }
}

#[async_trait]
impl Capability for WebSearchClient {
    type Request = SearchRequest;
    type Response = Vec<SearchHit>;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::WebSearch
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.engine_name(), self.endpoint.base_url())
    }

    async fn invoke(&self, request: SearchRequest) -> Result<Vec<SearchHit>> {
        let hits = match &self.engine {
            Engine::Google { api_key, engine_id } => {
                self.search_google(api_key, engine_id, &request.query).await?
            }
            Engine::DuckDuckGo => self.search_duckduckgo(&request.query).await?,
        };
        debug!(engine = self.engine_name(), query = %request.query, hits = hits.len(), "Search completed");
        Ok(hits)
    }
}
