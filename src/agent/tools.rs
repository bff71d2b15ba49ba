//! Tools a chat agent may call mid-step
//!
//! The model asks for a tool by replying with nothing but a JSON object:
//! `{"tool": "web_search", "arguments": {"query": "..."}}` or
//! `{"tool": "retrieve_from_urls", "arguments": {"urls": [...], "query": "..."}}`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capability::retrieval::RetrievalRequest;
use crate::capability::scrape::ScrapeRequest;
use crate::capability::search::SearchRequest;
use crate::capability::{
    truncate, Capability, CapabilityKind, RetryPolicy, SharedRetrieval, SharedScrape, SharedSearch,
};
use crate::error::{Error, Result};

// ─────────────────────────────────────────────────────────────────
// Tool Call Schema
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tool", content = "arguments", rename_all = "snake_case")]
pub enum ToolCall {
    WebSearch(WebSearchArgs),
    RetrieveFromUrls(RetrieveArgs),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WebSearchArgs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrieveArgs {
    pub urls: Vec<String>,
    pub query: String,
}

impl ToolCall {
    pub fn name(&self) -> &'static str {
        match self {
            ToolCall::WebSearch(_) => "web_search",
            ToolCall::RetrieveFromUrls(_) => "retrieve_from_urls",
        }
    }
}

/// Outcome of inspecting a model reply for a tool call
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedReply {
    /// Plain answer
    Text,
    Call(ToolCall),
    /// Looked like a tool call but did not match the schema
    Invalid(String),
}

/// Inspect a reply. Only a reply that is a single JSON object carrying a
/// `tool` key counts as a call; a fenced ```json block is accepted.
pub fn parse_reply(reply: &str) -> ParsedReply {
    let body = strip_fence(reply.trim());
    if !(body.starts_with('{') && body.ends_with('}')) {
        return ParsedReply::Text;
    }

    let value: serde_json::Value = match serde_json::from_str(body) {
        Ok(v) => v,
        Err(_) => return ParsedReply::Text,
    };
    if value.get("tool").is_none() {
        return ParsedReply::Text;
    }

    match serde_json::from_value::<ToolCall>(value) {
        Ok(call) => ParsedReply::Call(call),
        Err(e) => ParsedReply::Invalid(e.to_string()),
    }
}

/// Body of a ```json fenced block, or the text itself
pub(crate) fn strip_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

// ─────────────────────────────────────────────────────────────────
// Tool Box
// ─────────────────────────────────────────────────────────────────

/// Capability handles backing the tools, plus the retrieval character budget
#[derive(Clone)]
pub struct ToolBox {
    search: Option<SharedSearch>,
    scrape: Option<SharedScrape>,
    retrieval: Option<SharedRetrieval>,
    char_budget: usize,
    retry: RetryPolicy,
}

impl ToolBox {
    pub fn new(char_budget: usize, retry: RetryPolicy) -> Self {
        Self {
            search: None,
            scrape: None,
            retrieval: None,
            char_budget,
            retry,
        }
    }

    pub fn with_search(mut self, search: Option<SharedSearch>) -> Self {
        self.search = search;
        self
    }

    pub fn with_scrape(mut self, scrape: Option<SharedScrape>) -> Self {
        self.scrape = scrape;
        self
    }

    pub fn with_retrieval(mut self, retrieval: Option<SharedRetrieval>) -> Self {
        self.retrieval = retrieval;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.search.is_none() && self.scrape.is_none()
    }

    /// Instructions appended to the system prompt of a tool-enabled agent
    pub fn describe(&self) -> String {
        let mut text = String::from(
            "You can use tools. To call a tool, reply with ONLY a JSON object and nothing else, \
             then wait for the tool result.\nAvailable tools:\n",
        );
        if self.search.is_some() {
            text.push_str(
                "- web_search: {\"tool\": \"web_search\", \"arguments\": {\"query\": \"<search terms>\"}}\n",
            );
        }
        if self.scrape.is_some() {
            text.push_str(
                "- retrieve_from_urls: {\"tool\": \"retrieve_from_urls\", \"arguments\": \
                 {\"urls\": [\"<url>\"], \"query\": \"<what to look for>\"}}\n",
            );
        }
        text
    }

    /// Run one tool call and render its result as text for the model
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        match call {
            ToolCall::WebSearch(args) => self.web_search(&args.query).await,
            ToolCall::RetrieveFromUrls(args) => self.retrieve_from_urls(&args.urls, &args.query).await,
        }
    }

    async fn web_search(&self, query: &str) -> Result<String> {
        let search = self
            .search
            .as_ref()
            .ok_or_else(|| Error::unavailable(CapabilityKind::WebSearch, "web search is not configured"))?;

        info!(query = %query, "Tool: web search");
        let hits = self
            .retry
            .run(CapabilityKind::WebSearch, || {
                search.invoke(SearchRequest { query: query.to_string() })
            })
            .await?;

        if hits.is_empty() {
            return Ok(format!("No search results for \"{}\".", query));
        }

        let mut out = format!("Search results for \"{}\":\n", query);
        for (i, hit) in hits.iter().enumerate() {
            out.push_str(&format!("{}. {}\n   {}\n", i + 1, hit.title, hit.url));
            if !hit.snippet.is_empty() {
                out.push_str(&format!("   {}\n", hit.snippet));
            }
        }
        Ok(out)
    }

    async fn retrieve_from_urls(&self, urls: &[String], query: &str) -> Result<String> {
        let scrape = self
            .scrape
            .as_ref()
            .ok_or_else(|| Error::unavailable(CapabilityKind::WebScrape, "web scrape is not configured"))?;

        info!(urls = urls.len(), query = %query, "Tool: retrieve from urls");
        let mut contents = String::new();
        let mut collected = 0;
        for url in urls {
            if collected > self.char_budget {
                debug!(budget = self.char_budget, "Retrieval budget reached, skipping remaining urls");
                break;
            }
            match self
                .retry
                .run(CapabilityKind::WebScrape, || scrape.invoke(ScrapeRequest { url: url.clone() }))
                .await
            {
                Ok(page) => {
                    collected += page.markdown.chars().count() + 2;
                    contents.push_str(&page.markdown);
                    contents.push_str("\n\n");
                }
                Err(e) => warn!(url = %url, error = %e, "Scrape failed, skipping url"),
            }
        }

        if contents.trim().is_empty() {
            return Err(Error::unavailable(
                CapabilityKind::WebScrape,
                "none of the urls could be scraped",
            ));
        }
        let contents = truncate(&contents, self.char_budget).to_string();

        let Some(retrieval) = &self.retrieval else {
            return Ok(contents);
        };

        let passages = self
            .retry
            .run(CapabilityKind::Retrieval, || {
                retrieval.invoke(RetrievalRequest {
                    query: query.to_string(),
                    contents: contents.clone(),
                })
            })
            .await?;

        if passages.is_empty() {
            return Ok(format!("No passages relevant to \"{}\" were found.", query));
        }
        Ok(passages
            .iter()
            .map(|p| format!("[similarity {:.2}]\n{}", p.similarity, p.text))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::Stub;
    use crate::capability::retrieval::RetrievedPassage;
    use crate::capability::scrape::ScrapedPage;
    use crate::capability::search::SearchHit;
    use std::sync::Arc;

    #[test]
    fn test_parse_web_search() {
        let reply = r#"{"tool": "web_search", "arguments": {"query": "non-compete enforceability"}}"#;
        assert_eq!(
            parse_reply(reply),
            ParsedReply::Call(ToolCall::WebSearch(WebSearchArgs {
                query: "non-compete enforceability".into()
            }))
        );
    }

    #[test]
    fn test_parse_fenced_retrieve() {
        let reply = "```json\n{\"tool\": \"retrieve_from_urls\", \"arguments\": {\"urls\": [\"https://a\"], \"query\": \"q\"}}\n```";
        match parse_reply(reply) {
            ParsedReply::Call(ToolCall::RetrieveFromUrls(args)) => assert_eq!(args.urls, vec!["https://a"]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_prose_is_text() {
        assert_eq!(parse_reply("The clause is risky, 3/4."), ParsedReply::Text);
        assert_eq!(parse_reply(r#"{"summary": "no tool key"}"#), ParsedReply::Text);
    }

    #[test]
    fn test_schema_violation_is_invalid() {
        let reply = r#"{"tool": "web_search", "arguments": {"q": "x"}}"#;
        assert!(matches!(parse_reply(reply), ParsedReply::Invalid(_)));
        let reply = r#"{"tool": "delete_everything", "arguments": {}}"#;
        assert!(matches!(parse_reply(reply), ParsedReply::Invalid(_)));
    }

    #[tokio::test]
    async fn test_web_search_renders_hits() {
        let search: SharedSearch = Stub::new(CapabilityKind::WebSearch, |req: &SearchRequest| {
            Ok(vec![SearchHit {
                title: format!("About {}", req.query),
                url: "https://law.example/a".into(),
                snippet: "Courts held...".into(),
            }])
        });
        let tools = ToolBox::new(100, RetryPolicy::none()).with_search(Some(search));
        let out = tools
            .execute(&ToolCall::WebSearch(WebSearchArgs { query: "liability cap".into() }))
            .await
            .unwrap();
        assert!(out.contains("1. About liability cap"));
        assert!(out.contains("https://law.example/a"));
        assert!(out.contains("Courts held..."));
    }

    #[tokio::test]
    async fn test_retrieve_stops_at_budget() {
        let scrape = Stub::new(CapabilityKind::WebScrape, |req: &ScrapeRequest| {
            Ok(ScrapedPage { url: req.url.clone(), markdown: "x".repeat(80) })
        });
        let tools = ToolBox::new(100, RetryPolicy::none()).with_scrape(Some(scrape.clone() as SharedScrape));
        let out = tools
            .execute(&ToolCall::RetrieveFromUrls(RetrieveArgs {
                urls: vec!["https://a".into(), "https://b".into(), "https://c".into()],
                query: "q".into(),
            }))
            .await
            .unwrap();

        assert_eq!(scrape.calls(), 2);
        assert!(out.len() <= 100);
    }

    #[tokio::test]
    async fn test_retrieve_budget_counts_characters() {
        // Three bytes per character; a byte count would stop after one page
        let scrape = Stub::new(CapabilityKind::WebScrape, |req: &ScrapeRequest| {
            Ok(ScrapedPage { url: req.url.clone(), markdown: "条".repeat(40) })
        });
        let tools = ToolBox::new(100, RetryPolicy::none()).with_scrape(Some(scrape.clone() as SharedScrape));
        let out = tools
            .execute(&ToolCall::RetrieveFromUrls(RetrieveArgs {
                urls: vec!["https://a".into(), "https://b".into(), "https://c".into()],
                query: "q".into(),
            }))
            .await
            .unwrap();

        assert_eq!(scrape.calls(), 3);
        assert_eq!(out.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_retrieve_ranks_through_retrieval() {
        let scrape: SharedScrape = Stub::new(CapabilityKind::WebScrape, |req: &ScrapeRequest| {
            Ok(ScrapedPage { url: req.url.clone(), markdown: "indemnity text".into() })
        });
        let retrieval: SharedRetrieval = Stub::new(CapabilityKind::Retrieval, |req: &RetrievalRequest| {
            assert!(req.contents.contains("indemnity text"));
            Ok(vec![RetrievedPassage { text: "indemnity text".into(), similarity: 0.91 }])
        });
        let tools = ToolBox::new(1000, RetryPolicy::none())
            .with_scrape(Some(scrape))
            .with_retrieval(Some(retrieval));
        let out = tools
            .execute(&ToolCall::RetrieveFromUrls(RetrieveArgs {
                urls: vec!["https://a".into()],
                query: "indemnity".into(),
            }))
            .await
            .unwrap();
        assert_eq!(out, "[similarity 0.91]\nindemnity text");
    }

    #[tokio::test]
    async fn test_missing_capability_is_error() {
        let tools = ToolBox::new(100, RetryPolicy::none());
        assert!(tools.is_empty());
        let err = tools
            .execute(&ToolCall::WebSearch(WebSearchArgs { query: "x".into() }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_all_urls_failing_is_error() {
        let scrape: SharedScrape = Stub::new(CapabilityKind::WebScrape, |_: &ScrapeRequest| {
            Err(Error::rejected(CapabilityKind::WebScrape, "blocked"))
        });
        let tools = ToolBox::new(100, RetryPolicy::none()).with_scrape(Some(Arc::clone(&scrape)));
        assert!(tools
            .execute(&ToolCall::RetrieveFromUrls(RetrieveArgs { urls: vec!["https://a".into()], query: "q".into() }))
            .await
            .is_err());
    }
}
