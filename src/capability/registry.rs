//! Capability registry
//!
//! Builds every client the pipeline needs from configuration plus explicit
//! credentials. Required capabilities fail construction when their
//! credential is missing; optional ones are left out with a recorded reason.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{AdvisorConfig, ModelSettings, SearchProvider};
use crate::credentials::{CredentialKey, Credentials};
use crate::error::{Error, Result};

use super::completion::ChatCompletionClient;
use super::extraction::ChunkrClient;
use super::graph::Neo4jClient;
use super::retrieval::EmbeddingRetriever;
use super::scrape::FirecrawlClient;
use super::search::WebSearchClient;
use super::speech::FishAudioClient;
use super::traits::*;

/// Optional capability slots, used as keys for unavailability reasons
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Summarizer,
    Knowledge,
    Scrape,
    Search,
    Retrieval,
    Graph,
    Speech,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Summarizer => "summarizer",
            Slot::Knowledge => "knowledge model",
            Slot::Scrape => "web scrape",
            Slot::Search => "web search",
            Slot::Retrieval => "retrieval",
            Slot::Graph => "graph store",
            Slot::Speech => "speech synthesis",
        }
    }
}

/// Every capability handle for one run
#[derive(Clone)]
pub struct Capabilities {
    pub extraction: SharedExtraction,
    pub analyst: SharedCompletion,
    pub evaluator: SharedCompletion,
    pub summarizer: Option<SharedCompletion>,
    pub knowledge: Option<SharedCompletion>,
    pub scrape: Option<SharedScrape>,
    pub search: Option<SharedSearch>,
    pub retrieval: Option<SharedRetrieval>,
    pub graph: Option<SharedGraph>,
    pub speech: Option<SharedSpeech>,
    unavailable: HashMap<Slot, String>,
}

impl Capabilities {
    /// Registry with only the required capabilities
    pub fn new(extraction: SharedExtraction, analyst: SharedCompletion, evaluator: SharedCompletion) -> Self {
        Self {
            extraction,
            analyst,
            evaluator,
            summarizer: None,
            knowledge: None,
            scrape: None,
            search: None,
            retrieval: None,
            graph: None,
            speech: None,
            unavailable: HashMap::new(),
        }
    }

    pub fn from_config(config: &AdvisorConfig, credentials: &Credentials) -> Result<Self> {
        let extraction: SharedExtraction = Arc::new(ChunkrClient::new(
            &config.extraction,
            credentials.require(CredentialKey::Chunkr, "document extraction")?,
        )?);
        let analyst = completion(config, &config.models.analyst, credentials, "contract analyst")?;
        let evaluator = completion(config, &config.models.evaluator, credentials, "risk evaluators")?;

        let mut caps = Self::new(extraction, analyst, evaluator);
        caps.log_built("document extraction", caps.extraction.describe());

        caps.summarizer = caps.optional(Slot::Summarizer, || {
            completion(config, &config.models.summarizer, credentials, "summarizer")
        });
        caps.knowledge = caps.optional(Slot::Knowledge, || {
            completion(config, &config.models.knowledge, credentials, "knowledge research")
        });
        caps.scrape = caps.optional(Slot::Scrape, || {
            let key = credentials.require(CredentialKey::Firecrawl, "web scrape")?;
            Ok(Arc::new(FirecrawlClient::new(&config.scrape, key)?) as SharedScrape)
        });
        caps.search = caps.optional(Slot::Search, || search_client(config, credentials));
        caps.retrieval = caps.optional(Slot::Retrieval, || {
            let provider = config.retrieval.provider;
            let key = credentials.require(CredentialKey::for_provider(provider), "retrieval embeddings")?;
            Ok(Arc::new(EmbeddingRetriever::new(
                config.providers.get(provider),
                &config.retrieval,
                key,
            )?) as SharedRetrieval)
        });

        if config.graph.enabled {
            caps.graph = caps.optional(Slot::Graph, || {
                let username = credentials.require(CredentialKey::Neo4jUsername, "graph store")?;
                let password = credentials.require(CredentialKey::Neo4jPassword, "graph store")?;
                Ok(Arc::new(Neo4jClient::new(&config.graph, username, password)?) as SharedGraph)
            });
        } else {
            caps.mark_unavailable(Slot::Graph, "disabled in configuration");
        }

        if config.speech.enabled {
            caps.speech = caps.optional(Slot::Speech, || {
                let key = credentials.require(CredentialKey::FishAudio, "speech synthesis")?;
                Ok(Arc::new(FishAudioClient::new(&config.speech, key)?) as SharedSpeech)
            });
        } else {
            caps.mark_unavailable(Slot::Speech, "disabled in configuration");
        }

        Ok(caps)
    }

    fn optional<T, F>(&mut self, slot: Slot, build: F) -> Option<T>
    where
        F: FnOnce() -> Result<T>,
    {
        match build() {
            Ok(handle) => {
                self.log_built(slot.name(), String::new());
                Some(handle)
            }
            Err(e) => {
                let reason = match &e {
                    Error::MissingCredential { variable, .. } => format!("{} not set", variable),
                    other => other.to_string(),
                };
                warn!(capability = slot.name(), reason = %reason, "Optional capability unavailable");
                self.mark_unavailable(slot, reason);
                None
            }
        }
    }

    fn log_built(&self, name: &str, detail: String) {
        info!(capability = name, detail = %detail, "Capability ready");
    }

    pub fn mark_unavailable(&mut self, slot: Slot, reason: impl Into<String>) {
        self.unavailable.insert(slot, reason.into());
    }

    /// Why an optional capability is absent
    pub fn unavailable_reason(&self, slot: Slot) -> String {
        self.unavailable
            .get(&slot)
            .map(|r| format!("{} unavailable: {}", slot.name(), r))
            .unwrap_or_else(|| format!("{} not configured", slot.name()))
    }
}

fn completion(
    config: &AdvisorConfig,
    model: &ModelSettings,
    credentials: &Credentials,
    role: &str,
) -> Result<SharedCompletion> {
    let key = credentials.require(CredentialKey::for_provider(model.provider), role)?;
    let client = ChatCompletionClient::new(config.providers.get(model.provider), model, key)?;
    Ok(Arc::new(client))
}

/// Google when fully configured, DuckDuckGo otherwise
fn search_client(config: &AdvisorConfig, credentials: &Credentials) -> Result<SharedSearch> {
    if config.search.provider == SearchProvider::Google {
        match (
            credentials.get(CredentialKey::GoogleApi),
            credentials.get(CredentialKey::SearchEngineId),
        ) {
            (Some(key), Some(engine)) => {
                return Ok(Arc::new(WebSearchClient::google(&config.search, key, engine)?));
            }
            _ => warn!("Google search selected without GOOGLE_API_KEY and SEARCH_ENGINE_ID, using DuckDuckGo"),
        }
    }
    Ok(Arc::new(WebSearchClient::duckduckgo(&config.search)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds(pairs: &[(&str, &str)]) -> Credentials {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Credentials::from_lookup(move |name| {
            owned.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone())
        })
    }

    #[test]
    fn test_missing_required_credential_fails() {
        let config = AdvisorConfig::default();
        let err = Capabilities::from_config(&config, &creds(&[("OPENAI_API_KEY", "sk")])).err().unwrap();
        assert!(matches!(err, Error::MissingCredential { variable: "CHUNKR_API_KEY", .. }));
    }

    #[test]
    fn test_optional_capabilities_recorded_when_missing() {
        let config = AdvisorConfig::default();
        let caps = Capabilities::from_config(
            &config,
            &creds(&[("CHUNKR_API_KEY", "ck"), ("OPENAI_API_KEY", "sk"), ("QWEN_API_KEY", "qk")]),
        )
        .unwrap();

        assert!(caps.summarizer.is_some());
        assert!(caps.knowledge.is_none());
        assert!(caps.search.is_some());
        assert!(caps.speech.is_none());
        assert!(caps.unavailable_reason(Slot::Speech).contains("FISHAUDIO_API_KEY"));
        assert!(caps.unavailable_reason(Slot::Knowledge).contains("MISTRAL_API_KEY"));
    }

    #[test]
    fn test_disabled_graph_is_recorded() {
        let mut config = AdvisorConfig::default();
        config.graph.enabled = false;
        let caps = Capabilities::from_config(
            &config,
            &creds(&[
                ("CHUNKR_API_KEY", "ck"),
                ("OPENAI_API_KEY", "sk"),
                ("QWEN_API_KEY", "qk"),
                ("NEO4J_USERNAME", "neo4j"),
                ("NEO4J_PASSWORD", "pw"),
            ]),
        )
        .unwrap();
        assert!(caps.graph.is_none());
        assert!(caps.unavailable_reason(Slot::Graph).contains("disabled"));
    }
}
