//! Capability trait definitions
//!
//! Every external service the advisor talks to sits behind the same
//! `invoke(request) -> response` contract.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

use super::completion::{Completion, CompletionRequest};
use super::extraction::{ExtractionOutput, ExtractionRequest};
use super::graph::{GraphElements, GraphWriteSummary};
use super::retrieval::{RetrievalRequest, RetrievedPassage};
use super::scrape::{ScrapeRequest, ScrapedPage};
use super::search::{SearchHit, SearchRequest};
use super::speech::{SpeechRequest, SynthesizedAudio};

// ─────────────────────────────────────────────────────────────────
// Capability Kind
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityKind {
    DocumentExtraction,
    WebScrape,
    WebSearch,
    Retrieval,
    GraphStore,
    SpeechSynthesis,
    ModelCompletion,
}

impl CapabilityKind {
    pub fn name(&self) -> &'static str {
        match self {
            CapabilityKind::DocumentExtraction => "document-extraction",
            CapabilityKind::WebScrape => "web-scrape",
            CapabilityKind::WebSearch => "web-search",
            CapabilityKind::Retrieval => "retrieval",
            CapabilityKind::GraphStore => "graph-store",
            CapabilityKind::SpeechSynthesis => "speech-synthesis",
            CapabilityKind::ModelCompletion => "model-completion",
        }
    }
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────
// Capability Trait
// ─────────────────────────────────────────────────────────────────

/// Uniform request/response wrapper around one external capability
///
/// Implementations perform exactly one logical call per `invoke` and never
/// retry; callers wrap invocations in a `RetryPolicy` when they want to.
#[async_trait]
pub trait Capability: Send + Sync {
    type Request: Send + 'static;
    type Response: Send + 'static;

    fn kind(&self) -> CapabilityKind;

    /// Human-readable endpoint description for logs
    fn describe(&self) -> String {
        self.kind().to_string()
    }

    async fn invoke(&self, request: Self::Request) -> Result<Self::Response>;
}

pub type SharedCompletion =
    Arc<dyn Capability<Request = CompletionRequest, Response = Completion>>;
pub type SharedExtraction =
    Arc<dyn Capability<Request = ExtractionRequest, Response = ExtractionOutput>>;
pub type SharedScrape = Arc<dyn Capability<Request = ScrapeRequest, Response = ScrapedPage>>;
pub type SharedSearch = Arc<dyn Capability<Request = SearchRequest, Response = Vec<SearchHit>>>;
pub type SharedRetrieval =
    Arc<dyn Capability<Request = RetrievalRequest, Response = Vec<RetrievedPassage>>>;
pub type SharedGraph = Arc<dyn Capability<Request = GraphElements, Response = GraphWriteSummary>>;
pub type SharedSpeech = Arc<dyn Capability<Request = SpeechRequest, Response = SynthesizedAudio>>;
