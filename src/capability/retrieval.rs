//! Vector retrieval over transient content
//!
//! Contents are split into passages, embedded together with the query through
//! an OpenAI-compatible `/embeddings` endpoint, and ranked by cosine
//! similarity in memory. Nothing is persisted between calls.

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ProviderSettings, RetrievalSettings};
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

#[derive(Debug, Clone)]
pub struct RetrievalRequest {
    pub query: String,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub similarity: f32,
}

#[derive(Debug, Serialize)]
struct EmbeddingsBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

pub struct EmbeddingRetriever {
    endpoint: HttpEndpoint,
    model: String,
    top_k: usize,
    similarity_threshold: f32,
    chunk_chars: usize,
}

impl EmbeddingRetriever {
    pub fn new(provider: &ProviderSettings, settings: &RetrievalSettings, api_key: &Secret) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::Retrieval,
                &provider.base_url,
                provider.timeout_secs,
                Auth::Bearer(api_key.clone()),
            )?,
            model: settings.model.clone(),
            top_k: settings.top_k,
            similarity_threshold: settings.similarity_threshold,
            chunk_chars: settings.chunk_chars.max(1),
        })
    }

    async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = EmbeddingsBody {
            model: &self.model,
            input: inputs,
        };
        let url = self.endpoint.url("embeddings");
        let mut response: EmbeddingsResponse = self
            .endpoint
            .send_json(self.endpoint.request(Method::POST, &url).json(&body))
            .await?;

        if response.data.len() != inputs.len() {
            return Err(Error::malformed(
                CapabilityKind::Retrieval,
                format!("expected {} embeddings, got {}", inputs.len(), response.data.len()),
            ));
        }

        response.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}

/// Split text into passages of at most `max_chars`, preferring paragraph breaks
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in text.split("\n\n").map(str::trim).filter(|p| !p.is_empty()) {
        if !current.is_empty() && current.chars().count() + paragraph.chars().count() + 2 > max_chars {
            chunks.push(std::mem::take(&mut current));
        }

        if paragraph.chars().count() > max_chars {
            let chars: Vec<char> = paragraph.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        if !current.is_empty() {
            current.push_str("\n\n");
        }
        current.push_str(paragraph);
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Keep passages at or above the threshold, best first, at most `top_k`
pub fn rank_passages(
    query: &[f32],
    passages: Vec<(String, Vec<f32>)>,
    top_k: usize,
    threshold: f32,
) -> Vec<RetrievedPassage> {
    let mut scored: Vec<RetrievedPassage> = passages
        .into_iter()
        .map(|(text, embedding)| RetrievedPassage {
            similarity: cosine_similarity(query, &embedding),
            text,
        })
        .filter(|p| p.similarity >= threshold)
        .collect();

    scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    scored.truncate(top_k);
    scored
}

#[async_trait]
impl Capability for EmbeddingRetriever {
    type Request = RetrievalRequest;
    type Response = Vec<RetrievedPassage>;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Retrieval
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.model, self.endpoint.base_url())
    }

    async fn invoke(&self, request: RetrievalRequest) -> Result<Vec<RetrievedPassage>> {
        let chunks = chunk_text(&request.contents, self.chunk_chars);
        if chunks.is_empty() {
            return Ok(Vec::new());
        }

        let mut inputs = Vec::with_capacity(chunks.len() + 1);
        inputs.push(request.query.clone());
        inputs.extend(chunks.iter().cloned());

        let mut embeddings = self.embed(&inputs).await?.into_iter();
        let query_embedding = embeddings.next().unwrap_or_default();
        let passages = chunks.into_iter().zip(embeddings).collect();

        let ranked = rank_passages(&query_embedding, passages, self.top_k, self.similarity_threshold);
        debug!(query = %request.query, kept = ranked.len(), "Passages retrieved");
        Ok(ranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_chunk_text_packs_paragraphs() {
        let text = "alpha\n\nbeta\n\ngamma";
        assert_eq!(chunk_text(text, 12), vec!["alpha\n\nbeta", "gamma"]);
        assert_eq!(chunk_text(text, 100), vec!["alpha\n\nbeta\n\ngamma"]);
    }

    #[test]
    fn test_chunk_text_splits_long_paragraphs() {
        let chunks = chunk_text("abcdefghij", 4);
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        assert!(chunk_text("  \n\n ", 4).is_empty());
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_rank_applies_threshold_and_top_k() {
        let query = [1.0, 0.0];
        let passages = vec![
            ("orthogonal".to_string(), vec![0.0, 1.0]),
            ("close".to_string(), vec![0.9, 0.1]),
            ("exact".to_string(), vec![1.0, 0.0]),
            ("near".to_string(), vec![0.8, 0.3]),
        ];
        let ranked = rank_passages(&query, passages, 2, 0.5);
        let texts: Vec<_> = ranked.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, vec!["exact", "close"]);
    }

    #[tokio::test]
    async fn test_retrieval_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 2, "embedding": [0.0, 1.0]},
                    {"index": 0, "embedding": [1.0, 0.0]},
                    {"index": 1, "embedding": [0.95, 0.05]}
                ]
            })))
            .mount(&server)
            .await;

        let provider = ProviderSettings { base_url: server.uri(), timeout_secs: 5 };
        let settings = RetrievalSettings {
            chunk_chars: 20,
            ..Default::default()
        };
        let retriever = EmbeddingRetriever::new(&provider, &settings, &Secret::new("mk")).unwrap();

        let passages = retriever
            .invoke(RetrievalRequest {
                query: "severance".into(),
                contents: "severance is owed\n\nweather is sunny".into(),
            })
            .await
            .unwrap();

        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "severance is owed");
    }

    #[tokio::test]
    async fn test_embedding_count_mismatch_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": []})))
            .mount(&server)
            .await;

        let provider = ProviderSettings { base_url: server.uri(), timeout_secs: 5 };
        let retriever =
            EmbeddingRetriever::new(&provider, &RetrievalSettings::default(), &Secret::new("mk")).unwrap();
        let err = retriever
            .invoke(RetrievalRequest { query: "q".into(), contents: "text".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::CapabilityMalformedResponse { .. }));
    }
}
