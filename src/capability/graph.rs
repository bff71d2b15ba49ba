//! Knowledge graph store client (Neo4j HTTP transactional endpoint)
//!
//! Graph elements are written in a single auto-commit transaction of
//! parameterized `MERGE` statements. Labels and relationship types cannot be
//! parameters in Cypher, so they are sanitized to `[A-Za-z0-9_]` and quoted.

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use crate::config::GraphSettings;
use crate::credentials::Secret;
use crate::error::{Error, Result};

use super::http::{Auth, HttpEndpoint};
use super::{Capability, CapabilityKind};

// ─────────────────────────────────────────────────────────────────
// Graph elements
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphRelationship {
    /// Id of the source node
    pub subject: String,
    /// Id of the target node
    pub object: String,
    #[serde(rename = "type")]
    pub relation_type: String,
}

/// Nodes and relationships extracted from one text element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphElements {
    pub nodes: Vec<GraphNode>,
    pub relationships: Vec<GraphRelationship>,
    /// Id of the text element the graph was extracted from
    #[serde(default)]
    pub source_id: String,
}

impl GraphElements {
    /// Every id is non-empty and every relationship endpoint is a declared node
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut ids = std::collections::HashSet::new();
        for node in &self.nodes {
            if node.id.trim().is_empty() {
                return Err("node with empty id".to_string());
            }
            ids.insert(node.id.as_str());
        }
        for rel in &self.relationships {
            for endpoint in [&rel.subject, &rel.object] {
                if !ids.contains(endpoint.as_str()) {
                    return Err(format!(
                        "relationship {} references undeclared node '{}'",
                        rel.relation_type, endpoint
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relationships.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphWriteSummary {
    pub nodes: usize,
    pub relationships: usize,
}

// ─────────────────────────────────────────────────────────────────
// Cypher
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Statement {
    statement: String,
    parameters: Value,
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    errors: Vec<Neo4jError>,
}

#[derive(Debug, Deserialize)]
struct Neo4jError {
    code: String,
    message: String,
}

fn sanitize(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('_');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

fn node_label(raw: &str) -> String {
    sanitize(raw, "Entity")
}

fn relation_type(raw: &str) -> String {
    sanitize(raw, "RELATED_TO").to_uppercase()
}

fn build_statements(elements: &GraphElements) -> Vec<Statement> {
    let labels: HashMap<&str, String> = elements
        .nodes
        .iter()
        .map(|n| (n.id.as_str(), node_label(&n.node_type)))
        .collect();

    let mut statements: Vec<Statement> = elements
        .nodes
        .iter()
        .map(|node| Statement {
            statement: format!(
                "MERGE (n:`{}` {{id: $id}}) SET n.source = $source",
                node_label(&node.node_type)
            ),
            parameters: json!({"id": node.id, "source": elements.source_id}),
        })
        .collect();

    for rel in &elements.relationships {
        let subject_label = labels.get(rel.subject.as_str()).cloned().unwrap_or_else(|| node_label(""));
        let object_label = labels.get(rel.object.as_str()).cloned().unwrap_or_else(|| node_label(""));
        statements.push(Statement {
            statement: format!(
                "MERGE (a:`{}` {{id: $subject}}) MERGE (b:`{}` {{id: $object}}) MERGE (a)-[r:`{}`]->(b) SET r.source = $source",
                subject_label,
                object_label,
                relation_type(&rel.relation_type)
            ),
            parameters: json!({"subject": rel.subject, "object": rel.object, "source": elements.source_id}),
        });
    }

    statements
}

// ─────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────

pub struct Neo4jClient {
    endpoint: HttpEndpoint,
    database: String,
}

impl Neo4jClient {
    pub fn new(settings: &GraphSettings, username: &Secret, password: &Secret) -> Result<Self> {
        Ok(Self {
            endpoint: HttpEndpoint::new(
                CapabilityKind::GraphStore,
                &settings.url,
                settings.timeout_secs,
                Auth::Basic {
                    username: username.expose().to_string(),
                    password: password.clone(),
                },
            )?,
            database: settings.database.clone(),
        })
    }
}

#[async_trait]
impl Capability for Neo4jClient {
    type Request = GraphElements;
    type Response = GraphWriteSummary;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::GraphStore
    }

    fn describe(&self) -> String {
        format!("{}/db/{}", self.endpoint.base_url(), self.database)
    }

    async fn invoke(&self, elements: GraphElements) -> Result<GraphWriteSummary> {
        elements
            .validate()
            .map_err(|e| Error::rejected(CapabilityKind::GraphStore, e))?;

        let summary = GraphWriteSummary {
            nodes: elements.nodes.len(),
            relationships: elements.relationships.len(),
        };
        if elements.is_empty() {
            return Ok(summary);
        }

        let body = json!({ "statements": build_statements(&elements) });
        let url = self.endpoint.url(&format!("db/{}/tx/commit", self.database));
        let response: CommitResponse = self
            .endpoint
            .send_json(self.endpoint.request(Method::POST, &url).json(&body))
            .await?;

        if let Some(first) = response.errors.first() {
            return Err(Error::rejected(
                CapabilityKind::GraphStore,
                format!("{}: {} ({} errors)", first.code, first.message, response.errors.len()),
            ));
        }

        info!(nodes = summary.nodes, relationships = summary.relationships, "Graph elements written");
        Ok(summary)
    }
}
