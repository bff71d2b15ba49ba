//! Final run report

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::capability::graph::GraphWriteSummary;
use crate::document::ContractDocument;
use crate::error::Error;
use crate::workforce::{SessionOutcome, WorkforceResult};

// ─────────────────────────────────────────────────────────────────
// Stages
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Extraction,
    Analysis,
    Debate,
    Research,
    Graph,
    Speech,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::Extraction => "extraction",
            Stage::Analysis => "analysis",
            Stage::Debate => "debate",
            Stage::Research => "research",
            Stage::Graph => "graph",
            Stage::Speech => "speech",
        }
    }

    pub fn all() -> &'static [Stage] {
        &[
            Stage::Extraction,
            Stage::Analysis,
            Stage::Debate,
            Stage::Research,
            Stage::Graph,
            Stage::Speech,
        ]
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Failed,
    Skipped,
    Incomplete,
}

impl StageStatus {
    fn marker(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "[OK]",
            StageStatus::Failed => "[FAILED]",
            StageStatus::Skipped => "[SKIPPED]",
            StageStatus::Incomplete => "[INCOMPLETE]",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

/// Error that aborted the run
#[derive(Debug, Clone, Serialize)]
pub struct FatalError {
    pub stage: Stage,
    pub code: String,
    pub message: String,
    pub exit_code: i32,
}

impl FatalError {
    pub fn new(stage: Stage, error: &Error) -> Self {
        Self {
            stage,
            code: error.code().as_str(),
            message: error.to_string(),
            exit_code: error.exit_code(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Final Report
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FinalReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub source: String,
    pub document: Option<ContractDocument>,
    pub stages: Vec<StageRecord>,
    pub analysis: Option<String>,
    pub debate: Option<WorkforceResult>,
    pub research: Option<SessionOutcome>,
    pub graph: Option<GraphWriteSummary>,
    pub audio: Option<PathBuf>,
    pub error: Option<FatalError>,
}

impl FinalReport {
    pub fn new(run_id: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            finished_at: None,
            source: source.into(),
            document: None,
            stages: Vec::new(),
            analysis: None,
            debate: None,
            research: None,
            graph: None,
            audio: None,
            error: None,
        }
    }

    pub fn record(&mut self, stage: Stage, status: StageStatus, detail: Option<String>, duration_ms: u64) {
        self.stages.push(StageRecord { stage, status, detail, duration_ms });
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn abort(&mut self, stage: Stage, error: &Error) {
        self.error = Some(FatalError::new(stage, error));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn exit_code(&self) -> i32 {
        self.error.as_ref().map(|e| e.exit_code).unwrap_or(0)
    }

    /// Debate summary, the text spoken and graphed
    pub fn verdict(&self) -> Option<&str> {
        self.debate.as_ref().map(|d| d.summary.as_str())
    }

    /// Human-readable report for stdout
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Contract Advisor Report\n");
        out.push_str("═══════════════════════\n");
        out.push_str(&format!("Run:     {}\n", self.run_id));
        out.push_str(&format!("Source:  {}\n", self.source));
        if let Some(doc) = &self.document {
            out.push_str(&format!("SHA-256: {}\n", doc.sha256));
        }

        out.push_str("\nStages:\n");
        for record in &self.stages {
            out.push_str(&format!(
                "  {:<12} {} ({} ms)",
                record.status.marker(),
                record.stage,
                record.duration_ms
            ));
            if let Some(detail) = &record.detail {
                out.push_str(&format!(": {}", detail));
            }
            out.push('\n');
        }
        for stage in Stage::all() {
            if self.stage(*stage).is_none() && self.error.is_some() {
                out.push_str(&format!("  {:<12} {}: not reached\n", "[SKIPPED]", stage));
            }
        }

        if let Some(analysis) = &self.analysis {
            section(&mut out, "Contract Analysis", analysis);
        }
        if let Some(debate) = &self.debate {
            section(&mut out, "Risk Verdict", &debate.summary);
            if debate.summary != debate.report {
                section(&mut out, "Panel Evaluations", &debate.report);
            }
        }
        if let Some(research) = &self.research {
            section(&mut out, "Risk Knowledge Report", &research.final_message);
        }
        if let Some(graph) = &self.graph {
            section(
                &mut out,
                "Knowledge Graph",
                &format!("{} nodes, {} relationships written", graph.nodes, graph.relationships),
            );
        }
        if let Some(audio) = &self.audio {
            section(&mut out, "Audio", &audio.display().to_string());
        }
        if let Some(error) = &self.error {
            section(
                &mut out,
                "Run Aborted",
                &format!("[{}] during {}: {}", error.code, error.stage, error.message),
            );
        }
        out
    }
}

fn section(out: &mut String, title: &str, body: &str) {
    out.push_str(&format!("\n── {} ──\n{}\n", title, body.trim_end()));
}
