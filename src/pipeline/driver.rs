//! Pipeline driver
//!
//! Extraction → analysis → risk debate → knowledge research → graph build →
//! speech. The first three stages are fatal on failure; the rest are best
//! effort and only marked in the report.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Deserialize;
use tracing::{error, info, instrument, warn};

use crate::agent::tools::strip_fence;
use crate::agent::{AgentOptions, ChatAgent, EvaluatorUnit, ToolBox};
use crate::capability::extraction::ExtractionRequest;
use crate::capability::graph::{GraphElements, GraphNode, GraphRelationship, GraphWriteSummary};
use crate::capability::speech::{SpeechRequest, SynthesizedAudio};
use crate::capability::{Capabilities, Capability, CapabilityKind, RetryPolicy, Slot};
use crate::config::AdvisorConfig;
use crate::document::{stage_source, ContractDocument, DocumentSource, StagingArea};
use crate::error::{Error, Result};
use crate::persona::PersonaRegistry;
use crate::workforce::{RolePlaySession, SessionOutcome, TaskDescriptor, WorkforceCoordinator, WorkforceResult};

use super::prompts;
use super::report::{FinalReport, Stage, StageStatus};

/// Stages switched off from the command line
#[derive(Debug, Clone, Copy, Default)]
pub struct StageSkips {
    pub research: bool,
    pub graph: bool,
    pub speech: bool,
}

pub struct PipelineDriver {
    run_id: String,
    config: AdvisorConfig,
    capabilities: Capabilities,
    personas: PersonaRegistry,
    options: AgentOptions,
    retry: RetryPolicy,
    skips: StageSkips,
}

/// Outcome of a best-effort stage
enum StageResult<T> {
    Done(T),
    Partial(T, String),
    Skipped(String),
}

impl PipelineDriver {
    pub fn new(
        config: AdvisorConfig,
        capabilities: Capabilities,
        personas: PersonaRegistry,
        skips: StageSkips,
    ) -> Self {
        let options = AgentOptions::from_config(&config);
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            retry: options.retry.clone(),
            config,
            capabilities,
            personas,
            options,
            skips,
        }
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Run every stage; fatal errors end the run early and are recorded in
    /// the report rather than returned.
    #[instrument(skip_all, fields(run_id = %self.run_id))]
    pub async fn run(&self, source: &DocumentSource, audio_path: &Path) -> FinalReport {
        let mut report = FinalReport::new(self.run_id.clone(), source.to_string());
        info!(source = %source, "Pipeline started");

        let started = Instant::now();
        let document = match self.extract(source).await {
            Ok(doc) => doc,
            Err(e) => return self.abort(report, Stage::Extraction, started, e),
        };
        report.record(
            Stage::Extraction,
            StageStatus::Succeeded,
            Some(format!("{} characters extracted", document.text.chars().count())),
            elapsed_ms(started),
        );
        let contract_text = document.text.clone();
        report.document = Some(document);

        let started = Instant::now();
        let analysis = match self.analyze(&contract_text).await {
            Ok(text) => text,
            Err(e) => return self.abort(report, Stage::Analysis, started, e),
        };
        report.record(Stage::Analysis, StageStatus::Succeeded, None, elapsed_ms(started));
        report.analysis = Some(analysis.clone());

        let started = Instant::now();
        let debate = match self.debate(&analysis).await {
            Ok(result) => result,
            Err(e) => return self.abort(report, Stage::Debate, started, e),
        };
        let (status, detail) = match debate.partial_failure() {
            Some(partial) => (StageStatus::Incomplete, Some(partial.to_string())),
            None => (
                StageStatus::Succeeded,
                Some(format!("{} verdicts", debate.verdict_count())),
            ),
        };
        report.record(Stage::Debate, status, detail, elapsed_ms(started));
        let verdict = debate.summary.clone();
        report.debate = Some(debate);

        let started = Instant::now();
        let research = self.research(&analysis).await;
        let research = self.settle(&mut report, Stage::Research, started, research);
        report.research = research;

        let started = Instant::now();
        let graph = self.build_graph(&verdict).await;
        let graph = self.settle(&mut report, Stage::Graph, started, graph);
        report.graph = graph;

        let started = Instant::now();
        let audio = self.speak(&verdict, audio_path).await;
        let audio = self.settle(&mut report, Stage::Speech, started, audio);
        report.audio = audio.map(|a| a.path);

        report.finish();
        info!(elapsed_ms = report_elapsed(&report), "Pipeline finished");
        report
    }

    fn abort(&self, mut report: FinalReport, stage: Stage, started: Instant, e: Error) -> FinalReport {
        error!(stage = %stage, error = %e.format_for_log(), "Fatal stage failure, aborting run");
        report.record(stage, StageStatus::Failed, Some(e.to_string()), elapsed_ms(started));
        report.abort(stage, &e);
        report.finish();
        report
    }

    /// Record a best-effort stage and hand back its value
    fn settle<T>(
        &self,
        report: &mut FinalReport,
        stage: Stage,
        started: Instant,
        result: Result<StageResult<T>>,
    ) -> Option<T> {
        let ms = elapsed_ms(started);
        match result {
            Ok(StageResult::Done(value)) => {
                report.record(stage, StageStatus::Succeeded, None, ms);
                Some(value)
            }
            Ok(StageResult::Partial(value, detail)) => {
                report.record(stage, StageStatus::Incomplete, Some(detail), ms);
                Some(value)
            }
            Ok(StageResult::Skipped(reason)) => {
                info!(stage = %stage, reason = %reason, "Stage skipped");
                report.record(stage, StageStatus::Skipped, Some(reason), ms);
                None
            }
            Err(e) => {
                warn!(stage = %stage, error = %e.format_for_log(), "Stage failed, continuing");
                report.record(stage, StageStatus::Failed, Some(e.to_string()), ms);
                None
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Stage 1: extraction + analysis
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(stage = "extraction"))]
    async fn extract(&self, source: &DocumentSource) -> Result<ContractDocument> {
        let staging = StagingArea::create(&self.config.staging_dir(), &self.run_id)?;
        let staged = stage_source(source, &staging).await?;
        info!(path = %staged.path.display(), bytes = staged.size, "Input staged");

        let extraction = &self.capabilities.extraction;
        let output = self
            .retry
            .run(CapabilityKind::DocumentExtraction, || {
                extraction.invoke(ExtractionRequest { path: staged.path.clone() })
            })
            .await;
        drop(staging);

        ContractDocument::from_extraction(source, &staged, output?)
    }

    #[instrument(skip_all, fields(stage = "analysis"))]
    async fn analyze(&self, contract_text: &str) -> Result<String> {
        let mut analyst = ChatAgent::with_options(
            "contract-analyst",
            prompts::ANALYST_SYSTEM,
            self.capabilities.analyst.clone(),
            &self.options,
        );
        let reply = analyst.step(&prompts::analyst_request(contract_text)).await?;
        if reply.content.trim().is_empty() {
            return Err(Error::malformed(CapabilityKind::ModelCompletion, "analyst returned no text"));
        }
        info!(chars = reply.content.len(), "Contract analyzed");
        Ok(reply.content)
    }

    // ─────────────────────────────────────────────────────────────
    // Stage 2: debate
    // ─────────────────────────────────────────────────────────────

    fn tool_box(&self) -> ToolBox {
        ToolBox::new(self.config.retrieval.char_budget(), self.retry.clone())
            .with_search(self.capabilities.search.clone())
            .with_scrape(self.capabilities.scrape.clone())
            .with_retrieval(self.capabilities.retrieval.clone())
    }

    /// Coordinator with one unit per persona; helpers get the research tools
    pub fn build_workforce(&self) -> Result<WorkforceCoordinator> {
        let summarizer = match (&self.capabilities.summarizer, self.config.debate.summarize) {
            (Some(model), true) => Some(ChatAgent::with_options(
                "summarizer",
                prompts::SUMMARIZER_SYSTEM,
                model.clone(),
                &self.options,
            )),
            _ => None,
        };

        let mut workforce = WorkforceCoordinator::new("contract-risk-debate")
            .with_dispatch(self.config.debate.dispatch)
            .with_summarizer(summarizer);

        for persona in self.personas.personas() {
            let mut unit = EvaluatorUnit::new(persona.clone(), self.capabilities.evaluator.clone(), &self.options);
            if persona.is_helper() {
                unit = unit.with_tools(self.tool_box());
            }
            workforce.register(unit)?;
        }
        Ok(workforce)
    }

    #[instrument(skip_all, fields(stage = "debate"))]
    async fn debate(&self, analysis: &str) -> Result<WorkforceResult> {
        let mut workforce = self.build_workforce()?;
        let task = TaskDescriptor::with_random_id(prompts::DEBATE_TASK, analysis);
        workforce.process_task(&task).await
    }

    // ─────────────────────────────────────────────────────────────
    // Stage 3: knowledge research + graph
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(stage = "research"))]
    async fn research(&self, analysis: &str) -> Result<StageResult<SessionOutcome>> {
        if self.skips.research {
            return Ok(StageResult::Skipped("disabled by --skip-research".to_string()));
        }
        let Some(model) = &self.capabilities.knowledge else {
            return Ok(StageResult::Skipped(self.capabilities.unavailable_reason(Slot::Knowledge)));
        };

        let instructor = ChatAgent::with_options("instructor", prompts::INSTRUCTOR_SYSTEM, model.clone(), &self.options);
        let assistant = ChatAgent::with_options("assistant", prompts::ASSISTANT_SYSTEM, model.clone(), &self.options)
            .with_tools(self.tool_box());

        let mut session =
            RolePlaySession::new(instructor, assistant).with_max_rounds(self.config.debate.max_rounds);
        let outcome = session.run(&prompts::research_task(analysis)).await?;

        if outcome.incomplete {
            let detail = format!("round cap of {} reached without completion", outcome.rounds);
            Ok(StageResult::Partial(outcome, detail))
        } else {
            Ok(StageResult::Done(outcome))
        }
    }

    #[instrument(skip_all, fields(stage = "graph"))]
    async fn build_graph(&self, verdict: &str) -> Result<StageResult<GraphWriteSummary>> {
        if self.skips.graph {
            return Ok(StageResult::Skipped("disabled by --skip-graph".to_string()));
        }
        let Some(store) = &self.capabilities.graph else {
            return Ok(StageResult::Skipped(self.capabilities.unavailable_reason(Slot::Graph)));
        };
        let Some(model) = &self.capabilities.knowledge else {
            return Ok(StageResult::Skipped(self.capabilities.unavailable_reason(Slot::Knowledge)));
        };

        let mut extractor = ChatAgent::new("knowledge-graph", prompts::KNOWLEDGE_GRAPH_SYSTEM, model.clone())
            .with_window(0)
            .with_retry(self.retry.clone())
            .with_temperature(0.2);
        let reply = extractor.step(&prompts::knowledge_graph_request(verdict)).await?;
        let elements = parse_graph_elements(&reply.content, &self.run_id)?;
        info!(
            nodes = elements.nodes.len(),
            relationships = elements.relationships.len(),
            "Graph elements extracted"
        );

        let summary = self
            .retry
            .run(CapabilityKind::GraphStore, || store.invoke(elements.clone()))
            .await?;
        Ok(StageResult::Done(summary))
    }

    // ─────────────────────────────────────────────────────────────
    // Stage 4: speech
    // ─────────────────────────────────────────────────────────────

    #[instrument(skip_all, fields(stage = "speech"))]
    async fn speak(&self, verdict: &str, audio_path: &Path) -> Result<StageResult<SynthesizedAudio>> {
        if self.skips.speech {
            return Ok(StageResult::Skipped("disabled by --skip-speech".to_string()));
        }
        let Some(speech) = &self.capabilities.speech else {
            return Ok(StageResult::Skipped(self.capabilities.unavailable_reason(Slot::Speech)));
        };

        let request = SpeechRequest {
            text: verdict.to_string(),
            output_path: PathBuf::from(audio_path),
        };
        let audio = self
            .retry
            .run(CapabilityKind::SpeechSynthesis, || speech.invoke(request.clone()))
            .await?;
        Ok(StageResult::Done(audio))
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractedGraph {
    nodes: Vec<GraphNode>,
    #[serde(default)]
    relationships: Vec<GraphRelationship>,
}

/// Parse the knowledge model's reply into validated graph elements
pub fn parse_graph_elements(reply: &str, source_id: &str) -> Result<GraphElements> {
    let body = strip_fence(reply.trim());
    let graph: ExtractedGraph = serde_json::from_str(body).map_err(|e| {
        Error::malformed(
            CapabilityKind::ModelCompletion,
            format!("knowledge graph reply is not valid graph JSON: {}", e),
        )
    })?;

    let elements = GraphElements {
        nodes: graph.nodes,
        relationships: graph.relationships,
        source_id: source_id.to_string(),
    };
    elements
        .validate()
        .map_err(|reason| Error::malformed(CapabilityKind::ModelCompletion, reason))?;
    Ok(elements)
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn report_elapsed(report: &FinalReport) -> u64 {
    report.stages.iter().map(|s| s.duration_ms).sum()
}
