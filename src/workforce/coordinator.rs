//! Workforce coordinator
//!
//! Owns the evaluator units, fans a task out to all of them, tolerates
//! per-unit failure and folds the verdicts into one combined report.

use std::collections::HashSet;
use std::time::Instant;

use futures_util::future::join_all;
use indexmap::IndexMap;
use tracing::{debug, info, instrument, warn};

use crate::agent::{ChatAgent, EvaluatorUnit};
use crate::config::DispatchMode;
use crate::error::{Error, Result};
use crate::persona::PersonaRole;

use super::result::{UnitOutcome, WorkforceResult};
use super::state::WorkforceState;
use super::task::TaskDescriptor;

const SUMMARY_REQUEST: &str = "Below are evaluations of a contract risk report from several perspectives. \
Summarize all opinions into one final verdict: the main risks, an overall risk score (like 3/4) \
and concrete recommendations for the signer.";

pub struct WorkforceCoordinator {
    name: String,
    units: Vec<EvaluatorUnit>,
    state: WorkforceState,
    dispatch: DispatchMode,
    summarizer: Option<ChatAgent>,
    seen_tasks: HashSet<String>,
}

impl WorkforceCoordinator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            units: Vec::new(),
            state: WorkforceState::Idle,
            dispatch: DispatchMode::Concurrent,
            summarizer: None,
            seen_tasks: HashSet::new(),
        }
    }

    pub fn with_dispatch(mut self, dispatch: DispatchMode) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn with_summarizer(mut self, summarizer: Option<ChatAgent>) -> Self {
        self.summarizer = summarizer;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> WorkforceState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Add a unit; names are unique within a coordinator
    pub fn register(&mut self, unit: EvaluatorUnit) -> Result<()> {
        if self.units.iter().any(|u| u.name() == unit.name()) {
            return Err(Error::DuplicateUnit { name: unit.name().to_string() });
        }
        debug!(workforce = %self.name, unit = %unit.name(), role = %unit.role(), "Unit registered");
        self.units.push(unit);
        Ok(())
    }

    /// Run one task through every unit and assemble the result.
    ///
    /// Unit failures become placeholders and set `incomplete`; only an empty
    /// workforce or a task id seen before fails the call.
    #[instrument(skip(self, task), fields(workforce = %self.name, task_id = %task.id()))]
    pub async fn process_task(&mut self, task: &TaskDescriptor) -> Result<WorkforceResult> {
        if self.units.is_empty() {
            return Err(Error::EmptyWorkforce { name: self.name.clone() });
        }
        if self.seen_tasks.contains(task.id()) {
            return Err(Error::DuplicateTask { task_id: task.id().to_string() });
        }

        self.state.transition(WorkforceState::Dispatched)?;
        self.seen_tasks.insert(task.id().to_string());
        info!(units = self.units.len(), dispatch = ?self.dispatch, "Task dispatched");
        let started = Instant::now();

        let raw = self.fan_out(task).await;

        self.state.transition(WorkforceState::Collecting)?;
        let mut outcomes = IndexMap::with_capacity(raw.len());
        for (name, role, result) in raw {
            let outcome = match result {
                Ok(text) => UnitOutcome::Verdict { role, text },
                Err(e) => {
                    warn!(unit = %name, error = %e, "Evaluator unit failed");
                    UnitOutcome::Failed { role, error: e.to_string() }
                }
            };
            outcomes.insert(name, outcome);
        }

        self.state.transition(WorkforceState::Aggregated)?;
        let report = combine(&outcomes);
        let summary = self.summarize(&report).await;
        let incomplete = outcomes.values().any(UnitOutcome::is_failure);

        let result = WorkforceResult {
            task_id: task.id().to_string(),
            outcomes,
            report,
            summary,
            incomplete,
        };

        self.state.transition(WorkforceState::Done)?;
        info!(
            verdicts = result.verdict_count(),
            failed = result.failed_units().len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Task aggregated"
        );
        self.state.transition(WorkforceState::Idle)?;
        Ok(result)
    }

    async fn fan_out(&mut self, task: &TaskDescriptor) -> Vec<(String, PersonaRole, Result<String>)> {
        match self.dispatch {
            DispatchMode::Concurrent => {
                let futures = self.units.iter_mut().map(|unit| async move {
                    let result = unit.evaluate(task).await;
                    (unit.name().to_string(), unit.role(), result)
                });
                join_all(futures).await
            }
            DispatchMode::Sequential => {
                let mut raw = Vec::with_capacity(self.units.len());
                for unit in self.units.iter_mut() {
                    let result = unit.evaluate(task).await;
                    raw.push((unit.name().to_string(), unit.role(), result));
                }
                raw
            }
        }
    }

    async fn summarize(&mut self, report: &str) -> String {
        let Some(summarizer) = self.summarizer.as_mut() else {
            return report.to_string();
        };
        match summarizer.step(&format!("{}\n\n{}", SUMMARY_REQUEST, report)).await {
            Ok(reply) if !reply.content.trim().is_empty() => reply.content,
            Ok(_) => {
                warn!("Summarizer returned nothing, using the combined report");
                report.to_string()
            }
            Err(e) => {
                warn!(error = %e, "Summarizer failed, using the combined report");
                report.to_string()
            }
        }
    }
}

/// Helper outputs first as supporting context, then evaluator verdicts
fn combine(outcomes: &IndexMap<String, UnitOutcome>) -> String {
    let helpers = outcomes
        .iter()
        .filter(|(_, o)| o.role() == PersonaRole::Helper)
        .map(|(name, o)| format!("Supporting research ({}):\n{}", name, o.text()));
    let evaluators = outcomes
        .iter()
        .filter(|(_, o)| o.role() == PersonaRole::Evaluator)
        .map(|(name, o)| format!("### {}\n{}", name, o.text()));

    helpers.chain(evaluators).collect::<Vec<_>>().join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    use crate::agent::AgentOptions;
    use crate::capability::mock::{Behavior, ScriptedCompletion};
    use crate::capability::SharedCompletion;
    use crate::persona::Persona;

    fn persona(name: &str, role: PersonaRole) -> Persona {
        Persona {
            name: name.into(),
            role,
            summary: String::new(),
            behavior_description: format!("You are {}.", name),
            example_output: "3/4".into(),
            scoring_rubric: Some("1-4".into()),
        }
    }

    fn unit(name: &str, role: PersonaRole, model: SharedCompletion) -> EvaluatorUnit {
        EvaluatorUnit::new(persona(name, role), model, &AgentOptions::default())
    }

    fn workforce(n: usize, dispatch: DispatchMode) -> WorkforceCoordinator {
        let mut wf = WorkforceCoordinator::new("debate").with_dispatch(dispatch);
        for i in 0..n {
            wf.register(unit(&format!("unit-{}", i), PersonaRole::Evaluator, ScriptedCompletion::fixed(format!("verdict {}", i))))
                .unwrap();
        }
        wf
    }

    fn task(id: &str) -> TaskDescriptor {
        TaskDescriptor::new(id, "Evaluate.", "Report body")
    }

    #[tokio::test]
    async fn test_every_unit_invoked_once() {
        let models: Vec<_> = (0..4).map(|_| ScriptedCompletion::fixed("ok")).collect();
        let mut wf = WorkforceCoordinator::new("debate");
        for (i, model) in models.iter().enumerate() {
            wf.register(unit(&format!("u{}", i), PersonaRole::Evaluator, model.clone())).unwrap();
        }

        let result = wf.process_task(&task("0")).await.unwrap();
        assert_eq!(result.outcomes.len(), 4);
        assert!(models.iter().all(|m| m.calls() == 1));
        assert_eq!(wf.state(), WorkforceState::Idle);
    }

    #[tokio::test]
    async fn test_outcomes_in_registration_order() {
        for dispatch in [DispatchMode::Concurrent, DispatchMode::Sequential] {
            let mut wf = workforce(3, dispatch);
            let result = wf.process_task(&task("0")).await.unwrap();
            let names: Vec<_> = result.outcomes.keys().cloned().collect();
            assert_eq!(names, vec!["unit-0", "unit-1", "unit-2"]);
            assert!(!result.incomplete);
        }
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_going() {
        let mut wf = workforce(2, DispatchMode::Concurrent);
        wf.register(unit("broken", PersonaRole::Evaluator, ScriptedCompletion::new(Behavior::Malformed)))
            .unwrap();

        let result = wf.process_task(&task("0")).await.unwrap();
        assert_eq!(result.outcomes.len(), 3);
        assert_eq!(result.verdict_count(), 2);
        assert_eq!(result.failed_units(), vec!["broken"]);
        assert!(result.incomplete);
        assert!(result.report.contains("### broken\n[unavailable:"));
        assert!(matches!(
            result.partial_failure(),
            Some(Error::PartialFailure { failed: 1, total: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_duplicate_unit_rejected() {
        let mut wf = workforce(1, DispatchMode::Concurrent);
        let err = wf
            .register(unit("unit-0", PersonaRole::Helper, ScriptedCompletion::fixed("x")))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateUnit { .. }));
        assert_eq!(wf.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_task_rejected() {
        let mut wf = workforce(1, DispatchMode::Sequential);
        wf.process_task(&task("same")).await.unwrap();
        let err = wf.process_task(&task("same")).await.unwrap_err();
        assert!(matches!(err, Error::DuplicateTask { .. }));
        wf.process_task(&task("other")).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_workforce_rejected() {
        let mut wf = WorkforceCoordinator::new("empty");
        assert!(matches!(
            wf.process_task(&task("0")).await,
            Err(Error::EmptyWorkforce { .. })
        ));
    }

    #[tokio::test]
    async fn test_helper_output_is_supporting_context() {
        let mut wf = WorkforceCoordinator::new("debate");
        wf.register(unit("Judge", PersonaRole::Evaluator, ScriptedCompletion::fixed("4/4"))).unwrap();
        wf.register(unit("Researcher", PersonaRole::Helper, ScriptedCompletion::fixed("case law")))
            .unwrap();

        let result = wf.process_task(&task("0")).await.unwrap();
        assert_eq!(result.report, "Supporting research (Researcher):\ncase law\n\n### Judge\n4/4");
        assert_eq!(result.summary, result.report);
    }

    #[tokio::test]
    async fn test_summarizer_result_used() {
        let summarizer = ChatAgent::new("summarizer", "Summarize.", ScriptedCompletion::fixed("Overall 3/4"));
        let mut wf = workforce(2, DispatchMode::Concurrent).with_summarizer(Some(summarizer));
        let result = wf.process_task(&task("0")).await.unwrap();
        assert_eq!(result.summary, "Overall 3/4");
    }

    #[tokio::test]
    async fn test_summarizer_failure_falls_back_to_report() {
        let summarizer = ChatAgent::new("summarizer", "Summarize.", ScriptedCompletion::new(Behavior::Malformed));
        let mut wf = workforce(2, DispatchMode::Concurrent).with_summarizer(Some(summarizer));
        let result = wf.process_task(&task("0")).await.unwrap();
        assert_eq!(result.summary, result.report);
        assert!(result.summary.contains("verdict 1"));
    }
}
