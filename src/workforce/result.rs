//! Workforce result

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::Error;
use crate::persona::PersonaRole;

/// What one unit produced for a task
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UnitOutcome {
    Verdict { role: PersonaRole, text: String },
    Failed { role: PersonaRole, error: String },
}

impl UnitOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, UnitOutcome::Failed { .. })
    }

    pub fn role(&self) -> PersonaRole {
        match self {
            UnitOutcome::Verdict { role, .. } | UnitOutcome::Failed { role, .. } => *role,
        }
    }

    /// Verdict text, or the failure placeholder
    pub fn text(&self) -> String {
        match self {
            UnitOutcome::Verdict { text, .. } => text.clone(),
            UnitOutcome::Failed { error, .. } => format!("[unavailable: {}]", error),
        }
    }
}

/// Combined outcome of one task, assembled once and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct WorkforceResult {
    pub task_id: String,
    /// Unit name → outcome, in registration order
    pub outcomes: IndexMap<String, UnitOutcome>,
    pub report: String,
    pub summary: String,
    /// Some unit failed
    pub incomplete: bool,
}

impl WorkforceResult {
    pub fn failed_units(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, o)| o.is_failure())
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn verdict_count(&self) -> usize {
        self.outcomes.values().filter(|o| !o.is_failure()).count()
    }

    /// `PartialFailure` describing the failed units, if any
    pub fn partial_failure(&self) -> Option<Error> {
        let failed = self.failed_units();
        if failed.is_empty() {
            return None;
        }
        Some(Error::PartialFailure {
            failed: failed.len(),
            total: self.outcomes.len(),
            units: failed.join(", "),
        })
    }
}
