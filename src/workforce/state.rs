//! Coordinator task lifecycle

use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// `Idle → Dispatched → Collecting → Aggregated → Done → Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkforceState {
    /// Registry populated, no task in flight
    #[default]
    Idle,
    /// Task sent to every unit
    Dispatched,
    /// Unit outcomes accumulating
    Collecting,
    /// Report and summary assembled
    Aggregated,
    /// Result handed back
    Done,
}

impl WorkforceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkforceState::Idle => "idle",
            WorkforceState::Dispatched => "dispatched",
            WorkforceState::Collecting => "collecting",
            WorkforceState::Aggregated => "aggregated",
            WorkforceState::Done => "done",
        }
    }

    pub fn can_transition_to(&self, next: WorkforceState) -> bool {
        use WorkforceState::*;
        matches!(
            (self, next),
            (Idle, Dispatched)
                | (Dispatched, Collecting)
                | (Collecting, Aggregated)
                | (Aggregated, Done)
                | (Done, Idle)
        )
    }

    /// Move to `next`, or fail with `InvalidTransition`
    pub fn transition(&mut self, next: WorkforceState) -> Result<()> {
        if !self.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            });
        }
        *self = next;
        Ok(())
    }
}

impl fmt::Display for WorkforceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_lifecycle() {
        let mut state = WorkforceState::default();
        for next in [
            WorkforceState::Dispatched,
            WorkforceState::Collecting,
            WorkforceState::Aggregated,
            WorkforceState::Done,
            WorkforceState::Idle,
        ] {
            state.transition(next).unwrap();
        }
        assert_eq!(state, WorkforceState::Idle);
    }

    #[test]
    fn test_skipping_a_state_is_rejected() {
        let mut state = WorkforceState::Idle;
        let err = state.transition(WorkforceState::Aggregated).unwrap_err();
        assert!(matches!(err, Error::InvalidTransition { ref from, ref to } if from == "idle" && to == "aggregated"));
        assert_eq!(state, WorkforceState::Idle);
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(!WorkforceState::Collecting.can_transition_to(WorkforceState::Dispatched));
        assert!(!WorkforceState::Done.can_transition_to(WorkforceState::Dispatched));
    }
}
