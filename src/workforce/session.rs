//! Interaction-round driver
//!
//! An instructor agent gives instructions one at a time and an assistant
//! agent carries them out, until the instructor says `TASK_DONE` or the
//! round cap is hit.

use serde::Serialize;
use tracing::{info, warn};

use crate::agent::ChatAgent;
use crate::error::Result;

/// Completion signal the instructor emits
pub const TASK_DONE: &str = "TASK_DONE";

pub const DEFAULT_MAX_ROUNDS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Instructor,
    Assistant,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionTurn {
    pub round: usize,
    pub speaker: Speaker,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionOutcome {
    pub transcript: Vec<SessionTurn>,
    /// Last assistant message
    pub final_message: String,
    pub rounds: usize,
    /// Round cap hit before `TASK_DONE`
    pub incomplete: bool,
}

pub struct RolePlaySession {
    instructor: ChatAgent,
    assistant: ChatAgent,
    max_rounds: usize,
}

impl RolePlaySession {
    pub fn new(instructor: ChatAgent, assistant: ChatAgent) -> Self {
        Self {
            instructor,
            assistant,
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    pub async fn run(&mut self, task: &str) -> Result<SessionOutcome> {
        let mut transcript = Vec::new();
        let mut final_message = String::new();
        let mut next_for_instructor = format!(
            "{}\n\nNow start to give me instructions one by one. \
             When the task is complete, reply with only {}.",
            task, TASK_DONE
        );

        for round in 1..=self.max_rounds {
            let instruction = self.instructor.step(&next_for_instructor).await?.content;
            transcript.push(SessionTurn {
                round,
                speaker: Speaker::Instructor,
                content: instruction.clone(),
            });

            if instruction.contains(TASK_DONE) {
                info!(round, "Session completed");
                return Ok(SessionOutcome {
                    transcript,
                    final_message,
                    rounds: round,
                    incomplete: false,
                });
            }

            let answer = self.assistant.step(&instruction).await?.content;
            transcript.push(SessionTurn {
                round,
                speaker: Speaker::Assistant,
                content: answer.clone(),
            });
            info!(round, chars = answer.len(), "Session round finished");

            next_for_instructor = answer.clone();
            final_message = answer;
        }

        warn!(max_rounds = self.max_rounds, "Session hit the round cap without {}", TASK_DONE);
        Ok(SessionOutcome {
            transcript,
            final_message,
            rounds: self.max_rounds,
            incomplete: true,
        })
    }
}
