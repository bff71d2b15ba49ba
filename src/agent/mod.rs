//! Conversational agents
//!
//! `ChatAgent` is the building block: a system prompt, a completion handle
//! and a bounded window of prior turns, optionally with tools. The analyst,
//! the summarizer, the research session participants and every evaluator
//! unit are chat agents.

pub mod chat;
pub mod evaluator;
pub mod tools;
pub mod window;

pub use chat::{AgentReply, ChatAgent};
pub use evaluator::EvaluatorUnit;
pub use tools::{ToolBox, ToolCall};
pub use window::ConversationWindow;

use crate::capability::RetryPolicy;
use crate::config::AdvisorConfig;

/// Settings shared by every agent of a run
#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub window_size: usize,
    pub retry: RetryPolicy,
    pub output_language: Option<String>,
}

impl AgentOptions {
    pub fn from_config(config: &AdvisorConfig) -> Self {
        Self {
            window_size: config.debate.window_size,
            retry: RetryPolicy::from_settings(&config.retry),
            output_language: Some(config.debate.output_language.clone()),
        }
    }
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            window_size: 10,
            retry: RetryPolicy::default(),
            output_language: None,
        }
    }
}
