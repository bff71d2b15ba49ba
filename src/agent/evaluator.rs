//! Evaluator unit: one persona bound to a chat agent

use tracing::{info, instrument};

use crate::capability::SharedCompletion;
use crate::error::Result;
use crate::persona::{Persona, PersonaRole};
use crate::workforce::TaskDescriptor;

use super::chat::ChatAgent;
use super::tools::ToolBox;
use super::AgentOptions;

pub struct EvaluatorUnit {
    persona: Persona,
    agent: ChatAgent,
}

impl EvaluatorUnit {
    pub fn new(persona: Persona, model: SharedCompletion, options: &AgentOptions) -> Self {
        let agent = ChatAgent::with_options(persona.name.clone(), persona.system_prompt(), model, options);
        Self { persona, agent }
    }

    pub fn with_tools(mut self, tools: ToolBox) -> Self {
        self.agent = self.agent.with_tools(tools);
        self
    }

    pub fn name(&self) -> &str {
        &self.persona.name
    }

    pub fn role(&self) -> PersonaRole {
        self.persona.role
    }

    pub fn persona(&self) -> &Persona {
        &self.persona
    }

    pub fn agent(&self) -> &ChatAgent {
        &self.agent
    }

    /// Evaluate a task and return the raw verdict text.
    ///
    /// Repeated calls see the earlier turns through the agent's window.
    #[instrument(skip(self, task), fields(unit = %self.persona.name, task_id = %task.id()))]
    pub async fn evaluate(&mut self, task: &TaskDescriptor) -> Result<String> {
        let reply = self.agent.step(&task_message(task)).await?;
        info!(chars = reply.content.len(), tool_calls = reply.tool_calls, "Verdict received");
        Ok(reply.content)
    }
}

fn task_message(task: &TaskDescriptor) -> String {
    if task.additional_info().trim().is_empty() {
        task.content().to_string()
    } else {
        format!("{}\n\nAdditional information:\n{}", task.content(), task.additional_info())
    }
}
