//! Chat agent: system prompt + completion handle + bounded window

use tracing::{debug, info, warn};

use crate::capability::{
    truncate, Capability, CapabilityKind, ChatMessage, CompletionRequest, RetryPolicy, SharedCompletion,
};
use crate::error::Result;

use super::tools::{parse_reply, ParsedReply, ToolBox};
use super::window::ConversationWindow;
use super::AgentOptions;

/// Tool calls honored within a single step
pub const MAX_TOOL_CALLS: usize = 3;

/// Final answer of one agent step
#[derive(Debug, Clone, PartialEq)]
pub struct AgentReply {
    pub content: String,
    pub tool_calls: usize,
}

pub struct ChatAgent {
    name: String,
    system_prompt: String,
    model: SharedCompletion,
    window: ConversationWindow,
    retry: RetryPolicy,
    temperature: Option<f32>,
    tools: Option<ToolBox>,
}

impl ChatAgent {
    pub fn new(name: impl Into<String>, system_prompt: impl Into<String>, model: SharedCompletion) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            model,
            window: ConversationWindow::new(AgentOptions::default().window_size),
            retry: RetryPolicy::default(),
            temperature: None,
            tools: None,
        }
    }

    /// Agent with window bound, retry policy and output language from `options`
    pub fn with_options(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        model: SharedCompletion,
        options: &AgentOptions,
    ) -> Self {
        let mut agent = Self::new(name, system_prompt, model)
            .with_window(options.window_size)
            .with_retry(options.retry.clone());
        if let Some(language) = &options.output_language {
            agent = agent.with_language(language);
        }
        agent
    }

    pub fn with_window(mut self, capacity: usize) -> Self {
        self.window = ConversationWindow::new(capacity);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_language(mut self, language: &str) -> Self {
        self.system_prompt.push_str(&format!(
            "\nRegardless of the input language, you must output text in {}.",
            language
        ));
        self
    }

    /// Attach tools; an empty tool box is ignored
    pub fn with_tools(mut self, tools: ToolBox) -> Self {
        if !tools.is_empty() {
            self.system_prompt.push_str("\n\n");
            self.system_prompt.push_str(&tools.describe());
            self.tools = Some(tools);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn window(&self) -> &ConversationWindow {
        &self.window
    }

    pub fn has_tools(&self) -> bool {
        self.tools.is_some()
    }

    /// Send one user message and return the final answer.
    ///
    /// Tool calls found in replies are executed and their results fed back,
    /// up to `MAX_TOOL_CALLS`; only the user message and the final answer are
    /// kept in the window.
    pub async fn step(&mut self, message: &str) -> Result<AgentReply> {
        let mut scratch: Vec<ChatMessage> = vec![ChatMessage::user(message)];
        let mut tool_calls = 0;

        let content = loop {
            let reply = self.complete(&scratch).await?;

            let Some(tools) = &self.tools else {
                break reply;
            };
            if tool_calls >= MAX_TOOL_CALLS {
                break reply;
            }

            let feedback = match parse_reply(&reply) {
                ParsedReply::Text => break reply,
                ParsedReply::Call(call) => {
                    tool_calls += 1;
                    info!(agent = %self.name, tool = call.name(), call = tool_calls, "Executing tool call");
                    match tools.execute(&call).await {
                        Ok(result) => format!("Tool {} returned:\n{}", call.name(), result),
                        Err(e) => {
                            warn!(agent = %self.name, tool = call.name(), error = %e, "Tool call failed");
                            format!("Tool {} failed: {}. Continue without it.", call.name(), e)
                        }
                    }
                }
                ParsedReply::Invalid(reason) => {
                    tool_calls += 1;
                    warn!(agent = %self.name, reason = %reason, "Invalid tool call");
                    format!(
                        "Invalid tool call: {}. Use exactly the documented JSON shape or answer in prose.",
                        reason
                    )
                }
            };
            scratch.push(ChatMessage::assistant(reply));
            scratch.push(ChatMessage::user(feedback));
        };

        self.window.push(ChatMessage::user(message));
        self.window.push(ChatMessage::assistant(content.clone()));
        Ok(AgentReply { content, tool_calls })
    }

    async fn complete(&self, scratch: &[ChatMessage]) -> Result<String> {
        let mut messages = Vec::with_capacity(self.window.len() + scratch.len() + 1);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(self.window.iter().cloned());
        messages.extend(scratch.iter().cloned());

        let mut request = CompletionRequest::new(messages);
        request.temperature = self.temperature;

        let completion = self
            .retry
            .run(CapabilityKind::ModelCompletion, || self.model.invoke(request.clone()))
            .await?;

        debug!(
            agent = %self.name,
            model = %completion.model,
            preview = %truncate(&completion.content, 120),
            "Completion received"
        );
        Ok(completion.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::mock::{Behavior, ScriptedCompletion};
    use crate::capability::search::{SearchHit, SearchRequest};
    use crate::capability::{mock::Stub, Role, SharedSearch};
    use crate::error::Error;

    #[tokio::test]
    async fn test_step_builds_system_history_user() {
        let model = ScriptedCompletion::fixed("ok");
        let mut agent = ChatAgent::new("analyst", "You are a lawyer.", model.clone()).with_window(4);

        agent.step("first").await.unwrap();
        agent.step("second").await.unwrap();

        let requests = model.requests();
        let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::User]);
        assert_eq!(requests[1].messages[1].content, "first");
        assert_eq!(requests[1].last_user_message(), Some("second"));
        assert_eq!(agent.window().len(), 4);
    }

    #[tokio::test]
    async fn test_window_bound_applies_to_requests() {
        let model = ScriptedCompletion::fixed("ok");
        let mut agent = ChatAgent::new("a", "sys", model.clone()).with_window(2);
        for i in 0..5 {
            agent.step(&format!("m{}", i)).await.unwrap();
        }
        // system + 2 remembered turns + current user
        assert_eq!(model.requests().last().unwrap().messages.len(), 4);
    }

    #[tokio::test]
    async fn test_language_directive_in_system_prompt() {
        let model = ScriptedCompletion::echo();
        let mut agent = ChatAgent::new("a", "sys", model).with_language("German");
        let reply = agent.step("hi").await.unwrap();
        assert!(reply.content.contains("must output text in German"));
    }

    #[tokio::test]
    async fn test_transient_errors_retried() {
        let model = ScriptedCompletion::script(|_, idx| {
            if idx == 0 {
                Err(Error::unavailable(CapabilityKind::ModelCompletion, "503"))
            } else {
                Ok("recovered".into())
            }
        });
        let retry = RetryPolicy {
            max_attempts: 2,
            initial_interval: std::time::Duration::from_millis(1),
            max_interval: std::time::Duration::from_millis(1),
            multiplier: 1.0,
        };
        let mut agent = ChatAgent::new("a", "sys", model.clone()).with_retry(retry);
        assert_eq!(agent.step("x").await.unwrap().content, "recovered");
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn test_malformed_not_retried() {
        let model = ScriptedCompletion::new(Behavior::Malformed);
        let mut agent = ChatAgent::new("a", "sys", model.clone());
        assert!(agent.step("x").await.is_err());
        assert_eq!(model.calls(), 1);
        assert!(agent.window().is_empty());
    }

    fn search_tools() -> ToolBox {
        let search: SharedSearch = Stub::new(CapabilityKind::WebSearch, |_: &SearchRequest| {
            Ok(vec![SearchHit { title: "Precedent".into(), url: "https://x".into(), snippet: String::new() }])
        });
        ToolBox::new(1000, RetryPolicy::none()).with_search(Some(search))
    }

    #[tokio::test]
    async fn test_tool_call_result_fed_back() {
        let model = ScriptedCompletion::script(|req, idx| match idx {
            0 => Ok(r#"{"tool": "web_search", "arguments": {"query": "precedent"}}"#.into()),
            _ => Ok(format!("answer using: {}", req.last_user_message().unwrap_or_default())),
        });
        let mut agent = ChatAgent::new("r", "sys", model.clone()).with_tools(search_tools());
        assert!(agent.system_prompt().contains("web_search"));

        let reply = agent.step("research").await.unwrap();
        assert_eq!(reply.tool_calls, 1);
        assert!(reply.content.contains("Tool web_search returned"));
        assert!(reply.content.contains("Precedent"));
        // the window only keeps the user message and the final answer
        assert_eq!(agent.window().len(), 2);
    }

    #[tokio::test]
    async fn test_tool_calls_are_bounded() {
        let model = ScriptedCompletion::fixed(r#"{"tool": "web_search", "arguments": {"query": "again"}}"#);
        let mut agent = ChatAgent::new("r", "sys", model.clone()).with_tools(search_tools());
        let reply = agent.step("loop").await.unwrap();
        assert_eq!(reply.tool_calls, MAX_TOOL_CALLS);
        assert_eq!(model.calls(), MAX_TOOL_CALLS + 1);
    }

    #[tokio::test]
    async fn test_invalid_tool_call_reported_to_model() {
        let model = ScriptedCompletion::script(|req, idx| match idx {
            0 => Ok(r#"{"tool": "web_search", "arguments": {}}"#.into()),
            _ => Ok(req.last_user_message().unwrap_or_default().to_string()),
        });
        let mut agent = ChatAgent::new("r", "sys", model).with_tools(search_tools());
        let reply = agent.step("go").await.unwrap();
        assert!(reply.content.starts_with("Invalid tool call"));
    }

    #[tokio::test]
    async fn test_without_tools_json_is_plain_text() {
        let json = r#"{"tool": "web_search", "arguments": {"query": "x"}}"#;
        let model = ScriptedCompletion::fixed(json);
        let mut agent = ChatAgent::new("a", "sys", model.clone()).with_tools(ToolBox::new(10, RetryPolicy::none()));
        assert!(!agent.has_tools());
        assert_eq!(agent.step("x").await.unwrap().content, json);
        assert_eq!(model.calls(), 1);
    }
}
