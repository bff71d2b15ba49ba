//! Scripted capability fakes for tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};

use super::completion::{Completion, CompletionRequest};
use super::{Capability, CapabilityKind};

type Responder = Box<dyn Fn(&CompletionRequest, usize) -> Result<String> + Send + Sync>;

/// How a scripted completion answers
pub enum Behavior {
    /// Always the same text
    Fixed(String),
    /// System prompt and last user message, separated by a marker line
    Echo,
    /// Always a retryable unavailability error
    Unavailable,
    /// Always a malformed-response error
    Malformed,
    /// Arbitrary answer computed from the request and the 0-based call index
    Script(Responder),
}

pub struct ScriptedCompletion {
    behavior: Behavior,
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedCompletion {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            behavior,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn fixed(text: impl Into<String>) -> Arc<Self> {
        Self::new(Behavior::Fixed(text.into()))
    }

    pub fn echo() -> Arc<Self> {
        Self::new(Behavior::Echo)
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Behavior::Unavailable)
    }

    pub fn script<F>(f: F) -> Arc<Self>
    where
        F: Fn(&CompletionRequest, usize) -> Result<String> + Send + Sync + 'static,
    {
        Self::new(Behavior::Script(Box::new(f)))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Capability for ScriptedCompletion {
    type Request = CompletionRequest;
    type Response = Completion;

    fn kind(&self) -> CapabilityKind {
        CapabilityKind::ModelCompletion
    }

    async fn invoke(&self, request: CompletionRequest) -> Result<Completion> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());

        let content = match &self.behavior {
            Behavior::Fixed(text) => text.clone(),
            Behavior::Echo => format!(
                "{}\n---\n{}",
                request.system_prompt().unwrap_or_default(),
                request.last_user_message().unwrap_or_default()
            ),
            Behavior::Unavailable => {
                return Err(Error::unavailable(CapabilityKind::ModelCompletion, "scripted outage"))
            }
            Behavior::Malformed => {
                return Err(Error::malformed(CapabilityKind::ModelCompletion, "scripted garbage"))
            }
            Behavior::Script(f) => f(&request, index)?,
        };

        Ok(Completion {
            content,
            model: "scripted".to_string(),
            finish_reason: Some("stop".to_string()),
            usage: None,
        })
    }
}

/// Generic counting stub for the non-completion capabilities
pub struct Stub<Req, Resp> {
    kind: CapabilityKind,
    calls: AtomicUsize,
    respond: Box<dyn Fn(&Req) -> Result<Resp> + Send + Sync>,
}

impl<Req, Resp> Stub<Req, Resp> {
    pub fn new<F>(kind: CapabilityKind, respond: F) -> Arc<Self>
    where
        F: Fn(&Req) -> Result<Resp> + Send + Sync + 'static,
    {
        Arc::new(Self {
            kind,
            calls: AtomicUsize::new(0),
            respond: Box::new(respond),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<Req, Resp> Capability for Stub<Req, Resp>
where
    Req: Send + Sync + 'static,
    Resp: Send + 'static,
{
    type Request = Req;
    type Response = Resp;

    fn kind(&self) -> CapabilityKind {
        self.kind
    }

    async fn invoke(&self, request: Req) -> Result<Resp> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.respond)(&request)
    }
}
