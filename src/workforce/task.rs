//! Task descriptor

use serde::Serialize;

/// Immutable unit of work handed to every evaluator unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskDescriptor {
    id: String,
    content: String,
    additional_info: String,
}

impl TaskDescriptor {
    pub fn new(id: impl Into<String>, content: impl Into<String>, additional_info: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            additional_info: additional_info.into(),
        }
    }

    /// Descriptor with a random id
    pub fn with_random_id(content: impl Into<String>, additional_info: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), content, additional_info)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn additional_info(&self) -> &str {
        &self.additional_info
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        let task = TaskDescriptor::new("0", "evaluate", "report");
        assert_eq!(task.id(), "0");
        assert_eq!(task.content(), "evaluate");
        assert_eq!(task.additional_info(), "report");
    }

    #[test]
    fn test_random_ids_differ() {
        let a = TaskDescriptor::with_random_id("c", "");
        let b = TaskDescriptor::with_random_id("c", "");
        assert_ne!(a.id(), b.id());
    }
}
