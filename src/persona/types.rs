//! Core types for the persona roster.
//!
//! A persona is the static framing an evaluator unit argues from: who it is,
//! how it talks, and how it scores risk.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────
// Persona Role
// ─────────────────────────────────────────────────────────────────

/// How a persona takes part in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PersonaRole {
    /// Scores the contract from its own perspective.
    Evaluator,
    /// Produces supporting research the evaluators can lean on.
    Helper,
}

impl PersonaRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonaRole::Evaluator => "evaluator",
            PersonaRole::Helper => "helper",
        }
    }
}

impl fmt::Display for PersonaRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evaluator" => Ok(PersonaRole::Evaluator),
            "helper" => Ok(PersonaRole::Helper),
            _ => Err(format!("Unknown persona role '{}'. Valid: evaluator, helper", s)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Persona
// ─────────────────────────────────────────────────────────────────

/// One debate participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    pub role: PersonaRole,
    /// One-line description for listings
    #[serde(default)]
    pub summary: String,
    pub behavior_description: String,
    #[serde(default)]
    pub example_output: String,
    /// Falls back to the roster's default rubric when absent
    #[serde(default)]
    pub scoring_rubric: Option<String>,
}

impl Persona {
    pub fn is_helper(&self) -> bool {
        self.role == PersonaRole::Helper
    }

    pub fn rubric(&self) -> &str {
        self.scoring_rubric.as_deref().unwrap_or_default()
    }

    /// System prompt for this persona.
    ///
    /// Evaluators get the risk-evaluator framing with their behavior, example
    /// and rubric embedded verbatim; helpers use their behavior description
    /// as-is.
    pub fn system_prompt(&self) -> String {
        match self.role {
            PersonaRole::Helper => self.behavior_description.trim().to_string(),
            PersonaRole::Evaluator => format!(
                "You are a contract risk evaluator.\n\
                 This is your persona that you MUST act with: {persona}\n\
                 Here is an example feedback that you might give with your persona, \
                 you MUST try your best to align with this:\n{example}\n\
                 When evaluating risks, you must use the following criteria:\n{criteria}\n\
                 You also need to give risk scores based on these criteria, from 1-4. \
                 The score given should be like 3/4, 2/4, etc.",
                persona = self.behavior_description.trim(),
                example = self.example_output.trim(),
                criteria = self.rubric().trim(),
            ),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Roster File
// ─────────────────────────────────────────────────────────────────

/// On-disk shape of a roster TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RosterFile {
    #[serde(default)]
    pub default_rubric: Option<String>,
    #[serde(default)]
    pub personas: Vec<Persona>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluator() -> Persona {
        Persona {
            name: "Black Hat Thinker".into(),
            role: PersonaRole::Evaluator,
            summary: "Cautious".into(),
            behavior_description: "You list every risk.".into(),
            example_output: "1. Legal risk...".into(),
            scoring_rubric: Some("4: high\n1: low".into()),
        }
    }

    #[test]
    fn test_evaluator_prompt_embeds_persona_verbatim() {
        let prompt = evaluator().system_prompt();
        assert!(prompt.starts_with("You are a contract risk evaluator."));
        assert!(prompt.contains("you MUST act with: You list every risk."));
        assert!(prompt.contains("1. Legal risk..."));
        assert!(prompt.contains("4: high\n1: low"));
        assert!(prompt.contains("3/4, 2/4"));
    }

    #[test]
    fn test_helper_prompt_is_behavior() {
        let mut p = evaluator();
        p.role = PersonaRole::Helper;
        assert_eq!(p.system_prompt(), "You list every risk.");
        assert!(p.is_helper());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Helper".parse::<PersonaRole>().unwrap(), PersonaRole::Helper);
        assert!("judge".parse::<PersonaRole>().is_err());
    }

    #[test]
    fn test_role_serde_lowercase() {
        let file: RosterFile = toml::from_str(
            r#"
            [[personas]]
            name = "A"
            role = "helper"
            behavior_description = "b"
            "#,
        )
        .unwrap();
        assert_eq!(file.personas[0].role, PersonaRole::Helper);
        assert!(file.personas[0].scoring_rubric.is_none());
    }
}
