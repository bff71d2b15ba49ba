//! Persona registry: the bundled roster or a user-supplied roster file.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Error, Result};

use super::types::{Persona, PersonaRole, RosterFile};

const BUNDLED_ROSTER: &str = include_str!("../../config/personas.toml");

/// Validated, ordered persona roster.
#[derive(Debug, Clone)]
pub struct PersonaRegistry {
    personas: Vec<Persona>,
    bundled: bool,
}

impl PersonaRegistry {
    /// The roster shipped with the binary.
    pub fn bundled() -> Result<Self> {
        Self::parse(BUNDLED_ROSTER, "bundled roster", true)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading persona roster");
        let content = fs::read_to_string(path).map_err(|source| Error::IoRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string(), false)
    }

    /// User roster when configured, bundled otherwise.
    pub fn load(personas_file: Option<&str>) -> Result<Self> {
        let registry = match personas_file {
            Some(path) => Self::from_file(Path::new(path))?,
            None => Self::bundled()?,
        };
        info!(
            personas = registry.len(),
            bundled = registry.bundled,
            "Persona roster loaded"
        );
        Ok(registry)
    }

    fn parse(content: &str, origin: &str, bundled: bool) -> Result<Self> {
        let file: RosterFile = toml::from_str(content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", origin, e.message()),
            source: Some(e),
        })?;

        let default_rubric = file.default_rubric.unwrap_or_default();
        let mut personas = file.personas;
        for persona in personas.iter_mut() {
            if persona.scoring_rubric.as_deref().map_or(true, |r| r.trim().is_empty()) {
                persona.scoring_rubric = Some(default_rubric.clone());
            }
        }

        let registry = Self { personas, bundled };
        registry.validate()?;
        Ok(registry)
    }

    fn validate(&self) -> Result<()> {
        if !self.personas.iter().any(|p| p.role == PersonaRole::Evaluator) {
            return Err(Error::config_field_invalid(
                "personas",
                "roster must contain at least one evaluator",
            ));
        }

        let mut seen = HashSet::new();
        for persona in &self.personas {
            if persona.name.trim().is_empty() {
                return Err(Error::config_field_invalid("personas.name", "persona name cannot be empty"));
            }
            if persona.behavior_description.trim().is_empty() {
                return Err(Error::config_field_invalid(
                    "personas.behavior_description",
                    format!("persona '{}' has no behavior description", persona.name),
                ));
            }
            if !seen.insert(persona.name.as_str()) {
                return Err(Error::config_field_invalid(
                    "personas.name",
                    format!("duplicate persona name '{}'", persona.name),
                ));
            }
        }
        Ok(())
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn get(&self, name: &str) -> Option<&Persona> {
        self.personas.iter().find(|p| p.name == name)
    }

    pub fn len(&self) -> usize {
        self.personas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }

    pub fn is_bundled(&self) -> bool {
        self.bundled
    }

    /// Summaries for `personas list`.
    pub fn list_available(&self) -> Vec<PersonaListing> {
        self.personas
            .iter()
            .map(|p| PersonaListing {
                name: p.name.clone(),
                role: p.role,
                summary: p.summary.clone(),
            })
            .collect()
    }
}

/// Summary of an available persona.
#[derive(Debug, Clone)]
pub struct PersonaListing {
    pub name: String,
    pub role: PersonaRole,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_bundled_roster() {
        let registry = PersonaRegistry::bundled().unwrap();
        assert_eq!(registry.len(), 7);
        assert!(registry.is_bundled());

        let helpers: Vec<_> = registry.personas().iter().filter(|p| p.is_helper()).collect();
        assert_eq!(helpers.len(), 1);
        assert_eq!(helpers[0].name, "Legal Researcher");

        let black = registry.get("Black Hat Thinker").unwrap();
        assert!(black.rubric().contains("High risk"));
    }

    #[test]
    fn test_list_available_keeps_order() {
        let list = PersonaRegistry::bundled().unwrap().list_available();
        assert_eq!(list.first().unwrap().name, "White Hat Thinker");
        assert_eq!(list.last().unwrap().role, PersonaRole::Helper);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let roster = r#"
            [[personas]]
            name = "A"
            role = "evaluator"
            behavior_description = "x"

            [[personas]]
            name = "A"
            role = "helper"
            behavior_description = "y"
        "#;
        let err = PersonaRegistry::parse(roster, "test", false).unwrap_err();
        assert!(err.to_string().contains("duplicate persona name"));
    }

    #[test]
    fn test_roster_without_evaluator_rejected() {
        let roster = r#"
            [[personas]]
            name = "R"
            role = "helper"
            behavior_description = "y"
        "#;
        assert!(matches!(
            PersonaRegistry::parse(roster, "test", false),
            Err(Error::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_own_rubric_wins_over_default() {
        let roster = r#"
            default_rubric = "shared"

            [[personas]]
            name = "A"
            role = "evaluator"
            behavior_description = "x"
            scoring_rubric = "own"

            [[personas]]
            name = "B"
            role = "evaluator"
            behavior_description = "x"
        "#;
        let registry = PersonaRegistry::parse(roster, "test", false).unwrap();
        assert_eq!(registry.get("A").unwrap().rubric(), "own");
        assert_eq!(registry.get("B").unwrap().rubric(), "shared");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("roster.toml");
        fs::write(
            &path,
            "[[personas]]\nname = \"Solo\"\nrole = \"evaluator\"\nbehavior_description = \"b\"\n",
        )
        .unwrap();

        let registry = PersonaRegistry::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_bundled());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = PersonaRegistry::load(Some("/nonexistent/roster.toml")).unwrap_err();
        assert!(matches!(err, Error::IoRead { .. }));
    }
}
