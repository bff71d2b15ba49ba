//! API credentials
//!
//! Keys are read from the environment exactly once at startup (or typed at a
//! masked terminal prompt) and then handed to each capability client at
//! construction. Nothing reads the process environment at call time.

use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use tracing::debug;

use crate::config::{AdvisorConfig, ProviderName, SearchProvider};
use crate::error::{Error, Result};

/// Every credential the advisor knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    Chunkr,
    OpenAi,
    Mistral,
    Qwen,
    Firecrawl,
    GoogleApi,
    SearchEngineId,
    FishAudio,
    Neo4jUsername,
    Neo4jPassword,
}

impl CredentialKey {
    pub const ALL: [CredentialKey; 10] = [
        CredentialKey::Chunkr,
        CredentialKey::OpenAi,
        CredentialKey::Mistral,
        CredentialKey::Qwen,
        CredentialKey::Firecrawl,
        CredentialKey::GoogleApi,
        CredentialKey::SearchEngineId,
        CredentialKey::FishAudio,
        CredentialKey::Neo4jUsername,
        CredentialKey::Neo4jPassword,
    ];

    pub fn env_var(&self) -> &'static str {
        match self {
            CredentialKey::Chunkr => "CHUNKR_API_KEY",
            CredentialKey::OpenAi => "OPENAI_API_KEY",
            CredentialKey::Mistral => "MISTRAL_API_KEY",
            CredentialKey::Qwen => "QWEN_API_KEY",
            CredentialKey::Firecrawl => "FIRECRAWL_API_KEY",
            CredentialKey::GoogleApi => "GOOGLE_API_KEY",
            CredentialKey::SearchEngineId => "SEARCH_ENGINE_ID",
            CredentialKey::FishAudio => "FISHAUDIO_API_KEY",
            CredentialKey::Neo4jUsername => "NEO4J_USERNAME",
            CredentialKey::Neo4jPassword => "NEO4J_PASSWORD",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CredentialKey::Chunkr => "Chunkr API key",
            CredentialKey::OpenAi => "OpenAI API key",
            CredentialKey::Mistral => "Mistral API key",
            CredentialKey::Qwen => "Qwen (DashScope) API key",
            CredentialKey::Firecrawl => "Firecrawl API key",
            CredentialKey::GoogleApi => "Google API key",
            CredentialKey::SearchEngineId => "Search Engine ID",
            CredentialKey::FishAudio => "Fish Audio API key",
            CredentialKey::Neo4jUsername => "Neo4j username",
            CredentialKey::Neo4jPassword => "Neo4j password",
        }
    }

    /// Identifiers are echoed while typing, keys and passwords are masked
    fn masked(&self) -> bool {
        !matches!(self, CredentialKey::SearchEngineId | CredentialKey::Neo4jUsername)
    }

    pub fn for_provider(provider: ProviderName) -> Self {
        match provider {
            ProviderName::OpenAi => CredentialKey::OpenAi,
            ProviderName::Mistral => CredentialKey::Mistral,
            ProviderName::Qwen => CredentialKey::Qwen,
        }
    }
}

/// A credential value that never prints itself
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Credentials resolved for one run
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    values: HashMap<CredentialKey, Secret>,
}

impl Credentials {
    /// Snapshot every known variable from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut credentials = Self::default();
        for key in CredentialKey::ALL {
            if let Some(value) = lookup(key.env_var()) {
                credentials.insert(key, value);
            }
        }
        debug!(present = credentials.values.len(), "Credentials resolved");
        credentials
    }

    /// Blank values count as absent
    pub fn insert(&mut self, key: CredentialKey, value: impl Into<String>) {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, Secret::new(trimmed));
        }
    }

    pub fn get(&self, key: CredentialKey) -> Option<&Secret> {
        self.values.get(&key)
    }

    pub fn contains(&self, key: CredentialKey) -> bool {
        self.values.contains_key(&key)
    }

    pub fn require(&self, key: CredentialKey, capability: impl fmt::Display) -> Result<&Secret> {
        self.get(key).ok_or_else(|| Error::MissingCredential {
            variable: key.env_var(),
            capability: capability.to_string(),
        })
    }

    /// Credentials without which no run can start
    pub fn required_keys(config: &AdvisorConfig) -> Vec<CredentialKey> {
        let mut keys = vec![
            CredentialKey::Chunkr,
            CredentialKey::for_provider(config.models.analyst.provider),
            CredentialKey::for_provider(config.models.evaluator.provider),
        ];
        dedup(&mut keys);
        keys
    }

    /// Credentials that unlock optional stages
    pub fn optional_keys(config: &AdvisorConfig) -> Vec<CredentialKey> {
        let mut keys = vec![
            CredentialKey::for_provider(config.models.summarizer.provider),
            CredentialKey::for_provider(config.models.knowledge.provider),
            CredentialKey::for_provider(config.retrieval.provider),
            CredentialKey::Firecrawl,
        ];
        if config.search.provider == SearchProvider::Google {
            keys.push(CredentialKey::GoogleApi);
            keys.push(CredentialKey::SearchEngineId);
        }
        if config.graph.enabled {
            keys.push(CredentialKey::Neo4jUsername);
            keys.push(CredentialKey::Neo4jPassword);
        }
        if config.speech.enabled {
            keys.push(CredentialKey::FishAudio);
        }
        let required = Self::required_keys(config);
        keys.retain(|k| !required.contains(k));
        dedup(&mut keys);
        keys
    }

    /// Prompt on the terminal for each listed key that is still missing
    ///
    /// An empty answer leaves the key unset.
    pub fn prompt_missing(&mut self, keys: &[CredentialKey]) -> Result<()> {
        for key in keys {
            if self.contains(*key) {
                continue;
            }
            if let Some(value) = read_secret(&format!("Enter your {}: ", key.label()), key.masked())? {
                self.insert(*key, value);
            }
        }
        Ok(())
    }
}

fn dedup(keys: &mut Vec<CredentialKey>) {
    let mut seen = Vec::with_capacity(keys.len());
    keys.retain(|k| {
        if seen.contains(k) {
            false
        } else {
            seen.push(*k);
            true
        }
    });
}

/// Restores cooked mode even when reading fails
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawModeGuard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Read one line from the terminal, echoing `*` for masked input
fn read_secret(prompt: &str, masked: bool) -> Result<Option<String>> {
    let mut stderr = std::io::stderr();
    write!(stderr, "{}", prompt)?;
    stderr.flush()?;

    let mut value = String::new();
    {
        let _raw = RawModeGuard::enable()?;
        loop {
            let Event::Key(KeyEvent {
                code,
                modifiers,
                kind,
                ..
            }) = event::read()?
            else {
                continue;
            };
            if kind != KeyEventKind::Press {
                continue;
            }

            match code {
                KeyCode::Enter => break,
                KeyCode::Esc => {
                    value.clear();
                    break;
                }
                KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                    drop(_raw);
                    writeln!(stderr)?;
                    return Err(Error::Internal("Credential prompt cancelled".to_string()));
                }
                KeyCode::Backspace => {
                    if value.pop().is_some() {
                        write!(stderr, "\x08 \x08")?;
                    }
                }
                KeyCode::Char(c) => {
                    value.push(c);
                    if masked {
                        write!(stderr, "*")?;
                    } else {
                        write!(stderr, "{}", c)?;
                    }
                }
                _ => {}
            }
            stderr.flush()?;
        }
    }
    writeln!(stderr)?;

    Ok(if value.trim().is_empty() { None } else { Some(value) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(pairs: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            pairs
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let creds = Credentials::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-very-secret")]));
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("sk-very-secret"));
        assert!(printed.contains("***"));
    }

    #[test]
    fn test_blank_values_are_absent() {
        let creds = Credentials::from_lookup(lookup(&[("CHUNKR_API_KEY", "   ")]));
        assert!(!creds.contains(CredentialKey::Chunkr));
    }

    #[test]
    fn test_require_reports_variable() {
        let creds = Credentials::default();
        let err = creds
            .require(CredentialKey::Chunkr, "document-extraction")
            .unwrap_err();
        assert!(err.to_string().contains("CHUNKR_API_KEY"));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn test_required_keys_follow_model_providers() {
        let config = AdvisorConfig::default();
        let keys = Credentials::required_keys(&config);
        assert_eq!(
            keys,
            vec![CredentialKey::Chunkr, CredentialKey::Qwen, CredentialKey::OpenAi]
        );

        let mut config = AdvisorConfig::default();
        config.models.analyst.provider = ProviderName::OpenAi;
        assert_eq!(
            Credentials::required_keys(&config),
            vec![CredentialKey::Chunkr, CredentialKey::OpenAi]
        );
    }

    #[test]
    fn test_optional_keys_exclude_required() {
        let config = AdvisorConfig::default();
        let optional = Credentials::optional_keys(&config);
        assert!(optional.contains(&CredentialKey::Mistral));
        assert!(optional.contains(&CredentialKey::FishAudio));
        assert!(!optional.contains(&CredentialKey::OpenAi));
        assert!(!optional.contains(&CredentialKey::GoogleApi));
    }
}
