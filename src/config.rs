//! Configuration system for contract-advisor
//!
//! Supports multiple configuration sources with the following precedence (highest to lowest):
//! 1. CLI arguments
//! 2. Environment variables (CONTRACT_ADVISOR_* prefix)
//! 3. Configuration file (TOML)
//! 4. Default values
//!
//! API credentials never live here; see `credentials`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};

const ENV_PREFIX: &str = "CONTRACT_ADVISOR_";

/// Main advisor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisorConfig {
    pub logging: LoggingSettings,
    pub storage: StorageSettings,
    /// Model provider endpoints
    pub providers: ProvidersSettings,
    /// Which provider and model each agent role uses
    pub models: ModelsSettings,
    pub extraction: ExtractionSettings,
    pub scrape: ScrapeSettings,
    pub search: SearchSettings,
    pub retrieval: RetrievalSettings,
    pub graph: GraphSettings,
    pub speech: SpeechSettings,
    pub debate: DebateSettings,
    /// Backoff applied by callers around capability invocations
    pub retry: RetrySettings,
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level: trace, debug, info, warn, error
    pub level: String,

    /// Log file path (empty = no file logging)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// Maximum log file size in MB before rotation
    pub max_file_size_mb: u64,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Enable JSON formatted logging
    pub json_format: bool,
}

/// Storage path settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Parent of the per-run staging directories
    pub staging_dir: String,

    /// Default directory for report.json, extracted.json and audio
    pub output_dir: String,
}

/// Known model providers, all speaking the OpenAI chat-completions dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    OpenAi,
    Mistral,
    Qwen,
}

impl ProviderName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::OpenAi => "openai",
            ProviderName::Mistral => "mistral",
            ProviderName::Qwen => "qwen",
        }
    }
}

impl std::fmt::Display for ProviderName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSettings {
    pub openai: ProviderSettings,
    pub mistral: ProviderSettings,
    pub qwen: ProviderSettings,
}

impl ProvidersSettings {
    pub fn get(&self, provider: ProviderName) -> &ProviderSettings {
        match provider {
            ProviderName::OpenAi => &self.openai,
            ProviderName::Mistral => &self.mistral,
            ProviderName::Qwen => &self.qwen,
        }
    }

    fn get_mut(&mut self, provider: ProviderName) -> &mut ProviderSettings {
        match provider {
            ProviderName::OpenAi => &mut self.openai,
            ProviderName::Mistral => &mut self.mistral,
            ProviderName::Qwen => &mut self.qwen,
        }
    }
}

/// Provider + model for one agent role
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSettings {
    pub provider: ProviderName,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsSettings {
    /// Contract analyst (lawyer questionnaire)
    pub analyst: ModelSettings,
    /// Persona evaluators in the debate
    pub evaluator: ModelSettings,
    /// Debate summarizer
    pub summarizer: ModelSettings,
    /// Knowledge research and graph extraction
    pub knowledge: ModelSettings,
}

/// Document extraction service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Upper bound on status polls before giving up
    pub max_poll_attempts: u32,
    pub poll_initial_interval_ms: u64,
    pub poll_max_interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchProvider {
    DuckDuckGo,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub provider: SearchProvider,
    /// DuckDuckGo HTML endpoint
    pub duckduckgo_url: String,
    /// Google Custom Search JSON API endpoint
    pub google_url: String,
    pub max_results: usize,
    pub timeout_secs: u64,
}

/// Embedding-based passage retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    /// Provider serving the embeddings endpoint
    pub provider: ProviderName,
    pub model: String,
    pub top_k: usize,
    pub similarity_threshold: f32,
    /// Context size of the knowledge model in tokens
    pub max_context_tokens: usize,
    /// Share of the context a single retrieval result may occupy
    pub context_budget_ratio: f64,
    pub chars_per_token: usize,
    /// Target passage length when splitting scraped pages
    pub chunk_chars: usize,
}

impl RetrievalSettings {
    /// Character budget for one retrieval tool result
    pub fn char_budget(&self) -> usize {
        (self.max_context_tokens as f64 * self.context_budget_ratio) as usize * self.chars_per_token
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSettings {
    pub enabled: bool,
    /// Neo4j HTTP endpoint (e.g., http://localhost:7474)
    pub url: String,
    pub database: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub enabled: bool,
    pub base_url: String,
    /// Audio container requested from the service (mp3, wav, opus)
    pub format: String,
    /// Voice model id (service default when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    Concurrent,
    Sequential,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateSettings {
    /// Conversation window bound per agent
    pub window_size: usize,
    /// Round cap for instructor/assistant sessions
    pub max_rounds: usize,
    pub dispatch: DispatchMode,
    /// Persona roster file (bundled roster when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personas_file: Option<String>,
    /// Ask the summarizer model for a final verdict
    pub summarize: bool,
    /// Language every agent is told to answer in
    pub output_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts including the first call
    pub max_attempts: u32,
    pub initial_interval_ms: u64,
    pub max_interval_ms: u64,
    pub multiplier: f64,
}

// Default implementations

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            max_file_size_mb: 100,
            max_files: 5,
            json_format: false,
        }
    }
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            staging_dir: "~/.contract-advisor/staging".to_string(),
            output_dir: "./advisor-output".to_string(),
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 120,
        }
    }
}

impl Default for ProvidersSettings {
    fn default() -> Self {
        Self {
            openai: ProviderSettings::default(),
            mistral: ProviderSettings {
                base_url: "https://api.mistral.ai/v1".to_string(),
                ..Default::default()
            },
            qwen: ProviderSettings {
                base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
                ..Default::default()
            },
        }
    }
}

impl Default for ModelsSettings {
    fn default() -> Self {
        Self {
            analyst: ModelSettings {
                provider: ProviderName::Qwen,
                model: "qwen-turbo".to_string(),
                temperature: Some(0.2),
            },
            evaluator: ModelSettings {
                provider: ProviderName::OpenAi,
                model: "gpt-4".to_string(),
                temperature: None,
            },
            summarizer: ModelSettings {
                provider: ProviderName::OpenAi,
                model: "gpt-4o-mini".to_string(),
                temperature: None,
            },
            knowledge: ModelSettings {
                provider: ProviderName::Mistral,
                model: "mistral-large-latest".to_string(),
                temperature: Some(0.2),
            },
        }
    }
}

impl Default for ExtractionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.chunkr.ai".to_string(),
            timeout_secs: 120,
            max_poll_attempts: 10,
            poll_initial_interval_ms: 2000,
            poll_max_interval_ms: 30000,
        }
    }
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.firecrawl.dev".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            provider: SearchProvider::DuckDuckGo,
            duckduckgo_url: "https://html.duckduckgo.com/html/".to_string(),
            google_url: "https://www.googleapis.com/customsearch/v1".to_string(),
            max_results: 5,
            timeout_secs: 30,
        }
    }
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            provider: ProviderName::Mistral,
            model: "mistral-embed".to_string(),
            top_k: 3,
            similarity_threshold: 0.5,
            max_context_tokens: 16384,
            context_budget_ratio: 0.1,
            chars_per_token: 4,
            chunk_chars: 1200,
        }
    }
}

impl Default for GraphSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: "http://localhost:7474".to_string(),
            database: "neo4j".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.fish.audio".to_string(),
            format: "mp3".to_string(),
            reference_id: None,
            timeout_secs: 120,
        }
    }
}

impl Default for DebateSettings {
    fn default() -> Self {
        Self {
            window_size: 10,
            max_rounds: 20,
            dispatch: DispatchMode::Concurrent,
            personas_file: None,
            summarize: true,
            output_language: "English".to_string(),
        }
    }
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval_ms: 500,
            max_interval_ms: 8000,
            multiplier: 2.0,
        }
    }
}

impl AdvisorConfig {
    /// Load configuration from file with environment variable overrides
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = match Self::find_config_file(config_path)? {
            Some(path) => {
                let config = Self::from_file(&path)?;
                info!(path = %path.display(), "Configuration loaded from file");
                config
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.expand_paths();
        config.validate()?;

        Ok(config)
    }

    /// Parse one TOML file without overrides or validation
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading configuration file");
        let content = fs::read_to_string(path).map_err(|source| Error::IoRead {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| Error::ConfigParse {
            message: format!("{}: {}", path.display(), e.message()),
            source: Some(e),
        })
    }

    /// Find the configuration file to use
    fn find_config_file(explicit_path: Option<&str>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            let path = PathBuf::from(expand_path(path));
            if path.exists() {
                return Ok(Some(path));
            }
            return Err(Error::ConfigNotFound { path });
        }

        let search_paths = [
            PathBuf::from("contract-advisor.toml"),
            dirs::config_dir()
                .map(|p| p.join("contract-advisor").join("config.toml"))
                .unwrap_or_default(),
            dirs::home_dir()
                .map(|p| p.join(".contract-advisor").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &search_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                debug!(path = %path.display(), "Found configuration file");
                return Ok(Some(path.clone()));
            }
        }

        debug!("No configuration file found, using defaults");
        Ok(None)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(format!("{}{}", ENV_PREFIX, key)).ok());
    }

    /// Apply overrides from a lookup keyed by the variable name without prefix
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |val: String| val.to_lowercase() == "true" || val == "1";

        // Logging
        if let Some(val) = lookup("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Some(val) = lookup("LOG_FILE") {
            self.logging.file = Some(val);
        }
        if let Some(val) = lookup("LOG_JSON") {
            self.logging.json_format = flag(val);
        }

        // Storage
        if let Some(val) = lookup("STAGING_DIR") {
            self.storage.staging_dir = val;
        }
        if let Some(val) = lookup("OUTPUT_DIR") {
            self.storage.output_dir = val;
        }

        // Providers
        for provider in [ProviderName::OpenAi, ProviderName::Mistral, ProviderName::Qwen] {
            let key = format!("{}_BASE_URL", provider.as_str().to_uppercase());
            if let Some(val) = lookup(&key) {
                self.providers.get_mut(provider).base_url = val;
            }
        }

        // Services
        if let Some(val) = lookup("EXTRACTION_URL") {
            self.extraction.base_url = val;
        }
        if let Some(n) = lookup("EXTRACTION_POLL_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.extraction.max_poll_attempts = n;
        }
        if let Some(n) = lookup("EXTRACTION_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.extraction.poll_initial_interval_ms = n;
        }
        if let Some(val) = lookup("SCRAPE_URL") {
            self.scrape.base_url = val;
        }
        if let Some(val) = lookup("SEARCH_PROVIDER") {
            match val.to_lowercase().as_str() {
                "google" => self.search.provider = SearchProvider::Google,
                "duckduckgo" => self.search.provider = SearchProvider::DuckDuckGo,
                other => debug!(value = other, "Ignoring unknown search provider override"),
            }
        }
        if let Some(val) = lookup("DUCKDUCKGO_URL") {
            self.search.duckduckgo_url = val;
        }
        if let Some(val) = lookup("GOOGLE_SEARCH_URL") {
            self.search.google_url = val;
        }
        if let Some(val) = lookup("GRAPH_URL") {
            self.graph.url = val;
        }
        if let Some(val) = lookup("GRAPH_ENABLED") {
            self.graph.enabled = flag(val);
        }
        if let Some(val) = lookup("SPEECH_URL") {
            self.speech.base_url = val;
        }
        if let Some(val) = lookup("SPEECH_ENABLED") {
            self.speech.enabled = flag(val);
        }

        // Debate
        if let Some(val) = lookup("DISPATCH") {
            match val.to_lowercase().as_str() {
                "sequential" => self.debate.dispatch = DispatchMode::Sequential,
                "concurrent" => self.debate.dispatch = DispatchMode::Concurrent,
                other => debug!(value = other, "Ignoring unknown dispatch override"),
            }
        }
        if let Some(n) = lookup("MAX_ROUNDS").and_then(|v| v.parse().ok()) {
            self.debate.max_rounds = n;
        }
        if let Some(val) = lookup("PERSONAS_FILE") {
            self.debate.personas_file = Some(val);
        }
        if let Some(val) = lookup("OUTPUT_LANGUAGE") {
            self.debate.output_language = val;
        }

        // Retry
        if let Some(n) = lookup("RETRY_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.retry.max_attempts = n;
        }
        if let Some(n) = lookup("RETRY_INITIAL_MS").and_then(|v| v.parse().ok()) {
            self.retry.initial_interval_ms = n;
        }
    }

    /// Expand ~ and other path variables
    fn expand_paths(&mut self) {
        self.storage.staging_dir = expand_path(&self.storage.staging_dir);
        self.storage.output_dir = expand_path(&self.storage.output_dir);

        if let Some(ref file) = self.logging.file {
            self.logging.file = Some(expand_path(file));
        }
        if let Some(ref file) = self.debate.personas_file {
            self.debate.personas_file = Some(expand_path(file));
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(Error::config_field_invalid(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Must be one of: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        let urls = [
            ("providers.openai.base_url", &self.providers.openai.base_url),
            ("providers.mistral.base_url", &self.providers.mistral.base_url),
            ("providers.qwen.base_url", &self.providers.qwen.base_url),
            ("extraction.base_url", &self.extraction.base_url),
            ("scrape.base_url", &self.scrape.base_url),
            ("search.duckduckgo_url", &self.search.duckduckgo_url),
            ("search.google_url", &self.search.google_url),
            ("graph.url", &self.graph.url),
            ("speech.base_url", &self.speech.base_url),
        ];
        for (field, value) in urls {
            validate_http_url(field, value)?;
        }

        let positives = [
            ("debate.window_size", self.debate.window_size),
            ("debate.max_rounds", self.debate.max_rounds),
            ("extraction.max_poll_attempts", self.extraction.max_poll_attempts as usize),
            ("retry.max_attempts", self.retry.max_attempts as usize),
            ("retrieval.top_k", self.retrieval.top_k),
            ("retrieval.chunk_chars", self.retrieval.chunk_chars),
            ("search.max_results", self.search.max_results),
        ];
        for (field, value) in positives {
            if value == 0 {
                return Err(Error::config_field_invalid(field, format!("{} must be greater than 0", field)));
            }
        }

        if self.retry.multiplier < 1.0 {
            return Err(Error::config_field_invalid(
                "retry.multiplier",
                "retry.multiplier must be at least 1.0",
            ));
        }

        if !(0.0..=1.0).contains(&self.retrieval.context_budget_ratio) {
            return Err(Error::config_field_invalid(
                "retrieval.context_budget_ratio",
                "retrieval.context_budget_ratio must be between 0 and 1",
            ));
        }

        if self.debate.output_language.trim().is_empty() {
            return Err(Error::config_field_invalid(
                "debate.output_language",
                "debate.output_language cannot be empty",
            ));
        }

        Ok(())
    }

    pub fn staging_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.staging_dir)
    }

    pub fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.output_dir)
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::config_field_invalid(field, format!("{} is not a valid URL ({}): {}", field, value, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::config_field_invalid(
            field,
            format!("{} must use http or https, got {}", field, scheme),
        )),
    }
}

/// Expand ~ and environment variables in paths
pub fn expand_path(path: &str) -> String {
    shellexpand::full(path)
        .unwrap_or_else(|_| std::borrow::Cow::Borrowed(path))
        .into_owned()
}

/// Default location used by `config init`
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".contract-advisor")
        .join("config.toml")
}

/// Initialize a new configuration file, returning where it was written
pub fn init_config(path: Option<&str>, force: bool) -> Result<PathBuf> {
    let config_path = path
        .map(|p| PathBuf::from(expand_path(p)))
        .unwrap_or_else(default_config_path);

    if config_path.exists() && !force {
        return Err(Error::config_validation(format!(
            "Configuration file already exists: {}. Use --force to overwrite.",
            config_path.display()
        )));
    }

    if let Some(parent) = config_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| Error::IoWrite {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(&config_path, generate_default_config()).map_err(|source| Error::IoWrite {
        path: config_path.clone(),
        source,
    })?;

    Ok(config_path)
}

/// Generate default configuration content with comments
fn generate_default_config() -> String {
    r#"# contract-advisor configuration
#
# API keys are NOT stored here. Export them instead:
#   CHUNKR_API_KEY, OPENAI_API_KEY, MISTRAL_API_KEY, QWEN_API_KEY,
#   FIRECRAWL_API_KEY, GOOGLE_API_KEY, SEARCH_ENGINE_ID,
#   FISHAUDIO_API_KEY, NEO4J_USERNAME, NEO4J_PASSWORD

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log file path (comment out to disable file logging)
# file = "~/.contract-advisor/logs/advisor.log"

# Maximum log file size in MB before rotation
max_file_size_mb = 100

# Number of rotated log files to keep
max_files = 5

# Enable JSON formatted logging
json_format = false

[storage]
# Per-run staging directories are created (and removed) under this path
staging_dir = "~/.contract-advisor/staging"

# Default output directory for report.json, extracted.json and audio
output_dir = "./advisor-output"

[providers.openai]
base_url = "https://api.openai.com/v1"
timeout_secs = 120

[providers.mistral]
base_url = "https://api.mistral.ai/v1"
timeout_secs = 120

[providers.qwen]
base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1"
timeout_secs = 120

[models.analyst]
provider = "qwen"
model = "qwen-turbo"
temperature = 0.2

[models.evaluator]
provider = "openai"
model = "gpt-4"

[models.summarizer]
provider = "openai"
model = "gpt-4o-mini"

[models.knowledge]
provider = "mistral"
model = "mistral-large-latest"
temperature = 0.2

[extraction]
base_url = "https://api.chunkr.ai"
timeout_secs = 120

# Status polls before the extraction job is considered timed out
max_poll_attempts = 10
poll_initial_interval_ms = 2000
poll_max_interval_ms = 30000

[scrape]
base_url = "https://api.firecrawl.dev"
timeout_secs = 60

[search]
# duckduckgo (no key) or google (GOOGLE_API_KEY + SEARCH_ENGINE_ID)
provider = "duckduckgo"
duckduckgo_url = "https://html.duckduckgo.com/html/"
google_url = "https://www.googleapis.com/customsearch/v1"
max_results = 5
timeout_secs = 30

[retrieval]
provider = "mistral"
model = "mistral-embed"
top_k = 3
similarity_threshold = 0.5
max_context_tokens = 16384
context_budget_ratio = 0.1
chars_per_token = 4
chunk_chars = 1200

[graph]
enabled = true
url = "http://localhost:7474"
database = "neo4j"
timeout_secs = 30

[speech]
enabled = true
base_url = "https://api.fish.audio"
format = "mp3"
# reference_id = "voice-model-id"
timeout_secs = 120

[debate]
# Conversation window bound per agent
window_size = 10

# Round cap for the research session
max_rounds = 20

# concurrent or sequential fan-out to evaluators
dispatch = "concurrent"

# Persona roster (bundled roster when unset)
# personas_file = "~/.contract-advisor/personas.toml"

summarize = true
output_language = "English"

[retry]
max_attempts = 3
initial_interval_ms = 500
max_interval_ms = 8000
multiplier = 2.0
"#
    .to_string()
}
