//! Error types for contract-advisor
//!
//! Provides structured error handling with:
//! - Numeric error codes for machine parsing
//! - Retry classification for capability calls
//! - User-friendly hints
//! - Exit codes for the CLI

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Numeric error codes for machine parsing and documentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (1xx)
    ConfigNotFound = 100,
    ConfigParseError = 101,
    ConfigValidation = 102,
    MissingCredential = 104,

    // IO and input errors (2xx)
    IoRead = 200,
    IoWrite = 201,
    IoPermission = 202,
    IoNotFound = 203,
    EmptyInput = 204,
    ImageDecode = 205,

    // Capability errors (3xx)
    CapabilityUnavailable = 300,
    CapabilityTimeout = 301,
    CapabilityMalformedResponse = 302,
    CapabilityRejected = 303,

    // Workforce errors (5xx)
    PartialFailure = 504,
    DuplicateUnit = 505,
    DuplicateTask = 506,
    InvalidTransition = 507,
    EmptyWorkforce = 508,

    // Internal errors (9xx)
    InternalError = 900,
}

impl ErrorCode {
    /// String code (e.g., "E300")
    pub fn as_str(&self) -> String {
        format!("E{}", *self as u16)
    }

    /// Exit code for the CLI (one per code class)
    pub fn exit_code(&self) -> i32 {
        match *self as u16 {
            100..=199 => 10,
            200..=299 => 20,
            300..=399 => 30,
            500..=599 => 50,
            900..=999 => 90,
            _ => 1,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Configuration Errors
    // ─────────────────────────────────────────────────────────────

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Configuration parse error
    #[error("Failed to parse configuration: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<toml::de::Error>,
    },

    /// Configuration validation error
    #[error("Configuration validation failed: {message}")]
    ConfigValidation { message: String, field: Option<String> },

    /// A required API credential was not supplied
    #[error("Missing credential {variable} required by {capability}")]
    MissingCredential {
        variable: &'static str,
        capability: String,
    },

    // ─────────────────────────────────────────────────────────────
    // IO and Input Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Failed to read file: {path}")]
    IoRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    IoWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    Toml(#[from] toml::ser::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// No usable input documents or images were found
    #[error("No input: {message} ({path})")]
    EmptyInput { path: PathBuf, message: String },

    /// An input image could not be decoded or merged
    #[error("Failed to process image {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    // ─────────────────────────────────────────────────────────────
    // Capability Errors
    // ─────────────────────────────────────────────────────────────

    /// Transport, auth or HTTP status failure talking to a capability
    #[error("{capability} unavailable: {message}")]
    CapabilityUnavailable {
        capability: String,
        message: String,
        status: Option<u16>,
    },

    /// Capability call exceeded its bounded wait
    #[error("{capability} timed out after {timeout_secs}s")]
    CapabilityTimeout { capability: String, timeout_secs: u64 },

    /// A remote job was still pending when the poll budget ran out
    #[error("{capability} job {job} unfinished after {attempts} polls")]
    PollExhausted {
        capability: String,
        job: String,
        attempts: u32,
    },

    /// Capability answered with a payload that does not fit the expected schema
    #[error("{capability} returned a malformed response: {message}")]
    CapabilityMalformedResponse { capability: String, message: String },

    /// Capability understood the request and refused or failed it
    #[error("{capability} rejected the request: {message}")]
    CapabilityRejected { capability: String, message: String },

    // ─────────────────────────────────────────────────────────────
    // Workforce Errors
    // ─────────────────────────────────────────────────────────────

    /// One or more evaluator units failed; the run continued without them
    #[error("{failed} of {total} evaluator units failed: {units}")]
    PartialFailure {
        failed: usize,
        total: usize,
        units: String,
    },

    #[error("An evaluator unit named '{name}' is already registered")]
    DuplicateUnit { name: String },

    #[error("Task '{task_id}' was already processed in this run")]
    DuplicateTask { task_id: String },

    #[error("Invalid workforce transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Workforce '{name}' has no registered evaluator units")]
    EmptyWorkforce { name: String },

    // ─────────────────────────────────────────────────────────────
    // Internal Errors
    // ─────────────────────────────────────────────────────────────

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    // ─────────────────────────────────────────────────────────────
    // Error Classification
    // ─────────────────────────────────────────────────────────────

    /// Numeric error code
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::ConfigNotFound { .. } => ErrorCode::ConfigNotFound,
            Error::ConfigParse { .. } => ErrorCode::ConfigParseError,
            Error::ConfigValidation { .. } => ErrorCode::ConfigValidation,
            Error::MissingCredential { .. } => ErrorCode::MissingCredential,

            Error::IoRead { .. } => ErrorCode::IoRead,
            Error::IoWrite { .. } => ErrorCode::IoWrite,
            Error::Io(e) => match e.kind() {
                std::io::ErrorKind::NotFound => ErrorCode::IoNotFound,
                std::io::ErrorKind::PermissionDenied => ErrorCode::IoPermission,
                _ => ErrorCode::IoRead,
            },
            Error::Toml(_) => ErrorCode::ConfigParseError,
            Error::Json(_) => ErrorCode::InternalError,
            Error::EmptyInput { .. } => ErrorCode::EmptyInput,
            Error::ImageDecode { .. } => ErrorCode::ImageDecode,

            Error::CapabilityUnavailable { .. } => ErrorCode::CapabilityUnavailable,
            Error::CapabilityTimeout { .. } | Error::PollExhausted { .. } => {
                ErrorCode::CapabilityTimeout
            }
            Error::CapabilityMalformedResponse { .. } => ErrorCode::CapabilityMalformedResponse,
            Error::CapabilityRejected { .. } => ErrorCode::CapabilityRejected,

            Error::PartialFailure { .. } => ErrorCode::PartialFailure,
            Error::DuplicateUnit { .. } => ErrorCode::DuplicateUnit,
            Error::DuplicateTask { .. } => ErrorCode::DuplicateTask,
            Error::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Error::EmptyWorkforce { .. } => ErrorCode::EmptyWorkforce,

            Error::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Whether a caller may retry the failed call with backoff
    ///
    /// Auth failures and client-error statuses are not transient even though
    /// they surface as `CapabilityUnavailable`. An exhausted poll budget is not
    /// retried either: the job already exists and retrying would resubmit it.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::CapabilityUnavailable { status, .. } => match status {
                Some(408) | Some(429) => true,
                Some(code) => !(400..500).contains(code),
                None => true,
            },
            Error::CapabilityTimeout { .. } => true,
            _ => false,
        }
    }

    /// Whether the error must abort the process
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::ConfigNotFound { .. }
                | Error::ConfigParse { .. }
                | Error::ConfigValidation { .. }
                | Error::MissingCredential { .. }
                | Error::EmptyInput { .. }
                | Error::Internal(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        self.code().exit_code()
    }

    // ─────────────────────────────────────────────────────────────
    // User-Friendly Messages
    // ─────────────────────────────────────────────────────────────

    /// A hint on how to fix this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Error::ConfigNotFound { .. } => Some(
                "Run 'contract-advisor config init' to create a default configuration file."
            ),
            Error::ConfigParse { .. } => Some(
                "Check your configuration file syntax. Run 'contract-advisor config validate' to see details."
            ),
            Error::ConfigValidation { .. } => Some(
                "Review the configuration file and fix the invalid values."
            ),
            Error::MissingCredential { .. } => Some(
                "Export the named environment variable or rerun with --prompt-credentials."
            ),
            Error::EmptyInput { .. } => Some(
                "Point --pdf at a readable PDF, or --images at a directory with png/jpg/jpeg/bmp/gif/tiff files."
            ),
            Error::CapabilityUnavailable { .. } => Some(
                "Check your network connection, the service base URL and the API key."
            ),
            Error::CapabilityTimeout { .. } | Error::PollExhausted { .. } => Some(
                "The service is slow or unreachable. Raise timeout_secs or max_poll_attempts in the config."
            ),
            Error::CapabilityMalformedResponse { .. } => Some(
                "The service answered in an unexpected shape. Verify the base URL points at a compatible API."
            ),
            _ => None,
        }
    }

    /// Format the error for terminal display with colors
    pub fn format_for_terminal(&self) -> String {
        let mut output = format!(
            "\x1b[31mError [{}]\x1b[0m: {}\n",
            self.code().as_str(),
            self
        );

        if let Some(hint) = self.suggestion() {
            output.push_str(&format!("\n\x1b[33mHint\x1b[0m: {}\n", hint));
        }

        output
    }

    /// Format the error for logs and reports (no colors)
    pub fn format_for_log(&self) -> String {
        format!("[{}] {}", self.code().as_str(), self)
    }
}

// ─────────────────────────────────────────────────────────────────
// Error Constructors
// ─────────────────────────────────────────────────────────────────

impl Error {
    pub fn config_validation(message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: None,
        }
    }

    pub fn config_field_invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ConfigValidation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn unavailable(capability: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::CapabilityUnavailable {
            capability: capability.to_string(),
            message: message.into(),
            status: None,
        }
    }

    pub fn malformed(capability: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::CapabilityMalformedResponse {
            capability: capability.to_string(),
            message: message.into(),
        }
    }

    pub fn rejected(capability: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::CapabilityRejected {
            capability: capability.to_string(),
            message: message.into(),
        }
    }

    pub fn empty_input(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Error::EmptyInput {
            path: path.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_format() {
        assert_eq!(ErrorCode::ConfigNotFound.as_str(), "E100");
        assert_eq!(ErrorCode::CapabilityUnavailable.as_str(), "E300");
        assert_eq!(ErrorCode::EmptyInput.as_str(), "E204");
        assert_eq!(ErrorCode::InternalError.as_str(), "E900");
    }

    #[test]
    fn test_error_exit_codes() {
        assert_eq!(ErrorCode::MissingCredential.exit_code(), 10);
        assert_eq!(ErrorCode::EmptyInput.exit_code(), 20);
        assert_eq!(ErrorCode::CapabilityTimeout.exit_code(), 30);
        assert_eq!(ErrorCode::DuplicateUnit.exit_code(), 50);
        assert_eq!(ErrorCode::InternalError.exit_code(), 90);
    }

    #[test]
    fn test_capability_retry_classification() {
        assert!(Error::unavailable("document-extraction", "connection refused").is_retryable());
        assert!(Error::CapabilityTimeout {
            capability: "speech-synthesis".into(),
            timeout_secs: 30
        }
        .is_retryable());
        assert!(!Error::malformed("model-completion", "no choices").is_retryable());
        assert!(!Error::rejected("graph-store", "syntax error").is_retryable());
    }

    #[test]
    fn test_poll_exhaustion_is_final() {
        let err = Error::PollExhausted {
            capability: "document-extraction".into(),
            job: "t-1".into(),
            attempts: 10,
        };
        assert!(!err.is_retryable());
        assert_eq!(err.code(), ErrorCode::CapabilityTimeout);
        assert_eq!(err.exit_code(), 30);
    }

    #[test]
    fn test_status_based_retry() {
        let status = |code| Error::CapabilityUnavailable {
            capability: "model-completion".into(),
            message: "status".into(),
            status: Some(code),
        };
        assert!(status(429).is_retryable());
        assert!(status(503).is_retryable());
        assert!(status(408).is_retryable());
        assert!(!status(401).is_retryable());
        assert!(!status(404).is_retryable());
    }

    #[test]
    fn test_error_fatal() {
        assert!(Error::empty_input("/tmp/scans", "no images").is_fatal());
        assert!(Error::MissingCredential {
            variable: "CHUNKR_API_KEY",
            capability: "document-extraction".into()
        }
        .is_fatal());
        assert!(!Error::unavailable("web-scrape", "down").is_fatal());
    }

    #[test]
    fn test_error_suggestions() {
        let err = Error::ConfigNotFound {
            path: PathBuf::from("/test"),
        };
        assert!(err.suggestion().unwrap().contains("config init"));

        let err = Error::empty_input("/scans", "no recognized images");
        assert!(err.suggestion().unwrap().contains("--images"));
    }

    #[test]
    fn test_format_for_terminal() {
        let err = Error::empty_input("/scans", "no recognized images");
        let formatted = err.format_for_terminal();

        assert!(formatted.contains("E204"));
        assert!(formatted.contains("\x1b[31m"));
        assert!(formatted.contains("Hint"));
    }

    #[test]
    fn test_format_for_log() {
        let err = Error::malformed("model-completion", "no choices");
        let formatted = err.format_for_log();

        assert!(formatted.contains("[E302]"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert_eq!(err.code(), ErrorCode::IoNotFound);
    }
}
