//! Logging infrastructure using tracing + tracing-subscriber
//!
//! Console events go to stderr so stdout carries only the rendered report.
//! A rolling file sink is added when `logging.file` is set. `-v`/`-vv`/`-q`
//! override the configured level and RUST_LOG adds per-module directives.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::LoggingSettings;
use crate::error::{Error, Result};

/// HTTP and HTML parsing crates log every request; keep them at `warn`
const NOISY_TARGETS: &[&str] = &["hyper", "reqwest", "rustls", "h2", "html5ever", "selectors"];

type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync>;

/// Keeps the non-blocking file writer alive; drop flushes it
pub struct LogGuards {
    _file_guard: Option<WorkerGuard>,
}

/// Set up the global subscriber for one process
pub fn init_logging(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Result<LogGuards> {
    let level = effective_level(settings, verbose, quiet);
    let filter = env_filter(level)?;

    let console = event_layer(io::stderr, Sink::Console, settings.json_format);
    let (file, file_guard) = match settings.file.as_deref() {
        Some(path) => {
            let appender = rolling_appender(path, settings.max_file_size_mb, settings.max_files)?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(event_layer(writer, Sink::File, settings.json_format)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| Error::Internal(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!(level = %level, file = ?settings.file, json = settings.json_format, "Logging initialized");
    Ok(LogGuards { _file_guard: file_guard })
}

/// `-q` wins over everything, then `-v` count, then the configured level
fn effective_level(settings: &LoggingSettings, verbose: u8, quiet: bool) -> Level {
    match (quiet, verbose) {
        (true, _) => Level::ERROR,
        (false, 0) => parse_level(&settings.level),
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

pub(crate) fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

fn directive(text: &str) -> Result<Directive> {
    text.parse()
        .map_err(|e| Error::Internal(format!("Invalid log directive '{}': {}", text, e)))
}

fn env_filter(level: Level) -> Result<EnvFilter> {
    let level = level.to_string().to_lowercase();
    let mut filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&level))
        .add_directive(directive(&format!("contract_advisor={}", level))?);

    for target in NOISY_TARGETS {
        filter = filter.add_directive(directive(&format!("{}=warn", target))?);
    }
    Ok(filter)
}

// ─────────────────────────────────────────────────────────────────
// Layers
// ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Sink {
    Console,
    File,
}

/// One formatting layer; files get targets and thread ids, never ANSI
fn event_layer<S, W>(writer: W, sink: Sink, json: bool) -> BoxedLayer<S>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let to_file = sink == Sink::File;
    let base = fmt::layer()
        .with_writer(writer)
        .with_ansi(!to_file)
        .with_thread_ids(to_file);

    if json {
        // Stage spans closing carry their duration
        Box::new(
            base.json()
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_span_events(FmtSpan::CLOSE),
        )
    } else if to_file {
        Box::new(base.with_target(true))
    } else {
        Box::new(base.with_target(false).compact())
    }
}

/// tracing-appender cannot rotate by size; small caps rotate hourly instead
fn rotation_for(max_size_mb: u64) -> Rotation {
    if max_size_mb > 0 && max_size_mb < 10 {
        Rotation::HOURLY
    } else {
        Rotation::DAILY
    }
}

/// Directory and file prefix for a configured log path
fn split_log_path(log_file: &str) -> (PathBuf, String) {
    let path = Path::new(log_file);
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let prefix = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("contract-advisor")
        .to_string();
    (directory, prefix)
}

fn rolling_appender(log_file: &str, max_size_mb: u64, max_files: u32) -> Result<RollingFileAppender> {
    let (directory, prefix) = split_log_path(log_file);
    fs::create_dir_all(&directory).map_err(|source| Error::IoWrite {
        path: directory.clone(),
        source,
    })?;

    RollingFileAppender::builder()
        .rotation(rotation_for(max_size_mb))
        .filename_prefix(prefix)
        .filename_suffix("log")
        .max_log_files(max_files.max(1) as usize)
        .build(&directory)
        .map_err(|e| Error::config_field_invalid("logging.file", format!("Cannot open log file in {}: {}", directory.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("error"), Level::ERROR);
        assert_eq!(parse_level("loud"), Level::INFO);
    }

    #[test]
    fn test_quiet_beats_verbose() {
        let settings = LoggingSettings::default();
        assert_eq!(effective_level(&settings, 2, true), Level::ERROR);
    }

    #[test]
    fn test_verbose_count() {
        let settings = LoggingSettings { level: "warn".to_string(), ..Default::default() };
        assert_eq!(effective_level(&settings, 0, false), Level::WARN);
        assert_eq!(effective_level(&settings, 1, false), Level::DEBUG);
        assert_eq!(effective_level(&settings, 5, false), Level::TRACE);
    }

    #[test]
    fn test_env_filter_builds() {
        assert!(env_filter(Level::DEBUG).is_ok());
    }

    #[test]
    fn test_rotation_rule() {
        assert_eq!(rotation_for(5), Rotation::HOURLY);
        assert_eq!(rotation_for(0), Rotation::DAILY);
        assert_eq!(rotation_for(100), Rotation::DAILY);
    }

    #[test]
    fn test_split_log_path() {
        let (dir, prefix) = split_log_path("/var/log/advisor/run.log");
        assert_eq!(dir, PathBuf::from("/var/log/advisor"));
        assert_eq!(prefix, "run");

        let (dir, prefix) = split_log_path("advisor.log");
        assert_eq!(dir, PathBuf::from("."));
        assert_eq!(prefix, "advisor");
    }

    #[test]
    fn test_appender_creates_directory() {
        let temp = TempDir::new().unwrap();
        let log_path = temp.path().join("logs").join("advisor.log");

        let appender = rolling_appender(log_path.to_str().unwrap(), 100, 3);
        assert!(appender.is_ok());
        assert!(temp.path().join("logs").is_dir());
    }
}
