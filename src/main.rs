//! Contract Advisor - multi-persona contract risk review
//!
//! Entry point for the `contract-advisor` binary. A run extracts a contract,
//! analyzes it, has a panel of personas debate its risks, researches those
//! risks, writes a knowledge graph and reads the verdict aloud.

mod agent;
mod capability;
mod cli;
mod config;
mod credentials;
mod document;
mod error;
mod logging;
mod persona;
mod pipeline;
mod version;
mod workforce;

use std::fs;
use std::path::Path;

use clap::Parser;
use tracing::{error, info};

use crate::capability::Capabilities;
use crate::cli::{AnalyzeArgs, Cli, Commands, ConfigSubcommand, PersonasSubcommand};
use crate::config::{AdvisorConfig, LoggingSettings};
use crate::credentials::Credentials;
use crate::document::DocumentSource;
use crate::error::{Error, Result};
use crate::persona::PersonaRegistry;
use crate::pipeline::{FinalReport, PipelineDriver, StageSkips};

fn main() {
    let cli = Cli::parse();

    let code = match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprint!("{}", e.format_for_terminal());
            e.exit_code()
        }
    };
    std::process::exit(code);
}

/// Run the selected command and return the process exit code
fn dispatch(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Version => {
            version::print_version();
            Ok(0)
        }
        Commands::Config { subcommand } => {
            // Config commands only log errors
            let _guards = logging::init_logging(&LoggingSettings::default(), 0, true)?;
            handle_config_command(subcommand)
        }
        Commands::Personas { subcommand } => {
            let _guards = logging::init_logging(&LoggingSettings::default(), 0, true)?;
            handle_personas_command(subcommand)
        }
        Commands::Analyze(args) => run_analyze(args, cli.verbose, cli.quiet),
    }
}

/// Review one contract end to end
fn run_analyze(args: AnalyzeArgs, verbose: u8, quiet: bool) -> Result<i32> {
    let mut config = AdvisorConfig::load(args.config.as_deref())?;
    if let Some(dir) = &args.output_dir {
        config.storage.output_dir = dir.to_string_lossy().to_string();
    }

    // The guards must be kept alive for the lifetime of the run
    let _log_guards = logging::init_logging(&config.logging, verbose, quiet)?;

    let build = version::build_info();
    info!(
        version = %build.full_version(),
        target = %build.target,
        profile = %build.profile,
        "Starting contract advisor"
    );

    let source = match (args.pdf, args.images) {
        (Some(pdf), _) => DocumentSource::Pdf(pdf),
        (None, Some(dir)) => DocumentSource::Images(dir),
        (None, None) => return Err(Error::Internal("no contract source given".to_string())),
    };

    let mut credentials = Credentials::from_env();
    if args.prompt_credentials {
        let mut keys = Credentials::required_keys(&config);
        keys.extend(Credentials::optional_keys(&config));
        credentials.prompt_missing(&keys)?;
    }

    let capabilities = Capabilities::from_config(&config, &credentials)?;
    let personas = PersonaRegistry::load(config.debate.personas_file.as_deref())?;

    let output_dir = config.output_dir();
    let audio_path = args
        .audio
        .unwrap_or_else(|| output_dir.join(format!("verdict.{}", config.speech.format)));
    let skips = StageSkips {
        research: args.skip_research,
        graph: args.skip_graph,
        speech: args.skip_speech,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get().clamp(2, 8))
        .enable_all()
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create runtime: {}", e)))?;

    let driver = PipelineDriver::new(config, capabilities, personas, skips);
    info!(run_id = %driver.run_id(), "Run started");
    let report = runtime.block_on(driver.run(&source, &audio_path));

    write_artifacts(&output_dir, &report)?;
    if !quiet {
        println!("{}", report.render_text());
    }

    if let Some(fatal) = &report.error {
        error!(code = %fatal.code, stage = %fatal.stage, "Run aborted");
        eprintln!(
            "\x1b[31mError [{}]\x1b[0m: {} failed: {}",
            fatal.code, fatal.stage, fatal.message
        );
    }
    Ok(report.exit_code())
}

/// Write report.json and, when extraction succeeded, extracted.json
fn write_artifacts(output_dir: &Path, report: &FinalReport) -> Result<()> {
    fs::create_dir_all(output_dir).map_err(|source| Error::IoWrite {
        path: output_dir.to_path_buf(),
        source,
    })?;

    write_json(&output_dir.join("report.json"), report)?;
    if let Some(document) = &report.document {
        write_json(&output_dir.join("extracted.json"), &document.raw)?;
    }
    info!(dir = %output_dir.display(), "Artifacts written");
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let body = serde_json::to_string_pretty(value)?;
    fs::write(path, body).map_err(|source| Error::IoWrite {
        path: path.to_path_buf(),
        source,
    })
}

fn handle_personas_command(subcommand: PersonasSubcommand) -> Result<i32> {
    match subcommand {
        PersonasSubcommand::List { config } => {
            let cfg = AdvisorConfig::load(config.as_deref())?;
            let registry = PersonaRegistry::load(cfg.debate.personas_file.as_deref())?;
            let origin = if registry.is_bundled() { "bundled" } else { "custom" };
            println!("Personas ({}, {}):", registry.len(), origin);
            for listing in registry.list_available() {
                println!("  {:<20} {:<10} {}", listing.name, listing.role, listing.summary);
            }
        }
    }
    Ok(0)
}

fn handle_config_command(subcommand: ConfigSubcommand) -> Result<i32> {
    match subcommand {
        ConfigSubcommand::Show { config } => {
            let cfg = AdvisorConfig::load(config.as_deref())?;
            println!("{}", toml::to_string_pretty(&cfg)?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration written to {}", written.display());
        }
        ConfigSubcommand::Validate { config } => {
            AdvisorConfig::load(config.as_deref())?;
            println!("Configuration is valid.");
        }
    }
    Ok(0)
}
