//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for the contract advisor.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

/// Contract Advisor - multi-persona contract risk review
///
/// Extracts a contract (PDF or scanned page images), analyzes it, runs a
/// risk debate across evaluator personas, researches the risks, builds a
/// knowledge graph and reads the verdict aloud.
#[derive(Parser, Debug)]
#[command(name = "contract-advisor")]
#[command(author, version, long_about = None)]
#[command(about = "Contract Advisor - multi-persona contract risk review")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Review a contract end to end
    Analyze(AnalyzeArgs),

    /// Persona roster inspection
    Personas {
        #[command(subcommand)]
        subcommand: PersonasSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Display version and build information
    Version,
}

#[derive(Args, Debug, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["pdf", "images"])))]
pub struct AnalyzeArgs {
    /// Contract PDF to review
    #[arg(long, value_name = "PATH")]
    pub pdf: Option<PathBuf>,

    /// Directory of scanned page images (png, jpg, jpeg, bmp, gif, tiff)
    #[arg(long, value_name = "DIR")]
    pub images: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, env = "CONTRACT_ADVISOR_CONFIG")]
    pub config: Option<String>,

    /// Where report.json, extracted.json and the audio file are written
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Audio output path (default: <output-dir>/verdict.<format>)
    #[arg(long, value_name = "PATH")]
    pub audio: Option<PathBuf>,

    /// Ask for missing API keys on the terminal instead of failing
    #[arg(long)]
    pub prompt_credentials: bool,

    /// Skip the knowledge research session
    #[arg(long)]
    pub skip_research: bool,

    /// Skip the knowledge graph build
    #[arg(long)]
    pub skip_graph: bool,

    /// Skip speech synthesis of the verdict
    #[arg(long)]
    pub skip_speech: bool,
}

/// Persona subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum PersonasSubcommand {
    /// List the personas that take part in the debate
    List {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show {
        /// Path to configuration file
        #[arg(short, long)]
        config: Option<String>,
    },

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        config: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_help_names_the_product() {
        let help = Cli::command().render_help().to_string();
        assert!(help.contains("Contract Advisor"));
    }

    #[test]
    fn test_analyze_pdf() {
        let cli = Cli::parse_from(["contract-advisor", "analyze", "--pdf", "lease.pdf"]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.pdf, Some(PathBuf::from("lease.pdf")));
                assert!(args.images.is_none());
                assert!(!args.skip_speech);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_images_with_skips() {
        let cli = Cli::parse_from([
            "contract-advisor",
            "analyze",
            "--images",
            "scans/",
            "--skip-graph",
            "--skip-speech",
            "--output-dir",
            "out",
        ]);
        match cli.command {
            Commands::Analyze(args) => {
                assert_eq!(args.images, Some(PathBuf::from("scans/")));
                assert!(args.skip_graph);
                assert!(args.skip_speech);
                assert!(!args.skip_research);
                assert_eq!(args.output_dir, Some(PathBuf::from("out")));
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_analyze_requires_a_source() {
        assert!(Cli::try_parse_from(["contract-advisor", "analyze"]).is_err());
    }

    #[test]
    fn test_analyze_rejects_both_sources() {
        let result = Cli::try_parse_from([
            "contract-advisor",
            "analyze",
            "--pdf",
            "a.pdf",
            "--images",
            "dir",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_personas_list() {
        let cli = Cli::parse_from(["contract-advisor", "personas", "list"]);
        match cli.command {
            Commands::Personas {
                subcommand: PersonasSubcommand::List { config },
            } => assert!(config.is_none()),
            _ => panic!("Expected Personas List command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["contract-advisor", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["contract-advisor", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["contract-advisor", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
