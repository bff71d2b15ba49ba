//! Common test utilities and fixtures
//!
//! Shared helpers for driving the contract-advisor binary in tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// Every credential variable the binary reads
pub const CREDENTIAL_VARS: [&str; 10] = [
    "CHUNKR_API_KEY",
    "OPENAI_API_KEY",
    "MISTRAL_API_KEY",
    "QWEN_API_KEY",
    "FIRECRAWL_API_KEY",
    "GOOGLE_API_KEY",
    "SEARCH_ENGINE_ID",
    "FISHAUDIO_API_KEY",
    "NEO4J_USERNAME",
    "NEO4J_PASSWORD",
];

/// A command for the binary with credentials and overrides cleared
pub fn advisor_cmd() -> Command {
    let mut cmd = Command::cargo_bin("contract-advisor").unwrap();
    for var in CREDENTIAL_VARS {
        cmd.env_remove(var);
    }
    for (key, _) in std::env::vars() {
        if key.starts_with("CONTRACT_ADVISOR_") {
            cmd.env_remove(key);
        }
    }
    cmd
}

/// Set dummy values for the keys the required capabilities need
pub fn with_required_credentials(cmd: &mut Command) -> &mut Command {
    cmd.env("CHUNKR_API_KEY", "test-chunkr")
        .env("OPENAI_API_KEY", "test-openai")
        .env("QWEN_API_KEY", "test-qwen")
        .env("MISTRAL_API_KEY", "test-mistral")
}

/// Scratch workspace with a config file and input/output directories
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    pub fn write_config(&self, content: &str) -> String {
        let path = self.config_path();
        fs::write(&path, content).unwrap();
        path.to_string_lossy().to_string()
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.path().join("staging")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.path().join("out")
    }

    /// A small non-empty PDF stand-in
    pub fn contract_pdf(&self) -> PathBuf {
        let path = self.path().join("contract.pdf");
        fs::write(&path, b"%PDF-1.4\n% employment agreement\n").unwrap();
        path
    }

    pub fn empty_dir(&self, name: &str) -> PathBuf {
        let path = self.path().join(name);
        fs::create_dir_all(&path).unwrap();
        path
    }
}
