//! Build script for contract-advisor
//!
//! Embeds build metadata into the binary so `contract-advisor version`
//! and the startup log line can identify exactly what ran:
//! git commit, branch, dirty flag, build timestamp, target and rustc.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=config/personas.toml");

    let git_hash = command_output("git", &["rev-parse", "--short=8", "HEAD"]);
    let git_branch = command_output("git", &["rev-parse", "--abbrev-ref", "HEAD"]);
    let git_dirty = match Command::new("git").args(["status", "--porcelain"]).output() {
        Ok(out) if out.status.success() => {
            if out.stdout.is_empty() { "false" } else { "true" }
        }
        _ => "unknown",
    };

    let vars = [
        ("ADVISOR_GIT_HASH", git_hash),
        ("ADVISOR_GIT_BRANCH", git_branch),
        ("ADVISOR_GIT_DIRTY", git_dirty.to_string()),
        (
            "ADVISOR_BUILD_TIMESTAMP",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        ),
        ("ADVISOR_TARGET", env_or_unknown("TARGET")),
        ("ADVISOR_PROFILE", env_or_unknown("PROFILE")),
        ("ADVISOR_HOST", env_or_unknown("HOST")),
        ("ADVISOR_RUSTC_VERSION", command_output("rustc", &["--version"])),
    ];

    for (key, value) in &vars {
        println!("cargo:rustc-env={}={}", key, value);
    }
}

/// Run a command and return its trimmed stdout, or "unknown"
fn command_output(program: &str, args: &[&str]) -> String {
    Command::new(program)
        .args(args)
        .output()
        .ok()
        .filter(|out| out.status.success())
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn env_or_unknown(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| "unknown".to_string())
}
