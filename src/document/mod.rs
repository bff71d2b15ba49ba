//! Contract input: a PDF or a directory of scanned pages
//!
//! Inputs are staged into a per-run directory before upload; image sets are
//! merged into a single PNG first.

pub mod images;
pub mod staging;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::capability::extraction::ExtractionOutput;
use crate::error::{Error, Result};

pub use staging::StagingArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Pdf,
    ImageSet,
}

/// Where the contract comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    Pdf(PathBuf),
    Images(PathBuf),
}

impl DocumentSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            DocumentSource::Pdf(_) => SourceKind::Pdf,
            DocumentSource::Images(_) => SourceKind::ImageSet,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            DocumentSource::Pdf(p) | DocumentSource::Images(p) => p,
        }
    }
}

impl fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentSource::Pdf(p) => write!(f, "PDF {}", p.display()),
            DocumentSource::Images(p) => write!(f, "image directory {}", p.display()),
        }
    }
}

/// A staged file ready for upload
#[derive(Debug, Clone)]
pub struct StagedInput {
    pub path: PathBuf,
    pub size: u64,
}

/// Copy (or merge) the source into the staging area.
///
/// Image directories are checked for recognized files before anything is
/// written; decoding runs on the blocking pool.
pub async fn stage_source(source: &DocumentSource, staging: &StagingArea) -> Result<StagedInput> {
    match source {
        DocumentSource::Pdf(path) => {
            let meta = tokio::fs::metadata(path)
                .await
                .map_err(|e| Error::IoRead { path: path.clone(), source: e })?;
            if meta.len() == 0 {
                return Err(Error::empty_input(path, "PDF file is empty"));
            }
            let (staged, size) = staging.stage_file(path)?;
            Ok(StagedInput { path: staged, size })
        }
        DocumentSource::Images(dir) => {
            let pages = images::discover_images(dir)?;
            let output = staging.file("merged.png");
            let target = output.clone();
            let size = tokio::task::spawn_blocking(move || images::merge_to_png(&pages, &target))
                .await
                .map_err(|e| Error::Internal(format!("image merge task failed: {}", e)))??;
            Ok(StagedInput { path: output, size })
        }
    }
}

/// Extracted contract, held for one run only
#[derive(Debug, Clone, Serialize)]
pub struct ContractDocument {
    pub source: PathBuf,
    pub kind: SourceKind,
    pub staged_size: u64,
    pub text: String,
    #[serde(skip)]
    pub raw: serde_json::Value,
    /// SHA-256 of `text`, hex encoded
    pub sha256: String,
}

impl ContractDocument {
    pub fn from_extraction(source: &DocumentSource, staged: &StagedInput, output: ExtractionOutput) -> Result<Self> {
        if output.content.trim().is_empty() {
            return Err(Error::empty_input(
                source.path(),
                "document extraction returned no text",
            ));
        }
        Ok(Self {
            source: source.path().to_path_buf(),
            kind: source.kind(),
            staged_size: staged.size,
            sha256: content_hash(&output.content),
            text: output.content,
            raw: output.raw,
        })
    }
}

pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
