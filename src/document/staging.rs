//! Per-run staging directory

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Directory `<root>/<run id>` removed when dropped (best effort)
#[derive(Debug)]
pub struct StagingArea {
    dir: PathBuf,
}

impl StagingArea {
    pub fn create(root: &Path, run_id: &str) -> Result<Self> {
        let dir = root.join(run_id);
        fs::create_dir_all(&dir).map_err(|source| Error::IoWrite {
            path: dir.clone(),
            source,
        })?;
        debug!(dir = %dir.display(), "Staging area created");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Copy `source` into the staging area, keeping its file name
    pub fn stage_file(&self, source: &Path) -> Result<(PathBuf, u64)> {
        let name = source
            .file_name()
            .ok_or_else(|| Error::empty_input(source, "not a file path"))?;
        let target = self.dir.join(name);
        let size = fs::copy(source, &target).map_err(|source_err| Error::IoRead {
            path: source.to_path_buf(),
            source: source_err,
        })?;
        debug!(from = %source.display(), to = %target.display(), bytes = size, "File staged");
        Ok((target, size))
    }

    /// Path for a new file inside the staging area
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => debug!(dir = %self.dir.display(), "Staging area removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %self.dir.display(), error = %e, "Failed to remove staging area"),
        }
    }
}
