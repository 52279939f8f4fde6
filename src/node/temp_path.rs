//! Per-execution temporary file path, removed when dropped

use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// `temp_<uuid>.xlsx` inside a directory. The file is not created here; if
/// anything creates it during the execution it is removed on drop, on the
/// success path and on every error path alike.
#[derive(Debug)]
pub struct TempPath {
    path: PathBuf,
}

impl TempPath {
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join(format!("temp_{}.xlsx", Uuid::new_v4())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        if !self.path.exists() {
            return;
        }
        if let Err(e) = fs::remove_file(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove temporary file");
        }
    }
}
