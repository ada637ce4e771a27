use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use super::recorder::EncodedRecording;

/// Where exported recordings go. Supplied by the host.
pub trait RecordingSink {
    fn deliver(&mut self, recording: &EncodedRecording) -> Result<PathBuf>;
}

/// Writes each recording into a directory under its own file name
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl RecordingSink for DirectorySink {
    fn deliver(&mut self, recording: &EncodedRecording) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;
        let path = self.dir.join(&recording.file_name);
        fs::write(&path, &recording.bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            "Saved recording {} ({:.1}s)",
            path.display(),
            recording.duration_secs()
        );
        Ok(path)
    }
}
