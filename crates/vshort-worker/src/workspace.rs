//! Per-job scratch directory.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vshort_models::JobId;

/// Working directory owned by one job and removed when dropped.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create `job-<id>-XXXX` under `root`, creating `root` if needed.
    pub fn create(root: &Path, job_id: &JobId) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{}-", job_id))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn audio_path(&self) -> PathBuf {
        self.path().join("audio.mp3")
    }

    /// Video-only output of the reframer.
    pub fn reframed_path(&self) -> PathBuf {
        self.path().join("reframed.mp4")
    }

    pub fn captions_dir(&self) -> PathBuf {
        self.path().join("captions")
    }

    /// Encoder output before it is published.
    pub fn render_path(&self) -> PathBuf {
        self.path().join("render.mp4")
    }

    /// Remove the directory now, reporting failures.
    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}
