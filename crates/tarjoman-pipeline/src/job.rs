//! Per-job working directories and the run manifest.
//!
//! Every file-producing run owns one directory named
//! `job_<unix_ts>_<uuid6>`; nothing is ever written outside it, and two
//! concurrent runs can never collide.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tarjoman_core::error::Result;

/// What a finished run produced and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// URL or file path the run started from.
    pub source: String,
    /// Requested output format.
    pub out_format: String,
    /// Model used (or configured) for translation.
    pub model: String,
    /// Path of the rendered output file.
    pub dest: String,
    /// ISO-8601 creation timestamp.
    pub created: String,
}

impl Manifest {
    /// Creates a manifest stamped with the current time.
    #[must_use]
    pub fn new(source: &str, out_format: &str, model: &str, dest: &Path) -> Self {
        Self {
            source: source.to_string(),
            out_format: out_format.to_string(),
            model: model.to_string(),
            dest: dest.display().to_string(),
            created: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// An exclusively owned job directory.
#[derive(Debug, Clone)]
pub struct JobDir {
    path: PathBuf,
}

impl JobDir {
    /// Creates `base/job_<unix_ts>_<uuid6>` (and `base` if needed).
    pub fn create(base: &Path) -> Result<Self> {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs());
        let suffix = &Uuid::new_v4().simple().to_string()[..6];
        let path = base.join(format!("job_{ts}_{suffix}"));
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    /// The job directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of a file inside the job directory.
    #[must_use]
    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Persists a value as pretty JSON under the given file name.
    pub fn save_intermediate<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.file(name);
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, json)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_dirs_are_unique() {
        let base = tempfile::tempdir().unwrap();
        let a = JobDir::create(base.path()).unwrap();
        let b = JobDir::create(base.path()).unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a.path().is_dir());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("job_"));
    }

    #[test]
    fn test_save_intermediate_pretty_json() {
        let base = tempfile::tempdir().unwrap();
        let job = JobDir::create(base.path()).unwrap();
        let manifest = Manifest::new("src.docx", "html", "gpt-4o-mini", Path::new("out.html"));
        let path = job.save_intermediate("manifest.json", &manifest).unwrap();
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("\n")); // pretty-printed
        let back: Manifest = serde_json::from_str(&content).unwrap();
        assert_eq!(back, manifest);
    }
}
