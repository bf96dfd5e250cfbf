use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// The managed cookies.txt file
///
/// A plain UTF-8 file in whatever textual format the downloader itself
/// interprets. Absent means empty; empty means "pass no cookies". A spawned
/// download may read the file at any moment, so writers must replace the
/// contents atomically.
#[derive(Debug, Clone)]
pub struct CookieStore {
    path: PathBuf,
}

impl CookieStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location under the user config dir
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidgrab")
            .join("cookies.txt")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file (and parent directories) if absent
    pub fn ensure_exists(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if !self.path.exists() {
            std::fs::File::create(&self.path)?;
        }
        Ok(())
    }

    /// Empty the file; stale session cookies are not carried across runs
    pub fn clear(&self) -> Result<()> {
        self.save("")
    }

    /// Whether the file holds anything worth passing to the downloader
    pub fn has_cookies(&self) -> bool {
        std::fs::metadata(&self.path)
            .map(|m| m.len() > 0)
            .unwrap_or(false)
    }

    /// Atomically replace the file contents
    ///
    /// Writes to a temp file in the same directory, then renames it over
    /// the target, so a concurrently spawned reader sees either the old or
    /// the new contents, never a partial write.
    pub fn save(&self, contents: &str) -> Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(|e| Error::CookieWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        tmp.write_all(contents.as_bytes())
            .map_err(|e| Error::CookieWrite {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        tmp.persist(&self.path).map_err(|e| Error::CookieWrite {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}
