//! Storage layer: the whole ticket collection as one JSON document.
//!
//! Every read loads the full array and every write replaces it. Writes go to a
//! sibling temp file that is renamed over the target, so the document on disk
//! is always a complete snapshot.

use crate::types::Ticket;
use chrono::Utc;
use eyre::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default store file name.
pub const TICKETS_FILE: &str = "tickets.json";

/// Marker in the name of copies kept when an unreadable document is reset.
const CORRUPT_SUFFIX: &str = "corrupt";

/// Storage handle for one ticket document.
#[derive(Debug, Clone)]
pub struct Storage {
    path: PathBuf,
}

impl Storage {
    /// Open the document at `path`, creating it (and its parent directory)
    /// as an empty collection if it does not exist.
    pub fn open(path: &Path) -> Result<Self> {
        let storage = Self {
            path: path.to_path_buf(),
        };
        storage.ensure_exists()?;
        Ok(storage)
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<document>.<suffix>` next to the document.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(suffix);
        self.path.with_file_name(name)
    }

    fn ensure_exists(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create store directory {}", parent.display()))?;
        }
        log::info!("Initializing empty ticket store at {}", self.path.display());
        self.save(&[])
    }

    /// Load every ticket, most recent first.
    ///
    /// A missing document is recreated empty. A document that does not parse
    /// is copied aside, reset to `[]`, and read as empty.
    pub fn load(&self) -> Result<Vec<Ticket>> {
        self.ensure_exists()?;

        let bytes = fs::read(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Vec<Ticket>>(&bytes) {
            Ok(tickets) => Ok(tickets),
            Err(e) => {
                log::warn!(
                    "Ticket store {} is unreadable ({}); resetting to empty",
                    self.path.display(),
                    e
                );
                self.reset_corrupt(&bytes)?;
                Ok(Vec::new())
            }
        }
    }

    fn reset_corrupt(&self, bytes: &[u8]) -> Result<()> {
        let backup = self.corrupt_backup_path();
        match fs::write(&backup, bytes) {
            Ok(()) => log::warn!("Kept unreadable document at {}", backup.display()),
            Err(e) => log::warn!("Failed to keep corrupt copy at {}: {}", backup.display(), e),
        }
        self.save(&[])
    }

    /// `<document>.corrupt-<timestamp>`, never an existing file, so earlier
    /// copies survive later resets.
    fn corrupt_backup_path(&self) -> PathBuf {
        let stem = format!("{}-{}", CORRUPT_SUFFIX, Utc::now().format("%Y%m%dT%H%M%S%3fZ"));
        let mut backup = self.sibling(&stem);
        let mut n = 1;
        while backup.exists() {
            backup = self.sibling(&format!("{}-{}", stem, n));
            n += 1;
        }
        backup
    }

    /// Replace the whole document with `tickets`.
    pub fn save(&self, tickets: &[Ticket]) -> Result<()> {
        let json = serde_json::to_vec_pretty(tickets).context("Failed to serialize tickets")?;

        let tmp = self.sibling("tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        Ok(())
    }
}
