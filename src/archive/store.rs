//! Cassette session: one archive file, loaded once and written back once

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::format::{self, Archive, Interaction};
use crate::config::RecordMode;
use crate::matcher;
use crate::{CassetteError, Result};

/// The loaded archive of one cassette file plus its record mode
///
/// Persistence is explicit: call [`Session::persist`] when done. It writes
/// only when something was appended since the last write, so calling it
/// again without new appends is a no-op.
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    mode: RecordMode,
    archive: Archive,
    dirty: bool,
    was_blank: bool,
}

impl Session {
    /// Open the cassette at `path`
    ///
    /// A missing file yields an empty, blank session.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArchiveFormat` if the file exists but does not decode,
    /// or an I/O error if it cannot be read
    pub fn open(path: impl Into<PathBuf>, mode: RecordMode) -> Result<Self> {
        let path = path.into();

        let (archive, was_blank) = match std::fs::read(&path) {
            Ok(raw) => {
                let archive = format::decode(&raw).map_err(|e| match e {
                    CassetteError::InvalidArchiveFormat(reason) => {
                        CassetteError::InvalidArchiveFormat(format!(
                            "{}: {reason}",
                            path.display()
                        ))
                    }
                    other => other,
                })?;
                (archive, false)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (Archive::new(), true),
            Err(e) => return Err(e.into()),
        };

        info!(
            "Opened cassette '{}': {} interactions (blank: {}, mode: {})",
            path.display(),
            archive.len(),
            was_blank,
            mode
        );

        Ok(Self {
            path,
            mode,
            archive,
            dirty: false,
            was_blank,
        })
    }

    /// Cassette file path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record mode
    #[must_use]
    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    /// Loaded and appended interactions, in order
    #[must_use]
    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Interactions as a slice
    #[must_use]
    pub fn interactions(&self) -> &[Interaction] {
        self.archive.as_slice()
    }

    /// Number of interactions
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// Whether there are no interactions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Whether there are appended interactions not yet written
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the cassette file was absent when the session was opened
    #[must_use]
    pub fn was_blank(&self) -> bool {
        self.was_blank
    }

    /// Index of the first interaction recorded for `url` and `method`
    #[must_use]
    pub fn find(&self, url: &str, method: &str) -> Option<usize> {
        matcher::find(&self.archive, url, method)
    }

    /// Append an interaction at the end and mark the session dirty
    pub fn append(&mut self, interaction: Interaction) {
        debug!(
            "Appending interaction: {} {} -> {} (count: {})",
            interaction.request.method,
            interaction.request.url,
            interaction.response.status,
            self.archive.len() + 1
        );
        self.archive.push(interaction);
        self.dirty = true;
    }

    /// Write the archive back to the cassette file if it changed
    ///
    /// Parent directories are created as needed. The dirty flag is cleared
    /// only after a successful write.
    ///
    /// # Errors
    ///
    /// Returns error if the archive cannot be encoded or written
    pub fn persist(&mut self) -> Result<()> {
        if !self.dirty {
            debug!("Cassette '{}' unchanged, skipping write", self.path.display());
            return Ok(());
        }

        let data = format::encode(&self.archive)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, data)?;
        self.dirty = false;

        info!(
            "Persisted cassette '{}': {} interactions",
            self.path.display(),
            self.archive.len()
        );

        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.dirty {
            warn!(
                "Cassette '{}' dropped with unsaved interactions; call dispose() to keep them",
                self.path.display()
            );
        }
    }
}
