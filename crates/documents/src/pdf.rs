//! The PDF record owned by an issued document.

use serde::{Deserialize, Serialize};

/// Outcome of clearing the dirty state after a successful store.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CleanOutcome {
    /// The record is clean and its url points at the fresh artifact.
    Clean,
    /// The document was invalidated again while the artifact was being
    /// produced; the url was updated but the record stays dirty.
    StillDirty,
}

/// Generated-artifact record of a document.
///
/// `dirty` is a counter: every invalidating transition increments it and a
/// clean write subtracts the value observed before rendering. A record is
/// stale while the counter is non-zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PdfRecord {
    upload_path: String,
    url: Option<String>,
    dirty: u32,
}

impl PdfRecord {
    /// A freshly created record: dirty, never generated.
    pub fn new(upload_path: impl Into<String>) -> Self {
        Self {
            upload_path: upload_path.into(),
            url: None,
            dirty: 1,
        }
    }

    /// Rebuild a record from persisted columns.
    pub fn from_parts(upload_path: impl Into<String>, url: Option<String>, dirty: u32) -> Self {
        Self {
            upload_path: upload_path.into(),
            url,
            dirty,
        }
    }

    pub fn upload_path(&self) -> &str {
        &self.upload_path
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn dirty_count(&self) -> u32 {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty > 0
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = self.dirty.saturating_add(1);
    }

    /// Record a stored artifact and retire the `observed` invalidations it covers.
    pub fn mark_clean(&mut self, url: impl Into<String>, observed: u32) -> CleanOutcome {
        self.url = Some(url.into());
        self.dirty = self.dirty.saturating_sub(observed);
        if self.dirty == 0 {
            CleanOutcome::Clean
        } else {
            CleanOutcome::StillDirty
        }
    }
}
