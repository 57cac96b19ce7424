//! Job messages produced by the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use docforge_core::DocumentId;
use docforge_documents::DocumentKind;

use crate::lock::LockHandle;

/// Unique job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Request to regenerate one document's PDF under an already acquired lease.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub job_id: JobId,
    pub kind: DocumentKind,
    pub document_id: DocumentId,
    pub lock: LockHandle,
    pub enqueued_at: DateTime<Utc>,
}

impl GenerationJob {
    pub fn new(kind: DocumentKind, document_id: DocumentId, lock: LockHandle) -> Self {
        Self {
            job_id: JobId::new(),
            kind,
            document_id,
            lock,
            enqueued_at: Utc::now(),
        }
    }
}
