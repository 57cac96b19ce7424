//! Postgres-backed document repository.
//!
//! Document bodies live in `documents` as JSONB; PDF records live in
//! `document_pdfs`, one row per document. Each pipeline write is a single
//! statement or a single transaction, so it is atomic with respect to
//! concurrent readers:
//!
//! | Operation             | Statement |
//! |-----------------------|-----------|
//! | `mark_dirty`          | `INSERT ... ON CONFLICT DO UPDATE SET dirty = dirty + 1` |
//! | `mark_clean`          | `UPDATE ... SET url, dirty = GREATEST(dirty - observed, 0) RETURNING dirty` |
//! | `save_and_invalidate` | body upsert + `dirty = dirty + n` upsert in one transaction |
//!
//! ## Thread Safety
//!
//! The repository exposes a blocking interface (workers run on plain threads)
//! and drives SQLx on the runtime `handle` it was built with. Calls must come
//! from outside async contexts (worker threads or `spawn_blocking`).

use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tokio::runtime::Handle;
use tracing::instrument;

use docforge_core::DocumentId;
use docforge_documents::{CleanOutcome, Document, DocumentKind, PdfRecord};

use super::{DocumentRepository, RepositoryError};

/// Schema for the repository tables (idempotent).
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    kind        TEXT        NOT NULL,
    id          UUID        NOT NULL,
    body        JSONB       NOT NULL,
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (kind, id)
);

CREATE TABLE IF NOT EXISTS document_pdfs (
    document_kind TEXT        NOT NULL,
    document_id   UUID        NOT NULL,
    upload_path   TEXT        NOT NULL,
    url           TEXT,
    dirty         INTEGER     NOT NULL DEFAULT 1 CHECK (dirty >= 0),
    updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (document_kind, document_id),
    FOREIGN KEY (document_kind, document_id) REFERENCES documents (kind, id)
);

CREATE INDEX IF NOT EXISTS document_pdfs_stale_idx
    ON document_pdfs (document_kind) WHERE dirty > 0;
"#;

#[derive(Debug, Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
    handle: Handle,
}

fn backend(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Backend(e.to_string())
}

fn dirty_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool, handle: Handle) -> Self {
        Self { pool, handle }
    }

    /// Create tables and indexes if they do not exist.
    pub async fn migrate(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        Ok(())
    }
}

impl DocumentRepository for PostgresDocumentRepository {
    #[instrument(skip(self), fields(kind = %kind))]
    fn find_stale(&self, kind: DocumentKind) -> Result<Vec<DocumentId>, RepositoryError> {
        self.handle.block_on(async {
            let rows = sqlx::query(
                r#"
                SELECT document_id
                FROM document_pdfs
                WHERE document_kind = $1 AND dirty > 0
                ORDER BY document_id
                "#,
            )
            .bind(kind.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;

            rows.into_iter()
                .map(|r| {
                    r.try_get::<uuid::Uuid, _>("document_id")
                        .map(DocumentId::from_uuid)
                        .map_err(backend)
                })
                .collect()
        })
    }

    fn is_dirty(&self, kind: DocumentKind, id: DocumentId) -> Result<bool, RepositoryError> {
        self.handle.block_on(async {
            let row = sqlx::query(
                "SELECT dirty FROM document_pdfs WHERE document_kind = $1 AND document_id = $2",
            )
            .bind(kind.as_str())
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

            match row {
                Some(r) => Ok(r.try_get::<i32, _>("dirty").map_err(backend)? > 0),
                None => Ok(false),
            }
        })
    }

    #[instrument(skip(self), fields(kind = %kind, document_id = %id))]
    fn load(&self, kind: DocumentKind, id: DocumentId) -> Result<Option<Document>, RepositoryError> {
        self.handle.block_on(async {
            let row = sqlx::query(
                r#"
                SELECT d.body, p.upload_path, p.url, p.dirty
                FROM documents d
                LEFT JOIN document_pdfs p
                    ON p.document_kind = d.kind AND p.document_id = d.id
                WHERE d.kind = $1 AND d.id = $2
                "#,
            )
            .bind(kind.as_str())
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

            let Some(row) = row else {
                return Ok(None);
            };

            let Json(body): Json<Document> = row
                .try_get("body")
                .map_err(|e| RepositoryError::Serialization(e.to_string()))?;
            let upload_path: Option<String> = row.try_get("upload_path").map_err(backend)?;
            let url: Option<String> = row.try_get("url").map_err(backend)?;
            let dirty: Option<i32> = row.try_get("dirty").map_err(backend)?;

            let pdf = upload_path
                .map(|path| PdfRecord::from_parts(path, url, dirty.map(dirty_count).unwrap_or(0)));
            Ok(Some(body.with_pdf(pdf)))
        })
    }

    #[instrument(skip(self, url), fields(kind = %kind, document_id = %id))]
    fn mark_clean(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        url: &str,
        observed_dirty: u32,
    ) -> Result<CleanOutcome, RepositoryError> {
        let observed = i32::try_from(observed_dirty).unwrap_or(i32::MAX);
        self.handle.block_on(async {
            let row = sqlx::query(
                r#"
                UPDATE document_pdfs
                SET url = $3,
                    dirty = GREATEST(dirty - $4, 0),
                    updated_at = NOW()
                WHERE document_kind = $1 AND document_id = $2
                RETURNING dirty
                "#,
            )
            .bind(kind.as_str())
            .bind(*id.as_uuid())
            .bind(url)
            .bind(observed)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;

            let row = row.ok_or(RepositoryError::MissingPdf { kind, id })?;
            let remaining: i32 = row.try_get("dirty").map_err(backend)?;
            Ok(if remaining > 0 {
                CleanOutcome::StillDirty
            } else {
                CleanOutcome::Clean
            })
        })
    }

    #[instrument(skip(self, document), fields(kind = %document.kind(), document_id = %document.id_typed()))]
    fn save(&self, document: &Document) -> Result<(), RepositoryError> {
        self.handle.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO documents (kind, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (kind, id)
                DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
                "#,
            )
            .bind(document.kind().as_str())
            .bind(*document.id_typed().as_uuid())
            .bind(Json(document))
            .execute(&self.pool)
            .await
            .map_err(backend)?;
            Ok(())
        })
    }

    #[instrument(skip(self), fields(kind = %kind, document_id = %id))]
    fn mark_dirty(
        &self,
        kind: DocumentKind,
        id: DocumentId,
        upload_path: &str,
    ) -> Result<(), RepositoryError> {
        self.handle.block_on(async {
            sqlx::query(
                r#"
                INSERT INTO document_pdfs (document_kind, document_id, upload_path, dirty)
                VALUES ($1, $2, $3, 1)
                ON CONFLICT (document_kind, document_id)
                DO UPDATE SET dirty = document_pdfs.dirty + 1, updated_at = NOW()
                "#,
            )
            .bind(kind.as_str())
            .bind(*id.as_uuid())
            .bind(upload_path)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                // 23503: no document body for the pdf row to reference.
                let missing_body = matches!(
                    &e,
                    sqlx::Error::Database(db) if db.code().as_deref() == Some("23503")
                );
                if missing_body {
                    RepositoryError::NotFound { kind, id }
                } else {
                    backend(e)
                }
            })?;
            Ok(())
        })
    }

    #[instrument(
        skip(self, document),
        fields(kind = %document.kind(), document_id = %document.id_typed())
    )]
    fn save_and_invalidate(
        &self,
        document: &Document,
        invalidations: u32,
    ) -> Result<(), RepositoryError> {
        let invalidations = i32::try_from(invalidations).unwrap_or(i32::MAX);
        self.handle.block_on(async {
            let mut tx = self.pool.begin().await.map_err(backend)?;

            sqlx::query(
                r#"
                INSERT INTO documents (kind, id, body)
                VALUES ($1, $2, $3)
                ON CONFLICT (kind, id)
                DO UPDATE SET body = EXCLUDED.body, updated_at = NOW()
                "#,
            )
            .bind(document.kind().as_str())
            .bind(*document.id_typed().as_uuid())
            .bind(Json(document))
            .execute(&mut *tx)
            .await
            .map_err(backend)?;

            if invalidations > 0 {
                sqlx::query(
                    r#"
                    INSERT INTO document_pdfs (document_kind, document_id, upload_path, dirty)
                    VALUES ($1, $2, $3, $4)
                    ON CONFLICT (document_kind, document_id)
                    DO UPDATE SET dirty = document_pdfs.dirty + $4, updated_at = NOW()
                    "#,
                )
                .bind(document.kind().as_str())
                .bind(*document.id_typed().as_uuid())
                .bind(document.upload_path())
                .bind(invalidations)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
            }

            // Dropping the transaction on any error above rolls it back.
            tx.commit().await.map_err(backend)?;
            Ok(())
        })
    }
}
