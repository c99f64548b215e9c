//! Rendered documents stored as BYTEA, one row per invoice

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use core_kernel::{DomainPort, InvoiceId, IssuerId, PortError};
use domain_invoicing::{DocumentStore, StoredDocument};

use crate::error::DatabaseError;

#[derive(Debug, Clone, FromRow)]
struct DocumentRow {
    invoice_id: Uuid,
    issuer_id: Uuid,
    number: String,
    content_type: String,
    content: Vec<u8>,
    generated_at: DateTime<Utc>,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        StoredDocument {
            invoice_id: InvoiceId::from_uuid(row.invoice_id),
            issuer_id: IssuerId::from_uuid(row.issuer_id),
            number: row.number,
            content_type: row.content_type,
            content: row.content,
            generated_at: row.generated_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl DomainPort for PostgresDocumentStore {}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn put(&self, document: StoredDocument) -> Result<(), PortError> {
        sqlx::query(
            "INSERT INTO invoice_documents (invoice_id, issuer_id, number, content_type, content, generated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (invoice_id) DO UPDATE SET \
                 number = EXCLUDED.number, content_type = EXCLUDED.content_type, \
                 content = EXCLUDED.content, generated_at = EXCLUDED.generated_at",
        )
        .bind(Uuid::from(document.invoice_id))
        .bind(Uuid::from(document.issuer_id))
        .bind(&document.number)
        .bind(&document.content_type)
        .bind(&document.content)
        .bind(document.generated_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(())
    }

    async fn get(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<Option<StoredDocument>, PortError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT invoice_id, issuer_id, number, content_type, content, generated_at \
             FROM invoice_documents WHERE invoice_id = $1 AND issuer_id = $2",
        )
        .bind(Uuid::from(invoice_id))
        .bind(Uuid::from(issuer_id))
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from)?;
        Ok(row.map(StoredDocument::from))
    }

    async fn invalidate(&self, issuer_id: IssuerId, invoice_id: InvoiceId) -> Result<(), PortError> {
        sqlx::query("DELETE FROM invoice_documents WHERE invoice_id = $1 AND issuer_id = $2")
            .bind(Uuid::from(invoice_id))
            .bind(Uuid::from(issuer_id))
            .execute(&self.pool)
            .await
            .map_err(DatabaseError::from)?;
        Ok(())
    }
}
