//! Series counters
//!
//! One row per issuer and series key. Allocation is a single upsert, so the
//! first use of a key and every later one go through the same row lock; run
//! inside the issuance transaction, a rollback also rolls back the counter.

use sqlx::PgConnection;
use uuid::Uuid;

use domain_invoicing::SeriesKey;

use crate::error::DatabaseError;

const ALLOCATE_SQL: &str = r#"
    INSERT INTO invoice_series (issuer_id, series_key, next_value, updated_at)
    VALUES ($1, $2, 2, now())
    ON CONFLICT (issuer_id, series_key)
    DO UPDATE SET next_value = invoice_series.next_value + 1, updated_at = now()
    RETURNING next_value - 1
"#;

/// Consumes and returns the next sequence value for the key, starting at 1
///
/// Must run on the connection of the transaction that writes the issued
/// invoice; the row stays locked until that transaction ends.
pub async fn allocate_next(
    conn: &mut PgConnection,
    issuer_id: Uuid,
    key: &SeriesKey,
) -> Result<i64, DatabaseError> {
    let value = sqlx::query_scalar::<_, i64>(ALLOCATE_SQL)
        .bind(issuer_id)
        .bind(key.to_string())
        .fetch_one(&mut *conn)
        .await?;
    Ok(value)
}
