//! Invoice repository implementation
//!
//! Invoices live in `invoices`, with their lines, payments and audit events
//! in child tables. Snapshots, the origin and the rectification link are
//! stored as JSONB. Every write is conditional on the row's `version`.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::debug;
use uuid::Uuid;

use core_kernel::{ClientId, Currency, InvoiceEventId, InvoiceId, InvoiceLineId, IssuerId, Money, PaymentId, ProviderId};
use domain_invoicing::{
    CompanySnapshot, Counterparty, CounterpartySnapshot, Invoice, InvoiceEvent, InvoiceLine, InvoiceOrigin,
    InvoicePayment, InvoiceQuery, InvoiceStatus, IssuanceCommit, IssuanceReceipt, LineSnapshot,
    RectificationLink, TotalsSnapshot,
};

use crate::error::DatabaseError;
use crate::repositories::series;

type PgQuery<'q> = sqlx::query::Query<'q, Postgres, PgArguments>;

macro_rules! invoice_select {
    ($rest:literal) => {
        concat!(
            "SELECT invoice_id, issuer_id, invoice_type, number, series, sequence, client_id, provider_id, \
             origin, issue_date, due_date, service_date, currency, pricing_mode, subtotal, tax_amount, total, \
             status, notes, terms, payment_method, payment_details, issued_at, viewed_at, paid_at, canceled_at, \
             rectification, company_snapshot, counterparty_snapshot, items_snapshot, totals_snapshot, \
             version, created_at, updated_at \
             FROM invoices ",
            $rest
        )
    };
}

const INSERT_INVOICE_SQL: &str = r#"
    INSERT INTO invoices (
        invoice_id, issuer_id, invoice_type, number, series, sequence, client_id, provider_id,
        origin, issue_date, due_date, service_date, currency, pricing_mode, subtotal, tax_amount, total,
        status, notes, terms, payment_method, payment_details, issued_at, viewed_at, paid_at, canceled_at,
        rectification, company_snapshot, counterparty_snapshot, items_snapshot, totals_snapshot,
        updated_at, version, created_at
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
        $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32, $33, $34
    )
"#;

const UPDATE_INVOICE_SQL: &str = r#"
    UPDATE invoices SET
        invoice_type = $3, number = $4, series = $5, sequence = $6, client_id = $7, provider_id = $8,
        origin = $9, issue_date = $10, due_date = $11, service_date = $12, currency = $13,
        pricing_mode = $14, subtotal = $15, tax_amount = $16, total = $17, status = $18,
        notes = $19, terms = $20, payment_method = $21, payment_details = $22,
        issued_at = $23, viewed_at = $24, paid_at = $25, canceled_at = $26,
        rectification = $27, company_snapshot = $28, counterparty_snapshot = $29,
        items_snapshot = $30, totals_snapshot = $31, updated_at = $32,
        version = version + 1
    WHERE invoice_id = $1 AND issuer_id = $2 AND version = $33
    RETURNING version
"#;

// ============================================================================
// Row types
// ============================================================================

/// Database row for an invoice header
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub issuer_id: Uuid,
    pub invoice_type: String,
    pub number: String,
    pub series: String,
    pub sequence: Option<i64>,
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub origin: Json<InvoiceOrigin>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub currency: String,
    pub pricing_mode: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
    pub status: String,
    pub notes: Option<String>,
    pub terms: Option<String>,
    pub payment_method: Option<String>,
    pub payment_details: Option<String>,
    pub issued_at: Option<DateTime<Utc>>,
    pub viewed_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub canceled_at: Option<DateTime<Utc>>,
    pub rectification: Option<Json<RectificationLink>>,
    pub company_snapshot: Option<Json<CompanySnapshot>>,
    pub counterparty_snapshot: Option<Json<CounterpartySnapshot>>,
    pub items_snapshot: Option<Json<Vec<LineSnapshot>>>,
    pub totals_snapshot: Option<Json<TotalsSnapshot>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct InvoiceLineRow {
    pub line_id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    pub tax_percent: Decimal,
    pub pricing_mode: String,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub event_id: Uuid,
    pub invoice_id: Uuid,
    pub issuer_id: Uuid,
    pub event_type: String,
    pub metadata: serde_json::Value,
    pub occurred_at: DateTime<Utc>,
}

fn parse<T>(what: &str, value: &str) -> Result<T, DatabaseError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e| DatabaseError::decode(what, e))
}

impl InvoiceLineRow {
    fn into_line(self) -> Result<InvoiceLine, DatabaseError> {
        Ok(InvoiceLine {
            id: InvoiceLineId::from_uuid(self.line_id),
            position: u32::try_from(self.position).map_err(|e| DatabaseError::decode("line position", e))?,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            discount_percent: self.discount_percent,
            tax_percent: self.tax_percent,
            pricing_mode: parse("pricing mode", &self.pricing_mode)?,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
        })
    }
}

impl PaymentRow {
    fn into_payment(self) -> Result<InvoicePayment, DatabaseError> {
        let currency: Currency = parse("payment currency", &self.currency)?;
        Ok(InvoicePayment {
            id: PaymentId::from_uuid(self.payment_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            amount: Money::new(self.amount, currency),
            method: parse("payment method", &self.method)?,
            reference: self.reference,
            notes: self.notes,
            paid_at: self.paid_at,
            created_at: self.created_at,
        })
    }
}

impl EventRow {
    pub fn into_event(self) -> Result<InvoiceEvent, DatabaseError> {
        Ok(InvoiceEvent {
            id: InvoiceEventId::from_uuid(self.event_id),
            invoice_id: InvoiceId::from_uuid(self.invoice_id),
            issuer_id: IssuerId::from_uuid(self.issuer_id),
            event_type: parse("event type", &self.event_type)?,
            metadata: self.metadata,
            occurred_at: self.occurred_at,
        })
    }
}

impl InvoiceRow {
    /// Assembles the aggregate from the header and its child rows
    pub fn into_invoice(self, lines: Vec<InvoiceLineRow>, payments: Vec<PaymentRow>) -> Result<Invoice, DatabaseError> {
        let counterparty = match (self.client_id, self.provider_id) {
            (Some(client), None) => Some(Counterparty::Client(ClientId::from_uuid(client))),
            (None, Some(provider)) => Some(Counterparty::Provider(ProviderId::from_uuid(provider))),
            (None, None) => None,
            (Some(_), Some(_)) => {
                return Err(DatabaseError::decode("counterparty", "both client and provider set"));
            }
        };

        let mut lines = lines
            .into_iter()
            .map(InvoiceLineRow::into_line)
            .collect::<Result<Vec<_>, _>>()?;
        lines.sort_by_key(|l| l.position);
        let mut payments = payments
            .into_iter()
            .map(PaymentRow::into_payment)
            .collect::<Result<Vec<_>, _>>()?;
        payments.sort_by_key(|p| (p.created_at, p.id));

        Ok(Invoice {
            id: InvoiceId::from_uuid(self.invoice_id),
            issuer_id: IssuerId::from_uuid(self.issuer_id),
            invoice_type: parse("invoice type", &self.invoice_type)?,
            number: self.number,
            series: self.series,
            sequence: self.sequence,
            counterparty,
            origin: self.origin.0,
            issue_date: self.issue_date,
            due_date: self.due_date,
            service_date: self.service_date,
            currency: parse("invoice currency", &self.currency)?,
            pricing_mode: parse("pricing mode", &self.pricing_mode)?,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total: self.total,
            status: parse("invoice status", &self.status)?,
            notes: self.notes,
            terms: self.terms,
            payment_method: self.payment_method,
            payment_details: self.payment_details,
            issued_at: self.issued_at,
            viewed_at: self.viewed_at,
            paid_at: self.paid_at,
            canceled_at: self.canceled_at,
            rectification: self.rectification.map(|j| j.0),
            company_snapshot: self.company_snapshot.map(|j| j.0),
            counterparty_snapshot: self.counterparty_snapshot.map(|j| j.0),
            items_snapshot: self.items_snapshot.map(|j| j.0),
            totals_snapshot: self.totals_snapshot.map(|j| j.0),
            lines,
            payments,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Splits the counterparty reference into its two nullable columns
fn counterparty_columns(counterparty: Option<Counterparty>) -> (Option<Uuid>, Option<Uuid>) {
    match counterparty {
        Some(Counterparty::Client(id)) => (Some(id.into()), None),
        Some(Counterparty::Provider(id)) => (None, Some(id.into())),
        None => (None, None),
    }
}

/// `ILIKE` pattern matching the term anywhere, wildcards in the term escaped
pub fn contains_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Binds `$1..$32`, the columns shared by insert and update
fn bind_invoice<'q>(query: PgQuery<'q>, invoice: &'q Invoice) -> PgQuery<'q> {
    let (client_id, provider_id) = counterparty_columns(invoice.counterparty);
    query
        .bind(Uuid::from(invoice.id))
        .bind(Uuid::from(invoice.issuer_id))
        .bind(invoice.invoice_type.as_str())
        .bind(&invoice.number)
        .bind(&invoice.series)
        .bind(invoice.sequence)
        .bind(client_id)
        .bind(provider_id)
        .bind(Json(&invoice.origin))
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(invoice.service_date)
        .bind(invoice.currency.code())
        .bind(invoice.pricing_mode.as_str())
        .bind(invoice.subtotal)
        .bind(invoice.tax_amount)
        .bind(invoice.total)
        .bind(invoice.status.as_str())
        .bind(&invoice.notes)
        .bind(&invoice.terms)
        .bind(&invoice.payment_method)
        .bind(&invoice.payment_details)
        .bind(invoice.issued_at)
        .bind(invoice.viewed_at)
        .bind(invoice.paid_at)
        .bind(invoice.canceled_at)
        .bind(invoice.rectification.as_ref().map(Json))
        .bind(invoice.company_snapshot.as_ref().map(Json))
        .bind(invoice.counterparty_snapshot.as_ref().map(Json))
        .bind(invoice.items_snapshot.as_ref().map(Json))
        .bind(invoice.totals_snapshot.as_ref().map(Json))
        .bind(invoice.updated_at)
}

// ============================================================================
// Repository
// ============================================================================

/// Repository for invoices and everything they own
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: PgPool,
}

impl InvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Persists a new invoice with its lines, payments and events
    pub async fn insert(&self, invoice: &Invoice, events: &[InvoiceEvent]) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        bind_invoice(sqlx::query(INSERT_INVOICE_SQL), invoice)
            .bind(invoice.version)
            .bind(invoice.created_at)
            .execute(&mut *tx)
            .await?;
        insert_lines(&mut *tx, invoice).await?;
        insert_payments(&mut *tx, invoice).await?;
        insert_events(&mut *tx, events).await?;

        tx.commit().await?;
        debug!(invoice_id = %invoice.id, "Invoice inserted");
        Ok(())
    }

    pub async fn get(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Option<Invoice>, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, issuer_id, id, false).await
    }

    /// Lists an issuer's invoices matching the query, newest issue date first
    pub async fn list(&self, issuer_id: IssuerId, query: &InvoiceQuery) -> Result<Vec<Invoice>, DatabaseError> {
        let (client_id, provider_id) = counterparty_columns(query.counterparty);
        let rows = sqlx::query_as::<_, InvoiceRow>(invoice_select!(
            "WHERE issuer_id = $1 \
               AND ($2::text IS NULL OR status = $2) \
               AND ($3::text IS NULL OR invoice_type = $3) \
               AND ($4::uuid IS NULL OR client_id = $4) \
               AND ($5::uuid IS NULL OR provider_id = $5) \
               AND ($6::date IS NULL OR issue_date >= $6) \
               AND ($7::date IS NULL OR issue_date <= $7) \
               AND ($8::text IS NULL OR number ILIKE $8 OR notes ILIKE $8) \
               AND (NOT $9 OR rectification IS NOT NULL) \
             ORDER BY issue_date DESC, created_at DESC \
             LIMIT $10 OFFSET $11"
        ))
        .bind(Uuid::from(issuer_id))
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.invoice_type.map(|t| t.as_str()))
        .bind(client_id)
        .bind(provider_id)
        .bind(query.issued_from)
        .bind(query.issued_to)
        .bind(query.search.as_deref().map(contains_pattern))
        .bind(query.rectifications_only)
        .bind(query.limit.map(i64::from))
        .bind(i64::from(query.offset.unwrap_or(0)))
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        assemble(&mut conn, rows).await
    }

    /// Issued invoices of every issuer that are neither paid nor canceled
    pub async fn list_open(&self) -> Result<Vec<Invoice>, DatabaseError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(invoice_select!(
            "WHERE issued_at IS NOT NULL AND status NOT IN ('PAID', 'CANCELED') ORDER BY invoice_id"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut conn = self.pool.acquire().await?;
        assemble(&mut conn, rows).await
    }

    /// Writes the whole aggregate if it is still at `expected_version`
    pub async fn save(
        &self,
        invoice: &Invoice,
        expected_version: i64,
        events: &[InvoiceEvent],
    ) -> Result<Invoice, DatabaseError> {
        let mut tx = self.pool.begin().await?;
        let saved = write_invoice(&mut *tx, invoice, expected_version, events).await?;
        tx.commit().await?;
        Ok(saved)
    }

    /// Deletes a draft and everything hanging off it
    pub async fn delete_draft(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM invoices WHERE invoice_id = $1 AND issuer_id = $2 AND status = 'DRAFT'")
            .bind(Uuid::from(id))
            .bind(Uuid::from(issuer_id))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Locks the draft, allocates its number and writes the issued invoice
    /// in one transaction
    pub async fn issue(&self, commit: IssuanceCommit) -> Result<IssuanceReceipt, DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let current = fetch(&mut *tx, commit.issuer_id, commit.invoice_id, true)
            .await?
            .ok_or_else(|| DatabaseError::not_found("Invoice", commit.invoice_id))?;
        if current.is_issued() {
            return Ok(IssuanceReceipt::AlreadyIssued(current));
        }
        if current.status != InvoiceStatus::Draft {
            return Ok(IssuanceReceipt::NotDraft(current));
        }
        if current.version != commit.expected_version {
            return Err(DatabaseError::StaleVersion(format!(
                "Invoice {} changed while being issued",
                commit.invoice_id
            )));
        }

        let sequence = series::allocate_next(&mut *tx, commit.issuer_id.into(), &commit.series_key).await?;
        let number = domain_invoicing::AllocatedNumber::new(commit.series_key.clone(), sequence);
        let write = (commit.finalize)(current, &number);
        let issued = write_invoice(&mut *tx, &write.invoice, commit.expected_version, &write.events).await?;

        tx.commit().await?;
        debug!(invoice_id = %issued.id, number = %issued.number, "Invoice issued");
        Ok(IssuanceReceipt::Issued(issued))
    }

    pub async fn events(&self, issuer_id: IssuerId, id: InvoiceId) -> Result<Vec<InvoiceEvent>, DatabaseError> {
        let rows = sqlx::query_as::<_, EventRow>(
            "SELECT event_id, invoice_id, issuer_id, event_type, metadata, occurred_at \
             FROM invoice_events WHERE invoice_id = $1 AND issuer_id = $2 ORDER BY seq",
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(issuer_id))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }
}

// ============================================================================
// Connection-level helpers, shared by pooled and transactional paths
// ============================================================================

async fn fetch(
    conn: &mut PgConnection,
    issuer_id: IssuerId,
    id: InvoiceId,
    for_update: bool,
) -> Result<Option<Invoice>, DatabaseError> {
    let sql = if for_update {
        invoice_select!("WHERE invoice_id = $1 AND issuer_id = $2 FOR UPDATE")
    } else {
        invoice_select!("WHERE invoice_id = $1 AND issuer_id = $2")
    };
    let row = sqlx::query_as::<_, InvoiceRow>(sql)
        .bind(Uuid::from(id))
        .bind(Uuid::from(issuer_id))
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => Ok(assemble(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Loads child rows for a batch of headers, keeping the header order
async fn assemble(conn: &mut PgConnection, rows: Vec<InvoiceRow>) -> Result<Vec<Invoice>, DatabaseError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.invoice_id).collect();

    let line_rows = sqlx::query_as::<_, InvoiceLineRow>(
        "SELECT line_id, invoice_id, position, description, quantity, unit_price, discount_percent, \
                tax_percent, pricing_mode, subtotal, tax_amount, total \
         FROM invoice_lines WHERE invoice_id = ANY($1) ORDER BY invoice_id, position",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;
    let payment_rows = sqlx::query_as::<_, PaymentRow>(
        "SELECT payment_id, invoice_id, amount, currency, method, reference, notes, paid_at, created_at \
         FROM invoice_payments WHERE invoice_id = ANY($1) ORDER BY created_at, payment_id",
    )
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut lines: HashMap<Uuid, Vec<InvoiceLineRow>> = HashMap::new();
    for line in line_rows {
        lines.entry(line.invoice_id).or_default().push(line);
    }
    let mut payments: HashMap<Uuid, Vec<PaymentRow>> = HashMap::new();
    for payment in payment_rows {
        payments.entry(payment.invoice_id).or_default().push(payment);
    }

    rows.into_iter()
        .map(|row| {
            let id = row.invoice_id;
            row.into_invoice(
                lines.remove(&id).unwrap_or_default(),
                payments.remove(&id).unwrap_or_default(),
            )
        })
        .collect()
}

/// Version-checked update of the header, lines replaced, new payments and
/// events appended
async fn write_invoice(
    conn: &mut PgConnection,
    invoice: &Invoice,
    expected_version: i64,
    events: &[InvoiceEvent],
) -> Result<Invoice, DatabaseError> {
    let version = bind_invoice(sqlx::query(UPDATE_INVOICE_SQL), invoice)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await?
        .map(|row| sqlx::Row::try_get::<i64, _>(&row, "version"))
        .transpose()?;

    let Some(version) = version else {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM invoices WHERE invoice_id = $1 AND issuer_id = $2)",
        )
        .bind(Uuid::from(invoice.id))
        .bind(Uuid::from(invoice.issuer_id))
        .fetch_one(&mut *conn)
        .await?;
        return Err(if exists {
            DatabaseError::StaleVersion(format!(
                "Invoice {} is no longer at version {}",
                invoice.id, expected_version
            ))
        } else {
            DatabaseError::not_found("Invoice", invoice.id)
        });
    };

    sqlx::query("DELETE FROM invoice_lines WHERE invoice_id = $1")
        .bind(Uuid::from(invoice.id))
        .execute(&mut *conn)
        .await?;
    insert_lines(conn, invoice).await?;
    insert_payments(conn, invoice).await?;
    insert_events(conn, events).await?;

    let mut saved = invoice.clone();
    saved.version = version;
    Ok(saved)
}

async fn insert_lines(conn: &mut PgConnection, invoice: &Invoice) -> Result<(), DatabaseError> {
    for line in &invoice.lines {
        sqlx::query(
            "INSERT INTO invoice_lines (line_id, invoice_id, position, description, quantity, unit_price, \
                 discount_percent, tax_percent, pricing_mode, subtotal, tax_amount, total) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(Uuid::from(line.id))
        .bind(Uuid::from(invoice.id))
        .bind(i32::try_from(line.position).map_err(|e| DatabaseError::decode("line position", e))?)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price)
        .bind(line.discount_percent)
        .bind(line.tax_percent)
        .bind(line.pricing_mode.as_str())
        .bind(line.subtotal)
        .bind(line.tax_amount)
        .bind(line.total)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Payments are append-only; rows already stored are left alone
async fn insert_payments(conn: &mut PgConnection, invoice: &Invoice) -> Result<(), DatabaseError> {
    for payment in &invoice.payments {
        sqlx::query(
            "INSERT INTO invoice_payments (payment_id, invoice_id, amount, currency, method, reference, \
                 notes, paid_at, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (payment_id) DO NOTHING",
        )
        .bind(Uuid::from(payment.id))
        .bind(Uuid::from(invoice.id))
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.method.as_str())
        .bind(&payment.reference)
        .bind(&payment.notes)
        .bind(payment.paid_at)
        .bind(payment.created_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn insert_events(conn: &mut PgConnection, events: &[InvoiceEvent]) -> Result<(), DatabaseError> {
    for event in events {
        sqlx::query(
            "INSERT INTO invoice_events (event_id, invoice_id, issuer_id, event_type, metadata, occurred_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(event.id))
        .bind(Uuid::from(event.invoice_id))
        .bind(Uuid::from(event.issuer_id))
        .bind(event.event_type.as_str())
        .bind(&event.metadata)
        .bind(event.occurred_at)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}
