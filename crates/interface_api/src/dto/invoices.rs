//! Invoice DTOs
//!
//! Requests are checked with `validator` for shape (lengths, ranges) before
//! they reach the service, which owns every business rule.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use core_kernel::{ClientId, Currency, Money, ProviderId};
use domain_invoicing::{
    Counterparty, DraftSpec, DueState, InvoiceFilter, InvoiceOrigin, InvoiceQuery, InvoiceStatus, InvoiceType,
    InvoiceView, LineSpec, NewPayment, PaymentMethod, PricingMode, RectificationType, MAX_AMOUNT,
};

use crate::error::ApiError;

fn validate_percent(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new("percent_range").with_message("must be between 0 and 100".into()));
    }
    Ok(())
}

/// Keeps entered amounts within what a `NUMERIC(18, 2)` column holds
fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    if value.abs() > MAX_AMOUNT {
        return Err(ValidationError::new("amount_range").with_message("is too large".into()));
    }
    Ok(())
}

fn validate_positive(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(ValidationError::new("positive").with_message("must be greater than zero".into()));
    }
    validate_amount(value)
}

/// Resolves the two optional id fields into one counterparty reference
fn counterparty(client_id: Option<Uuid>, provider_id: Option<Uuid>) -> Result<Option<Counterparty>, ApiError> {
    match (client_id, provider_id) {
        (Some(_), Some(_)) => Err(ApiError::Validation(vec![
            "Provide either client_id or provider_id, not both".to_string(),
        ])),
        (Some(id), None) => Ok(Some(Counterparty::Client(ClientId::from_uuid(id)))),
        (None, Some(id)) => Ok(Some(Counterparty::Provider(ProviderId::from_uuid(id)))),
        (None, None) => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct LineRequest {
    #[validate(length(min = 1, max = 500))]
    pub description: String,
    #[validate(custom(function = "validate_amount"))]
    pub quantity: Decimal,
    #[serde(default)]
    #[validate(custom(function = "validate_amount"))]
    pub unit_price: Decimal,
    #[validate(custom(function = "validate_amount"))]
    pub line_total: Option<Decimal>,
    #[validate(custom(function = "validate_percent"))]
    pub tax_percent: Decimal,
    pub discount_percent: Option<Decimal>,
    pub pricing_mode: Option<PricingMode>,
}

impl From<LineRequest> for LineSpec {
    fn from(line: LineRequest) -> Self {
        LineSpec {
            description: line.description,
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            tax_percent: line.tax_percent,
            discount_percent: line.discount_percent,
            pricing_mode: line.pricing_mode,
        }
    }
}

/// Body of both create and update; an update replaces the whole draft
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct DraftRequest {
    pub invoice_type: InvoiceType,
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    #[serde(default)]
    pub origin: InvoiceOrigin,
    #[validate(length(min = 1, max = 20))]
    pub series: Option<String>,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub service_date: Option<NaiveDate>,
    pub currency: Currency,
    #[serde(default)]
    pub pricing_mode: PricingMode,
    #[validate(length(min = 1, max = 200), nested)]
    pub lines: Vec<LineRequest>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    #[validate(length(max = 4000))]
    pub terms: Option<String>,
    #[validate(length(max = 100))]
    pub payment_method: Option<String>,
    #[validate(length(max = 1000))]
    pub payment_details: Option<String>,
}

impl DraftRequest {
    pub fn into_spec(self) -> Result<DraftSpec, ApiError> {
        Ok(DraftSpec {
            invoice_type: self.invoice_type,
            counterparty: counterparty(self.client_id, self.provider_id)?,
            origin: self.origin,
            series: self.series,
            issue_date: self.issue_date,
            due_date: self.due_date,
            service_date: self.service_date,
            currency: self.currency,
            pricing_mode: self.pricing_mode,
            lines: self.lines.into_iter().map(LineSpec::from).collect(),
            notes: self.notes,
            terms: self.terms,
            payment_method: self.payment_method,
            payment_details: self.payment_details,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct PaymentRequest {
    #[validate(custom(function = "validate_positive"))]
    pub amount: Decimal,
    pub currency: Currency,
    pub method: PaymentMethod,
    #[validate(length(max = 140))]
    pub reference: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl From<PaymentRequest> for NewPayment {
    fn from(request: PaymentRequest) -> Self {
        NewPayment {
            amount: Money::new(request.amount, request.currency),
            method: request.method,
            reference: request.reference,
            notes: request.notes,
            paid_at: request.paid_at,
        }
    }
}

fn default_rectification_kind() -> RectificationType {
    RectificationType::Total
}

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct RectificationRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
    #[serde(default = "default_rectification_kind")]
    pub kind: RectificationType,
}

/// Query string of `GET /invoices`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ListInvoicesParams {
    pub status: Option<InvoiceStatus>,
    pub invoice_type: Option<InvoiceType>,
    pub client_id: Option<Uuid>,
    pub provider_id: Option<Uuid>,
    pub issued_from: Option<NaiveDate>,
    pub issued_to: Option<NaiveDate>,
    pub due_state: Option<DueState>,
    #[validate(length(min = 1, max = 100))]
    pub search: Option<String>,
    pub rectifications_only: Option<bool>,
    #[validate(range(min = 1, max = 200))]
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl ListInvoicesParams {
    pub fn into_filter(self) -> Result<InvoiceFilter, ApiError> {
        Ok(InvoiceFilter {
            query: InvoiceQuery {
                status: self.status,
                invoice_type: self.invoice_type,
                counterparty: counterparty(self.client_id, self.provider_id)?,
                issued_from: self.issued_from,
                issued_to: self.issued_to,
                search: self.search,
                rectifications_only: self.rectifications_only.unwrap_or(false),
                limit: self.limit,
                offset: self.offset,
            },
            due_state: self.due_state,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemindersParams {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    /// True when the invoice already had a number and nothing changed
    pub already_issued: bool,
    #[serde(flatten)]
    pub view: InvoiceView,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub already_canceled: bool,
    #[serde(flatten)]
    pub view: InvoiceView,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(description: &str, tax_percent: Decimal) -> LineRequest {
        LineRequest {
            description: description.to_string(),
            quantity: dec!(1),
            unit_price: dec!(100),
            line_total: None,
            tax_percent,
            discount_percent: None,
            pricing_mode: None,
        }
    }

    fn draft(lines: Vec<LineRequest>) -> DraftRequest {
        DraftRequest {
            invoice_type: InvoiceType::Customer,
            client_id: Some(Uuid::now_v7()),
            provider_id: None,
            origin: InvoiceOrigin::None,
            series: None,
            issue_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            service_date: None,
            currency: Currency::EUR,
            pricing_mode: PricingMode::default(),
            lines,
            notes: None,
            terms: None,
            payment_method: None,
            payment_details: None,
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        let request = draft(vec![line("Consulting", dec!(21))]);
        assert!(request.validate().is_ok());
        let spec = request.into_spec().unwrap();
        assert!(matches!(spec.counterparty, Some(Counterparty::Client(_))));
    }

    #[test]
    fn test_empty_lines_and_bad_percent_are_rejected() {
        assert!(draft(vec![]).validate().is_err());
        assert!(draft(vec![line("Consulting", dec!(121))]).validate().is_err());
        assert!(draft(vec![line("", dec!(21))]).validate().is_err());
    }

    #[test]
    fn test_amounts_beyond_storage_are_rejected() {
        let mut huge = line("Bulk", dec!(21));
        huge.quantity = Decimal::MAX;
        assert!(draft(vec![huge]).validate().is_err());

        let mut inclusive = line("Bulk", dec!(21));
        inclusive.line_total = Some(dec!(10000000000000000));
        assert!(draft(vec![inclusive]).validate().is_err());

        let mut at_limit = line("Bulk", dec!(0));
        at_limit.unit_price = MAX_AMOUNT;
        assert!(draft(vec![at_limit]).validate().is_ok());
    }

    #[test]
    fn test_both_counterparties_is_a_validation_error() {
        let mut request = draft(vec![line("Consulting", dec!(21))]);
        request.provider_id = Some(Uuid::now_v7());
        assert!(matches!(request.into_spec(), Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_payment_amount_must_be_positive() {
        let payment = PaymentRequest {
            amount: dec!(0),
            currency: Currency::EUR,
            method: PaymentMethod::BankTransfer,
            reference: None,
            notes: None,
            paid_at: None,
        };
        let errors = ApiError::from(payment.validate().unwrap_err());
        match errors {
            ApiError::Validation(messages) => assert_eq!(messages, vec!["amount: must be greater than zero"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rectification_kind_defaults_to_total() {
        let request: RectificationRequest = serde_json::from_str(r#"{"reason": "Wrong rate"}"#).unwrap();
        assert_eq!(request.kind, RectificationType::Total);
    }

    #[test]
    fn test_list_limit_is_bounded() {
        let params = ListInvoicesParams {
            limit: Some(500),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
