//! API configuration

use serde::Deserialize;

use core_kernel::Timezone;
use domain_invoicing::{FiscalRequirements, InvoicingSettings, ReminderRule, ReminderRules};

use crate::error::ApiError;

/// API configuration
///
/// Loaded from `API_`-prefixed environment variables; anything unset keeps
/// its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// IANA zone used to decide what "today" is
    pub timezone: String,
    /// Seconds between reminder sweeps; 0 disables the scheduler
    pub reminder_sweep_interval_secs: u64,
    pub require_legal_name: bool,
    pub require_tax_id: bool,
    pub require_address: bool,
    /// Rule table override, e.g. `before_3:-3,due_day:0,after_7:7`
    pub reminder_offsets: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/invoicing".to_string(),
            log_level: "info".to_string(),
            log_json: false,
            timezone: "UTC".to_string(),
            reminder_sweep_interval_secs: 3600,
            require_legal_name: true,
            require_tax_id: true,
            require_address: true,
            reminder_offsets: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Engine settings derived from this configuration
    pub fn invoicing_settings(&self) -> Result<InvoicingSettings, ApiError> {
        let timezone = Timezone::parse(&self.timezone)
            .map_err(|e| ApiError::Internal(format!("Invalid timezone '{}': {}", self.timezone, e)))?;

        let reminder_rules = match self.reminder_offsets.as_deref() {
            Some(table) if !table.trim().is_empty() => parse_reminder_rules(table)?,
            _ => ReminderRules::default(),
        };

        Ok(InvoicingSettings {
            timezone,
            fiscal: FiscalRequirements {
                legal_name: self.require_legal_name,
                tax_id: self.require_tax_id,
                address: self.require_address,
            },
            reminder_rules,
        })
    }
}

/// Parses `key:offset` pairs separated by commas
pub fn parse_reminder_rules(table: &str) -> Result<ReminderRules, ApiError> {
    let mut rules = Vec::new();
    for entry in table.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (key, offset) = entry
            .split_once(':')
            .ok_or_else(|| ApiError::Internal(format!("Reminder rule '{}' is not key:offset", entry)))?;
        let offset = offset
            .trim()
            .parse::<i64>()
            .map_err(|e| ApiError::Internal(format!("Reminder rule '{}' has a bad offset: {}", entry, e)))?;
        rules.push(ReminderRule::new(key.trim(), offset));
    }
    ReminderRules::new(rules).map_err(|e| ApiError::Internal(e.to_string()))
}
