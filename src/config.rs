use chrono::{DateTime, FixedOffset, NaiveDate, Offset as _, Utc};
use fractic_server_error::ServerError;
use iso_currency::Currency;
use serde_derive::Deserialize;

use crate::errors::{InvalidCurrencyCode, InvalidRon};

/// Organization-level knobs of the capture engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ExpenseCaptureConfig {
    /// Number of turns kept as interpretation context.
    pub history_limit: usize,
    /// Below this interpretation confidence, an uninferred category is asked
    /// for explicitly instead of falling back at write time.
    pub low_confidence_threshold: f64,
    /// Category used when nothing else matches (only if it exists in the
    /// organization's list).
    pub default_category_name: Option<String>,
    pub utc_offset_minutes: i32,
    /// ISO 4217 code used when rendering amounts.
    pub currency: String,
    pub max_installments: u32,
    /// Appended after the built-in category keyword table.
    pub extra_category_keywords: Vec<KeywordRule>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub category: String,
}

impl Default for ExpenseCaptureConfig {
    fn default() -> Self {
        Self {
            history_limit: 10,
            low_confidence_threshold: 0.6,
            default_category_name: Some("Outros".to_string()),
            utc_offset_minutes: -180,
            currency: "BRL".to_string(),
            max_installments: 24,
            extra_category_keywords: Vec::new(),
        }
    }
}

impl ExpenseCaptureConfig {
    pub fn from_ron(s: &str) -> Result<Self, ServerError> {
        let config: Self =
            ron::from_str(s).map_err(|e| InvalidRon::with_debug("ExpenseCaptureConfig", &e))?;
        config.currency()?;
        Ok(config)
    }

    pub fn currency(&self) -> Result<Currency, ServerError> {
        Currency::from_code(&self.currency).ok_or_else(|| InvalidCurrencyCode::new(&self.currency))
    }

    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).unwrap_or_else(|| Utc.fix())
    }

    /// Calendar day of `at` in the organization's local time.
    pub fn local_date(&self, at: DateTime<Utc>) -> NaiveDate {
        at.with_timezone(&self.utc_offset()).date_naive()
    }
}
