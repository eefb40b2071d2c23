use std::str::FromStr;

use fractic_server_error::ServerError;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{domain::logic::normalizer::parse_amount, errors::InvalidAmount};

/// Positive monetary amount, in Brazilian ("1.234,56") or plain notation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct AmountModel(pub Decimal);
impl FromStr for AmountModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_amount(s)
            .map(AmountModel)
            .ok_or_else(|| InvalidAmount::new(s))
    }
}
impl<'de> Deserialize<'de> for AmountModel {
    fn deserialize<D>(deserializer: D) -> Result<AmountModel, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // JSON numbers are never in Brazilian notation.
        match Value::deserialize(deserializer)? {
            Value::Number(n) => Decimal::from_str(&n.to_string())
                .ok()
                .filter(|d| d.is_sign_positive() && !d.is_zero())
                .map(AmountModel)
                .ok_or_else(|| serde::de::Error::custom(InvalidAmount::new(&n.to_string()))),
            Value::String(s) => AmountModel::from_str(&s).map_err(serde::de::Error::custom),
            other => Err(serde::de::Error::custom(InvalidAmount::new(&other.to_string()))),
        }
    }
}

impl From<AmountModel> for Decimal {
    fn from(model: AmountModel) -> Self {
        model.0
    }
}
