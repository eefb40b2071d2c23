use std::str::FromStr;

use fractic_server_error::ServerError;
use serde::Deserializer;
use serde_derive::Deserialize;
use serde_json::Value;

use crate::{
    entities::{Interpretation, InterpretedFields},
    errors::InvalidInterpretationOutput,
};

use super::amount_model::AmountModel;

/// Raw answer of the interpretation service. Parsing is lenient: a value
/// that cannot be read is dropped instead of failing the whole answer.
#[derive(Debug, Deserialize)]
pub(crate) struct InterpretationModel {
    #[serde(default)]
    fields: FieldsModel,
    #[serde(default, deserialize_with = "lenient_confidence")]
    confidence: f64,
    #[serde(default, alias = "not_expense", alias = "notExpense")]
    rejected: bool,
}

#[derive(Debug, Default, Deserialize)]
struct FieldsModel {
    #[serde(default, deserialize_with = "lenient_amount")]
    amount: Option<AmountModel>,
    #[serde(default, deserialize_with = "lenient_text")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    category: Option<String>,
    #[serde(default, alias = "paymentMethod", deserialize_with = "lenient_text")]
    payment_method: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    responsible: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    card: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    installments: Option<u32>,
}

impl FromStr for InterpretationModel {
    type Err = ServerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Models tend to wrap the object in prose or code fences.
        let (Some(start), Some(end)) = (s.find('{'), s.rfind('}')) else {
            return Err(InvalidInterpretationOutput::with_debug(&s.to_string()));
        };
        if end < start {
            return Err(InvalidInterpretationOutput::with_debug(&s.to_string()));
        }
        serde_json::from_str(&s[start..=end])
            .map_err(|e| InvalidInterpretationOutput::with_debug(&e))
    }
}

impl From<InterpretationModel> for Interpretation {
    fn from(model: InterpretationModel) -> Self {
        let f = model.fields;
        Interpretation {
            fields: InterpretedFields {
                amount: f.amount.map(Into::into),
                description: f.description,
                category: f.category,
                payment_method: f.payment_method,
                responsible: f.responsible,
                card: f.card,
                installments: f.installments,
            },
            confidence: model.confidence,
            rejected: model.rejected,
        }
    }
}

// Lenient field readers.
// ---

fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<AmountModel>, D::Error> {
    let value = <Value as serde::Deserialize>::deserialize(d)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match <Value as serde::Deserialize>::deserialize(d)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("null")).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u32>, D::Error> {
    Ok(match <Value as serde::Deserialize>::deserialize(d)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s
            .trim()
            .trim_end_matches(['x', 'X'])
            .trim()
            .parse()
            .ok(),
        _ => None,
    })
    .filter(|n| *n > 0)
}

fn lenient_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let confidence = match <Value as serde::Deserialize>::deserialize(d)? {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    })
}
