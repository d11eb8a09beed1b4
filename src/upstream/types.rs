//! Upstream provider wire types
//!
//! SMM panels are loose about JSON types: `rate`, `min`, `max`,
//! `start_count` and `remains` arrive as strings on some panels and as
//! numbers on others. The `lenient` helpers accept both.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Service offered by an upstream provider (never persisted locally)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Service {
    #[serde(rename = "service", deserialize_with = "lenient::int")]
    pub id: i64,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    /// Provider price per 1000 units
    #[serde(deserialize_with = "lenient::decimal")]
    #[schema(value_type = String, example = "0.90")]
    pub rate: Decimal,
    #[serde(deserialize_with = "lenient::int")]
    pub min: i64,
    #[serde(deserialize_with = "lenient::int")]
    pub max: i64,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub refill: bool,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub cancel: bool,
}

/// Provider account balance (admin visibility only)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderBalance {
    #[serde(deserialize_with = "lenient::decimal")]
    #[schema(value_type = String)]
    pub balance: Decimal,
    #[serde(default)]
    pub currency: String,
}

/// Parameters for the upstream `add` action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUpstreamOrder {
    pub service: i64,
    pub link: String,
    pub quantity: i64,
    pub runs: Option<i64>,
    pub interval: Option<i64>,
}

/// Provider-reported fulfilment status
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProviderStatus {
    Pending,
    InProgress,
    Processing,
    Partial,
    Completed,
    Canceled,
    Other(String),
}

impl ProviderStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ProviderStatus::Pending => "Pending",
            ProviderStatus::InProgress => "In progress",
            ProviderStatus::Processing => "Processing",
            ProviderStatus::Partial => "Partial",
            ProviderStatus::Completed => "Completed",
            ProviderStatus::Canceled => "Canceled",
            ProviderStatus::Other(s) => s,
        }
    }
}

impl From<&str> for ProviderStatus {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => ProviderStatus::Pending,
            "in progress" | "in_progress" | "inprogress" => ProviderStatus::InProgress,
            "processing" => ProviderStatus::Processing,
            "partial" => ProviderStatus::Partial,
            "completed" => ProviderStatus::Completed,
            "canceled" | "cancelled" => ProviderStatus::Canceled,
            _ => ProviderStatus::Other(s.to_string()),
        }
    }
}

impl From<String> for ProviderStatus {
    fn from(s: String) -> Self {
        ProviderStatus::from(s.as_str())
    }
}

impl From<ProviderStatus> for String {
    fn from(s: ProviderStatus) -> Self {
        s.as_str().to_string()
    }
}

impl std::fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Answer to the upstream `status` action for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OrderStatusReport {
    #[schema(value_type = String, example = "In progress")]
    pub status: ProviderStatus,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub remains: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_int")]
    pub start_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient::opt_decimal")]
    #[schema(value_type = Option<String>)]
    pub charge: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// One entry of a batch status lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusLookup {
    Found(OrderStatusReport),
    Error { error: String },
}

/// Per-id result of a batch cancel / refill / refill-status call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BatchOutcome {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

pub(crate) mod lenient {
    use rust_decimal::Decimal;
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use std::str::FromStr;

    pub fn value_to_i64(v: &Value) -> Option<i64> {
        match v {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => {
                let t = s.trim();
                t.parse::<i64>().ok().or_else(|| {
                    Decimal::from_str(t)
                        .ok()
                        .filter(|d| d.fract().is_zero())
                        .and_then(|d| i64::try_from(d).ok())
                })
            }
            _ => None,
        }
    }

    pub fn value_to_decimal(v: &Value) -> Option<Decimal> {
        match v {
            Value::Number(n) => {
                let s = n.to_string();
                Decimal::from_str(&s)
                    .or_else(|_| Decimal::from_scientific(&s))
                    .ok()
            }
            Value::String(s) => Decimal::from_str(s.trim()).ok(),
            _ => None,
        }
    }

    pub fn int<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
        let v = Value::deserialize(d)?;
        value_to_i64(&v).ok_or_else(|| D::Error::custom(format!("expected integer, got {}", v)))
    }

    pub fn opt_int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        let v = Value::deserialize(d)?;
        match v {
            Value::Null => Ok(None),
            Value::String(ref s) if s.trim().is_empty() => Ok(None),
            other => value_to_i64(&other)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected integer, got {}", other))),
        }
    }

    pub fn decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Decimal, D::Error> {
        let v = Value::deserialize(d)?;
        value_to_decimal(&v).ok_or_else(|| D::Error::custom(format!("expected decimal, got {}", v)))
    }

    pub fn opt_decimal<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        let v = Value::deserialize(d)?;
        match v {
            Value::Null => Ok(None),
            Value::String(ref s) if s.trim().is_empty() => Ok(None),
            other => value_to_decimal(&other)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected decimal, got {}", other))),
        }
    }

    /// Booleans, 0/1, and "true"/"false"/"1"/"0"
    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        let v = Value::deserialize(d)?;
        Ok(match v {
            Value::Bool(b) => b,
            Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
            Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "1"),
            _ => false,
        })
    }
}
