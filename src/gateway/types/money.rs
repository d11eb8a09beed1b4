//! Money types for the API boundary
//!
//! - `StrictDecimal`: format-validated amount accepted from clients
//! - `DisplayAmount`: rounded amount rendered in responses

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Client-supplied amount, accepted only as a plain positive decimal string
///
/// Rejects `.5`, `5.`, `+5`, scientific notation, JSON numbers, zero and
/// negative values.
#[derive(Debug, Clone, Copy, ToSchema)]
#[schema(value_type = String, example = "25.00")]
pub struct StrictDecimal(Decimal);

impl StrictDecimal {
    pub fn inner(self) -> Decimal {
        self.0
    }
}

impl std::ops::Deref for StrictDecimal {
    type Target = Decimal;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StrictDecimal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let s = String::deserialize(deserializer)?;

        if s.is_empty() {
            return Err(D::Error::custom("Amount cannot be empty"));
        }
        if s.starts_with('.') {
            return Err(D::Error::custom("Invalid format: use 0.5 not .5"));
        }
        if s.ends_with('.') {
            return Err(D::Error::custom("Invalid format: use 5.0 not 5."));
        }
        if s.contains('e') || s.contains('E') {
            return Err(D::Error::custom(
                "Invalid format: scientific notation not allowed",
            ));
        }
        if s.starts_with('+') {
            return Err(D::Error::custom("Invalid format: + prefix not allowed"));
        }

        let d = Decimal::from_str(&s)
            .map_err(|e| D::Error::custom(format!("Invalid decimal: {}", e)))?;

        if d.is_sign_negative() {
            return Err(D::Error::custom("Amount cannot be negative"));
        }
        if d.is_zero() {
            return Err(D::Error::custom("Amount must be greater than zero"));
        }

        Ok(StrictDecimal(d))
    }
}

impl Serialize for StrictDecimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0.to_string())
    }
}

/// Rounded amount for API responses, always serialized as a string
///
/// Built only through `pricing::display_amount`.
#[derive(Debug, Clone, PartialEq, Eq, ToSchema)]
#[schema(value_type = String, example = "1.37")]
pub struct DisplayAmount(String);

impl DisplayAmount {
    pub(crate) fn new(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for DisplayAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<StrictDecimal, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_strict_decimal_valid_string() {
        let d = parse(r#""12.50""#).unwrap();
        assert_eq!(*d, Decimal::from_str("12.5").unwrap());
    }

    #[test]
    fn test_strict_decimal_rejects_json_number() {
        let err = parse("1.5").unwrap_err();
        assert!(err.to_string().contains("expected a string"));
    }

    #[test]
    fn test_strict_decimal_rejects_bad_formats() {
        assert!(parse(r#"".5""#).unwrap_err().to_string().contains("use 0.5 not .5"));
        assert!(parse(r#""5.""#).unwrap_err().to_string().contains("use 5.0 not 5."));
        assert!(
            parse(r#""1e3""#)
                .unwrap_err()
                .to_string()
                .contains("scientific notation")
        );
        assert!(parse(r#""+5""#).unwrap_err().to_string().contains("+ prefix"));
        assert!(parse(r#""""#).unwrap_err().to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_strict_decimal_rejects_non_positive() {
        assert!(parse(r#""-1.5""#).unwrap_err().to_string().contains("cannot be negative"));
        assert!(parse(r#""0.00""#).unwrap_err().to_string().contains("greater than zero"));
    }

    #[test]
    fn test_display_amount_serializes_as_string() {
        let amount = DisplayAmount::new("123.45".to_string());
        assert_eq!(serde_json::to_string(&amount).unwrap(), r#""123.45""#);
    }
}
