//! SMM panel v2 API client
//!
//! Every panel speaks the same protocol: a single endpoint, `POST` with a
//! form-urlencoded body carrying `key` and `action`. Failures come back as a
//! JSON object with an `error` field, usually with HTTP 200.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

use super::error::UpstreamError;
use super::types::{
    BatchOutcome, NewUpstreamOrder, OrderStatusReport, ProviderBalance, Service, StatusLookup,
    lenient,
};
use super::{MAX_BATCH_IDS, UpstreamGateway};
use crate::config::{IdListEncoding, ProviderConfig};

type Form = Vec<(String, String)>;

pub struct PanelClient {
    name: String,
    base_url: String,
    api_key: String,
    encoding: IdListEncoding,
    supports_refill: bool,
    http: reqwest::Client,
}

impl PanelClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, UpstreamError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: config.name.clone(),
            base_url: config.base_url.clone(),
            api_key: config.api_key().to_string(),
            encoding: config.id_list_encoding,
            supports_refill: config.supports_refill,
            http,
        })
    }

    fn form(&self, action: &str) -> Form {
        vec![
            ("key".to_string(), self.api_key.clone()),
            ("action".to_string(), action.to_string()),
        ]
    }

    fn require_refill(&self) -> Result<(), UpstreamError> {
        if self.supports_refill {
            Ok(())
        } else {
            Err(UpstreamError::Unsupported(format!(
                "provider '{}' does not support refills",
                self.name
            )))
        }
    }

    async fn call(&self, form: Form) -> Result<Value, UpstreamError> {
        let action = form
            .iter()
            .find(|(k, _)| k == "action")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        debug!(provider = %self.name, action = %action, "Upstream request");

        let response = self.http.post(&self.base_url).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| provider_error(&v))
                .unwrap_or_else(|| truncate(&body, 200));
            warn!(provider = %self.name, action = %action, status = status.as_u16(), "Upstream HTTP error");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| UpstreamError::Decode(format!("{}: {}", e, truncate(&body, 200))))?;

        if let Some(error) = provider_error(&value) {
            warn!(provider = %self.name, action = %action, error = %error, "Upstream rejected request");
            return Err(UpstreamError::Provider(error));
        }
        Ok(value)
    }
}

/// `error` field of a top-level object response
fn provider_error(value: &Value) -> Option<String> {
    match value.as_object()?.get("error")? {
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

/// Validate a batch before any network traffic
pub(crate) fn check_batch(ids: &[i64]) -> Result<(), UpstreamError> {
    if ids.is_empty() {
        return Err(UpstreamError::Validation("id list must not be empty".to_string()));
    }
    if ids.len() > MAX_BATCH_IDS {
        return Err(UpstreamError::Validation(format!(
            "at most {} ids per request, got {}",
            MAX_BATCH_IDS,
            ids.len()
        )));
    }
    Ok(())
}

/// Append an id list to the form in the provider's dialect
pub(crate) fn push_ids(form: &mut Form, field: &str, ids: &[i64], encoding: IdListEncoding) {
    match encoding {
        IdListEncoding::Comma => {
            let joined = ids
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(",");
            form.push((field.to_string(), joined));
        }
        IdListEncoding::Indexed => {
            for (i, id) in ids.iter().enumerate() {
                form.push((format!("{}[{}]", field, i), id.to_string()));
            }
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, UpstreamError> {
    serde_json::from_value(value).map_err(|e| UpstreamError::Decode(e.to_string()))
}

/// Service list; entries that fail to parse are skipped
pub(crate) fn parse_services(value: Value) -> Result<Vec<Service>, UpstreamError> {
    let Value::Array(items) = value else {
        return Err(UpstreamError::Decode("services: expected array".to_string()));
    };
    let mut services = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<Service>(item) {
            Ok(svc) => services.push(svc),
            Err(e) => warn!(error = %e, "Skipping malformed service entry"),
        }
    }
    Ok(services)
}

/// `{"<id>": {status...} | {"error": "..."}}`
pub(crate) fn parse_status_batch(
    value: Value,
    requested: &[i64],
) -> Result<BTreeMap<i64, StatusLookup>, UpstreamError> {
    let Value::Object(map) = value else {
        return Err(UpstreamError::Decode("status: expected object".to_string()));
    };
    let mut out = BTreeMap::new();
    for (key, entry) in map {
        let Ok(id) = key.trim().parse::<i64>() else {
            warn!(key = %key, "Ignoring non-numeric key in status batch");
            continue;
        };
        let lookup = match provider_error(&entry) {
            Some(error) => StatusLookup::Error { error },
            None => match serde_json::from_value::<OrderStatusReport>(entry) {
                Ok(report) => StatusLookup::Found(report),
                Err(e) => StatusLookup::Error {
                    error: format!("malformed status: {}", e),
                },
            },
        };
        out.insert(id, lookup);
    }
    for id in requested {
        out.entry(*id).or_insert_with(|| StatusLookup::Error {
            error: "missing from provider response".to_string(),
        });
    }
    Ok(out)
}

/// `[{"<id_field>": 1, "<value_field>": 1 | "x" | {"error": "..."}}]`
pub(crate) fn parse_batch_outcomes(
    value: Value,
    id_field: &str,
    value_field: &str,
) -> Result<Vec<BatchOutcome>, UpstreamError> {
    let Value::Array(items) = value else {
        return Err(UpstreamError::Decode(format!(
            "{}: expected array",
            value_field
        )));
    };
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        let Some(id) = item.get(id_field).and_then(lenient::value_to_i64) else {
            return Err(UpstreamError::Decode(format!(
                "{}: entry without {}",
                value_field, id_field
            )));
        };
        let outcome = match item.get(value_field) {
            Some(v) => match provider_error(v) {
                Some(error) => BatchOutcome {
                    id,
                    value: None,
                    error: Some(error),
                },
                None => BatchOutcome {
                    id,
                    value: Some(scalar_string(v)),
                    error: None,
                },
            },
            None => BatchOutcome {
                id,
                value: None,
                error: Some(format!("missing {}", value_field)),
            },
        };
        out.push(outcome);
    }
    Ok(out)
}

fn scalar_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn field_i64(value: &Value, field: &str) -> Result<i64, UpstreamError> {
    value
        .get(field)
        .and_then(lenient::value_to_i64)
        .ok_or_else(|| UpstreamError::Decode(format!("missing or invalid '{}'", field)))
}

#[async_trait]
impl UpstreamGateway for PanelClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_services(&self) -> Result<Vec<Service>, UpstreamError> {
        let value = self.call(self.form("services")).await?;
        parse_services(value)
    }

    async fn get_balance(&self) -> Result<ProviderBalance, UpstreamError> {
        let value = self.call(self.form("balance")).await?;
        decode(value)
    }

    async fn create_order(&self, order: &NewUpstreamOrder) -> Result<i64, UpstreamError> {
        let mut form = self.form("add");
        form.push(("service".to_string(), order.service.to_string()));
        form.push(("link".to_string(), order.link.clone()));
        form.push(("quantity".to_string(), order.quantity.to_string()));
        if let Some(runs) = order.runs {
            form.push(("runs".to_string(), runs.to_string()));
        }
        if let Some(interval) = order.interval {
            form.push(("interval".to_string(), interval.to_string()));
        }
        let value = self.call(form).await?;
        field_i64(&value, "order")
    }

    async fn get_order_status(&self, order_id: i64) -> Result<OrderStatusReport, UpstreamError> {
        let mut form = self.form("status");
        form.push(("order".to_string(), order_id.to_string()));
        let value = self.call(form).await?;
        decode(value)
    }

    async fn get_multiple_order_statuses(
        &self,
        order_ids: &[i64],
    ) -> Result<BTreeMap<i64, StatusLookup>, UpstreamError> {
        check_batch(order_ids)?;
        let mut form = self.form("status");
        push_ids(&mut form, "orders", order_ids, self.encoding);
        let value = self.call(form).await?;
        parse_status_batch(value, order_ids)
    }

    async fn cancel_orders(&self, order_ids: &[i64]) -> Result<Vec<BatchOutcome>, UpstreamError> {
        check_batch(order_ids)?;
        let mut form = self.form("cancel");
        push_ids(&mut form, "orders", order_ids, self.encoding);
        let value = self.call(form).await?;
        parse_batch_outcomes(value, "order", "cancel")
    }

    async fn create_refill(&self, order_id: i64) -> Result<i64, UpstreamError> {
        self.require_refill()?;
        let mut form = self.form("refill");
        form.push(("order".to_string(), order_id.to_string()));
        let value = self.call(form).await?;
        field_i64(&value, "refill")
    }

    async fn create_refills(&self, order_ids: &[i64]) -> Result<Vec<BatchOutcome>, UpstreamError> {
        self.require_refill()?;
        check_batch(order_ids)?;
        let mut form = self.form("refill");
        push_ids(&mut form, "orders", order_ids, self.encoding);
        let value = self.call(form).await?;
        parse_batch_outcomes(value, "order", "refill")
    }

    async fn get_refill_status(&self, refill_id: i64) -> Result<String, UpstreamError> {
        self.require_refill()?;
        let mut form = self.form("refill_status");
        form.push(("refill".to_string(), refill_id.to_string()));
        let value = self.call(form).await?;
        value
            .get("status")
            .map(scalar_string)
            .ok_or_else(|| UpstreamError::Decode("missing 'status'".to_string()))
    }

    async fn get_refill_statuses(
        &self,
        refill_ids: &[i64],
    ) -> Result<Vec<BatchOutcome>, UpstreamError> {
        self.require_refill()?;
        check_batch(refill_ids)?;
        let mut form = self.form("refill_status");
        push_ids(&mut form, "refills", refill_ids, self.encoding);
        let value = self.call(form).await?;
        parse_batch_outcomes(value, "refill", "status")
    }
}
