//! # Event Model and Normalizer
//!
//! A webhook event is a typed envelope (`id`, `type`, `created`) around an
//! opaque `data` payload. The envelope is validated once, when the event
//! enters the process; the payload stays a [`serde_json::Value`] and is read
//! by path.
//!
//! ```json
//! {
//!   "id": "evt_1NG8Du2eZvKYlo2CUI79vXWy",
//!   "type": "charge.succeeded",
//!   "created": 1686089970,
//!   "data": { "object": { "amount": 2000, "metadata": { "order_id": "6735" } } },
//!   "livemode": false
//! }
//! ```
//!
//! Fields outside the envelope (`livemode`, `api_version`, ...) are kept
//! verbatim so subscribers receive the full object.

use crate::error::{malformed, WebhookError, WebhookResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Type of the connectivity check the platform sends when an endpoint is
/// registered. Cached and counted, but never shown on the live feed.
pub const PING_EVENT_TYPE: &str = "ping";

/// An immutable webhook event.
///
/// Deserializing an `Event` runs the same validation as [`Event::from_value`],
/// so a value of this type always has a non-empty `id` and `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
pub struct Event {
    /// Unique event identifier.
    pub id: String,

    /// Dot/underscore-delimited type, e.g. `charge.dispute.funds_reinstated`.
    #[serde(rename = "type")]
    pub event_type: String,

    /// Creation time, seconds since epoch.
    pub created: i64,

    /// Opaque payload, usually `{ "object": { ... } }`.
    pub data: Value,

    /// Remaining top-level fields, passed through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Event {
    /// Decodes a raw request body into an event.
    pub fn from_slice(body: &[u8]) -> WebhookResult<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| malformed(format!("body is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    /// Validates an already-parsed JSON value as an event envelope.
    ///
    /// Fails with [`WebhookError::MalformedPayload`] when `id`, `type`,
    /// `created` or `data` is absent or has the wrong shape.
    pub fn from_value(value: Value) -> WebhookResult<Self> {
        let Value::Object(mut fields) = value else {
            return Err(malformed("payload must be a JSON object"));
        };

        let id = take_non_empty_string(&mut fields, "id")?;
        let event_type = take_non_empty_string(&mut fields, "type")?;

        let created = match fields.remove("created") {
            Some(Value::Number(n)) => n
                .as_i64()
                .ok_or_else(|| malformed("`created` must be an integer timestamp"))?,
            Some(_) => return Err(malformed("`created` must be an integer timestamp")),
            None => return Err(malformed("missing `created`")),
        };

        let data = match fields.remove("data") {
            Some(data @ Value::Object(_)) => data,
            Some(_) => return Err(malformed("`data` must be an object")),
            None => return Err(malformed("missing `data`")),
        };

        Ok(Self {
            id,
            event_type,
            created,
            data,
            extra: fields,
        })
    }

    /// Returns true for the platform's connectivity check events.
    pub fn is_ping(&self) -> bool {
        self.event_type == PING_EVENT_TYPE
    }

    /// Looks up a nested value in `data`, e.g. `["object", "amount"]`.
    pub fn data_path(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.data, |value, key| value.get(*key))
    }

    /// The domain object the event is about (`data.object`), if present.
    pub fn object(&self) -> Option<&Map<String, Value>> {
        self.data_path(&["object"]).and_then(Value::as_object)
    }

    /// String-valued entries of `data.object.metadata`.
    ///
    /// Non-string values are skipped; a missing mapping yields an empty map.
    pub fn metadata(&self) -> BTreeMap<String, String> {
        self.data_path(&["object", "metadata"])
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl TryFrom<Value> for Event {
    type Error = WebhookError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

fn take_non_empty_string(fields: &mut Map<String, Value>, key: &str) -> WebhookResult<String> {
    match fields.remove(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(Value::String(_)) => Err(malformed(format!("`{key}` must not be empty"))),
        Some(_) => Err(malformed(format!("`{key}` must be a string"))),
        None => Err(malformed(format!("missing `{key}`"))),
    }
}
