//! Structured-value codec seam.
//!
//! Struct-typed properties cross the wire as text. The codec itself is an
//! external capability; this module only defines the seam and ships a JSON
//! implementation as the default.

use crate::error::{DriverError, DriverResult};
use serde_json::Value as JsonValue;

/// Encode/decode capability for structured property values.
pub trait Encoder: Send + Sync {
    fn encode(&self, value: &JsonValue) -> DriverResult<String>;
    fn decode(&self, text: &str) -> DriverResult<JsonValue>;
}

/// JSON text codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoder;

impl Encoder for JsonEncoder {
    fn encode(&self, value: &JsonValue) -> DriverResult<String> {
        serde_json::to_string(value)
            .map_err(|e| DriverError::query(format!("cannot encode structured value: {e}")))
    }

    fn decode(&self, text: &str) -> DriverResult<JsonValue> {
        serde_json::from_str(text)
            .map_err(|e| DriverError::query(format!("cannot decode structured value: {e}")))
    }
}
