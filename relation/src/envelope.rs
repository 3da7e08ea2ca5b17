//! Structured response envelope for attachment endpoints.

use serde::{Deserialize, Serialize};

/// `{success, message, data}` as returned to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
    pub data: serde_json::Value,
}

impl Envelope {
    /// Successful envelope; `data` is serialized with serde.
    pub fn ok(message: impl Into<String>, data: &impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(error = %e, "envelope data did not serialize");
                serde_json::Value::Null
            }
        };
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn error(message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            success: false,
            message: message.into(),
            data,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "success": self.success,
            "message": self.message,
            "data": self.data,
        })
    }
}
