//! Fluent checks over attachment envelopes.

use keel_relation::Envelope;
use serde_json::Value as Json;

use crate::error::{ScenarioError, ScenarioResult};

/// Expected shape of an [`Envelope`].
///
/// ```ignore
/// EnvelopeAssertion::new()
///     .failure()
///     .message_contains("more than 3")
///     .data("attempted", 4)
///     .verify("attach", &envelope)?;
/// ```
#[derive(Debug, Default)]
pub struct EnvelopeAssertion {
    success: Option<bool>,
    message: Option<String>,
    message_contains: Vec<String>,
    data: Vec<(String, Json)>,
    data_present: Vec<String>,
    data_null: bool,
}

impl EnvelopeAssertion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(mut self) -> Self {
        self.success = Some(true);
        self
    }

    pub fn failure(mut self) -> Self {
        self.success = Some(false);
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn message_contains(mut self, fragment: impl Into<String>) -> Self {
        self.message_contains.push(fragment.into());
        self
    }

    /// `data[key]` equals `value`. Keys may be dotted paths (`"0.label"`).
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Json>) -> Self {
        self.data.push((key.into(), value.into()));
        self
    }

    /// `data[key]` exists, whatever its value.
    pub fn has_data(mut self, key: impl Into<String>) -> Self {
        self.data_present.push(key.into());
        self
    }

    pub fn no_data(mut self) -> Self {
        self.data_null = true;
        self
    }

    /// Check `envelope`, naming `step` in any failure.
    pub fn verify(&self, step: &str, envelope: &Envelope) -> ScenarioResult<()> {
        let fail = |message: String| Err(ScenarioError::assertion_failed(step, message));

        if let Some(expected) = self.success {
            if envelope.success != expected {
                return fail(format!(
                    "expected success={}, got {} ({})",
                    expected, envelope.success, envelope.message
                ));
            }
        }

        if let Some(ref expected) = self.message {
            if &envelope.message != expected {
                return fail(format!("expected message '{}', got '{}'", expected, envelope.message));
            }
        }

        for fragment in &self.message_contains {
            if !envelope.message.contains(fragment.as_str()) {
                return fail(format!(
                    "expected message containing '{}', got '{}'",
                    fragment, envelope.message
                ));
            }
        }

        for (key, expected) in &self.data {
            match lookup(&envelope.data, key) {
                Some(actual) if actual == expected => {}
                Some(actual) => {
                    return fail(format!("data '{}': expected {}, got {}", key, expected, actual))
                }
                None => return fail(format!("data '{}' missing in {}", key, envelope.data)),
            }
        }

        for key in &self.data_present {
            if lookup(&envelope.data, key).is_none() {
                return fail(format!("data '{}' missing in {}", key, envelope.data));
            }
        }

        if self.data_null && !envelope.data.is_null() {
            return fail(format!("expected no data, got {}", envelope.data));
        }

        Ok(())
    }
}

fn lookup<'j>(data: &'j Json, path: &str) -> Option<&'j Json> {
    path.split('.').try_fold(data, |node, segment| match node {
        Json::Object(map) => map.get(segment),
        Json::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dotted_paths_reach_nested_data() {
        let envelope = Envelope::error(
            "Cannot attach more than 3 related records.",
            json!({ "current": 0, "limit": 3, "attempted": 4, "items": [{ "label": "rust" }] }),
        );

        let result = EnvelopeAssertion::new()
            .failure()
            .message_contains("more than 3")
            .data("attempted", 4)
            .data("items.0.label", "rust")
            .verify("attach", &envelope);

        assert!(result.is_ok());
    }

    #[test]
    fn test_mismatch_names_step() {
        let envelope = Envelope::error("nope", Json::Null);

        let err = EnvelopeAssertion::new().success().verify("sync", &envelope).unwrap_err();

        assert!(err.to_string().contains("'sync'"));
    }
}
