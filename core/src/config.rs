//! Engine configuration.
//!
//! Every knob has a default embedded in the binary; a TOML document only
//! needs to name the keys it overrides.

use crate::error::{ConfigError, ConfigResult};
use serde::Deserialize;
use std::path::Path;

/// Default configuration embedded in the binary.
pub const DEFAULT_CONFIG: &str = r#"
[labels]
fallback_attributes = ["name", "title", "label", "display_name", "full_name", "description"]

[search]
fallback_attributes = ["name", "title", "label", "email", "description"]
attachable_per_page = 25
max_per_page = 100

[relations]
preview_limit = 25

[journal]
redacted_attributes = [
    "password",
    "password_confirmation",
    "remember_token",
    "api_token",
    "secret",
    "two_factor_secret",
    "two_factor_recovery_codes",
]
redaction_mask = "********"
"#;

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub labels: LabelConfig,
    pub search: SearchConfig,
    pub relations: RelationConfig,
    pub journal: JournalConfig,
}

/// Label resolution settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LabelConfig {
    /// Attribute names tried, in order, when nothing more specific yields a label.
    pub fallback_attributes: Vec<String>,
}

/// Attachable-listing search settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Searchable attributes used when neither the field nor the related resource declares any.
    pub fallback_attributes: Vec<String>,
    pub attachable_per_page: usize,
    pub max_per_page: usize,
}

/// Relation resolution settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct RelationConfig {
    /// Upper bound on items returned when resolving a to-many relation.
    pub preview_limit: usize,
}

/// Action journal settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct JournalConfig {
    /// Attributes whose values never reach an action event.
    pub redacted_attributes: Vec<String>,
    pub redaction_mask: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            fallback_attributes: strings(&[
                "name",
                "title",
                "label",
                "display_name",
                "full_name",
                "description",
            ]),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            fallback_attributes: strings(&["name", "title", "label", "email", "description"]),
            attachable_per_page: 25,
            max_per_page: 100,
        }
    }
}

impl Default for RelationConfig {
    fn default() -> Self {
        Self { preview_limit: 25 }
    }
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            redacted_attributes: strings(&[
                "password",
                "password_confirmation",
                "remember_token",
                "api_token",
                "secret",
                "two_factor_secret",
                "two_factor_recovery_codes",
            ]),
            redaction_mask: "********".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            labels: LabelConfig::default(),
            search: SearchConfig::default(),
            relations: RelationConfig::default(),
            journal: JournalConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::io(path.display(), e))?;
        Self::from_toml_str(&contents)
    }

    /// Clamp a requested page size to the configured bounds.
    pub fn per_page(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.search.attachable_per_page)
            .clamp(1, self.search.max_per_page.max(1))
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.search.max_per_page == 0 {
            return Err(ConfigError::invalid("search.max_per_page must be positive"));
        }
        if self.relations.preview_limit == 0 {
            return Err(ConfigError::invalid("relations.preview_limit must be positive"));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
