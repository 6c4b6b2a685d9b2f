//! Match options for a flatten/expand call.
//!
//! Options can be built in code or loaded from YAML:
//!
//! ```yaml
//! field_name_prefix: Cluster
//! additional_ignored_field_names:
//!   - Arn
//! include_all_fields: false
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Field names skipped by default (provider tagging metadata).
pub const DEFAULT_IGNORED_FIELD_NAMES: &[&str] = &["Tags", "TagsAll"];

/// Error type for loading options.
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// Error reading options file
    #[error("Failed to read options file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Options controlling field correspondence for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Replaces the built-in ignore list when set
    pub ignored_field_names: Option<Vec<String>>,

    /// Appended to the ignore list
    pub additional_ignored_field_names: Vec<String>,

    /// Prefix trimmed from field names during fuzzy matching
    pub field_name_prefix: Option<String>,

    /// Suffix trimmed from field names during fuzzy matching
    pub field_name_suffix: Option<String>,

    /// Disable the base ignore list for this call
    pub include_all_fields: bool,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load options from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, OptionsError> {
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse options from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, OptionsError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Replace the built-in ignore list.
    pub fn with_ignored_field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_field_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Add names to the ignore list.
    pub fn with_additional_ignored_field_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.additional_ignored_field_names
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_field_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.field_name_prefix = Some(prefix.into());
        self
    }

    pub fn with_field_name_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.field_name_suffix = Some(suffix.into());
        self
    }

    pub fn with_include_all_fields(mut self) -> Self {
        self.include_all_fields = true;
        self
    }

    /// The effective ignore list for a call.
    pub fn ignored_field_names(&self) -> Vec<String> {
        let base: Vec<String> = if self.include_all_fields {
            Vec::new()
        } else {
            match &self.ignored_field_names {
                Some(names) => names.clone(),
                None => DEFAULT_IGNORED_FIELD_NAMES
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }
        };
        let mut names = base;
        for name in &self.additional_ignored_field_names {
            if !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}
