//! Resolved configuration with provenance
//!
//! A serializable record of one resolution: which scopes applied, where each
//! value came from, and which Appfile (by path and digest) was read. Secret
//! looking values are redacted in the record; [`ConfigResolver::resolve`]
//! always returns them unredacted.
//!
//! [`ConfigResolver::resolve`]: super::ConfigResolver::resolve

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::merge::{Layer, Merged};
use super::selection::Selection;
use crate::appfile::{AppfileSource, Scope};
use crate::keys;

/// Schema version for resolved_config.json
pub const SCHEMA_VERSION: u32 = 1;

/// Schema identifier
pub const SCHEMA_ID: &str = "appfile/resolved_config@1";

/// Keys that contain secrets and should be redacted
const SECRET_KEYS: &[&str] = &[
    "password",
    "token",
    "secret",
    "private_key",
    "api_key",
    "json_key_data",
];

/// Where a resolved value was declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueOrigin {
    /// Scope whose declaration won
    pub scope: Scope,

    /// Whether the declaration was deferred
    pub deferred: bool,
}

/// Resolved configuration with full provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedConfig {
    /// Schema version
    pub schema_version: u32,

    /// Schema identifier
    pub schema_id: String,

    /// When this record was computed
    pub created_at: DateTime<Utc>,

    /// Active lane, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,

    /// Active platform, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// Appfile the tree was loaded from (None for programmatic trees)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<AppfileSource>,

    /// Applied scopes in precedence order
    pub layers: Vec<Scope>,

    /// Resolved values
    pub values: BTreeMap<String, String>,

    /// Origin of each value
    pub origins: BTreeMap<String, ValueOrigin>,

    /// Redacted keys
    pub redactions: Vec<String>,

    /// Resolved settings that are not well-known names (helper values or typos)
    pub custom_keys: Vec<String>,
}

impl ResolvedConfig {
    pub(crate) fn build(
        selection: &Selection,
        source: Option<&AppfileSource>,
        layers: &[Layer<'_>],
        merged: &Merged<'_>,
        mut values: BTreeMap<String, String>,
    ) -> Self {
        let origins = merged
            .iter()
            .map(|(name, entry)| {
                (
                    name.to_string(),
                    ValueOrigin {
                        scope: entry.scope.clone(),
                        deferred: entry.value.is_deferred(),
                    },
                )
            })
            .collect();

        let custom_keys = values
            .keys()
            .filter(|key| !keys::is_known(key))
            .cloned()
            .collect();
        let redactions = redact_secrets(&mut values);

        Self {
            schema_version: SCHEMA_VERSION,
            schema_id: SCHEMA_ID.to_string(),
            created_at: Utc::now(),
            lane: selection.lane().map(str::to_string),
            platform: selection.platform().map(str::to_string),
            source: source.cloned(),
            layers: layers.iter().map(|l| l.scope.clone()).collect(),
            values,
            origins,
            redactions,
            custom_keys,
        }
    }

    /// Get a resolved (possibly redacted) value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Scope a value came from
    pub fn origin(&self, key: &str) -> Option<&Scope> {
        self.origins.get(key).map(|o| &o.scope)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}

/// Redact secrets in place, returning the redacted keys
fn redact_secrets(values: &mut BTreeMap<String, String>) -> Vec<String> {
    let mut redactions = Vec::new();
    for (key, value) in values.iter_mut() {
        let key_lower = key.to_lowercase();
        if SECRET_KEYS.iter().any(|s| key_lower.contains(s)) {
            *value = "[REDACTED]".to_string();
            redactions.push(key.clone());
        }
    }
    redactions
}
