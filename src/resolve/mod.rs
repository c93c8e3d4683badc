//! Settings resolution
//!
//! [`ConfigResolver`] owns an immutable [`ConfigTree`] and answers queries
//! for a lane/platform [`Selection`]:
//! 1. Default scope
//! 2. Platform scope
//! 3. Lane scope (platform-qualified, else unqualified)
//! 4. Deferred values evaluated on the merged result

mod effective;
mod lookup;
mod merge;
mod selection;

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::appfile::{find_appfile, load_appfile, AppfileSource, ConfigTree};
use crate::error::{Error, LoadError, ResolveError};

pub use effective::{ResolvedConfig, ValueOrigin, SCHEMA_ID, SCHEMA_VERSION};
pub use lookup::Lookup;
pub use merge::{merge_layers, overlay, select_layers, Layer, Merged, MergedEntry};
pub use selection::{Selection, LANE_ENV, PLATFORM_ENV};

/// Resolves the effective settings of one Appfile
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    tree: ConfigTree,
    source: Option<AppfileSource>,
}

impl ConfigResolver {
    /// Read and evaluate the Appfile at `path`
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let (tree, source) = load_appfile(path.as_ref())?;
        debug!(path = %source.path, digest = %source.digest, "loaded Appfile");
        Ok(Self {
            tree,
            source: Some(source),
        })
    }

    /// Load the first Appfile found under `dir`
    pub fn load_default(dir: impl AsRef<Path>) -> Result<Self, LoadError> {
        let dir = dir.as_ref();
        match find_appfile(dir) {
            Some(path) => Self::load(path),
            None => Err(LoadError::NotFound(dir.to_path_buf())),
        }
    }

    pub fn from_tree(tree: ConfigTree) -> Self {
        Self { tree, source: None }
    }

    pub fn tree(&self) -> &ConfigTree {
        &self.tree
    }

    pub fn source(&self) -> Option<&AppfileSource> {
        self.source.as_ref()
    }

    /// Resolve for the lane/platform currently set in the environment
    pub fn data(&self) -> Result<BTreeMap<String, String>, ResolveError> {
        self.resolve(&Selection::from_env())
    }

    /// Resolve for an explicit selection
    pub fn resolve(&self, selection: &Selection) -> Result<BTreeMap<String, String>, ResolveError> {
        let layers = select_layers(&self.tree, selection);
        let merged = merge_layers(&layers);
        Lookup::new(&merged).finish()
    }

    /// Resolve and keep provenance
    pub fn report(&self, selection: &Selection) -> Result<ResolvedConfig, ResolveError> {
        let layers = select_layers(&self.tree, selection);
        let merged = merge_layers(&layers);
        let values = Lookup::new(&merged).finish()?;
        Ok(ResolvedConfig::build(
            selection,
            self.source.as_ref(),
            &layers,
            &merged,
            values,
        ))
    }

    /// Single value for an explicit selection
    pub fn value(&self, selection: &Selection, key: &str) -> Result<Option<String>, ResolveError> {
        Ok(self.resolve(selection)?.remove(key))
    }
}

/// Look up `key` in the Appfile under `dir` using the environment selection.
/// A missing Appfile or an undeclared key yields `Ok(None)`.
pub fn try_fetch_value(dir: impl AsRef<Path>, key: &str) -> Result<Option<String>, Error> {
    let Some(path) = find_appfile(dir.as_ref()) else {
        return Ok(None);
    };
    let resolver = ConfigResolver::load(path)?;
    Ok(resolver.value(&Selection::from_env(), key)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appfile::{Scope, Value};

    fn resolver() -> ConfigResolver {
        let mut builder = ConfigTree::builder();
        builder
            .set("app_identifier", "net.sunapps.1")
            .set("apple_id", "felix@sunapps.net")
            .set("display", Value::template("${app_identifier} / ${apple_id}").unwrap())
            .for_platform("ios", |b| {
                b.set("apple_id", "fabio@sunapps.net");
            })
            .for_lane("beta", |b| {
                b.set("app_identifier", "net.sunapps.1.beta");
            });
        ConfigResolver::from_tree(builder.build())
    }

    #[test]
    fn test_deferred_sees_final_values() {
        let values = resolver()
            .resolve(&Selection::new(Some("beta"), Some("ios")))
            .unwrap();

        assert_eq!(values["display"], "net.sunapps.1.beta / fabio@sunapps.net");
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let resolver = resolver();
        let selection = Selection::new(Some("beta"), Some("ios"));
        assert_eq!(
            resolver.resolve(&selection).unwrap(),
            resolver.resolve(&selection).unwrap()
        );
    }

    #[test]
    fn test_report_origins() {
        let report = resolver()
            .report(&Selection::new(Some("beta"), Some("ios")))
            .unwrap();

        assert_eq!(report.schema_version, SCHEMA_VERSION);
        assert_eq!(report.lane.as_deref(), Some("beta"));
        assert_eq!(report.platform.as_deref(), Some("ios"));
        assert!(report.source.is_none());
        assert_eq!(report.layers.len(), 3);
        assert_eq!(
            report.origin("app_identifier"),
            Some(&Scope::Lane {
                lane: "beta".to_string()
            })
        );
        assert_eq!(
            report.origin("apple_id"),
            Some(&Scope::Platform {
                platform: "ios".to_string()
            })
        );
        assert!(report.origins["display"].deferred);
        assert!(report.redactions.is_empty());
        assert_eq!(report.custom_keys, vec!["display".to_string()]);
    }

    #[test]
    fn test_report_flags_misspelled_key() {
        let mut builder = ConfigTree::builder();
        builder
            .set("app_identifer", "net.sunapps.1")
            .set("team_id", "Q2CBPJ58CC");
        let report = ConfigResolver::from_tree(builder.build())
            .report(&Selection::none())
            .unwrap();

        assert_eq!(report.custom_keys, vec!["app_identifer".to_string()]);
    }

    #[test]
    fn test_report_to_json() {
        let report = resolver().report(&Selection::none()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["schema_id"], SCHEMA_ID);
        assert_eq!(json["values"]["app_identifier"], "net.sunapps.1");
        assert_eq!(json["origins"]["apple_id"]["scope"]["kind"], "default");
        assert!(json.get("lane").is_none());
    }

    #[test]
    fn test_value_lookup() {
        let resolver = resolver();
        assert_eq!(
            resolver.value(&Selection::none(), "apple_id").unwrap(),
            Some("felix@sunapps.net".to_string())
        );
        assert_eq!(resolver.value(&Selection::none(), "team_id").unwrap(), None);
    }

    #[test]
    fn test_load_default_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = ConfigResolver::load_default(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }
}
