//! Scope layering
//!
//! Picks the blocks that apply to a selection and overlays them in order:
//! 1. Default scope
//! 2. Platform scope (active platform)
//! 3. Lane scope (qualified by the active platform, else unqualified)
//!
//! Keys a later layer declares replace earlier ones; keys it does not declare
//! keep their earlier value. Unknown lane or platform names select nothing.

use std::collections::BTreeMap;

use tracing::debug;

use super::selection::Selection;
use crate::appfile::{ConfigTree, LaneKey, Scope, ScopeBlock, Value};

/// A block selected for overlay, tagged with where it came from
#[derive(Debug, Clone)]
pub struct Layer<'a> {
    pub scope: Scope,
    pub block: &'a ScopeBlock,
}

/// The winning declaration for one setting
#[derive(Debug, Clone)]
pub struct MergedEntry<'a> {
    pub value: &'a Value,
    pub scope: Scope,
}

/// Setting name to winning declaration, before deferred evaluation
pub type Merged<'a> = BTreeMap<&'a str, MergedEntry<'a>>;

/// Blocks that apply to `selection`, lowest precedence first
pub fn select_layers<'a>(tree: &'a ConfigTree, selection: &Selection) -> Vec<Layer<'a>> {
    let mut layers = vec![Layer {
        scope: Scope::Default,
        block: tree.defaults(),
    }];

    if let Some(platform) = selection.platform() {
        match tree.platform(platform) {
            Some(block) => layers.push(Layer {
                scope: Scope::Platform {
                    platform: platform.to_string(),
                },
                block,
            }),
            None => debug!(platform, "no platform scope declared"),
        }
    }

    if let Some(lane) = selection.lane() {
        // A qualified block wins over the unqualified one; it never applies
        // without an active platform.
        let qualified = selection
            .platform()
            .map(|platform| LaneKey::qualified(lane, platform))
            .and_then(|key| tree.lane(&key).map(|block| (key, block)));

        let chosen = qualified.or_else(|| {
            let key = LaneKey::unqualified(lane);
            tree.lane(&key).map(|block| (key, block))
        });

        match chosen {
            Some((key, block)) => layers.push(Layer {
                scope: key.scope(),
                block,
            }),
            None => debug!(lane, "no lane scope declared"),
        }
    }

    layers
}

/// Overlay one layer onto the accumulated result
pub fn overlay<'a>(mut base: Merged<'a>, layer: &Layer<'a>) -> Merged<'a> {
    debug!(scope = %layer.scope, settings = layer.block.len(), "applying scope");
    for setting in layer.block.iter() {
        base.insert(
            setting.name.as_str(),
            MergedEntry {
                value: &setting.value,
                scope: layer.scope.clone(),
            },
        );
    }
    base
}

/// Merge layers in order (first is base, last has highest precedence)
pub fn merge_layers<'a>(layers: &[Layer<'a>]) -> Merged<'a> {
    layers.iter().fold(Merged::new(), overlay)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> ConfigTree {
        let mut builder = ConfigTree::builder();
        builder
            .set("app_identifier", "default")
            .set("team_id", "default-team")
            .for_platform("ios", |b| {
                b.set("app_identifier", "ios");
                b.set("apple_id", "ios@example.com");
            })
            .for_lane("enterprise", |b| {
                b.set("app_identifier", "enterprise");
            })
            .for_platform("osx", |b| {
                b.for_lane("enterprise", |b| {
                    b.set("team_id", "osx-enterprise-team");
                });
            });
        builder.build()
    }

    fn scopes(layers: &[Layer<'_>]) -> Vec<String> {
        layers.iter().map(|l| l.scope.to_string()).collect()
    }

    fn literal<'a>(merged: &Merged<'a>, name: &str) -> Option<&'a str> {
        merged.get(name).and_then(|e| e.value.as_literal())
    }

    #[test]
    fn test_defaults_only() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::none());
        assert_eq!(scopes(&layers), vec!["default scope"]);

        let merged = merge_layers(&layers);
        assert_eq!(merged.len(), 2);
        assert_eq!(literal(&merged, "app_identifier"), Some("default"));
    }

    #[test]
    fn test_platform_overlay_keeps_other_keys() {
        let tree = tree();
        let merged = merge_layers(&select_layers(&tree, &Selection::new(None, Some("ios"))));

        assert_eq!(literal(&merged, "app_identifier"), Some("ios"));
        assert_eq!(literal(&merged, "apple_id"), Some("ios@example.com"));
        assert_eq!(literal(&merged, "team_id"), Some("default-team"));
        assert_eq!(
            merged.get("team_id").map(|e| &e.scope),
            Some(&Scope::Default)
        );
    }

    #[test]
    fn test_lane_beats_platform() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::new(Some("enterprise"), Some("ios")));
        assert_eq!(
            scopes(&layers),
            vec!["default scope", "platform 'ios'", "lane 'enterprise'"]
        );

        let merged = merge_layers(&layers);
        assert_eq!(literal(&merged, "app_identifier"), Some("enterprise"));
        assert_eq!(literal(&merged, "apple_id"), Some("ios@example.com"));
    }

    #[test]
    fn test_qualified_lane_replaces_unqualified() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::new(Some("enterprise"), Some("osx")));
        assert_eq!(
            scopes(&layers),
            vec!["default scope", "lane 'enterprise' for platform 'osx'"]
        );

        let merged = merge_layers(&layers);
        // Only one lane block applies, so the unqualified override is absent
        assert_eq!(literal(&merged, "app_identifier"), Some("default"));
        assert_eq!(literal(&merged, "team_id"), Some("osx-enterprise-team"));
    }

    #[test]
    fn test_qualified_lane_needs_platform() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::new(Some("enterprise"), None));
        assert_eq!(scopes(&layers), vec!["default scope", "lane 'enterprise'"]);
    }

    #[test]
    fn test_unknown_names_select_nothing() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::new(Some("release"), Some("tvos")));
        assert_eq!(scopes(&layers), vec!["default scope"]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let tree = tree();
        let layers = select_layers(&tree, &Selection::new(Some("Enterprise"), Some("iOS")));
        assert_eq!(layers.len(), 1);
    }
}
