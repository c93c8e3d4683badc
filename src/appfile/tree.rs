//! Configuration tree
//!
//! The scope blocks discovered while evaluating an Appfile: one default
//! block, blocks keyed by platform name, and lane blocks keyed by lane name
//! plus an optional platform qualifier. The tree is built once and only read
//! afterwards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::value::Value;

/// A single `name = value` assignment
#[derive(Debug, Clone)]
pub struct Setting {
    pub name: String,
    pub value: Value,
}

/// Ordered assignments declared under one scope
#[derive(Debug, Clone, Default)]
pub struct ScopeBlock {
    settings: Vec<Setting>,
}

impl ScopeBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `name`. A repeated name replaces the earlier value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.settings.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.value = value,
            None => self.settings.push(Setting { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.settings.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Setting> {
        self.settings.iter()
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }
}

/// Key of a lane block; `platform` set means the lane is platform-qualified
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LaneKey {
    pub lane: String,
    pub platform: Option<String>,
}

impl LaneKey {
    pub fn unqualified(lane: impl Into<String>) -> Self {
        Self {
            lane: lane.into(),
            platform: None,
        }
    }

    pub fn qualified(lane: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            lane: lane.into(),
            platform: Some(platform.into()),
        }
    }

    pub fn is_qualified(&self) -> bool {
        self.platform.is_some()
    }

    pub fn scope(&self) -> Scope {
        match &self.platform {
            Some(platform) => Scope::PlatformLane {
                platform: platform.clone(),
                lane: self.lane.clone(),
            },
            None => Scope::Lane {
                lane: self.lane.clone(),
            },
        }
    }
}

/// Identifies one block of the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    Default,
    Platform { platform: String },
    Lane { lane: String },
    PlatformLane { platform: String, lane: String },
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Default => write!(f, "default scope"),
            Scope::Platform { platform } => write!(f, "platform '{}'", platform),
            Scope::Lane { lane } => write!(f, "lane '{}'", lane),
            Scope::PlatformLane { platform, lane } => {
                write!(f, "lane '{}' for platform '{}'", lane, platform)
            }
        }
    }
}

/// Every scope block of one Appfile
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    pub(crate) defaults: ScopeBlock,
    pub(crate) platforms: BTreeMap<String, ScopeBlock>,
    pub(crate) lanes: BTreeMap<LaneKey, ScopeBlock>,
}

impl ConfigTree {
    pub fn builder() -> TreeBuilder {
        TreeBuilder::default()
    }

    pub fn defaults(&self) -> &ScopeBlock {
        &self.defaults
    }

    pub fn platform(&self, name: &str) -> Option<&ScopeBlock> {
        self.platforms.get(name)
    }

    pub fn lane(&self, key: &LaneKey) -> Option<&ScopeBlock> {
        self.lanes.get(key)
    }

    pub fn platforms(&self) -> impl Iterator<Item = (&str, &ScopeBlock)> {
        self.platforms.iter().map(|(name, block)| (name.as_str(), block))
    }

    pub fn lanes(&self) -> impl Iterator<Item = (&LaneKey, &ScopeBlock)> {
        self.lanes.iter()
    }

    /// Every lane name declared anywhere, deduplicated
    pub fn lane_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.lanes.keys().map(|k| k.lane.as_str()).collect();
        names.dedup();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.defaults.is_empty() && self.platforms.is_empty() && self.lanes.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
struct Context {
    platform: Option<String>,
    lane: Option<String>,
    // Set when nesting makes the current block impossible to select.
    unreachable: bool,
}

/// Builds a [`ConfigTree`] the way an Appfile is evaluated: assignments go
/// to whichever `for_platform` / `for_lane` blocks enclose them.
///
/// ```
/// use appfile_config::ConfigTree;
///
/// let mut builder = ConfigTree::builder();
/// builder
///     .set("app_identifier", "net.sunapps.1")
///     .for_lane("beta", |b| {
///         b.set("app_identifier", "net.sunapps.1.beta");
///     })
///     .for_platform("ios", |b| {
///         b.for_lane("enterprise", |b| {
///             b.set("team_id", "Q2CBPJ58AA");
///         });
///     });
/// let tree = builder.build();
/// assert_eq!(tree.platforms().count(), 0);
/// assert_eq!(tree.lanes().count(), 2);
/// ```
#[derive(Debug, Default)]
pub struct TreeBuilder {
    tree: ConfigTree,
    context: Context,
}

impl TreeBuilder {
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        if !self.context.unreachable {
            self.block_mut().set(name, value);
        }
        self
    }

    pub fn for_platform(&mut self, name: &str, body: impl FnOnce(&mut Self)) -> &mut Self {
        let saved = self.context.clone();
        match &self.context.platform {
            _ if name.trim().is_empty() => {
                warn!("blank platform block can never apply");
                self.context.unreachable = true;
            }
            Some(outer) if outer != name => {
                warn!(outer = %outer, inner = %name, "nested platform block can never apply");
                self.context.unreachable = true;
            }
            _ => self.context.platform = Some(name.to_string()),
        }
        body(self);
        self.context = saved;
        self
    }

    pub fn for_lane(&mut self, name: &str, body: impl FnOnce(&mut Self)) -> &mut Self {
        let saved = self.context.clone();
        match &self.context.lane {
            _ if name.is_empty() => {
                warn!("empty lane block can never apply");
                self.context.unreachable = true;
            }
            Some(outer) if outer != name => {
                warn!(outer = %outer, inner = %name, "nested lane block can never apply");
                self.context.unreachable = true;
            }
            _ => self.context.lane = Some(name.to_string()),
        }
        body(self);
        self.context = saved;
        self
    }

    pub fn build(self) -> ConfigTree {
        self.tree
    }

    fn block_mut(&mut self) -> &mut ScopeBlock {
        let tree = &mut self.tree;
        match (&self.context.lane, &self.context.platform) {
            (None, None) => &mut tree.defaults,
            (None, Some(platform)) => tree.platforms.entry(platform.clone()).or_default(),
            (Some(lane), platform) => tree
                .lanes
                .entry(LaneKey {
                    lane: lane.clone(),
                    platform: platform.clone(),
                })
                .or_default(),
        }
    }
}
