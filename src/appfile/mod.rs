//! Appfile model and loading
//!
//! - `value`: literal and deferred setting values
//! - `tree`: scope blocks and the immutable configuration tree
//! - `parse`: TOML evaluation into a tree
//! - `discover`: default Appfile lookup

mod discover;
mod parse;
mod tree;
mod value;

pub use discover::{find_appfile, APPFILE_CANDIDATES};
pub use parse::{load_appfile, parse_appfile, AppfileSource, LANE_TABLE, PLATFORM_TABLE};
pub use tree::{ConfigTree, LaneKey, Scope, ScopeBlock, Setting, TreeBuilder};
pub use value::{Deferred, DeferredFn, Segment, Template, Value};
