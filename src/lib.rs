//! Appfile settings resolution
//!
//! Loads an Appfile declaring per-app settings (bundle identifier, Apple ID,
//! team ids) with optional per-platform and per-lane overrides, and resolves
//! the effective values for the active lane and platform. Lane overrides win
//! over platform overrides, which win over defaults.

pub mod appfile;
pub mod error;
pub mod keys;
pub mod resolve;

pub use appfile::{ConfigTree, Deferred, LaneKey, Scope, ScopeBlock, TreeBuilder, Value};
pub use error::{Error, LoadError, ResolveError, TemplateError};
pub use resolve::{
    try_fetch_value, ConfigResolver, Lookup, ResolvedConfig, Selection, LANE_ENV, PLATFORM_ENV,
};
