//! Test fixtures for Appfile scenarios
//!
//! Appfile1-5 mirror the lane, platform, qualified-lane and deferred-value
//! scenarios the resolver must reproduce.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use appfile_config::ConfigResolver;

/// Path to a fixture Appfile
pub fn appfile_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(format!("{}.toml", name))
}

/// Load a fixture Appfile
pub fn load(name: &str) -> ConfigResolver {
    ConfigResolver::load(appfile_path(name)).unwrap()
}
