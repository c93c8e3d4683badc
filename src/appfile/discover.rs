//! Default Appfile location
//!
//! Looks for the Appfile in the conventional places under a project
//! directory, first match wins.

use std::path::{Path, PathBuf};

/// Candidate paths relative to the project directory, in lookup order
pub const APPFILE_CANDIDATES: &[&str] = &[
    "fastlane/Appfile.toml",
    ".fastlane/Appfile.toml",
    "Appfile.toml",
];

/// First existing Appfile under `dir`
pub fn find_appfile(dir: &Path) -> Option<PathBuf> {
    APPFILE_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.is_file())
}
