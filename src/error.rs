//! Error types for loading and resolving an Appfile
//!
//! Load errors abort construction of a resolver. Resolve errors abort a
//! single query; no partial mapping is ever returned.

use std::io;
use std::path::PathBuf;
use std::string::FromUtf8Error;

/// Errors raised while reading or evaluating the Appfile
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Appfile not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read Appfile {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Appfile {} is not valid UTF-8: {source}", .path.display())]
    Encoding {
        path: PathBuf,
        #[source]
        source: FromUtf8Error,
    },

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml_edit::TomlError),

    #[error("Invalid {scope}: {reason}")]
    Invalid { scope: String, reason: String },

    #[error("Invalid template for '{setting}' in {scope}: {source}")]
    Template {
        scope: String,
        setting: String,
        #[source]
        source: TemplateError,
    },
}

/// Template syntax errors, detected when the template is declared
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unterminated placeholder at byte {0}")]
    Unterminated(usize),

    #[error("empty placeholder at byte {0}")]
    Empty(usize),

    #[error("invalid placeholder name '{0}'")]
    InvalidName(String),
}

/// Errors raised while evaluating deferred values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("Setting '{requested_by}' references undefined setting '{name}'")]
    UndefinedSetting { name: String, requested_by: String },

    #[error("Cyclic setting reference: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    #[error("Setting '{setting}' requires environment variable {variable}, which is not set")]
    MissingEnv { variable: String, setting: String },

    #[error("Failed to compute setting '{setting}': {message}")]
    Deferred { setting: String, message: String },
}

/// Either kind of failure, for one-shot helpers that load and resolve
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}
