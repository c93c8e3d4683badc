//! Appfile (TOML) evaluation
//!
//! Maps the TOML document onto a [`ConfigTree`]:
//! - top-level keys: default scope
//! - `[platform.<name>]`: platform scope
//! - `[lane.<name>]`: unqualified lane scope
//! - `[platform.<p>.lane.<l>]` / `[lane.<l>.platform.<p>]`: qualified lane scope
//!
//! A setting is a string (integers and booleans are accepted and kept in
//! their textual form) or an inline table describing a deferred value:
//! `{ env = "NAME", default = "..." }` or `{ template = "..." }`.
//!
//! Assignments are applied in file order, so when the same setting of the
//! same scope is declared twice (a qualified lane spelled both ways), the
//! later declaration wins.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use toml_edit::{ImDocument, Item, TableLike};

use super::tree::{ConfigTree, LaneKey, Scope};
use super::value::{Deferred, Template, Value};
use crate::error::LoadError;

/// Reserved table name for lane scopes
pub const LANE_TABLE: &str = "lane";

/// Reserved table name for platform scopes
pub const PLATFORM_TABLE: &str = "platform";

/// Where a tree was loaded from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppfileSource {
    /// File path as given to the loader
    pub path: String,

    /// SHA-256 digest of the raw file bytes
    pub digest: String,
}

/// Read and evaluate the Appfile at `path`
pub fn load_appfile(path: &Path) -> Result<(ConfigTree, AppfileSource), LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    let bytes = fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hex::encode(hasher.finalize());

    let contents = String::from_utf8(bytes).map_err(|source| LoadError::Encoding {
        path: path.to_path_buf(),
        source,
    })?;

    let tree = parse_appfile(&contents)?;
    Ok((
        tree,
        AppfileSource {
            path: path.to_string_lossy().to_string(),
            digest,
        },
    ))
}

/// Evaluate Appfile contents
pub fn parse_appfile(contents: &str) -> Result<ConfigTree, LoadError> {
    let document = ImDocument::parse(contents)?;
    let mut assignments = Vec::new();

    for (key, item) in document.iter() {
        match key {
            LANE_TABLE => {
                for (lane, body) in expect_table(item, &Scope::Default, LANE_TABLE)?.iter() {
                    check_name(lane, LANE_TABLE, false)?;
                    let scope = Scope::Lane {
                        lane: lane.to_string(),
                    };
                    for (name, item) in expect_table(body, &scope, lane)?.iter() {
                        if name != PLATFORM_TABLE {
                            read_setting(&scope, name, item, &mut assignments)?;
                            continue;
                        }
                        for (platform, inner) in expect_table(item, &scope, PLATFORM_TABLE)?.iter() {
                            check_name(platform, PLATFORM_TABLE, true)?;
                            let scope = LaneKey::qualified(lane, platform).scope();
                            let inner = expect_table(inner, &scope, platform)?;
                            read_block(inner, &scope, &mut assignments)?;
                        }
                    }
                }
            }
            PLATFORM_TABLE => {
                for (platform, body) in expect_table(item, &Scope::Default, PLATFORM_TABLE)?.iter() {
                    check_name(platform, PLATFORM_TABLE, true)?;
                    let scope = Scope::Platform {
                        platform: platform.to_string(),
                    };
                    for (name, item) in expect_table(body, &scope, platform)?.iter() {
                        if name != LANE_TABLE {
                            read_setting(&scope, name, item, &mut assignments)?;
                            continue;
                        }
                        for (lane, inner) in expect_table(item, &scope, LANE_TABLE)?.iter() {
                            check_name(lane, LANE_TABLE, false)?;
                            let scope = LaneKey::qualified(lane, platform).scope();
                            let inner = expect_table(inner, &scope, lane)?;
                            read_block(inner, &scope, &mut assignments)?;
                        }
                    }
                }
            }
            _ => read_setting(&Scope::Default, key, item, &mut assignments)?,
        }
    }

    // TOML tables are unordered; replay assignments in file order so a later
    // declaration of the same setting in the same scope wins.
    assignments.sort_by_key(|a| a.offset);

    let mut tree = ConfigTree::default();
    for assignment in assignments {
        let block = match assignment.scope {
            Scope::Default => &mut tree.defaults,
            Scope::Platform { platform } => tree.platforms.entry(platform).or_default(),
            Scope::Lane { lane } => tree.lanes.entry(LaneKey::unqualified(lane)).or_default(),
            Scope::PlatformLane { platform, lane } => {
                tree.lanes.entry(LaneKey::qualified(lane, platform)).or_default()
            }
        };
        block.set(assignment.name, assignment.value);
    }

    Ok(tree)
}

/// One setting declaration and its byte offset in the source
struct Assignment {
    offset: usize,
    scope: Scope,
    name: String,
    value: Value,
}

fn invalid(scope: &Scope, reason: String) -> LoadError {
    LoadError::Invalid {
        scope: scope.to_string(),
        reason,
    }
}

fn check_name(name: &str, kind: &str, blank_is_empty: bool) -> Result<(), LoadError> {
    let blank = if blank_is_empty {
        name.trim().is_empty()
    } else {
        name.is_empty()
    };
    if blank {
        return Err(invalid(
            &Scope::Default,
            format!("{} name must not be blank", kind),
        ));
    }
    Ok(())
}

fn expect_table<'a>(item: &'a Item, scope: &Scope, key: &str) -> Result<&'a dyn TableLike, LoadError> {
    item.as_table_like().ok_or_else(|| {
        invalid(
            scope,
            format!("'{}' must be a table, found {}", key, item.type_name()),
        )
    })
}

// Settings of a qualified lane block. Reserved names can no longer appear
// here: the only nesting allowed is one lane/platform level.
fn read_block(
    table: &dyn TableLike,
    scope: &Scope,
    assignments: &mut Vec<Assignment>,
) -> Result<(), LoadError> {
    for (name, item) in table.iter() {
        if name == LANE_TABLE || name == PLATFORM_TABLE {
            return Err(invalid(
                scope,
                format!("'{}' cannot be nested at this depth", name),
            ));
        }
        read_setting(scope, name, item, assignments)?;
    }
    Ok(())
}

fn read_setting(
    scope: &Scope,
    name: &str,
    item: &Item,
    assignments: &mut Vec<Assignment>,
) -> Result<(), LoadError> {
    let value = read_value(scope, name, item)?;
    assignments.push(Assignment {
        offset: offset(item),
        scope: scope.clone(),
        name: name.to_string(),
        value,
    });
    Ok(())
}

// Dotted keys (`team_id.env = ".."`) produce tables without a span of their
// own; fall back to their earliest child.
fn offset(item: &Item) -> usize {
    if let Some(span) = item.span() {
        return span.start;
    }
    item.as_table_like()
        .and_then(|table| table.iter().map(|(_, child)| offset(child)).min())
        .unwrap_or(0)
}

fn read_value(scope: &Scope, name: &str, item: &Item) -> Result<Value, LoadError> {
    match item {
        Item::Value(toml_edit::Value::String(s)) => Ok(Value::Literal(s.value().clone())),
        Item::Value(toml_edit::Value::Integer(i)) => Ok(Value::Literal(i.value().to_string())),
        Item::Value(toml_edit::Value::Boolean(b)) => Ok(Value::Literal(b.value().to_string())),
        other => match other.as_table_like() {
            Some(table) => read_deferred(scope, name, table),
            None => Err(invalid(
                scope,
                format!("setting '{}' has unsupported type {}", name, other.type_name()),
            )),
        },
    }
}

fn read_deferred(scope: &Scope, name: &str, table: &dyn TableLike) -> Result<Value, LoadError> {
    let (value, fields): (Value, &[&str]) = if let Some(var) = table.get("env") {
        let var = expect_str(scope, name, "env", var)?;
        let default = table
            .get("default")
            .map(|d| expect_str(scope, name, "default", d))
            .transpose()?;
        (Value::Deferred(Deferred::Env { name: var, default }), &["env", "default"][..])
    } else if let Some(source) = table.get("template") {
        let source = expect_str(scope, name, "template", source)?;
        let template = Template::parse(&source).map_err(|source| LoadError::Template {
            scope: scope.to_string(),
            setting: name.to_string(),
            source,
        })?;
        (Value::Deferred(Deferred::Template(template)), &["template"][..])
    } else {
        return Err(invalid(
            scope,
            format!("setting '{}' must be a string, `{{ env = .. }}` or `{{ template = .. }}`", name),
        ));
    };

    if let Some((extra, _)) = table.iter().find(|(key, _)| !fields.contains(key)) {
        return Err(invalid(
            scope,
            format!("setting '{}' has unexpected key '{}'", name, extra),
        ));
    }
    Ok(value)
}

fn expect_str(scope: &Scope, name: &str, field: &str, item: &Item) -> Result<String, LoadError> {
    match item.as_str() {
        Some(s) => Ok(s.to_string()),
        None => Err(invalid(
            scope,
            format!("'{}.{}' must be a string, found {}", name, field, item.type_name()),
        )),
    }
}
