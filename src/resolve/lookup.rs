//! Deferred value evaluation
//!
//! Runs after merging. Each setting is evaluated at most once; a deferred
//! value that reads another setting triggers that setting's evaluation first,
//! so it only ever sees final literal values. A setting that is requested
//! while its own evaluation is in progress is a cycle.

use std::collections::BTreeMap;
use std::env;

use tracing::debug;

use super::merge::Merged;
use crate::appfile::{Deferred, Value};
use crate::error::ResolveError;

/// Handle given to deferred computations for reading other settings
pub struct Lookup<'a> {
    merged: &'a Merged<'a>,
    resolved: BTreeMap<String, String>,
    in_progress: Vec<String>,
}

impl<'a> Lookup<'a> {
    pub(crate) fn new(merged: &'a Merged<'a>) -> Self {
        Self {
            merged,
            resolved: BTreeMap::new(),
            in_progress: Vec::new(),
        }
    }

    /// Final value of another setting. Undeclared settings are an error.
    pub fn get(&mut self, name: &str) -> Result<String, ResolveError> {
        match self.resolve_setting(name)? {
            Some(value) => Ok(value),
            None => Err(ResolveError::UndefinedSetting {
                name: name.to_string(),
                requested_by: self.current().to_string(),
            }),
        }
    }

    /// Final value of another setting, `None` if it is not declared
    pub fn try_get(&mut self, name: &str) -> Result<Option<String>, ResolveError> {
        self.resolve_setting(name)
    }

    /// Read an environment variable on behalf of the current setting
    pub fn env(&self, variable: &str) -> Result<String, ResolveError> {
        env::var(variable).map_err(|_| ResolveError::MissingEnv {
            variable: variable.to_string(),
            setting: self.current().to_string(),
        })
    }

    /// Name of the setting being computed
    pub fn current(&self) -> &str {
        self.in_progress.last().map(String::as_str).unwrap_or_default()
    }

    /// Error for a failed computation of the current setting
    pub fn fail(&self, message: impl Into<String>) -> ResolveError {
        ResolveError::Deferred {
            setting: self.current().to_string(),
            message: message.into(),
        }
    }

    /// Evaluate every merged setting
    pub(crate) fn finish(mut self) -> Result<BTreeMap<String, String>, ResolveError> {
        let merged = self.merged;
        for name in merged.keys() {
            self.resolve_setting(name)?;
        }
        Ok(self.resolved)
    }

    fn resolve_setting(&mut self, name: &str) -> Result<Option<String>, ResolveError> {
        if let Some(value) = self.resolved.get(name) {
            return Ok(Some(value.clone()));
        }

        let merged = self.merged;
        let Some(entry) = merged.get(name) else {
            return Ok(None);
        };

        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut chain = self.in_progress[start..].to_vec();
            chain.push(name.to_string());
            return Err(ResolveError::Cycle { chain });
        }

        let value = match entry.value {
            Value::Literal(literal) => literal.clone(),
            Value::Deferred(deferred) => {
                debug!(setting = name, scope = %entry.scope, "evaluating deferred setting");
                self.in_progress.push(name.to_string());
                let result = self.evaluate(deferred);
                self.in_progress.pop();
                result?
            }
        };

        self.resolved.insert(name.to_string(), value.clone());
        Ok(Some(value))
    }

    fn evaluate(&mut self, deferred: &Deferred) -> Result<String, ResolveError> {
        match deferred {
            Deferred::Env { name, default } => match env::var(name) {
                Ok(value) => Ok(value),
                Err(_) => default.clone().ok_or_else(|| ResolveError::MissingEnv {
                    variable: name.clone(),
                    setting: self.current().to_string(),
                }),
            },
            Deferred::Template(template) => template.render(self),
            Deferred::Func(f) => f(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appfile::{ConfigTree, Value};
    use crate::resolve::merge::{merge_layers, select_layers};
    use crate::resolve::Selection;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn evaluate(tree: &ConfigTree) -> Result<BTreeMap<String, String>, ResolveError> {
        let layers = select_layers(tree, &Selection::none());
        let merged = merge_layers(&layers);
        Lookup::new(&merged).finish()
    }

    #[test]
    fn test_template_reads_other_settings() {
        let mut builder = ConfigTree::builder();
        builder
            .set("app_identifier", Value::template("${bundle_prefix}.beta").unwrap())
            .set("bundle_prefix", "net.sunapps");
        let values = evaluate(&builder.build()).unwrap();

        assert_eq!(values["app_identifier"], "net.sunapps.beta");
    }

    #[test]
    fn test_chained_deferred_values() {
        let mut builder = ConfigTree::builder();
        builder
            .set("a", Value::template("${b}-a").unwrap())
            .set("b", Value::template("${c}-b").unwrap())
            .set("c", "c");
        let values = evaluate(&builder.build()).unwrap();

        assert_eq!(values["a"], "c-b-a");
        assert_eq!(values["b"], "c-b");
    }

    #[test]
    fn test_cycle_is_fatal() {
        let mut builder = ConfigTree::builder();
        builder
            .set("a", Value::template("${b}").unwrap())
            .set("b", Value::template("${a}").unwrap());
        let err = evaluate(&builder.build()).unwrap_err();

        assert_eq!(
            err,
            ResolveError::Cycle {
                chain: vec!["a".to_string(), "b".to_string(), "a".to_string()]
            }
        );
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let mut builder = ConfigTree::builder();
        builder.set("a", Value::template("x${a}").unwrap());
        assert!(matches!(
            evaluate(&builder.build()),
            Err(ResolveError::Cycle { .. })
        ));
    }

    #[test]
    fn test_undefined_reference_is_fatal() {
        let mut builder = ConfigTree::builder();
        builder.set("app_identifier", Value::template("${bundle_prefix}.1").unwrap());
        let err = evaluate(&builder.build()).unwrap_err();

        assert_eq!(
            err,
            ResolveError::UndefinedSetting {
                name: "bundle_prefix".to_string(),
                requested_by: "app_identifier".to_string(),
            }
        );
    }

    #[test]
    fn test_func_evaluated_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let mut builder = ConfigTree::builder();
        builder
            .set(
                "team_id",
                Value::func(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok("Q2CBPJ58CC".to_string())
                }),
            )
            .set("a", Value::template("${team_id}").unwrap())
            .set("b", Value::template("${team_id}").unwrap());
        let values = evaluate(&builder.build()).unwrap();

        assert_eq!(values["a"], "Q2CBPJ58CC");
        assert_eq!(values["b"], "Q2CBPJ58CC");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_func_optional_lookup_and_failure() {
        let mut builder = ConfigTree::builder();
        builder.set(
            "team_name",
            Value::func(|lookup| match lookup.try_get("team_id")? {
                Some(id) => Ok(format!("team {}", id)),
                None => Err(lookup.fail("team_id is required")),
            }),
        );
        let err = evaluate(&builder.build()).unwrap_err();

        assert_eq!(
            err,
            ResolveError::Deferred {
                setting: "team_name".to_string(),
                message: "team_id is required".to_string(),
            }
        );
    }

    #[test]
    fn test_env_default_used_when_unset() {
        let mut builder = ConfigTree::builder();
        builder.set(
            "team_id",
            Value::env_or("APPFILE_CONFIG_LOOKUP_UNSET_VAR", "Q2CBPJ58CC"),
        );
        let values = evaluate(&builder.build()).unwrap();

        assert_eq!(values["team_id"], "Q2CBPJ58CC");
    }

    #[test]
    fn test_env_without_default_is_fatal() {
        let mut builder = ConfigTree::builder();
        builder.set("apple_id", Value::env("APPFILE_CONFIG_LOOKUP_UNSET_VAR"));
        let err = evaluate(&builder.build()).unwrap_err();

        assert_eq!(
            err,
            ResolveError::MissingEnv {
                variable: "APPFILE_CONFIG_LOOKUP_UNSET_VAR".to_string(),
                setting: "apple_id".to_string(),
            }
        );
    }
}
