//! Environment lookups for configuration defaults
//!
//! Every parameter `name` may be supplied as `DOCDB_<NAME>`. The resolver
//! reads variables through the [`Environment`] trait so callers can hand it
//! a fixed map instead of the process environment.

use std::collections::HashMap;

/// Prefix shared by every configuration environment variable
pub const ENV_PREFIX: &str = "DOCDB_";

/// Source of environment variables
pub trait Environment {
    fn var(&self, name: &str) -> Option<String>;
}

/// Reads the real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Fixed set of variables, used by tests and embedding callers
#[derive(Debug, Clone, Default)]
pub struct MapEnvironment {
    vars: HashMap<String, String>,
}

impl MapEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapEnvironment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            vars: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

impl Environment for MapEnvironment {
    fn var(&self, name: &str) -> Option<String> {
        self.vars.get(name).cloned()
    }
}

/// Environment variable name for a configuration parameter
pub fn env_var_name(parameter: &str) -> String {
    format!("{}{}", ENV_PREFIX, parameter.to_uppercase())
}
