//! Module environment
//!
//! Lookups always resolve host process first, then the module's own
//! declared values, then the caller's default. A host variable that is set
//! but empty counts as unset.

use crate::error::{CctError, Result};
use std::collections::BTreeMap;

/// Source of host environment variables.
///
/// `Process` reads the real process environment; `Fixed` is a snapshot,
/// used to run modules against a controlled host environment.
#[derive(Debug, Clone, Default)]
pub enum HostEnv {
    #[default]
    Process,
    Fixed(BTreeMap<String, String>),
}

impl HostEnv {
    /// Build a fixed host environment from key/value pairs
    pub fn fixed<K, V>(vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self::Fixed(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }

    /// Non-empty value of a host variable
    pub fn var(&self, name: &str) -> Option<String> {
        let value = match self {
            Self::Process => std::env::var(name).ok(),
            Self::Fixed(vars) => vars.get(name).cloned(),
        };
        value.filter(|v| !v.is_empty())
    }

    /// Variables to add on top of the inherited process environment when
    /// spawning a child process
    pub fn overlay(&self) -> impl Iterator<Item = (&str, &str)> {
        let vars = match self {
            Self::Process => None,
            Self::Fixed(vars) => Some(vars),
        };
        vars.into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// String-to-string mapping owned by one module instance
#[derive(Debug, Clone, Default)]
pub struct Environment {
    host: HostEnv,
    vars: BTreeMap<String, String>,
}

impl Environment {
    pub fn new(host: HostEnv) -> Self {
        Self {
            host,
            vars: BTreeMap::new(),
        }
    }

    pub fn host(&self) -> &HostEnv {
        &self.host
    }

    /// Resolve `name`: host value, then module value, then `default`
    pub fn get(&self, name: &str, default: Option<&str>) -> Option<String> {
        self.host
            .var(name)
            .or_else(|| self.vars.get(name).cloned())
            .or_else(|| default.map(str::to_string))
    }

    /// Resolve `name` or fail with [`CctError::MissingEnvironment`]
    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name, None)
            .ok_or_else(|| CctError::MissingEnvironment(name.to_string()))
    }

    /// Module-local value only, ignoring the host
    pub fn local(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    pub fn extend<K, V>(&mut self, vars: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in vars {
            self.set(k, v);
        }
    }

    /// Module-local variables, sorted by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_wins_over_module() {
        let mut env = Environment::new(HostEnv::fixed([("FOO", "bar")]));
        env.set("FOO", "baz");
        assert_eq!(env.get("FOO", Some("default")).as_deref(), Some("bar"));
        assert_eq!(env.local("FOO"), Some("baz"));
    }

    #[test]
    fn test_module_wins_over_default() {
        let mut env = Environment::new(HostEnv::fixed::<&str, &str>([]));
        env.set("FOO", "baz");
        assert_eq!(env.get("FOO", Some("default")).as_deref(), Some("baz"));
    }

    #[test]
    fn test_default_when_unset() {
        let env = Environment::new(HostEnv::fixed::<&str, &str>([]));
        assert_eq!(env.get("FOO", Some("default")).as_deref(), Some("default"));
        assert_eq!(env.get("FOO", None), None);
    }

    #[test]
    fn test_empty_host_value_is_unset() {
        let mut env = Environment::new(HostEnv::fixed([("FOO", "")]));
        env.set("FOO", "baz");
        assert_eq!(env.get("FOO", None).as_deref(), Some("baz"));
    }

    #[test]
    fn test_require_missing() {
        let env = Environment::new(HostEnv::fixed::<&str, &str>([]));
        let err = env.require("JBOSS_HOME").unwrap_err();
        assert!(matches!(err, CctError::MissingEnvironment(name) if name == "JBOSS_HOME"));
    }

    #[test]
    fn test_overlay_only_for_fixed_host() {
        assert_eq!(HostEnv::Process.overlay().count(), 0);
        let host = HostEnv::fixed([("A", "1"), ("B", "2")]);
        let overlay: Vec<_> = host.overlay().collect();
        assert_eq!(overlay, vec![("A", "1"), ("B", "2")]);
    }

    #[test]
    fn test_process_host_reads_real_environment() {
        // PATH is set in any environment that can run the test suite
        assert!(HostEnv::Process.var("PATH").is_some());
    }
}
