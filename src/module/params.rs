//! Operation parameter schemas and argument binding
//!
//! Every operation declares its parameters up front. Incoming argument
//! tokens are bound against that schema before the operation is invoked:
//!
//! - `key=value` where `key` is a declared parameter binds by name
//! - any other token (including `key=value` with an undeclared key) is
//!   positional
//! - positionals fill the parameters not bound by name, in declaration order
//! - surplus positionals are rejected unless the schema is variadic
//! - a required parameter that ends up unfilled is rejected

use crate::error::{CctError, Result};
use std::collections::BTreeMap;

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub required: bool,
}

/// Ordered parameter declaration for one operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamSchema {
    params: Vec<Param>,
    variadic: bool,
}

impl ParamSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a parameter that must be supplied
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            required: true,
        });
        self
    }

    /// Declare a parameter that may be omitted
    pub fn optional(mut self, name: impl Into<String>) -> Self {
        self.params.push(Param {
            name: name.into(),
            required: false,
        });
        self
    }

    /// Accept any number of extra positional arguments
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Bind raw argument tokens for `command` against this schema
    pub fn bind(&self, command: &str, args: &[String]) -> Result<BoundArgs> {
        let mut named = BTreeMap::new();
        let mut positional = Vec::new();

        for arg in args {
            match arg.split_once('=') {
                Some((key, value)) if self.declares(key) => {
                    if named.insert(key.to_string(), value.to_string()).is_some() {
                        return Err(CctError::InvalidArguments {
                            command: command.to_string(),
                            reason: format!("parameter '{}' given more than once", key),
                        });
                    }
                }
                _ => positional.push(arg.trim().to_string()),
            }
        }

        let mut values = named.clone();
        let mut remaining = positional.iter();
        for param in self.params.iter().filter(|p| !named.contains_key(&p.name)) {
            match remaining.next() {
                Some(value) => {
                    values.insert(param.name.clone(), value.clone());
                }
                None if param.required => {
                    return Err(CctError::InvalidArguments {
                        command: command.to_string(),
                        reason: format!("missing required parameter '{}'", param.name),
                    });
                }
                None => {}
            }
        }

        let extra: Vec<String> = remaining.cloned().collect();
        if !extra.is_empty() && !self.variadic {
            return Err(CctError::InvalidArguments {
                command: command.to_string(),
                reason: format!(
                    "expected at most {} argument(s), got unexpected: {}",
                    self.params.len(),
                    extra.join(" ")
                ),
            });
        }

        Ok(BoundArgs {
            named,
            positional,
            values,
            extra,
        })
    }
}

/// Arguments after binding against a [`ParamSchema`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoundArgs {
    named: BTreeMap<String, String>,
    positional: Vec<String>,
    values: BTreeMap<String, String>,
    extra: Vec<String>,
}

impl BoundArgs {
    /// Tokens bound by `name=value`
    pub fn named(&self) -> &BTreeMap<String, String> {
        &self.named
    }

    /// Tokens passed positionally, in order
    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    /// Value of a declared parameter, however it was supplied
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Positionals left over after filling declared parameters
    pub fn extra(&self) -> &[String] {
        &self.extra
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_named_and_positional() {
        let schema = ParamSchema::new().optional("port").variadic();
        let bound = schema.bind("start", &args(&["port=8080", "extra"])).unwrap();

        assert_eq!(bound.named().get("port").map(String::as_str), Some("8080"));
        assert_eq!(bound.positional(), ["extra"]);
        assert_eq!(bound.get("port"), Some("8080"));
        assert_eq!(bound.extra(), ["extra"]);
    }

    #[test]
    fn test_undeclared_key_is_positional() {
        let schema = ParamSchema::new().optional("port").variadic();
        let bound = schema.bind("start", &args(&["host=a.example"])).unwrap();

        assert!(bound.named().is_empty());
        assert_eq!(bound.positional(), ["host=a.example"]);
        assert_eq!(bound.get("port"), Some("host=a.example"));
    }

    #[test]
    fn test_value_may_contain_equals() {
        let schema = ParamSchema::new().required("opts");
        let bound = schema.bind("cfg", &args(&["opts=a=b"])).unwrap();
        assert_eq!(bound.get("opts"), Some("a=b"));
    }

    #[test]
    fn test_positionals_fill_unnamed_params_in_order() {
        let schema = ParamSchema::new().required("a").required("b").required("c");
        let bound = schema.bind("op", &args(&["b=2", "1", "3"])).unwrap();
        assert_eq!(bound.get("a"), Some("1"));
        assert_eq!(bound.get("b"), Some("2"));
        assert_eq!(bound.get("c"), Some("3"));
    }

    #[test]
    fn test_missing_required() {
        let schema = ParamSchema::new().required("home");
        let err = schema.bind("setup", &[]).unwrap_err();
        assert!(err.to_string().contains("missing required parameter 'home'"));
    }

    #[test]
    fn test_surplus_rejected_without_variadic() {
        let schema = ParamSchema::new().optional("a");
        let err = schema.bind("op", &args(&["1", "2"])).unwrap_err();
        assert!(matches!(err, CctError::InvalidArguments { .. }));
    }

    #[test]
    fn test_duplicate_named_rejected() {
        let schema = ParamSchema::new().optional("a");
        assert!(schema.bind("op", &args(&["a=1", "a=2"])).is_err());
    }

    #[test]
    fn test_empty_schema_no_args() {
        let bound = ParamSchema::new().bind("noop", &[]).unwrap();
        assert_eq!(bound, BoundArgs::default());
    }
}
