//! Change files
//!
//! A change file is a YAML list of changes. Each change names the modules to
//! run and the operations to queue on each:
//!
//! ```yaml
//! - name: configure-app
//!   description: Configure the application server
//!   environment:
//!     APP_HOME: /opt/app
//!   changes:
//!     - base.Dummy:
//!         - environment:
//!             - GREETING=hello
//!         - dump: $GREETING "two words" port=8080
//! ```
//!
//! Operation values are split like a shell command line. `environment`
//! entries update the module environment and are never dispatched.

use crate::core::output;
use crate::error::{CctError, Result};
use crate::module::Operation;
use crate::registry::Registry;
use crate::runner::ModuleRunner;
use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const ENVIRONMENT_KEY: &str = "environment";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawChange {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    environment: Value,
    #[serde(default)]
    changes: Vec<Mapping>,
}

/// One named change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub name: String,
    pub description: Option<String>,
    /// Seeds the environment of every module in this change
    pub environment: BTreeMap<String, String>,
    pub steps: Vec<ModuleStep>,
}

/// Operations queued on a single module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStep {
    pub module: String,
    pub environment: BTreeMap<String, String>,
    pub operations: Vec<Operation>,
}

/// Read and parse a change file
pub fn load(path: &Path) -> Result<Vec<Change>> {
    let text = std::fs::read_to_string(path).map_err(|e| CctError::ChangeParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse(&text, path)
}

/// Parse change file text; `path` is only used for error messages
pub fn parse(text: &str, path: &Path) -> Result<Vec<Change>> {
    let fail = |reason: String| CctError::ChangeParse {
        path: path.to_path_buf(),
        reason,
    };

    let raw: Vec<RawChange> = serde_yaml::from_str(text).map_err(|e| fail(e.to_string()))?;
    raw.into_iter()
        .map(|change| convert_change(change).map_err(&fail))
        .collect()
}

fn convert_change(raw: RawChange) -> Result<Change, String> {
    let environment = environment_map(&raw.environment)
        .map_err(|e| format!("change '{}': {}", raw.name, e))?;

    let mut steps = Vec::new();
    for entry in &raw.changes {
        for (module, body) in entry {
            let module = scalar(module)
                .ok_or_else(|| format!("change '{}': module names must be strings", raw.name))?;
            let step = convert_step(&module, body)
                .map_err(|e| format!("change '{}', module {}: {}", raw.name, module, e))?;
            steps.push(step);
        }
    }

    Ok(Change {
        name: raw.name,
        description: raw.description,
        environment,
        steps,
    })
}

fn convert_step(module: &str, body: &Value) -> Result<ModuleStep, String> {
    let mut step = ModuleStep {
        module: module.to_string(),
        environment: BTreeMap::new(),
        operations: Vec::new(),
    };

    let entries = match body {
        Value::Null => return Ok(step),
        Value::Sequence(entries) => entries,
        _ => return Err("expected a list of operations".to_string()),
    };

    for entry in entries {
        let (command, args) = match entry {
            Value::String(command) => (command.clone(), Value::Null),
            Value::Mapping(map) if map.len() == 1 => {
                let Some((key, value)) = map.iter().next() else {
                    continue;
                };
                let command = scalar(key).ok_or("operation names must be strings")?;
                (command, value.clone())
            }
            _ => return Err("each operation must be a single-key mapping".to_string()),
        };

        if command == ENVIRONMENT_KEY {
            step.environment.extend(environment_map(&args)?);
        } else {
            step.operations.push(Operation::new(command, arguments(&args)?));
        }
    }
    Ok(step)
}

/// Operation arguments from a YAML value
fn arguments(value: &Value) -> Result<Vec<String>, String> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(line) => split_args(line),
        Value::Sequence(items) => items
            .iter()
            .map(|item| scalar(item).ok_or_else(|| "arguments must be scalars".to_string()))
            .collect(),
        other => scalar(other)
            .map(|s| vec![s])
            .ok_or_else(|| "arguments must be a string or a list".to_string()),
    }
}

/// Environment from a mapping or a list of `KEY=VALUE` strings
fn environment_map(value: &Value) -> Result<BTreeMap<String, String>, String> {
    match value {
        Value::Null => Ok(BTreeMap::new()),
        Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| match (scalar(k), scalar(v)) {
                (Some(k), Some(v)) => Ok((k, v)),
                _ => Err("environment keys and values must be scalars".to_string()),
            })
            .collect(),
        Value::Sequence(items) => items
            .iter()
            .map(|item| -> Result<(String, String), String> {
                let text = scalar(item).ok_or("environment entries must be KEY=VALUE strings")?;
                text.split_once('=')
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .ok_or_else(|| format!("environment entry '{}' is not KEY=VALUE", text))
            })
            .collect(),
        _ => Err("environment must be a mapping or a list".to_string()),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Split a command line into words.
///
/// Whitespace separates words. Single quotes group literally, double quotes
/// group and honor backslash escapes, a backslash outside quotes escapes the
/// next character.
pub fn split_args(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated quote in: {}", line)),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c) => current.push(c),
                            None => return Err(format!("unterminated quote in: {}", line)),
                        },
                        Some(c) => current.push(c),
                        None => return Err(format!("unterminated quote in: {}", line)),
                    }
                }
            }
            '\\' => {
                in_word = true;
                if let Some(c) = chars.next() {
                    current.push(c);
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Run every change in order. The first failing module aborts the rest.
pub fn apply(changes: &[Change], registry: &mut Registry) -> Result<()> {
    for change in changes {
        output::action(&format!("Applying change {}", change.name));
        if let Some(description) = &change.description {
            output::detail(description);
        }

        for step in &change.steps {
            let instance = registry.get_mut(&step.module)?;
            instance.environment_mut().extend(change.environment.clone());
            instance.environment_mut().extend(step.environment.clone());
            instance.reset_operations(step.operations.clone());
            ModuleRunner::new(instance).run()?;
        }
        output::success(&format!("change {} applied", change.name));
    }
    Ok(())
}

/// Load and apply change files in order
pub fn run_files(paths: &[PathBuf], registry: &mut Registry) -> Result<()> {
    for path in paths {
        output::debug(&format!("loading change file {}", path.display()));
        let changes = load(path)?;
        apply(&changes, registry)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> Result<Vec<Change>> {
        parse(text, Path::new("test.yaml"))
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args(r#"$GREETING "two words" port=8080"#).unwrap(),
            vec!["$GREETING", "two words", "port=8080"]
        );
        assert_eq!(split_args("  a   b ").unwrap(), vec!["a", "b"]);
        assert_eq!(split_args(r#"'it''s' x\ y "q\"d""#).unwrap(), vec!["its", "x y", "q\"d"]);
        assert_eq!(split_args("''").unwrap(), vec![""]);
        assert!(split_args("").unwrap().is_empty());
        assert!(split_args("'open").is_err());
    }

    #[test]
    fn test_parse_full_change() {
        let changes = parse_str(
            r#"
- name: configure
  description: Configure things
  environment:
    APP_HOME: /opt/app
    PORT: 8080
  changes:
    - base.Dummy:
        - environment:
            - GREETING=hello
        - dump: $GREETING "two words"
        - dump
        - dump: 42
        - dump: [a, 1, true]
"#,
        )
        .unwrap();

        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.description.as_deref(), Some("Configure things"));
        assert_eq!(change.environment["PORT"], "8080");

        let step = &change.steps[0];
        assert_eq!(step.module, "base.Dummy");
        assert_eq!(step.environment["GREETING"], "hello");
        let args: Vec<&[String]> = step.operations.iter().map(|op| op.args()).collect();
        assert_eq!(args[0], ["$GREETING", "two words"]);
        assert!(args[1].is_empty());
        assert_eq!(args[2], ["42"]);
        assert_eq!(args[3], ["a", "1", "true"]);
    }

    #[test]
    fn test_module_order_preserved() {
        let changes = parse_str(
            "- name: order\n  changes:\n    - zeta.Z:\n        - go\n    - alpha.A:\n        - go\n",
        )
        .unwrap();
        let modules: Vec<&str> = changes[0].steps.iter().map(|s| s.module.as_str()).collect();
        assert_eq!(modules, vec!["zeta.Z", "alpha.A"]);
    }

    #[test]
    fn test_bad_environment_entry() {
        let err = parse_str(
            "- name: bad\n  changes:\n    - base.Dummy:\n        - environment: [NOEQUALS]\n",
        )
        .unwrap_err();
        assert!(matches!(err, CctError::ChangeParse { ref reason, .. } if reason.contains("NOEQUALS")));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_str("- name: [oops"),
            Err(CctError::ChangeParse { .. })
        ));
    }

    #[test]
    fn test_apply_runs_dummy() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut registry = Registry::new(dir.path());
        let changes = parse_str(
            "- name: smoke\n  environment:\n    A: b\n  changes:\n    - base.Dummy:\n        - dump: x y\n",
        )
        .unwrap();

        apply(&changes, &mut registry).unwrap();
        let dummy = registry.get("base.Dummy").unwrap();
        assert_eq!(dummy.environment().local("A"), Some("b"));
        assert_eq!(dummy.operations()[0].args(), ["x", "y"]);
    }

    #[test]
    fn test_apply_unknown_module() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut registry = Registry::new(dir.path());
        let changes = parse_str("- name: nope\n  changes:\n    - missing.Mod:\n        - go\n").unwrap();
        assert!(matches!(
            apply(&changes, &mut registry),
            Err(CctError::ModuleNotFound(_))
        ));
    }
}
