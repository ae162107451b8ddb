//! Script-backed modules
//!
//! Every function found by [`introspect`](super::introspect) in a `*.sh`
//! file becomes an operation. Calling one runs
//! `bash -c 'source <script>; <function> "$@"'` with:
//!
//! - `CCT_MODULE_PATH` set to the script's directory
//! - `CCT_ARTIFACT_PATH_<NAME>` for every verified artifact
//!
//! Standard error is merged into standard output; on a non-zero exit the
//! combined text is carried by [`CctError::ExternalProcess`].

use super::introspect::{self, FunctionDescriptor};
use super::params::{BoundArgs, ParamSchema};
use super::{Module, ModuleContext, OperationSpec};
use crate::core::output;
use crate::error::{CctError, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Extension of script module files
pub const SCRIPT_EXTENSION: &str = "sh";

/// Environment variable pointing at the module directory
pub const MODULE_PATH_VAR: &str = "CCT_MODULE_PATH";

#[derive(Debug, Clone)]
pub struct ScriptModule {
    script: PathBuf,
    functions: BTreeMap<String, FunctionDescriptor>,
}

impl ScriptModule {
    /// Read and introspect a script file. Bytes that are not UTF-8 are
    /// replaced; the function table only depends on ASCII tokens.
    pub fn load(script: &Path) -> Result<Self> {
        let bytes = std::fs::read(script)?;
        let functions = introspect::introspect(&String::from_utf8_lossy(&bytes));
        output::debug(&format!(
            "{}: found functions [{}]",
            script.display(),
            functions.keys().cloned().collect::<Vec<_>>().join(", ")
        ));
        Ok(Self {
            script: script.to_path_buf(),
            functions,
        })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    pub fn functions(&self) -> &BTreeMap<String, FunctionDescriptor> {
        &self.functions
    }

    fn module_dir(&self) -> &Path {
        self.script.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Run `function` with `args` in a fresh bash process
    fn invoke(&self, function: &str, args: &[String], ctx: &ModuleContext<'_>) -> Result<()> {
        let display = format!("{} {}", function, args.join(" "));

        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(format!("exec 2>&1; source \"$0\"; {} \"$@\"", function))
            .arg(&self.script)
            .args(args)
            .stdin(Stdio::null())
            .envs(ctx.environment.host().overlay())
            .env(MODULE_PATH_VAR, self.module_dir());

        for artifact in ctx.artifacts.values() {
            if let Some(path) = artifact.path() {
                output::debug(&format!(
                    "created {} environment variable pointing to {}",
                    artifact.env_var(),
                    path.display()
                ));
                cmd.env(artifact.env_var(), path);
            }
        }

        let out = cmd.output().map_err(|e| CctError::ExternalProcess {
            cmd: display.clone(),
            code: None,
            output: format!("failed to start bash: {}", e),
        })?;
        let combined = String::from_utf8_lossy(&out.stdout).into_owned();

        if !out.status.success() {
            return Err(CctError::ExternalProcess {
                cmd: display,
                code: out.status.code(),
                output: combined.trim_end().to_string(),
            });
        }

        output::debug(&format!("step ended with output: {}", combined.trim_end()));
        Ok(())
    }
}

/// Shell-safe function name; anything else cannot have come from a plain
/// `function name()` definition
fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Arrange bound arguments into the argv the function sees.
///
/// Named values go to the position of their `$N` reference; positionals fill
/// the gaps in order and anything left is appended. Gaps with nothing to
/// fill them become empty strings.
fn place_arguments(function: &FunctionDescriptor, args: &BoundArgs) -> Vec<String> {
    let mut slots: BTreeMap<usize, String> = function
        .ordered_params()
        .into_iter()
        .filter_map(|(name, index)| Some((index, args.named().get(name)?.clone())))
        .collect();

    let mut positional = args.positional().iter();
    let last = slots.keys().next_back().copied().unwrap_or(0);
    let mut argv = Vec::with_capacity(last.max(args.positional().len()));

    for index in 1..=last {
        let value = slots
            .remove(&index)
            .or_else(|| positional.next().cloned())
            .unwrap_or_default();
        argv.push(value);
    }
    argv.extend(positional.cloned());
    argv
}

impl Module for ScriptModule {
    fn operations(&self) -> Vec<OperationSpec> {
        self.functions
            .values()
            .filter(|f| is_valid_function_name(&f.name))
            .map(|f| {
                let schema = f
                    .ordered_params()
                    .into_iter()
                    .fold(ParamSchema::new(), |schema, (name, _)| schema.optional(name))
                    .variadic();
                OperationSpec::new(f.name.clone(), schema).with_doc(f.doc.trim())
            })
            .collect()
    }

    fn call(&mut self, command: &str, args: &BoundArgs, ctx: &mut ModuleContext<'_>) -> Result<()> {
        let function = self
            .functions
            .get(command)
            .ok_or_else(|| CctError::UnsupportedOperation {
                module: ctx.name.to_string(),
                command: command.to_string(),
            })?;
        let argv = place_arguments(function, args);
        self.invoke(command, &argv, ctx)
    }
}
