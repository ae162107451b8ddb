//! Module contract
//!
//! A module is anything implementing [`Module`]: native Rust types
//! registered in a [`native::NativeCatalog`], or shell scripts wrapped by
//! [`script::ScriptModule`]. The runtime never talks to a module directly;
//! it goes through a [`ModuleInstance`], which owns the module's
//! environment, operations, artifacts and lifecycle state.

pub mod builtin;
pub mod env;
pub mod introspect;
pub mod native;
pub mod params;
pub mod script;
pub mod substitute;

use crate::artifact::Artifact;
use crate::core::output;
use crate::error::{CctError, Result};
use crate::manifest::ArtifactSpec;
use env::{Environment, HostEnv};
use params::{BoundArgs, ParamSchema};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Operation names that are part of the lifecycle and never dispatched
pub const RESERVED_OPERATIONS: [&str; 5] = ["setup", "run", "url", "version", "teardown"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_OPERATIONS.contains(&name)
}

/// An operation a module can perform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: String,
    pub doc: String,
    pub params: ParamSchema,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, params: ParamSchema) -> Self {
        Self {
            name: name.into(),
            doc: String::new(),
            params,
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }
}

/// What a module sees while running
pub struct ModuleContext<'a> {
    pub name: &'a str,
    pub directory: Option<&'a Path>,
    pub environment: &'a mut Environment,
    pub artifacts: &'a BTreeMap<String, Artifact>,
}

impl ModuleContext<'_> {
    /// Environment lookup: host, then module, then `default`
    pub fn getenv(&self, name: &str, default: Option<&str>) -> Option<String> {
        self.environment.get(name, default)
    }

    /// Path of a verified artifact
    pub fn artifact_path(&self, name: &str) -> Option<&Path> {
        self.artifacts.get(name).and_then(Artifact::path)
    }
}

/// The capability set every module implements.
///
/// `operations` is read once, when the instance is created, and becomes the
/// instance's dispatch table. `call` is only ever invoked with a command from
/// that table and arguments already bound against its schema.
pub trait Module {
    fn operations(&self) -> Vec<OperationSpec>;

    /// Prepare the module. Values the module needs come from the context
    /// environment; a missing required value is a fatal error.
    fn setup(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn call(&mut self, command: &str, args: &BoundArgs, ctx: &mut ModuleContext<'_>) -> Result<()>;

    /// Best-effort cleanup after every operation passed
    fn teardown(&mut self, _ctx: &mut ModuleContext<'_>) -> Result<()> {
        Ok(())
    }

    fn setup_doc(&self) -> Option<String> {
        None
    }

    fn teardown_doc(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleState {
    #[default]
    NotRun,
    Processing,
    Passed,
    Error,
}

impl fmt::Display for ModuleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRun => "NotRun",
            Self::Processing => "Processing",
            Self::Passed => "Passed",
            Self::Error => "Error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationState {
    #[default]
    NotRun,
    Passed,
    Error,
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotRun => "NotRun",
            Self::Passed => "Passed",
            Self::Error => "Error",
        })
    }
}

/// One step of a module's operation sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    command: String,
    args: Vec<String>,
    state: OperationState,
}

impl Operation {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args: args.into_iter().map(|a| a.trim_end().to_string()).collect(),
            state: OperationState::NotRun,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Record the outcome. Only a `NotRun` operation changes state.
    fn finish(&mut self, state: OperationState) {
        if self.state == OperationState::NotRun {
            self.state = state;
        }
    }
}

/// Documentation for `cct ops`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationListing {
    pub setup: Option<String>,
    /// Public operations, sorted by name
    pub operations: Vec<(String, String)>,
    pub teardown: Option<String>,
}

/// A registered module together with its runtime state
pub struct ModuleInstance {
    name: String,
    directory: Option<PathBuf>,
    environment: Environment,
    operations: Vec<Operation>,
    artifacts: BTreeMap<String, Artifact>,
    state: ModuleState,
    table: BTreeMap<String, OperationSpec>,
    module: Box<dyn Module>,
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("name", &self.name)
            .field("directory", &self.directory)
            .field("operations", &self.operations)
            .field("artifacts", &self.artifacts.keys().collect::<Vec<_>>())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl ModuleInstance {
    pub fn new(
        name: impl Into<String>,
        directory: Option<PathBuf>,
        module: Box<dyn Module>,
        host: HostEnv,
    ) -> Self {
        let table = module
            .operations()
            .into_iter()
            .filter(|op| !is_reserved(&op.name))
            .map(|op| (op.name.clone(), op))
            .collect();

        Self {
            name: name.into(),
            directory,
            environment: Environment::new(host),
            operations: Vec::new(),
            artifacts: BTreeMap::new(),
            state: ModuleState::NotRun,
            table,
            module,
        }
    }

    /// Fetch and verify every declared artifact into the module directory.
    /// Fails on the first artifact that cannot be validated.
    pub fn with_artifacts(mut self, specs: &[ArtifactSpec], timeout: Duration) -> Result<Self> {
        if specs.is_empty() {
            return Ok(self);
        }
        let dir = match &self.directory {
            Some(dir) => dir.clone(),
            None => std::env::current_dir()?,
        };
        for spec in specs {
            let mut artifact = Artifact::new(spec, self.environment.host())?;
            artifact.fetch(&dir, timeout)?;
            self.artifacts.insert(artifact.name().to_string(), artifact);
        }
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut Environment {
        &mut self.environment
    }

    pub fn artifacts(&self) -> &BTreeMap<String, Artifact> {
        &self.artifacts
    }

    pub fn state(&self) -> ModuleState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ModuleState) {
        self.state = state;
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Append an operation to the sequence
    pub fn push_operation(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Replace the operation sequence and reset the lifecycle state, so the
    /// instance can be run again with fresh operations
    pub fn reset_operations(&mut self, operations: Vec<Operation>) {
        self.operations = operations;
        self.state = ModuleState::NotRun;
    }

    /// The operation that stopped the last run, if any
    pub fn failed_operation(&self) -> Option<&Operation> {
        self.operations
            .iter()
            .find(|op| op.state == OperationState::Error)
    }

    /// Dispatchable operations
    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.table.get(name)
    }

    pub fn listing(&self) -> OperationListing {
        OperationListing {
            setup: self.module.setup_doc(),
            operations: self
                .table
                .values()
                .filter(|op| op.name.starts_with(|c: char| c.is_ascii_lowercase()))
                .map(|op| (op.name.clone(), op.doc.clone()))
                .collect(),
            teardown: self.module.teardown_doc(),
        }
    }

    pub(crate) fn setup(&mut self) -> Result<()> {
        let mut ctx = ModuleContext {
            name: &self.name,
            directory: self.directory.as_deref(),
            environment: &mut self.environment,
            artifacts: &self.artifacts,
        };
        self.module.setup(&mut ctx)
    }

    pub(crate) fn teardown(&mut self) -> Result<()> {
        let mut ctx = ModuleContext {
            name: &self.name,
            directory: self.directory.as_deref(),
            environment: &mut self.environment,
            artifacts: &self.artifacts,
        };
        self.module.teardown(&mut ctx)
    }

    /// Substitute variables in operation `index` in place and return its
    /// command and arguments
    pub(crate) fn prepare_operation(&mut self, index: usize) -> (String, Vec<String>) {
        let env = &self.environment;
        let op = &mut self.operations[index];
        op.command = substitute::substitute(&op.command, env);
        op.args = op
            .args
            .iter()
            .map(|arg| substitute::substitute(arg, env))
            .collect();
        (op.command.clone(), op.args.clone())
    }

    pub(crate) fn finish_operation(&mut self, index: usize, state: OperationState) {
        self.operations[index].finish(state);
    }

    /// Look up `command`, bind `args` against its schema and invoke it
    pub fn dispatch(&mut self, command: &str, args: &[String]) -> Result<()> {
        let spec = self
            .table
            .get(command)
            .ok_or_else(|| CctError::UnsupportedOperation {
                module: self.name.clone(),
                command: command.to_string(),
            })?;
        let bound = spec.params.bind(command, args)?;
        output::debug(&format!(
            "invoking {}.{} named={:?} positional={:?}",
            self.name,
            command,
            bound.named(),
            bound.positional()
        ));

        let mut ctx = ModuleContext {
            name: &self.name,
            directory: self.directory.as_deref(),
            environment: &mut self.environment,
            artifacts: &self.artifacts,
        };
        self.module.call(command, &bound, &mut ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    impl Module for Echo {
        fn operations(&self) -> Vec<OperationSpec> {
            vec![
                OperationSpec::new("say", ParamSchema::new().required("word")).with_doc("Say it"),
                OperationSpec::new("teardown", ParamSchema::new()),
                OperationSpec::new("_hidden", ParamSchema::new()),
            ]
        }

        fn call(&mut self, command: &str, args: &BoundArgs, ctx: &mut ModuleContext<'_>) -> Result<()> {
            ctx.environment
                .set("LAST", format!("{}:{}", command, args.get("word").unwrap_or_default()));
            Ok(())
        }

        fn setup_doc(&self) -> Option<String> {
            Some("Prepare".to_string())
        }
    }

    fn instance() -> ModuleInstance {
        ModuleInstance::new("test.Echo", None, Box::new(Echo), HostEnv::fixed::<&str, &str>([]))
    }

    #[test]
    fn test_reserved_names() {
        for name in RESERVED_OPERATIONS {
            assert!(is_reserved(name));
        }
        assert!(!is_reserved("dump"));
    }

    #[test]
    fn test_reserved_names_not_in_table() {
        let instance = instance();
        assert!(instance.operation("say").is_some());
        assert!(instance.operation("teardown").is_none());
    }

    #[test]
    fn test_dispatch_binds_and_calls() {
        let mut instance = instance();
        instance.dispatch("say", &["word=hi".to_string()]).unwrap();
        assert_eq!(instance.environment().local("LAST"), Some("say:hi"));
    }

    #[test]
    fn test_dispatch_unknown_command() {
        let mut instance = instance();
        let err = instance.dispatch("shout", &[]).unwrap_err();
        assert!(matches!(err, CctError::UnsupportedOperation { .. }));
    }

    #[test]
    fn test_dispatch_validates_before_call() {
        let mut instance = instance();
        let err = instance.dispatch("say", &[]).unwrap_err();
        assert!(matches!(err, CctError::InvalidArguments { .. }));
        assert_eq!(instance.environment().local("LAST"), None);
    }

    #[test]
    fn test_listing_filters_private_and_reserved() {
        let listing = instance().listing();
        assert_eq!(listing.setup.as_deref(), Some("Prepare"));
        assert_eq!(listing.operations, vec![("say".to_string(), "Say it".to_string())]);
        assert_eq!(listing.teardown, None);
    }

    #[test]
    fn test_operation_state_is_monotonic() {
        let mut op = Operation::new("say", vec!["hi ".to_string()]);
        assert_eq!(op.args(), ["hi"]);
        op.finish(OperationState::Passed);
        op.finish(OperationState::Error);
        assert_eq!(op.state(), OperationState::Passed);
    }

    #[test]
    fn test_prepare_operation_substitutes() {
        let mut instance = instance();
        instance.environment_mut().set("WORD", "hello");
        instance.push_operation(Operation::new("say", vec!["$WORD".to_string()]));
        let (command, args) = instance.prepare_operation(0);
        assert_eq!(command, "say");
        assert_eq!(args, vec!["hello"]);
        assert_eq!(instance.operations()[0].args(), ["hello"]);
    }
}
