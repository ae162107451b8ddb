//! Modules that ship with the runtime

use super::params::{BoundArgs, ParamSchema};
use super::{Module, ModuleContext, OperationSpec};
use crate::core::output;
use crate::error::Result;

/// Qualified name of the always-available dummy module
pub const DUMMY_NAME: &str = "base.Dummy";

/// Logs its arguments and environment. Useful for checking change files.
#[derive(Debug, Default)]
pub struct Dummy;

impl Module for Dummy {
    fn operations(&self) -> Vec<OperationSpec> {
        vec![
            OperationSpec::new("dump", ParamSchema::new().variadic())
                .with_doc("Dumps arguments and the module environment to the log."),
        ]
    }

    fn call(&mut self, command: &str, args: &BoundArgs, ctx: &mut ModuleContext<'_>) -> Result<()> {
        debug_assert_eq!(command, "dump");
        let env: Vec<String> = ctx
            .environment
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        output::info(&format!(
            "{} dump: args [{}] environment [{}]",
            ctx.name,
            args.positional().join(", "),
            env.join(", ")
        ));
        Ok(())
    }
}
