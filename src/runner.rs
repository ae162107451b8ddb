//! Operation pipeline
//!
//! Drives one module instance through its lifecycle:
//!
//! 1. `setup`
//! 2. each queued operation, in order, after variable substitution
//! 3. `teardown`, only when every operation passed
//!
//! The first failure stops the run. The failing operation keeps state
//! `Error`, later ones stay `NotRun`, and teardown is skipped.

use crate::core::output;
use crate::error::Result;
use crate::module::{is_reserved, ModuleInstance, ModuleState, OperationState};

pub struct ModuleRunner<'a> {
    instance: &'a mut ModuleInstance,
}

impl<'a> ModuleRunner<'a> {
    pub fn new(instance: &'a mut ModuleInstance) -> Self {
        Self { instance }
    }

    pub fn run(self) -> Result<()> {
        let instance = self.instance;
        output::action(&format!("Processing module {}", instance.name()));
        instance.set_state(ModuleState::Processing);

        output::sub_action("setup");
        if let Err(e) = instance.setup() {
            instance.set_state(ModuleState::Error);
            output::error(&format!("{} setup failed: {}", instance.name(), e));
            return Err(e);
        }

        let total = instance.operations().len();
        for index in 0..total {
            let command = instance.operations()[index].command().to_string();
            if is_reserved(&command) {
                output::skip(&format!("{} is a lifecycle operation", command));
                continue;
            }

            let (command, args) = instance.prepare_operation(index);
            output::action_numbered(index + 1, total, &format!("{} {}", command, args.join(" ")));

            match instance.dispatch(&command, &args) {
                Ok(()) => instance.finish_operation(index, OperationState::Passed),
                Err(e) => {
                    instance.finish_operation(index, OperationState::Error);
                    instance.set_state(ModuleState::Error);
                    output::error(&format!(
                        "module {} failed on operation {} with args [{}]: {}",
                        instance.name(),
                        command,
                        args.join(", "),
                        e
                    ));
                    return Err(e);
                }
            }
        }

        output::sub_action("teardown");
        if let Err(e) = instance.teardown() {
            instance.set_state(ModuleState::Error);
            output::error(&format!("{} teardown failed: {}", instance.name(), e));
            return Err(e);
        }

        instance.set_state(ModuleState::Passed);
        output::success(&format!("{} passed", instance.name()));
        Ok(())
    }
}
