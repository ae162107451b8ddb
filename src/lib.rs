//! Module execution runtime for system and image configuration
//!
//! Modules are units of configuration logic, written as Rust types or as
//! bash scripts. cct discovers them from `module.yaml` manifests, fetches
//! their dependencies and artifacts, and drives each one through
//! `setup`, a queue of operations, and `teardown`.
//!
//! # Module directories
//!
//! ```text
//! modules/
//! └── jboss/
//!     ├── module.yaml      # language, deps, artifacts
//!     ├── server.sh        # registered as jboss.server
//!     └── cli.sh           # registered as jboss.cli
//! ```
//!
//! Every function in a script becomes an operation. Parameters are
//! inferred from `local name=$N` assignments, and the comment block directly
//! above the function is its documentation:
//!
//! ```bash
//! # Start the server on the given port.
//! function start() {
//!     local port=$1
//!     ...
//! }
//! ```
//!
//! # Running operations
//!
//! Operations are queued through change files (see [`change`]) or directly:
//!
//! ```no_run
//! use cct::{ModuleRunner, Operation, Registry};
//!
//! # fn main() -> cct::Result<()> {
//! let mut registry = Registry::new("/var/lib/cct/modules");
//! registry.discover(std::path::Path::new("./modules"))?;
//!
//! let instance = registry.get_mut("jboss.server")?;
//! instance.push_operation(Operation::new("start", vec!["port=8080".to_string()]));
//! ModuleRunner::new(instance).run()?;
//! # Ok(())
//! # }
//! ```
//!
//! # Substitution
//!
//! Before dispatch, every space-separated token of the form `$NAME` is
//! replaced with the host environment value, or else the module environment
//! value. Unresolved tokens are passed through unchanged.

pub mod artifact;
pub mod change;
pub mod core;
pub mod error;
pub mod helpers;
pub mod manifest;
pub mod module;
pub mod registry;
pub mod runner;

pub use crate::core::config::RuntimeConfig;
pub use crate::core::output;
pub use error::{CctError, Result};
pub use module::env::{Environment, HostEnv};
pub use module::native::NativeCatalog;
pub use module::{Module, ModuleContext, ModuleInstance, ModuleState, Operation, OperationState};
pub use registry::{DependencyFetcher, GitFetcher, Registry};
pub use runner::ModuleRunner;
