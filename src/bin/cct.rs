//! cct CLI - run configuration modules
//!
//! Usage:
//!   cct list                          List registered modules
//!   cct ops <module>                  Show a module's operations
//!   cct run <change.yaml>...          Apply change files
//!   cct exec <module> <op> [args]     Run one operation through the lifecycle

use anyhow::{Context, Result};
use cct::{change, output, Operation, Registry, RuntimeConfig, ModuleRunner};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cct")]
#[command(about = "Discover and run configuration modules")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Modules directory; dependencies are cloned below it
    #[arg(short = 'm', long, global = true, env = "CCT_MODULES_DIR")]
    modules_dir: Option<PathBuf>,

    /// Configuration file (default: $XDG_CONFIG_HOME/cct/config.toml)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Print debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List registered modules
    List,

    /// Show the operations of a module
    Ops {
        /// Qualified module name, e.g. base.Dummy
        module: String,
    },

    /// Apply change files in order
    Run {
        /// Change files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Run a single operation
    Exec {
        /// Qualified module name
        module: String,

        /// Operation name
        operation: String,

        /// Operation arguments (positional or name=value)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = RuntimeConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.modules_dir {
        config.modules_dir = dir;
    }
    config.verbose |= cli.verbose;
    output::set_verbose(config.verbose);

    if !config.modules_dir.exists() {
        std::fs::create_dir_all(&config.modules_dir).with_context(|| {
            format!(
                "Failed to create modules directory: {}",
                config.modules_dir.display()
            )
        })?;
    }

    let mut registry = Registry::from_config(&config);
    registry
        .discover(&config.modules_dir)
        .with_context(|| format!("Failed to load modules from {}", config.modules_dir.display()))?;

    match cli.command {
        Commands::List => {
            output::info(&format!("Modules in {}:", config.modules_dir.display()));
            for name in registry.list() {
                output::list_item(name, "");
            }
        }

        Commands::Ops { module } => show_operations(&registry, &module)?,

        Commands::Run { files } => {
            change::run_files(&files, &mut registry)?;
        }

        Commands::Exec {
            module,
            operation,
            args,
        } => {
            let instance = registry.get_mut(&module)?;
            instance.reset_operations(vec![Operation::new(operation, args)]);
            ModuleRunner::new(instance).run()?;
        }
    }

    Ok(())
}

fn show_operations(registry: &Registry, module: &str) -> Result<()> {
    use owo_colors::OwoColorize;

    let listing = registry.list_operations(module)?;
    output::info(&format!("Operations of {}:", module.bold()));

    if let Some(doc) = &listing.setup {
        output::list_item("setup", doc);
    }
    for (name, doc) in &listing.operations {
        output::list_item(name, doc);
    }
    if let Some(doc) = &listing.teardown {
        output::list_item("teardown", doc);
    }
    if listing.operations.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    Ok(())
}
