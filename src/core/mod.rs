//! Core infrastructure shared by the runtime and the CLI

pub mod config;
pub mod output;
