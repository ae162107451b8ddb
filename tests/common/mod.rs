//! Common test utilities for module integration tests.

#![allow(dead_code)]

mod fixtures;

pub use fixtures::*;
