//! Test fixtures - module trees and change files.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

/// Script module that records every call in `$TRACE_FILE`.
pub const TRACE_SCRIPT: &str = r#"#!/bin/bash

# Record an install of the given package.
function install() {
    local package=$1
    local version=$2
    echo "install ${package} ${version}" >> "$TRACE_FILE"
}

# Always fails.
function broken() {
    echo "broken stdout"
    echo "broken stderr" >&2
    exit 7
}

function setup() {
    echo "script setup" >> "$TRACE_FILE"
}

# Print where the module lives.
function whereami() {
    echo "dir ${CCT_MODULE_PATH}" >> "$TRACE_FILE"
}

function _private() {
    :
}
"#;

/// Script module that reads a downloaded artifact.
pub const ARTIFACT_SCRIPT: &str = r#"#!/bin/bash

# Copy the payload artifact into the trace file.
function show() {
    cat "$CCT_ARTIFACT_PATH_PAYLOAD" >> "$TRACE_FILE"
}
"#;

pub const BASH_MANIFEST: &str = "language: bash\n";

/// Create `<root>/<dir>` with a manifest and scripts, returning its path
pub fn write_module(root: &Path, dir: &str, manifest: &str, scripts: &[(&str, &str)]) -> PathBuf {
    let path = root.join(dir);
    std::fs::create_dir_all(&path).unwrap();
    std::fs::write(path.join("module.yaml"), manifest).unwrap();
    for (name, content) in scripts {
        std::fs::write(path.join(format!("{}.sh", name)), content).unwrap();
    }
    path
}

/// Write a change file and return its path
pub fn write_change(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Lines recorded in a trace file, empty when nothing ran
pub fn trace_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .map(|s| s.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
