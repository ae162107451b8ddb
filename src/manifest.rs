//! Module manifests (`module.yaml`)
//!
//! ```yaml
//! language: bash
//! deps:
//!   - url: https://github.com/example/cct-common.git
//!     version: v1.2.0
//! artifacts:
//!   - name: server.zip
//!     chksum: sha256:4f3c...
//!     url: ${MIRROR}/server.zip
//! ```

use crate::error::{CctError, Result};
use serde::Deserialize;
use std::path::Path;

/// File name marking a module directory
pub const MANIFEST_FILE: &str = "module.yaml";

/// How a module directory implements its modules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// `*.sh` files, introspected
    Script,
    /// Types registered in the native catalog
    Native,
}

/// A dependency on another module repository
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Dependency {
    pub url: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// A declared artifact
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtifactSpec {
    pub name: String,
    /// `<algorithm>:<hexdigest>`
    pub chksum: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    pub language: String,
    #[serde(default)]
    pub deps: Vec<Dependency>,
    #[serde(default)]
    pub artifacts: Vec<ArtifactSpec>,
}

impl Manifest {
    /// Load `<dir>/module.yaml`
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(MANIFEST_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| CctError::ManifestParse {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&text).map_err(|e| CctError::ManifestParse {
            path,
            reason: e.to_string(),
        })
    }

    /// Any language mentioning `bash` is a script module; everything else
    /// is native
    pub fn language(&self) -> Language {
        if self.language.contains("bash") {
            Language::Script
        } else {
            Language::Native
        }
    }
}
