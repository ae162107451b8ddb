//! Artifact store
//!
//! Artifacts are external files a module needs before it runs. Each one is
//! cached as `<dir>/<name>`; a cached file whose digest matches the declared
//! checksum is reused without touching the network. Otherwise the file is
//! downloaded once and verified.
//!
//! The cache directory is not locked. Two runs fetching the same artifact
//! into the same directory at the same time can race on the partially
//! written file.

use crate::core::output::{self, Spinner};
use crate::error::{CctError, Result};
use crate::helpers::hash::{self, Checksum};
use crate::helpers::http;
use crate::manifest::ArtifactSpec;
use crate::module::env::HostEnv;
use crate::module::substitute::substitute_braced;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix of the environment variables exposing artifact paths to scripts
pub const ARTIFACT_ENV_PREFIX: &str = "CCT_ARTIFACT_PATH_";

/// A declared artifact and, once verified, its local path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    name: String,
    checksum: Checksum,
    url: String,
    path: Option<PathBuf>,
}

impl Artifact {
    /// Build an artifact from its manifest entry.
    ///
    /// `${NAME}` references in the URL are resolved against the host
    /// environment once, here.
    pub fn new(spec: &ArtifactSpec, host: &HostEnv) -> Result<Self> {
        if !is_plain_file_name(&spec.name) {
            return Err(CctError::InvalidArtifactName(spec.name.clone()));
        }
        Ok(Self {
            name: spec.name.clone(),
            checksum: spec.chksum.parse()?,
            url: substitute_braced(&spec.url, host),
            path: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn checksum(&self) -> &Checksum {
        &self.checksum
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Local path, only set after the checksum validated
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Environment variable naming this artifact's path, e.g.
    /// `CCT_ARTIFACT_PATH_SERVER.ZIP`
    pub fn env_var(&self) -> String {
        format!("{}{}", ARTIFACT_ENV_PREFIX, self.name.to_uppercase())
    }

    /// Make the artifact available in `dir`, downloading it if the cached
    /// copy is missing or stale.
    pub fn fetch(&mut self, dir: &Path, timeout: Duration) -> Result<&Path> {
        let target = dir.join(&self.name);

        if self.checksum.matches_file(&target)? {
            output::detail(&format!("using cached artifact {}", self.name));
            return Ok(self.path.insert(target).as_path());
        }

        output::detail(&format!("fetching {} as artifact {}", self.url, self.name));
        let bytes = {
            let _spinner = Spinner::new(&format!("downloading {}", self.name));
            http::download(&self.url, &target, timeout).map_err(|reason| {
                CctError::ArtifactDownload {
                    name: self.name.clone(),
                    url: self.url.clone(),
                    reason,
                }
            })?
        };
        output::debug(&format!("downloaded {} bytes to {}", bytes, target.display()));

        let actual = hash::file_digest(&target, self.checksum.algorithm)?;
        if actual != self.checksum.digest {
            return Err(CctError::ArtifactIntegrity {
                name: self.name.clone(),
                url: self.url.clone(),
                expected: self.checksum.to_string(),
                actual: format!("{}:{}", self.checksum.algorithm.name(), actual),
            });
        }

        Ok(self.path.insert(target).as_path())
    }
}

/// The cache path is `<dir>/<name>`, so the name must stay inside `dir`
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.chars().any(std::path::is_separator)
}
