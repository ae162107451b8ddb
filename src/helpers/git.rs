//! Git helpers for fetching module dependencies
//!
//! Cloning is delegated to the `git` binary. A destination that already
//! holds a valid checkout is reused; an invalid one is removed and cloned
//! again.

use crate::core::output::{self, Spinner};
use crate::error::{CctError, Result};
use std::path::Path;
use std::process::{Command, Stdio};

/// Validate that a URL uses a scheme git can fetch from.
/// https://, http://, ssh://, git@ and file:// URLs plus absolute local paths
/// are accepted.
pub fn validate_git_url(url: &str) -> Result<()> {
    let ok = url.starts_with("https://")
        || url.starts_with("http://")
        || url.starts_with("ssh://")
        || url.starts_with("git@")
        || url.starts_with("file://")
        || url.starts_with('/');
    if ok {
        Ok(())
    } else {
        Err(CctError::DependencyFetch {
            url: url.to_string(),
            reason: "unsupported git URL scheme; only https://, http://, ssh://, git@, \
                     file:// and absolute paths are supported"
                .to_string(),
        })
    }
}

/// Clone `url` into `dest` and check out `version` when given.
pub fn clone_repo(git: &str, url: &str, dest: &Path, version: Option<&str>) -> Result<()> {
    validate_git_url(url)?;

    let dest_str = dest.to_str().ok_or_else(|| CctError::DependencyFetch {
        url: url.to_string(),
        reason: "destination path contains invalid UTF-8".to_string(),
    })?;

    if dest.join(".git").exists() {
        if is_valid_checkout(git, dest_str) {
            output::detail(&format!("git: {} already cloned", dest.display()));
            if let Some(version) = version {
                checkout(git, dest_str, version)?;
            }
            return Ok(());
        }
        output::warning(&format!(
            "git: {} exists but is invalid, re-cloning",
            dest.display()
        ));
        std::fs::remove_dir_all(dest)?;
    }

    output::detail(&format!("git clone {}", url));
    let _spinner = Spinner::new(&format!("cloning {}", url));

    run_git(git, &["clone", "--quiet", url, dest_str])?;
    if let Some(version) = version {
        checkout(git, dest_str, version)?;
    }

    output::debug(&format!("cloned {} to {}", url, dest.display()));
    Ok(())
}

fn checkout(git: &str, dest: &str, version: &str) -> Result<()> {
    output::detail(&format!("git checkout {}", version));
    run_git(git, &["-C", dest, "checkout", "--quiet", version])
}

fn is_valid_checkout(git: &str, dest: &str) -> bool {
    Command::new(git)
        .args(["-C", dest, "rev-parse", "HEAD"])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Run git, mapping a non-zero exit to [`CctError::ExternalProcess`]
/// carrying the combined output.
fn run_git(git: &str, args: &[&str]) -> Result<()> {
    let cmd = format!("{} {}", git, args.join(" "));
    let out = Command::new(git)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| CctError::DependencyFetch {
            url: args.last().copied().unwrap_or_default().to_string(),
            reason: format!("failed to run {}: {}", git, e),
        })?;

    if !out.status.success() {
        let mut combined = String::from_utf8_lossy(&out.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&out.stderr));
        return Err(CctError::ExternalProcess {
            cmd,
            code: out.status.code(),
            output: combined.trim().to_string(),
        });
    }
    Ok(())
}
