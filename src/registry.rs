//! Module registry
//!
//! Discovery walks a directory tree for `module.yaml` manifests. For every
//! module directory found, its dependencies are fetched below the registry
//! directory and discovered in turn, then its implementations are
//! instantiated and registered as `<directory>.<implementation>`.

use crate::core::config::RuntimeConfig;
use crate::core::output;
use crate::error::{CctError, Result};
use crate::helpers::git;
use crate::helpers::url::extract_repo_name;
use crate::manifest::{Language, Manifest, MANIFEST_FILE};
use crate::module::builtin::{Dummy, DUMMY_NAME};
use crate::module::env::HostEnv;
use crate::module::native::NativeCatalog;
use crate::module::script::{ScriptModule, SCRIPT_EXTENSION};
use crate::module::{ModuleInstance, OperationListing};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// Fetches a module repository into a local directory
pub trait DependencyFetcher {
    fn fetch(&self, url: &str, version: Option<&str>, dest: &Path) -> Result<()>;
}

/// Fetches dependencies with the `git` binary
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git_bin: String,
}

impl GitFetcher {
    pub fn new(git_bin: impl Into<String>) -> Self {
        Self {
            git_bin: git_bin.into(),
        }
    }
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new("git")
    }
}

impl DependencyFetcher for GitFetcher {
    fn fetch(&self, url: &str, version: Option<&str>, dest: &Path) -> Result<()> {
        git::clone_repo(&self.git_bin, url, dest, version)
    }
}

type DependencyKey = (String, Option<String>);

/// Bookkeeping for one top-level `discover` call
#[derive(Debug, Default)]
struct Discovery {
    dependencies: BTreeSet<DependencyKey>,
    directories: BTreeSet<PathBuf>,
    destinations: BTreeMap<PathBuf, DependencyKey>,
}

impl Discovery {
    /// Record `key` as the owner of `dest`, returning a different earlier
    /// owner if there is one
    fn claim_destination(&mut self, dest: &Path, key: &DependencyKey) -> Option<DependencyKey> {
        match self.destinations.get(dest) {
            Some(owner) if owner != key => Some(owner.clone()),
            Some(_) => None,
            None => {
                self.destinations.insert(dest.to_path_buf(), key.clone());
                None
            }
        }
    }
}

fn describe(key: &DependencyKey) -> String {
    format!("{} ({})", key.0, key.1.as_deref().unwrap_or("default branch"))
}

/// Table of registered modules, keyed by qualified name
pub struct Registry {
    dir: PathBuf,
    fetcher: Box<dyn DependencyFetcher>,
    catalog: NativeCatalog,
    http_timeout: Duration,
    host: HostEnv,
    modules: BTreeMap<String, ModuleInstance>,
}

impl Registry {
    /// Empty registry cloning dependencies below `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let host = HostEnv::default();
        let mut modules = BTreeMap::new();
        modules.insert(DUMMY_NAME.to_string(), dummy(&host));

        Self {
            dir: dir.into(),
            fetcher: Box::new(GitFetcher::default()),
            catalog: NativeCatalog::new(),
            http_timeout: Duration::from_secs(crate::core::config::DEFAULT_HTTP_TIMEOUT_SECS),
            host,
            modules,
        }
    }

    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(&config.modules_dir)
            .with_fetcher(GitFetcher::new(&config.git_bin))
            .with_http_timeout(config.http_timeout)
    }

    pub fn with_fetcher(mut self, fetcher: impl DependencyFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn with_catalog(mut self, catalog: NativeCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_http_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    /// Host environment given to every module registered from now on
    pub fn with_host(mut self, host: HostEnv) -> Self {
        self.modules.insert(DUMMY_NAME.to_string(), dummy(&host));
        self.host = host;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Discover every module below `root`.
    ///
    /// Directories with an unreadable manifest are skipped with a warning.
    /// Dependency, artifact and script failures abort discovery.
    pub fn discover(&mut self, root: &Path) -> Result<()> {
        let mut discovery = Discovery::default();
        self.discover_tree(root, &mut discovery)
    }

    fn discover_tree(&mut self, root: &Path, discovery: &mut Discovery) -> Result<()> {
        // Directory basenames become name prefixes; `.` has none
        let root = std::fs::canonicalize(root)?;
        output::debug(&format!("discovering modules in {}", root.display()));

        let candidates: Vec<PathBuf> = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && e.file_name() == MANIFEST_FILE)
            .filter_map(|e| e.path().parent().map(Path::to_path_buf))
            .collect();

        for dir in candidates {
            if discovery.directories.insert(dir.clone()) {
                self.load_directory(&dir, discovery)?;
            }
        }
        Ok(())
    }

    fn load_directory(&mut self, dir: &Path, discovery: &mut Discovery) -> Result<()> {
        let manifest = match Manifest::load(dir) {
            Ok(manifest) => manifest,
            Err(e) => {
                output::warning(&format!("skipping {}: {}", dir.display(), e));
                return Ok(());
            }
        };

        for dep in &manifest.deps {
            self.install_dependency(&dep.url, dep.version.as_deref(), discovery)?;
        }

        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        match manifest.language() {
            Language::Native => self.load_native(dir, &dir_name, &manifest),
            Language::Script => self.load_scripts(dir, &dir_name, &manifest),
        }
    }

    /// Fetch a dependency into the registry directory and discover it
    fn install_dependency(
        &mut self,
        url: &str,
        version: Option<&str>,
        discovery: &mut Discovery,
    ) -> Result<()> {
        let key: DependencyKey = (url.to_string(), version.map(str::to_string));
        if !discovery.dependencies.insert(key.clone()) {
            output::debug(&format!("dependency {} already handled", describe(&key)));
            return Ok(());
        }

        let dest = self.dir.join(extract_repo_name(url));
        if let Some(owner) = discovery.claim_destination(&dest, &key) {
            output::warning(&format!(
                "{} shares {} with {}; its modules are not rediscovered",
                describe(&key),
                dest.display(),
                describe(&owner)
            ));
        }
        output::sub_action(&format!("Installing dependency {}", url));
        std::fs::create_dir_all(&self.dir)?;
        self.fetcher.fetch(url, version, &dest)?;
        self.discover_tree(&dest, discovery)
    }

    fn load_native(&mut self, dir: &Path, dir_name: &str, manifest: &Manifest) -> Result<()> {
        let implementations = self.catalog.implementations(dir_name).to_vec();
        if implementations.is_empty() {
            output::warning(&format!(
                "no native implementations registered for {}",
                dir.display()
            ));
            return Ok(());
        }

        for imp in implementations {
            let instance = ModuleInstance::new(
                format!("{}.{}", dir_name, imp.type_name),
                Some(dir.to_path_buf()),
                (imp.factory)(),
                self.host.clone(),
            )
            .with_artifacts(&manifest.artifacts, self.http_timeout)?;
            self.register(instance);
        }
        Ok(())
    }

    fn load_scripts(&mut self, dir: &Path, dir_name: &str, manifest: &Manifest) -> Result<()> {
        let pattern = format!(
            "{}/*.{}",
            glob::Pattern::escape(&dir.to_string_lossy()),
            SCRIPT_EXTENSION
        );
        let scripts = glob::glob(&pattern).map_err(|e| CctError::ManifestParse {
            path: dir.join(MANIFEST_FILE),
            reason: e.to_string(),
        })?;

        for script in scripts.filter_map(|entry| entry.ok()) {
            let Some(stem) = script.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let module = ScriptModule::load(&script)?;
            let instance = ModuleInstance::new(
                format!("{}.{}", dir_name, stem),
                Some(dir.to_path_buf()),
                Box::new(module),
                self.host.clone(),
            )
            .with_artifacts(&manifest.artifacts, self.http_timeout)?;
            self.register(instance);
        }
        Ok(())
    }

    /// Add an instance under its qualified name. A later registration under
    /// the same name replaces the earlier one.
    pub fn register(&mut self, instance: ModuleInstance) {
        let name = instance.name().to_string();
        output::debug(&format!("registering {}", name));
        if let Some(previous) = self.modules.insert(name.clone(), instance) {
            output::debug(&format!(
                "{} from {} replaced by a later registration",
                name,
                previous
                    .directory()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| "builtin".to_string())
            ));
        }
    }

    /// All qualified names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<&ModuleInstance> {
        self.modules
            .get(name)
            .ok_or_else(|| CctError::ModuleNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> Result<&mut ModuleInstance> {
        self.modules
            .get_mut(name)
            .ok_or_else(|| CctError::ModuleNotFound(name.to_string()))
    }

    /// Documentation of a module's setup, public operations and teardown
    pub fn list_operations(&self, name: &str) -> Result<OperationListing> {
        Ok(self.get(name)?.listing())
    }
}

fn dummy(host: &HostEnv) -> ModuleInstance {
    ModuleInstance::new(DUMMY_NAME, None, Box::new(Dummy), host.clone())
}
