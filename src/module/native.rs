//! Native module registration
//!
//! Native modules are Rust types. Instead of scanning loaded code for
//! implementations, each type is registered once, at startup, under the
//! name of the module directory that declares it. When discovery finds a
//! native `module.yaml` in a directory called `jboss`, every factory
//! registered for `jboss` is instantiated and registered as
//! `jboss.<TypeName>`.

use super::Module;
use std::collections::BTreeMap;

/// Creates a fresh module value
pub type NativeFactory = fn() -> Box<dyn Module>;

#[derive(Debug, Clone)]
pub struct NativeImplementation {
    pub type_name: String,
    pub factory: NativeFactory,
}

/// Registration table of native implementations, keyed by module directory
/// name
#[derive(Debug, Clone, Default)]
pub struct NativeCatalog {
    entries: BTreeMap<String, Vec<NativeImplementation>>,
}

impl NativeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` as `<directory>.<type_name>`. Registering the same
    /// type name twice for a directory replaces the earlier factory.
    pub fn register(
        &mut self,
        directory: impl Into<String>,
        type_name: impl Into<String>,
        factory: NativeFactory,
    ) -> &mut Self {
        let type_name = type_name.into();
        let implementations = self.entries.entry(directory.into()).or_default();
        implementations.retain(|imp| imp.type_name != type_name);
        implementations.push(NativeImplementation { type_name, factory });
        self
    }

    /// Implementations registered for a module directory, in registration
    /// order
    pub fn implementations(&self, directory: &str) -> &[NativeImplementation] {
        self.entries.get(directory).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::builtin::Dummy;

    fn dummy() -> Box<dyn Module> {
        Box::new(Dummy)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut catalog = NativeCatalog::new();
        catalog.register("tools", "First", dummy).register("tools", "Second", dummy);

        let names: Vec<_> = catalog
            .implementations("tools")
            .iter()
            .map(|imp| imp.type_name.as_str())
            .collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(catalog.implementations("other").is_empty());
    }

    #[test]
    fn test_reregister_replaces() {
        let mut catalog = NativeCatalog::new();
        catalog.register("tools", "First", dummy).register("tools", "First", dummy);
        assert_eq!(catalog.implementations("tools").len(), 1);
    }

    #[test]
    fn test_factory_builds_module() {
        let mut catalog = NativeCatalog::new();
        catalog.register("base", "Dummy", dummy);
        let module = (catalog.implementations("base")[0].factory)();
        assert!(module.operations().iter().any(|op| op.name == "dump"));
    }
}
