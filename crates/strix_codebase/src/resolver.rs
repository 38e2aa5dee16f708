//! On-demand class loading.
//!
//! A class lookup that misses first tries a registered lazy loader and then
//! the configured [`ClassResolver`]. A class that is already being loaded is
//! reported absent, so a resolver that looks up the class it is loading
//! (directly or through a parent) terminates.

use crate::codebase::CodeBase;
use crate::element::ClassDefinition;
use strix_types::FullyQualifiedClassName;
use tracing::debug;

/// Produces a class definition when it is first needed.
pub type LazyClassLoader = Box<dyn FnOnce() -> ClassDefinition>;

/// Loads classes the code base has not seen yet, typically by locating and
/// parsing the file that declares them.
pub trait ClassResolver {
    /// Register `fqsen` (and anything it needs) into `codebase`. Returns
    /// whether a definition was found.
    fn resolve(&self, fqsen: &FullyQualifiedClassName, codebase: &mut CodeBase) -> bool;
}

impl CodeBase {
    pub(crate) fn autoload_class(&mut self, fqsen: &FullyQualifiedClassName) -> bool {
        if self.loading.contains(fqsen) {
            debug!(class = %fqsen, "class lookup during its own load");
            return false;
        }

        if let Some(loader) = self.lazy_classes.remove(fqsen) {
            debug!(class = %fqsen, "materializing lazy class");
            self.loading.insert(fqsen.clone());
            let definition = loader();
            self.add_class_definition(definition);
            self.loading.remove(fqsen);
            return self.classes.contains_key(fqsen);
        }

        let Some(resolver) = self.class_resolver.clone() else {
            return false;
        };
        debug!(class = %fqsen, "resolving class on demand");
        self.loading.insert(fqsen.clone());
        let found = resolver.resolve(fqsen, self);
        self.loading.remove(fqsen);
        found && self.classes.contains_key(fqsen)
    }

    pub fn has_lazy_class(&self, fqsen: &FullyQualifiedClassName) -> bool {
        self.lazy_classes.contains_key(fqsen)
    }
}
