//! The code base: every class, function, property and constant known to an
//! analysis run, keyed by fully-qualified name.
//!
//! Lookups that miss are ordinary outcomes (`false`/`None`), never errors.
//! Class lookups may autoload: a pending lazy class is materialized, or the
//! configured [`ClassResolver`](crate::ClassResolver) is asked to load it.
//! Presence is always answered from the live maps, so a class removed by
//! `undo_file_changes` stops resolving immediately.

use crate::element::{ClassConstant, ClassDefinition, Clazz, Func, GlobalConstant, Method, Property};
use crate::resolver::{ClassResolver, LazyClassLoader};
use crate::undo::{UndoEntry, UndoLog};
use rustc_hash::{FxHashMap, FxHashSet};
use std::rc::Rc;
use strix_core::OrderedMap;
use strix_options::AnalysisOptions;
use strix_types::{
    FullyQualifiedClassConstantName, FullyQualifiedClassName, FullyQualifiedFunctionName,
    FullyQualifiedGlobalConstantName, FullyQualifiedMethodName, FullyQualifiedPropertyName, TypeHierarchy,
    TypeRegistry, UnionType,
};
use tracing::debug;

/// Per-class member table. Methods are keyed by lowercased name;
/// properties and constants by exact name.
pub(crate) type Members<T> = FxHashMap<FullyQualifiedClassName, OrderedMap<String, T>>;

pub struct CodeBase {
    pub(crate) classes: FxHashMap<FullyQualifiedClassName, Clazz>,
    pub(crate) lazy_classes: FxHashMap<FullyQualifiedClassName, LazyClassLoader>,
    pub(crate) class_resolver: Option<Rc<dyn ClassResolver>>,
    pub(crate) loading: FxHashSet<FullyQualifiedClassName>,
    pub(crate) methods: Members<Method>,
    pub(crate) properties: Members<Property>,
    pub(crate) class_constants: Members<ClassConstant>,
    functions: FxHashMap<FullyQualifiedFunctionName, Func>,
    global_constants: FxHashMap<FullyQualifiedGlobalConstantName, GlobalConstant>,
    pub(crate) hydrated: FxHashSet<FullyQualifiedClassName>,
    hydrate_lazily: bool,
    undo: Option<UndoLog>,
    generation: u64,
}

impl CodeBase {
    pub fn new(options: &AnalysisOptions) -> Self {
        Self {
            classes: FxHashMap::default(),
            lazy_classes: FxHashMap::default(),
            class_resolver: None,
            loading: FxHashSet::default(),
            methods: FxHashMap::default(),
            properties: FxHashMap::default(),
            class_constants: FxHashMap::default(),
            functions: FxHashMap::default(),
            global_constants: FxHashMap::default(),
            hydrated: FxHashSet::default(),
            hydrate_lazily: options.hydrate_lazily,
            undo: None,
            generation: 0,
        }
    }

    pub fn set_class_resolver(&mut self, resolver: Rc<dyn ClassResolver>) {
        self.class_resolver = Some(resolver);
        self.hierarchy_changed();
    }

    pub fn hydrates_lazily(&self) -> bool {
        self.hydrate_lazily
    }

    // ========================================================================
    // Registration
    // ========================================================================

    pub fn add_class(&mut self, clazz: Clazz) {
        self.record(UndoEntry::Class(clazz.fqsen.clone()));
        self.hydrated.remove(&clazz.fqsen);
        self.classes.insert(clazz.fqsen.clone(), clazz);
        self.hierarchy_changed();
    }

    /// Register a class and all of its own members.
    pub fn add_class_definition(&mut self, definition: ClassDefinition) {
        let ClassDefinition { class, methods, properties, constants } = definition;
        self.add_class(class);
        for method in methods {
            self.add_method(method);
        }
        for property in properties {
            self.add_property(property);
        }
        for constant in constants {
            self.add_class_constant(constant);
        }
    }

    /// Register a class whose definition is produced on first lookup.
    pub fn add_lazy_class(
        &mut self,
        fqsen: FullyQualifiedClassName,
        loader: impl FnOnce() -> ClassDefinition + 'static,
    ) {
        self.lazy_classes.insert(fqsen, Box::new(loader));
        self.hierarchy_changed();
    }

    pub fn add_method(&mut self, method: Method) {
        self.record(UndoEntry::Method(method.fqsen.clone()));
        self.methods
            .entry(method.fqsen.class.clone())
            .or_default()
            .insert(method.fqsen.name.to_ascii_lowercase(), method);
    }

    pub fn add_property(&mut self, property: Property) {
        self.record(UndoEntry::Property(property.fqsen.clone()));
        self.properties
            .entry(property.fqsen.class.clone())
            .or_default()
            .insert(property.fqsen.name.clone(), property);
    }

    pub fn add_class_constant(&mut self, constant: ClassConstant) {
        self.record(UndoEntry::ClassConstant(constant.fqsen.clone()));
        self.class_constants
            .entry(constant.fqsen.class.clone())
            .or_default()
            .insert(constant.fqsen.name.clone(), constant);
    }

    pub fn add_function(&mut self, func: Func) {
        self.record(UndoEntry::Function(func.fqsen.clone()));
        self.functions.insert(func.fqsen.clone(), func);
    }

    pub fn add_global_constant(&mut self, constant: GlobalConstant) {
        self.record(UndoEntry::GlobalConstant(constant.fqsen.clone()));
        self.global_constants.insert(constant.fqsen.clone(), constant);
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// Whether the class exists, autoloading it if necessary.
    pub fn has_class_with_fqsen(&mut self, fqsen: &FullyQualifiedClassName) -> bool {
        self.has_class_with_fqsen_autoload(fqsen, true)
    }

    pub fn has_class_with_fqsen_autoload(&mut self, fqsen: &FullyQualifiedClassName, autoload: bool) -> bool {
        if self.classes.contains_key(fqsen) {
            return true;
        }
        autoload && self.autoload_class(fqsen)
    }

    /// The class, hydrated first when hydrating lazily.
    ///
    /// Panics if the class is not known; check `has_class_with_fqsen` first.
    pub fn get_class_by_fqsen(&mut self, fqsen: &FullyQualifiedClassName) -> &Clazz {
        if self.hydrate_lazily {
            self.hydrate_class(fqsen);
        }
        match self.classes.get(fqsen) {
            Some(clazz) => clazz,
            None => panic!("class {} is not in the code base", fqsen),
        }
    }

    /// The class as registered, without autoloading or hydrating.
    pub fn class(&self, fqsen: &FullyQualifiedClassName) -> Option<&Clazz> {
        self.classes.get(fqsen)
    }

    /// Bumped on every change that can alter an ancestor chain: a class
    /// added, removed or made loadable.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn hierarchy_changed(&mut self) {
        self.generation += 1;
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn class_fqsens(&self) -> Vec<FullyQualifiedClassName> {
        self.classes.keys().cloned().collect()
    }

    /// Whether `ancestor` appears in the expansion of `child`.
    pub fn is_subclass_of(
        &mut self,
        registry: &TypeRegistry,
        child: &FullyQualifiedClassName,
        ancestor: &FullyQualifiedClassName,
    ) -> bool {
        if child == ancestor || !self.has_class_with_fqsen(child) {
            return false;
        }
        UnionType::of(registry.class_type(child)).has_ancestor(registry, self, ancestor)
    }

    /// Autoload and, if lazy, hydrate a class before reading its members.
    fn prepare_class(&mut self, class: &FullyQualifiedClassName) {
        if self.has_class_with_fqsen(class) && self.hydrate_lazily {
            self.hydrate_class(class);
        }
    }

    // ========================================================================
    // Methods
    // ========================================================================

    pub fn has_method_with_name(&mut self, class: &FullyQualifiedClassName, name: &str) -> bool {
        self.get_method(class, name).is_some()
    }

    pub fn has_method_with_fqsen(&mut self, fqsen: &FullyQualifiedMethodName) -> bool {
        self.get_method(&fqsen.class, &fqsen.name).is_some()
    }

    pub fn get_method(&mut self, class: &FullyQualifiedClassName, name: &str) -> Option<&Method> {
        self.prepare_class(class);
        self.methods.get(class)?.get(&name.to_ascii_lowercase())
    }

    pub fn get_method_by_fqsen(&mut self, fqsen: &FullyQualifiedMethodName) -> Option<&Method> {
        self.get_method(&fqsen.class, &fqsen.name)
    }

    pub fn methods_for_class(&mut self, class: &FullyQualifiedClassName) -> Vec<&Method> {
        self.prepare_class(class);
        self.methods
            .get(class)
            .map(|methods| methods.values().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Properties
    // ========================================================================

    pub fn has_property_with_name(&mut self, class: &FullyQualifiedClassName, name: &str) -> bool {
        self.get_property(class, name).is_some()
    }

    pub fn has_property_with_fqsen(&mut self, fqsen: &FullyQualifiedPropertyName) -> bool {
        self.get_property(&fqsen.class, &fqsen.name).is_some()
    }

    pub fn get_property(&mut self, class: &FullyQualifiedClassName, name: &str) -> Option<&Property> {
        self.prepare_class(class);
        self.properties.get(class)?.get(&name.to_string())
    }

    pub fn get_property_by_fqsen(&mut self, fqsen: &FullyQualifiedPropertyName) -> Option<&Property> {
        self.get_property(&fqsen.class, &fqsen.name)
    }

    pub fn properties_for_class(&mut self, class: &FullyQualifiedClassName) -> Vec<&Property> {
        self.prepare_class(class);
        self.properties
            .get(class)
            .map(|properties| properties.values().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Class constants
    // ========================================================================

    pub fn has_class_constant_with_name(&mut self, class: &FullyQualifiedClassName, name: &str) -> bool {
        self.get_class_constant(class, name).is_some()
    }

    pub fn has_class_constant_with_fqsen(&mut self, fqsen: &FullyQualifiedClassConstantName) -> bool {
        self.get_class_constant(&fqsen.class, &fqsen.name).is_some()
    }

    pub fn get_class_constant(&mut self, class: &FullyQualifiedClassName, name: &str) -> Option<&ClassConstant> {
        self.prepare_class(class);
        self.class_constants.get(class)?.get(&name.to_string())
    }

    pub fn get_class_constant_by_fqsen(&mut self, fqsen: &FullyQualifiedClassConstantName) -> Option<&ClassConstant> {
        self.get_class_constant(&fqsen.class, &fqsen.name)
    }

    pub fn class_constants_for_class(&mut self, class: &FullyQualifiedClassName) -> Vec<&ClassConstant> {
        self.prepare_class(class);
        self.class_constants
            .get(class)
            .map(|constants| constants.values().collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Functions and global constants
    // ========================================================================

    pub fn has_function_with_fqsen(&self, fqsen: &FullyQualifiedFunctionName) -> bool {
        self.functions.contains_key(fqsen)
    }

    pub fn get_function_by_fqsen(&self, fqsen: &FullyQualifiedFunctionName) -> Option<&Func> {
        self.functions.get(fqsen)
    }

    pub fn has_global_constant_with_fqsen(&self, fqsen: &FullyQualifiedGlobalConstantName) -> bool {
        self.global_constants.contains_key(fqsen)
    }

    pub fn get_global_constant_by_fqsen(&self, fqsen: &FullyQualifiedGlobalConstantName) -> Option<&GlobalConstant> {
        self.global_constants.get(fqsen)
    }

    // ========================================================================
    // Reversible registration
    // ========================================================================

    /// Start recording which file registered each element.
    pub fn enable_undo_tracking(&mut self) {
        if self.undo.is_none() {
            self.undo = Some(UndoLog::default());
        }
    }

    /// File whose elements are being registered; `None` stops attributing.
    pub fn set_current_file(&mut self, file: Option<&str>) {
        if let Some(undo) = self.undo.as_mut() {
            undo.set_current_file(file);
        }
    }

    fn record(&mut self, entry: UndoEntry) {
        if let Some(undo) = self.undo.as_mut() {
            undo.record(entry);
        }
    }

    /// Remove every element registered while `file` was current. Returns
    /// the number of elements removed.
    pub fn undo_file_changes(&mut self, file: &str) -> usize {
        let Some(entries) = self.undo.as_mut().and_then(|undo| undo.take_file(file)) else {
            return 0;
        };
        let mut removed = 0;
        for entry in entries {
            if self.remove(&entry) {
                removed += 1;
            }
        }
        debug!(file, removed, "undid file changes");
        if removed > 0 {
            self.reset_memoized_state();
        }
        removed
    }

    fn remove(&mut self, entry: &UndoEntry) -> bool {
        match entry {
            UndoEntry::Class(fqsen) => {
                let removed = self.classes.remove(fqsen).is_some();
                if removed {
                    self.hierarchy_changed();
                }
                removed
            }
            UndoEntry::Method(fqsen) => remove_member(&mut self.methods, &fqsen.class, &fqsen.name.to_ascii_lowercase()),
            UndoEntry::Property(fqsen) => remove_member(&mut self.properties, &fqsen.class, &fqsen.name),
            UndoEntry::ClassConstant(fqsen) => remove_member(&mut self.class_constants, &fqsen.class, &fqsen.name),
            UndoEntry::Function(fqsen) => self.functions.remove(fqsen).is_some(),
            UndoEntry::GlobalConstant(fqsen) => self.global_constants.remove(fqsen).is_some(),
        }
    }
}

fn remove_member<T>(members: &mut Members<T>, class: &FullyQualifiedClassName, key: &str) -> bool {
    members
        .get_mut(class)
        .and_then(|table| table.remove(&key.to_string()))
        .is_some()
}

impl TypeHierarchy for CodeBase {
    fn class_union_type(&mut self, fqsen: &FullyQualifiedClassName) -> Option<UnionType> {
        if !self.has_class_with_fqsen(fqsen) {
            return None;
        }
        self.classes.get(fqsen).map(|clazz| clazz.union_type.clone())
    }

    fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Debug for CodeBase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeBase")
            .field("classes", &self.classes.len())
            .field("lazy_classes", &self.lazy_classes.len())
            .field("functions", &self.functions.len())
            .field("global_constants", &self.global_constants.len())
            .field("hydrate_lazily", &self.hydrate_lazily)
            .field("generation", &self.generation)
            .finish()
    }
}
