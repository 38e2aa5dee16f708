//! Expansion of class types through their ancestors.

use crate::fqsen::FullyQualifiedClassName;
use crate::registry::TypeRegistry;
use crate::ty::{TypeId, TypeKind};
use crate::union::UnionType;
use rustc_hash::FxHashMap;
use strix_core::limits::MAX_TYPE_EXPANSION_DEPTH;
use tracing::trace;

/// The seam through which expansion asks the symbol table about classes.
pub trait TypeHierarchy {
    /// The declared union type of a class: the class itself plus its direct
    /// parent and interfaces. `None` when the class is unknown.
    ///
    /// Takes `&mut self` because answering may load the class on demand.
    fn class_union_type(&mut self, fqsen: &FullyQualifiedClassName) -> Option<UnionType>;

    /// Changes whenever a class is added, removed or becomes loadable.
    /// Expansions memoized under one generation are dropped once the
    /// hierarchy reports another.
    fn generation(&self) -> u64 {
        0
    }
}

/// Memoized expansions, valid for one hierarchy generation.
#[derive(Debug, Default)]
pub(crate) struct ExpansionCache {
    generation: u64,
    entries: FxHashMap<TypeId, UnionType>,
}

impl ExpansionCache {
    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    fn sync(&mut self, generation: u64) {
        if self.generation != generation {
            trace!(from = self.generation, to = generation, dropped = self.entries.len(), "hierarchy changed");
            self.entries.clear();
            self.generation = generation;
        }
    }
}

impl TypeRegistry {
    /// `id` together with every ancestor type, memoized per type until the
    /// hierarchy's generation changes.
    pub fn expanded_types(&self, id: TypeId, hierarchy: &mut dyn TypeHierarchy) -> UnionType {
        {
            let mut cache = self.expansion_cache.borrow_mut();
            cache.sync(hierarchy.generation());
            if let Some(cached) = cache.entries.get(&id) {
                return cached.clone();
            }
        }
        let expanded = self.as_expanded_types(id, hierarchy, 0);
        // Expanding may autoload classes and move the generation on.
        let mut cache = self.expansion_cache.borrow_mut();
        cache.sync(hierarchy.generation());
        cache.entries.insert(id, expanded.clone());
        expanded
    }

    /// Unmemoized expansion starting at `depth`.
    ///
    /// Native non-array types expand to themselves. Class types pull in the
    /// class's declared union type and expand each member in turn, skipping
    /// only the start type itself. Generic arrays of classes expand their
    /// element type.
    ///
    /// Panics at `MAX_TYPE_EXPANSION_DEPTH`: the hierarchy is cyclic or
    /// pathologically deep.
    pub fn as_expanded_types(&self, id: TypeId, hierarchy: &mut dyn TypeHierarchy, depth: u32) -> UnionType {
        assert!(
            depth < MAX_TYPE_EXPANSION_DEPTH,
            "expanding {} exceeded the maximum type expansion depth of {}",
            self.type_key(id),
            MAX_TYPE_EXPANSION_DEPTH
        );
        let ty = self.get(id);
        let fqsen = match &ty.kind {
            TypeKind::Class { fqsen, .. } => fqsen.clone(),
            TypeKind::GenericArray { element, key } => {
                if self.class_fqsen(*element).is_none() && !self.is_generic_array_of_class(*element) {
                    return UnionType::of(id);
                }
                return self
                    .as_expanded_types(*element, hierarchy, depth + 1)
                    .map_types(|expanded| self.generic_array(expanded, *key, ty.nullable));
            }
            _ => return UnionType::of(id),
        };

        let mut result = UnionType::of(id);
        let Some(declared) = hierarchy.class_union_type(&fqsen) else {
            return result;
        };
        for member in declared.iter() {
            let member = if ty.nullable { self.with_is_nullable(member, true) } else { member };
            if member == id {
                continue;
            }
            if self.class_fqsen(member).as_ref() == Some(&fqsen) {
                result.add_type(member);
                continue;
            }
            result.add_union_type(&self.as_expanded_types(member, hierarchy, depth + 1));
        }
        result
    }

    fn is_generic_array_of_class(&self, id: TypeId) -> bool {
        match self.get(id).kind {
            TypeKind::GenericArray { element, .. } => {
                self.class_fqsen(element).is_some() || self.is_generic_array_of_class(element)
            }
            _ => false,
        }
    }
}

impl UnionType {
    /// Union of each member's expansion.
    pub fn as_expanded_types(&self, registry: &TypeRegistry, hierarchy: &mut dyn TypeHierarchy) -> UnionType {
        let mut result = UnionType::empty();
        for id in self.iter() {
            result.add_union_type(&registry.expanded_types(id, hierarchy));
        }
        result
    }

    /// Whether the expansion of `self` includes the class `fqsen`.
    pub fn has_ancestor(
        &self,
        registry: &TypeRegistry,
        hierarchy: &mut dyn TypeHierarchy,
        fqsen: &FullyQualifiedClassName,
    ) -> bool {
        self.as_expanded_types(registry, hierarchy)
            .iter()
            .any(|id| registry.class_fqsen(id).as_ref() == Some(fqsen))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::KeyKind;

    /// Classes keyed by lowercased name, each with its declared union.
    struct MapHierarchy {
        registry: std::rc::Rc<TypeRegistry>,
        parents: FxHashMap<String, Vec<String>>,
        lookups: usize,
        generation: u64,
    }

    impl MapHierarchy {
        /// `edges` pairs a class with its space-separated direct ancestors.
        fn new(registry: std::rc::Rc<TypeRegistry>, edges: &[(&str, &str)]) -> Self {
            let parents = edges
                .iter()
                .map(|(child, parents)| {
                    (child.to_ascii_lowercase(), parents.split_whitespace().map(str::to_string).collect())
                })
                .collect();
            Self { registry, parents, lookups: 0, generation: 0 }
        }
    }

    impl TypeHierarchy for MapHierarchy {
        fn class_union_type(&mut self, fqsen: &FullyQualifiedClassName) -> Option<UnionType> {
            self.lookups += 1;
            let parents = self.parents.get(&fqsen.name().to_ascii_lowercase())?;
            let mut union = UnionType::of(self.registry.class_type(fqsen));
            for parent in parents {
                union.add_type(self.registry.make("\\", parent, vec![], false));
            }
            Some(union)
        }

        fn generation(&self) -> u64 {
            self.generation
        }
    }

    #[test]
    fn test_native_expands_to_itself() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[]);
        assert!(registry.expanded_types(TypeId::INT, &mut hierarchy).is_type(TypeId::INT));
        let ints = registry.generic_array(TypeId::INT, KeyKind::Mixed, false);
        assert!(registry.expanded_types(ints, &mut hierarchy).is_type(ints));
        assert_eq!(hierarchy.lookups, 0);
    }

    #[test]
    fn test_class_expands_through_ancestors() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(
            registry.clone(),
            &[("C", "B Countable"), ("B", "A"), ("A", ""), ("Countable", "")],
        );
        let c = registry.make("\\", "C", vec![], false);
        let expanded = registry.expanded_types(c, &mut hierarchy);
        assert_eq!(expanded.display(&registry).to_string(), "\\A|\\B|\\C|\\Countable");

        let lookups = hierarchy.lookups;
        registry.expanded_types(c, &mut hierarchy);
        assert_eq!(hierarchy.lookups, lookups, "second expansion is memoized");
    }

    #[test]
    fn test_nullable_class_expands_nullable() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[("B", "A"), ("A", "")]);
        let b = registry.make("\\", "B", vec![], true);
        let expanded = registry.expanded_types(b, &mut hierarchy);
        assert_eq!(expanded.display(&registry).to_string(), "?\\A|?\\B");
    }

    #[test]
    fn test_array_of_class_expands_element() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[("B", "A"), ("A", "")]);
        let b = registry.make("\\", "B", vec![], false);
        let bs = registry.generic_array(b, KeyKind::Mixed, false);
        let expanded = registry.expanded_types(bs, &mut hierarchy);
        assert_eq!(expanded.display(&registry).to_string(), "\\A[]|\\B[]");
    }

    #[test]
    fn test_unknown_class_expands_to_itself() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[]);
        let ghost = registry.make("\\", "Ghost", vec![], false);
        assert!(registry.expanded_types(ghost, &mut hierarchy).is_type(ghost));
    }

    #[test]
    #[should_panic(expected = "maximum type expansion depth")]
    fn test_deep_chain_panics() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let names: Vec<String> = (0..=25).map(|i| format!("C{}", i)).collect();
        let edges: Vec<(&str, &str)> = (0..25).map(|i| (names[i].as_str(), names[i + 1].as_str())).collect();
        let mut hierarchy = MapHierarchy::new(registry.clone(), &edges);
        let start = registry.make("\\", "C0", vec![], false);
        registry.expanded_types(start, &mut hierarchy);
    }

    #[test]
    #[should_panic(expected = "maximum type expansion depth")]
    fn test_cycle_panics() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[("A", "B"), ("B", "A")]);
        let a = registry.make("\\", "A", vec![], false);
        registry.expanded_types(a, &mut hierarchy);
    }

    #[test]
    fn test_reset_clears_expansions() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[("B", "A"), ("A", "")]);
        let b = registry.make("\\", "B", vec![], false);
        registry.expanded_types(b, &mut hierarchy);
        registry.reset_all();
        let b = registry.make("\\", "B", vec![], false);
        let lookups = hierarchy.lookups;
        registry.expanded_types(b, &mut hierarchy);
        assert!(hierarchy.lookups > lookups);
    }

    #[test]
    fn test_generation_change_drops_expansions() {
        let registry = std::rc::Rc::new(TypeRegistry::new());
        let mut hierarchy = MapHierarchy::new(registry.clone(), &[("B", "A"), ("A", "")]);
        let b = registry.make("\\", "B", vec![], false);
        assert_eq!(registry.expanded_types(b, &mut hierarchy).display(&registry).to_string(), "\\A|\\B");

        hierarchy.parents.insert("b".to_string(), vec!["Z".to_string()]);
        hierarchy.parents.insert("z".to_string(), Vec::new());
        assert_eq!(
            registry.expanded_types(b, &mut hierarchy).display(&registry).to_string(),
            "\\A|\\B",
            "same generation answers from the cache"
        );

        hierarchy.generation += 1;
        assert_eq!(registry.expanded_types(b, &mut hierarchy).display(&registry).to_string(), "\\B|\\Z");
    }
}
