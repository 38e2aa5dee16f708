//! Union types: sets of interned types.
//!
//! A `UnionType` is a deduplicated set of `TypeId`s. The empty union means
//! "nothing is known" and is distinct from a union holding `null`. Set
//! operations are pure; queries that need to look inside member types take
//! the registry as an argument.

use crate::registry::TypeRegistry;
use crate::ty::{KeyKind, NativeKind, Scalar, Type, TypeId, TypeKind};
use crate::fqsen::FullyQualifiedClassName;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;
use std::fmt;
use strix_options::AnalysisOptions;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct UnionType {
    types: IndexSet<TypeId, FxBuildHasher>,
}

impl UnionType {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(id: TypeId) -> Self {
        let mut union = Self::empty();
        union.add_type(id);
        union
    }

    pub fn from_types(types: impl IntoIterator<Item = TypeId>) -> Self {
        types.into_iter().collect()
    }

    pub fn mixed() -> Self {
        Self::of(TypeId::MIXED)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.types.iter().copied()
    }

    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.types.contains(&id)
    }

    /// Exactly the single type `id`.
    pub fn is_type(&self, id: TypeId) -> bool {
        self.len() == 1 && self.contains(id)
    }

    /// The only member, if there is exactly one.
    pub fn single(&self) -> Option<TypeId> {
        if self.len() == 1 {
            self.types.first().copied()
        } else {
            None
        }
    }

    pub fn add_type(&mut self, id: TypeId) {
        self.types.insert(id);
    }

    pub fn add_union_type(&mut self, other: &UnionType) {
        self.types.extend(other.types.iter().copied());
    }

    pub fn remove_type(&mut self, id: TypeId) {
        self.types.shift_remove(&id);
    }

    pub fn with_type(&self, id: TypeId) -> UnionType {
        let mut union = self.clone();
        union.add_type(id);
        union
    }

    pub fn with_union_type(&self, other: &UnionType) -> UnionType {
        let mut union = self.clone();
        union.add_union_type(other);
        union
    }

    pub fn without_type(&self, id: TypeId) -> UnionType {
        let mut union = self.clone();
        union.remove_type(id);
        union
    }

    /// Members of `self` not in `other`.
    pub fn subtract(&self, other: &UnionType) -> UnionType {
        self.iter().filter(|id| !other.contains(*id)).collect()
    }

    pub fn filter(&self, mut keep: impl FnMut(TypeId) -> bool) -> UnionType {
        self.iter().filter(|id| keep(*id)).collect()
    }

    pub fn map_types(&self, f: impl FnMut(TypeId) -> TypeId) -> UnionType {
        self.iter().map(f).collect()
    }

    pub fn has_mixed(&self) -> bool {
        self.contains(TypeId::MIXED)
    }

    /// Sorted canonical rendering.
    pub fn display<'a>(&'a self, registry: &'a TypeRegistry) -> DisplayUnion<'a> {
        DisplayUnion { union: self, registry }
    }

    // ========================================================================
    // Construction from scalars
    // ========================================================================

    /// Type of a literal runtime scalar. Literal types are used when
    /// `literal_scalar_types` is set and the string is short enough.
    pub fn from_scalar(registry: &TypeRegistry, scalar: &Scalar, options: &AnalysisOptions) -> UnionType {
        let id = match scalar {
            Scalar::Int(value) if options.literal_scalar_types => registry.literal_int(*value, false),
            Scalar::Int(_) => TypeId::INT,
            Scalar::Float(_) => TypeId::FLOAT,
            Scalar::String(value)
                if options.literal_scalar_types && value.len() <= options.max_literal_string_length =>
            {
                registry.literal_string(value, false)
            }
            Scalar::String(_) => TypeId::STRING,
            Scalar::Bool(true) => TypeId::TRUE,
            Scalar::Bool(false) => TypeId::FALSE,
            Scalar::Null => TypeId::NULL,
        };
        UnionType::of(id)
    }

    // ========================================================================
    // Member queries
    // ========================================================================

    pub fn has_type_matching(&self, registry: &TypeRegistry, pred: impl Fn(&Type) -> bool) -> bool {
        self.iter().any(|id| pred(&registry.get(id)))
    }

    /// Non-empty, and every member satisfies `pred`.
    pub fn is_exclusively(&self, registry: &TypeRegistry, pred: impl Fn(&Type) -> bool) -> bool {
        !self.is_empty() && self.iter().all(|id| pred(&registry.get(id)))
    }

    pub fn contains_nullable(&self, registry: &TypeRegistry) -> bool {
        self.iter().any(|id| registry.is_nullable(id))
    }

    /// Only `null` (or nothing but nullable `null`-like members).
    pub fn is_null(&self) -> bool {
        self.is_type(TypeId::NULL)
    }

    pub fn nullable_clone(&self, registry: &TypeRegistry) -> UnionType {
        self.map_types(|id| registry.with_is_nullable(id, true))
    }

    /// Drops `null` and clears the nullable flag on every member.
    pub fn non_nullable_clone(&self, registry: &TypeRegistry) -> UnionType {
        self.iter()
            .filter(|id| *id != TypeId::NULL)
            .map(|id| registry.with_is_nullable(id, false))
            .collect()
    }

    pub fn has_array_like(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_array_like)
    }

    /// Every member is array-like or `null`.
    pub fn is_exclusively_array_like(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, |ty| ty.is_array_like() || ty.is_native(NativeKind::Null))
    }

    pub fn has_array_shape(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, |ty| matches!(ty.kind, TypeKind::ArrayShape(_)))
    }

    pub fn has_generic_array(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, |ty| matches!(ty.kind, TypeKind::GenericArray { .. }))
    }

    pub fn has_class_like(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, |ty| ty.class_fqsen().is_some())
    }

    pub fn has_object_like(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_object_like)
    }

    pub fn has_template_type(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_template)
    }

    pub fn has_static_type(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_static_like)
    }

    pub fn has_int_like(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_int_like)
    }

    pub fn has_float(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, |ty| ty.is_native(NativeKind::Float))
    }

    pub fn has_string_like(&self, registry: &TypeRegistry) -> bool {
        self.has_type_matching(registry, Type::is_string_like)
    }

    pub fn is_exclusively_int_like(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, Type::is_int_like)
    }

    pub fn is_exclusively_float(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, |ty| ty.is_native(NativeKind::Float))
    }

    pub fn is_exclusively_string_like(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, Type::is_string_like)
    }

    pub fn is_exclusively_scalar(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, Type::is_scalar)
    }

    /// Distinct class names of the class-like members, in member order.
    pub fn class_fqsens(&self, registry: &TypeRegistry) -> Vec<FullyQualifiedClassName> {
        let mut out: Vec<FullyQualifiedClassName> = Vec::new();
        for id in self.iter() {
            if let Some(fqsen) = registry.class_fqsen(id) {
                if !out.contains(&fqsen) {
                    out.push(fqsen);
                }
            }
        }
        out
    }

    /// Members that are neither array-like nor `null`.
    pub fn non_array_like(&self, registry: &TypeRegistry) -> UnionType {
        self.filter(|id| {
            let ty = registry.get(id);
            !ty.is_array_like() && !ty.is_native(NativeKind::Null)
        })
    }

    /// `1` becomes `int`, `'x'` becomes `string`.
    pub fn literals_as_natives(&self, registry: &TypeRegistry) -> UnionType {
        self.map_types(|id| registry.literal_as_native(id))
    }

    // ========================================================================
    // Array element and key extraction
    // ========================================================================

    /// Element types of the array members.
    ///
    /// The bare `array` or `mixed` widens the result to `mixed`. Shapes
    /// contribute the union of their field types. Non-array members are
    /// dropped.
    pub fn generic_array_element_types(&self, registry: &TypeRegistry) -> UnionType {
        let mut result = UnionType::empty();
        for id in self.iter() {
            let ty = registry.get(id);
            match &ty.kind {
                TypeKind::Native(NativeKind::Array | NativeKind::Mixed) => return UnionType::mixed(),
                TypeKind::GenericArray { element, .. } => result.add_type(*element),
                TypeKind::ArrayShape(fields) => {
                    for field in fields.values() {
                        result.add_union_type(&field.union_type);
                    }
                }
                _ => {}
            }
        }
        result
    }

    /// Value types produced by iterating: array elements, plus `mixed` for
    /// `iterable` and class-like members.
    pub fn iterable_value_types(&self, registry: &TypeRegistry) -> UnionType {
        let mut result = self.generic_array_element_types(registry);
        if self.has_type_matching(registry, |ty| ty.is_native(NativeKind::Iterable) || ty.is_object_like()) {
            result.add_type(TypeId::MIXED);
        }
        result
    }

    /// Combined key kind of the array members, `None` if there are none.
    pub fn array_key_kind(&self, registry: &TypeRegistry) -> Option<KeyKind> {
        self.iter()
            .filter_map(|id| {
                let ty = registry.get(id);
                match &ty.kind {
                    TypeKind::Native(NativeKind::Array | NativeKind::Iterable) => Some(KeyKind::Mixed),
                    TypeKind::GenericArray { key, .. } => Some(*key),
                    TypeKind::ArrayShape(fields) => Some(KeyKind::of_keys(fields.keys()).unwrap_or(KeyKind::Mixed)),
                    _ => None,
                }
            })
            .reduce(KeyKind::merge)
    }

    /// Key types as a union: `int`, `string`, or `int|string`.
    pub fn iterable_key_types(&self, registry: &TypeRegistry) -> UnionType {
        key_kind_union(self.array_key_kind(registry).unwrap_or(KeyKind::Mixed))
    }
}

/// `int`, `string`, or `int|string` for a key kind.
pub fn key_kind_union(kind: KeyKind) -> UnionType {
    match kind {
        KeyKind::Int => UnionType::of(TypeId::INT),
        KeyKind::String => UnionType::of(TypeId::STRING),
        KeyKind::Mixed => UnionType::from_types([TypeId::INT, TypeId::STRING]),
    }
}

impl FromIterator<TypeId> for UnionType {
    fn from_iter<I: IntoIterator<Item = TypeId>>(iter: I) -> Self {
        let mut union = UnionType::empty();
        union.types.extend(iter);
        union
    }
}

impl Extend<TypeId> for UnionType {
    fn extend<I: IntoIterator<Item = TypeId>>(&mut self, iter: I) {
        self.types.extend(iter);
    }
}

impl From<TypeId> for UnionType {
    fn from(id: TypeId) -> Self {
        UnionType::of(id)
    }
}

impl fmt::Debug for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.types.iter().map(|id| id.0)).finish()
    }
}

/// Renders a union with members sorted by canonical key and joined by `|`.
pub struct DisplayUnion<'a> {
    union: &'a UnionType,
    registry: &'a TypeRegistry,
}

impl fmt::Display for DisplayUnion<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<String> = self.union.iter().map(|id| self.registry.type_key(id)).collect();
        keys.sort();
        f.write_str(&keys.join("|"))
    }
}
