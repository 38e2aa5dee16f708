//! Array-shape helpers.

use crate::registry::TypeRegistry;
use crate::ty::{KeyKind, ShapeFields, ShapeKey, TypeId, TypeKind};
use crate::union::UnionType;

impl TypeRegistry {
    /// Generic-array approximation of a shape: one `array<K,V>` per
    /// distinct (widened) field type, where `K` is the key kind shared by
    /// the shape's keys. The empty shape flattens to `array`.
    pub fn flatten_array_shape(&self, fields: &ShapeFields, nullable: bool) -> UnionType {
        let Some(key) = KeyKind::of_keys(fields.keys()) else {
            return UnionType::of(self.native(crate::ty::NativeKind::Array, nullable));
        };
        let mut result = UnionType::empty();
        for field in fields.values() {
            let element_types = if field.union_type.is_empty() {
                UnionType::mixed()
            } else {
                field.union_type.literals_as_natives(self)
            };
            for element in element_types.iter() {
                result.add_type(self.generic_array(element, key, nullable));
            }
        }
        result
    }
}

impl UnionType {
    /// Replace every array-shape member with its generic-array approximation.
    pub fn flatten_array_shapes(&self, registry: &TypeRegistry) -> UnionType {
        if !self.has_array_shape(registry) {
            return self.clone();
        }
        let mut result = UnionType::empty();
        for id in self.iter() {
            let ty = registry.get(id);
            match &ty.kind {
                TypeKind::ArrayShape(fields) => {
                    result.add_union_type(&registry.flatten_array_shape(fields, ty.nullable));
                }
                _ => result.add_type(id),
            }
        }
        result
    }

    /// Union of the field types stored under `key` in the shape members.
    /// `None` when no shape member declares the key.
    pub fn shape_field_types(&self, registry: &TypeRegistry, key: &ShapeKey) -> Option<UnionType> {
        let mut found = false;
        let mut result = UnionType::empty();
        for id in self.iter() {
            if let TypeKind::ArrayShape(fields) = &registry.get(id).kind {
                if let Some(field) = fields.get(key) {
                    found = true;
                    result.add_union_type(&field.union_type);
                }
            }
        }
        found.then_some(result)
    }

    /// Members other than array shapes.
    pub fn without_array_shapes(&self, registry: &TypeRegistry) -> UnionType {
        self.filter(|id| !matches!(registry.get(id).kind, TypeKind::ArrayShape(_)))
    }

    /// `mixed` for an empty union, otherwise `self`.
    pub fn or_mixed(self) -> UnionType {
        if self.is_empty() {
            UnionType::mixed()
        } else {
            self
        }
    }

    /// Whether this union is exactly the key type `int` or `string` (or a literal of either).
    pub fn is_array_key_like(&self, registry: &TypeRegistry) -> bool {
        self.is_exclusively(registry, |ty| ty.is_int_like() || ty.is_string_like())
    }

    /// `int[]`-style generic arrays of `elements`.
    pub fn as_generic_array_types(&self, registry: &TypeRegistry, key: KeyKind) -> UnionType {
        self.map_types(|id| registry.generic_array(id, key, false))
    }

    pub fn is_bare_array(&self) -> bool {
        self.is_type(TypeId::ARRAY)
    }
}
