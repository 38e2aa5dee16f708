//! Cast compatibility between types.
//!
//! `can_cast_to_type` answers "may a value of the source type be used where
//! the target type is expected". Only the source's nullability gates the
//! answer; the core comparison then runs on both types with nullability
//! stripped, through a fixed matrix of native cross-casts.

use crate::expand::TypeHierarchy;
use crate::registry::TypeRegistry;
use crate::ty::{KeyKind, NativeKind, TypeId, TypeKind};
use crate::union::UnionType;

const TRAVERSABLE_CLASSES: [&str; 4] = ["Traversable", "Iterator", "IteratorAggregate", "Generator"];

impl TypeRegistry {
    pub fn can_cast_to_type(&self, source: TypeId, target: TypeId) -> bool {
        if source == target {
            return true;
        }
        let source_ty = self.get(source);
        let target_ty = self.get(target);
        if target_ty.is_native(NativeKind::Mixed) || source_ty.is_native(NativeKind::Mixed) {
            return true;
        }
        if source_ty.is_native(NativeKind::Null) {
            return self.is_nullable(target) || self.null_casts_as_any_type();
        }
        if source_ty.nullable && !self.is_nullable(target) && !self.null_casts_as_any_type() {
            return false;
        }
        self.can_cast_kind(&source_ty.kind, &target_ty.kind)
    }

    fn can_cast_kind(&self, source: &TypeKind, target: &TypeKind) -> bool {
        use NativeKind as N;
        use TypeKind as K;

        match (source, target) {
            (K::Native(a), K::Native(b)) if a == b => true,
            (K::Template { .. }, _) | (_, K::Template { .. }) => true,

            // Natives
            (K::Native(N::Int), K::Native(N::Float)) => true,
            (K::Native(N::True | N::False), K::Native(N::Bool)) => true,
            (K::Native(N::Bool), K::Native(N::True | N::False)) => true,
            (K::Native(a), K::Native(N::Scalar)) if a.is_scalar() => true,
            (K::Native(N::Scalar), K::Native(b)) if b.is_scalar() => true,
            (K::Native(N::Array), K::Native(N::Iterable)) => true,
            (K::Native(N::String | N::Array), K::Native(N::Callable)) => true,
            (K::Native(N::Static | N::SelfType), K::Native(N::Static | N::SelfType | N::Object)) => true,
            (K::Native(N::Static | N::SelfType), K::Class { .. }) => true,
            (K::Class { .. }, K::Native(N::Static | N::SelfType)) => true,

            // Literals
            (K::LiteralInt(_), K::Native(N::Int | N::Float | N::Scalar)) => true,
            (K::LiteralString(_), K::Native(N::String | N::Scalar | N::Callable)) => true,
            (K::Native(N::Int), K::LiteralInt(_)) => true,
            (K::Native(N::String), K::LiteralString(_)) => true,

            // Arrays
            (K::GenericArray { .. } | K::ArrayShape(_), K::Native(N::Array | N::Iterable)) => true,
            (K::Native(N::Array), K::GenericArray { .. } | K::ArrayShape(_)) => true,
            (K::GenericArray { element: e1, key: k1 }, K::GenericArray { element: e2, key: k2 }) => {
                key_kind_casts(*k1, *k2) && self.can_cast_to_type(*e1, *e2)
            }
            (K::ArrayShape(fields), K::GenericArray { element, key }) => {
                let element = UnionType::of(*element);
                fields.iter().all(|(field_key, field)| {
                    key_kind_casts(field_key.key_kind(), *key) && field.union_type.can_cast_to_union_type(&element, self)
                })
            }
            (K::GenericArray { element, .. }, K::ArrayShape(fields)) => {
                let element = UnionType::of(*element);
                fields.values().all(|field| element.can_cast_to_union_type(&field.union_type, self))
            }
            (K::ArrayShape(from), K::ArrayShape(to)) => to.iter().all(|(key, expected)| match from.get(key) {
                Some(actual) => actual.union_type.can_cast_to_union_type(&expected.union_type, self),
                None => expected.possibly_undefined,
            }),
            (K::Native(N::Iterable) | K::GenericArray { .. } | K::ArrayShape(_), K::Class { fqsen, .. }) => {
                fqsen.is("Traversable")
            }
            (K::Class { fqsen, .. }, K::Native(N::Iterable)) => {
                TRAVERSABLE_CLASSES.iter().any(|name| fqsen.is(name))
            }

            // Callables and closures
            (K::Native(N::Callable), K::Closure(_)) | (K::Closure(_), K::Native(N::Callable)) => true,
            (K::Native(N::Callable), K::Class { fqsen, .. }) | (K::Class { fqsen, .. }, K::Native(N::Callable)) => {
                fqsen.is("Closure")
            }
            (K::Closure(_), K::Class { fqsen, .. }) | (K::Class { fqsen, .. }, K::Closure(_)) => fqsen.is("Closure"),
            (K::Closure(a), K::Closure(b)) => a.return_type.can_cast_to_union_type(&b.return_type, self),
            (K::Closure(sig), K::Native(N::Object)) => sig.is_closure,

            // Objects
            (K::Class { .. }, K::Native(N::Object)) => true,
            (K::Native(N::Object), K::Class { .. }) => true,
            (
                K::Class { fqsen: a, template_args: args_a },
                K::Class { fqsen: b, template_args: args_b },
            ) => {
                a == b
                    && (args_a.is_empty()
                        || args_b.is_empty()
                        || (args_a.len() == args_b.len()
                            && args_a
                                .iter()
                                .zip(args_b)
                                .all(|(x, y)| x.can_cast_to_union_type(y, self))))
            }

            _ => false,
        }
    }
}

fn key_kind_casts(source: KeyKind, target: KeyKind) -> bool {
    source == target || source == KeyKind::Mixed || target == KeyKind::Mixed
}

impl UnionType {
    /// Whether any member of `self` can cast to any member of `target`.
    ///
    /// Empty unions on either side are permissive, as is `mixed` on either
    /// side.
    pub fn can_cast_to_union_type(&self, target: &UnionType, registry: &TypeRegistry) -> bool {
        if self.is_empty() || target.is_empty() || self == target {
            return true;
        }
        if self.has_mixed() || target.has_mixed() {
            return true;
        }
        if registry.null_casts_as_any_type() && self.is_null() {
            return true;
        }
        self.iter()
            .any(|source| target.iter().any(|candidate| registry.can_cast_to_type(source, candidate)))
    }

    /// Like `can_cast_to_union_type`, after expanding `self` through the
    /// class hierarchy so a subclass is accepted where an ancestor is expected.
    pub fn can_cast_to_expanded_union_type(
        &self,
        target: &UnionType,
        registry: &TypeRegistry,
        hierarchy: &mut dyn TypeHierarchy,
    ) -> bool {
        if self.can_cast_to_union_type(target, registry) {
            return true;
        }
        self.as_expanded_types(registry, hierarchy)
            .can_cast_to_union_type(target, registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::{ClosureParam, ClosureSignature, ShapeField, ShapeFields, ShapeKey};

    fn class(registry: &TypeRegistry, name: &str) -> TypeId {
        registry.make("\\", name, vec![], false)
    }

    #[test]
    fn test_reflexive_and_mixed() {
        let registry = TypeRegistry::new();
        let user = class(&registry, "User");
        let nullable_user = registry.with_is_nullable(user, true);
        let ints = registry.generic_array(TypeId::INT, KeyKind::Mixed, false);
        for id in [TypeId::INT, TypeId::NULL, user, nullable_user, ints, TypeId::VOID] {
            assert!(registry.can_cast_to_type(id, id));
            assert!(registry.can_cast_to_type(id, TypeId::MIXED));
        }
    }

    #[test]
    fn test_nullable_source_gated() {
        let registry = TypeRegistry::new();
        let nullable_int = registry.native(NativeKind::Int, true);
        assert!(!registry.can_cast_to_type(nullable_int, TypeId::INT));
        assert!(registry.can_cast_to_type(TypeId::INT, nullable_int));
        assert!(!registry.can_cast_to_type(TypeId::NULL, TypeId::INT));
        registry.set_null_casts_as_any_type(true);
        assert!(registry.can_cast_to_type(nullable_int, TypeId::INT));
        assert!(registry.can_cast_to_type(TypeId::NULL, TypeId::INT));
    }

    #[test]
    fn test_native_matrix() {
        let registry = TypeRegistry::new();
        assert!(registry.can_cast_to_type(TypeId::INT, TypeId::FLOAT));
        assert!(!registry.can_cast_to_type(TypeId::FLOAT, TypeId::INT));
        assert!(registry.can_cast_to_type(TypeId::TRUE, TypeId::BOOL));
        assert!(registry.can_cast_to_type(TypeId::ARRAY, TypeId::ITERABLE));
        assert!(!registry.can_cast_to_type(TypeId::ITERABLE, TypeId::ARRAY));
        assert!(!registry.can_cast_to_type(TypeId::INT, TypeId::OBJECT));
        assert!(!registry.can_cast_to_type(TypeId::STRING, TypeId::INT));
        assert!(registry.can_cast_to_type(TypeId::ITERABLE, class(&registry, "Traversable")));
        assert!(registry.can_cast_to_type(TypeId::CALLABLE, class(&registry, "Closure")));
        assert!(registry.can_cast_to_type(class(&registry, "User"), TypeId::OBJECT));
        assert!(!registry.can_cast_to_type(class(&registry, "User"), class(&registry, "Admin")));
    }

    #[test]
    fn test_literal_casts() {
        let registry = TypeRegistry::new();
        let one = registry.literal_int(1, false);
        let two = registry.literal_int(2, false);
        assert!(registry.can_cast_to_type(one, TypeId::INT));
        assert!(registry.can_cast_to_type(one, TypeId::FLOAT));
        assert!(registry.can_cast_to_type(TypeId::INT, one));
        assert!(!registry.can_cast_to_type(one, two));
        assert!(!registry.can_cast_to_type(one, TypeId::STRING));
    }

    #[test]
    fn test_array_casts() {
        let registry = TypeRegistry::new();
        let ints = registry.generic_array(TypeId::INT, KeyKind::Mixed, false);
        let floats = registry.generic_array(TypeId::FLOAT, KeyKind::Mixed, false);
        let strings = registry.generic_array(TypeId::STRING, KeyKind::Int, false);
        assert!(registry.can_cast_to_type(ints, floats));
        assert!(!registry.can_cast_to_type(ints, strings));
        assert!(registry.can_cast_to_type(ints, TypeId::ARRAY));
        assert!(registry.can_cast_to_type(TypeId::ARRAY, ints));

        let mut fields = ShapeFields::new();
        fields.insert(ShapeKey::Int(0), ShapeField::new(UnionType::of(registry.literal_int(1, false))));
        let shape = registry.array_shape(fields, false);
        assert!(registry.can_cast_to_type(shape, ints));
        assert!(!registry.can_cast_to_type(shape, strings));
        assert!(registry.can_cast_to_type(shape, TypeId::ITERABLE));
    }

    #[test]
    fn test_closure_casts() {
        let registry = TypeRegistry::new();
        let closure = registry.closure(
            ClosureSignature {
                is_closure: true,
                params: vec![ClosureParam::new(UnionType::of(TypeId::INT))],
                return_type: UnionType::of(TypeId::INT),
            },
            false,
        );
        assert!(registry.can_cast_to_type(closure, TypeId::CALLABLE));
        assert!(registry.can_cast_to_type(closure, class(&registry, "Closure")));
        assert!(registry.can_cast_to_type(closure, TypeId::OBJECT));
        assert!(registry.can_cast_to_type(TypeId::CALLABLE, closure));
    }

    #[test]
    fn test_union_casts() {
        let registry = TypeRegistry::new();
        let int_or_string = UnionType::from_types([TypeId::INT, TypeId::STRING]);
        assert!(int_or_string.can_cast_to_union_type(&UnionType::of(TypeId::STRING), &registry));
        assert!(!UnionType::of(TypeId::ARRAY).can_cast_to_union_type(&int_or_string, &registry));
        assert!(UnionType::empty().can_cast_to_union_type(&int_or_string, &registry));
        assert!(int_or_string.can_cast_to_union_type(&UnionType::empty(), &registry));
        assert!(UnionType::mixed().can_cast_to_union_type(&int_or_string, &registry));
        assert!(!UnionType::of(TypeId::NULL).can_cast_to_union_type(&int_or_string, &registry));
        registry.set_null_casts_as_any_type(true);
        assert!(UnionType::of(TypeId::NULL).can_cast_to_union_type(&int_or_string, &registry));
    }
}
