//! Template substitution and `static`/`self` resolution.

use crate::fqsen::FullyQualifiedClassName;
use crate::registry::TypeRegistry;
use crate::ty::{ClosureParam, ClosureSignature, ShapeField, TypeId, TypeKind};
use crate::union::UnionType;
use rustc_hash::FxHashMap;

/// Bindings from template names to concrete union types.
pub type TemplateTypeMap = FxHashMap<String, UnionType>;

impl TypeRegistry {
    /// Replace template placeholders inside `id` using `map`. Unbound
    /// placeholders are left in place.
    pub fn with_template_parameter_type_map(&self, id: TypeId, map: &TemplateTypeMap) -> UnionType {
        let ty = self.get(id);
        match &ty.kind {
            TypeKind::Template { name } => match map.get(name) {
                Some(bound) if ty.nullable => bound.nullable_clone(self),
                Some(bound) => bound.clone(),
                None => UnionType::of(id),
            },
            TypeKind::GenericArray { element, key } => {
                let elements = self.with_template_parameter_type_map(*element, map);
                let elements = if elements.is_empty() { UnionType::mixed() } else { elements };
                elements.map_types(|e| self.generic_array(e, *key, ty.nullable))
            }
            TypeKind::ArrayShape(fields) => {
                let fields = fields
                    .iter()
                    .map(|(key, field)| {
                        (
                            key.clone(),
                            ShapeField {
                                union_type: field.union_type.with_template_parameter_type_map(self, map),
                                possibly_undefined: field.possibly_undefined,
                            },
                        )
                    })
                    .collect();
                UnionType::of(self.array_shape(fields, ty.nullable))
            }
            TypeKind::Class { fqsen, template_args } if !template_args.is_empty() => {
                let args = template_args
                    .iter()
                    .map(|arg| arg.with_template_parameter_type_map(self, map))
                    .collect();
                UnionType::of(self.make(fqsen.namespace(), fqsen.name(), args, ty.nullable))
            }
            TypeKind::Closure(sig) => {
                let params = sig
                    .params
                    .iter()
                    .map(|param| ClosureParam {
                        union_type: param.union_type.with_template_parameter_type_map(self, map),
                        ..param.clone()
                    })
                    .collect();
                let sig = ClosureSignature {
                    is_closure: sig.is_closure,
                    params,
                    return_type: sig.return_type.with_template_parameter_type_map(self, map),
                };
                UnionType::of(self.closure(sig, ty.nullable))
            }
            _ => UnionType::of(id),
        }
    }

    /// Collect the names of template placeholders anywhere inside `id`.
    pub fn collect_template_names(&self, id: TypeId, out: &mut Vec<String>) {
        let ty = self.get(id);
        let nested = |union_type: &UnionType, out: &mut Vec<String>| {
            for member in union_type.iter() {
                self.collect_template_names(member, out);
            }
        };
        match &ty.kind {
            TypeKind::Template { name } => {
                if !out.contains(name) {
                    out.push(name.clone());
                }
            }
            TypeKind::GenericArray { element, .. } => self.collect_template_names(*element, out),
            TypeKind::ArrayShape(fields) => {
                for field in fields.values() {
                    nested(&field.union_type, out);
                }
            }
            TypeKind::Class { template_args, .. } => {
                for arg in template_args {
                    nested(arg, out);
                }
            }
            TypeKind::Closure(sig) => {
                for param in &sig.params {
                    nested(&param.union_type, out);
                }
                nested(&sig.return_type, out);
            }
            _ => {}
        }
    }

    /// Replace `static` and `self` inside `id` with `class_type`, keeping
    /// nullability.
    pub fn with_static_resolved(&self, id: TypeId, class_type: TypeId) -> TypeId {
        let ty = self.get(id);
        match &ty.kind {
            _ if ty.is_static_like() => self.with_is_nullable(class_type, ty.nullable),
            TypeKind::GenericArray { element, key } => {
                let element = self.with_static_resolved(*element, class_type);
                self.generic_array(element, *key, ty.nullable)
            }
            TypeKind::ArrayShape(fields) => {
                let fields = fields
                    .iter()
                    .map(|(key, field)| {
                        (
                            key.clone(),
                            ShapeField {
                                union_type: field.union_type.map_types(|m| self.with_static_resolved(m, class_type)),
                                possibly_undefined: field.possibly_undefined,
                            },
                        )
                    })
                    .collect();
                self.array_shape(fields, ty.nullable)
            }
            _ => id,
        }
    }
}

impl UnionType {
    pub fn with_template_parameter_type_map(&self, registry: &TypeRegistry, map: &TemplateTypeMap) -> UnionType {
        if map.is_empty() {
            return self.clone();
        }
        let mut result = UnionType::empty();
        for id in self.iter() {
            result.add_union_type(&registry.with_template_parameter_type_map(id, map));
        }
        result
    }

    /// Template names used anywhere in the union, in first-seen order.
    pub fn template_names(&self, registry: &TypeRegistry) -> Vec<String> {
        let mut names = Vec::new();
        for id in self.iter() {
            registry.collect_template_names(id, &mut names);
        }
        names
    }

    /// Resolve `static`/`self` to `class`.
    pub fn with_static_resolved(&self, registry: &TypeRegistry, class: &FullyQualifiedClassName) -> UnionType {
        let class_type = registry.class_type(class);
        self.map_types(|id| registry.with_static_resolved(id, class_type))
    }

    /// Record template bindings implied by passing `actual` where `self`
    /// is declared. `T` binds to the argument's type (literals widened),
    /// `T[]` binds to the element types, and `\Box<T>` binds against the
    /// template arguments of a matching `\Box<...>` argument.
    pub fn bind_templates(&self, actual: &UnionType, registry: &TypeRegistry, out: &mut TemplateTypeMap) {
        if actual.is_empty() {
            return;
        }
        for declared in self.iter() {
            let ty = registry.get(declared);
            match &ty.kind {
                TypeKind::Template { name } => {
                    let bound = actual.literals_as_natives(registry).non_nullable_clone(registry);
                    out.entry(name.clone()).or_default().add_union_type(&bound);
                }
                TypeKind::GenericArray { element, .. } => {
                    let elements = actual.generic_array_element_types(registry).literals_as_natives(registry);
                    UnionType::of(*element).bind_templates(&elements, registry, out);
                }
                TypeKind::Class { fqsen, template_args } if !template_args.is_empty() => {
                    for candidate in actual.iter() {
                        let candidate_ty = registry.get(candidate);
                        if let TypeKind::Class { fqsen: actual_fqsen, template_args: actual_args } = &candidate_ty.kind {
                            if actual_fqsen == fqsen {
                                for (param, arg) in template_args.iter().zip(actual_args) {
                                    param.bind_templates(arg, registry, out);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::KeyKind;

    #[test]
    fn test_substitution() {
        let registry = TypeRegistry::new();
        let t = registry.template("T");
        let mut map = TemplateTypeMap::default();
        map.insert("T".to_string(), UnionType::of(TypeId::INT));

        let ts = registry.generic_array(t, KeyKind::Mixed, false);
        let boxed = registry.make("\\", "Box", vec![UnionType::of(t)], false);
        let union = UnionType::from_types([t, ts, boxed, TypeId::STRING]);
        let substituted = union.with_template_parameter_type_map(&registry, &map);
        assert_eq!(substituted.display(&registry).to_string(), "\\Box<int>|int|int[]|string");

        let unbound = UnionType::of(registry.template("U")).with_template_parameter_type_map(&registry, &map);
        assert_eq!(unbound.display(&registry).to_string(), "U");
    }

    #[test]
    fn test_template_names_are_found_when_nested() {
        let registry = TypeRegistry::new();
        let t = registry.template("T");
        let u = registry.template("U");
        let ts = registry.generic_array(t, KeyKind::Mixed, false);
        let boxed = registry.make("\\", "Box", vec![UnionType::from_types([u, t])], false);
        let union = UnionType::from_types([ts, boxed, TypeId::INT]);
        assert_eq!(union.template_names(&registry), vec!["T".to_string(), "U".to_string()]);
        assert!(UnionType::of(TypeId::INT).template_names(&registry).is_empty());
    }

    #[test]
    fn test_static_resolution() {
        let registry = TypeRegistry::new();
        let class = FullyQualifiedClassName::from_full_name("\\App\\Model");
        let statics = registry.generic_array(TypeId::STATIC, KeyKind::Mixed, false);
        let nullable_static = registry.with_is_nullable(TypeId::STATIC, true);
        let union = UnionType::from_types([nullable_static, statics, TypeId::INT]);
        let resolved = union.with_static_resolved(&registry, &class);
        assert_eq!(resolved.display(&registry).to_string(), "?\\App\\Model|\\App\\Model[]|int");
        assert!(!resolved.has_static_type(&registry));
    }

    #[test]
    fn test_bind_templates() {
        let registry = TypeRegistry::new();
        let t = registry.template("T");
        let mut out = TemplateTypeMap::default();
        UnionType::of(t).bind_templates(&UnionType::of(registry.literal_int(3, false)), &registry, &mut out);
        assert!(out["T"].is_type(TypeId::INT));

        let mut out = TemplateTypeMap::default();
        let ts = registry.generic_array(t, KeyKind::Mixed, false);
        let strings = registry.generic_array(TypeId::STRING, KeyKind::Int, false);
        UnionType::of(ts).bind_templates(&UnionType::of(strings), &registry, &mut out);
        assert!(out["T"].is_type(TypeId::STRING));

        let mut out = TemplateTypeMap::default();
        let declared = registry.make("\\", "Box", vec![UnionType::of(t)], false);
        let actual = registry.make("\\", "Box", vec![UnionType::of(TypeId::FLOAT)], false);
        UnionType::of(declared).bind_templates(&UnionType::of(actual), &registry, &mut out);
        assert!(out["T"].is_type(TypeId::FLOAT));
    }
}
