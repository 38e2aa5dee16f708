//! Array literals and index fetches.

use crate::failure::AnalysisResult;
use crate::union_type_visitor::{required, UnionTypeVisitor};
use strix_ast::{Child, Node, NodeKind};
use strix_diagnostics::issues;
use strix_types::{
    key_kind_union, FullyQualifiedClassName, KeyKind, NativeKind, ShapeField, ShapeFields, ShapeKey, TypeId,
    TypeKind, UnionType,
};

/// What an array literal's elements told us about its keys.
struct LiteralKeys {
    fields: ShapeFields,
    values: UnionType,
    key_kind: Option<KeyKind>,
    next_index: i64,
    /// Cleared by a non-literal key, a repeated key or an unpack.
    is_shape: bool,
}

impl LiteralKeys {
    fn new() -> Self {
        Self {
            fields: ShapeFields::new(),
            values: UnionType::empty(),
            key_kind: None,
            next_index: 0,
            is_shape: true,
        }
    }

    fn add_key_kind(&mut self, kind: KeyKind) {
        self.key_kind = Some(match self.key_kind {
            Some(existing) => existing.merge(kind),
            None => kind,
        });
    }

    fn add(&mut self, key: Option<ShapeKey>, key_kind: KeyKind, value: UnionType) {
        self.add_key_kind(key_kind);
        self.values.add_union_type(&value.clone().or_mixed());
        let Some(key) = key else {
            self.is_shape = false;
            return;
        };
        if let ShapeKey::Int(index) = key {
            self.next_index = self.next_index.max(index.saturating_add(1));
        }
        if self.fields.contains_key(&key) {
            self.is_shape = false;
        }
        self.fields.insert(key, ShapeField::new(value.or_mixed()));
    }
}

impl UnionTypeVisitor<'_, '_> {
    /// `[...]`: an exact shape when every key is a distinct literal,
    /// otherwise a generic array over the widened element types.
    pub(crate) fn visit_array(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let mut keys = LiteralKeys::new();
        for element in node.list() {
            let Some(element) = element.as_node() else {
                continue;
            };
            if element.is(NodeKind::Unpack) {
                keys.is_shape = false;
                self.add_unpacked(element, &mut keys)?;
                continue;
            }
            let value = self.visit(required(element, "value")?)?;
            match element.child("key").filter(|k| !k.is_null()) {
                None => {
                    let index = keys.next_index;
                    keys.add(Some(ShapeKey::Int(index)), KeyKind::Int, value);
                }
                Some(key_child) => {
                    let key_type = self.visit(key_child)?;
                    let key = self.literal_key(key_child, &key_type);
                    let key_kind = match &key {
                        Some(key) => key.key_kind(),
                        None => self.key_kind_of_type(&key_type),
                    };
                    keys.add(key, key_kind, value);
                }
            }
        }

        if keys.is_shape {
            return Ok(UnionType::of(registry.array_shape(keys.fields, false)));
        }
        let key_kind = keys.key_kind.unwrap_or(KeyKind::Int);
        let elements = keys.values.literals_as_natives(registry).or_mixed();
        Ok(elements.as_generic_array_types(registry, key_kind))
    }

    /// `...$expr` inside an array literal.
    fn add_unpacked(&mut self, element: &Node<'_>, keys: &mut LiteralKeys) -> AnalysisResult<()> {
        let registry = self.registry();
        let unpacked = self.visit(required(element, "expr")?)?;
        if unpacked.is_empty() || unpacked.has_mixed() {
            keys.add_key_kind(KeyKind::Int);
            keys.values.add_type(TypeId::MIXED);
            return Ok(());
        }
        let iterable = unpacked.has_type_matching(registry, |ty| ty.is_iterable_like() || ty.is_object_like());
        if !iterable {
            let rendered = self.display(&unpacked);
            self.emit(&issues::TypeMismatchUnpackValue, element.lineno, vec![rendered]);
            keys.add_key_kind(KeyKind::Int);
            keys.values.add_type(TypeId::MIXED);
            return Ok(());
        }
        let key_kind = unpacked.array_key_kind(registry).unwrap_or(KeyKind::Int);
        if key_kind == KeyKind::String && !self.env.options.allow_string_key_unpack {
            let rendered = self.display(&unpacked);
            self.emit(&issues::TypeMismatchUnpackKey, element.lineno, vec![rendered, "string".to_string()]);
        }
        keys.add_key_kind(if self.env.options.allow_string_key_unpack { key_kind } else { KeyKind::Int });
        keys.values.add_union_type(&unpacked.iterable_value_types(registry).or_mixed());
        Ok(())
    }

    /// The key a literal or literal-typed key expression stands for.
    ///
    /// Floats, booleans and null are keys only under
    /// `scalar_array_key_cast`, converted the way the runtime converts them.
    fn literal_key(&self, key: Child<'_>, key_type: &UnionType) -> Option<ShapeKey> {
        let lenient = self.env.options.scalar_array_key_cast;
        match key {
            Child::Int(value) => Some(ShapeKey::Int(value)),
            Child::Str(value) => Some(ShapeKey::from_string(value)),
            Child::Float(value) if lenient && value.is_finite() => Some(ShapeKey::Int(value.trunc() as i64)),
            Child::Bool(value) if lenient => Some(ShapeKey::Int(i64::from(value))),
            Child::Null if lenient => Some(ShapeKey::Str(String::new())),
            Child::Node(_) => match &self.registry().get(key_type.single()?).kind {
                TypeKind::LiteralInt(value) => Some(ShapeKey::Int(*value)),
                TypeKind::LiteralString(value) => Some(ShapeKey::from_string(value)),
                _ => None,
            },
            _ => None,
        }
    }

    fn key_kind_of_type(&self, key_type: &UnionType) -> KeyKind {
        let registry = self.registry();
        if key_type.is_exclusively_int_like(registry) {
            KeyKind::Int
        } else if key_type.is_exclusively_string_like(registry) {
            KeyKind::String
        } else {
            KeyKind::Mixed
        }
    }

    // ========================================================================
    // Index fetches
    // ========================================================================

    /// `$base[$dim]`.
    pub(crate) fn visit_dim(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let base = self.visit(required(node, "expr")?)?;
        let dim = node.child("dim").filter(|d| !d.is_null());
        let dim_type = match dim {
            Some(dim) => Some(self.visit(dim)?),
            None => None,
        };
        if base.is_empty() {
            return Ok(UnionType::empty());
        }

        let non_null = base.non_nullable_clone(registry);
        let mut result = UnionType::empty();
        let mut indexable = false;

        if non_null.has_array_shape(registry) {
            indexable = true;
            let non_shape_arrays = non_null
                .without_array_shapes(registry)
                .has_type_matching(registry, |ty| ty.is_array_like());
            let key = match (dim, &dim_type) {
                (Some(dim), Some(dim_type)) => self.literal_key(dim, dim_type),
                _ => None,
            };
            match key {
                Some(key) => match non_null.shape_field_types(registry, &key) {
                    Some(field_types) => result.add_union_type(&field_types),
                    None if !non_shape_arrays && !non_null.has_string_like(registry) => {
                        let rendered_base = self.display(&base);
                        return Err(self.failure(
                            &issues::TypeInvalidDimOffset,
                            node.lineno,
                            vec![key.to_string(), rendered_base],
                        ));
                    }
                    None => {}
                },
                None => {
                    let shapes = non_null.filter(|id| matches!(registry.get(id).kind, TypeKind::ArrayShape(_)));
                    result.add_union_type(&shapes.generic_array_element_types(registry));
                }
            }
        }

        let non_shape = non_null.without_array_shapes(registry);
        if non_shape.has_type_matching(registry, |ty| ty.is_array_like()) || non_shape.has_mixed() {
            indexable = true;
            result.add_union_type(&non_shape.generic_array_element_types(registry));
        }
        if non_null.has_string_like(registry) {
            indexable = true;
            result.add_type(TypeId::STRING);
        }
        if non_null.has_template_type(registry) || self.has_array_access_class(&non_null) {
            indexable = true;
            result.add_type(TypeId::MIXED);
        }

        if !indexable {
            let rendered = self.display(&base);
            return Err(self.failure(&issues::TypeArraySuspicious, node.lineno, vec![rendered]));
        }
        if base.contains_nullable(registry) && !base.has_mixed() {
            let rendered = self.display(&non_null);
            self.emit(&issues::TypeArraySuspiciousNullable, node.lineno, vec![rendered]);
        }
        if let Some(dim_type) = &dim_type {
            self.check_dim_index(node, &base, &non_null, dim_type);
        }
        Ok(result)
    }

    fn has_array_access_class(&mut self, union_type: &UnionType) -> bool {
        let registry = self.registry();
        let array_access = FullyQualifiedClassName::from_full_name("\\ArrayAccess");
        union_type.class_fqsens(registry).into_iter().any(|fqsen| {
            fqsen == array_access
                || UnionType::of(registry.class_type(&fqsen)).has_ancestor(registry, &mut *self.env.codebase, &array_access)
        })
    }

    /// The index must be a valid key for the arrays in the base type.
    fn check_dim_index(&mut self, node: &Node<'_>, base: &UnionType, non_null: &UnionType, dim_type: &UnionType) {
        let registry = self.registry();
        if dim_type.is_empty() || dim_type.has_mixed() || dim_type.has_template_type(registry) {
            return;
        }
        let Some(key_kind) = non_null.array_key_kind(registry) else {
            if non_null.has_string_like(registry) {
                self.check_string_offset(node, base, dim_type);
            }
            return;
        };
        let lenient = self.env.options.scalar_array_key_cast;
        let accepts = |id: TypeId| {
            let ty = registry.get(id);
            let int_like = ty.is_int_like()
                || matches!(&ty.kind, TypeKind::LiteralString(s) if matches!(ShapeKey::from_string(s), ShapeKey::Int(_)));
            let scalar_castable = lenient
                && (ty.is_native(NativeKind::Float) || ty.is_bool_like() || ty.is_native(NativeKind::Null));
            match key_kind {
                KeyKind::Int => int_like || scalar_castable || (lenient && ty.is_string_like()),
                KeyKind::String => ty.is_string_like() || scalar_castable || (lenient && ty.is_int_like()),
                KeyKind::Mixed => ty.is_int_like() || ty.is_string_like() || scalar_castable,
            }
        };
        let index = dim_type.non_nullable_clone(registry);
        if index.is_empty() {
            return;
        }
        let expected = if lenient {
            UnionType::from_types([TypeId::INT, TypeId::STRING])
        } else {
            key_kind_union(key_kind)
        };
        if !index.iter().any(accepts) {
            let args = vec![self.display(base), self.display(dim_type), self.display(&expected)];
            self.emit(&issues::TypeMismatchDimFetch, node.lineno, args);
        } else if dim_type.contains_nullable(registry) && !lenient {
            let args = vec![self.display(base), self.display(dim_type), self.display(&expected)];
            self.emit(&issues::TypeMismatchDimFetchNullable, node.lineno, args);
        }
    }

    /// String offsets are integers; numeric strings convert to them.
    fn check_string_offset(&mut self, node: &Node<'_>, base: &UnionType, dim_type: &UnionType) {
        let registry = self.registry();
        let lenient = self.env.options.scalar_array_key_cast;
        let index = dim_type.non_nullable_clone(registry);
        if index.is_empty() {
            return;
        }
        let accepts = |id: TypeId| {
            let ty = registry.get(id);
            ty.is_int_like()
                || matches!(&ty.kind, TypeKind::LiteralString(s) if matches!(ShapeKey::from_string(s), ShapeKey::Int(_)))
                || (lenient && (ty.is_native(NativeKind::Float) || ty.is_bool_like() || ty.is_string_like()))
        };
        if !index.iter().any(accepts) {
            let args = vec![self.display(base), self.display(dim_type), "int".to_string()];
            self.emit(&issues::TypeMismatchDimFetch, node.lineno, args);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use bumpalo::Bump;
    use strix_ast::{AstBuilder, Child};
    use strix_diagnostics::issues;
    use strix_options::AnalysisOptions;

    #[test]
    fn test_list_literal_is_shape() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let array = b.array_list([Child::Int(1), Child::Int(2)]);
        assert_eq!(h.eval(Child::Node(array)), "array{0:1,1:2}");
    }

    #[test]
    fn test_shape_with_runtime_value() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("x", "int|string");
        let array = b.array_list([Child::Node(b.var("x")), Child::Int(2)]);
        assert_eq!(h.eval(Child::Node(array)), "array{0:int|string,1:2}");
    }

    #[test]
    fn test_explicit_keys_continue_implicit_numbering() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let array = b.array([(Some(Child::Int(5)), b.str("a")), (None, b.str("b"))]);
        assert_eq!(h.eval(Child::Node(array)), "array{5:'a',6:'b'}");
    }

    #[test]
    fn test_duplicate_keys_fall_back_to_generic_array() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let array = b.array([(Some(b.str("k")), Child::Int(1)), (Some(b.str("k")), b.str("v"))]);
        assert_eq!(h.eval(Child::Node(array)), "array<string,int>|array<string,string>");
    }

    #[test]
    fn test_unknown_value_is_mixed_in_generic_array() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("k", "int");
        h.define_variable("v", "");
        let array = b.array([(Some(Child::Node(b.var("k"))), Child::Node(b.var("v")))]);
        assert_eq!(h.eval(Child::Node(array)), "array<int,mixed>");
    }

    #[test]
    fn test_float_keys_need_scalar_cast() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let array = b.array([(Some(Child::Float(1.7)), Child::Int(1))]);

        let mut strict = Harness::new();
        assert_eq!(strict.eval(Child::Node(array)), "int[]");

        let mut lenient = Harness::with_options(AnalysisOptions {
            scalar_array_key_cast: true,
            ..Default::default()
        });
        assert_eq!(lenient.eval(Child::Node(array)), "array{1:1}");
    }

    #[test]
    fn test_unpack_of_scalar_is_reported() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let array = b.array_of([Child::Node(b.unpack(3i64))]);
        assert_eq!(h.eval(Child::Node(array)), "array<int,mixed>");
        assert!(h.issues.has(&issues::TypeMismatchUnpackValue));
    }

    #[test]
    fn test_unpack_of_string_keys_is_reported() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("named", "array<string,int>");
        let array = b.array_of([Child::Node(b.unpack(b.var("named")))]);
        assert_eq!(h.eval(Child::Node(array)), "array<int,int>");
        assert!(h.issues.has(&issues::TypeMismatchUnpackKey));
    }

    // ========================================================================
    // Index fetches
    // ========================================================================

    #[test]
    fn test_shape_index() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("row", "array{a:1,b:'x'}");
        let dim = b.dim(b.var("row"), Some(b.str("a")));
        assert_eq!(h.eval(Child::Node(dim)), "1");
        assert!(h.issues.is_empty());
    }

    #[test]
    fn test_missing_shape_key_is_reported() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("row", "array{a:1}");
        let dim = b.dim(b.var("row"), Some(b.str("zz")));
        assert_eq!(h.eval(Child::Node(dim)), "");
        assert!(h.issues.has(&issues::TypeInvalidDimOffset));
    }

    #[test]
    fn test_generic_array_and_string_index() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("list", "int[]|string");
        let dim = b.dim(b.var("list"), Some(Child::Int(0)));
        assert_eq!(h.eval(Child::Node(dim)), "int|string");
        assert!(h.issues.is_empty());
    }

    #[test]
    fn test_bare_array_index_is_mixed() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("a", "array");
        let dim = b.dim(b.var("a"), Some(Child::Int(0)));
        assert_eq!(h.eval(Child::Node(dim)), "mixed");
    }

    #[test]
    fn test_scalar_index_is_suspicious() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("n", "int");
        let dim = b.dim(b.var("n"), Some(Child::Int(0)));
        assert_eq!(h.eval(Child::Node(dim)), "");
        assert!(h.issues.has(&issues::TypeArraySuspicious));
    }

    #[test]
    fn test_nullable_base_is_suspicious() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("maybe", "?int[]");
        let dim = b.dim(b.var("maybe"), Some(Child::Int(0)));
        assert_eq!(h.eval(Child::Node(dim)), "int");
        assert!(h.issues.has(&issues::TypeArraySuspiciousNullable));
    }

    #[test]
    fn test_array_access_class_is_indexable() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("ArrayAccess", None, &[]);
        h.add_class("Bag", None, &["ArrayAccess"]);
        h.define_variable("bag", "\\Bag");
        let dim = b.dim(b.var("bag"), Some(b.str("k")));
        assert_eq!(h.eval(Child::Node(dim)), "mixed");
        assert!(h.issues.is_empty());
    }

    #[test]
    fn test_index_type_mismatch() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("by_name", "array<string,int>");
        h.define_variable("f", "float");
        let dim = b.dim(b.var("by_name"), Some(Child::Node(b.var("f"))));
        assert_eq!(h.eval(Child::Node(dim)), "int");
        assert!(h.issues.has(&issues::TypeMismatchDimFetch));
        let issue = &h.issues.issues()[0];
        assert_eq!(issue.args[2], "string");
    }

    #[test]
    fn test_index_cast_leniency() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::with_options(AnalysisOptions {
            scalar_array_key_cast: true,
            ..Default::default()
        });
        h.define_variable("by_name", "array<string,int>");
        h.define_variable("f", "float");
        let dim = b.dim(b.var("by_name"), Some(Child::Node(b.var("f"))));
        assert_eq!(h.eval(Child::Node(dim)), "int");
        assert!(h.issues.is_empty());
    }

    #[test]
    fn test_string_offset_must_be_integer() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("s", "string");
        assert_eq!(h.eval(Child::Node(b.dim(b.var("s"), Some(Child::Int(0))))), "string");
        assert_eq!(h.eval(Child::Node(b.dim(b.var("s"), Some(b.str("1"))))), "string");
        assert!(h.issues.is_empty());

        assert_eq!(h.eval(Child::Node(b.dim(b.var("s"), Some(b.str("key"))))), "string");
        assert_eq!(h.issues.names(), vec!["TypeMismatchDimFetch"]);
        assert_eq!(h.issues.issues()[0].args[2], "int");

        let mut lenient = Harness::with_options(AnalysisOptions {
            scalar_array_key_cast: true,
            ..Default::default()
        });
        lenient.define_variable("s", "string");
        lenient.eval(Child::Node(b.dim(b.var("s"), Some(b.str("key")))));
        assert!(lenient.issues.is_empty());
    }
}
