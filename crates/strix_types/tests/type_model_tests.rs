//! Type model integration tests.
//!
//! Exercises interning, rendering, parsing, casting and expansion together
//! through the public API.

use rustc_hash::FxHashMap;
use strix_types::{
    FullyQualifiedClassName, KeyKind, NativeKind, ShapeField, ShapeFields, ShapeKey, TypeHierarchy, TypeId,
    TypeRegistry, UnionType,
};

/// Helper: a hierarchy where each class has at most one parent.
struct Chain {
    parents: FxHashMap<String, String>,
}

impl Chain {
    fn new(links: &[(&str, &str)]) -> Self {
        Self {
            parents: links.iter().map(|(c, p)| (c.to_ascii_lowercase(), p.to_string())).collect(),
        }
    }
}

struct ChainHierarchy<'r> {
    chain: Chain,
    registry: &'r TypeRegistry,
}

impl TypeHierarchy for ChainHierarchy<'_> {
    fn class_union_type(&mut self, fqsen: &FullyQualifiedClassName) -> Option<UnionType> {
        let mut union = UnionType::of(self.registry.class_type(fqsen));
        if let Some(parent) = self.chain.parents.get(&fqsen.name().to_ascii_lowercase()) {
            union.add_type(self.registry.make("\\", parent, vec![], false));
        }
        Some(union)
    }
}

fn parse(registry: &TypeRegistry, s: &str) -> UnionType {
    UnionType::from_fully_qualified_string(registry, s).unwrap()
}

// ============================================================================
// Interning
// ============================================================================

#[test]
fn test_equal_inputs_intern_to_one_instance() {
    let registry = TypeRegistry::new();
    let arg = UnionType::from_types([TypeId::INT, TypeId::STRING]);
    let arg_reordered = UnionType::from_types([TypeId::STRING, TypeId::INT]);
    let a = registry.make("\\App", "Collection", vec![arg], true);
    let b = registry.make("\\App", "Collection", vec![arg_reordered], true);
    assert_eq!(a, b);
    assert!(std::rc::Rc::ptr_eq(&registry.get(a), &registry.get(b)));
}

#[test]
fn test_class_names_intern_case_insensitively() {
    let registry = TypeRegistry::new();
    let a = registry.make("\\App", "User", vec![], false);
    let b = registry.class_type(&FullyQualifiedClassName::from_full_name("\\app\\USER"));
    assert_eq!(a, b);

    let union = parse(&registry, "\\App\\User|\\app\\user|?\\APP\\User");
    assert_eq!(union.len(), 2);
    assert_eq!(union.display(&registry).to_string(), "?\\App\\User|\\App\\User");
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_type_string_round_trip() {
    let registry = TypeRegistry::new();
    let mut ids: Vec<TypeId> = NativeKind::ALL.iter().map(|k| k.id()).collect();
    ids.push(registry.native(NativeKind::String, true));
    ids.push(registry.make("\\", "stdClass", vec![], false));
    ids.push(registry.make("\\A\\B", "C", vec![], true));
    for id in ids {
        let rendered = registry.type_key(id);
        assert_eq!(registry.type_from_fully_qualified_string(&rendered), Ok(id), "{}", rendered);
    }
}

#[test]
fn test_union_string_round_trip() {
    let registry = TypeRegistry::new();
    for s in ["int|string|null", "?\\Foo|int[]|array{a:1,b:'x'}", "Closure(int):(int|string)|false"] {
        let union = parse(&registry, s);
        let rendered = union.display(&registry).to_string();
        assert_eq!(parse(&registry, &rendered), union);
        assert_eq!(parse(&registry, &rendered).display(&registry).to_string(), rendered);
    }
}

// ============================================================================
// Nullability and casts
// ============================================================================

#[test]
fn test_nullability_round_trip() {
    let registry = TypeRegistry::new();
    for s in ["int", "\\Foo", "int[]", "array{a:int}", "'x'", "Closure():void"] {
        let id = registry.type_from_fully_qualified_string(s).unwrap();
        let nullable = registry.with_is_nullable(id, true);
        assert_eq!(registry.with_is_nullable(nullable, false), id);
        assert!(!registry.can_cast_to_type(nullable, id));
    }
}

#[test]
fn test_cast_reflexivity_and_mixed() {
    let registry = TypeRegistry::new();
    let union = parse(&registry, "int|?string|\\Foo|int[]|array{a:1}|Closure(int):int|T");
    for id in union.iter() {
        assert!(registry.can_cast_to_type(id, id));
        assert!(registry.can_cast_to_type(id, TypeId::MIXED));
    }
}

#[test]
fn test_null_casts_as_any_mode() {
    let registry = TypeRegistry::new();
    let nullable_int = registry.native(NativeKind::Int, true);
    assert!(!registry.can_cast_to_type(nullable_int, TypeId::INT));
    registry.set_null_casts_as_any_type(true);
    assert!(registry.can_cast_to_type(nullable_int, TypeId::INT));
}

#[test]
fn test_expanded_cast_accepts_subclass() {
    let registry = TypeRegistry::new();
    let mut hierarchy = ChainHierarchy {
        chain: Chain::new(&[("Admin", "User")]),
        registry: &registry,
    };
    let admin = parse(&registry, "\\Admin");
    let user = parse(&registry, "\\User");
    assert!(!admin.can_cast_to_union_type(&user, &registry));
    assert!(admin.can_cast_to_expanded_union_type(&user, &registry, &mut hierarchy));
    assert!(!user.can_cast_to_expanded_union_type(&admin, &registry, &mut hierarchy));
}

// ============================================================================
// Arrays
// ============================================================================

#[test]
fn test_shape_precision() {
    let registry = TypeRegistry::new();
    let shape = parse(&registry, "array{a:1,b:'x'}");
    assert_eq!(shape.flatten_array_shapes(&registry), parse(&registry, "array<string,int>|array<string,string>"));
    let a = shape.shape_field_types(&registry, &ShapeKey::Str("a".into())).unwrap();
    assert!(a.is_type(registry.literal_int(1, false)));
    assert!(a.literals_as_natives(&registry).is_type(TypeId::INT));
}

#[test]
fn test_generic_array_element_extraction() {
    let registry = TypeRegistry::new();
    assert!(parse(&registry, "array").generic_array_element_types(&registry).is_type(TypeId::MIXED));
    assert_eq!(
        parse(&registry, "int[]|string[]").generic_array_element_types(&registry),
        parse(&registry, "int|string")
    );
}

#[test]
fn test_shape_built_programmatically_matches_parsed() {
    let registry = TypeRegistry::new();
    let mut fields = ShapeFields::new();
    fields.insert(ShapeKey::Int(0), ShapeField::new(UnionType::of(registry.literal_int(1, false))));
    fields.insert(ShapeKey::Int(1), ShapeField::new(UnionType::of(registry.literal_int(2, false))));
    let built = registry.array_shape(fields, false);
    assert_eq!(registry.type_key(built), "array{0:1,1:2}");
    assert_eq!(registry.type_from_fully_qualified_string("array{0:1,1:2}"), Ok(built));
    assert_eq!(UnionType::of(built).array_key_kind(&registry), Some(KeyKind::Int));
}

// ============================================================================
// Expansion
// ============================================================================

#[test]
#[should_panic(expected = "maximum type expansion depth")]
fn test_expansion_of_25_deep_chain_is_fatal() {
    let registry = TypeRegistry::new();
    let names: Vec<String> = (0..=25).map(|i| format!("Level{}", i)).collect();
    let links: Vec<(&str, &str)> = (0..25).map(|i| (names[i].as_str(), names[i + 1].as_str())).collect();
    let mut hierarchy = ChainHierarchy {
        chain: Chain::new(&links),
        registry: &registry,
    };
    parse(&registry, "\\Level0").as_expanded_types(&registry, &mut hierarchy);
}

#[test]
fn test_expansion_of_shallow_chain() {
    let registry = TypeRegistry::new();
    let mut hierarchy = ChainHierarchy {
        chain: Chain::new(&[("C", "B"), ("B", "A")]),
        registry: &registry,
    };
    let expanded = parse(&registry, "\\C|int").as_expanded_types(&registry, &mut hierarchy);
    assert_eq!(expanded.display(&registry).to_string(), "\\A|\\B|\\C|int");
}

#[test]
fn test_reset_all_invalidates_types_and_expansions() {
    let registry = TypeRegistry::new();
    let mut hierarchy = ChainHierarchy {
        chain: Chain::new(&[("B", "A")]),
        registry: &registry,
    };
    parse(&registry, "\\B").as_expanded_types(&registry, &mut hierarchy);
    registry.reset_all();
    assert_eq!(registry.lookup("\\B"), None);
    assert_eq!(registry.lookup("int"), Some(TypeId::INT));

    hierarchy.chain = Chain::new(&[]);
    let expanded = parse(&registry, "\\B").as_expanded_types(&registry, &mut hierarchy);
    assert_eq!(expanded.display(&registry).to_string(), "\\B");
}
