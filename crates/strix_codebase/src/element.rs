//! Element records stored in the code base.
//!
//! Elements refer to each other only by FQSEN. A class knows the names of
//! its parent, interfaces and traits; the code base resolves those names on
//! demand, so there are no ownership cycles between related classes.

use std::fmt;
use std::rc::Rc;
use strix_ast::{ModifierFlags, ParamFlags};
use strix_types::{
    FullyQualifiedClassConstantName, FullyQualifiedClassName, FullyQualifiedFunctionName,
    FullyQualifiedGlobalConstantName, FullyQualifiedMethodName, FullyQualifiedPropertyName, Scalar, TypeRegistry,
    UnionType,
};

/// Where an element was declared.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    pub fn new(file: &str, line: u32) -> Self {
        Self { file: file.to_string(), line }
    }

    /// Location of a built-in element.
    pub fn internal() -> Self {
        Self::new("internal", 0)
    }
}

fn is_public(flags: ModifierFlags) -> bool {
    !flags.intersects(ModifierFlags::PRIVATE | ModifierFlags::PROTECTED)
}

/// Visibility shared by methods, properties and class constants.
pub trait Visibility {
    fn modifiers(&self) -> ModifierFlags;

    fn is_private(&self) -> bool {
        self.modifiers().contains(ModifierFlags::PRIVATE)
    }

    fn is_protected(&self) -> bool {
        self.modifiers().contains(ModifierFlags::PROTECTED)
    }

    fn is_public(&self) -> bool {
        is_public(self.modifiers())
    }

    fn is_static(&self) -> bool {
        self.modifiers().contains(ModifierFlags::STATIC)
    }

    /// `public` < `protected` < `private`.
    fn visibility_rank(&self) -> u8 {
        if self.is_private() {
            2
        } else if self.is_protected() {
            1
        } else {
            0
        }
    }

    fn visibility_name(&self) -> &'static str {
        match self.visibility_rank() {
            2 => "private",
            1 => "protected",
            _ => "public",
        }
    }
}

// ============================================================================
// Classes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassKind {
    Class,
    Interface,
    Trait,
}

#[derive(Debug, Clone)]
pub struct Clazz {
    pub fqsen: FullyQualifiedClassName,
    pub kind: ClassKind,
    /// `ABSTRACT` and `FINAL`.
    pub flags: ModifierFlags,
    pub parent: Option<FullyQualifiedClassName>,
    pub interfaces: Vec<FullyQualifiedClassName>,
    pub traits: Vec<FullyQualifiedClassName>,
    pub template_names: Vec<String>,
    /// The class type plus its parent and interface types.
    pub union_type: UnionType,
    pub is_internal: bool,
    pub location: Location,
}

impl Clazz {
    pub fn new(registry: &TypeRegistry, fqsen: FullyQualifiedClassName) -> Self {
        let union_type = UnionType::of(registry.class_type(&fqsen));
        Self {
            fqsen,
            kind: ClassKind::Class,
            flags: ModifierFlags::NONE,
            parent: None,
            interfaces: Vec::new(),
            traits: Vec::new(),
            template_names: Vec::new(),
            union_type,
            is_internal: false,
            location: Location::default(),
        }
    }

    pub fn interface(registry: &TypeRegistry, fqsen: FullyQualifiedClassName) -> Self {
        Self { kind: ClassKind::Interface, ..Self::new(registry, fqsen) }
    }

    pub fn trait_(registry: &TypeRegistry, fqsen: FullyQualifiedClassName) -> Self {
        Self { kind: ClassKind::Trait, ..Self::new(registry, fqsen) }
    }

    pub fn set_parent(&mut self, registry: &TypeRegistry, parent: FullyQualifiedClassName) {
        self.union_type.add_type(registry.class_type(&parent));
        self.parent = Some(parent);
    }

    pub fn add_interface(&mut self, registry: &TypeRegistry, interface: FullyQualifiedClassName) {
        self.union_type.add_type(registry.class_type(&interface));
        self.interfaces.push(interface);
    }

    pub fn add_trait(&mut self, trait_fqsen: FullyQualifiedClassName) {
        self.traits.push(trait_fqsen);
    }

    pub fn is_interface(&self) -> bool {
        self.kind == ClassKind::Interface
    }

    pub fn is_trait(&self) -> bool {
        self.kind == ClassKind::Trait
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ModifierFlags::ABSTRACT)
    }

    pub fn is_generic(&self) -> bool {
        !self.template_names.is_empty()
    }

    /// Parent, interfaces and traits, in that order.
    pub fn ancestors(&self) -> impl Iterator<Item = &FullyQualifiedClassName> {
        self.parent.iter().chain(self.interfaces.iter()).chain(self.traits.iter())
    }
}

// ============================================================================
// Functions and methods
// ============================================================================

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub union_type: UnionType,
    pub flags: ParamFlags,
    pub has_default: bool,
}

impl Parameter {
    pub fn new(name: &str, union_type: UnionType) -> Self {
        Self {
            name: name.to_string(),
            union_type,
            flags: ParamFlags::NONE,
            has_default: false,
        }
    }

    pub fn optional(name: &str, union_type: UnionType) -> Self {
        Self { has_default: true, ..Self::new(name, union_type) }
    }

    pub fn is_variadic(&self) -> bool {
        self.flags.contains(ParamFlags::VARIADIC)
    }

    pub fn is_by_ref(&self) -> bool {
        self.flags.contains(ParamFlags::BY_REF)
    }

    pub fn is_optional(&self) -> bool {
        self.has_default || self.is_variadic()
    }
}

/// An argument as seen by a dependent return type: its inferred type and,
/// for a literal argument, its value.
#[derive(Debug, Clone)]
pub struct DependentArgument {
    pub union_type: UnionType,
    pub literal: Option<Scalar>,
}

type DependentFn = dyn Fn(&TypeRegistry, &[DependentArgument]) -> Option<UnionType>;

/// A return type computed from the call's arguments.
#[derive(Clone)]
pub struct DependentReturnType(Rc<DependentFn>);

impl DependentReturnType {
    pub fn new(f: impl Fn(&TypeRegistry, &[DependentArgument]) -> Option<UnionType> + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// The class named by the string argument at `index`, as in
    /// `make(Foo::class)` returning `\Foo`.
    pub fn class_name_argument(index: usize) -> Self {
        Self::new(move |registry, args| {
            let arg = args.get(index)?;
            let name = match &arg.literal {
                Some(Scalar::String(name)) => name.clone(),
                _ => {
                    let id = arg.union_type.single()?;
                    match &registry.get(id).kind {
                        strix_types::TypeKind::LiteralString(name) => name.clone(),
                        _ => return None,
                    }
                }
            };
            if name.is_empty() || name.contains('|') {
                return None;
            }
            let fqsen = FullyQualifiedClassName::from_full_name(&name);
            if fqsen.name().is_empty() {
                return None;
            }
            Some(UnionType::of(registry.class_type(&fqsen)))
        })
    }

    pub fn compute(&self, registry: &TypeRegistry, args: &[DependentArgument]) -> Option<UnionType> {
        (self.0)(registry, args)
    }
}

impl fmt::Debug for DependentReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DependentReturnType(..)")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: UnionType,
    pub dependent_return_type: Option<DependentReturnType>,
    pub template_names: Vec<String>,
    /// Types named in `@throws`.
    pub throws: UnionType,
}

impl Signature {
    pub fn new(parameters: Vec<Parameter>, return_type: UnionType) -> Self {
        Self {
            parameters,
            return_type,
            ..Default::default()
        }
    }

    pub fn required_parameter_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.is_optional()).count()
    }

    /// Parameter receiving argument `index`, following a trailing variadic.
    pub fn parameter_for_argument(&self, index: usize) -> Option<&Parameter> {
        self.parameters
            .get(index)
            .or_else(|| self.parameters.last().filter(|p| p.is_variadic()))
    }
}

#[derive(Debug, Clone)]
pub struct Method {
    pub fqsen: FullyQualifiedMethodName,
    /// The method as declared; differs from `fqsen` for inherited copies.
    pub defining_fqsen: FullyQualifiedMethodName,
    pub flags: ModifierFlags,
    pub signature: Signature,
    pub is_internal: bool,
    pub location: Location,
}

impl Method {
    pub fn new(fqsen: FullyQualifiedMethodName, signature: Signature) -> Self {
        Self {
            defining_fqsen: fqsen.clone(),
            fqsen,
            flags: ModifierFlags::PUBLIC,
            signature,
            is_internal: false,
            location: Location::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.fqsen.name
    }

    pub fn is_abstract(&self) -> bool {
        self.flags.contains(ModifierFlags::ABSTRACT)
    }

    pub fn is_inherited(&self) -> bool {
        self.fqsen.class != self.defining_fqsen.class
    }

    pub fn is_magic_call(&self) -> bool {
        self.name().eq_ignore_ascii_case("__call") || self.name().eq_ignore_ascii_case("__callStatic")
    }
}

impl Visibility for Method {
    fn modifiers(&self) -> ModifierFlags {
        self.flags
    }
}

#[derive(Debug, Clone)]
pub struct Func {
    pub fqsen: FullyQualifiedFunctionName,
    pub signature: Signature,
    pub is_internal: bool,
    pub location: Location,
}

impl Func {
    pub fn new(fqsen: FullyQualifiedFunctionName, signature: Signature) -> Self {
        Self {
            fqsen,
            signature,
            is_internal: false,
            location: Location::default(),
        }
    }
}

// ============================================================================
// Properties and constants
// ============================================================================

#[derive(Debug, Clone)]
pub struct Property {
    pub fqsen: FullyQualifiedPropertyName,
    pub defining_fqsen: FullyQualifiedPropertyName,
    pub flags: ModifierFlags,
    pub union_type: UnionType,
    /// Created by assignment rather than declared.
    pub is_dynamic: bool,
    /// Declared through `@property` on the class.
    pub is_magic: bool,
    pub location: Location,
}

impl Property {
    pub fn new(fqsen: FullyQualifiedPropertyName, union_type: UnionType) -> Self {
        Self {
            defining_fqsen: fqsen.clone(),
            fqsen,
            flags: ModifierFlags::PUBLIC,
            union_type,
            is_dynamic: false,
            is_magic: false,
            location: Location::default(),
        }
    }

    /// An untyped public property materialized on first assignment.
    pub fn dynamic(fqsen: FullyQualifiedPropertyName, location: Location) -> Self {
        Self {
            is_dynamic: true,
            location,
            ..Self::new(fqsen, UnionType::empty())
        }
    }

    pub fn is_inherited(&self) -> bool {
        self.fqsen.class != self.defining_fqsen.class
    }
}

impl Visibility for Property {
    fn modifiers(&self) -> ModifierFlags {
        self.flags
    }
}

#[derive(Debug, Clone)]
pub struct ClassConstant {
    pub fqsen: FullyQualifiedClassConstantName,
    pub defining_fqsen: FullyQualifiedClassConstantName,
    pub flags: ModifierFlags,
    /// Type of the constant's value.
    pub union_type: UnionType,
    /// Type declared in the doc comment, if any.
    pub comment_type: UnionType,
    pub location: Location,
}

impl ClassConstant {
    pub fn new(fqsen: FullyQualifiedClassConstantName, union_type: UnionType) -> Self {
        Self {
            defining_fqsen: fqsen.clone(),
            fqsen,
            flags: ModifierFlags::PUBLIC,
            union_type,
            comment_type: UnionType::empty(),
            location: Location::default(),
        }
    }

    pub fn is_inherited(&self) -> bool {
        self.fqsen.class != self.defining_fqsen.class
    }
}

impl Visibility for ClassConstant {
    fn modifiers(&self) -> ModifierFlags {
        self.flags
    }
}

#[derive(Debug, Clone)]
pub struct GlobalConstant {
    pub fqsen: FullyQualifiedGlobalConstantName,
    pub union_type: UnionType,
    pub location: Location,
}

impl GlobalConstant {
    pub fn new(fqsen: FullyQualifiedGlobalConstantName, union_type: UnionType) -> Self {
        Self {
            fqsen,
            union_type,
            location: Location::default(),
        }
    }
}

/// A class together with its own members, as produced by a lazy loader or
/// a class resolver.
#[derive(Debug, Clone)]
pub struct ClassDefinition {
    pub class: Clazz,
    pub methods: Vec<Method>,
    pub properties: Vec<Property>,
    pub constants: Vec<ClassConstant>,
}

impl ClassDefinition {
    pub fn new(class: Clazz) -> Self {
        Self {
            class,
            methods: Vec::new(),
            properties: Vec::new(),
            constants: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_types::TypeId;

    #[test]
    fn test_clazz_union_type_tracks_ancestors() {
        let registry = TypeRegistry::new();
        let mut clazz = Clazz::new(&registry, FullyQualifiedClassName::from_full_name("\\App\\Admin"));
        clazz.set_parent(&registry, FullyQualifiedClassName::from_full_name("\\App\\User"));
        clazz.add_interface(&registry, FullyQualifiedClassName::from_full_name("\\Countable"));
        clazz.add_trait(FullyQualifiedClassName::from_full_name("\\App\\Greets"));
        assert_eq!(
            clazz.union_type.display(&registry).to_string(),
            "\\App\\Admin|\\App\\User|\\Countable"
        );
        assert_eq!(clazz.ancestors().count(), 3);
    }

    #[test]
    fn test_visibility() {
        let class = FullyQualifiedClassName::from_full_name("\\A");
        let mut method = Method::new(FullyQualifiedMethodName::new(class, "run"), Signature::default());
        assert!(method.is_public());
        method.flags = ModifierFlags::PROTECTED | ModifierFlags::STATIC;
        assert!(method.is_protected());
        assert!(method.is_static());
        assert_eq!(method.visibility_name(), "protected");
    }

    #[test]
    fn test_parameter_for_argument_follows_variadic() {
        let mut rest = Parameter::new("rest", UnionType::of(TypeId::STRING));
        rest.flags = ParamFlags::VARIADIC;
        let sig = Signature::new(vec![Parameter::new("a", UnionType::of(TypeId::INT)), rest], UnionType::empty());
        assert_eq!(sig.parameter_for_argument(0).map(|p| p.name.as_str()), Some("a"));
        assert_eq!(sig.parameter_for_argument(5).map(|p| p.name.as_str()), Some("rest"));
        assert_eq!(sig.required_parameter_count(), 1);
    }

    #[test]
    fn test_class_name_argument() {
        let registry = TypeRegistry::new();
        let dependent = DependentReturnType::class_name_argument(0);
        let by_literal = dependent.compute(
            &registry,
            &[DependentArgument {
                union_type: UnionType::of(TypeId::STRING),
                literal: Some(Scalar::String("App\\User".into())),
            }],
        );
        assert_eq!(by_literal.unwrap().display(&registry).to_string(), "\\App\\User");

        let by_type = dependent.compute(
            &registry,
            &[DependentArgument {
                union_type: UnionType::of(registry.literal_string("Foo", false)),
                literal: None,
            }],
        );
        assert_eq!(by_type.unwrap().display(&registry).to_string(), "\\Foo");

        assert!(dependent.compute(&registry, &[]).is_none());
    }
}
