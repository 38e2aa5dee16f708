//! Property fetches, calls and instantiation.

use crate::context_node::Resolution;
use crate::failure::{AnalysisFailure, AnalysisResult};
use crate::union_type_visitor::{required, UnionTypeVisitor};
use strix_ast::{Child, Node, NodeKind};
use strix_codebase::{DependentArgument, Method, Signature, Visibility};
use strix_diagnostics::issues;
use strix_types::{FullyQualifiedClassName, NativeKind, Scalar, TemplateTypeMap, TypeId, TypeKind, UnionType};

/// Receivers that are objects of unknown class: member lookups on them
/// produce nothing and report nothing.
fn is_opaque_object(registry: &strix_types::TypeRegistry, receiver: &UnionType) -> bool {
    receiver.has_type_matching(registry, |ty| {
        ty.is_native(NativeKind::Object) || ty.is_native(NativeKind::Callable) || ty.is_template()
    })
}

/// `self`, `static` or `parent` as the class of a static access.
fn names_context_class(class: Child<'_>) -> bool {
    class
        .as_node()
        .filter(|node| node.is(NodeKind::Name))
        .and_then(|node| node.child_str("name"))
        .is_some_and(|name| {
            ["self", "static", "parent"]
                .iter()
                .any(|special| name.eq_ignore_ascii_case(special))
        })
}

impl UnionTypeVisitor<'_, '_> {
    // ========================================================================
    // Properties
    // ========================================================================

    pub(crate) fn visit_prop(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let receiver = self.visit(required(node, "expr")?)?;
        let Some(name) = node.child_str("prop") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic property name"));
        };
        let receiver = receiver.non_nullable_clone(registry);
        if receiver.is_empty() || receiver.has_mixed() {
            return Ok(UnionType::empty());
        }

        let classes = self.context_node().class_list_from_union_type(&receiver, node.lineno)?;
        if classes.is_empty() {
            if is_opaque_object(registry, &receiver) {
                return Ok(UnionType::empty());
            }
            let rendered = self.display(&receiver);
            return Err(self.failure(&issues::TypeExpectedObjectPropAccess, node.lineno, vec![rendered]));
        }

        let properties = self.context_node().resolve_properties(&classes, name, false, node.lineno)?;
        let mut result = UnionType::empty();
        for property in properties {
            let class = property.fqsen.class.clone();
            let map = self.context_node().receiver_template_map(&receiver, &class);
            let union_type = property
                .union_type
                .with_template_parameter_type_map(registry, &map)
                .with_static_resolved(registry, &class);
            result.add_union_type(&union_type);
        }
        if node.is(NodeKind::NullsafeProp) && !result.is_empty() {
            result.add_type(TypeId::NULL);
        }
        Ok(result)
    }

    pub(crate) fn visit_static_prop(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let class = required(node, "class")?;
        let Some(name) = node.child_str("prop") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic static property name"));
        };
        let classes = self.context_node().resolve_class_reference(class)?;
        let properties = self.context_node().resolve_properties(&classes, name, true, node.lineno)?;
        let static_class = self.static_class_for(class);
        let mut result = UnionType::empty();
        for property in properties {
            let class = static_class.clone().unwrap_or_else(|| property.fqsen.class.clone());
            result.add_union_type(&property.union_type.with_static_resolved(registry, &class));
        }
        Ok(result)
    }

    /// The class `static` resolves to in a static access through
    /// `self::`, `static::` or `parent::`.
    fn static_class_for(&self, class: Child<'_>) -> Option<FullyQualifiedClassName> {
        if names_context_class(class) {
            self.context.class_fqsen().cloned()
        } else {
            None
        }
    }

    // ========================================================================
    // Calls
    // ========================================================================

    /// Evaluate the arguments of a call-like node. A spread argument
    /// stands for the values it iterates.
    fn visit_arguments(&mut self, node: &Node<'_>) -> AnalysisResult<Vec<DependentArgument>> {
        let registry = self.registry();
        let Some(args) = node.child_node("args") else {
            return Ok(Vec::new());
        };
        let mut result = Vec::with_capacity(args.list_len());
        for arg in args.list() {
            let argument = match arg {
                Child::Node(unpack) if unpack.is(NodeKind::Unpack) => {
                    let spread = self.visit(required(unpack, "expr")?)?;
                    DependentArgument {
                        union_type: spread.iterable_value_types(registry),
                        literal: None,
                    }
                }
                Child::Node(_) => DependentArgument {
                    union_type: self.visit(arg)?,
                    literal: None,
                },
                _ => DependentArgument {
                    union_type: self.visit(arg)?,
                    literal: scalar_of(arg),
                },
            };
            result.push(argument);
        }
        Ok(result)
    }

    /// The return type of a call with these arguments: a dependent return
    /// type if it applies, else the declared one with templates bound from
    /// the arguments, then from the receiver's template arguments.
    ///
    /// Templates still unbound are erased, except those of the function or
    /// class being analyzed, which stay meaningful here.
    fn call_return_type(
        &self,
        signature: &Signature,
        args: &[DependentArgument],
        receiver: &TemplateTypeMap,
    ) -> UnionType {
        let registry = self.registry();
        if let Some(dependent) = &signature.dependent_return_type {
            if let Some(union_type) = dependent.compute(registry, args) {
                return union_type;
            }
        }
        let names = signature.return_type.template_names(registry);
        if names.is_empty() {
            return signature.return_type.clone();
        }
        let mut map = bind_arguments(registry, signature, args);
        for (name, bound) in receiver {
            map.entry(name.clone()).or_insert_with(|| bound.clone());
        }
        for name in names {
            if !self.context.template_names().contains(&name) {
                map.entry(name).or_default();
            }
        }
        signature.return_type.with_template_parameter_type_map(registry, &map)
    }

    pub(crate) fn visit_call(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let callee = required(node, "expr")?;
        let args = self.visit_arguments(node)?;
        match callee.as_node() {
            Some(name) if name.is(NodeKind::Name) => {
                let func = self.context_node().resolve_function(name)?;
                Ok(self.call_return_type(&func.signature, &args, &TemplateTypeMap::default()))
            }
            _ => {
                let callee_type = self.visit(callee)?;
                let mut result = UnionType::empty();
                for id in callee_type.iter() {
                    if let TypeKind::Closure(signature) = &registry.get(id).kind {
                        result.add_union_type(&signature.return_type);
                    }
                }
                Ok(result)
            }
        }
    }

    pub(crate) fn visit_method_call(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let receiver = self.visit(required(node, "expr")?)?;
        let args = self.visit_arguments(node)?;
        let Some(name) = node.child_str("method") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic method name"));
        };
        let line = node.lineno;
        let receiver = receiver.non_nullable_clone(registry);
        if receiver.is_empty() || receiver.has_mixed() {
            return Ok(UnionType::empty());
        }

        let classes = self.context_node().class_list_with_issue(&receiver, |fqsen| {
            (&issues::UndeclaredClassMethod, line, vec![name.to_string(), fqsen.to_string()])
        })?;
        if classes.is_empty() && is_opaque_object(registry, &receiver) {
            return Ok(UnionType::empty());
        }

        let methods = self.context_node().resolve_methods(&classes, name, false, &receiver, line)?;
        let mut result = UnionType::empty();
        for method in methods.into_iter().filter_map(Resolution::into_option) {
            let class = method.fqsen.class.clone();
            let map = self.context_node().receiver_template_map(&receiver, &class);
            let union_type = self
                .call_return_type(&method.signature, &args, &map)
                .with_static_resolved(registry, &class);
            result.add_union_type(&union_type);
        }
        if node.is(NodeKind::NullsafeMethodCall) && !result.is_empty() {
            result.add_type(TypeId::NULL);
        }
        Ok(result)
    }

    pub(crate) fn visit_static_call(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let class = required(node, "class")?;
        let args = self.visit_arguments(node)?;
        let Some(name) = node.child_str("method") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic static method name"));
        };
        let classes = self.context_node().resolve_class_reference(class)?;
        let methods = self
            .context_node()
            .resolve_methods(&classes, name, true, &UnionType::empty(), node.lineno)?;
        let static_class = self.static_class_for(class);

        let mut result = UnionType::empty();
        for resolution in methods {
            if let Resolution::Found(method) = &resolution {
                self.check_static_call(method, node.lineno)?;
            }
            let Some(method) = resolution.into_option() else {
                continue;
            };
            let class = static_class.clone().unwrap_or_else(|| method.fqsen.class.clone());
            let union_type = self
                .call_return_type(&method.signature, &args, &TemplateTypeMap::default())
                .with_static_resolved(registry, &class);
            result.add_union_type(&union_type);
        }
        Ok(result)
    }

    /// An instance method called statically is only valid from an instance
    /// of the declaring class or one of its subclasses (`parent::foo()`).
    fn check_static_call(&mut self, method: &Method, line: u32) -> AnalysisResult<()> {
        if method.is_static() {
            return Ok(());
        }
        let registry = self.registry();
        let declaring = &method.fqsen.class;
        let allowed = match self.context.class_fqsen() {
            Some(context_class) if !self.context.is_static_function() => {
                context_class == declaring || self.env.codebase.is_subclass_of(registry, context_class, declaring)
            }
            _ => false,
        };
        if allowed {
            return Ok(());
        }
        let args = vec![
            method.fqsen.to_string(),
            method.location.file.clone(),
            method.location.line.to_string(),
        ];
        Err(self.failure(&issues::StaticCallToNonStatic, line, args))
    }

    // ========================================================================
    // Instantiation
    // ========================================================================

    pub(crate) fn visit_new(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let class = required(node, "class")?;
        let args = self.visit_arguments(node)?;
        let Some(name_node) = class.as_node().filter(|n| n.is(NodeKind::Name)) else {
            if class.as_node().is_some_and(|n| n.is(NodeKind::Class)) {
                return Ok(UnionType::of(TypeId::OBJECT));
            }
            let classes = self.context_node().resolve_class_reference(class)?;
            if classes.is_empty() {
                return Ok(UnionType::of(TypeId::OBJECT));
            }
            let named_classes: Vec<FullyQualifiedClassName> = self
                .visit(class)?
                .iter()
                .filter_map(|id| match &registry.get(id).kind {
                    TypeKind::LiteralString(name) => Some(FullyQualifiedClassName::from_full_name(name)),
                    _ => None,
                })
                .collect();
            let mut result = UnionType::empty();
            for fqsen in &classes {
                let kind = if named_classes.contains(fqsen) {
                    Instantiation::Named
                } else {
                    Instantiation::RuntimeClass
                };
                result.add_type(self.instantiate(fqsen, kind, &args, node.lineno)?);
            }
            return Ok(result);
        };

        let is_new_static = names_context_class(class)
            && name_node
                .child_str("name")
                .is_some_and(|n| n.eq_ignore_ascii_case("static"));
        let fqsen = self.context_node().class_fqsen_from_name_node(name_node)?;
        if !self.env.codebase.has_class_with_fqsen(&fqsen) {
            return Err(self.failure(&issues::UndeclaredClassReference, node.lineno, vec![fqsen.to_string()]));
        }
        if is_new_static {
            self.instantiate(&fqsen, Instantiation::Static, &args, node.lineno)?;
            return Ok(UnionType::of(TypeId::STATIC));
        }
        Ok(UnionType::of(self.instantiate(&fqsen, Instantiation::Named, &args, node.lineno)?))
    }

    /// The type `new` produces for an existing class, with class templates
    /// bound from the constructor arguments. Fails when the class cannot
    /// be instantiated that way.
    fn instantiate(
        &mut self,
        fqsen: &FullyQualifiedClassName,
        kind: Instantiation,
        args: &[DependentArgument],
        line: u32,
    ) -> AnalysisResult<TypeId> {
        let registry = self.registry();
        let (is_interface, is_trait, is_abstract, template_names) = {
            let clazz = self.env.codebase.get_class_by_fqsen(fqsen);
            (clazz.is_interface(), clazz.is_trait(), clazz.is_abstract(), clazz.template_names.clone())
        };
        if is_trait {
            return Err(self.failure(&issues::TypeInstantiateTrait, line, vec![fqsen.to_string()]));
        }
        if is_interface && kind != Instantiation::RuntimeClass {
            return Err(self.failure(&issues::TypeInstantiateInterface, line, vec![fqsen.to_string()]));
        }
        if is_abstract && kind == Instantiation::Named {
            return Err(self.failure(&issues::TypeInstantiateAbstract, line, vec![fqsen.to_string()]));
        }
        if template_names.is_empty() {
            return Ok(registry.class_type(fqsen));
        }

        let constructor = self.context_node().find_method(fqsen, "__construct", false);
        let map = match constructor {
            Resolution::Found(constructor) => bind_arguments(registry, &constructor.signature, args),
            _ => TemplateTypeMap::default(),
        };
        let template_args: Option<Vec<UnionType>> = template_names
            .iter()
            .map(|name| map.get(name).filter(|bound| !bound.is_empty()).cloned())
            .collect();
        Ok(match template_args {
            Some(template_args) => registry.class_type_with_args(fqsen, template_args),
            None => registry.class_type(fqsen),
        })
    }
}

/// How the class of a `new` expression was named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Instantiation {
    /// A class name or class-name string.
    Named,
    /// `new static`: the class in context or a concrete subclass.
    Static,
    /// `new $object`: the object's own class, which may be a concrete
    /// subclass of its declared type.
    RuntimeClass,
}

/// Template bindings implied by passing `args` to `signature`.
fn bind_arguments(
    registry: &strix_types::TypeRegistry,
    signature: &Signature,
    args: &[DependentArgument],
) -> TemplateTypeMap {
    let mut map = TemplateTypeMap::default();
    for (index, arg) in args.iter().enumerate() {
        if let Some(param) = signature.parameter_for_argument(index) {
            param.union_type.bind_templates(&arg.union_type, registry, &mut map);
        }
    }
    map
}

fn scalar_of(child: Child<'_>) -> Option<Scalar> {
    match child {
        Child::Int(value) => Some(Scalar::Int(value)),
        Child::Float(value) => Some(Scalar::Float(value)),
        Child::Str(value) => Some(Scalar::String(value.to_string())),
        Child::Bool(value) => Some(Scalar::Bool(value)),
        Child::Null => Some(Scalar::Null),
        Child::Node(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::Harness;
    use bumpalo::Bump;
    use strix_ast::{AstBuilder, Child, ModifierFlags};
    use strix_codebase::Clazz;
    use strix_diagnostics::issues;
    use strix_types::FullyQualifiedClassName;

    #[test]
    fn test_function_return_type() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_function("rand", &[], "int");
        let call = b.call_fn("rand", []);
        assert_eq!(h.eval(Child::Node(call)), "int");
    }

    #[test]
    fn test_undeclared_function() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let call = b.call_fn("nope", [Child::Int(1)]);
        assert_eq!(h.eval(Child::Node(call)), "");
        assert!(h.issues.has(&issues::UndeclaredFunction));
    }

    #[test]
    fn test_template_bound_from_argument() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_function("first", &["T[]"], "T");
        let list = b.array_list([Child::Int(1), Child::Int(2)]);
        let call = b.call_fn("first", [Child::Node(list)]);
        assert_eq!(h.eval(Child::Node(call)), "int");
    }

    #[test]
    fn test_unbound_template_is_erased() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_function("first", &["T[]"], "T");
        h.add_function("wrap", &["T"], "T[]");
        assert_eq!(h.eval(Child::Node(b.call_fn("first", []))), "");
        assert_eq!(h.eval(Child::Node(b.call_fn("wrap", [Child::Int(3)]))), "int[]");
        assert!(h.issues.is_empty());

        h.context = h.context.with_template_names(vec!["T".to_string()]);
        assert_eq!(h.eval(Child::Node(b.call_fn("first", []))), "T");
    }

    #[test]
    fn test_method_call_resolves_static() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("Builder", None, &[]);
        h.add_method("Builder", "with", "static", ModifierFlags::PUBLIC);
        h.define_variable("b", "\\Builder");
        let call = b.method_call(b.var("b"), "with", []);
        assert_eq!(h.eval(Child::Node(call)), "\\Builder");
    }

    #[test]
    fn test_method_call_on_scalar() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("n", "int");
        let call = b.method_call(b.var("n"), "go", []);
        assert_eq!(h.eval(Child::Node(call)), "");
        assert!(h.issues.has(&issues::NonClassMethodCall));
    }

    #[test]
    fn test_method_call_on_undeclared_class() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("ghost", "\\Ghost");
        let call = b.method_call(b.var("ghost"), "go", []);
        assert_eq!(h.eval(Child::Node(call)), "");
        let issue = &h.issues.issues()[0];
        assert_eq!(issue.issue_type.name, "UndeclaredClassMethod");
        assert_eq!(issue.args, vec!["go".to_string(), "\\Ghost".to_string()]);
    }

    #[test]
    fn test_private_method_is_inaccessible_outside() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("Vault", None, &[]);
        h.add_method("Vault", "secret", "string", ModifierFlags::PRIVATE);
        h.define_variable("v", "\\Vault");
        let call = b.method_call(b.var("v"), "secret", []);
        assert_eq!(h.eval(Child::Node(call)), "");
        assert!(h.issues.has(&issues::AccessMethodPrivate));
    }

    #[test]
    fn test_nullsafe_method_call_adds_null() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("User", None, &[]);
        h.add_method("User", "name", "string", ModifierFlags::PUBLIC);
        h.define_variable("u", "?\\User");
        let call = b.nullsafe_method_call(b.var("u"), "name", []);
        assert_eq!(h.eval(Child::Node(call)), "null|string");
    }

    #[test]
    fn test_static_call_to_instance_method() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("Util", None, &[]);
        h.add_method("Util", "run", "int", ModifierFlags::PUBLIC);
        let call = b.static_call(b.name("Util"), "run", []);
        assert_eq!(h.eval(Child::Node(call)), "");
        assert!(h.issues.has(&issues::StaticCallToNonStatic));
    }

    #[test]
    fn test_property_fetch() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("Point", None, &[]);
        h.add_property("Point", "x", "int", ModifierFlags::PUBLIC);
        h.define_variable("p", "\\Point");
        assert_eq!(h.eval(Child::Node(b.prop(b.var("p"), "x"))), "int");
        assert_eq!(h.eval(Child::Node(b.prop(b.var("p"), "y"))), "");
        assert!(h.issues.has(&issues::UndeclaredProperty));
    }

    #[test]
    fn test_property_on_scalar() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.define_variable("s", "string");
        assert_eq!(h.eval(Child::Node(b.prop(b.var("s"), "x"))), "");
        assert!(h.issues.has(&issues::TypeExpectedObjectPropAccess));
    }

    #[test]
    fn test_static_property() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_class("Config", None, &[]);
        h.add_property("Config", "count", "int", ModifierFlags::PUBLIC | ModifierFlags::STATIC);
        let fetch = b.static_prop(b.name("Config"), "count");
        assert_eq!(h.eval(Child::Node(fetch)), "int");
        let missing = b.static_prop(b.name("Config"), "other");
        assert_eq!(h.eval(Child::Node(missing)), "");
        assert!(h.issues.has(&issues::UndeclaredStaticProperty));
    }

    #[test]
    fn test_new_of_interface_and_generic() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_interface("Shape");
        assert_eq!(h.eval(Child::Node(b.new_(b.name("Shape"), []))), "");
        assert!(h.issues.has(&issues::TypeInstantiateInterface));

        h.add_generic_class("Box", &["T"]);
        h.add_constructor("Box", &["T"]);
        let boxed = b.new_(b.name("Box"), [Child::Int(3)]);
        assert_eq!(h.eval(Child::Node(boxed)), "\\Box<int>");
    }

    #[test]
    fn test_new_of_object_binds_constructor_templates() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        h.add_generic_class("Box", &["T"]);
        h.add_constructor("Box", &["T"]);
        h.define_variable("box", "\\Box");
        let boxed = b.new_(b.var("box"), [Child::Int(3)]);
        assert_eq!(h.eval(Child::Node(boxed)), "\\Box<int>");
    }

    #[test]
    fn test_new_of_class_string_checks_abstract() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let mut h = Harness::new();
        let mut model = Clazz::new(&h.registry, FullyQualifiedClassName::from_full_name("Model"));
        model.flags = ModifierFlags::ABSTRACT;
        h.codebase.add_class(model);

        h.define_variable("model", "\\Model");
        assert_eq!(h.eval(Child::Node(b.new_(b.var("model"), []))), "\\Model");
        assert!(h.issues.is_empty());

        h.define_variable("name", "'Model'");
        assert_eq!(h.eval(Child::Node(b.new_(b.var("name"), []))), "");
        assert!(h.issues.has(&issues::TypeInstantiateAbstract));
    }
}
