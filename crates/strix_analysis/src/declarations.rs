//! Checks on declarations: overrides, `@throws`, and declared member types.
//!
//! These run after the symbol table is populated and report through the
//! issue sink directly; none of them affect inferred types.

use crate::env::AnalysisEnv;
use strix_codebase::{ClassConstant, Func, Location, Method, Parameter, Property, Visibility};
use strix_diagnostics::{issues, Issue, IssueType};
use strix_types::{FullyQualifiedClassName, TypeKind, TypeRegistry, UnionType};
use tracing::trace;

pub struct DeclarationChecker<'v, 'e> {
    env: &'v mut AnalysisEnv<'e>,
}

impl<'v, 'e> DeclarationChecker<'v, 'e> {
    pub fn new(env: &'v mut AnalysisEnv<'e>) -> Self {
        Self { env }
    }

    fn emit(&mut self, issue_type: &'static IssueType, location: &Location, args: Vec<String>) {
        self.env.emit(Issue::new(issue_type, &location.file, location.line, args));
    }

    fn display(&self, union_type: &UnionType) -> String {
        union_type.display(self.env.registry).to_string()
    }

    /// Run every declaration check on the class and the members it declares.
    pub fn check_class(&mut self, class: &FullyQualifiedClassName) {
        if !self.env.codebase.has_class_with_fqsen(class) {
            return;
        }
        let ancestors: Vec<FullyQualifiedClassName> = {
            let clazz = self.env.codebase.get_class_by_fqsen(class);
            clazz.parent.iter().chain(clazz.interfaces.iter()).cloned().collect()
        };
        let methods: Vec<Method> = self
            .env
            .codebase
            .methods_for_class(class)
            .into_iter()
            .filter(|m| !m.is_inherited())
            .cloned()
            .collect();
        trace!(%class, methods = methods.len(), "checking class declarations");

        for method in &methods {
            for ancestor in &ancestors {
                let overridden = self.env.codebase.get_method(ancestor, method.name()).cloned();
                if let Some(overridden) = overridden {
                    self.check_method_override(method, &overridden);
                }
            }
            self.check_throws(&method.fqsen.to_string(), &method.signature.throws, &method.location);
        }

        let constants: Vec<ClassConstant> = self
            .env
            .codebase
            .class_constants_for_class(class)
            .into_iter()
            .filter(|c| !c.is_inherited())
            .cloned()
            .collect();
        for constant in &constants {
            self.check_class_constant_type(constant);
        }

        let properties: Vec<Property> = self
            .env
            .codebase
            .properties_for_class(class)
            .into_iter()
            .filter(|p| !p.is_inherited())
            .cloned()
            .collect();
        for property in &properties {
            self.check_property_type(property);
        }
    }

    pub fn check_function(&mut self, func: &Func) {
        self.check_throws(&func.fqsen.to_string(), &func.signature.throws, &func.location);
    }

    // ========================================================================
    // Overrides
    // ========================================================================

    /// `method` must be usable wherever `overridden` is: no narrower
    /// visibility, a compatible parameter list and a covariant return type.
    pub fn check_method_override(&mut self, method: &Method, overridden: &Method) {
        if overridden.is_private() || method.name().eq_ignore_ascii_case("__construct") {
            return;
        }

        let rendered = render_method(self.env.registry, method);
        let rendered_overridden = render_method(self.env.registry, overridden);

        if method.visibility_rank() > overridden.visibility_rank() {
            if overridden.is_internal {
                self.emit(
                    &issues::AccessSignatureMismatchInternal,
                    &method.location,
                    vec![rendered.clone(), rendered_overridden.clone()],
                );
            } else {
                self.emit(
                    &issues::AccessSignatureMismatch,
                    &method.location,
                    vec![
                        rendered.clone(),
                        rendered_overridden.clone(),
                        overridden.location.file.clone(),
                        overridden.location.line.to_string(),
                    ],
                );
            }
        }

        if self.is_compatible_signature(method, overridden) {
            return;
        }
        if overridden.is_internal {
            self.emit(
                &issues::ParamSignatureMismatchInternal,
                &method.location,
                vec![rendered, rendered_overridden, String::new()],
            );
        } else {
            let suffix = format!(" defined in {}:{}", overridden.location.file, overridden.location.line);
            self.emit(&issues::ParamSignatureMismatch, &method.location, vec![rendered, rendered_overridden, suffix]);
        }
    }

    fn is_compatible_signature(&mut self, method: &Method, overridden: &Method) -> bool {
        let registry = self.env.registry;
        let params = &method.signature.parameters;
        let overridden_params = &overridden.signature.parameters;

        let accepts_rest = params.last().is_some_and(Parameter::is_variadic);
        if params.len() < overridden_params.len() && !accepts_rest {
            return false;
        }
        if method.signature.required_parameter_count() > overridden.signature.required_parameter_count() {
            return false;
        }
        for (index, overridden_param) in overridden_params.iter().enumerate() {
            let Some(param) = method.signature.parameter_for_argument(index) else {
                return false;
            };
            if param.is_by_ref() != overridden_param.is_by_ref() {
                return false;
            }
            if overridden_param.is_variadic() && !param.is_variadic() {
                return false;
            }
            if !self.is_compatible_param_type(method, param, overridden, overridden_param) {
                return false;
            }
        }

        let overridden_return = overridden
            .signature
            .return_type
            .with_static_resolved(registry, &overridden.fqsen.class);
        if overridden_return.is_empty() {
            return true;
        }
        let return_type = method.signature.return_type.with_static_resolved(registry, &method.fqsen.class);
        if return_type.is_empty() {
            return false;
        }
        return_type.can_cast_to_expanded_union_type(&overridden_return, registry, &mut *self.env.codebase)
    }

    /// Parameter types are invariant unless widening is allowed, in which
    /// case the override may accept anything the overridden method does.
    fn is_compatible_param_type(
        &mut self,
        method: &Method,
        param: &Parameter,
        overridden: &Method,
        overridden_param: &Parameter,
    ) -> bool {
        let registry = self.env.registry;
        let param_type = param.union_type.with_static_resolved(registry, &method.fqsen.class);
        let overridden_type = overridden_param
            .union_type
            .with_static_resolved(registry, &overridden.fqsen.class);
        if param_type == overridden_type {
            return true;
        }
        if !self.env.options.allow_method_param_type_widening {
            return false;
        }
        param_type.is_empty()
            || overridden_type.can_cast_to_expanded_union_type(&param_type, registry, &mut *self.env.codebase)
    }

    // ========================================================================
    // @throws
    // ========================================================================

    /// Every `@throws` type must be a declared class or interface under
    /// `\Throwable`.
    pub fn check_throws(&mut self, element: &str, throws: &UnionType, location: &Location) {
        let registry = self.env.registry;
        let throwable = FullyQualifiedClassName::from_full_name("\\Throwable");
        for id in throws.iter() {
            let ty = registry.get(id);
            let Some(fqsen) = ty.class_fqsen() else {
                if !ty.is_object_like() {
                    let rendered = registry.type_key(id);
                    self.emit(&issues::TypeInvalidThrowsNonObject, location, vec![element.to_string(), rendered]);
                }
                continue;
            };
            if !self.env.codebase.has_class_with_fqsen(&fqsen) {
                self.emit(&issues::UndeclaredTypeThrowsType, location, vec![element.to_string(), fqsen.to_string()]);
                continue;
            }
            let (is_trait, is_interface) = {
                let clazz = self.env.codebase.get_class_by_fqsen(&fqsen);
                (clazz.is_trait(), clazz.is_interface())
            };
            if is_trait {
                self.emit(&issues::TypeInvalidThrowsIsTrait, location, vec![element.to_string(), fqsen.to_string()]);
                continue;
            }
            let is_throwable = fqsen == throwable
                || UnionType::of(registry.class_type(&fqsen)).has_ancestor(registry, &mut *self.env.codebase, &throwable);
            if is_throwable {
                continue;
            }
            let issue_type = if is_interface {
                &issues::TypeInvalidThrowsIsInterface
            } else {
                &issues::TypeInvalidThrowsNonThrowable
            };
            self.emit(issue_type, location, vec![element.to_string(), fqsen.to_string()]);
        }
    }

    // ========================================================================
    // Declared member types
    // ========================================================================

    /// Doc-comment types of class constants: no templates, no undeclared
    /// classes, and no objects (a constant can never hold one).
    pub fn check_class_constant_type(&mut self, constant: &ClassConstant) {
        let registry = self.env.registry;
        let comment_type = &constant.comment_type;
        if comment_type.is_empty() {
            return;
        }
        if comment_type.has_template_type(registry) {
            self.emit(&issues::TemplateTypeConstant, &constant.location, vec![constant.fqsen.to_string()]);
            return;
        }
        for class in referenced_classes(registry, comment_type) {
            if !self.env.codebase.has_class_with_fqsen(&class) {
                self.emit(
                    &issues::UndeclaredTypeClassConstant,
                    &constant.location,
                    vec![constant.fqsen.to_string(), class.to_string()],
                );
            }
        }
        if comment_type.has_object_like(registry) {
            let rendered = self.display(comment_type);
            self.emit(
                &issues::CommentObjectInClassConstantType,
                &constant.location,
                vec![constant.fqsen.to_string(), rendered],
            );
        }
    }

    pub fn check_property_type(&mut self, property: &Property) {
        let registry = self.env.registry;
        for class in referenced_classes(registry, &property.union_type) {
            if !self.env.codebase.has_class_with_fqsen(&class) {
                self.emit(
                    &issues::UndeclaredTypeProperty,
                    &property.location,
                    vec![property.fqsen.to_string(), class.to_string()],
                );
            }
        }
    }
}

/// Every class named anywhere in `union_type`, including inside array
/// elements, shape fields, closure signatures and template arguments.
fn referenced_classes(registry: &TypeRegistry, union_type: &UnionType) -> Vec<FullyQualifiedClassName> {
    fn collect(registry: &TypeRegistry, union_type: &UnionType, out: &mut Vec<FullyQualifiedClassName>) {
        for id in union_type.iter() {
            let ty = registry.get(id);
            match &ty.kind {
                TypeKind::Class { fqsen, template_args } => {
                    if !out.contains(fqsen) {
                        out.push(fqsen.clone());
                    }
                    for arg in template_args {
                        collect(registry, arg, out);
                    }
                }
                TypeKind::GenericArray { element, .. } => collect(registry, &UnionType::of(*element), out),
                TypeKind::ArrayShape(fields) => {
                    for field in fields.values() {
                        collect(registry, &field.union_type, out);
                    }
                }
                TypeKind::Closure(signature) => {
                    for param in &signature.params {
                        collect(registry, &param.union_type, out);
                    }
                    collect(registry, &signature.return_type, out);
                }
                _ => {}
            }
        }
    }
    let mut out = Vec::new();
    collect(registry, union_type, &mut out);
    out
}

/// `\A::f(int $x, string ...$rest): bool` style rendering for diagnostics.
fn render_method(registry: &TypeRegistry, method: &Method) -> String {
    let params: Vec<String> = method
        .signature
        .parameters
        .iter()
        .map(|param| {
            let mut out = String::new();
            if !param.union_type.is_empty() {
                out.push_str(&param.union_type.display(registry).to_string());
                out.push(' ');
            }
            if param.is_by_ref() {
                out.push('&');
            }
            if param.is_variadic() {
                out.push_str("...");
            }
            out.push('$');
            out.push_str(&param.name);
            if param.has_default {
                out.push_str(" = default");
            }
            out
        })
        .collect();
    let mut rendered = format!("{}({})", method.fqsen, params.join(", "));
    if !method.signature.return_type.is_empty() {
        rendered.push_str(": ");
        rendered.push_str(&method.signature.return_type.display(registry).to_string());
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_codebase::{Clazz, CodeBase, Signature};
    use strix_diagnostics::IssueCollection;
    use strix_options::AnalysisOptions;
    use strix_types::{FullyQualifiedClassConstantName, FullyQualifiedMethodName, TypeId};

    fn method(class: &str, name: &str, params: Vec<Parameter>, return_type: UnionType) -> Method {
        let fqsen = FullyQualifiedMethodName::new(FullyQualifiedClassName::from_full_name(class), name);
        let mut method = Method::new(fqsen, Signature::new(params, return_type));
        method.location = Location::new("src/a.php", 10);
        method
    }

    fn run(options: AnalysisOptions, f: impl FnOnce(&TypeRegistry, &mut DeclarationChecker<'_, '_>)) -> IssueCollection {
        let registry = TypeRegistry::with_options(&options);
        let mut codebase = CodeBase::new(&options);
        let mut issues = IssueCollection::new();
        {
            let mut env = AnalysisEnv::new(&registry, &mut codebase, &options, &mut issues);
            let mut checker = DeclarationChecker::new(&mut env);
            f(&registry, &mut checker);
        }
        issues
    }

    #[test]
    fn test_fewer_parameters_is_a_mismatch() {
        let found = run(AnalysisOptions::default(), |_, checker| {
            let parent = method("Base", "f", vec![Parameter::new("a", UnionType::of(TypeId::INT))], UnionType::empty());
            let child = method("Child", "f", vec![], UnionType::empty());
            checker.check_method_override(&child, &parent);
        });
        assert!(found.has(&issues::ParamSignatureMismatch));
        assert_eq!(found.issues()[0].args[2], " defined in src/a.php:10");
    }

    #[test]
    fn test_param_widening_needs_option() {
        fn build(_: &TypeRegistry, checker: &mut DeclarationChecker<'_, '_>) {
            let parent = method("Base", "f", vec![Parameter::new("a", UnionType::of(TypeId::INT))], UnionType::empty());
            let child = method("Child", "f", vec![Parameter::new("a", UnionType::empty())], UnionType::empty());
            checker.check_method_override(&child, &parent);
        }
        assert!(run(AnalysisOptions::default(), build).has(&issues::ParamSignatureMismatch));
        let widening = AnalysisOptions {
            allow_method_param_type_widening: true,
            ..Default::default()
        };
        assert!(run(widening, build).is_empty());
    }

    #[test]
    fn test_dropped_return_type_is_a_mismatch() {
        let found = run(AnalysisOptions::default(), |_, checker| {
            let parent = method("Base", "f", vec![], UnionType::of(TypeId::STRING));
            let child = method("Child", "f", vec![], UnionType::empty());
            checker.check_method_override(&child, &parent);
        });
        assert!(found.has(&issues::ParamSignatureMismatch));
    }

    #[test]
    fn test_narrower_visibility_against_internal_method() {
        let found = run(AnalysisOptions::default(), |_, checker| {
            let mut parent = method("Base", "f", vec![], UnionType::empty());
            parent.is_internal = true;
            let mut child = method("Child", "f", vec![], UnionType::empty());
            child.flags = strix_ast::ModifierFlags::PROTECTED;
            checker.check_method_override(&child, &parent);
        });
        assert_eq!(found.names(), vec!["AccessSignatureMismatchInternal"]);
    }

    #[test]
    fn test_throws_checks() {
        let found = run(AnalysisOptions::default(), |registry, checker| {
            checker.env.codebase.add_class(Clazz::interface(registry, FullyQualifiedClassName::from_full_name("Throwable")));
            let mut error = Clazz::new(registry, FullyQualifiedClassName::from_full_name("MyError"));
            error.add_interface(registry, FullyQualifiedClassName::from_full_name("Throwable"));
            checker.env.codebase.add_class(error);
            checker.env.codebase.add_class(Clazz::new(registry, FullyQualifiedClassName::from_full_name("Plain")));
            checker.env.codebase.add_class(Clazz::trait_(registry, FullyQualifiedClassName::from_full_name("T1")));

            let throws = UnionType::from_fully_qualified_string(registry, "\\MyError|\\Plain|\\T1|\\Missing|int")
                .expect("parses");
            checker.check_throws("\\f", &throws, &Location::new("src/a.php", 3));
        });
        let mut names = found.names();
        names.sort();
        assert_eq!(
            names,
            vec![
                "TypeInvalidThrowsIsTrait",
                "TypeInvalidThrowsNonObject",
                "TypeInvalidThrowsNonThrowable",
                "UndeclaredTypeThrowsType",
            ]
        );
    }

    #[test]
    fn test_class_constant_comment_types() {
        let found = run(AnalysisOptions::default(), |registry, checker| {
            let class = FullyQualifiedClassName::from_full_name("Holder");
            let mut templated = ClassConstant::new(
                FullyQualifiedClassConstantName::new(class.clone(), "A"),
                UnionType::of(TypeId::INT),
            );
            templated.comment_type = UnionType::of(registry.template("T"));
            checker.check_class_constant_type(&templated);

            let mut object = ClassConstant::new(
                FullyQualifiedClassConstantName::new(class, "B"),
                UnionType::of(TypeId::INT),
            );
            object.comment_type = UnionType::from_fully_qualified_string(registry, "\\Nowhere[]").expect("parses");
            checker.check_class_constant_type(&object);
        });
        assert_eq!(
            found.names(),
            vec!["TemplateTypeConstant", "UndeclaredTypeClassConstant"]
        );
    }
}
