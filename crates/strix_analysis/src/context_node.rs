//! Resolution of the names an expression refers to.
//!
//! `ContextNode` answers "which class, method, property, variable, function
//! or constant does this node mean here". Existence is checked first and
//! accessibility second; each miss is a distinct [`AnalysisFailure`] the
//! caller can report or branch on.

use crate::context::Context;
use crate::env::AnalysisEnv;
use crate::failure::{AnalysisFailure, AnalysisResult};
use crate::scope::Variable;
use crate::union_type_visitor::UnionTypeVisitor;
use strix_ast::{Child, NameKind, Node, NodeKind};
use strix_codebase::{ClassConstant, Func, GlobalConstant, Method, Property, Visibility};
use strix_diagnostics::{issues, Issue, IssueType};
use strix_types::{
    FullyQualifiedClassName, FullyQualifiedPropertyName, TemplateTypeMap, TypeId, TypeKind, UnionType,
};

/// How a member was found.
#[derive(Debug, Clone)]
pub enum Resolution<T> {
    NotFound,
    /// Declared on (or inherited by) the class.
    Found(T),
    /// Not declared, but `__call`, `__callStatic` or `__get` accepts it.
    ViaMagicMethod(T),
}

impl<T> Resolution<T> {
    pub fn into_option(self) -> Option<T> {
        match self {
            Resolution::NotFound => None,
            Resolution::Found(value) | Resolution::ViaMagicMethod(value) => Some(value),
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self, Resolution::NotFound)
    }

    pub fn is_via_magic_method(&self) -> bool {
        matches!(self, Resolution::ViaMagicMethod(_))
    }
}

/// Names that refer to the class in context rather than to a declared class.
fn is_context_class_name(name: &str) -> bool {
    name.eq_ignore_ascii_case("self") || name.eq_ignore_ascii_case("static") || name.eq_ignore_ascii_case("parent")
}

pub struct ContextNode<'v, 'e> {
    env: &'v mut AnalysisEnv<'e>,
    context: &'v Context,
    should_catch_issues: bool,
    depth: u32,
}

impl<'v, 'e> ContextNode<'v, 'e> {
    /// Expressions met while resolving (such as `$class::FOO`) are
    /// evaluated in catch mode.
    pub fn new(env: &'v mut AnalysisEnv<'e>, context: &'v Context) -> Self {
        Self {
            env,
            context,
            should_catch_issues: true,
            depth: 0,
        }
    }

    /// Evaluate nested expressions the way an in-progress evaluation
    /// `depth` levels deep does.
    pub(crate) fn with_mode(mut self, should_catch_issues: bool, depth: u32) -> Self {
        self.should_catch_issues = should_catch_issues;
        self.depth = depth;
        self
    }

    fn failure(&self, issue_type: &'static IssueType, line: u32, args: Vec<String>) -> AnalysisFailure {
        AnalysisFailure::from(self.context.issue(issue_type, line, args))
    }

    fn display(&self, union_type: &UnionType) -> String {
        let rendered = union_type.display(self.env.registry).to_string();
        if rendered.is_empty() {
            "mixed".to_string()
        } else {
            rendered
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    /// The class a `Name` node used as a class reference denotes, without
    /// checking that it exists. `self`, `static` and `parent` resolve
    /// against the class in context.
    pub fn class_fqsen_from_name_node(&mut self, node: &Node<'_>) -> AnalysisResult<FullyQualifiedClassName> {
        let Some(name) = node.child_str("name") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic class name"));
        };
        let kind = NameKind::from_flags(node.flags).unwrap_or(NameKind::NotFullyQualified);
        if kind != NameKind::NotFullyQualified || !is_context_class_name(name) {
            return Ok(self.context.resolve_class_name(name, kind));
        }

        let Some(class_fqsen) = self.context.class_fqsen().cloned() else {
            return Err(self.failure(&issues::ContextNotObject, node.lineno, vec![name.to_ascii_lowercase()]));
        };
        if !name.eq_ignore_ascii_case("parent") {
            return Ok(class_fqsen);
        }
        if !self.env.codebase.has_class_with_fqsen(&class_fqsen) {
            return Err(self.failure(&issues::UndeclaredClassReference, node.lineno, vec![class_fqsen.to_string()]));
        }
        let (is_trait, parent) = {
            let clazz = self.env.codebase.get_class_by_fqsen(&class_fqsen);
            (clazz.is_trait(), clazz.parent.clone())
        };
        if is_trait {
            return Err(self.failure(&issues::TraitParentReference, node.lineno, vec![class_fqsen.to_string()]));
        }
        match parent {
            Some(parent) => Ok(parent),
            None => Err(self.failure(&issues::ParentlessClass, node.lineno, vec![class_fqsen.to_string()])),
        }
    }

    /// Classes named by a class-reference child: a `Name` node, or any
    /// expression whose type holds class or class-string members. Every
    /// class must exist.
    pub fn resolve_class_reference(&mut self, child: Child<'_>) -> AnalysisResult<Vec<FullyQualifiedClassName>> {
        match child {
            Child::Node(node) if node.is(NodeKind::Name) => {
                let fqsen = self.class_fqsen_from_name_node(node)?;
                if !self.env.codebase.has_class_with_fqsen(&fqsen) {
                    return Err(self.failure(&issues::UndeclaredClassReference, node.lineno, vec![fqsen.to_string()]));
                }
                Ok(vec![fqsen])
            }
            Child::Str(name) => {
                let fqsen = FullyQualifiedClassName::from_full_name(name);
                if !self.env.codebase.has_class_with_fqsen(&fqsen) {
                    return Err(self.failure(&issues::UndeclaredClassReference, self.context.line(), vec![fqsen.to_string()]));
                }
                Ok(vec![fqsen])
            }
            _ => {
                let union_type =
                    UnionTypeVisitor::nested(&mut *self.env, self.context, self.should_catch_issues, self.depth)
                        .visit(child)?;
                let line = child.lineno().unwrap_or(self.context.line());
                let mut classes = self.class_list_from_union_type(&union_type, line)?;
                let registry = self.env.registry;
                for id in union_type.iter() {
                    if let TypeKind::LiteralString(name) = &registry.get(id).kind {
                        let fqsen = FullyQualifiedClassName::from_full_name(name);
                        if self.env.codebase.has_class_with_fqsen(&fqsen) && !classes.contains(&fqsen) {
                            classes.push(fqsen);
                        }
                    }
                }
                Ok(classes)
            }
        }
    }

    /// The classes of the class-like members of a receiver's type, failing
    /// with `UndeclaredClassReference` on the first unknown one.
    pub fn class_list_from_union_type(
        &mut self,
        union_type: &UnionType,
        line: u32,
    ) -> AnalysisResult<Vec<FullyQualifiedClassName>> {
        self.class_list_with_issue(union_type, |fqsen| {
            (&issues::UndeclaredClassReference, line, vec![fqsen.to_string()])
        })
    }

    /// Like [`class_list_from_union_type`](Self::class_list_from_union_type)
    /// with a caller-chosen issue for unknown classes.
    pub fn class_list_with_issue(
        &mut self,
        union_type: &UnionType,
        on_missing: impl Fn(&FullyQualifiedClassName) -> (&'static IssueType, u32, Vec<String>),
    ) -> AnalysisResult<Vec<FullyQualifiedClassName>> {
        let registry = self.env.registry;
        let mut classes = Vec::new();
        for id in union_type.iter() {
            let ty = registry.get(id);
            let fqsen = match &ty.kind {
                TypeKind::Class { fqsen, .. } => fqsen.clone(),
                _ if ty.is_static_like() => match self.context.class_fqsen() {
                    Some(fqsen) => fqsen.clone(),
                    None => continue,
                },
                _ => continue,
            };
            if classes.contains(&fqsen) {
                continue;
            }
            if !self.env.codebase.has_class_with_fqsen(&fqsen) {
                let (issue_type, line, args) = on_missing(&fqsen);
                return Err(self.failure(issue_type, line, args));
            }
            classes.push(fqsen);
        }
        Ok(classes)
    }

    /// Template bindings a receiver type carries for `class`, such as
    /// `T => int` for a `\Box<int>` receiver of a class templated on `T`.
    pub fn receiver_template_map(&mut self, receiver: &UnionType, class: &FullyQualifiedClassName) -> TemplateTypeMap {
        let mut map = TemplateTypeMap::default();
        if !self.env.codebase.has_class_with_fqsen(class) {
            return map;
        }
        let names = self.env.codebase.get_class_by_fqsen(class).template_names.clone();
        if names.is_empty() {
            return map;
        }
        for id in receiver.iter() {
            if let TypeKind::Class { fqsen, template_args } = &self.env.registry.get(id).kind {
                if fqsen == class {
                    for (name, arg) in names.iter().zip(template_args) {
                        map.entry(name.clone()).or_default().add_union_type(arg);
                    }
                }
            }
        }
        map
    }

    // ========================================================================
    // Methods
    // ========================================================================

    /// Look up `name` on `class`, falling back to `__call`/`__callStatic`.
    pub fn find_method(&mut self, class: &FullyQualifiedClassName, name: &str, is_static: bool) -> Resolution<Method> {
        if let Some(method) = self.env.codebase.get_method(class, name) {
            return Resolution::Found(method.clone());
        }
        let magic = if is_static { "__callStatic" } else { "__call" };
        match self.env.codebase.get_method(class, magic) {
            Some(method) => Resolution::ViaMagicMethod(method.clone()),
            None => Resolution::NotFound,
        }
    }

    /// Every candidate class's declaration of `name`.
    ///
    /// With no candidate classes at all, the receiver was not an object and
    /// the failure names its type. With classes but no declaration, the
    /// failure names the first class.
    pub fn resolve_methods(
        &mut self,
        classes: &[FullyQualifiedClassName],
        name: &str,
        is_static: bool,
        receiver: &UnionType,
        line: u32,
    ) -> AnalysisResult<Vec<Resolution<Method>>> {
        if classes.is_empty() {
            let receiver = self.display(receiver);
            return Err(self.failure(&issues::NonClassMethodCall, line, vec![name.to_string(), receiver]));
        }
        let mut found = Vec::new();
        for class in classes {
            let resolution = self.find_method(class, name, is_static);
            if let Resolution::Found(method) = &resolution {
                self.check_method_access(method, line)?;
            }
            if resolution.is_found() {
                found.push(resolution);
            }
        }
        if found.is_empty() {
            let issue_type = if is_static {
                &issues::UndeclaredStaticMethod
            } else {
                &issues::UndeclaredMethod
            };
            return Err(self.failure(issue_type, line, vec![format!("{}::{}", classes[0], name)]));
        }
        Ok(found)
    }

    pub fn check_method_access(&mut self, method: &Method, line: u32) -> AnalysisResult<()> {
        if method.is_public() {
            return Ok(());
        }
        let defining_class = method.defining_fqsen.class.clone();
        let class = method.fqsen.class.clone();
        if self.can_access(&defining_class, &class, method.is_private()) {
            return Ok(());
        }
        let issue_type = if method.is_private() {
            &issues::AccessMethodPrivate
        } else {
            &issues::AccessMethodProtected
        };
        let args = vec![
            method.fqsen.to_string(),
            method.location.file.clone(),
            method.location.line.to_string(),
        ];
        Err(self.failure(issue_type, line, args))
    }

    /// Whether the class in context may see a private or protected member
    /// declared on `defining_class` and reached through `class`. Members a
    /// trait contributes belong to the class using it.
    fn can_access(
        &mut self,
        defining_class: &FullyQualifiedClassName,
        class: &FullyQualifiedClassName,
        is_private: bool,
    ) -> bool {
        let Some(context_class) = self.context.class_fqsen().cloned() else {
            return false;
        };
        if &context_class == defining_class {
            return true;
        }
        let defined_in_trait = self.env.codebase.class(defining_class).is_some_and(|c| c.is_trait());
        if defined_in_trait && &context_class == class {
            return true;
        }
        if is_private {
            return false;
        }
        let registry = self.env.registry;
        self.env.codebase.is_subclass_of(registry, &context_class, defining_class)
            || self.env.codebase.is_subclass_of(registry, defining_class, &context_class)
            || (defined_in_trait && self.env.codebase.is_subclass_of(registry, &context_class, class))
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Look up a property, falling back to `__get` for instance access.
    pub fn find_property(&mut self, class: &FullyQualifiedClassName, name: &str, is_static: bool) -> Resolution<Property> {
        if let Some(property) = self.env.codebase.get_property(class, name) {
            if property.is_static() == is_static {
                return Resolution::Found(property.clone());
            }
            return Resolution::NotFound;
        }
        if is_static {
            return Resolution::NotFound;
        }
        match self.env.codebase.get_method(class, "__get") {
            Some(getter) => {
                let union_type = getter.signature.return_type.clone();
                let mut property = Property::new(FullyQualifiedPropertyName::new(class.clone(), name), union_type);
                property.is_magic = true;
                Resolution::ViaMagicMethod(property)
            }
            None => Resolution::NotFound,
        }
    }

    /// The property `name` on each candidate class that has it.
    pub fn resolve_properties(
        &mut self,
        classes: &[FullyQualifiedClassName],
        name: &str,
        is_static: bool,
        line: u32,
    ) -> AnalysisResult<Vec<Property>> {
        let mut found = Vec::new();
        for class in classes {
            match self.find_property(class, name, is_static) {
                Resolution::Found(property) => {
                    self.check_property_access(&property, line)?;
                    found.push(property);
                }
                Resolution::ViaMagicMethod(property) => found.push(property),
                Resolution::NotFound => {}
            }
        }
        if found.is_empty() {
            if let Some(class) = classes.first() {
                return Err(if is_static {
                    self.failure(&issues::UndeclaredStaticProperty, line, vec![name.to_string(), class.to_string()])
                } else {
                    self.failure(&issues::UndeclaredProperty, line, vec![format!("{}::${}", class, name)])
                });
            }
        }
        Ok(found)
    }

    /// The property, creating an untyped dynamic one when the class has
    /// neither a declaration nor `__get`. An inaccessible property is a
    /// failure, not a reason to create one.
    pub fn get_or_create_property(
        &mut self,
        class: &FullyQualifiedClassName,
        name: &str,
        is_static: bool,
        line: u32,
    ) -> AnalysisResult<Property> {
        match self.find_property(class, name, is_static) {
            Resolution::Found(property) => {
                self.check_property_access(&property, line)?;
                Ok(property)
            }
            Resolution::ViaMagicMethod(property) => Ok(property),
            Resolution::NotFound if is_static => Err(self.failure(
                &issues::UndeclaredStaticProperty,
                line,
                vec![name.to_string(), class.to_string()],
            )),
            Resolution::NotFound => {
                let location = strix_codebase::Location::new(self.context.file(), line);
                let property = Property::dynamic(FullyQualifiedPropertyName::new(class.clone(), name), location);
                self.env.codebase.add_property(property.clone());
                Ok(property)
            }
        }
    }

    pub fn check_property_access(&mut self, property: &Property, line: u32) -> AnalysisResult<()> {
        if property.is_public() {
            return Ok(());
        }
        let defining_class = property.defining_fqsen.class.clone();
        let class = property.fqsen.class.clone();
        if self.can_access(&defining_class, &class, property.is_private()) {
            return Ok(());
        }
        let issue_type = if property.is_private() {
            &issues::AccessPropertyPrivate
        } else {
            &issues::AccessPropertyProtected
        };
        let args = vec![
            property.fqsen.to_string(),
            property.location.file.clone(),
            property.location.line.to_string(),
        ];
        Err(self.failure(issue_type, line, args))
    }

    // ========================================================================
    // Variables
    // ========================================================================

    /// The type of `$name`. `$this` is the class in context; hardcoded
    /// globals are always defined.
    pub fn resolve_variable(&mut self, name: &str, line: u32) -> AnalysisResult<UnionType> {
        let registry = self.env.registry;
        let context = self.context;
        if name == "this" && !context.is_static_function() {
            if let Some(class) = context.class_fqsen() {
                return Ok(UnionType::of(registry.class_type(class)));
            }
        }
        let scope = context.scope();
        if let Some(variable) = scope.get_variable_with_name(name) {
            return Ok(variable.union_type.clone());
        }
        if let Some(union_type) = scope.hardcoded_variable_type(registry, name) {
            return Ok(union_type);
        }
        let mut issue: Issue = context.issue(&issues::UndeclaredVariable, line, vec![name.to_string()]);
        if let Some(similar) = scope.similar_variable_name(name) {
            issue = issue.with_suggestion(format!("Did you mean ${}", similar));
        }
        Err(issue.into())
    }

    /// Like [`resolve_variable`](Self::resolve_variable), except that in
    /// global scope with undeclared variables ignored, a missing variable
    /// is defined with the empty type instead of failing.
    pub fn resolve_or_create_variable(&mut self, name: &str, line: u32) -> AnalysisResult<UnionType> {
        match self.resolve_variable(name, line) {
            Err(failure)
                if failure.is(&issues::UndeclaredVariable)
                    && self.context.is_in_global_scope()
                    && self.env.options.ignore_undeclared_variables_in_global_scope =>
            {
                self.context.add_scope_variable(Variable::new(name, UnionType::empty()));
                Ok(UnionType::empty())
            }
            result => result,
        }
    }

    // ========================================================================
    // Functions and constants
    // ========================================================================

    pub fn resolve_function(&mut self, name_node: &Node<'_>) -> AnalysisResult<Func> {
        let Some(name) = name_node.child_str("name") else {
            return Err(AnalysisFailure::unanalyzable(name_node.id, "dynamic function name"));
        };
        let kind = NameKind::from_flags(name_node.flags).unwrap_or(NameKind::NotFullyQualified);
        let (fqsen, fallback) = self.context.resolve_function_name(name, kind);
        let codebase = &*self.env.codebase;
        if let Some(func) = codebase.get_function_by_fqsen(&fqsen) {
            return Ok(func.clone());
        }
        if let Some(func) = fallback.as_ref().and_then(|f| codebase.get_function_by_fqsen(f)) {
            return Ok(func.clone());
        }
        Err(self.failure(&issues::UndeclaredFunction, name_node.lineno, vec![fqsen.to_string()]))
    }

    pub fn resolve_global_constant(&mut self, name_node: &Node<'_>) -> AnalysisResult<GlobalConstant> {
        let Some(name) = name_node.child_str("name") else {
            return Err(AnalysisFailure::unanalyzable(name_node.id, "dynamic constant name"));
        };
        let kind = NameKind::from_flags(name_node.flags).unwrap_or(NameKind::NotFullyQualified);
        let (fqsen, fallback) = self.context.resolve_constant_name(name, kind);
        let codebase = &*self.env.codebase;
        if let Some(constant) = codebase.get_global_constant_by_fqsen(&fqsen) {
            return Ok(constant.clone());
        }
        if let Some(constant) = fallback.as_ref().and_then(|f| codebase.get_global_constant_by_fqsen(f)) {
            return Ok(constant.clone());
        }
        Err(self.failure(&issues::UndeclaredConstant, name_node.lineno, vec![fqsen.to_string()]))
    }

    /// `name` on every class the class reference denotes.
    pub fn resolve_class_constant(
        &mut self,
        class: Child<'_>,
        name: &str,
        line: u32,
    ) -> AnalysisResult<Vec<ClassConstant>> {
        let classes = self.resolve_class_reference(class)?;
        let mut found = Vec::new();
        for fqsen in &classes {
            if let Some(constant) = self.env.codebase.get_class_constant(fqsen, name) {
                found.push(constant.clone());
            }
        }
        match classes.first() {
            Some(first) if found.is_empty() => Err(self.failure(
                &issues::UndeclaredClassConstant,
                line,
                vec![format!("{}::{}", first, name)],
            )),
            _ => Ok(found),
        }
    }

    /// The class type `static` and `self` stand for here, if any.
    pub fn context_class_type(&self) -> Option<TypeId> {
        self.context.class_fqsen().map(|fqsen| self.env.registry.class_type(fqsen))
    }
}
