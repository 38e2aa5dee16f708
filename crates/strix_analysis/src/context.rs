//! Where an expression is being evaluated.
//!
//! `Context` is a cheap value: every `with_*` method returns a new context
//! and leaves the receiver untouched, so sibling branches never observe each
//! other's changes. Heavy parts (alias map, template names) are shared
//! behind `Rc`. The variable scope and the per-node type cache are shared by
//! reference: copies of a context see the same scope until one of them is
//! given its own with `with_scope` or `with_scope_variable`.

use crate::scope::{Scope, Variable};
use rustc_hash::FxHashMap;
use std::cell::{Ref, RefCell};
use std::rc::Rc;
use strix_ast::{NameKind, NodeId};
use strix_diagnostics::{Issue, IssueType};
use strix_types::{
    FullyQualifiedClassName, FullyQualifiedFunctionName, FullyQualifiedGlobalConstantName, FullyQualifiedMethodName,
    NameResolver, UnionType,
};

/// `use` imports in effect for the current namespace. Class and function
/// aliases are case-insensitive; constant aliases are not.
#[derive(Debug, Clone, Default)]
pub struct NamespaceMap {
    classes: FxHashMap<String, FullyQualifiedClassName>,
    functions: FxHashMap<String, FullyQualifiedFunctionName>,
    constants: FxHashMap<String, FullyQualifiedGlobalConstantName>,
}

impl NamespaceMap {
    pub fn add_class_alias(&mut self, alias: &str, target: FullyQualifiedClassName) {
        self.classes.insert(alias.to_ascii_lowercase(), target);
    }

    pub fn add_function_alias(&mut self, alias: &str, target: FullyQualifiedFunctionName) {
        self.functions.insert(alias.to_ascii_lowercase(), target);
    }

    pub fn add_constant_alias(&mut self, alias: &str, target: FullyQualifiedGlobalConstantName) {
        self.constants.insert(alias.to_string(), target);
    }

    pub fn class_alias(&self, alias: &str) -> Option<&FullyQualifiedClassName> {
        self.classes.get(&alias.to_ascii_lowercase())
    }

    pub fn function_alias(&self, alias: &str) -> Option<&FullyQualifiedFunctionName> {
        self.functions.get(&alias.to_ascii_lowercase())
    }

    pub fn constant_alias(&self, alias: &str) -> Option<&FullyQualifiedGlobalConstantName> {
        self.constants.get(alias)
    }
}

/// The function-like element whose body is being evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionLike {
    Function(FullyQualifiedFunctionName),
    Method(FullyQualifiedMethodName),
    Closure,
}

/// Per-lineage cache of evaluated node types.
pub type TypeCache = Rc<RefCell<FxHashMap<NodeId, UnionType>>>;

#[derive(Debug, Clone)]
pub struct Context {
    file: Rc<str>,
    line: u32,
    namespace: Rc<str>,
    namespace_map: Rc<NamespaceMap>,
    class_fqsen: Option<FullyQualifiedClassName>,
    function: Option<FunctionLike>,
    is_static_function: bool,
    template_names: Rc<Vec<String>>,
    strict_types: bool,
    scope: Rc<RefCell<Scope>>,
    type_cache: TypeCache,
}

impl Context {
    /// Global scope of `file`, in the root namespace.
    pub fn new(file: &str) -> Self {
        Self {
            file: Rc::from(file),
            line: 0,
            namespace: Rc::from("\\"),
            namespace_map: Rc::new(NamespaceMap::default()),
            class_fqsen: None,
            function: None,
            is_static_function: false,
            template_names: Rc::new(Vec::new()),
            strict_types: false,
            scope: Rc::new(RefCell::new(Scope::global())),
            type_cache: Rc::default(),
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn namespace_map(&self) -> &NamespaceMap {
        &self.namespace_map
    }

    pub fn class_fqsen(&self) -> Option<&FullyQualifiedClassName> {
        self.class_fqsen.as_ref()
    }

    pub fn is_in_class_scope(&self) -> bool {
        self.class_fqsen.is_some()
    }

    pub fn function(&self) -> Option<&FunctionLike> {
        self.function.as_ref()
    }

    pub fn is_in_function_scope(&self) -> bool {
        self.function.is_some()
    }

    /// Inside a static method or static closure, where `$this` is unbound.
    pub fn is_static_function(&self) -> bool {
        self.is_static_function
    }

    pub fn is_in_global_scope(&self) -> bool {
        self.scope.borrow().is_global()
    }

    pub fn template_names(&self) -> &[String] {
        &self.template_names
    }

    pub fn is_strict(&self) -> bool {
        self.strict_types
    }

    pub fn scope(&self) -> Ref<'_, Scope> {
        self.scope.borrow()
    }

    // ========================================================================
    // Derived contexts
    // ========================================================================

    pub fn with_file(&self, file: &str) -> Self {
        Self { file: Rc::from(file), ..self.clone() }
    }

    pub fn with_line_number_start(&self, line: u32) -> Self {
        Self { line, ..self.clone() }
    }

    /// Enter `namespace`. Imports do not carry across namespaces.
    pub fn with_namespace(&self, namespace: &str) -> Self {
        Self {
            namespace: Rc::from(strix_types::fqsen::normalize_namespace(namespace)),
            namespace_map: Rc::new(NamespaceMap::default()),
            ..self.clone()
        }
    }

    pub fn with_namespace_map(&self, namespace_map: NamespaceMap) -> Self {
        Self {
            namespace_map: Rc::new(namespace_map),
            ..self.clone()
        }
    }

    pub fn with_class_fqsen(&self, class_fqsen: FullyQualifiedClassName) -> Self {
        Self {
            class_fqsen: Some(class_fqsen),
            ..self.clone()
        }
    }

    /// Enter a function-like body with a fresh local scope.
    pub fn with_function(&self, function: FunctionLike, is_static: bool) -> Self {
        Self {
            function: Some(function),
            is_static_function: is_static,
            scope: Rc::new(RefCell::new(Scope::function())),
            ..self.clone()
        }
    }

    pub fn with_template_names(&self, names: Vec<String>) -> Self {
        Self {
            template_names: Rc::new(names),
            ..self.clone()
        }
    }

    pub fn with_strict_types(&self, strict_types: bool) -> Self {
        Self { strict_types, ..self.clone() }
    }

    pub fn with_scope(&self, scope: Scope) -> Self {
        Self {
            scope: Rc::new(RefCell::new(scope)),
            ..self.clone()
        }
    }

    /// A copy of this context whose scope also holds `variable`. The
    /// receiver's scope is unchanged.
    pub fn with_scope_variable(&self, variable: Variable) -> Self {
        let mut scope = self.scope.borrow().clone();
        scope.add_variable(variable);
        self.with_scope(scope)
    }

    /// Start a new evaluation pass: nothing cached by earlier passes is reused.
    pub fn with_fresh_type_cache(&self) -> Self {
        Self {
            type_cache: Rc::default(),
            ..self.clone()
        }
    }

    // ========================================================================
    // Scope side effects
    // ========================================================================

    /// Define a variable in the shared scope. This is the one write the
    /// evaluator performs: materializing an implicit variable on first use.
    pub fn add_scope_variable(&self, variable: Variable) {
        self.scope.borrow_mut().add_variable(variable);
    }

    // ========================================================================
    // Node type cache
    // ========================================================================

    pub fn cached_type(&self, node: NodeId) -> Option<UnionType> {
        self.type_cache.borrow().get(&node).cloned()
    }

    pub fn cache_type(&self, node: NodeId, union_type: UnionType) {
        self.type_cache.borrow_mut().insert(node, union_type);
    }

    pub fn cached_type_count(&self) -> usize {
        self.type_cache.borrow().len()
    }

    // ========================================================================
    // Name resolution
    // ========================================================================

    fn qualify(&self, name: &str) -> String {
        if &*self.namespace == "\\" {
            format!("\\{}", name)
        } else {
            format!("{}\\{}", self.namespace, name)
        }
    }

    /// Resolve a class name as written at this point of the file.
    pub fn resolve_class_name(&self, name: &str, kind: NameKind) -> FullyQualifiedClassName {
        match kind {
            NameKind::FullyQualified => FullyQualifiedClassName::from_full_name(name),
            NameKind::Relative => FullyQualifiedClassName::from_full_name(&self.qualify(name)),
            NameKind::NotFullyQualified => {
                let (head, rest) = match name.split_once('\\') {
                    Some((head, rest)) => (head, Some(rest)),
                    None => (name, None),
                };
                match (self.namespace_map.class_alias(head), rest) {
                    (Some(target), None) => target.clone(),
                    (Some(target), Some(rest)) => {
                        FullyQualifiedClassName::from_full_name(&format!("{}\\{}", target, rest))
                    }
                    (None, _) => FullyQualifiedClassName::from_full_name(&self.qualify(name)),
                }
            }
        }
    }

    /// Resolve a function name. The second value is the root-namespace
    /// fallback tried when the namespaced function does not exist.
    pub fn resolve_function_name(
        &self,
        name: &str,
        kind: NameKind,
    ) -> (FullyQualifiedFunctionName, Option<FullyQualifiedFunctionName>) {
        match kind {
            NameKind::FullyQualified => (FullyQualifiedFunctionName::from_full_name(name), None),
            NameKind::Relative => (FullyQualifiedFunctionName::from_full_name(&self.qualify(name)), None),
            NameKind::NotFullyQualified => match name.split_once('\\') {
                Some((head, rest)) => {
                    let full = match self.namespace_map.class_alias(head) {
                        Some(target) => format!("{}\\{}", target, rest),
                        None => self.qualify(name),
                    };
                    (FullyQualifiedFunctionName::from_full_name(&full), None)
                }
                None => {
                    if let Some(target) = self.namespace_map.function_alias(name) {
                        return (target.clone(), None);
                    }
                    let fqsen = FullyQualifiedFunctionName::from_full_name(&self.qualify(name));
                    let fallback = (&*self.namespace != "\\").then(|| fqsen.in_root_namespace());
                    (fqsen, fallback)
                }
            },
        }
    }

    /// Resolve a global constant name, with the same fallback rule as functions.
    pub fn resolve_constant_name(
        &self,
        name: &str,
        kind: NameKind,
    ) -> (FullyQualifiedGlobalConstantName, Option<FullyQualifiedGlobalConstantName>) {
        match kind {
            NameKind::FullyQualified => (FullyQualifiedGlobalConstantName::from_full_name(name), None),
            NameKind::Relative => (FullyQualifiedGlobalConstantName::from_full_name(&self.qualify(name)), None),
            NameKind::NotFullyQualified => match name.split_once('\\') {
                Some((head, rest)) => {
                    let full = match self.namespace_map.class_alias(head) {
                        Some(target) => format!("{}\\{}", target, rest),
                        None => self.qualify(name),
                    };
                    (FullyQualifiedGlobalConstantName::from_full_name(&full), None)
                }
                None => {
                    if let Some(target) = self.namespace_map.constant_alias(name) {
                        return (target.clone(), None);
                    }
                    let fqsen = FullyQualifiedGlobalConstantName::from_full_name(&self.qualify(name));
                    let fallback = (&*self.namespace != "\\").then(|| fqsen.in_root_namespace());
                    (fqsen, fallback)
                }
            },
        }
    }

    /// An issue located at `line` of this file.
    pub fn issue(&self, issue_type: &'static IssueType, line: u32, args: Vec<String>) -> Issue {
        Issue::new(issue_type, &*self.file, line, args)
    }
}

/// Resolves names in doc-comment type strings.
impl NameResolver for Context {
    fn resolve_class_name(&self, name: &str) -> FullyQualifiedClassName {
        match name.strip_prefix('\\') {
            Some(rest) => FullyQualifiedClassName::from_full_name(rest),
            None => Context::resolve_class_name(self, name, NameKind::NotFullyQualified),
        }
    }

    fn is_template_name(&self, name: &str) -> bool {
        self.template_names.iter().any(|t| t == name)
    }

    fn self_class(&self) -> Option<FullyQualifiedClassName> {
        self.class_fqsen.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_types::{TypeId, TypeRegistry};

    #[test]
    fn test_with_methods_do_not_mutate_receiver() {
        let base = Context::new("a.php");
        let inner = base.with_namespace("App\\Models").with_line_number_start(12);
        assert_eq!(base.namespace(), "\\");
        assert_eq!(inner.namespace(), "\\App\\Models");
        assert_eq!(inner.line(), 12);
        assert_eq!(base.line(), 0);

        let with_x = base.with_scope_variable(Variable::new("x", UnionType::of(TypeId::INT)));
        assert!(with_x.scope().has_variable_with_name("x"));
        assert!(!base.scope().has_variable_with_name("x"));
    }

    #[test]
    fn test_class_name_resolution() {
        let mut map = NamespaceMap::default();
        map.add_class_alias("Carbon", FullyQualifiedClassName::from_full_name("\\Vendor\\Time\\Carbon"));
        map.add_class_alias("Db", FullyQualifiedClassName::from_full_name("\\Vendor\\Database"));
        let context = Context::new("a.php").with_namespace("App").with_namespace_map(map);

        let resolve = |name: &str, kind| context.resolve_class_name(name, kind).to_string();
        assert_eq!(resolve("User", NameKind::NotFullyQualified), "\\App\\User");
        assert_eq!(resolve("carbon", NameKind::NotFullyQualified), "\\Vendor\\Time\\Carbon");
        assert_eq!(resolve("Db\\Query", NameKind::NotFullyQualified), "\\Vendor\\Database\\Query");
        assert_eq!(resolve("Other\\Thing", NameKind::FullyQualified), "\\Other\\Thing");
        assert_eq!(resolve("Sub\\Thing", NameKind::Relative), "\\App\\Sub\\Thing");
    }

    #[test]
    fn test_function_name_fallback() {
        let context = Context::new("a.php").with_namespace("App");
        let (fqsen, fallback) = context.resolve_function_name("strlen", NameKind::NotFullyQualified);
        assert_eq!(fqsen.to_string(), "\\App\\strlen");
        assert_eq!(fallback.map(|f| f.to_string()), Some("\\strlen".to_string()));

        let root = Context::new("a.php");
        assert!(root.resolve_function_name("strlen", NameKind::NotFullyQualified).1.is_none());
    }

    #[test]
    fn test_doc_comment_names_resolve_in_context() {
        let registry = TypeRegistry::new();
        let context = Context::new("a.php")
            .with_namespace("App")
            .with_template_names(vec!["T".to_string()]);
        let union = UnionType::from_string_in_context(&registry, "User|T|\\Other", &context).unwrap();
        assert_eq!(union.display(&registry).to_string(), "T|\\App\\User|\\Other");
    }

    #[test]
    fn test_type_cache_is_shared_until_refreshed() {
        let context = Context::new("a.php");
        let sibling = context.with_line_number_start(3);
        context.cache_type(NodeId(1), UnionType::of(TypeId::INT));
        assert!(sibling.cached_type(NodeId(1)).is_some());
        assert!(sibling.with_fresh_type_cache().cached_type(NodeId(1)).is_none());
    }
}
