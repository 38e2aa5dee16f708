//! A symbol table and context for evaluator unit tests.

use crate::context::Context;
use crate::env::AnalysisEnv;
use crate::failure::AnalysisResult;
use crate::scope::Variable;
use crate::union_type_visitor::{evaluate, UnionTypeVisitor};
use strix_ast::{Child, ModifierFlags};
use strix_codebase::{Clazz, CodeBase, Func, Method, Parameter, Property, Signature};
use strix_diagnostics::IssueCollection;
use strix_options::AnalysisOptions;
use strix_types::{
    FullyQualifiedClassName, FullyQualifiedFunctionName, FullyQualifiedMethodName, FullyQualifiedPropertyName,
    TypeRegistry, UnionType,
};

pub(crate) struct Harness {
    pub registry: TypeRegistry,
    pub codebase: CodeBase,
    pub options: AnalysisOptions,
    pub issues: IssueCollection,
    pub context: Context,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_options(AnalysisOptions::default())
    }

    pub fn with_options(options: AnalysisOptions) -> Self {
        Self {
            registry: TypeRegistry::with_options(&options),
            codebase: CodeBase::new(&options),
            options,
            issues: IssueCollection::new(),
            context: Context::new("test.php"),
        }
    }

    /// Evaluate in catch mode and render the result.
    pub fn eval(&mut self, node: Child<'_>) -> String {
        let union_type = self.eval_type(node);
        union_type.display(&self.registry).to_string()
    }

    pub fn eval_type(&mut self, node: Child<'_>) -> UnionType {
        let mut env = AnalysisEnv::new(&self.registry, &mut self.codebase, &self.options, &mut self.issues);
        evaluate(&mut env, &self.context, node)
    }

    /// Evaluate without catching lookup failures.
    pub fn try_eval(&mut self, node: Child<'_>) -> AnalysisResult<UnionType> {
        let mut env = AnalysisEnv::new(&self.registry, &mut self.codebase, &self.options, &mut self.issues);
        UnionTypeVisitor::union_type_from_node(&mut env, &self.context, node, false)
    }

    pub fn parse(&self, type_string: &str) -> UnionType {
        self.parse_with_templates(type_string, &[])
    }

    fn parse_with_templates(&self, type_string: &str, templates: &[&str]) -> UnionType {
        let context = self
            .context
            .with_template_names(templates.iter().map(|t| t.to_string()).collect());
        UnionType::from_string_in_context(&self.registry, type_string, &context).expect("test type parses")
    }

    pub fn define_variable(&mut self, name: &str, type_string: &str) {
        let union_type = self.parse(type_string);
        self.context.add_scope_variable(Variable::new(name, union_type));
    }

    pub fn add_class(&mut self, name: &str, parent: Option<&str>, interfaces: &[&str]) -> FullyQualifiedClassName {
        let fqsen = FullyQualifiedClassName::from_full_name(name);
        let mut clazz = Clazz::new(&self.registry, fqsen.clone());
        if let Some(parent) = parent {
            clazz.set_parent(&self.registry, FullyQualifiedClassName::from_full_name(parent));
        }
        for interface in interfaces {
            clazz.add_interface(&self.registry, FullyQualifiedClassName::from_full_name(interface));
        }
        self.codebase.add_class(clazz);
        fqsen
    }

    pub fn add_interface(&mut self, name: &str) {
        let clazz = Clazz::interface(&self.registry, FullyQualifiedClassName::from_full_name(name));
        self.codebase.add_class(clazz);
    }

    pub fn add_generic_class(&mut self, name: &str, templates: &[&str]) {
        let mut clazz = Clazz::new(&self.registry, FullyQualifiedClassName::from_full_name(name));
        clazz.template_names = templates.iter().map(|t| t.to_string()).collect();
        self.codebase.add_class(clazz);
    }

    /// A constructor taking one parameter per template name, typed by it.
    pub fn add_constructor(&mut self, class: &str, templates: &[&str]) {
        let parameters = templates
            .iter()
            .map(|t| Parameter::new(&t.to_ascii_lowercase(), self.parse_with_templates(t, templates)))
            .collect();
        let fqsen = FullyQualifiedMethodName::new(FullyQualifiedClassName::from_full_name(class), "__construct");
        self.codebase.add_method(Method::new(fqsen, Signature::new(parameters, UnionType::empty())));
    }

    pub fn add_method(&mut self, class: &str, name: &str, return_type: &str, flags: ModifierFlags) {
        let fqsen = FullyQualifiedMethodName::new(FullyQualifiedClassName::from_full_name(class), name);
        let mut method = Method::new(fqsen, Signature::new(Vec::new(), self.parse(return_type)));
        method.flags = flags;
        self.codebase.add_method(method);
    }

    pub fn add_property(&mut self, class: &str, name: &str, type_string: &str, flags: ModifierFlags) {
        let fqsen = FullyQualifiedPropertyName::new(FullyQualifiedClassName::from_full_name(class), name);
        let mut property = Property::new(fqsen, self.parse(type_string));
        property.flags = flags;
        self.codebase.add_property(property);
    }

    /// A function whose parameter and return types may use the template
    /// name `T`.
    pub fn add_function(&mut self, name: &str, params: &[&str], return_type: &str) {
        let templates = ["T"];
        let parameters = params
            .iter()
            .enumerate()
            .map(|(i, p)| Parameter::new(&format!("p{}", i), self.parse_with_templates(p, &templates)))
            .collect();
        let mut signature = Signature::new(parameters, self.parse_with_templates(return_type, &templates));
        signature.template_names = vec!["T".to_string()];
        let func = Func::new(FullyQualifiedFunctionName::from_full_name(name), signature);
        self.codebase.add_function(func);
    }
}
