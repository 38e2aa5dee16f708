//! Shared setup for the analysis integration tests.

#![allow(dead_code)]

use strix_analysis::{evaluate, AnalysisEnv, AnalysisResult, Context, UnionTypeVisitor, Variable};
use strix_ast::Child;
use strix_codebase::{CodeBase, Func, Parameter, Signature};
use strix_diagnostics::IssueCollection;
use strix_options::AnalysisOptions;
use strix_types::{FullyQualifiedFunctionName, TypeRegistry, UnionType};

/// Route `tracing` events to the test harness; `RUST_LOG=strix_analysis=trace`
/// shows cache hits and swallowed nodes.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One file's worth of analysis state: a registry, a code base with a few
/// builtins, the issues reported so far and a global-scope context.
pub struct Session {
    pub registry: TypeRegistry,
    pub codebase: CodeBase,
    pub options: AnalysisOptions,
    pub issues: IssueCollection,
    pub context: Context,
}

impl Session {
    pub fn new() -> Self {
        Self::with_options(AnalysisOptions::default())
    }

    pub fn with_options(options: AnalysisOptions) -> Self {
        init_tracing();
        let registry = TypeRegistry::with_options(&options);
        let mut codebase = CodeBase::new(&options);
        let int = || UnionType::of(strix_types::TypeId::INT);
        codebase.add_function(Func::new(
            FullyQualifiedFunctionName::from_full_name("rand"),
            Signature::new(vec![Parameter::optional("min", int()), Parameter::optional("max", int())], int()),
        ));
        codebase.add_function(Func::new(
            FullyQualifiedFunctionName::from_full_name("strlen"),
            Signature::new(
                vec![Parameter::new("string", UnionType::of(strix_types::TypeId::STRING))],
                int(),
            ),
        ));
        Self {
            registry,
            codebase,
            options,
            issues: IssueCollection::new(),
            context: Context::new("input.php"),
        }
    }

    pub fn define(&mut self, name: &str, type_string: &str) {
        let union_type = UnionType::from_fully_qualified_string(&self.registry, type_string).expect("type parses");
        self.context.add_scope_variable(Variable::new(name, union_type));
    }

    pub fn eval(&mut self, node: Child<'_>) -> String {
        let context = self.context.clone();
        self.eval_in(&context, node)
    }

    pub fn eval_in(&mut self, context: &Context, node: Child<'_>) -> String {
        let mut env = AnalysisEnv::new(&self.registry, &mut self.codebase, &self.options, &mut self.issues);
        let union_type = evaluate(&mut env, context, node);
        union_type.display(&self.registry).to_string()
    }

    /// Evaluate without catching issues.
    pub fn eval_strict(&mut self, node: Child<'_>) -> AnalysisResult<UnionType> {
        let mut env = AnalysisEnv::new(&self.registry, &mut self.codebase, &self.options, &mut self.issues);
        UnionTypeVisitor::union_type_from_node(&mut env, &self.context, node, false)
    }

    pub fn issue_names(&self) -> Vec<&'static str> {
        self.issues.names()
    }
}
