//! Everything an evaluation borrows from its driver.

use crate::context::Context;
use strix_ast::Child;
use strix_codebase::CodeBase;
use strix_diagnostics::{Issue, IssueSink};
use strix_options::AnalysisOptions;
use strix_types::TypeRegistry;

/// Refines a context under the assumption that a condition holds (or, with
/// `negate`, that it does not). Narrowing rules live outside the evaluator;
/// the evaluator only asks for the refined context of each conditional arm.
pub trait ConditionNarrower {
    fn narrow(&self, registry: &TypeRegistry, context: &Context, condition: Child<'_>, negate: bool) -> Context;
}

/// Leaves every context as it is.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNarrower;

impl ConditionNarrower for NoopNarrower {
    fn narrow(&self, _registry: &TypeRegistry, context: &Context, _condition: Child<'_>, _negate: bool) -> Context {
        context.clone()
    }
}

/// The shared state of one analysis run.
pub struct AnalysisEnv<'e> {
    pub registry: &'e TypeRegistry,
    pub codebase: &'e mut CodeBase,
    pub options: &'e AnalysisOptions,
    pub issues: &'e mut dyn IssueSink,
    pub narrower: &'e dyn ConditionNarrower,
}

impl<'e> AnalysisEnv<'e> {
    pub fn new(
        registry: &'e TypeRegistry,
        codebase: &'e mut CodeBase,
        options: &'e AnalysisOptions,
        issues: &'e mut dyn IssueSink,
    ) -> Self {
        Self {
            registry,
            codebase,
            options,
            issues,
            narrower: &NoopNarrower,
        }
    }

    pub fn with_narrower(self, narrower: &'e dyn ConditionNarrower) -> Self {
        Self { narrower, ..self }
    }

    pub fn emit(&mut self, issue: Issue) {
        self.issues.emit(issue);
    }
}
