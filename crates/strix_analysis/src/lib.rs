//! strix_analysis: Infers the union type of expression nodes.
//!
//! `evaluate` walks an expression tree against a `Context` (file, scope,
//! class and function) and an `AnalysisEnv` (registry, code base, options,
//! issue sink), reporting issues as it goes. Results are memoized per node
//! in the context's type cache. `DeclarationChecker` validates declared
//! signatures and doc-comment types once the code base is populated.

mod array;
mod binary_op;
mod context;
mod context_node;
mod declarations;
mod env;
mod failure;
mod member;
mod scope;
mod union_type_visitor;

#[cfg(test)]
mod test_support;

pub use context::{Context, FunctionLike, NamespaceMap, TypeCache};
pub use context_node::{ContextNode, Resolution};
pub use declarations::DeclarationChecker;
pub use env::{AnalysisEnv, ConditionNarrower, NoopNarrower};
pub use failure::{AnalysisFailure, AnalysisResult};
pub use scope::{Scope, Variable};
pub use union_type_visitor::{evaluate, UnionTypeVisitor};
