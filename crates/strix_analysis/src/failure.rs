//! Recoverable analysis failures.
//!
//! Lookup misses carry a fully built [`Issue`]; the evaluator either
//! reports it and degrades to the empty type, or hands it to a caller that
//! asked for the raw failure. Node shapes the evaluator cannot model are a
//! separate variant that is never reported.

use strix_ast::NodeId;
use strix_diagnostics::{Issue, IssueType};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisFailure {
    /// A name did not resolve, or a value was used in a way its type forbids.
    #[error("{0}")]
    Issue(Box<Issue>),
    /// The node is outside what the evaluator models, such as a dynamic
    /// member name.
    #[error("cannot analyze {node}: {reason}")]
    Unanalyzable { node: NodeId, reason: &'static str },
}

pub type AnalysisResult<T> = Result<T, AnalysisFailure>;

impl AnalysisFailure {
    pub fn issue(issue_type: &'static IssueType, file: &str, line: u32, args: Vec<String>) -> Self {
        AnalysisFailure::Issue(Box::new(Issue::new(issue_type, file, line, args)))
    }

    pub fn unanalyzable(node: NodeId, reason: &'static str) -> Self {
        AnalysisFailure::Unanalyzable { node, reason }
    }

    pub fn as_issue(&self) -> Option<&Issue> {
        match self {
            AnalysisFailure::Issue(issue) => Some(issue),
            AnalysisFailure::Unanalyzable { .. } => None,
        }
    }

    /// Whether this is an issue of the given type.
    pub fn is(&self, issue_type: &IssueType) -> bool {
        self.as_issue().is_some_and(|issue| issue.issue_type.code == issue_type.code)
    }
}

impl From<Issue> for AnalysisFailure {
    fn from(issue: Issue) -> Self {
        AnalysisFailure::Issue(Box::new(issue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_diagnostics::issues;

    #[test]
    fn test_failure_display() {
        let failure = AnalysisFailure::issue(&issues::UndeclaredVariable, "a.php", 4, vec!["x".into()]);
        assert!(failure.is(&issues::UndeclaredVariable));
        assert_eq!(failure.to_string(), "a.php:4 UndefError UndeclaredVariable Variable $x is undeclared");

        let gap = AnalysisFailure::unanalyzable(NodeId(3), "dynamic property name");
        assert!(gap.as_issue().is_none());
        assert_eq!(gap.to_string(), "cannot analyze NodeId(3): dynamic property name");
    }
}
