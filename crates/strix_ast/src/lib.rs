//! strix_ast: the syntax-tree contract consumed by the analyzer.
//!
//! Parsing is not done here. A front end (or a test) produces nodes through
//! `AstBuilder`; the analysis crates only read them.

pub mod builder;
pub mod flags;
pub mod node;
pub mod node_kind;

// Re-export key types
pub use builder::AstBuilder;
pub use flags::*;
pub use node::{Child, ChildKey, Node};
pub use node_kind::NodeKind;
