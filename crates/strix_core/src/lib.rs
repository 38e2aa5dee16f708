//! strix_core: Core utilities shared by every strix crate.
//!
//! Provides string interning for canonical type keys, insertion-ordered
//! collections, and the recursion limits the analysis layers agree on.

pub mod collections;
pub mod intern;
pub mod limits;

// Re-export commonly used types
pub use collections::{MultiMap, OrderedMap};
pub use intern::{InternedString, StringInterner};
