//! The node contract consumed by the analysis layers.
//!
//! A node is a `kind`, a raw `flags` word, a line number and an ordered
//! list of children. Children are keyed either positionally (list nodes such
//! as `Array` or `ArgList`) or by a fixed name (`expr`, `class`, `args`,
//! `left`, `right`, `cond`, `true`, `false`, `dim`, `name`, `prop`,
//! `method`, `const`, ...). All nodes and child slices live in an arena.

use crate::flags::NodeId;
use crate::node_kind::NodeKind;
use std::fmt;

// ============================================================================
// Child keys and values
// ============================================================================

/// Key of a child slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKey {
    Index(u32),
    Name(&'static str),
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKey::Index(i) => write!(f, "{}", i),
            ChildKey::Name(name) => f.write_str(name),
        }
    }
}

/// A child value: a nested node or a literal scalar. `Null` marks an
/// absent optional child (for example the `true` arm of `a ?: b`).
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Node(&'a Node<'a>),
    Int(i64),
    Float(f64),
    Str(&'a str),
    Bool(bool),
    Null,
}

impl<'a> Child<'a> {
    #[inline]
    pub fn as_node(&self) -> Option<&'a Node<'a>> {
        match *self {
            Child::Node(node) => Some(node),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            Child::Str(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Child::Null)
    }

    /// Whether this child is a literal scalar rather than a node.
    pub fn is_scalar(&self) -> bool {
        matches!(self, Child::Int(_) | Child::Float(_) | Child::Str(_) | Child::Bool(_))
    }

    /// Line of the child node, if it is a node.
    pub fn lineno(&self) -> Option<u32> {
        self.as_node().map(|n| n.lineno)
    }
}

impl<'a> From<&'a Node<'a>> for Child<'a> {
    fn from(node: &'a Node<'a>) -> Self {
        Child::Node(node)
    }
}

impl<'a> From<i64> for Child<'a> {
    fn from(value: i64) -> Self {
        Child::Int(value)
    }
}

impl<'a> From<f64> for Child<'a> {
    fn from(value: f64) -> Self {
        Child::Float(value)
    }
}

impl<'a> From<bool> for Child<'a> {
    fn from(value: bool) -> Self {
        Child::Bool(value)
    }
}

impl<'a> From<&'a str> for Child<'a> {
    fn from(value: &'a str) -> Self {
        Child::Str(value)
    }
}

impl<'a, T: Into<Child<'a>>> From<Option<T>> for Child<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Child::Null, Into::into)
    }
}

// ============================================================================
// Node
// ============================================================================

/// A syntax node. Nodes are immutable once built.
pub struct Node<'a> {
    pub id: NodeId,
    pub kind: NodeKind,
    pub flags: u32,
    pub lineno: u32,
    pub children: &'a [(ChildKey, Child<'a>)],
}

impl<'a> Node<'a> {
    /// Look up a named child. Returns `None` for a missing slot; an
    /// explicitly null slot yields `Some(Child::Null)`.
    pub fn child(&self, name: &str) -> Option<Child<'a>> {
        self.children.iter().find_map(|(key, child)| match key {
            ChildKey::Name(n) if *n == name => Some(*child),
            _ => None,
        })
    }

    /// Named child as a node, treating missing and null slots alike.
    pub fn child_node(&self, name: &str) -> Option<&'a Node<'a>> {
        self.child(name).and_then(|c| c.as_node())
    }

    /// Named child as a string literal.
    pub fn child_str(&self, name: &str) -> Option<&'a str> {
        self.child(name).and_then(|c| c.as_str())
    }

    /// Positional child.
    pub fn child_at(&self, index: u32) -> Option<Child<'a>> {
        self.children.iter().find_map(|(key, child)| match key {
            ChildKey::Index(i) if *i == index => Some(*child),
            _ => None,
        })
    }

    /// All positional children in order.
    pub fn list(&self) -> impl Iterator<Item = Child<'a>> + 'a {
        let children: &'a [(ChildKey, Child<'a>)] = self.children;
        children.iter().filter_map(|(key, child)| match key {
            ChildKey::Index(_) => Some(*child),
            ChildKey::Name(_) => None,
        })
    }

    pub fn list_len(&self) -> usize {
        self.children
            .iter()
            .filter(|(key, _)| matches!(key, ChildKey::Index(_)))
            .count()
    }

    #[inline]
    pub fn is(&self, kind: NodeKind) -> bool {
        self.kind == kind
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Node");
        s.field("id", &self.id.0)
            .field("kind", &self.kind)
            .field("flags", &self.flags)
            .field("lineno", &self.lineno);
        if !self.children.is_empty() {
            let keys: Vec<String> = self.children.iter().map(|(k, _)| k.to_string()).collect();
            s.field("children", &keys);
        }
        s.finish()
    }
}
