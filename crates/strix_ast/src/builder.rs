//! Arena-backed construction of syntax trees.
//!
//! Front ends and tests build trees through `AstBuilder`, which assigns
//! sequential `NodeId`s and stamps each node with the current line.

use crate::flags::*;
use crate::node::{Child, ChildKey, Node};
use crate::node_kind::NodeKind;
use bumpalo::Bump;
use std::cell::Cell;

/// Builds nodes into a `bumpalo` arena.
pub struct AstBuilder<'a> {
    arena: &'a Bump,
    next_id: Cell<u32>,
    line: Cell<u32>,
}

impl<'a> AstBuilder<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            next_id: Cell::new(0),
            line: Cell::new(1),
        }
    }

    /// Line stamped on nodes created from now on.
    pub fn set_line(&self, line: u32) {
        self.line.set(line);
    }

    pub fn arena(&self) -> &'a Bump {
        self.arena
    }

    /// Number of nodes built so far.
    pub fn node_count(&self) -> u32 {
        self.next_id.get()
    }

    // ========================================================================
    // Raw construction
    // ========================================================================

    pub fn node(
        &self,
        kind: NodeKind,
        flags: u32,
        children: impl IntoIterator<Item = (ChildKey, Child<'a>)>,
    ) -> &'a Node<'a> {
        let children: Vec<(ChildKey, Child<'a>)> = children.into_iter().collect();
        let id = NodeId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        self.arena.alloc(Node {
            id,
            kind,
            flags,
            lineno: self.line.get(),
            children: self.arena.alloc_slice_copy(&children),
        })
    }

    /// A node whose children are named slots.
    pub fn named(
        &self,
        kind: NodeKind,
        flags: u32,
        children: impl IntoIterator<Item = (&'static str, Child<'a>)>,
    ) -> &'a Node<'a> {
        self.node(kind, flags, children.into_iter().map(|(k, c)| (ChildKey::Name(k), c)))
    }

    /// A node whose children are positional.
    pub fn list(&self, kind: NodeKind, items: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        self.node(
            kind,
            0,
            items
                .into_iter()
                .enumerate()
                .map(|(i, c)| (ChildKey::Index(i as u32), c)),
        )
    }

    /// Copy a string into the arena as a literal child.
    pub fn str(&self, s: &str) -> Child<'a> {
        Child::Str(self.arena.alloc_str(s))
    }

    // ========================================================================
    // Names
    // ========================================================================

    /// `$name`.
    pub fn var(&self, name: &str) -> &'a Node<'a> {
        let name = self.str(name);
        self.named(NodeKind::Variable, 0, [("name", name)])
    }

    /// A class/function/constant name. A leading `\` marks it fully qualified;
    /// a `namespace\` prefix marks it relative.
    pub fn name(&self, name: &str) -> &'a Node<'a> {
        let (kind, text) = if let Some(rest) = name.strip_prefix('\\') {
            (NameKind::FullyQualified, rest)
        } else if let Some(rest) = name.strip_prefix("namespace\\") {
            (NameKind::Relative, rest)
        } else {
            (NameKind::NotFullyQualified, name)
        };
        let text = self.str(text);
        self.named(NodeKind::Name, kind as u32, [("name", text)])
    }

    /// A constant reference such as `PHP_EOL` or `true`.
    pub fn konst(&self, name: &str) -> &'a Node<'a> {
        let name = self.name(name);
        self.named(NodeKind::Const, 0, [("name", name.into())])
    }

    /// `Class::CONST`.
    pub fn class_const(&self, class: &'a Node<'a>, name: &str) -> &'a Node<'a> {
        let name = self.str(name);
        self.named(NodeKind::ClassConst, 0, [("class", class.into()), ("const", name)])
    }

    /// `Class::class`.
    pub fn class_name(&self, class: &'a Node<'a>) -> &'a Node<'a> {
        self.named(NodeKind::ClassName, 0, [("class", class.into())])
    }

    pub fn magic(&self, kind: MagicConstKind) -> &'a Node<'a> {
        self.named(NodeKind::MagicConst, kind as u32, std::iter::empty())
    }

    // ========================================================================
    // Operators
    // ========================================================================

    pub fn binary(&self, op: BinaryOp, left: impl Into<Child<'a>>, right: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(
            NodeKind::BinaryOp,
            op as u32,
            [("left", left.into()), ("right", right.into())],
        )
    }

    pub fn unary(&self, op: UnaryOp, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::UnaryOp, op as u32, [("expr", expr.into())])
    }

    /// `++$x`, `$x--` and friends; `kind` picks the form.
    pub fn incdec(&self, kind: NodeKind, var: &'a Node<'a>) -> &'a Node<'a> {
        self.named(kind, 0, [("var", var.into())])
    }

    pub fn assign(&self, var: &'a Node<'a>, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Assign, 0, [("var", var.into()), ("expr", expr.into())])
    }

    pub fn assign_op(&self, op: BinaryOp, var: &'a Node<'a>, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::AssignOp, op as u32, [("var", var.into()), ("expr", expr.into())])
    }

    pub fn cast(&self, kind: CastKind, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Cast, kind as u32, [("expr", expr.into())])
    }

    pub fn instanceof(&self, expr: impl Into<Child<'a>>, class: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Instanceof, 0, [("expr", expr.into()), ("class", class.into())])
    }

    /// `cond ? t : f`, or `cond ?: f` when `t` is `None`.
    pub fn conditional(
        &self,
        cond: impl Into<Child<'a>>,
        t: Option<Child<'a>>,
        f: impl Into<Child<'a>>,
    ) -> &'a Node<'a> {
        self.named(
            NodeKind::Conditional,
            0,
            [("cond", cond.into()), ("true", t.into()), ("false", f.into())],
        )
    }

    // ========================================================================
    // Arrays
    // ========================================================================

    /// `[k => v, ...]`. A `None` key is an implicit next index.
    pub fn array(&self, elements: impl IntoIterator<Item = (Option<Child<'a>>, Child<'a>)>) -> &'a Node<'a> {
        let elems: Vec<Child<'a>> = elements
            .into_iter()
            .map(|(key, value)| {
                Child::Node(self.named(NodeKind::ArrayElem, 0, [("value", value), ("key", key.into())]))
            })
            .collect();
        self.list(NodeKind::Array, elems)
    }

    /// `[v1, v2, ...]` with implicit keys.
    pub fn array_list(&self, values: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        self.array(values.into_iter().map(|v| (None, v)))
    }

    /// Build an array from raw element children, so `Unpack` nodes can be mixed in.
    pub fn array_of(&self, elements: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        self.list(NodeKind::Array, elements)
    }

    pub fn elem(&self, key: Option<Child<'a>>, value: impl Into<Child<'a>>) -> Child<'a> {
        Child::Node(self.named(NodeKind::ArrayElem, 0, [("value", value.into()), ("key", key.into())]))
    }

    /// `...$expr`.
    pub fn unpack(&self, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Unpack, 0, [("expr", expr.into())])
    }

    /// `$expr[$dim]`, or `$expr[]` when `dim` is `None`.
    pub fn dim(&self, expr: impl Into<Child<'a>>, dim: Option<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Dim, 0, [("expr", expr.into()), ("dim", dim.into())])
    }

    // ========================================================================
    // Members and calls
    // ========================================================================

    pub fn prop(&self, expr: impl Into<Child<'a>>, prop: &str) -> &'a Node<'a> {
        let prop = self.str(prop);
        self.named(NodeKind::Prop, 0, [("expr", expr.into()), ("prop", prop)])
    }

    pub fn nullsafe_prop(&self, expr: impl Into<Child<'a>>, prop: &str) -> &'a Node<'a> {
        let prop = self.str(prop);
        self.named(NodeKind::NullsafeProp, 0, [("expr", expr.into()), ("prop", prop)])
    }

    pub fn static_prop(&self, class: &'a Node<'a>, prop: &str) -> &'a Node<'a> {
        let prop = self.str(prop);
        self.named(NodeKind::StaticProp, 0, [("class", class.into()), ("prop", prop)])
    }

    pub fn args(&self, args: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        self.list(NodeKind::ArgList, args)
    }

    /// `name(args)`; pass a `Name` node or any callable expression.
    pub fn call(&self, expr: &'a Node<'a>, args: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        let args = self.args(args);
        self.named(NodeKind::Call, 0, [("expr", expr.into()), ("args", args.into())])
    }

    /// Shorthand for a call to a named function.
    pub fn call_fn(&self, name: &str, args: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        let name = self.name(name);
        self.call(name, args)
    }

    pub fn method_call(
        &self,
        expr: impl Into<Child<'a>>,
        method: &str,
        args: impl IntoIterator<Item = Child<'a>>,
    ) -> &'a Node<'a> {
        let method = self.str(method);
        let args = self.args(args);
        self.named(
            NodeKind::MethodCall,
            0,
            [("expr", expr.into()), ("method", method), ("args", args.into())],
        )
    }

    pub fn nullsafe_method_call(
        &self,
        expr: impl Into<Child<'a>>,
        method: &str,
        args: impl IntoIterator<Item = Child<'a>>,
    ) -> &'a Node<'a> {
        let method = self.str(method);
        let args = self.args(args);
        self.named(
            NodeKind::NullsafeMethodCall,
            0,
            [("expr", expr.into()), ("method", method), ("args", args.into())],
        )
    }

    pub fn static_call(
        &self,
        class: &'a Node<'a>,
        method: &str,
        args: impl IntoIterator<Item = Child<'a>>,
    ) -> &'a Node<'a> {
        let method = self.str(method);
        let args = self.args(args);
        self.named(
            NodeKind::StaticCall,
            0,
            [("class", class.into()), ("method", method), ("args", args.into())],
        )
    }

    pub fn new_(&self, class: &'a Node<'a>, args: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        let args = self.args(args);
        self.named(NodeKind::New, 0, [("class", class.into()), ("args", args.into())])
    }

    // ========================================================================
    // Functions and type declarations
    // ========================================================================

    /// A built-in type keyword node.
    pub fn type_hint(&self, hint: TypeHint) -> &'a Node<'a> {
        self.named(NodeKind::Type, hint as u32, std::iter::empty())
    }

    pub fn nullable_type(&self, inner: &'a Node<'a>) -> &'a Node<'a> {
        self.named(NodeKind::NullableType, 0, [("type", inner.into())])
    }

    pub fn type_union(&self, members: impl IntoIterator<Item = &'a Node<'a>>) -> &'a Node<'a> {
        self.list(NodeKind::TypeUnion, members.into_iter().map(Child::Node))
    }

    pub fn param(
        &self,
        name: &str,
        type_node: Option<&'a Node<'a>>,
        default: Option<Child<'a>>,
        flags: ParamFlags,
    ) -> &'a Node<'a> {
        let name = self.str(name);
        self.named(
            NodeKind::Param,
            flags.bits(),
            [("type", type_node.into()), ("name", name), ("default", default.into())],
        )
    }

    /// `function (params) use (uses): ret { ... }`.
    pub fn closure(
        &self,
        params: impl IntoIterator<Item = &'a Node<'a>>,
        uses: impl IntoIterator<Item = &'a str>,
        return_type: Option<&'a Node<'a>>,
        flags: ModifierFlags,
    ) -> &'a Node<'a> {
        let params = self.list(NodeKind::ParamList, params.into_iter().map(Child::Node));
        let uses: Vec<Child<'a>> = uses
            .into_iter()
            .map(|name| {
                let name = self.str(name);
                Child::Node(self.named(NodeKind::ClosureVar, 0, [("name", name)]))
            })
            .collect();
        let uses = self.list(NodeKind::ClosureUses, uses);
        let stmts = self.list(NodeKind::StmtList, std::iter::empty());
        self.named(
            NodeKind::Closure,
            flags.bits(),
            [
                ("params", params.into()),
                ("uses", uses.into()),
                ("stmts", stmts.into()),
                ("returnType", return_type.into()),
            ],
        )
    }

    /// `fn (params): ret => expr`.
    pub fn arrow_fn(
        &self,
        params: impl IntoIterator<Item = &'a Node<'a>>,
        return_type: Option<&'a Node<'a>>,
        body: impl Into<Child<'a>>,
    ) -> &'a Node<'a> {
        let params = self.list(NodeKind::ParamList, params.into_iter().map(Child::Node));
        self.named(
            NodeKind::ArrowFunc,
            0,
            [
                ("params", params.into()),
                ("stmts", body.into()),
                ("returnType", return_type.into()),
            ],
        )
    }

    // ========================================================================
    // Miscellaneous expressions
    // ========================================================================

    /// Single-child expression kinds: `isset`, `empty`, `clone`, `print`,
    /// `throw`, `yield from`, `include`, `exit`.
    pub fn wrap(&self, kind: NodeKind, expr: impl Into<Child<'a>>) -> &'a Node<'a> {
        let slot = if kind == NodeKind::Isset { "var" } else { "expr" };
        self.named(kind, 0, [(slot, expr.into())])
    }

    pub fn yield_(&self, value: Option<Child<'a>>, key: Option<Child<'a>>) -> &'a Node<'a> {
        self.named(NodeKind::Yield, 0, [("value", value.into()), ("key", key.into())])
    }

    /// `"text $var"` interpolation.
    pub fn encaps(&self, parts: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        self.list(NodeKind::Encaps, parts)
    }

    pub fn shell_exec(&self, parts: impl IntoIterator<Item = Child<'a>>) -> &'a Node<'a> {
        let parts = self.encaps(parts);
        self.named(NodeKind::ShellExec, 0, [("expr", parts.into())])
    }

    /// `match (cond) { conds => expr, default => expr }`. A `None`
    /// condition list is the default arm.
    pub fn match_(
        &self,
        cond: impl Into<Child<'a>>,
        arms: impl IntoIterator<Item = (Option<Vec<Child<'a>>>, Child<'a>)>,
    ) -> &'a Node<'a> {
        let arms: Vec<Child<'a>> = arms
            .into_iter()
            .map(|(conds, expr)| {
                let conds = conds.map(|c| Child::Node(self.list(NodeKind::ExprList, c)));
                Child::Node(self.named(
                    NodeKind::MatchArm,
                    0,
                    [("cond", conds.unwrap_or(Child::Null)), ("expr", expr)],
                ))
            })
            .collect();
        let arms = self.list(NodeKind::MatchArmList, arms);
        self.named(NodeKind::Match, 0, [("cond", cond.into()), ("stmts", arms.into())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_sequential() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let x = b.var("x");
        let y = b.var("y");
        assert_eq!(x.id, NodeId(0));
        assert_eq!(y.id, NodeId(1));
        assert_eq!(b.node_count(), 2);
    }

    #[test]
    fn test_named_children() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        b.set_line(7);
        let node = b.binary(BinaryOp::Add, 1i64, b.var("x"));
        assert_eq!(node.lineno, 7);
        assert!(matches!(node.child("left"), Some(Child::Int(1))));
        assert_eq!(node.child_node("right").map(|n| n.kind), Some(NodeKind::Variable));
        assert!(node.child("dim").is_none());
        assert_eq!(BinaryOp::from_flags(node.flags), Some(BinaryOp::Add));
    }

    #[test]
    fn test_array_elements_are_positional() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let arr = b.array_list([Child::Int(1), Child::Int(2)]);
        assert_eq!(arr.list_len(), 2);
        let first = arr.child_at(0).and_then(|c| c.as_node()).map(|n| n.kind);
        assert_eq!(first, Some(NodeKind::ArrayElem));
        let elem = arr.list().next().and_then(|c| c.as_node()).map(|n| n.child("key"));
        assert!(matches!(elem, Some(Some(Child::Null))));
    }

    #[test]
    fn test_name_qualification() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let fq = b.name("\\Foo\\Bar");
        assert_eq!(NameKind::from_flags(fq.flags), Some(NameKind::FullyQualified));
        assert_eq!(fq.child_str("name"), Some("Foo\\Bar"));
        let rel = b.name("namespace\\Baz");
        assert_eq!(NameKind::from_flags(rel.flags), Some(NameKind::Relative));
        let plain = b.name("Baz");
        assert_eq!(NameKind::from_flags(plain.flags), Some(NameKind::NotFullyQualified));
    }
}
