//! Expression evaluation: the union type an expression node may produce.
//!
//! `UnionTypeVisitor` dispatches on the node kind. Every node's result is
//! cached per context lineage, keyed by `NodeId`, so re-evaluating a node
//! returns the first answer and does not repeat its diagnostics.
//!
//! Lookup misses surface as [`AnalysisFailure::Issue`]. With
//! `should_catch_issues` the visitor reports them and substitutes the
//! empty type for the failing subexpression; without it they propagate to
//! the caller. [`AnalysisFailure::Unanalyzable`] never propagates.

use crate::context::{Context, FunctionLike};
use crate::context_node::ContextNode;
use crate::env::AnalysisEnv;
use crate::failure::{AnalysisFailure, AnalysisResult};
use crate::scope::{Scope, Variable};
use strix_ast::{CastKind, Child, MagicConstKind, ModifierFlags, Node, NodeKind, ParamFlags, TypeHint, UnaryOp};
use strix_core::limits::MAX_EXPRESSION_DEPTH;
use strix_diagnostics::{issues, IssueType};
use strix_types::{
    ClosureParam, ClosureSignature, FullyQualifiedClassName, KeyKind, Scalar, TypeId, TypeKind, TypeRegistry, UnionType,
};
use tracing::{debug, trace};

pub struct UnionTypeVisitor<'v, 'e> {
    pub(crate) env: &'v mut AnalysisEnv<'e>,
    pub(crate) context: &'v Context,
    should_catch_issues: bool,
    depth: u32,
}

/// Evaluate `node`, reporting lookup failures and degrading them to the
/// empty type.
pub fn evaluate(env: &mut AnalysisEnv<'_>, context: &Context, node: Child<'_>) -> UnionType {
    match UnionTypeVisitor::union_type_from_node(env, context, node, true) {
        Ok(union_type) => union_type,
        Err(failure) => {
            debug!(%failure, "evaluation failed after catching issues");
            UnionType::empty()
        }
    }
}

impl<'v, 'e> UnionTypeVisitor<'v, 'e> {
    pub fn new(env: &'v mut AnalysisEnv<'e>, context: &'v Context, should_catch_issues: bool) -> Self {
        Self {
            env,
            context,
            should_catch_issues,
            depth: 0,
        }
    }

    /// Continue an evaluation that is already `depth` levels deep.
    pub(crate) fn nested(
        env: &'v mut AnalysisEnv<'e>,
        context: &'v Context,
        should_catch_issues: bool,
        depth: u32,
    ) -> Self {
        Self {
            env,
            context,
            should_catch_issues,
            depth,
        }
    }

    /// The union type of `node`.
    ///
    /// With `should_catch_issues` false, the first lookup failure is
    /// returned instead of reported.
    pub fn union_type_from_node(
        env: &mut AnalysisEnv<'_>,
        context: &Context,
        node: Child<'_>,
        should_catch_issues: bool,
    ) -> AnalysisResult<UnionType> {
        UnionTypeVisitor::new(env, context, should_catch_issues).visit(node)
    }

    pub(crate) fn registry(&self) -> &'e TypeRegistry {
        self.env.registry
    }

    pub(crate) fn context_node(&mut self) -> ContextNode<'_, 'e> {
        ContextNode::new(self.env, self.context).with_mode(self.should_catch_issues, self.depth)
    }

    pub(crate) fn failure(&self, issue_type: &'static IssueType, line: u32, args: Vec<String>) -> AnalysisFailure {
        AnalysisFailure::from(self.context.issue(issue_type, line, args))
    }

    /// Report an issue that does not change the expression's type.
    pub(crate) fn emit(&mut self, issue_type: &'static IssueType, line: u32, args: Vec<String>) {
        let issue = self.context.issue(issue_type, line, args);
        self.env.emit(issue);
    }

    /// Rendering for diagnostics; the empty type reads as `mixed`.
    pub(crate) fn display(&self, union_type: &UnionType) -> String {
        let rendered = union_type.display(self.env.registry).to_string();
        if rendered.is_empty() {
            "mixed".to_string()
        } else {
            rendered
        }
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    pub fn visit(&mut self, child: Child<'_>) -> AnalysisResult<UnionType> {
        let node = match child {
            Child::Node(node) => node,
            _ => return Ok(self.scalar_type(child)),
        };
        if let Some(cached) = self.context.cached_type(node.id) {
            trace!(node = %node.id, kind = ?node.kind, "node type cache hit");
            return Ok(cached);
        }
        if self.depth >= MAX_EXPRESSION_DEPTH {
            debug!(node = %node.id, depth = self.depth, "expression too deeply nested");
            return Ok(UnionType::empty());
        }

        self.depth += 1;
        let result = self.visit_node(node);
        self.depth -= 1;

        match result {
            Ok(union_type) => {
                self.context.cache_type(node.id, union_type.clone());
                Ok(union_type)
            }
            Err(AnalysisFailure::Unanalyzable { node: id, reason }) => {
                debug!(node = %id, reason, "unanalyzable node");
                self.context.cache_type(node.id, UnionType::empty());
                Ok(UnionType::empty())
            }
            Err(AnalysisFailure::Issue(issue)) if self.should_catch_issues => {
                self.env.emit(*issue);
                self.context.cache_type(node.id, UnionType::empty());
                Ok(UnionType::empty())
            }
            Err(failure) => Err(failure),
        }
    }

    /// Evaluate `child` in another context, keeping this visitor's mode.
    pub(crate) fn visit_in(&mut self, context: &Context, child: Child<'_>) -> AnalysisResult<UnionType> {
        UnionTypeVisitor::nested(&mut *self.env, context, self.should_catch_issues, self.depth).visit(child)
    }

    /// Evaluate `child` for its type only: lookup failures are neither
    /// reported nor propagated.
    pub(crate) fn visit_quietly(&mut self, child: Child<'_>) -> UnionType {
        UnionTypeVisitor::nested(&mut *self.env, self.context, false, self.depth)
            .visit(child)
            .unwrap_or_else(|failure| {
                trace!(%failure, "quiet evaluation did not resolve");
                UnionType::empty()
            })
    }

    /// Evaluate `child` for its diagnostics only.
    pub(crate) fn visit_for_effects(&mut self, child: Child<'_>) {
        if let Err(failure) = self.visit(child) {
            trace!(%failure, "ignoring failure in discarded subexpression");
        }
    }

    fn visit_node(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        match node.kind {
            NodeKind::Variable => self.visit_variable(node),
            NodeKind::Name => self.visit_name(node),
            NodeKind::Const => self.visit_const(node),
            NodeKind::ClassConst => self.visit_class_const(node),
            NodeKind::ClassName => self.visit_class_name(node),
            NodeKind::MagicConst => self.visit_magic_const(node),
            NodeKind::BinaryOp => self.visit_binary_op(node),
            NodeKind::UnaryOp => self.visit_unary_op(node),
            NodeKind::PreInc | NodeKind::PreDec | NodeKind::PostInc | NodeKind::PostDec => self.visit_inc_dec(node),
            NodeKind::Assign | NodeKind::AssignRef => self.visit(required(node, "expr")?),
            NodeKind::AssignOp => self.visit_assign_op(node),
            NodeKind::Cast => self.visit_cast(node),
            NodeKind::Instanceof => self.visit_instanceof(node),
            NodeKind::Conditional => self.visit_conditional(node),
            NodeKind::Array => self.visit_array(node),
            NodeKind::Dim => self.visit_dim(node),
            NodeKind::Prop | NodeKind::NullsafeProp => self.visit_prop(node),
            NodeKind::StaticProp => self.visit_static_prop(node),
            NodeKind::Call => self.visit_call(node),
            NodeKind::MethodCall | NodeKind::NullsafeMethodCall => self.visit_method_call(node),
            NodeKind::StaticCall => self.visit_static_call(node),
            NodeKind::New => self.visit_new(node),
            NodeKind::Closure => self.visit_closure(node),
            NodeKind::ArrowFunc => self.visit_arrow_func(node),
            NodeKind::Type | NodeKind::NullableType | NodeKind::TypeUnion => self.union_type_from_type_node(node),
            NodeKind::Isset | NodeKind::Empty => Ok(UnionType::of(TypeId::BOOL)),
            NodeKind::Clone => self.visit_clone(node),
            NodeKind::Yield => {
                for slot in ["value", "key"] {
                    if let Some(child) = node.child(slot).filter(|c| !c.is_null()) {
                        self.visit_for_effects(child);
                    }
                }
                Ok(UnionType::mixed())
            }
            NodeKind::YieldFrom | NodeKind::Include => {
                self.visit_for_effects(required(node, "expr")?);
                Ok(UnionType::mixed())
            }
            NodeKind::Print => {
                self.visit_for_effects(required(node, "expr")?);
                Ok(UnionType::of(TypeId::INT))
            }
            NodeKind::Encaps => {
                for part in node.list().filter(|c| c.as_node().is_some()) {
                    self.visit_for_effects(part);
                }
                Ok(UnionType::of(TypeId::STRING))
            }
            NodeKind::ShellExec => {
                self.visit_for_effects(required(node, "expr")?);
                Ok(UnionType::of(TypeId::STRING))
            }
            NodeKind::Match => self.visit_match(node),
            NodeKind::Throw | NodeKind::Exit => {
                if let Some(child) = node.child("expr").filter(|c| !c.is_null()) {
                    self.visit_for_effects(child);
                }
                Ok(UnionType::empty())
            }
            _ => Err(AnalysisFailure::unanalyzable(node.id, "not an expression")),
        }
    }

    fn scalar_type(&self, child: Child<'_>) -> UnionType {
        let scalar = match child {
            Child::Int(value) => Scalar::Int(value),
            Child::Float(value) => Scalar::Float(value),
            Child::Str(value) => Scalar::String(value.to_string()),
            Child::Bool(value) => Scalar::Bool(value),
            Child::Null | Child::Node(_) => Scalar::Null,
        };
        UnionType::from_scalar(self.env.registry, &scalar, self.env.options)
    }

    // ========================================================================
    // Names and constants
    // ========================================================================

    fn visit_variable(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let Some(name) = node.child_str("name") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic variable name"));
        };
        self.context_node().resolve_or_create_variable(name, node.lineno)
    }

    /// A bare class name used as a value.
    fn visit_name(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let fqsen = self.context_node().class_fqsen_from_name_node(node)?;
        Ok(UnionType::of(self.registry().class_type(&fqsen)))
    }

    fn visit_const(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let Some(name_node) = node.child_node("name") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "constant without a name"));
        };
        let name = name_node.child_str("name").unwrap_or_default();
        match name.to_ascii_lowercase().as_str() {
            "true" => return Ok(UnionType::of(TypeId::TRUE)),
            "false" => return Ok(UnionType::of(TypeId::FALSE)),
            "null" => return Ok(UnionType::of(TypeId::NULL)),
            _ => {}
        }
        let constant = self.context_node().resolve_global_constant(name_node)?;
        Ok(constant.union_type)
    }

    fn visit_class_const(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let class = required(node, "class")?;
        let Some(name) = node.child_str("const") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "dynamic class constant name"));
        };
        if name.eq_ignore_ascii_case("class") {
            return self.class_name_string(node, class);
        }
        let constants = self.context_node().resolve_class_constant(class, name, node.lineno)?;
        let mut result = UnionType::empty();
        for constant in constants {
            result.add_union_type(&constant.union_type);
        }
        Ok(result)
    }

    fn visit_class_name(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        self.class_name_string(node, required(node, "class")?)
    }

    /// `X::class`: the literal class name when `X` is a name, else `string`.
    fn class_name_string(&mut self, node: &Node<'_>, class: Child<'_>) -> AnalysisResult<UnionType> {
        match class.as_node() {
            Some(name) if name.is(NodeKind::Name) => {
                let fqsen = self.context_node().class_fqsen_from_name_node(name)?;
                Ok(self.class_string_type(&fqsen))
            }
            Some(_) => {
                self.visit_for_effects(class);
                Ok(UnionType::of(TypeId::STRING))
            }
            None => Err(AnalysisFailure::unanalyzable(node.id, "class name is not an expression")),
        }
    }

    fn class_string_type(&self, fqsen: &FullyQualifiedClassName) -> UnionType {
        UnionType::from_scalar(
            self.env.registry,
            &Scalar::String(fqsen.class_string()),
            self.env.options,
        )
    }

    fn visit_magic_const(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let options = self.env.options;
        let union_type = match MagicConstKind::from_flags(node.flags) {
            Some(MagicConstKind::Line) => UnionType::from_scalar(registry, &Scalar::Int(i64::from(node.lineno)), options),
            Some(MagicConstKind::Class) => match self.context.class_fqsen() {
                Some(fqsen) => self.class_string_type(fqsen),
                None => UnionType::of(TypeId::STRING),
            },
            Some(MagicConstKind::Namespace) => {
                let namespace = self.context.namespace().trim_start_matches('\\').to_string();
                UnionType::from_scalar(registry, &Scalar::String(namespace), options)
            }
            Some(_) => UnionType::of(TypeId::STRING),
            None => return Err(AnalysisFailure::unanalyzable(node.id, "unknown magic constant")),
        };
        Ok(union_type)
    }

    // ========================================================================
    // Unary operators, casts and assignments
    // ========================================================================

    fn visit_unary_op(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let Some(op) = UnaryOp::from_flags(node.flags) else {
            return Err(AnalysisFailure::unanalyzable(node.id, "unknown unary operator"));
        };
        let operand = self.visit(required(node, "expr")?)?;
        let union_type = match op {
            UnaryOp::BoolNot => UnionType::of(TypeId::BOOL),
            UnaryOp::BitwiseNot if operand.is_exclusively_string_like(registry) => UnionType::of(TypeId::STRING),
            UnaryOp::BitwiseNot => UnionType::of(TypeId::INT),
            UnaryOp::Silence => operand,
            UnaryOp::Minus | UnaryOp::Plus => {
                if let Some(TypeKind::LiteralInt(value)) = operand.single().map(|id| registry.get(id).kind.clone()) {
                    let folded = if op == UnaryOp::Minus { value.checked_neg() } else { Some(value) };
                    return Ok(match folded {
                        Some(value) => UnionType::of(registry.literal_int(value, false)),
                        None => UnionType::of(TypeId::FLOAT),
                    });
                }
                if operand.is_exclusively_int_like(registry) {
                    UnionType::of(TypeId::INT)
                } else if operand.is_exclusively_float(registry) {
                    UnionType::of(TypeId::FLOAT)
                } else {
                    UnionType::from_types([TypeId::INT, TypeId::FLOAT])
                }
            }
        };
        Ok(union_type)
    }

    fn visit_inc_dec(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let operand = self.visit(required(node, "var")?)?;
        if operand.is_exclusively_int_like(registry) {
            Ok(UnionType::of(TypeId::INT))
        } else if operand.is_exclusively_float(registry) {
            Ok(UnionType::of(TypeId::FLOAT))
        } else {
            Ok(operand.literals_as_natives(registry))
        }
    }

    fn visit_cast(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let operand = self.visit(required(node, "expr")?)?;
        let union_type = match CastKind::from_flags(node.flags) {
            Some(CastKind::Null) => UnionType::of(TypeId::NULL),
            Some(CastKind::Bool) => UnionType::of(TypeId::BOOL),
            Some(CastKind::Int) => UnionType::of(TypeId::INT),
            Some(CastKind::Float) => UnionType::of(TypeId::FLOAT),
            Some(CastKind::String) => UnionType::of(TypeId::STRING),
            Some(CastKind::Array) if operand.is_exclusively_array_like(registry) && !operand.is_null() => {
                operand.non_nullable_clone(registry)
            }
            Some(CastKind::Array) => UnionType::of(TypeId::ARRAY),
            Some(CastKind::Object) if operand.is_exclusively(registry, |ty| ty.is_object_like()) => operand,
            Some(CastKind::Object) => UnionType::of(registry.make("\\", "stdClass", Vec::new(), false)),
            None => return Err(AnalysisFailure::unanalyzable(node.id, "unknown cast")),
        };
        Ok(union_type)
    }

    // ========================================================================
    // instanceof, clone
    // ========================================================================

    /// Always `bool`. The class operand is checked on the side.
    fn visit_instanceof(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        self.visit_for_effects(required(node, "expr")?);
        let class = required(node, "class")?;
        match class.as_node() {
            Some(name) if name.is(NodeKind::Name) => {
                let fqsen = self.context_node().class_fqsen_from_name_node(name);
                match fqsen {
                    Ok(fqsen) => {
                        if !self.env.codebase.has_class_with_fqsen(&fqsen) {
                            self.emit(&issues::UndeclaredClassInstanceof, node.lineno, vec![fqsen.to_string()]);
                        }
                    }
                    Err(AnalysisFailure::Issue(issue)) => self.env.emit(*issue),
                    Err(failure) => trace!(%failure, "ignoring instanceof class"),
                }
            }
            _ => {
                let registry = self.registry();
                let class_type = self.visit(class)?;
                let plausible = class_type.is_empty()
                    || class_type.has_mixed()
                    || class_type.has_object_like(registry)
                    || class_type.has_string_like(registry)
                    || class_type.has_template_type(registry);
                if !plausible {
                    let rendered = self.display(&class_type);
                    self.emit(&issues::TypeInvalidInstanceof, node.lineno, vec![rendered]);
                }
            }
        }
        Ok(UnionType::of(TypeId::BOOL))
    }

    fn visit_clone(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let operand = self.visit(required(node, "expr")?)?;
        let cloneable = operand.is_empty()
            || operand.has_mixed()
            || operand.has_object_like(registry)
            || operand.has_template_type(registry);
        if !cloneable {
            let rendered = self.display(&operand);
            return Err(self.failure(&issues::TypeInvalidCloneNotObject, node.lineno, vec![rendered]));
        }
        Ok(operand)
    }

    // ========================================================================
    // Conditionals
    // ========================================================================

    /// `cond ? a : b` and `cond ?: b`.
    ///
    /// A constant condition selects one arm; the other is still evaluated
    /// for its diagnostics. Otherwise each arm is evaluated under the
    /// narrowed context for its side of the condition and the results are
    /// merged. When exactly one arm is unknown the merge includes `mixed`.
    fn visit_conditional(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let cond = required(node, "cond")?;
        let true_arm = node.child("true").filter(|c| !c.is_null());
        let false_arm = required(node, "false")?;

        if let Some(truthy) = constant_truthiness(cond) {
            let cond_type = self.visit(cond)?;
            return match (truthy, true_arm) {
                (true, Some(true_arm)) => {
                    self.visit_for_effects(false_arm);
                    self.visit(true_arm)
                }
                (true, None) => {
                    self.visit_for_effects(false_arm);
                    Ok(cond_type)
                }
                (false, Some(true_arm)) => {
                    self.visit_for_effects(true_arm);
                    self.visit(false_arm)
                }
                (false, None) => self.visit(false_arm),
            };
        }

        let narrower = self.env.narrower;
        let true_context = narrower.narrow(registry, self.context, cond, false);
        let false_context = narrower.narrow(registry, self.context, cond, true);
        let cond_type = self.visit(cond)?;
        let true_type = match true_arm {
            Some(true_arm) => self.visit_in(&true_context, true_arm)?,
            None => cond_type.non_nullable_clone(registry).without_type(TypeId::FALSE),
        };
        let false_type = self.visit_in(&false_context, false_arm)?;

        let mut result = true_type.with_union_type(&false_type);
        if true_type.is_empty() != false_type.is_empty() {
            result.add_type(TypeId::MIXED);
        }
        Ok(result)
    }

    fn visit_match(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        self.visit_for_effects(required(node, "cond")?);
        let Some(arms) = node.child_node("stmts") else {
            return Err(AnalysisFailure::unanalyzable(node.id, "match without arms"));
        };
        let mut result = UnionType::empty();
        for arm in arms.list().filter_map(|c| c.as_node()) {
            if let Some(conds) = arm.child_node("cond") {
                for cond in conds.list() {
                    self.visit_for_effects(cond);
                }
            }
            result.add_union_type(&self.visit(required(arm, "expr")?)?);
        }
        Ok(result)
    }

    // ========================================================================
    // Closures and declared types
    // ========================================================================

    fn visit_closure(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let params = self.closure_params(node)?;
        let return_type = match node.child_node("returnType") {
            Some(type_node) => self.union_type_from_type_node(type_node)?,
            None => UnionType::empty(),
        };
        let signature = ClosureSignature {
            is_closure: true,
            params,
            return_type,
        };
        Ok(UnionType::of(self.registry().closure(signature, false)))
    }

    /// `fn ($x) => expr`: an undeclared return type is the body's type,
    /// evaluated with the parameters bound over a copy of the outer scope.
    fn visit_arrow_func(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let params = self.closure_params(node)?;
        let return_type = match node.child_node("returnType") {
            Some(type_node) => self.union_type_from_type_node(type_node)?,
            None => {
                let mut scope = Scope::function();
                {
                    let outer = self.context.scope();
                    for name in outer.variable_names() {
                        if let Some(variable) = outer.get_variable_with_name(name) {
                            scope.add_variable(variable.clone());
                        }
                    }
                }
                let param_nodes = node.child_node("params").map(|p| p.list().collect::<Vec<_>>()).unwrap_or_default();
                for (param_node, param) in param_nodes.iter().filter_map(|c| c.as_node()).zip(&params) {
                    if let Some(name) = param_node.child_str("name") {
                        let union_type = if param.variadic && param.union_type.is_empty() {
                            UnionType::of(TypeId::ARRAY)
                        } else if param.variadic {
                            param.union_type.as_generic_array_types(self.registry(), KeyKind::Int)
                        } else {
                            param.union_type.clone()
                        };
                        scope.add_variable(Variable::new(name, union_type));
                    }
                }
                let is_static = ModifierFlags::from_bits_truncate(node.flags).contains(ModifierFlags::STATIC);
                let body_context = self.context.with_function(FunctionLike::Closure, is_static).with_scope(scope);
                self.visit_in(&body_context, required(node, "stmts")?)?
            }
        };
        let signature = ClosureSignature {
            is_closure: true,
            params,
            return_type,
        };
        Ok(UnionType::of(self.registry().closure(signature, false)))
    }

    fn closure_params(&mut self, node: &Node<'_>) -> AnalysisResult<Vec<ClosureParam>> {
        let Some(params) = node.child_node("params") else {
            return Ok(Vec::new());
        };
        let mut result = Vec::new();
        for param in params.list().filter_map(|c| c.as_node()) {
            let flags = ParamFlags::from_bits_truncate(param.flags);
            let union_type = match param.child_node("type") {
                Some(type_node) => self.union_type_from_type_node(type_node)?,
                None => UnionType::empty(),
            };
            let variadic = flags.contains(ParamFlags::VARIADIC);
            result.push(ClosureParam {
                union_type,
                by_ref: flags.contains(ParamFlags::BY_REF),
                variadic,
                optional: variadic || param.child("default").is_some_and(|d| !d.is_null()),
            });
        }
        Ok(result)
    }

    /// The type a declaration node (`int`, `?Foo`, `A|B`, `self`) names.
    pub fn union_type_from_type_node(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        match node.kind {
            NodeKind::Type => {
                let id = match TypeHint::from_flags(node.flags) {
                    Some(TypeHint::Array) => TypeId::ARRAY,
                    Some(TypeHint::Callable) => TypeId::CALLABLE,
                    Some(TypeHint::Void) => TypeId::VOID,
                    Some(TypeHint::Bool) => TypeId::BOOL,
                    Some(TypeHint::Int) => TypeId::INT,
                    Some(TypeHint::Float) => TypeId::FLOAT,
                    Some(TypeHint::String) => TypeId::STRING,
                    Some(TypeHint::Iterable) => TypeId::ITERABLE,
                    Some(TypeHint::Object) => TypeId::OBJECT,
                    Some(TypeHint::Null) => TypeId::NULL,
                    Some(TypeHint::False) => TypeId::FALSE,
                    Some(TypeHint::True) => TypeId::TRUE,
                    Some(TypeHint::Static) => TypeId::STATIC,
                    Some(TypeHint::Mixed) => TypeId::MIXED,
                    None => return Err(AnalysisFailure::unanalyzable(node.id, "unknown type hint")),
                };
                Ok(UnionType::of(id))
            }
            NodeKind::NullableType => {
                let inner = required(node, "type")?;
                match inner.as_node() {
                    Some(inner) => Ok(self.union_type_from_type_node(inner)?.nullable_clone(registry)),
                    None => Err(AnalysisFailure::unanalyzable(node.id, "nullable type without a type")),
                }
            }
            NodeKind::TypeUnion => {
                let mut result = UnionType::empty();
                for member in node.list().filter_map(|c| c.as_node()) {
                    result.add_union_type(&self.union_type_from_type_node(member)?);
                }
                Ok(result)
            }
            NodeKind::Name => {
                let fqsen = self.context_node().class_fqsen_from_name_node(node)?;
                Ok(UnionType::of(registry.class_type(&fqsen)))
            }
            _ => Err(AnalysisFailure::unanalyzable(node.id, "not a type declaration")),
        }
    }
}

/// A named child that must be present.
pub(crate) fn required<'a>(node: &Node<'a>, name: &str) -> AnalysisResult<Child<'a>> {
    node.child(name)
        .ok_or_else(|| AnalysisFailure::unanalyzable(node.id, "missing child"))
}

/// Truthiness of a condition that is a literal scalar or `true`/`false`/`null`.
fn constant_truthiness(cond: Child<'_>) -> Option<bool> {
    match cond {
        Child::Int(value) => Some(value != 0),
        Child::Float(value) => Some(value != 0.0),
        Child::Str(value) => Some(!(value.is_empty() || value == "0")),
        Child::Bool(value) => Some(value),
        Child::Null => Some(false),
        Child::Node(node) if node.is(NodeKind::Const) => {
            let name = node.child_node("name")?.child_str("name")?;
            match name.to_ascii_lowercase().as_str() {
                "true" => Some(true),
                "false" | "null" => Some(false),
                _ => None,
            }
        }
        Child::Node(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use strix_ast::AstBuilder;

    #[test]
    fn test_constant_truthiness() {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        assert_eq!(constant_truthiness(Child::Int(0)), Some(false));
        assert_eq!(constant_truthiness(b.str("0")), Some(false));
        assert_eq!(constant_truthiness(b.str("a")), Some(true));
        assert_eq!(constant_truthiness(Child::Node(b.konst("TRUE"))), Some(true));
        assert_eq!(constant_truthiness(Child::Node(b.konst("PHP_EOL"))), None);
        assert_eq!(constant_truthiness(Child::Node(b.var("x"))), None);
    }
}
