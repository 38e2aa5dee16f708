//! Result types of binary operators and compound assignments.

use crate::failure::{AnalysisFailure, AnalysisResult};
use crate::union_type_visitor::{required, UnionTypeVisitor};
use strix_ast::{BinaryOp, Node};
use strix_diagnostics::issues;
use strix_types::{TypeId, TypeRegistry, UnionType};

impl UnionTypeVisitor<'_, '_> {
    pub(crate) fn visit_binary_op(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let Some(op) = BinaryOp::from_flags(node.flags) else {
            return Err(AnalysisFailure::unanalyzable(node.id, "unknown binary operator"));
        };
        let left = required(node, "left")?;
        let right = required(node, "right")?;

        if op == BinaryOp::Coalesce {
            // An undefined left side is what `??` exists to tolerate.
            let left_type = self.visit_quietly(left);
            let right_type = self.visit(right)?;
            return Ok(left_type.non_nullable_clone(self.registry()).with_union_type(&right_type));
        }

        let left_type = self.visit(left)?;
        let right_type = self.visit(right)?;
        self.binary_result_type(node, op, &left_type, &right_type)
    }

    /// `$x op= expr` yields what `$x op expr` would.
    pub(crate) fn visit_assign_op(&mut self, node: &Node<'_>) -> AnalysisResult<UnionType> {
        let Some(op) = BinaryOp::from_flags(node.flags) else {
            return Err(AnalysisFailure::unanalyzable(node.id, "unknown assignment operator"));
        };
        let var = required(node, "var")?;
        let expr = required(node, "expr")?;
        if op == BinaryOp::Coalesce {
            let var_type = self.visit_quietly(var);
            let expr_type = self.visit(expr)?;
            return Ok(var_type.non_nullable_clone(self.registry()).with_union_type(&expr_type));
        }
        let var_type = self.visit(var)?;
        let expr_type = self.visit(expr)?;
        self.binary_result_type(node, op, &var_type, &expr_type)
    }

    fn binary_result_type(
        &mut self,
        node: &Node<'_>,
        op: BinaryOp,
        left: &UnionType,
        right: &UnionType,
    ) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        match op {
            BinaryOp::Concat => Ok(UnionType::of(TypeId::STRING)),
            BinaryOp::BoolAnd | BinaryOp::BoolOr | BinaryOp::BoolXor => Ok(UnionType::of(TypeId::BOOL)),
            BinaryOp::Spaceship => Ok(UnionType::of(TypeId::INT)),
            BinaryOp::ShiftLeft | BinaryOp::ShiftRight => Ok(UnionType::of(TypeId::INT)),
            _ if op.is_comparison() => {
                self.check_array_comparison(node, op, left, right);
                Ok(UnionType::of(TypeId::BOOL))
            }
            BinaryOp::BitwiseAnd | BinaryOp::BitwiseOr | BinaryOp::BitwiseXor => Ok(bitwise_result_type(registry, left)),
            _ => self.arithmetic_result_type(node, op, left, right),
        }
    }

    fn arithmetic_result_type(
        &mut self,
        node: &Node<'_>,
        op: BinaryOp,
        left: &UnionType,
        right: &UnionType,
    ) -> AnalysisResult<UnionType> {
        let registry = self.registry();
        let left_is_array = left.is_exclusively_array_like(registry) && !left.is_null();
        let right_is_array = right.is_exclusively_array_like(registry) && !right.is_null();

        if op == BinaryOp::Add && left_is_array && right_is_array {
            return Ok(left.non_nullable_clone(registry).with_union_type(&right.non_nullable_clone(registry)));
        }
        if left_is_array || right_is_array {
            let args = vec![op.to_string(), self.display(left), self.display(right)];
            return Err(self.failure(&issues::TypeArrayOperator, node.lineno, args));
        }

        if op == BinaryOp::Mod {
            return Ok(UnionType::of(TypeId::INT));
        }
        let both_int = left.is_exclusively_int_like(registry) && right.is_exclusively_int_like(registry);
        if both_int {
            return Ok(match op {
                BinaryOp::Div => UnionType::from_types([TypeId::INT, TypeId::FLOAT]),
                _ => UnionType::of(TypeId::INT),
            });
        }
        if left.is_exclusively_float(registry) || right.is_exclusively_float(registry) {
            return Ok(UnionType::of(TypeId::FLOAT));
        }
        Ok(UnionType::from_types([TypeId::INT, TypeId::FLOAT]))
    }

    /// Loose comparison of an array with a scalar is almost always a bug.
    fn check_array_comparison(&mut self, node: &Node<'_>, op: BinaryOp, left: &UnionType, right: &UnionType) {
        if matches!(op, BinaryOp::IsIdentical | BinaryOp::IsNotIdentical) {
            return;
        }
        let registry = self.registry();
        let is_array = |t: &UnionType| t.is_exclusively_array_like(registry) && !t.is_null();
        let is_scalar = |t: &UnionType| t.is_exclusively_scalar(registry) && !t.is_null();
        if is_array(left) && is_scalar(right) {
            let rendered = self.display(right);
            self.emit(&issues::TypeComparisonFromArray, node.lineno, vec![rendered]);
        } else if is_scalar(left) && is_array(right) {
            let rendered = self.display(left);
            self.emit(&issues::TypeComparisonToArray, node.lineno, vec![rendered]);
        }
    }
}

/// Bitwise operators keep the left operand's category: strings stay
/// strings, everything else is an integer. An unknown left side may be
/// either.
fn bitwise_result_type(registry: &TypeRegistry, left: &UnionType) -> UnionType {
    if left.is_empty() || left.has_mixed() {
        return UnionType::from_types([TypeId::INT, TypeId::STRING]);
    }
    let left = left.non_nullable_clone(registry);
    let mut result = UnionType::empty();
    if left.has_string_like(registry) {
        result.add_type(TypeId::STRING);
    }
    if left.is_empty() || !left.is_exclusively_string_like(registry) {
        result.add_type(TypeId::INT);
    }
    result
}
