//! Pass catalog shared by general and value comparisons.

use super::blocks::{
    BooleanIdentifier, ByIdCreator, ByIdIdentifier, BySequenceTypeIdentifier, ComparisonIdentifier,
    IntegerIdentifier,
};
use super::{IdentifierRef, OperandsMatchMethod, OptimizationPass};
use crate::comparison::AtomicOperator;
use crate::expr::ExpressionId;
use crate::types::SequenceType;
use smallvec::smallvec;
use std::sync::{Arc, OnceLock};

fn count_of() -> Option<IdentifierRef> {
    let id: IdentifierRef = Arc::new(ByIdIdentifier(ExpressionId::CountFN));
    Some(id)
}

fn integer(n: i64) -> Option<IdentifierRef> {
    let id: IdentifierRef = Arc::new(IntegerIdentifier(n));
    Some(id)
}

/// `count(E) op n` (or `n op count(E)` when `count_first` is false)
/// rewritten to `creates(E)`.
fn count_pass(
    operator: AtomicOperator,
    count_first: bool,
    n: i64,
    creates: ExpressionId,
    method: OperandsMatchMethod,
) -> OptimizationPass {
    let (operands, marker) = if count_first {
        (vec![count_of(), integer(n)], smallvec![0, 0])
    } else {
        (vec![integer(n), count_of()], smallvec![1, 0])
    };
    OptimizationPass::new(
        Some(Arc::new(ComparisonIdentifier::new(operator))),
        operands,
        marker,
        Some(Arc::new(ByIdCreator::new(creates))),
        method,
    )
}

/// `B op literal` rewritten to `B` for a boolean `B`.
fn boolean_identity(operator: AtomicOperator, literal: bool) -> OptimizationPass {
    let operand: IdentifierRef = Arc::new(BySequenceTypeIdentifier(SequenceType::BOOLEAN));
    let value: IdentifierRef = Arc::new(BooleanIdentifier(literal));
    OptimizationPass::new(
        Some(Arc::new(ComparisonIdentifier::new(operator))),
        vec![Some(operand), Some(value)],
        smallvec![0],
        None,
        OperandsMatchMethod::AnyOrder,
    )
}

pub fn comparison_passes() -> &'static [OptimizationPass] {
    static PASSES: OnceLock<Vec<OptimizationPass>> = OnceLock::new();
    PASSES.get_or_init(|| {
        use AtomicOperator::*;
        use ExpressionId::{EmptyFN, ExistsFN};
        use OperandsMatchMethod::{AnyOrder, Sequential};
        vec![
            // empty(E)
            count_pass(Equal, true, 0, EmptyFN, AnyOrder),
            count_pass(LessOrEqual, true, 0, EmptyFN, Sequential),
            count_pass(GreaterOrEqual, false, 0, EmptyFN, Sequential),
            // exists(E)
            count_pass(NotEqual, true, 0, ExistsFN, AnyOrder),
            count_pass(GreaterThan, true, 0, ExistsFN, Sequential),
            count_pass(LessThan, false, 0, ExistsFN, Sequential),
            count_pass(GreaterOrEqual, true, 1, ExistsFN, Sequential),
            count_pass(LessOrEqual, false, 1, ExistsFN, Sequential),
            // B
            boolean_identity(Equal, true),
            boolean_identity(NotEqual, false),
        ]
    })
}
