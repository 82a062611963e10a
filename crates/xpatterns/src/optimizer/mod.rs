//! Declarative rewrite passes.
//!
//! A pass describes a pattern over a node and its operands through
//! [`ExpressionIdentifier`]s, names the subexpression to keep through an
//! [`ExpressionMarker`], and optionally wraps it with an
//! [`ExpressionCreator`]. Nodes publish their passes through
//! [`Expression::optimization_passes`]; [`apply_passes`] runs them during
//! `compress`.

use crate::expr::{ExprRef, Expression, OperandList};
use crate::runtime::{Error, StaticContext};
use core::fmt;
use smallvec::SmallVec;
use std::sync::Arc;

pub mod blocks;
pub mod passes;

/// Predicate over a node.
pub trait ExpressionIdentifier: fmt::Debug + Send + Sync {
    fn matches(&self, expr: &ExprRef) -> bool;
}

/// Builds the replacement node of a pass from the marked subexpressions.
pub trait ExpressionCreator: fmt::Debug + Send + Sync {
    /// `source` is the node being rewritten.
    fn create(&self, operands: OperandList, ctx: &mut StaticContext, source: &dyn Expression) -> Result<ExprRef, Error>;
}

pub type IdentifierRef = Arc<dyn ExpressionIdentifier>;
pub type CreatorRef = Arc<dyn ExpressionCreator>;

/// Path of operand indexes from the matched node: `[0, 0]` is operand 0 of
/// operand 0.
pub type ExpressionMarker = SmallVec<[usize; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandsMatchMethod {
    /// Operand identifiers apply position by position.
    Sequential,
    /// For two operands, the swapped order is tried as well.
    AnyOrder,
}

#[derive(Debug, Clone)]
pub struct OptimizationPass {
    pub start_identifier: Option<IdentifierRef>,
    /// `None` entries match any operand.
    pub operand_identifiers: Vec<Option<IdentifierRef>>,
    pub source_expression: ExpressionMarker,
    pub result_creator: Option<CreatorRef>,
    pub operands_match_method: OperandsMatchMethod,
}

impl OptimizationPass {
    pub fn new(
        start_identifier: Option<IdentifierRef>,
        operand_identifiers: Vec<Option<IdentifierRef>>,
        source_expression: ExpressionMarker,
        result_creator: Option<CreatorRef>,
        operands_match_method: OperandsMatchMethod,
    ) -> Self {
        assert!(
            result_creator.is_some() || !source_expression.is_empty(),
            "an optimization pass needs a result creator or a source expression"
        );
        Self {
            start_identifier,
            operand_identifiers,
            source_expression,
            result_creator,
            operands_match_method,
        }
    }

    /// The marker to resolve if the pass applies to `expr`; under
    /// `AnyOrder` a swapped match flips the first marker index.
    pub fn match_expression(&self, expr: &ExprRef) -> Option<ExpressionMarker> {
        if let Some(start) = &self.start_identifier
            && !start.matches(expr)
        {
            return None;
        }
        let ops = expr.operands();
        if ops.len() != self.operand_identifiers.len() {
            return None;
        }
        if self.operands_match(ops.iter()) {
            return Some(self.source_expression.clone());
        }
        if self.operands_match_method == OperandsMatchMethod::AnyOrder
            && ops.len() == 2
            && self.operands_match(ops.iter().rev())
        {
            let mut marker = self.source_expression.clone();
            if let Some(first) = marker.first_mut()
                && *first < 2
            {
                *first = 1 - *first;
            }
            return Some(marker);
        }
        None
    }

    fn operands_match<'a>(&self, ops: impl Iterator<Item = &'a ExprRef>) -> bool {
        self.operand_identifiers
            .iter()
            .zip(ops)
            .all(|(id, op)| id.as_ref().is_none_or(|id| id.matches(op)))
    }
}

/// Follow `marker` down from `expr`. `None` if a step leaves the tree.
pub fn resolve_marker(expr: &ExprRef, marker: &[usize]) -> Option<ExprRef> {
    marker
        .iter()
        .try_fold(Arc::clone(expr), |node, &i| node.operands().get(i).cloned())
}

/// Run the node's own passes. Returns the replacement produced by the first
/// pass that applies.
pub fn apply_passes(expr: &ExprRef, ctx: &mut StaticContext) -> Result<Option<ExprRef>, Error> {
    apply_pass_list(expr, expr.optimization_passes(), ctx)
}

/// Run `passes` against `expr` in order; the first applicable pass wins.
/// The replacement inherits the source location of `expr`.
pub fn apply_pass_list(
    expr: &ExprRef,
    passes: &[OptimizationPass],
    ctx: &mut StaticContext,
) -> Result<Option<ExprRef>, Error> {
    for (index, pass) in passes.iter().enumerate() {
        let Some(marker) = pass.match_expression(expr) else {
            continue;
        };
        let operands: OperandList = if marker.is_empty() {
            OperandList::new()
        } else {
            match resolve_marker(expr, &marker) {
                Some(source) => smallvec::smallvec![source],
                None => continue,
            }
        };
        let result = match &pass.result_creator {
            Some(creator) => creator.create(operands, ctx, &**expr)?,
            None => match operands.into_iter().next() {
                Some(source) => source,
                None => continue,
            },
        };
        tracing::debug!(pass = index, from = ?expr.id(), to = ?result.id(), "optimization pass applied");
        return Ok(Some(ctx.rewrite(&**expr, result)));
    }
    Ok(None)
}
