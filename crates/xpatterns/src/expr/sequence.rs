use super::{
    ExprRef, Expression, ExpressionId, ItemIter, OperandList, SequenceReceiver, compress_operands,
    empty_sequence, rebuild, type_check_operands,
};
use crate::runtime::{DynamicContext, Error, StaticContext};
use crate::types::{Cardinality, SequenceType};
use std::sync::Arc;

/// The comma operator: concatenation of its operands' values.
#[derive(Debug)]
pub struct ExpressionSequence {
    operands: OperandList,
}

impl ExpressionSequence {
    pub fn new(operands: impl IntoIterator<Item = ExprRef>) -> ExprRef {
        Arc::new(ExpressionSequence {
            operands: operands.into_iter().collect(),
        })
    }
}

impl Expression for ExpressionSequence {
    fn id(&self) -> ExpressionId {
        ExpressionId::ExpressionSequence
    }

    fn operands(&self) -> &[ExprRef] {
        &self.operands
    }

    fn static_type(&self) -> SequenceType {
        let mut ops = self.operands.iter().map(|op| op.static_type());
        let Some(first) = ops.next() else {
            return SequenceType::EMPTY;
        };
        ops.fold(first, |acc, t| {
            let item_type = match (acc.cardinality.is_empty(), t.cardinality.is_empty()) {
                (true, _) => t.item_type,
                (_, true) => acc.item_type,
                _ => acc.item_type.union(t.item_type),
            };
            SequenceType::new(item_type, acc.cardinality.plus(t.cardinality))
        })
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        vec![SequenceType::ITEM_ZERO_OR_MORE; self.operands.len()]
    }

    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        let ops = type_check_operands(&self.operands, &self.expected_operand_types(), ctx)?;
        Ok(rebuild(&*self, ops, ctx))
    }

    /// Drops empty operands and collapses to the single remaining operand
    /// or to `()`.
    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        let mut ops: OperandList = compress_operands(&self.operands, ctx)?
            .into_iter()
            .filter(|op| op.static_type().cardinality != Cardinality::EMPTY)
            .collect();
        if ops.len() > 1 {
            return Ok(rebuild(&*self, ops, ctx));
        }
        let replacement = ops.pop().unwrap_or_else(empty_sequence);
        Ok(ctx.rewrite(&*self, replacement))
    }

    fn evaluate_sequence<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        Box::new(self.operands.iter().flat_map(move |op| op.evaluate_sequence(ctx)))
    }

    fn evaluate_to_receiver(&self, ctx: &DynamicContext, receiver: &mut dyn SequenceReceiver) -> Result<(), Error> {
        for op in &self.operands {
            op.evaluate_to_receiver(ctx, receiver)?;
        }
        Ok(())
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        Arc::new(ExpressionSequence { operands })
    }
}
