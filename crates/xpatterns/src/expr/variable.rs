use super::{ExprRef, Expression, ExpressionId, OperandList, Properties};
use crate::runtime::{DynamicContext, Error, StaticContext};
use crate::types::{Cardinality, SequenceType};
use crate::xdm::XdmItem;
use std::sync::Arc;

/// Reads the item currently bound to a `for` variable.
///
/// The source expression is the binding sequence and only serves static
/// typing; it is not an operand.
#[derive(Debug)]
pub struct RangeVariableReference {
    slot: usize,
    source: ExprRef,
}

impl RangeVariableReference {
    pub fn new(source: ExprRef, slot: usize) -> ExprRef {
        Arc::new(RangeVariableReference { slot, source })
    }

    pub fn slot(&self) -> usize {
        self.slot
    }
}

impl Expression for RangeVariableReference {
    fn id(&self) -> ExpressionId {
        ExpressionId::RangeVariableReference
    }

    fn operands(&self) -> &[ExprRef] {
        &[]
    }

    fn static_type(&self) -> SequenceType {
        SequenceType::new(self.source.static_type().item_type, Cardinality::EXACTLY_ONE)
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        Vec::new()
    }

    fn properties(&self) -> Properties {
        Properties::DEPENDS_ON_LOCAL_VARIABLE
    }

    fn type_check(self: Arc<Self>, _ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn compress(self: Arc<Self>, _ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        Ok(self)
    }

    /// Panics when no enclosing clause has bound the slot.
    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        match ctx.range_variable(self.slot) {
            Some(item) => Ok(Some(item)),
            None => unreachable!("range variable slot {} read while unbound", self.slot),
        }
    }

    fn variable_slot(&self) -> Option<usize> {
        Some(self.slot)
    }

    fn with_operands(&self, _operands: OperandList) -> ExprRef {
        RangeVariableReference::new(Arc::clone(&self.source), self.slot)
    }
}

/// Reads the 1-based position bound by `for ... at $p`.
#[derive(Debug)]
pub struct PositionalVariableReference {
    slot: usize,
}

impl PositionalVariableReference {
    pub fn new(slot: usize) -> ExprRef {
        Arc::new(PositionalVariableReference { slot })
    }
}

impl Expression for PositionalVariableReference {
    fn id(&self) -> ExpressionId {
        ExpressionId::PositionalVariableReference
    }

    fn operands(&self) -> &[ExprRef] {
        &[]
    }

    fn static_type(&self) -> SequenceType {
        SequenceType::INTEGER
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        Vec::new()
    }

    fn properties(&self) -> Properties {
        Properties::DEPENDS_ON_LOCAL_VARIABLE
    }

    fn type_check(self: Arc<Self>, _ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn compress(self: Arc<Self>, _ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        match ctx.range_variable(self.slot) {
            Some(item) => Ok(Some(item)),
            None => unreachable!("positional variable slot {} read while unbound", self.slot),
        }
    }

    fn variable_slot(&self) -> Option<usize> {
        Some(self.slot)
    }

    fn with_operands(&self, _operands: OperandList) -> ExprRef {
        PositionalVariableReference::new(self.slot)
    }
}
