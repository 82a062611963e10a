use super::{ExprRef, Expression, ExpressionId, OperandList, Properties};
use crate::runtime::{DynamicContext, Error, StaticContext};
use crate::types::{Cardinality, ItemType, SequenceType};
use crate::xdm::{XdmAtomicValue, XdmItem};
use std::sync::Arc;

/// A constant atomic value.
#[derive(Debug)]
pub struct Literal {
    value: XdmAtomicValue,
}

pub fn literal(value: impl Into<XdmAtomicValue>) -> ExprRef {
    Arc::new(Literal { value: value.into() })
}

impl Literal {
    pub fn value(&self) -> &XdmAtomicValue {
        &self.value
    }
}

impl Expression for Literal {
    fn id(&self) -> ExpressionId {
        match self.value {
            XdmAtomicValue::Boolean(_) => ExpressionId::BooleanValue,
            XdmAtomicValue::Integer(_) => ExpressionId::IntegerValue,
            XdmAtomicValue::Decimal(_) => ExpressionId::DecimalValue,
            XdmAtomicValue::Double(_) => ExpressionId::DoubleValue,
            XdmAtomicValue::String(_) => ExpressionId::StringValue,
            _ => ExpressionId::AtomicValue,
        }
    }

    fn operands(&self) -> &[ExprRef] {
        &[]
    }

    fn static_type(&self) -> SequenceType {
        SequenceType::new(ItemType::Atomic(self.value.atomic_type()), Cardinality::EXACTLY_ONE)
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        Vec::new()
    }

    fn properties(&self) -> Properties {
        Properties::IS_EVALUATED
    }

    fn type_check(self: Arc<Self>, _ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn compress(self: Arc<Self>, _ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn evaluate_singleton(&self, _ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        Ok(Some(XdmItem::Atomic(self.value.clone())))
    }

    fn literal_value(&self) -> Option<&XdmAtomicValue> {
        Some(&self.value)
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        debug_assert!(operands.is_empty());
        Arc::new(Literal {
            value: self.value.clone(),
        })
    }
}

/// `()`
#[derive(Debug)]
pub struct EmptySequence;

pub fn empty_sequence() -> ExprRef {
    Arc::new(EmptySequence)
}

impl Expression for EmptySequence {
    fn id(&self) -> ExpressionId {
        ExpressionId::EmptySequence
    }

    fn operands(&self) -> &[ExprRef] {
        &[]
    }

    fn static_type(&self) -> SequenceType {
        SequenceType::EMPTY
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        Vec::new()
    }

    fn properties(&self) -> Properties {
        Properties::IS_EVALUATED
    }

    fn type_check(self: Arc<Self>, _ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn compress(self: Arc<Self>, _ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        Ok(self)
    }

    fn evaluate_singleton(&self, _ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        Ok(None)
    }

    fn evaluate_ebv(&self, _ctx: &DynamicContext) -> Result<bool, Error> {
        Ok(false)
    }

    fn with_operands(&self, _operands: OperandList) -> ExprRef {
        empty_sequence()
    }
}
