//! Building blocks for optimization passes.

use super::{ExpressionCreator, ExpressionIdentifier};
use crate::comparison::{AtomicOperator, ComparisonType};
use crate::expr::{ExprRef, Expression, ExpressionId, OperandList};
use crate::runtime::{Error, StaticContext};
use crate::types::SequenceType;
use crate::xdm::{ExpandedName, XdmAtomicValue};
use std::sync::Arc;

/// Matches nodes with the given id.
#[derive(Debug, Clone, Copy)]
pub struct ByIdIdentifier(pub ExpressionId);

impl ExpressionIdentifier for ByIdIdentifier {
    fn matches(&self, expr: &ExprRef) -> bool {
        expr.id() == self.0
    }
}

/// Matches nodes whose static type is a subtype of the given one.
#[derive(Debug, Clone, Copy)]
pub struct BySequenceTypeIdentifier(pub SequenceType);

impl ExpressionIdentifier for BySequenceTypeIdentifier {
    fn matches(&self, expr: &ExprRef) -> bool {
        self.0.matches(&expr.static_type())
    }
}

/// Matches comparisons using `operator`, optionally of one flavor only.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonIdentifier {
    operator: AtomicOperator,
    comparison_type: Option<ComparisonType>,
}

impl ComparisonIdentifier {
    pub fn new(operator: AtomicOperator) -> Self {
        Self {
            operator,
            comparison_type: None,
        }
    }

    pub fn with_comparison_type(mut self, comparison_type: ComparisonType) -> Self {
        self.comparison_type = Some(comparison_type);
        self
    }
}

impl ExpressionIdentifier for ComparisonIdentifier {
    fn matches(&self, expr: &ExprRef) -> bool {
        expr.comparison().is_some_and(|(op, ty)| {
            op == self.operator && self.comparison_type.is_none_or(|wanted| wanted == ty)
        })
    }
}

/// Matches an `xs:integer` literal with the given value.
#[derive(Debug, Clone, Copy)]
pub struct IntegerIdentifier(pub i64);

impl ExpressionIdentifier for IntegerIdentifier {
    fn matches(&self, expr: &ExprRef) -> bool {
        matches!(expr.literal_value(), Some(XdmAtomicValue::Integer(i)) if *i == self.0)
    }
}

/// Matches an `xs:boolean` literal with the given value.
#[derive(Debug, Clone, Copy)]
pub struct BooleanIdentifier(pub bool);

impl ExpressionIdentifier for BooleanIdentifier {
    fn matches(&self, expr: &ExprRef) -> bool {
        matches!(expr.literal_value(), Some(XdmAtomicValue::Boolean(b)) if *b == self.0)
    }
}

/// Creates a call to `fn:exists` or `fn:empty` over the marked operand.
#[derive(Debug, Clone, Copy)]
pub struct ByIdCreator(ExpressionId);

impl ByIdCreator {
    pub fn new(id: ExpressionId) -> Self {
        assert!(
            matches!(id, ExpressionId::ExistsFN | ExpressionId::EmptyFN),
            "ByIdCreator cannot create {id:?}"
        );
        Self(id)
    }
}

impl ExpressionCreator for ByIdCreator {
    fn create(&self, operands: OperandList, ctx: &mut StaticContext, source: &dyn Expression) -> Result<ExprRef, Error> {
        let name = match self.0 {
            ExpressionId::ExistsFN => "exists",
            ExpressionId::EmptyFN => "empty",
            other => unreachable!("ByIdCreator holds {other:?}"),
        };
        let functions = Arc::clone(ctx.functions());
        let location = ctx.location_for(source).cloned();
        functions.create_function_call(&ExpandedName::fn_name(name), operands, ctx, location)
    }
}
