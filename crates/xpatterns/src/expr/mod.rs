//! The expression tree.
//!
//! Nodes are immutable and shared through [`ExprRef`]. `type_check` and
//! `compress` consume a handle and return the node to continue with, which is
//! either the same node, a rebuilt copy over new operands, or a different node
//! altogether; callers must always carry on with the returned handle.

use crate::comparison::{AtomicOperator, ComparisonType};
use crate::optimizer::OptimizationPass;
use crate::runtime::{DynamicContext, DynamicContextBuilder, Error, ErrorCode, ExprKey, ReportContext, StaticContext};
use crate::types::{AtomicType, ItemType, SequenceType};
use crate::xdm::{XdmAtomicValue, XdmItem};
use core::fmt;
use core::ops::BitOr;
use smallvec::SmallVec;
use std::sync::Arc;

pub mod for_clause;
pub mod function_call;
pub mod general_comparison;
pub mod literal;
pub mod pair;
pub mod sequence;
pub mod value_comparison;
pub mod variable;

pub use for_clause::ForClause;
pub use function_call::FunctionCall;
pub use general_comparison::GeneralComparison;
pub use literal::{EmptySequence, Literal, empty_sequence, literal};
pub use pair::PairContainer;
pub use sequence::ExpressionSequence;
pub use value_comparison::{ValueComparison, is_case_insensitive_compare};
pub use variable::{PositionalVariableReference, RangeVariableReference};

pub type ExprRef = Arc<dyn Expression>;
pub type OperandList = SmallVec<[ExprRef; 2]>;
pub type ItemIter<'a> = Box<dyn Iterator<Item = Result<XdmItem, Error>> + 'a>;

/// Identity tag of a node kind, used by optimizer pattern matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionId {
    BooleanValue,
    IntegerValue,
    DecimalValue,
    DoubleValue,
    StringValue,
    AtomicValue,
    EmptySequence,
    ExpressionSequence,
    GeneralComparison,
    ValueComparison,
    ForClause,
    RangeVariableReference,
    PositionalVariableReference,
    CountFN,
    ExistsFN,
    EmptyFN,
    NotFN,
    BooleanFN,
    DistinctValuesFN,
    UpperCaseFN,
    LowerCaseFN,
    DocFN,
    ResolveUriFN,
    DocumentFN,
    DateTimeFN,
}

/// Static properties of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Properties(u32);

impl Properties {
    pub const NONE: Properties = Properties(0);
    /// The node is a value; evaluating it does no work.
    pub const IS_EVALUATED: Properties = Properties(1);
    /// The value depends on a range variable bound by an enclosing clause.
    pub const DEPENDS_ON_LOCAL_VARIABLE: Properties = Properties(1 << 1);
    /// The node must be evaluated at run time even when its operands are constant.
    pub const DISABLE_ELIMINATION: Properties = Properties(1 << 2);
    pub const REQUIRES_CONTEXT_ITEM: Properties = Properties(1 << 3);

    pub const fn contains(self, other: Properties) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: Properties) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for Properties {
    type Output = Properties;

    fn bitor(self, rhs: Properties) -> Properties {
        Properties(self.0 | rhs.0)
    }
}

/// Push-style consumer of result items.
pub trait SequenceReceiver {
    fn item(&mut self, item: XdmItem) -> Result<(), Error>;
}

impl SequenceReceiver for Vec<XdmItem> {
    fn item(&mut self, item: XdmItem) -> Result<(), Error> {
        self.push(item);
        Ok(())
    }
}

pub trait Expression: fmt::Debug + Send + Sync {
    fn id(&self) -> ExpressionId;

    fn operands(&self) -> &[ExprRef];

    fn static_type(&self) -> SequenceType;

    /// Required type of each operand, checked during `type_check`.
    fn expected_operand_types(&self) -> Vec<SequenceType>;

    fn properties(&self) -> Properties {
        Properties::NONE
    }

    /// Properties of this node and its whole subtree.
    fn deep_properties(&self) -> Properties {
        self.operands()
            .iter()
            .fold(self.properties(), |acc, op| acc | op.deep_properties())
    }

    /// Infer static types, validate operands and possibly rewrite.
    /// `required` is what the parent expects of this node's value.
    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, required: &SequenceType) -> Result<ExprRef, Error>;

    /// Optimize; runs after `type_check`.
    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error>;

    /// Lazy evaluation. Nodes implement at least one of `evaluate_sequence`
    /// and `evaluate_singleton`; each defaults to the other.
    fn evaluate_sequence<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        Box::new(self.evaluate_singleton(ctx).transpose().into_iter())
    }

    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        self.evaluate_sequence(ctx).next().transpose()
    }

    fn evaluate_ebv(&self, ctx: &DynamicContext) -> Result<bool, Error> {
        effective_boolean_value(self.evaluate_sequence(ctx), ctx, ExprKey::of(self))
    }

    fn evaluate_to_receiver(
        &self,
        ctx: &DynamicContext,
        receiver: &mut dyn SequenceReceiver,
    ) -> Result<(), Error> {
        for item in self.evaluate_sequence(ctx) {
            receiver.item(item?)?;
        }
        Ok(())
    }

    /// Rewrite rules tried against this node during `compress`.
    fn optimization_passes(&self) -> &[OptimizationPass] {
        &[]
    }

    /// Operator and flavor, for comparison nodes.
    fn comparison(&self) -> Option<(AtomicOperator, ComparisonType)> {
        None
    }

    /// The value, for literal nodes.
    fn literal_value(&self) -> Option<&XdmAtomicValue> {
        None
    }

    /// The slot read, for variable references.
    fn variable_slot(&self) -> Option<usize> {
        None
    }

    /// A node of the same kind and configuration over `operands`.
    fn with_operands(&self, operands: OperandList) -> ExprRef;
}

/// Whether an operand of static item type `actual` can satisfy `required`
/// once atomization and the function conversion rules have been applied.
fn item_type_may_match(actual: ItemType, required: ItemType) -> bool {
    if actual.is_subtype_of(required) || required.is_subtype_of(actual) {
        return true;
    }
    match (actual, required) {
        // nodes atomize to untypedAtomic, which casts to any atomic type
        (ItemType::Node, r) => r.is_atomic(),
        (ItemType::Atomic(AtomicType::UntypedAtomic), r) => r.is_atomic(),
        (a, r) if a.is_subtype_of(ItemType::Numeric) && r.is_subtype_of(ItemType::Numeric) => true,
        (ItemType::Atomic(AtomicType::AnyUri), ItemType::Atomic(AtomicType::String)) => true,
        _ => false,
    }
}

/// Static `XPTY0004` when `operand` can never produce a value of `required`.
pub fn check_operand(
    operand: &ExprRef,
    required: &SequenceType,
    ctx: &StaticContext,
) -> Result<(), Error> {
    let actual = operand.static_type();
    let cardinality_ok = actual.cardinality.intersects(required.cardinality);
    let item_ok = actual.cardinality.is_empty() || item_type_may_match(actual.item_type, required.item_type);
    if cardinality_ok && item_ok {
        return Ok(());
    }
    Err(ctx.error(
        format!("required type is {required}, but the supplied value has type {actual}"),
        ErrorCode::XPTY0004,
        ExprKey::of(&**operand),
    ))
}

/// Type-check every operand against its expected type.
pub fn type_check_operands(
    operands: &[ExprRef],
    expected: &[SequenceType],
    ctx: &mut StaticContext,
) -> Result<OperandList, Error> {
    let mut out = OperandList::with_capacity(operands.len());
    for (i, op) in operands.iter().enumerate() {
        let required = expected
            .get(i)
            .or_else(|| expected.last())
            .copied()
            .unwrap_or(SequenceType::ITEM_ZERO_OR_MORE);
        let checked = Arc::clone(op).type_check(ctx, &required)?;
        check_operand(&checked, &required, ctx)?;
        out.push(checked);
    }
    Ok(out)
}

pub fn compress_operands(operands: &[ExprRef], ctx: &mut StaticContext) -> Result<OperandList, Error> {
    operands
        .iter()
        .map(|op| Arc::clone(op).compress(ctx))
        .collect()
}

/// Rebuild `old` over `operands`, keeping its source location.
pub fn rebuild(old: &dyn Expression, operands: OperandList, ctx: &mut StaticContext) -> ExprRef {
    let new = old.with_operands(operands);
    ctx.wrap_expression_with(old, &new);
    new
}

fn is_constant(expr: &ExprRef) -> bool {
    matches!(expr.id(), ExpressionId::EmptySequence) || expr.literal_value().is_some()
}

/// Evaluate a pure node whose operands are all constants once, at compile
/// time, and replace it with the result. Nodes whose evaluation fails are left
/// alone so the error surfaces at run time.
pub fn fold_constant(expr: ExprRef, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
    let blocked = Properties::DEPENDS_ON_LOCAL_VARIABLE
        | Properties::DISABLE_ELIMINATION
        | Properties::REQUIRES_CONTEXT_ITEM;
    if is_constant(&expr)
        || expr.deep_properties().intersects(blocked)
        || !expr.operands().iter().all(is_constant)
    {
        return Ok(expr);
    }
    let timezone = ctx.implicit_timezone();
    if timezone.is_none()
        && expr
            .operands()
            .iter()
            .filter_map(|op| op.literal_value())
            .any(XdmAtomicValue::is_timezone_sensitive)
    {
        return Ok(expr);
    }
    let mut builder = DynamicContextBuilder::new();
    if let Some(tz) = timezone {
        builder = builder.with_implicit_timezone(tz);
    }
    let dyn_ctx = builder.build();
    let mut out: Vec<XdmItem> = Vec::new();
    if expr.evaluate_to_receiver(&dyn_ctx, &mut out).is_err() {
        return Ok(expr);
    }
    let folded = match out.as_slice() {
        [] => empty_sequence(),
        [XdmItem::Atomic(value)] => literal(value.clone()),
        _ => return Ok(expr),
    };
    Ok(ctx.rewrite(&*expr, folded))
}

/// Atomize a sequence: nodes are replaced by their typed values.
pub fn atomize<'a>(
    items: ItemIter<'a>,
) -> impl Iterator<Item = Result<XdmAtomicValue, Error>> + 'a {
    items.flat_map(|item| -> SmallVec<[Result<XdmAtomicValue, Error>; 1]> {
        match item {
            Ok(XdmItem::Atomic(a)) => smallvec::smallvec![Ok(a)],
            Ok(XdmItem::Node(n)) => n.typed_value().into_iter().map(Ok).collect(),
            Err(e) => smallvec::smallvec![Err(e)],
        }
    })
}

/// Effective boolean value of a lazily produced sequence.
pub fn effective_boolean_value<R: ReportContext>(
    mut items: ItemIter<'_>,
    ctx: &R,
    key: ExprKey,
) -> Result<bool, Error> {
    let Some(first) = items.next().transpose()? else {
        return Ok(false);
    };
    let atomic = match first {
        XdmItem::Node(_) => return Ok(true),
        XdmItem::Atomic(a) => a,
    };
    if items.next().transpose()?.is_some() {
        return Err(ctx.error(
            "effective boolean value is not defined for a sequence of two or more atomic values",
            ErrorCode::FORG0006,
            key,
        ));
    }
    atomic.effective_boolean_value().ok_or_else(|| {
        ctx.error(
            format!("effective boolean value is not defined for {}", atomic.atomic_type()),
            ErrorCode::FORG0006,
            key,
        )
    })
}
