use super::{
    ExprRef, Expression, ExpressionId, OperandList, PairContainer, atomize, compress_operands,
    empty_sequence, fold_constant, rebuild, type_check_operands,
};
use crate::comparison::comparators::CASE_INSENSITIVE_STRING;
use crate::comparison::{AtomicOperator, ComparisonPlatform, ComparisonType};
use crate::optimizer::passes::comparison_passes;
use crate::optimizer::{OptimizationPass, apply_passes};
use crate::runtime::{DynamicContext, Error, ErrorCode, ExprKey, ReportContext, StaticContext};
use crate::types::{AtomicType, Cardinality, ItemType, SequenceType};
use crate::xdm::cast::cast_atomic;
use crate::xdm::{XdmAtomicValue, XdmItem};
use std::sync::Arc;

/// `eq`, `ne`, `lt`, `le`, `gt`, `ge` over at most one item per side.
#[derive(Debug)]
pub struct ValueComparison {
    pair: PairContainer,
    platform: ComparisonPlatform,
}

impl ValueComparison {
    pub fn new(operand1: ExprRef, operator: AtomicOperator, operand2: ExprRef) -> ExprRef {
        Arc::new(ValueComparison {
            pair: PairContainer::new(operand1, operand2),
            platform: ComparisonPlatform::new(operator, ComparisonType::AsValueComparison, true),
        })
    }

    pub fn operator(&self) -> AtomicOperator {
        self.platform.operator()
    }

    pub fn platform(&self) -> &ComparisonPlatform {
        &self.platform
    }

    fn with_parts(&self, operands: OperandList, platform: ComparisonPlatform) -> ExprRef {
        Arc::new(ValueComparison {
            pair: PairContainer::from_list(operands),
            platform,
        })
    }

    /// Atomized operand value; `None` for the empty sequence.
    fn operand_value(&self, operand: &ExprRef, ctx: &DynamicContext) -> Result<Option<XdmAtomicValue>, Error> {
        let mut values = atomize(operand.evaluate_sequence(ctx));
        let Some(first) = values.next().transpose()? else {
            return Ok(None);
        };
        if values.next().is_some() {
            return Err(ctx.error(
                format!(
                    "a sequence of more than one item is not allowed as an operand of {}",
                    self.platform.display_name()
                ),
                ErrorCode::XPTY0004,
                ExprKey::of(self),
            ));
        }
        if first.atomic_type() == AtomicType::UntypedAtomic {
            return cast_atomic(&first, AtomicType::String).map(Some);
        }
        Ok(Some(first))
    }
}

fn untyped_as_string(t: ItemType) -> ItemType {
    match t {
        ItemType::Atomic(AtomicType::UntypedAtomic) => ItemType::Atomic(AtomicType::String),
        other => other,
    }
}

/// Whether both operands are calls to the same case-folding function
/// (`fn:upper-case` or `fn:lower-case`) over exactly one item each, so the
/// comparison can drop the calls and compare case-insensitively.
pub fn is_case_insensitive_compare(op1: &ExprRef, op2: &ExprRef) -> bool {
    let folding = |op: &ExprRef| {
        matches!(op.id(), ExpressionId::UpperCaseFN | ExpressionId::LowerCaseFN)
            && op.operands().len() == 1
            && op.operands()[0].static_type().cardinality.is_exactly_one()
    };
    op1.id() == op2.id() && folding(op1) && folding(op2)
}

/// Compression shared by both comparison kinds: the case-insensitive fast
/// path, then the optimization passes, then constant folding.
pub(crate) fn compress_comparison(
    this: &dyn Expression,
    operator: AtomicOperator,
    ctx: &mut StaticContext,
    case_insensitive: impl FnOnce(ExprRef, ExprRef) -> ExprRef,
) -> Result<ExprRef, Error> {
    let ops = compress_operands(this.operands(), ctx)?;
    if matches!(operator, AtomicOperator::Equal | AtomicOperator::NotEqual)
        && is_case_insensitive_compare(&ops[0], &ops[1])
    {
        let new = case_insensitive(
            Arc::clone(&ops[0].operands()[0]),
            Arc::clone(&ops[1].operands()[0]),
        );
        return Ok(ctx.rewrite(this, new));
    }
    let new = rebuild(this, ops, ctx);
    if let Some(rewritten) = apply_passes(&new, ctx)? {
        return rewritten.compress(ctx);
    }
    fold_constant(new, ctx)
}

impl Expression for ValueComparison {
    fn id(&self) -> ExpressionId {
        ExpressionId::ValueComparison
    }

    fn operands(&self) -> &[ExprRef] {
        self.pair.operands()
    }

    fn static_type(&self) -> SequenceType {
        let non_empty = self
            .operands()
            .iter()
            .all(|op| !op.static_type().cardinality.allows_empty());
        let cardinality = if non_empty {
            Cardinality::EXACTLY_ONE
        } else {
            Cardinality::ZERO_OR_ONE
        };
        SequenceType::atomic(AtomicType::Boolean, cardinality)
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        vec![SequenceType::ATOMIC_ZERO_OR_ONE, SequenceType::ATOMIC_ZERO_OR_ONE]
    }

    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        let ops = type_check_operands(self.operands(), &self.expected_operand_types(), ctx)?;
        if ops.iter().any(|op| op.static_type().cardinality.is_empty()) {
            return Ok(ctx.rewrite(&*self, empty_sequence()));
        }
        let mut platform = ComparisonPlatform::new(self.operator(), ComparisonType::AsValueComparison, true);
        let t1 = untyped_as_string(ops[0].static_type().item_type);
        let t2 = untyped_as_string(ops[1].static_type().item_type);
        platform.prepare_static(t1, t2, ctx, ExprKey::of(&*self))?;
        let new = self.with_parts(ops, platform);
        ctx.wrap_expression_with(&*self, &new);
        Ok(new)
    }

    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        let operator = self.operator();
        compress_comparison(&*self, operator, ctx, |a, b| {
            let ops: OperandList = [a, b].into_iter().collect();
            self.with_parts(ops, self.platform.with_comparator(&CASE_INSENSITIVE_STRING))
        })
    }

    /// The empty sequence if either operand is empty, otherwise a boolean.
    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        let Some(a) = self.operand_value(self.pair.operand1(), ctx)? else {
            return Ok(None);
        };
        let Some(b) = self.operand_value(self.pair.operand2(), ctx)? else {
            return Ok(None);
        };
        let key = ExprKey::of(self);
        let Some(comparator) = self.platform.comparator_for_values(&a, &b, ctx, key)? else {
            return Err(ctx.error(
                format!("{} is not comparable to {}", a.atomic_type(), b.atomic_type()),
                ErrorCode::XPTY0004,
                key,
            ));
        };
        let result = self.platform.compare(comparator, &a, &b, ctx.implicit_timezone());
        Ok(Some(XdmItem::Atomic(XdmAtomicValue::Boolean(result))))
    }

    fn optimization_passes(&self) -> &[OptimizationPass] {
        comparison_passes()
    }

    fn comparison(&self) -> Option<(AtomicOperator, ComparisonType)> {
        Some((self.operator(), ComparisonType::AsValueComparison))
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        self.with_parts(operands, self.platform)
    }
}
