use super::value_comparison::compress_comparison;
use super::{
    ExprRef, Expression, ExpressionId, OperandList, PairContainer, atomize, literal,
    type_check_operands,
};
use crate::comparison::comparators::CASE_INSENSITIVE_STRING;
use crate::comparison::{AtomicOperator, ComparisonPlatform, ComparisonType};
use crate::optimizer::OptimizationPass;
use crate::optimizer::passes::comparison_passes;
use crate::runtime::{DynamicContext, Error, ErrorCode, ExprKey, ReportContext, StaticContext};
use crate::types::{AtomicType, SequenceType};
use crate::xdm::cast::{cast_atomic, to_double};
use crate::xdm::{XdmAtomicValue, XdmItem};
use std::sync::Arc;

/// `=`, `!=`, `<`, `<=`, `>`, `>=` over sequences: true if any pair of
/// atomized items satisfies the operator.
#[derive(Debug)]
pub struct GeneralComparison {
    pair: PairContainer,
    platform: ComparisonPlatform,
    backwards_compat: bool,
}

impl GeneralComparison {
    pub fn new(operand1: ExprRef, operator: AtomicOperator, operand2: ExprRef) -> ExprRef {
        Arc::new(GeneralComparison {
            pair: PairContainer::new(operand1, operand2),
            platform: ComparisonPlatform::new(operator, ComparisonType::AsGeneralComparison, false),
            backwards_compat: false,
        })
    }

    pub fn operator(&self) -> AtomicOperator {
        self.platform.operator()
    }

    /// XPath 1.0 compatibility mode, taken from the static context.
    pub fn is_backwards_compat(&self) -> bool {
        self.backwards_compat
    }

    pub fn platform(&self) -> &ComparisonPlatform {
        &self.platform
    }

    fn with_parts(&self, operands: OperandList, platform: ComparisonPlatform, backwards_compat: bool) -> ExprRef {
        Arc::new(GeneralComparison {
            pair: PairContainer::from_list(operands),
            platform,
            backwards_compat,
        })
    }

    fn compare_pair(
        &self,
        op1: &XdmAtomicValue,
        op2: &XdmAtomicValue,
        ctx: &DynamicContext,
        key: ExprKey,
    ) -> Result<bool, Error> {
        let (a, b) = if self.backwards_compat {
            compat_operands(op1, op2, ctx, key)?
        } else {
            promote_untyped(op1, op2)?
        };
        match self.platform.comparator_for_values(&a, &b, ctx, key)? {
            Some(comparator) => Ok(self.platform.compare(comparator, &a, &b, ctx.implicit_timezone())),
            None => Ok(false),
        }
    }
}

/// Conversion of `xs:untypedAtomic` operands: against a numeric the untyped
/// side becomes `xs:double`, against another untyped value or a string both
/// compare as strings, against anything else the untyped side is cast to the
/// other operand's type.
fn promote_untyped(
    op1: &XdmAtomicValue,
    op2: &XdmAtomicValue,
) -> Result<(XdmAtomicValue, XdmAtomicValue), Error> {
    fn cast_against(untyped: &XdmAtomicValue, other: AtomicType) -> Result<XdmAtomicValue, Error> {
        match other {
            AtomicType::UntypedAtomic | AtomicType::String | AtomicType::AnyUri => {
                cast_atomic(untyped, AtomicType::String)
            }
            t if t.is_numeric() => cast_atomic(untyped, AtomicType::Double),
            t => cast_atomic(untyped, t),
        }
    }
    let (t1, t2) = (op1.atomic_type(), op2.atomic_type());
    Ok(match (t1, t2) {
        (AtomicType::UntypedAtomic, AtomicType::UntypedAtomic) => (
            cast_atomic(op1, AtomicType::String)?,
            cast_atomic(op2, AtomicType::String)?,
        ),
        (AtomicType::UntypedAtomic, _) => (cast_against(op1, t2)?, op2.clone()),
        (_, AtomicType::UntypedAtomic) => (op1.clone(), cast_against(op2, t1)?),
        _ => (op1.clone(), op2.clone()),
    })
}

/// XPath 1.0 rules: a boolean on either side compares both as booleans,
/// otherwise a numeric on either side compares both as doubles.
fn compat_operands(
    op1: &XdmAtomicValue,
    op2: &XdmAtomicValue,
    ctx: &DynamicContext,
    key: ExprKey,
) -> Result<(XdmAtomicValue, XdmAtomicValue), Error> {
    let (t1, t2) = (op1.atomic_type(), op2.atomic_type());
    if t1 == AtomicType::Boolean || t2 == AtomicType::Boolean {
        let ebv = |v: &XdmAtomicValue| {
            v.effective_boolean_value().map(XdmAtomicValue::Boolean).ok_or_else(|| {
                ctx.error(
                    format!("{} has no boolean value", v.atomic_type()),
                    ErrorCode::FORG0006,
                    key,
                )
            })
        };
        return Ok((ebv(op1)?, ebv(op2)?));
    }
    if t1.is_numeric() || t2.is_numeric() {
        return Ok((XdmAtomicValue::Double(to_double(op1)), XdmAtomicValue::Double(to_double(op2))));
    }
    promote_untyped(op1, op2)
}

impl Expression for GeneralComparison {
    fn id(&self) -> ExpressionId {
        ExpressionId::GeneralComparison
    }

    fn operands(&self) -> &[ExprRef] {
        self.pair.operands()
    }

    fn static_type(&self) -> SequenceType {
        SequenceType::BOOLEAN
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        vec![SequenceType::ATOMIC_ZERO_OR_MORE, SequenceType::ATOMIC_ZERO_OR_MORE]
    }

    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        let ops = type_check_operands(self.operands(), &self.expected_operand_types(), ctx)?;
        if ops.iter().any(|op| op.static_type().cardinality.is_empty()) {
            return Ok(ctx.rewrite(&*self, literal(false)));
        }
        let backwards_compat = ctx.is_backwards_compat();
        let mut platform =
            ComparisonPlatform::new(self.operator(), ComparisonType::AsGeneralComparison, false);
        if !backwards_compat {
            let t1 = ops[0].static_type().item_type;
            let t2 = ops[1].static_type().item_type;
            platform.prepare_static(t1, t2, ctx, ExprKey::of(&*self))?;
        }
        let new = self.with_parts(ops, platform, backwards_compat);
        ctx.wrap_expression_with(&*self, &new);
        Ok(new)
    }

    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        let operator = self.operator();
        compress_comparison(&*self, operator, ctx, |a, b| {
            let ops: OperandList = [a, b].into_iter().collect();
            self.with_parts(ops, self.platform.with_comparator(&CASE_INSENSITIVE_STRING), self.backwards_compat)
        })
    }

    /// Operand 2 is materialized once; operand 1 is pulled lazily and the
    /// scan stops at the first matching pair.
    fn evaluate_ebv(&self, ctx: &DynamicContext) -> Result<bool, Error> {
        let key = ExprKey::of(self);
        let right: Vec<XdmAtomicValue> =
            atomize(self.pair.operand2().evaluate_sequence(ctx)).collect::<Result<_, _>>()?;
        if right.is_empty() {
            return Ok(false);
        }
        for left in atomize(self.pair.operand1().evaluate_sequence(ctx)) {
            let left = left?;
            for r in &right {
                if self.compare_pair(&left, r, ctx, key)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        Ok(Some(XdmItem::Atomic(XdmAtomicValue::Boolean(self.evaluate_ebv(ctx)?))))
    }

    fn optimization_passes(&self) -> &[OptimizationPass] {
        comparison_passes()
    }

    fn comparison(&self) -> Option<(AtomicOperator, ComparisonType)> {
        Some((self.operator(), ComparisonType::AsGeneralComparison))
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        self.with_parts(operands, self.platform, self.backwards_compat)
    }
}
