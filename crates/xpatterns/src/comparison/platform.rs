use super::comparators::{comparator_for, supports_operator};
use super::{AtomicComparator, AtomicOperator, ComparisonType, display_name};
use crate::runtime::{Error, ErrorCode, ExprKey, ReportContext};
use crate::types::{AtomicType, ItemType};
use crate::xdm::XdmAtomicValue;
use chrono::FixedOffset;
use std::borrow::Cow;

/// Comparator selection and application shared by the comparison expressions.
///
/// When both operand types are known at type-check time the comparator is
/// resolved once and cached; otherwise it is looked up per value pair.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonPlatform {
    operator: AtomicOperator,
    comparison_type: ComparisonType,
    report_errors: bool,
    comparator: Option<&'static dyn AtomicComparator>,
}

impl ComparisonPlatform {
    /// `report_errors` decides whether a value pair without a comparator is a
    /// dynamic `XPTY0004` or simply no match.
    pub fn new(operator: AtomicOperator, comparison_type: ComparisonType, report_errors: bool) -> Self {
        Self {
            operator,
            comparison_type,
            report_errors,
            comparator: None,
        }
    }

    pub fn operator(&self) -> AtomicOperator {
        self.operator
    }

    pub fn comparison_type(&self) -> ComparisonType {
        self.comparison_type
    }

    pub fn comparator(&self) -> Option<&'static dyn AtomicComparator> {
        self.comparator
    }

    /// Use `comparator` for every pair from now on.
    pub fn with_comparator(mut self, comparator: &'static dyn AtomicComparator) -> Self {
        self.comparator = Some(comparator);
        self
    }

    pub fn display_name(&self) -> &'static str {
        display_name(self.operator, self.comparison_type)
    }

    fn lookup<R: ReportContext>(
        &self,
        t1: AtomicType,
        t2: AtomicType,
        report: bool,
        ctx: &R,
        key: ExprKey,
    ) -> Result<Option<&'static dyn AtomicComparator>, Error> {
        match comparator_for(t1, t2) {
            Some(c) if supports_operator(c, self.operator, t1, t2) => Ok(Some(c)),
            Some(_) if report => Err(ctx.error(
                format!(
                    "operator {} is not available between atomic values of type {} and {}",
                    self.display_name(),
                    t1,
                    t2
                ),
                ErrorCode::XPTY0004,
                key,
            )),
            None if report => Err(ctx.error(
                format!("{t1} is not comparable to {t2}"),
                ErrorCode::XPTY0004,
                key,
            )),
            _ => Ok(None),
        }
    }

    /// Locate the comparator for a pair of atomic types and check that it
    /// supports the operator.
    pub fn fetch_comparator<R: ReportContext>(
        &self,
        t1: AtomicType,
        t2: AtomicType,
        ctx: &R,
        key: ExprKey,
    ) -> Result<Option<&'static dyn AtomicComparator>, Error> {
        self.lookup(t1, t2, self.report_errors, ctx, key)
    }

    /// Resolve the comparator at type-check time when both static item types
    /// name concrete atomic types. A concrete pair without a comparator is
    /// always a static error, regardless of `report_errors`.
    pub fn prepare_static<R: ReportContext>(
        &mut self,
        t1: ItemType,
        t2: ItemType,
        ctx: &R,
        key: ExprKey,
    ) -> Result<(), Error> {
        if let (Some(a), Some(b)) = (t1.atomic(), t2.atomic())
            && a != AtomicType::UntypedAtomic
            && b != AtomicType::UntypedAtomic
        {
            self.comparator = self.lookup(a, b, true, ctx, key)?;
        }
        Ok(())
    }

    /// The comparator for one value pair: the cached one if present,
    /// otherwise a fresh lookup.
    pub fn comparator_for_values<R: ReportContext>(
        &self,
        op1: &XdmAtomicValue,
        op2: &XdmAtomicValue,
        ctx: &R,
        key: ExprKey,
    ) -> Result<Option<&'static dyn AtomicComparator>, Error> {
        match self.comparator {
            Some(c) => Ok(Some(c)),
            None => self.fetch_comparator(op1.atomic_type(), op2.atomic_type(), ctx, key),
        }
    }

    /// Apply the operator. Equality operators go through `equals`, the rest
    /// through `compare`; zone-less temporal values take `implicit_timezone`.
    pub fn compare(
        &self,
        comparator: &dyn AtomicComparator,
        op1: &XdmAtomicValue,
        op2: &XdmAtomicValue,
        implicit_timezone: FixedOffset,
    ) -> bool {
        let op1 = with_timezone(op1, implicit_timezone);
        let op2 = with_timezone(op2, implicit_timezone);
        match self.operator {
            AtomicOperator::Equal => comparator.equals(&op1, &op2),
            AtomicOperator::NotEqual => !comparator.equals(&op1, &op2),
            op => op.accepts(comparator.compare(&op1, op, &op2)),
        }
    }
}

fn with_timezone(v: &XdmAtomicValue, tz: FixedOffset) -> Cow<'_, XdmAtomicValue> {
    match v {
        XdmAtomicValue::Date { date, tz: None } => Cow::Owned(XdmAtomicValue::Date {
            date: *date,
            tz: Some(tz),
        }),
        XdmAtomicValue::Time { time, tz: None } => Cow::Owned(XdmAtomicValue::Time {
            time: *time,
            tz: Some(tz),
        }),
        XdmAtomicValue::DateTime { value, tz: None } => Cow::Owned(XdmAtomicValue::DateTime {
            value: *value,
            tz: Some(tz),
        }),
        _ => Cow::Borrowed(v),
    }
}
