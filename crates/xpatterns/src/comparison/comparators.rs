//! Concrete comparators and the type-pair lookup.

use super::numeric::{NumKind, classify, unify};
use super::{AtomicComparator, AtomicOperator, ComparisonResult};
use crate::types::AtomicType;
use crate::xdm::XdmAtomicValue;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime};

/// Codepoint collation; also serves `xs:anyURI`.
#[derive(Debug)]
pub struct StringComparator;

impl AtomicComparator for StringComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (op1.as_str(), op2.as_str()) {
            (Some(a), Some(b)) => a.cmp(b).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!((op1.as_str(), op2.as_str()), (Some(a), Some(b)) if a == b)
    }
}

/// Codepoint collation over the lower-cased strings.
#[derive(Debug)]
pub struct CaseInsensitiveStringComparator;

impl AtomicComparator for CaseInsensitiveStringComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (op1.as_str(), op2.as_str()) {
            (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!(
            (op1.as_str(), op2.as_str()),
            (Some(a), Some(b)) if a.to_lowercase() == b.to_lowercase()
        )
    }
}

/// `false` orders before `true`.
#[derive(Debug)]
pub struct BooleanComparator;

impl AtomicComparator for BooleanComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (op1, op2) {
            (XdmAtomicValue::Boolean(a), XdmAtomicValue::Boolean(b)) => a.cmp(b).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!((op1, op2), (XdmAtomicValue::Boolean(a), XdmAtomicValue::Boolean(b)) if a == b)
    }
}

#[derive(Debug)]
pub struct IntegerComparator;

impl AtomicComparator for IntegerComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (op1, op2) {
            (XdmAtomicValue::Integer(a), XdmAtomicValue::Integer(b)) => a.cmp(b).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!((op1, op2), (XdmAtomicValue::Integer(a), XdmAtomicValue::Integer(b)) if a == b)
    }
}

/// Exact comparison of decimals and integers.
#[derive(Debug)]
pub struct DecimalComparator;

impl AtomicComparator for DecimalComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        let (Some(a), Some(b)) = (
            classify(op1).and_then(NumKind::to_decimal),
            classify(op2).and_then(NumKind::to_decimal),
        ) else {
            return ComparisonResult::Incomparable;
        };
        a.cmp(&b).into()
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        self.compare(op1, AtomicOperator::Equal, op2) == ComparisonResult::Equal
    }
}

/// Floating point comparison of any two numerics, promoted to double.
///
/// NaN is incomparable except under the two NaN sorting operators, where it
/// orders before (`LessThanNaNLeast`) or after (`LessThanNaNGreatest`) every
/// other value and equal to itself.
#[derive(Debug)]
pub struct FloatComparator;

impl FloatComparator {
    fn doubles(op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> Option<(f64, f64)> {
        let (a, b) = unify(classify(op1)?, classify(op2)?);
        Some((a.to_f64(), b.to_f64()))
    }
}

impl AtomicComparator for FloatComparator {
    fn compare(&self, op1: &XdmAtomicValue, op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        let Some((a, b)) = Self::doubles(op1, op2) else {
            return ComparisonResult::Incomparable;
        };
        if a.is_nan() || b.is_nan() {
            let nan_least = match op {
                AtomicOperator::LessThanNaNLeast => true,
                AtomicOperator::LessThanNaNGreatest => false,
                _ => return ComparisonResult::Incomparable,
            };
            return match (a.is_nan(), b.is_nan()) {
                (true, true) => ComparisonResult::Equal,
                (true, false) if nan_least => ComparisonResult::LessThan,
                (true, false) => ComparisonResult::GreaterThan,
                (false, _) if nan_least => ComparisonResult::GreaterThan,
                (false, _) => ComparisonResult::LessThan,
            };
        }
        a.partial_cmp(&b).into()
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!(Self::doubles(op1, op2), Some((a, b)) if a == b)
    }
}

/// Dates, times and dateTimes, compared as UTC instants. Values without a
/// zone are taken as UTC; the platform supplies the implicit timezone first.
#[derive(Debug)]
pub struct DateTimeComparator;

fn reference_date() -> NaiveDate {
    // the fixed date xs:time values are anchored to for comparison
    NaiveDate::from_ymd_opt(1972, 12, 31).unwrap_or_default()
}

/// Seconds and nanoseconds since the epoch in UTC. Kept as integers so values
/// at the ends of the chrono range still normalize.
fn to_utc(local: NaiveDateTime, tz: Option<FixedOffset>) -> (i64, u32) {
    let offset = tz.map_or(0, |tz| tz.local_minus_utc());
    let local = local.and_utc();
    (local.timestamp() - i64::from(offset), local.timestamp_subsec_nanos())
}

fn instant(v: &XdmAtomicValue) -> Option<(AtomicType, (i64, u32))> {
    match v {
        XdmAtomicValue::Date { date, tz } => Some((AtomicType::Date, to_utc(date.and_time(Default::default()), *tz))),
        XdmAtomicValue::Time { time, tz } => Some((AtomicType::Time, to_utc(reference_date().and_time(*time), *tz))),
        XdmAtomicValue::DateTime { value, tz } => Some((AtomicType::DateTime, to_utc(*value, *tz))),
        _ => None,
    }
}

impl AtomicComparator for DateTimeComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (instant(op1), instant(op2)) {
            (Some((ta, a)), Some((tb, b))) if ta == tb => a.cmp(&b).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        self.compare(op1, AtomicOperator::Equal, op2) == ComparisonResult::Equal
    }
}

/// Equality across the whole duration family; ordering only within
/// `xs:yearMonthDuration` or within `xs:dayTimeDuration`.
#[derive(Debug)]
pub struct DurationComparator;

fn duration_parts(v: &XdmAtomicValue) -> Option<(i32, i64)> {
    match v {
        XdmAtomicValue::Duration { months, seconds } => Some((*months, *seconds)),
        XdmAtomicValue::YearMonthDuration(months) => Some((*months, 0)),
        XdmAtomicValue::DayTimeDuration(seconds) => Some((0, *seconds)),
        _ => None,
    }
}

impl AtomicComparator for DurationComparator {
    fn compare(&self, op1: &XdmAtomicValue, _op: AtomicOperator, op2: &XdmAtomicValue) -> ComparisonResult {
        match (op1, op2) {
            (XdmAtomicValue::YearMonthDuration(a), XdmAtomicValue::YearMonthDuration(b)) => a.cmp(b).into(),
            (XdmAtomicValue::DayTimeDuration(a), XdmAtomicValue::DayTimeDuration(b)) => a.cmp(b).into(),
            _ => ComparisonResult::Incomparable,
        }
    }

    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        matches!((duration_parts(op1), duration_parts(op2)), (Some(a), Some(b)) if a == b)
    }
}

/// Equality of namespace URI and local name; prefixes are ignored.
#[derive(Debug)]
pub struct QNameComparator;

impl AtomicComparator for QNameComparator {
    fn equals(&self, op1: &XdmAtomicValue, op2: &XdmAtomicValue) -> bool {
        match (op1, op2) {
            (
                XdmAtomicValue::QName { ns_uri: na, local: la, .. },
                XdmAtomicValue::QName { ns_uri: nb, local: lb, .. },
            ) => na == nb && la == lb,
            _ => false,
        }
    }

    fn is_ordered(&self) -> bool {
        false
    }
}

pub static STRING: StringComparator = StringComparator;
pub static CASE_INSENSITIVE_STRING: CaseInsensitiveStringComparator = CaseInsensitiveStringComparator;
pub static BOOLEAN: BooleanComparator = BooleanComparator;
pub static INTEGER: IntegerComparator = IntegerComparator;
pub static DECIMAL: DecimalComparator = DecimalComparator;
pub static FLOAT: FloatComparator = FloatComparator;
pub static DATE_TIME: DateTimeComparator = DateTimeComparator;
pub static DURATION: DurationComparator = DurationComparator;
pub static QNAME: QNameComparator = QNameComparator;

fn is_string_like(t: AtomicType) -> bool {
    matches!(t, AtomicType::String | AtomicType::AnyUri | AtomicType::UntypedAtomic)
}

/// Comparator for two atomic types, or `None` when values of these types can
/// never be compared. Operator support is checked separately by
/// [`supports_operator`].
pub fn comparator_for(t1: AtomicType, t2: AtomicType) -> Option<&'static dyn AtomicComparator> {
    use AtomicType::*;
    let found: &'static dyn AtomicComparator = match (t1, t2) {
        (a, b) if is_string_like(a) && is_string_like(b) => &STRING,
        (Boolean, Boolean) => &BOOLEAN,
        (Integer, Integer) => &INTEGER,
        (Integer | Decimal, Integer | Decimal) => &DECIMAL,
        (a, b) if a.is_numeric() && b.is_numeric() => &FLOAT,
        (a, b) if a.is_temporal() && a == b => &DATE_TIME,
        (a, b) if a.is_duration() && b.is_duration() => &DURATION,
        (QName, QName) => &QNAME,
        _ => return None,
    };
    tracing::trace!(?t1, ?t2, comparator = ?found, "selected comparator");
    Some(found)
}

/// Whether `op` may be applied to values of `t1` and `t2` with `comparator`.
pub fn supports_operator(
    comparator: &dyn AtomicComparator,
    op: AtomicOperator,
    t1: AtomicType,
    t2: AtomicType,
) -> bool {
    if !op.is_ordering() {
        return true;
    }
    if !comparator.is_ordered() {
        return false;
    }
    match (t1, t2) {
        (AtomicType::YearMonthDuration, AtomicType::YearMonthDuration)
        | (AtomicType::DayTimeDuration, AtomicType::DayTimeDuration) => true,
        (a, b) => !a.is_duration() && !b.is_duration(),
    }
}
