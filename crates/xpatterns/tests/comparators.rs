use chrono::FixedOffset;
use proptest::prelude::*;
use rstest::rstest;
use xpatterns::comparison::comparators::{
    CASE_INSENSITIVE_STRING, DURATION, FLOAT, QNAME, STRING, comparator_for, supports_operator,
};
use xpatterns::comparison::{ComparisonPlatform, display_name};
use xpatterns::xdm::cast::cast_from_str;
use xpatterns::{AtomicComparator, AtomicOperator, AtomicType, ComparisonResult, ComparisonType, XdmAtomicValue};

const ORDER: [AtomicOperator; 6] = [
    AtomicOperator::Equal,
    AtomicOperator::NotEqual,
    AtomicOperator::GreaterOrEqual,
    AtomicOperator::GreaterThan,
    AtomicOperator::LessOrEqual,
    AtomicOperator::LessThan,
];

fn utc() -> FixedOffset {
    FixedOffset::east_opt(0).unwrap()
}

#[rstest]
#[case(ComparisonType::AsGeneralComparison, ["=", "!=", "<=", "<", ">=", ">"])]
#[case(ComparisonType::AsValueComparison, ["eq", "ne", "ge", "gt", "le", "lt"])]
fn display_name_table(#[case] ty: ComparisonType, #[case] expected: [&str; 6]) {
    let names: Vec<&str> = ORDER.iter().map(|op| display_name(*op, ty)).collect();
    assert_eq!(names, expected);
    // every comparator renders the same table
    let via_trait: Vec<&str> = ORDER.iter().map(|op| STRING.display_name(*op, ty)).collect();
    assert_eq!(via_trait, expected);
}

#[rstest]
#[case(AtomicOperator::GreaterOrEqual, AtomicOperator::Equal, true)]
#[case(AtomicOperator::GreaterOrEqual, AtomicOperator::GreaterThan, true)]
#[case(AtomicOperator::LessOrEqual, AtomicOperator::GreaterThan, false)]
#[case(AtomicOperator::NotEqual, AtomicOperator::Equal, false)]
fn operator_flags(#[case] op: AtomicOperator, #[case] flag: AtomicOperator, #[case] expected: bool) {
    assert_eq!(op.contains(flag), expected);
}

#[rstest]
#[case(AtomicType::String, AtomicType::AnyUri, "StringComparator")]
#[case(AtomicType::UntypedAtomic, AtomicType::String, "StringComparator")]
#[case(AtomicType::Integer, AtomicType::Integer, "IntegerComparator")]
#[case(AtomicType::Integer, AtomicType::Decimal, "DecimalComparator")]
#[case(AtomicType::Integer, AtomicType::Double, "FloatComparator")]
#[case(AtomicType::Float, AtomicType::Decimal, "FloatComparator")]
#[case(AtomicType::Date, AtomicType::Date, "DateTimeComparator")]
#[case(AtomicType::YearMonthDuration, AtomicType::Duration, "DurationComparator")]
#[case(AtomicType::QName, AtomicType::QName, "QNameComparator")]
fn comparator_lookup(#[case] t1: AtomicType, #[case] t2: AtomicType, #[case] expected: &str) {
    let c = comparator_for(t1, t2).expect("comparable pair");
    assert_eq!(format!("{c:?}"), expected);
    let swapped = comparator_for(t2, t1).expect("lookup is symmetric");
    assert_eq!(format!("{swapped:?}"), expected);
}

#[rstest]
#[case(AtomicType::String, AtomicType::Integer)]
#[case(AtomicType::Date, AtomicType::DateTime)]
#[case(AtomicType::Boolean, AtomicType::Double)]
#[case(AtomicType::QName, AtomicType::String)]
fn incomparable_pairs(#[case] t1: AtomicType, #[case] t2: AtomicType) {
    assert!(comparator_for(t1, t2).is_none());
}

#[rstest]
#[case(&QNAME, AtomicOperator::Equal, AtomicType::QName, AtomicType::QName, true)]
#[case(&QNAME, AtomicOperator::LessThan, AtomicType::QName, AtomicType::QName, false)]
#[case(&DURATION, AtomicOperator::GreaterThan, AtomicType::Duration, AtomicType::Duration, false)]
#[case(&DURATION, AtomicOperator::Equal, AtomicType::Duration, AtomicType::DayTimeDuration, true)]
#[case(&DURATION, AtomicOperator::LessThan, AtomicType::DayTimeDuration, AtomicType::DayTimeDuration, true)]
#[case(&DURATION, AtomicOperator::LessThan, AtomicType::DayTimeDuration, AtomicType::YearMonthDuration, false)]
fn operator_support(
    #[case] comparator: &'static dyn AtomicComparator,
    #[case] op: AtomicOperator,
    #[case] t1: AtomicType,
    #[case] t2: AtomicType,
    #[case] expected: bool,
) {
    assert_eq!(supports_operator(comparator, op, t1, t2), expected);
}

#[rstest]
#[case(AtomicOperator::Equal, false)]
#[case(AtomicOperator::NotEqual, true)]
#[case(AtomicOperator::LessThan, false)]
#[case(AtomicOperator::GreaterOrEqual, false)]
fn nan_is_incomparable(#[case] op: AtomicOperator, #[case] expected: bool) {
    let platform = ComparisonPlatform::new(op, ComparisonType::AsValueComparison, true);
    let nan = XdmAtomicValue::Double(f64::NAN);
    assert_eq!(platform.compare(&FLOAT, &nan, &nan, utc()), expected);
    assert_eq!(platform.compare(&FLOAT, &nan, &XdmAtomicValue::Integer(1), utc()), expected);
}

#[test]
fn nan_sorting_variants() {
    let nan = XdmAtomicValue::Double(f64::NAN);
    let one = XdmAtomicValue::Double(1.0);
    assert_eq!(FLOAT.compare(&nan, AtomicOperator::LessThanNaNLeast, &one), ComparisonResult::LessThan);
    assert_eq!(FLOAT.compare(&nan, AtomicOperator::LessThanNaNGreatest, &one), ComparisonResult::GreaterThan);
    assert_eq!(FLOAT.compare(&nan, AtomicOperator::LessThanNaNLeast, &nan), ComparisonResult::Equal);
    assert_eq!(FLOAT.compare(&nan, AtomicOperator::LessThan, &one), ComparisonResult::Incomparable);
}

#[test]
fn case_insensitive_equality() {
    let a = XdmAtomicValue::from("Hello");
    let b = XdmAtomicValue::from("hELLO");
    assert!(CASE_INSENSITIVE_STRING.equals(&a, &b));
    assert!(!STRING.equals(&a, &b));
}

#[rstest]
#[case("2002-02-02T10:00:00+02:00", "2002-02-02T08:00:00Z", AtomicOperator::Equal, true)]
#[case("2002-02-02T10:00:00", "2002-02-02T10:00:00Z", AtomicOperator::Equal, true)]
#[case("2002-02-02T10:00:00", "2002-02-02T09:59:59Z", AtomicOperator::GreaterThan, true)]
fn date_times_compare_as_instants(
    #[case] a: &str,
    #[case] b: &str,
    #[case] op: AtomicOperator,
    #[case] expected: bool,
) {
    let a = cast_from_str(a, AtomicType::DateTime).unwrap();
    let b = cast_from_str(b, AtomicType::DateTime).unwrap();
    let comparator = comparator_for(AtomicType::DateTime, AtomicType::DateTime).unwrap();
    let platform = ComparisonPlatform::new(op, ComparisonType::AsValueComparison, true);
    assert_eq!(platform.compare(comparator, &a, &b, utc()), expected);
}

#[test]
fn implicit_timezone_applies_to_zoneless_values() {
    let local = cast_from_str("2002-02-02T10:00:00", AtomicType::DateTime).unwrap();
    let zoned = cast_from_str("2002-02-02T09:00:00Z", AtomicType::DateTime).unwrap();
    let comparator = comparator_for(AtomicType::DateTime, AtomicType::DateTime).unwrap();
    let platform = ComparisonPlatform::new(AtomicOperator::Equal, ComparisonType::AsValueComparison, true);
    let plus_one = FixedOffset::east_opt(3600).unwrap();
    assert!(platform.compare(comparator, &local, &zoned, plus_one));
    assert!(!platform.compare(comparator, &local, &zoned, utc()));
}

fn numeric() -> impl Strategy<Value = XdmAtomicValue> {
    prop_oneof![
        (-1000i64..1000).prop_map(XdmAtomicValue::Integer),
        (-1000.0f64..1000.0).prop_map(XdmAtomicValue::Double),
        (-1000.0f32..1000.0).prop_map(XdmAtomicValue::Float),
        Just(XdmAtomicValue::Double(f64::NAN)),
    ]
}

fn operator() -> impl Strategy<Value = AtomicOperator> {
    proptest::sample::select(ORDER.to_vec())
}

proptest! {
    #[test]
    fn numeric_comparison_is_symmetric(a in numeric(), b in numeric(), op in operator()) {
        let comparator = comparator_for(a.atomic_type(), b.atomic_type()).unwrap();
        let forward = ComparisonPlatform::new(op, ComparisonType::AsValueComparison, true);
        let backward = ComparisonPlatform::new(op.inverse(), ComparisonType::AsValueComparison, true);
        prop_assert_eq!(
            forward.compare(comparator, &a, &b, utc()),
            backward.compare(comparator, &b, &a, utc())
        );
    }

    #[test]
    fn compare_reverses_with_operands(a in numeric(), b in numeric()) {
        let comparator = comparator_for(a.atomic_type(), b.atomic_type()).unwrap();
        let ab = comparator.compare(&a, AtomicOperator::LessThan, &b);
        let ba = comparator.compare(&b, AtomicOperator::LessThan, &a);
        prop_assert_eq!(ab, ba.reversed());
    }

    #[test]
    fn string_comparison_is_symmetric(a in "[a-z]{0,6}", b in "[a-z]{0,6}", op in operator()) {
        let (a, b) = (XdmAtomicValue::String(a), XdmAtomicValue::String(b));
        let forward = ComparisonPlatform::new(op, ComparisonType::AsGeneralComparison, false);
        let backward = ComparisonPlatform::new(op.inverse(), ComparisonType::AsGeneralComparison, false);
        prop_assert_eq!(
            forward.compare(&STRING, &a, &b, utc()),
            backward.compare(&STRING, &b, &a, utc())
        );
    }
}
