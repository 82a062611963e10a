mod common;

use common::{RecordingResolver, boolean, call, int, resolver_ctx, single_bool, string, untyped};
use proptest::prelude::*;
use rstest::rstest;
use std::sync::Arc;
use xpatterns::expr::{
    ExpressionSequence, ForClause, GeneralComparison, RangeVariableReference, empty_sequence, literal,
};
use xpatterns::{
    AtomicOperator, DynamicContextBuilder, ErrorCode, ExprRef, ExpressionId, StaticContext, StaticContextBuilder,
    XdmAtomicValue, compile,
};

fn seq(items: &[i64]) -> ExprRef {
    ExpressionSequence::new(items.iter().map(|i| int(*i)))
}

fn run(expr: ExprRef) -> bool {
    run_in(expr, &mut StaticContext::default())
}

fn run_in(expr: ExprRef, ctx: &mut StaticContext) -> bool {
    let compiled = compile(expr, ctx).expect("compiles");
    single_bool(&compiled.evaluate(&DynamicContextBuilder::new().build()).expect("evaluates"))
}

#[rstest]
#[case(&[1, 2, 3], AtomicOperator::Equal, &[3, 4], true)]
#[case(&[1, 2, 3], AtomicOperator::Equal, &[4, 5], false)]
#[case(&[1, 2], AtomicOperator::NotEqual, &[1], true)]
#[case(&[1], AtomicOperator::NotEqual, &[1], false)]
#[case(&[1, 5], AtomicOperator::GreaterThan, &[4], true)]
#[case(&[1, 2], AtomicOperator::GreaterOrEqual, &[3], false)]
#[case(&[7], AtomicOperator::LessOrEqual, &[7], true)]
fn existential_semantics(
    #[case] left: &[i64],
    #[case] op: AtomicOperator,
    #[case] right: &[i64],
    #[case] expected: bool,
) {
    assert_eq!(run(GeneralComparison::new(seq(left), op, seq(right))), expected);
}

#[test]
fn empty_operand_is_false_at_compile_time() {
    let mut ctx = StaticContext::default();
    let compiled = compile(GeneralComparison::new(empty_sequence(), AtomicOperator::NotEqual, int(1)), &mut ctx).unwrap();
    assert_eq!(compiled.expression().id(), ExpressionId::BooleanValue);
    assert!(!single_bool(&compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap()));
}

#[rstest]
#[case(untyped("10"), int(9), AtomicOperator::GreaterThan, true)]
#[case(untyped("abc"), string("abc"), AtomicOperator::Equal, true)]
#[case(untyped("b"), untyped("a"), AtomicOperator::GreaterThan, true)]
#[case(untyped("true"), boolean(true), AtomicOperator::Equal, true)]
fn untyped_operands_are_promoted(
    #[case] left: ExprRef,
    #[case] right: ExprRef,
    #[case] op: AtomicOperator,
    #[case] expected: bool,
) {
    assert_eq!(run(GeneralComparison::new(left, op, right)), expected);
}

#[test]
fn untyped_cast_failure_is_an_error() {
    let mut ctx = StaticContext::default();
    let resolver = Arc::new(RecordingResolver::default());
    let doc = call(&mut ctx, "doc", vec![string("urn:not-a-number")]);
    let compiled = compile(GeneralComparison::new(doc, AtomicOperator::Equal, int(1)), &mut ctx).unwrap();
    let err = compiled.evaluate(&resolver_ctx(resolver)).unwrap_err();
    assert_eq!(err.code, ErrorCode::FORG0001);
}

#[test]
fn incomparable_items_do_not_match() {
    // the integer never matches the string, the second string does
    let left = ExpressionSequence::new([int(1), string("b")]);
    let right = ExpressionSequence::new([string("a"), string("b")]);
    assert!(run(GeneralComparison::new(left, AtomicOperator::Equal, right)));
}

#[test]
fn static_types_without_comparator_are_rejected() {
    let mut ctx = StaticContext::default();
    let err = compile(GeneralComparison::new(int(1), AtomicOperator::Equal, string("1")), &mut ctx).unwrap_err();
    assert_eq!(err.code, ErrorCode::XPTY0004);
    assert!(err.message.contains("not comparable"), "{}", err.message);
}

#[test]
fn node_operands_compare_through_atomization() {
    let mut ctx = StaticContext::default();
    let resolver = Arc::new(RecordingResolver::default());
    let doc = call(&mut ctx, "doc", vec![string("http://example.com/apple")]);
    let compiled = compile(GeneralComparison::new(doc, AtomicOperator::Equal, string("apple")), &mut ctx).unwrap();
    assert!(compiled.evaluate_ebv(&resolver_ctx(Arc::clone(&resolver))).unwrap());
    assert_eq!(resolver.requests.lock().unwrap().as_slice(), ["http://example.com/apple"]);
}

#[rstest]
#[case(boolean(true), string("x"), AtomicOperator::Equal, true)]
#[case(boolean(false), string(""), AtomicOperator::Equal, true)]
#[case(int(2), string("2.0"), AtomicOperator::Equal, true)]
#[case(string("10"), int(9), AtomicOperator::GreaterThan, true)]
#[case(string("abc"), int(1), AtomicOperator::NotEqual, true)]
fn backwards_compatible_rules(
    #[case] left: ExprRef,
    #[case] right: ExprRef,
    #[case] op: AtomicOperator,
    #[case] expected: bool,
) {
    let mut ctx = StaticContextBuilder::new().with_backwards_compat(true).build();
    assert_eq!(run_in(GeneralComparison::new(left, op, right), &mut ctx), expected);
}

#[test]
fn case_insensitive_rewrite_strips_case_mapping() {
    // for $x in ("Apple", "pear") return for $y in "aPPLE" return upper-case($x) = upper-case($y)
    let mut ctx = StaticContext::default();
    let (x, y) = (ctx.allocate_slot(), ctx.allocate_slot());
    let outer_binding = ExpressionSequence::new([string("Apple"), string("pear")]);
    let inner_binding = string("aPPLE");
    let left = call(&mut ctx, "upper-case", vec![RangeVariableReference::new(Arc::clone(&outer_binding), x)]);
    let right = call(&mut ctx, "upper-case", vec![RangeVariableReference::new(Arc::clone(&inner_binding), y)]);
    let comparison = GeneralComparison::new(left, AtomicOperator::Equal, right);
    let expr = ForClause::new(x, None, outer_binding, ForClause::new(y, None, inner_binding, comparison));

    let compiled = compile(expr, &mut ctx).unwrap();
    let inner = &compiled.expression().operands()[1];
    let rewritten = &inner.operands()[1];
    assert_eq!(rewritten.id(), ExpressionId::GeneralComparison);
    assert!(rewritten.operands().iter().all(|op| op.id() == ExpressionId::RangeVariableReference));

    let result = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap();
    assert_eq!(
        common::atomics(&result),
        [XdmAtomicValue::Boolean(true), XdmAtomicValue::Boolean(false)]
    );
}

proptest! {
    #[test]
    fn general_equality_is_existential(
        left in proptest::collection::vec(0i64..20, 0..6),
        right in proptest::collection::vec(0i64..20, 0..6),
    ) {
        let expected = left.iter().any(|l| right.contains(l));
        let expr = GeneralComparison::new(seq(&left), AtomicOperator::Equal, seq(&right));
        prop_assert_eq!(run(expr), expected);
    }

    #[test]
    fn general_less_than_is_existential(
        left in proptest::collection::vec(-5i64..5, 1..5),
        right in proptest::collection::vec(-5i64..5, 1..5),
    ) {
        let expected = left.iter().any(|l| right.iter().any(|r| l < r));
        let expr = GeneralComparison::new(seq(&left), AtomicOperator::LessThan, seq(&right));
        prop_assert_eq!(run(expr), expected);
    }
}

#[test]
fn double_literal_compares_with_integer() {
    assert!(run(GeneralComparison::new(literal(XdmAtomicValue::Double(1.0)), AtomicOperator::Equal, int(1))));
}
