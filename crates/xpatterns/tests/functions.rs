mod common;

use common::{RecordingResolver, atomics, call, int, resolver_ctx, single_bool, string, untyped};
use rstest::rstest;
use std::sync::Arc;
use xpatterns::expr::{ExprRef, ExpressionSequence, Properties, empty_sequence, literal};
use xpatterns::functions::{FunctionFactoryCollection, UNLIMITED_ARITY};
use xpatterns::{
    BuiltinFunctionFactory, DynamicContextBuilder, ErrorCode, ExpandedName, ExpressionId, FunctionFactory,
    FunctionSignature, SequenceType, SourceLocation, StaticContext, StaticContextBuilder, XdmAtomicValue,
    XdmItem, compile,
};

fn concat_like() -> FunctionSignature {
    FunctionSignature::new(
        ExpandedName::fn_name("concat"),
        2,
        UNLIMITED_ARITY,
        SequenceType::STRING,
        ExpressionId::StringValue,
    )
    .with_argument("arg", SequenceType::ATOMIC_ZERO_OR_ONE)
}

fn evaluate(ctx: &mut StaticContext, expr: ExprRef) -> Vec<XdmItem> {
    compile(expr, ctx)
        .expect("compiles")
        .evaluate(&DynamicContextBuilder::new().build())
        .expect("evaluates")
}

#[rstest]
#[case(1, false)]
#[case(2, true)]
#[case(3, true)]
#[case(250, true)]
fn variadic_arity(#[case] arity: usize, #[case] valid: bool) {
    assert_eq!(concat_like().is_arity_valid(arity), valid);
}

#[test]
fn bounded_arity() {
    let factory = BuiltinFunctionFactory::shared();
    let resolve = factory
        .retrieve_function_signature(&ExpandedName::fn_name("resolve-uri"), 2)
        .unwrap();
    assert!(!resolve.is_arity_valid(0));
    assert!(resolve.is_arity_valid(1));
    assert!(resolve.is_arity_valid(2));
    assert!(!resolve.is_arity_valid(3));
}

#[test]
#[should_panic(expected = "above max arity")]
fn inverted_arity_range_is_rejected() {
    let _ = FunctionSignature::new(ExpandedName::fn_name("f"), 3, Some(1), SequenceType::STRING, ExpressionId::CountFN);
}

#[test]
fn display_names() {
    assert_eq!(concat_like().display_name(), "fn:concat($arg as xs:anyAtomicType?, ...) as xs:string");
    let factory = BuiltinFunctionFactory::shared();
    let count = factory.retrieve_function_signature(&ExpandedName::fn_name("count"), 1).unwrap();
    assert_eq!(count.to_string(), "fn:count($arg as item()*) as xs:integer");
    let bare = FunctionSignature::new(ExpandedName::fn_name("f"), 0, UNLIMITED_ARITY, SequenceType::STRING, ExpressionId::StringValue);
    assert_eq!(bare.display_name(), "fn:f(, ...) as xs:string");
}

#[test]
fn argument_types_repeat_the_last_parameter() {
    let sig = concat_like().with_argument("more", SequenceType::STRING);
    assert_eq!(sig.argument_type(0), SequenceType::ATOMIC_ZERO_OR_ONE);
    assert_eq!(sig.argument_type(1), SequenceType::STRING);
    assert_eq!(sig.argument_type(9), SequenceType::STRING);
}

#[rstest]
#[case(2, Some(3), 3, Some(5), true)]
#[case(2, Some(3), 4, None, false)]
#[case(1, None, 7, Some(7), true)]
#[case(0, Some(0), 1, Some(1), false)]
fn signature_equality_needs_overlapping_arities(
    #[case] min_a: usize,
    #[case] max_a: Option<usize>,
    #[case] min_b: usize,
    #[case] max_b: Option<usize>,
    #[case] expected: bool,
) {
    let sig = |min, max| {
        FunctionSignature::new(ExpandedName::fn_name("f"), min, max, SequenceType::STRING, ExpressionId::StringValue)
    };
    let (a, b) = (sig(min_a, max_a), sig(min_b, max_b));
    assert_eq!(a.is_equal_to(&b), expected);
    assert_eq!(b.is_equal_to(&a), expected);
    let other = FunctionSignature::new(ExpandedName::fn_name("g"), min_a, max_a, SequenceType::STRING, ExpressionId::StringValue);
    assert!(!a.is_equal_to(&other));
}

#[test]
fn unknown_function_is_reported() {
    let mut ctx = StaticContext::default();
    let functions = Arc::clone(ctx.functions());
    let location = SourceLocation::new(Some("query.xq"), 2, 5);
    let err = functions
        .create_function_call(&ExpandedName::fn_name("nope"), [int(1)].into_iter().collect(), &mut ctx, Some(location.clone()))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0017);
    assert_eq!(err.message, "unknown function: fn:nope#1");
    assert_eq!(err.location, Some(location));
}

#[test]
fn wrong_arity_lists_the_available_ones() {
    let mut ctx = StaticContext::default();
    let functions = Arc::clone(ctx.functions());
    let args = [string("a"), string("b"), string("c")].into_iter().collect();
    let err = functions
        .create_function_call(&ExpandedName::fn_name("resolve-uri"), args, &mut ctx, None)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0017);
    assert_eq!(
        err.message,
        "function fn:resolve-uri() cannot be called with three arguments; available arities: 1, 2"
    );
    assert!(!functions.is_available(&ExpandedName::fn_name("count"), 0));
    assert!(functions.is_available(&ExpandedName::fn_name("count"), 1));
}

#[derive(Debug)]
struct Overrides(Vec<Arc<FunctionSignature>>);

impl FunctionFactory for Overrides {
    fn signatures(&self) -> Vec<Arc<FunctionSignature>> {
        self.0.clone()
    }
}

#[test]
fn first_factory_owns_a_name() {
    let count = FunctionSignature::new(ExpandedName::fn_name("count"), 2, Some(3), SequenceType::INTEGER, ExpressionId::CountFN);
    let collection = FunctionFactoryCollection::new()
        .with_factory(Arc::new(Overrides(vec![Arc::new(count), Arc::new(concat_like())])))
        .with_factory(BuiltinFunctionFactory::shared());

    let name = ExpandedName::fn_name("count");
    assert!(collection.retrieve_function_signature(&name, 1).is_none());
    assert_eq!(collection.retrieve_function_signature(&name, 2).unwrap().max_arguments(), Some(3));
    assert!(collection.is_available(&ExpandedName::fn_name("exists"), 1));
    assert!(collection.is_available(&ExpandedName::fn_name("concat"), 5));

    let functions: Arc<dyn FunctionFactory> = Arc::new(collection);
    let mut ctx = StaticContextBuilder::new().with_functions(Arc::clone(&functions)).build();
    let err = functions
        .create_function_call(&name, [int(1)].into_iter().collect(), &mut ctx, None)
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::XPST0017);
    assert!(err.message.ends_with("available arities: 2, 3"), "{}", err.message);
    let err = functions
        .create_function_call(&ExpandedName::fn_name("missing"), Default::default(), &mut ctx, None)
        .unwrap_err();
    assert_eq!(err.message, "unknown function: fn:missing#0");
}

#[test]
fn call_nodes_take_the_signature_properties() {
    let mut ctx = StaticContext::default();
    let doc = call(&mut ctx, "doc", vec![string("urn:a")]);
    assert_eq!(doc.id(), ExpressionId::DocFN);
    assert!(doc.properties().contains(Properties::DISABLE_ELIMINATION));
    let count = call(&mut ctx, "count", vec![doc]);
    assert!(count.deep_properties().contains(Properties::DISABLE_ELIMINATION));
    assert_eq!(count.static_type(), SequenceType::INTEGER);
}

#[test]
fn distinct_values_keeps_first_occurrences() {
    let mut ctx = StaticContext::default();
    let input = ExpressionSequence::new([
        int(1),
        literal(1.0),
        string("a"),
        untyped("a"),
        literal(f64::NAN),
        int(2),
        literal(f64::NAN),
        string("A"),
    ]);
    let expr = call(&mut ctx, "distinct-values", vec![input]);
    let values = atomics(&evaluate(&mut ctx, expr));
    assert_eq!(values.len(), 5, "{values:?}");
    assert_eq!(values[0], XdmAtomicValue::Integer(1));
    assert_eq!(values[1], XdmAtomicValue::from("a"));
    assert!(values[2].is_nan());
    assert_eq!(values[3], XdmAtomicValue::Integer(2));
    assert_eq!(values[4], XdmAtomicValue::from("A"));
}

#[test]
fn distinct_values_atomizes_nodes() {
    let mut ctx = StaticContext::default();
    let docs = ExpressionSequence::new([
        call(&mut ctx, "doc", vec![string("urn:x/same")]),
        call(&mut ctx, "doc", vec![string("urn:y/same")]),
    ]);
    let expr = call(&mut ctx, "distinct-values", vec![docs]);
    let compiled = compile(expr, &mut ctx).unwrap();
    let result = compiled.evaluate(&resolver_ctx(Arc::new(RecordingResolver::default()))).unwrap();
    assert_eq!(atomics(&result), [XdmAtomicValue::from("same")]);
}

#[rstest]
#[case("upper-case", string("Straße"), "STRASSE")]
#[case("upper-case", string("abc"), "ABC")]
#[case("lower-case", string("ÀBC"), "àbc")]
#[case("lower-case", empty_sequence(), "")]
#[case("upper-case", untyped("x"), "X")]
fn case_mapping(#[case] function: &str, #[case] arg: ExprRef, #[case] expected: &str) {
    let mut ctx = StaticContext::default();
    let expr = call(&mut ctx, function, vec![arg]);
    assert_eq!(atomics(&evaluate(&mut ctx, expr)), [XdmAtomicValue::from(expected)]);
}

#[rstest]
#[case("count", vec![int(1), int(2), int(3)], XdmAtomicValue::Integer(3))]
#[case("count", vec![], XdmAtomicValue::Integer(0))]
#[case("exists", vec![], XdmAtomicValue::Boolean(false))]
#[case("exists", vec![int(0)], XdmAtomicValue::Boolean(true))]
#[case("empty", vec![], XdmAtomicValue::Boolean(true))]
#[case("not", vec![string("")], XdmAtomicValue::Boolean(true))]
#[case("not", vec![int(3)], XdmAtomicValue::Boolean(false))]
#[case("boolean", vec![], XdmAtomicValue::Boolean(false))]
#[case("boolean", vec![string("x")], XdmAtomicValue::Boolean(true))]
fn sequence_functions(#[case] function: &str, #[case] items: Vec<ExprRef>, #[case] expected: XdmAtomicValue) {
    let mut ctx = StaticContext::default();
    let expr = call(&mut ctx, function, vec![ExpressionSequence::new(items)]);
    assert_eq!(atomics(&evaluate(&mut ctx, expr)), [expected]);
}

#[test]
fn boolean_of_several_atomics_is_an_error() {
    let mut ctx = StaticContext::default();
    let expr = call(&mut ctx, "boolean", vec![ExpressionSequence::new([int(1), int(2)])]);
    let compiled = compile(expr, &mut ctx).unwrap();
    let err = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap_err();
    assert_eq!(err.code, ErrorCode::FORG0006);
}

#[test]
fn node_sequences_are_true() {
    let mut ctx = StaticContext::default();
    let docs = ExpressionSequence::new([
        call(&mut ctx, "doc", vec![string("urn:a")]),
        call(&mut ctx, "doc", vec![string("urn:b")]),
    ]);
    let expr = call(&mut ctx, "boolean", vec![docs]);
    let compiled = compile(expr, &mut ctx).unwrap();
    assert!(single_bool(&compiled.evaluate(&resolver_ctx(Arc::new(RecordingResolver::default()))).unwrap()));
}
