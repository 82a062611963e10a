mod common;

use common::{RecordingResolver, atomics, call, resolver_ctx, string};
use std::sync::Arc;
use xpatterns::expr::{ExprRef, ExpressionSequence};
use xpatterns::{
    DynamicContextBuilder, ErrorCode, ExpressionId, SourceLocation, StaticContext, StaticContextBuilder,
    XdmAtomicValue, XdmItem, compile,
};

fn uris(items: &[&str]) -> ExprRef {
    ExpressionSequence::new(items.iter().map(|s| string(s)))
}

fn document_uris(result: &[XdmItem]) -> Vec<String> {
    result
        .iter()
        .map(|item| match item {
            XdmItem::Node(node) => node.document_uri().unwrap_or_default(),
            XdmItem::Atomic(a) => panic!("expected a document node, got {a:?}"),
        })
        .collect()
}

#[test]
fn document_is_desugared_into_a_for_clause() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["a", "b"]), string("http://example.com/")]);
    let compiled = compile(document, &mut ctx).unwrap();

    let clause = compiled.expression();
    assert_eq!(clause.id(), ExpressionId::ForClause);
    let (binding, body) = (&clause.operands()[0], &clause.operands()[1]);
    assert_eq!(binding.id(), ExpressionId::DistinctValuesFN);
    assert_eq!(body.id(), ExpressionId::DocFN);
    let resolve = &body.operands()[0];
    assert_eq!(resolve.id(), ExpressionId::ResolveUriFN);
    assert_eq!(resolve.operands()[0].id(), ExpressionId::RangeVariableReference);
    assert_eq!(resolve.operands()[0].variable_slot(), Some(0));
}

#[test]
fn document_without_base_loads_the_variable_directly() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["urn:a", "urn:b"])]);
    let compiled = compile(document, &mut ctx).unwrap();
    let body = &compiled.expression().operands()[1];
    assert_eq!(body.id(), ExpressionId::DocFN);
    assert_eq!(body.operands()[0].id(), ExpressionId::RangeVariableReference);
}

#[test]
fn synthesized_nodes_carry_the_call_location() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["a", "b"]), string("http://example.com/")]);
    let location = SourceLocation::new(Some("style.xsl"), 12, 8);
    ctx.add_location(&document, location.clone());
    let compiled = compile(document, &mut ctx).unwrap();

    let clause = compiled.expression();
    let body = &clause.operands()[1];
    let resolve = &body.operands()[0];
    for node in [clause, &clause.operands()[0], body, resolve, &resolve.operands()[0]] {
        assert_eq!(ctx.location_for(&**node), Some(&location), "{:?}", node.id());
    }
}

#[test]
fn each_distinct_uri_is_loaded_once() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["urn:a", "urn:b", "urn:a"])]);
    let compiled = compile(document, &mut ctx).unwrap();
    let resolver = Arc::new(RecordingResolver::default());
    let result = compiled.evaluate(&resolver_ctx(Arc::clone(&resolver))).unwrap();
    assert_eq!(document_uris(&result), ["urn:a", "urn:b"]);
    assert_eq!(resolver.requests.lock().unwrap().as_slice(), ["urn:a", "urn:b"]);
}

#[test]
fn relative_uris_resolve_against_the_base_argument() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["a", "b/c"]), string("http://example.com/base/")]);
    let compiled = compile(document, &mut ctx).unwrap();
    let resolver = Arc::new(RecordingResolver::default());
    let result = compiled.evaluate(&resolver_ctx(Arc::clone(&resolver))).unwrap();
    assert_eq!(
        document_uris(&result),
        ["http://example.com/base/a", "http://example.com/base/b/c"]
    );
}

#[test]
fn doc_resolves_against_the_static_base_uri() {
    let mut ctx = StaticContextBuilder::new().with_base_uri("http://example.com/docs/").build();
    let doc = call(&mut ctx, "doc", vec![string("thing.xml")]);
    let compiled = compile(doc, &mut ctx).unwrap();
    let resolver = Arc::new(RecordingResolver::default());
    compiled.evaluate(&resolver_ctx(Arc::clone(&resolver))).unwrap();
    assert_eq!(resolver.requests.lock().unwrap().as_slice(), ["http://example.com/docs/thing.xml"]);
}

#[test]
fn unavailable_document_is_an_error() {
    let mut ctx = StaticContext::default();
    let document = call(&mut ctx, "document", vec![uris(&["urn:a", "http://elsewhere.org/x"])]);
    let location = SourceLocation::new(None, 4, 2);
    ctx.add_location(&document, location.clone());
    let compiled = compile(document, &mut ctx).unwrap();
    let err = compiled
        .evaluate(&resolver_ctx(Arc::new(RecordingResolver::default())))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::FODC0002);
    assert!(err.message.contains("http://elsewhere.org/x"), "{}", err.message);
    assert_eq!(err.location, Some(location));
}

#[test]
fn missing_resolver_is_an_error() {
    let mut ctx = StaticContext::default();
    let doc = call(&mut ctx, "doc", vec![string("urn:a")]);
    let compiled = compile(doc, &mut ctx).unwrap();
    let err = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap_err();
    assert_eq!(err.code, ErrorCode::FODC0002);
}

#[test]
fn resolve_uri_needs_a_base() {
    let mut ctx = StaticContext::default();
    let resolve = call(&mut ctx, "resolve-uri", vec![string("relative/path")]);
    let compiled = compile(resolve, &mut ctx).unwrap();
    let err = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap_err();
    assert_eq!(err.code, ErrorCode::FONS0005);
}

#[test]
fn resolve_uri_uses_the_static_base() {
    let mut ctx = StaticContextBuilder::new().with_base_uri("http://example.com/dir/").build();
    let resolve = call(&mut ctx, "resolve-uri", vec![string("../other")]);
    let compiled = compile(resolve, &mut ctx).unwrap();
    let result = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap();
    assert_eq!(atomics(&result), [XdmAtomicValue::AnyUri("http://example.com/other".to_string())]);
}

#[test]
fn absolute_uris_are_returned_unchanged() {
    let mut ctx = StaticContext::default();
    let resolve = call(&mut ctx, "resolve-uri", vec![string("urn:isbn:123"), string("http://example.com/")]);
    let compiled = compile(resolve, &mut ctx).unwrap();
    let result = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap();
    assert_eq!(atomics(&result), [XdmAtomicValue::AnyUri("urn:isbn:123".to_string())]);
}

#[test]
fn malformed_base_is_rejected() {
    let mut ctx = StaticContext::default();
    let resolve = call(&mut ctx, "resolve-uri", vec![string("a"), string("not a base")]);
    let compiled = compile(resolve, &mut ctx).unwrap();
    let err = compiled.evaluate(&DynamicContextBuilder::new().build()).unwrap_err();
    assert_eq!(err.code, ErrorCode::FORG0002);
}
