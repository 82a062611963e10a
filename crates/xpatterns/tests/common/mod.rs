#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use xpatterns::expr::{ExprRef, literal};
use xpatterns::runtime::DocumentResolver;
use xpatterns::xdm::{NodeHandle, NodeKind, XdmAtomicValue, XdmNode};
use xpatterns::xdm::ExpandedName;
use xpatterns::{DynamicContext, DynamicContextBuilder, Error, FunctionFactory, StaticContext, XdmItem, XdmSequence};

/// Document node with fixed text content; atomizes to `xs:untypedAtomic`
/// unless a typed value is given.
#[derive(Debug)]
pub struct TextDoc {
    pub uri: String,
    pub text: String,
    pub typed: Option<XdmAtomicValue>,
}

impl XdmNode for TextDoc {
    fn kind(&self) -> NodeKind {
        NodeKind::Document
    }

    fn string_value(&self) -> String {
        self.text.clone()
    }

    fn typed_value(&self) -> Vec<XdmAtomicValue> {
        match &self.typed {
            Some(v) => vec![v.clone()],
            None => vec![XdmAtomicValue::UntypedAtomic(self.text.clone())],
        }
    }

    fn document_uri(&self) -> Option<String> {
        Some(self.uri.clone())
    }
}

/// Resolver serving every URI that starts with `http://example.com/` or
/// `urn:`, recording each request.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    pub requests: Mutex<Vec<String>>,
    pub typed: Option<XdmAtomicValue>,
}

impl DocumentResolver for RecordingResolver {
    fn doc_node(&self, uri: &str) -> Result<Option<NodeHandle>, Error> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(uri.to_string());
        }
        if !(uri.starts_with("http://example.com/") || uri.starts_with("urn:")) {
            return Ok(None);
        }
        let text = uri.rsplit('/').next().unwrap_or(uri).to_string();
        Ok(Some(Arc::new(TextDoc {
            uri: uri.to_string(),
            text,
            typed: self.typed.clone(),
        })))
    }
}

pub fn resolver_ctx(resolver: Arc<RecordingResolver>) -> DynamicContext {
    DynamicContextBuilder::new()
        .with_document_resolver(resolver)
        .build()
}

pub fn int(i: i64) -> ExprRef {
    literal(i)
}

pub fn string(s: &str) -> ExprRef {
    literal(s)
}

pub fn untyped(s: &str) -> ExprRef {
    literal(XdmAtomicValue::UntypedAtomic(s.to_string()))
}

pub fn boolean(b: bool) -> ExprRef {
    literal(b)
}

pub fn atomics(seq: &XdmSequence) -> Vec<XdmAtomicValue> {
    seq.iter()
        .map(|item| match item {
            XdmItem::Atomic(a) => a.clone(),
            XdmItem::Node(n) => panic!("unexpected node {n:?}"),
        })
        .collect()
}

pub fn single_bool(seq: &XdmSequence) -> bool {
    match seq.as_slice() {
        [XdmItem::Atomic(XdmAtomicValue::Boolean(b))] => *b,
        other => panic!("expected a single boolean, got {other:?}"),
    }
}

/// Build `fn:local(args...)` through the context's function factory.
pub fn call(ctx: &mut StaticContext, local: &str, args: Vec<ExprRef>) -> ExprRef {
    let functions = Arc::clone(ctx.functions());
    functions
        .create_function_call(&ExpandedName::fn_name(local), args.into_iter().collect(), ctx, None)
        .expect("built-in function")
}
