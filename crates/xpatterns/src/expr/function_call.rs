use super::{
    ExprRef, Expression, ExpressionId, ItemIter, OperandList, Properties, compress_operands, fold_constant,
    rebuild, type_check_operands,
};
use crate::functions::{FunctionSignature, datetime, documents, sequences, strings};
use crate::runtime::{DynamicContext, Error, StaticContext};
use crate::types::SequenceType;
use crate::xdm::XdmItem;
use std::sync::Arc;

/// Call of a built-in function. Behavior is selected by the signature's id.
#[derive(Debug)]
pub struct FunctionCall {
    signature: Arc<FunctionSignature>,
    operands: OperandList,
    /// Static base URI, captured at type-check time.
    base_uri: Option<Arc<str>>,
}

impl FunctionCall {
    pub fn new(signature: Arc<FunctionSignature>, operands: OperandList) -> ExprRef {
        assert!(
            signature.is_arity_valid(operands.len()),
            "{} called with {} arguments",
            signature.name(),
            operands.len()
        );
        Arc::new(FunctionCall {
            signature,
            operands,
            base_uri: None,
        })
    }

    pub fn signature(&self) -> &Arc<FunctionSignature> {
        &self.signature
    }

    pub fn base_uri(&self) -> Option<&str> {
        self.base_uri.as_deref()
    }

    fn with_base_uri(&self, operands: OperandList, base_uri: Option<Arc<str>>) -> ExprRef {
        Arc::new(FunctionCall {
            signature: Arc::clone(&self.signature),
            operands,
            base_uri,
        })
    }
}

impl Expression for FunctionCall {
    fn id(&self) -> ExpressionId {
        self.signature.id()
    }

    fn operands(&self) -> &[ExprRef] {
        &self.operands
    }

    fn static_type(&self) -> SequenceType {
        self.signature.return_type()
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        (0..self.operands.len())
            .map(|i| self.signature.argument_type(i))
            .collect()
    }

    fn properties(&self) -> Properties {
        self.signature.properties()
    }

    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        if self.id() == ExpressionId::DocumentFN {
            return documents::rewrite_document(&self, ctx);
        }
        let ops = type_check_operands(&self.operands, &self.expected_operand_types(), ctx)?;
        let new = self.with_base_uri(ops, ctx.base_uri().cloned());
        ctx.wrap_expression_with(&*self, &new);
        Ok(new)
    }

    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        let ops = compress_operands(&self.operands, ctx)?;
        let new = rebuild(&*self, ops, ctx);
        fold_constant(new, ctx)
    }

    fn evaluate_sequence<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        match self.id() {
            ExpressionId::DistinctValuesFN => sequences::distinct_values(self, ctx),
            _ => Box::new(self.evaluate_singleton(ctx).transpose().into_iter()),
        }
    }

    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        match self.id() {
            ExpressionId::CountFN => sequences::count(self, ctx),
            ExpressionId::ExistsFN => sequences::exists(self, ctx),
            ExpressionId::EmptyFN => sequences::empty(self, ctx),
            ExpressionId::NotFN => sequences::not(self, ctx),
            ExpressionId::BooleanFN => sequences::boolean(self, ctx),
            ExpressionId::DistinctValuesFN => self.evaluate_sequence(ctx).next().transpose(),
            ExpressionId::UpperCaseFN => strings::upper_case(self, ctx),
            ExpressionId::LowerCaseFN => strings::lower_case(self, ctx),
            ExpressionId::DocFN => documents::doc(self, ctx),
            ExpressionId::ResolveUriFN => documents::resolve_uri(self, ctx),
            ExpressionId::DateTimeFN => datetime::date_time(self, ctx),
            ExpressionId::DocumentFN => unreachable!("fn:document is rewritten during type checking"),
            other => unreachable!("no built-in implementation for {other:?}"),
        }
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        self.with_base_uri(operands, self.base_uri.clone())
    }
}
