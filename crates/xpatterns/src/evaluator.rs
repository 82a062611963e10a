use crate::expr::{ExprRef, ItemIter, check_operand};
use crate::runtime::{DynamicContext, DynamicContextBuilder, Error, LocationMap, StaticContext};
use crate::types::SequenceType;
use crate::xdm::{XdmItem, XdmSequence};
use std::sync::Arc;

/// A type-checked and compressed expression tree together with the source
/// locations of its nodes.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    root: ExprRef,
    locations: Arc<LocationMap>,
}

impl CompiledExpression {
    pub fn expression(&self) -> &ExprRef {
        &self.root
    }

    /// Evaluate to a materialized sequence. The strategy follows the static
    /// cardinality: push evaluation when many items are possible, singleton
    /// evaluation otherwise.
    pub fn evaluate(&self, ctx: &DynamicContext) -> Result<XdmSequence, Error> {
        ctx.install_locations(Arc::clone(&self.locations));
        let mut out: XdmSequence = Vec::new();
        if self.root.static_type().cardinality.allows_many() {
            self.root.evaluate_to_receiver(ctx, &mut out)?;
        } else {
            out.extend(self.root.evaluate_singleton(ctx)?);
        }
        Ok(out)
    }

    pub fn evaluate_ebv(&self, ctx: &DynamicContext) -> Result<bool, Error> {
        ctx.install_locations(Arc::clone(&self.locations));
        self.root.evaluate_ebv(ctx)
    }

    /// Lazy evaluation; items are produced as the iterator is pulled.
    pub fn evaluate_stream<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        ctx.install_locations(Arc::clone(&self.locations));
        self.root.evaluate_sequence(ctx)
    }

    /// Evaluate in a default dynamic context with an optional context item.
    pub fn evaluate_on(&self, context_item: impl Into<Option<XdmItem>>) -> Result<XdmSequence, Error> {
        let mut builder = DynamicContextBuilder::new();
        if let Some(item) = context_item.into() {
            builder = builder.with_context_item(item);
        }
        self.evaluate(&builder.build())
    }
}

/// Type-check and compress `expr` with no requirement on its result.
pub fn compile(expr: ExprRef, ctx: &mut StaticContext) -> Result<CompiledExpression, Error> {
    compile_with_type(expr, ctx, &SequenceType::ITEM_ZERO_OR_MORE)
}

/// Type-check `expr` against `required`, then compress it.
pub fn compile_with_type(
    expr: ExprRef,
    ctx: &mut StaticContext,
    required: &SequenceType,
) -> Result<CompiledExpression, Error> {
    let checked = expr.type_check(ctx, required)?;
    check_operand(&checked, required, ctx)?;
    let root = checked.compress(ctx)?;
    tracing::debug!(root = ?root.id(), slots = ctx.slot_count(), "compiled expression");
    Ok(CompiledExpression {
        root,
        locations: ctx.location_snapshot(),
    })
}
