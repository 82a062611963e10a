use super::{
    ExprRef, Expression, ExpressionId, ItemIter, OperandList, PairContainer, SequenceReceiver,
    compress_operands, empty_sequence, rebuild, type_check_operands,
};
use crate::runtime::{DynamicContext, Error, SlotGuard, StaticContext};
use crate::types::SequenceType;
use crate::xdm::{XdmAtomicValue, XdmItem};
use smallvec::SmallVec;
use std::sync::Arc;

/// `for $x [at $p] in binding return body`.
#[derive(Debug)]
pub struct ForClause {
    pair: PairContainer,
    var_slot: usize,
    position_slot: Option<usize>,
    /// Whether the body can yield more than one item; fixed by `compress`.
    allows_many: bool,
}

impl ForClause {
    pub fn new(var_slot: usize, position_slot: Option<usize>, binding: ExprRef, body: ExprRef) -> ExprRef {
        Arc::new(ForClause {
            pair: PairContainer::new(binding, body),
            var_slot,
            position_slot,
            allows_many: true,
        })
    }

    pub fn var_slot(&self) -> usize {
        self.var_slot
    }

    pub fn position_slot(&self) -> Option<usize> {
        self.position_slot
    }

    pub fn allows_many(&self) -> bool {
        self.allows_many
    }

    fn binding(&self) -> &ExprRef {
        self.pair.operand1()
    }

    fn body(&self) -> &ExprRef {
        self.pair.operand2()
    }

    fn slots(&self) -> SmallVec<[usize; 2]> {
        let mut slots = SmallVec::new();
        slots.push(self.var_slot);
        slots.extend(self.position_slot);
        slots
    }

    fn bind(&self, ctx: &DynamicContext, item: &XdmItem, position: i64) {
        ctx.set_range_variable(self.var_slot, Some(item.clone()));
        if let Some(slot) = self.position_slot {
            ctx.set_range_variable(slot, Some(XdmItem::Atomic(XdmAtomicValue::Integer(position))));
        }
    }

    fn rebuilt(&self, operands: OperandList, allows_many: bool) -> ExprRef {
        Arc::new(ForClause {
            pair: PairContainer::from_list(operands),
            var_slot: self.var_slot,
            position_slot: self.position_slot,
            allows_many,
        })
    }

    fn body_iter<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        if self.allows_many {
            self.body().evaluate_sequence(ctx)
        } else {
            Box::new(self.body().evaluate_singleton(ctx).transpose().into_iter())
        }
    }
}

impl Expression for ForClause {
    fn id(&self) -> ExpressionId {
        ExpressionId::ForClause
    }

    fn operands(&self) -> &[ExprRef] {
        self.pair.operands()
    }

    fn static_type(&self) -> SequenceType {
        let binding = self.binding().static_type();
        let body = self.body().static_type();
        SequenceType::new(body.item_type, binding.cardinality.times(body.cardinality))
    }

    fn expected_operand_types(&self) -> Vec<SequenceType> {
        vec![SequenceType::ITEM_ZERO_OR_MORE, SequenceType::ITEM_ZERO_OR_MORE]
    }

    fn type_check(self: Arc<Self>, ctx: &mut StaticContext, _required: &SequenceType) -> Result<ExprRef, Error> {
        let ops = type_check_operands(self.operands(), &self.expected_operand_types(), ctx)?;
        Ok(rebuild(&*self, ops, ctx))
    }

    fn compress(self: Arc<Self>, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
        let ops = compress_operands(self.operands(), ctx)?;
        if ops[0].static_type().cardinality.is_empty() {
            return Ok(ctx.rewrite(&*self, empty_sequence()));
        }
        // for $x in E return $x
        if self.position_slot.is_none()
            && ops[1].id() == ExpressionId::RangeVariableReference
            && ops[1].variable_slot() == Some(self.var_slot)
        {
            return Ok(ctx.rewrite(&*self, Arc::clone(&ops[0])));
        }
        let allows_many = ops[1].static_type().cardinality.allows_many();
        let new = self.rebuilt(ops, allows_many);
        ctx.wrap_expression_with(&*self, &new);
        Ok(new)
    }

    fn evaluate_sequence<'a>(&'a self, ctx: &'a DynamicContext) -> ItemIter<'a> {
        Box::new(ForIter {
            clause: self,
            ctx,
            binding: self.binding().evaluate_sequence(ctx),
            current: None,
            body: None,
            _guard: ctx.save_slots(&self.slots()),
        })
    }

    fn evaluate_singleton(&self, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
        let _guard = ctx.save_slots(&self.slots());
        for (i, item) in self.binding().evaluate_sequence(ctx).enumerate() {
            let item = item?;
            self.bind(ctx, &item, i as i64 + 1);
            if let Some(result) = self.body().evaluate_singleton(ctx)? {
                return Ok(Some(result));
            }
        }
        Ok(None)
    }

    fn evaluate_to_receiver(&self, ctx: &DynamicContext, receiver: &mut dyn SequenceReceiver) -> Result<(), Error> {
        let _guard = ctx.save_slots(&self.slots());
        for (i, item) in self.binding().evaluate_sequence(ctx).enumerate() {
            let item = item?;
            self.bind(ctx, &item, i as i64 + 1);
            self.body().evaluate_to_receiver(ctx, receiver)?;
        }
        Ok(())
    }

    fn with_operands(&self, operands: OperandList) -> ExprRef {
        self.rebuilt(operands, self.allows_many)
    }
}

/// Lazy iteration over a `for` clause.
///
/// The current binding is reinstalled before every pull from the body, so the
/// variable and position stay in step even when consumers interleave other
/// iterators that use the same slots.
struct ForIter<'a> {
    clause: &'a ForClause,
    ctx: &'a DynamicContext,
    binding: ItemIter<'a>,
    current: Option<(XdmItem, i64)>,
    body: Option<ItemIter<'a>>,
    _guard: SlotGuard<'a>,
}

impl ForIter<'_> {
    fn install(&self) {
        if let Some((item, position)) = &self.current {
            self.clause.bind(self.ctx, item, *position);
        }
    }
}

impl Iterator for ForIter<'_> {
    type Item = Result<XdmItem, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.body.is_some() {
                self.install();
                match self.body.as_mut().and_then(Iterator::next) {
                    Some(item) => return Some(item),
                    None => self.body = None,
                }
            }
            let item = match self.binding.next()? {
                Ok(item) => item,
                Err(e) => return Some(Err(e)),
            };
            let position = self.current.as_ref().map_or(1, |(_, p)| p + 1);
            self.current = Some((item, position));
            self.install();
            self.body = Some(self.clause.body_iter(self.ctx));
        }
    }
}
