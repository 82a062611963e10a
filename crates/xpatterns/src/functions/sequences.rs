use crate::comparison::comparators::comparator_for;
use crate::expr::{Expression, FunctionCall, ItemIter, atomize};
use crate::runtime::{DynamicContext, Error};
use crate::xdm::{XdmAtomicValue, XdmItem};

fn boolean_item(b: bool) -> Result<Option<XdmItem>, Error> {
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::Boolean(b))))
}

pub(crate) fn count(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let mut n: i64 = 0;
    for item in call.operands()[0].evaluate_sequence(ctx) {
        item?;
        n += 1;
    }
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::Integer(n))))
}

pub(crate) fn exists(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let first = call.operands()[0].evaluate_sequence(ctx).next().transpose()?;
    boolean_item(first.is_some())
}

pub(crate) fn empty(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let first = call.operands()[0].evaluate_sequence(ctx).next().transpose()?;
    boolean_item(first.is_none())
}

pub(crate) fn not(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    boolean_item(!call.operands()[0].evaluate_ebv(ctx)?)
}

pub(crate) fn boolean(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    boolean_item(call.operands()[0].evaluate_ebv(ctx)?)
}

/// Two values are duplicates when their comparator says they are equal;
/// `NaN` is a duplicate of `NaN`. Values of mutually incomparable types are
/// all distinct. First occurrences are kept, in order.
fn is_duplicate(seen: &[XdmAtomicValue], value: &XdmAtomicValue, ctx: &DynamicContext) -> bool {
    let tz = ctx.implicit_timezone();
    let fill = |v: &XdmAtomicValue| match v {
        XdmAtomicValue::Date { date, tz: None } => XdmAtomicValue::Date { date: *date, tz: Some(tz) },
        XdmAtomicValue::Time { time, tz: None } => XdmAtomicValue::Time { time: *time, tz: Some(tz) },
        XdmAtomicValue::DateTime { value, tz: None } => XdmAtomicValue::DateTime {
            value: *value,
            tz: Some(tz),
        },
        other => other.clone(),
    };
    let value = fill(value);
    seen.iter().any(|s| {
        if s.is_nan() && value.is_nan() {
            return true;
        }
        comparator_for(s.atomic_type(), value.atomic_type()).is_some_and(|c| c.equals(&fill(s), &value))
    })
}

pub(crate) fn distinct_values<'a>(call: &'a FunctionCall, ctx: &'a DynamicContext) -> ItemIter<'a> {
    let mut seen: Vec<XdmAtomicValue> = Vec::new();
    let values = atomize(call.operands()[0].evaluate_sequence(ctx)).filter_map(move |value| match value {
        Err(e) => Some(Err(e)),
        Ok(value) => {
            let value = match value {
                XdmAtomicValue::UntypedAtomic(s) => XdmAtomicValue::String(s),
                other => other,
            };
            if is_duplicate(&seen, &value, ctx) {
                None
            } else {
                seen.push(value.clone());
                Some(Ok(XdmItem::Atomic(value)))
            }
        }
    });
    Box::new(values)
}
