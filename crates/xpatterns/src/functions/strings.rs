use super::optional_string_argument;
use crate::expr::FunctionCall;
use crate::runtime::{DynamicContext, Error};
use crate::xdm::{XdmAtomicValue, XdmItem};

// The empty sequence maps to the zero-length string.

pub(crate) fn upper_case(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let s = optional_string_argument(call, 0, ctx)?.unwrap_or_default();
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::String(s.to_uppercase()))))
}

pub(crate) fn lower_case(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let s = optional_string_argument(call, 0, ctx)?.unwrap_or_default();
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::String(s.to_lowercase()))))
}
