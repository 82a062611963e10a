use super::optional_string_argument;
use crate::expr::{ExprRef, Expression, ForClause, FunctionCall, OperandList, RangeVariableReference};
use crate::runtime::{DynamicContext, Error, ErrorCode, ExprKey, ReportContext, StaticContext};
use crate::types::SequenceType;
use crate::xdm::{ExpandedName, XdmAtomicValue, XdmItem};
use smallvec::smallvec;
use std::sync::Arc;
use url::Url;

/// Resolve `uri` against `base` when one is known; absolute URIs and
/// base-less relative references are returned unchanged.
fn resolve_against(base: Option<&str>, uri: &str) -> Result<String, url::ParseError> {
    if Url::parse(uri).is_ok() {
        return Ok(uri.to_string());
    }
    match base {
        Some(base) => Ok(Url::parse(base)?.join(uri)?.to_string()),
        None => Ok(uri.to_string()),
    }
}

/// `fn:doc($uri)`.
pub(crate) fn doc(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let Some(uri) = optional_string_argument(call, 0, ctx)? else {
        return Ok(None);
    };
    let key = ExprKey::of(call);
    let resolved = resolve_against(call.base_uri(), &uri)
        .map_err(|e| ctx.error(format!("{uri} is not a valid URI: {e}"), ErrorCode::FODC0005, key))?;
    let Some(resolver) = ctx.resolver() else {
        return Err(ctx.error(
            format!("no document resolver is configured to retrieve {resolved}"),
            ErrorCode::FODC0002,
            key,
        ));
    };
    match resolver.doc_node(&resolved) {
        Ok(Some(node)) => Ok(Some(XdmItem::Node(node))),
        Ok(None) => Err(ctx.error(
            format!("document {resolved} is not available"),
            ErrorCode::FODC0002,
            key,
        )),
        Err(e) => Err(ctx
            .error(format!("error retrieving {resolved}"), ErrorCode::FODC0002, key)
            .with_source(Some(Arc::new(e) as Arc<dyn std::error::Error + Send + Sync>))),
    }
}

/// `fn:resolve-uri($relative, $base?)`; without `$base` the static base URI
/// is used.
pub(crate) fn resolve_uri(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let Some(relative) = optional_string_argument(call, 0, ctx)? else {
        return Ok(None);
    };
    let key = ExprKey::of(call);
    if Url::parse(&relative).is_ok() {
        return Ok(Some(XdmItem::Atomic(XdmAtomicValue::AnyUri(relative))));
    }
    let base = if call.operands().len() == 2 {
        optional_string_argument(call, 1, ctx)?
    } else {
        call.base_uri().map(str::to_string)
    };
    let Some(base) = base else {
        return Err(ctx.error(
            format!("cannot resolve {relative}: no base URI is defined"),
            ErrorCode::FONS0005,
            key,
        ));
    };
    let resolved = Url::parse(&base)
        .and_then(|b| b.join(&relative))
        .map_err(|e| Error::from(e).with_location(ctx.location_of(key)))?;
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::AnyUri(resolved.to_string()))))
}

/// Rewrite `fn:document($uris, $base?)` into
/// `for $u in distinct-values($uris) return doc(resolve-uri($u, $base))`,
/// or `doc($u)` without a base, and type-check the result. Every synthesized
/// node takes the location of the `fn:document` call.
pub(crate) fn rewrite_document(call: &FunctionCall, ctx: &mut StaticContext) -> Result<ExprRef, Error> {
    let location = ctx.location_for(call).cloned();
    let functions = Arc::clone(ctx.functions());
    let slot = ctx.allocate_slot();

    let uris = Arc::clone(&call.operands()[0]);
    let distinct = functions.create_function_call(
        &ExpandedName::fn_name("distinct-values"),
        smallvec![uris],
        ctx,
        location.clone(),
    )?;
    let variable = RangeVariableReference::new(Arc::clone(&distinct), slot);
    if let Some(location) = &location {
        ctx.add_location(&variable, location.clone());
    }
    let target = match call.operands().get(1) {
        Some(base) => {
            let args: OperandList = smallvec![variable, Arc::clone(base)];
            functions.create_function_call(&ExpandedName::fn_name("resolve-uri"), args, ctx, location.clone())?
        }
        None => variable,
    };
    let load = functions.create_function_call(&ExpandedName::fn_name("doc"), smallvec![target], ctx, location.clone())?;
    let clause = ForClause::new(slot, None, distinct, load);
    if let Some(location) = location {
        ctx.add_location(&clause, location);
    }
    tracing::debug!(slot, with_base = call.operands().len() == 2, "desugared fn:document");
    let clause = ctx.rewrite(call, clause);
    clause.type_check(ctx, &SequenceType::ITEM_ZERO_OR_MORE)
}
