use super::optional_atomic_argument;
use crate::expr::FunctionCall;
use crate::runtime::{DynamicContext, Error, ErrorCode, ExprKey, ReportContext};
use crate::types::AtomicType;
use crate::xdm::temporal::combine;
use crate::xdm::{XdmAtomicValue, XdmItem};

/// `fn:dateTime($date, $time)`.
///
/// The result carries the timezone of whichever argument has one. Two
/// different timezones are `FORG0008`.
pub(crate) fn date_time(call: &FunctionCall, ctx: &DynamicContext) -> Result<Option<XdmItem>, Error> {
    let key = ExprKey::of(call);
    let Some(date_value) = optional_atomic_argument(call, 0, Some(AtomicType::Date), ctx)? else {
        return Ok(None);
    };
    let Some(time_value) = optional_atomic_argument(call, 1, Some(AtomicType::Time), ctx)? else {
        return Ok(None);
    };
    let (XdmAtomicValue::Date { date, tz: date_tz }, XdmAtomicValue::Time { time, tz: time_tz }) =
        (&date_value, &time_value)
    else {
        return Err(ctx.error(
            format!(
                "fn:dateTime() requires xs:date and xs:time, got {} and {}",
                date_value.atomic_type(),
                time_value.atomic_type()
            ),
            ErrorCode::XPTY0004,
            key,
        ));
    };
    let tz = match (date_tz, time_tz) {
        (Some(a), Some(b)) if a != b => {
            return Err(ctx.error(
                format!(
                    "the date {date_value} and the time {time_value} have different timezones; \
                     fn:dateTime() needs both to be the same or only one of them to be specified"
                ),
                ErrorCode::FORG0008,
                key,
            ));
        }
        (a, b) => a.or(*b),
    };
    Ok(Some(XdmItem::Atomic(XdmAtomicValue::DateTime {
        value: combine(*date, *time),
        tz,
    })))
}
