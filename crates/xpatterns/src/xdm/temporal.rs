//! Lexical parsing and canonical formatting for the temporal and duration types.

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Split a trailing timezone designator (`Z`, `+hh:mm`, `-hh:mm`) off a lexical form.
pub fn split_tz(s: &str) -> Option<(&str, Option<FixedOffset>)> {
    if let Some(body) = s.strip_suffix('Z') {
        return Some((body, FixedOffset::east_opt(0)));
    }
    let bytes = s.as_bytes();
    if bytes.len() >= 6 {
        let at = bytes.len() - 6;
        if matches!(bytes[at], b'+' | b'-') && bytes[at + 3] == b':' {
            let hours: i32 = s[at + 1..at + 3].parse().ok()?;
            let minutes: i32 = s[at + 4..].parse().ok()?;
            if hours > 14 || minutes > 59 || (hours == 14 && minutes != 0) {
                return None;
            }
            let mut secs = hours * 3600 + minutes * 60;
            if bytes[at] == b'-' {
                secs = -secs;
            }
            return Some((&s[..at], Some(FixedOffset::east_opt(secs)?)));
        }
    }
    Some((s, None))
}

pub fn parse_date(s: &str) -> Option<(NaiveDate, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let date = NaiveDate::parse_from_str(body, "%Y-%m-%d").ok()?;
    Some((date, tz))
}

pub fn parse_time(s: &str) -> Option<(NaiveTime, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    // 24:00:00 is a legal lexical form for midnight
    if body == "24:00:00" {
        return Some((NaiveTime::MIN, tz));
    }
    let time = NaiveTime::parse_from_str(body, "%H:%M:%S%.f").ok()?;
    Some((time, tz))
}

pub fn parse_date_time(s: &str) -> Option<(NaiveDateTime, Option<FixedOffset>)> {
    let (body, tz) = split_tz(s.trim())?;
    let value = NaiveDateTime::parse_from_str(body, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some((value, tz))
}

/// Components of a parsed `xs:duration` lexical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDuration {
    pub months: i32,
    pub seconds: i64,
    pub has_year_month: bool,
    pub has_day_time: bool,
}

pub fn parse_duration(s: &str) -> Option<ParsedDuration> {
    let s = s.trim();
    let (negative, rest) = match s.strip_prefix('-') {
        Some(r) => (true, r),
        None => (false, s),
    };
    let rest = rest.strip_prefix('P')?;
    if rest.is_empty() {
        return None;
    }
    let (date_part, time_part) = match rest.split_once('T') {
        Some((_, "")) => return None,
        Some((d, t)) => (d, Some(t)),
        None => (rest, None),
    };

    let mut months: i64 = 0;
    let mut seconds: i64 = 0;
    let mut has_year_month = false;
    let mut has_day_time = false;

    for (designator, digits) in components(date_part, &['Y', 'M', 'D'])? {
        let n: i64 = digits.parse().ok()?;
        match designator {
            'Y' => {
                months = months.checked_add(n.checked_mul(12)?)?;
                has_year_month = true;
            }
            'M' => {
                months = months.checked_add(n)?;
                has_year_month = true;
            }
            _ => {
                seconds = seconds.checked_add(n.checked_mul(86_400)?)?;
                has_day_time = true;
            }
        }
    }
    if let Some(time_part) = time_part {
        for (designator, digits) in components(time_part, &['H', 'M', 'S'])? {
            has_day_time = true;
            let n: i64 = match designator {
                // fractional seconds are truncated
                'S' => {
                    let whole = digits.split('.').next().unwrap_or_default();
                    if whole.is_empty() { 0 } else { whole.parse().ok()? }
                }
                _ => digits.parse().ok()?,
            };
            let factor = match designator {
                'H' => 3600,
                'M' => 60,
                _ => 1,
            };
            seconds = seconds.checked_add(n.checked_mul(factor)?)?;
        }
    }
    if negative {
        months = -months;
        seconds = -seconds;
    }
    Some(ParsedDuration {
        months: i32::try_from(months).ok()?,
        seconds,
        has_year_month,
        has_day_time,
    })
}

/// Split `1Y2M` style runs into `(designator, digits)` pairs, enforcing the
/// designator order given in `allowed`.
fn components<'a>(part: &'a str, allowed: &[char]) -> Option<Vec<(char, &'a str)>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut next_allowed = 0;
    for (i, ch) in part.char_indices() {
        if ch.is_ascii_digit() || ch == '.' {
            continue;
        }
        let pos = allowed.iter().skip(next_allowed).position(|a| *a == ch)? + next_allowed;
        let digits = &part[start..i];
        if digits.is_empty() || (digits.contains('.') && ch != 'S') {
            return None;
        }
        out.push((ch, digits));
        next_allowed = pos + 1;
        start = i + ch.len_utf8();
    }
    if start != part.len() {
        return None;
    }
    Some(out)
}

pub fn format_tz(tz: Option<FixedOffset>) -> String {
    match tz {
        None => String::new(),
        Some(tz) => {
            let secs = tz.local_minus_utc();
            if secs == 0 {
                return "Z".to_string();
            }
            let sign = if secs < 0 { '-' } else { '+' };
            let abs = secs.unsigned_abs();
            format!("{}{:02}:{:02}", sign, abs / 3600, (abs % 3600) / 60)
        }
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    let base = time.format("%H:%M:%S").to_string();
    let nanos = time.nanosecond() % 1_000_000_000;
    if nanos == 0 {
        return base;
    }
    let frac = format!("{nanos:09}");
    format!("{}.{}", base, frac.trim_end_matches('0'))
}

pub fn format_duration(months: i32, seconds: i64) -> String {
    if months == 0 && seconds == 0 {
        return "PT0S".to_string();
    }
    let mut out = String::new();
    if months < 0 || seconds < 0 {
        out.push('-');
    }
    out.push('P');
    let m = months.unsigned_abs();
    let s = seconds.unsigned_abs();
    let (years, months) = (m / 12, m % 12);
    let (days, hours, minutes, secs) = (s / 86_400, (s % 86_400) / 3600, (s % 3600) / 60, s % 60);
    if years > 0 {
        out.push_str(&format!("{years}Y"));
    }
    if months > 0 {
        out.push_str(&format!("{months}M"));
    }
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if hours > 0 || minutes > 0 || secs > 0 {
        out.push('T');
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if secs > 0 {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "INF".to_string() } else { "-INF".to_string() }
    } else if x == x.trunc() && x.abs() < 1e15 {
        format!("{x:.0}")
    } else {
        format!("{x}")
    }
}

/// Build a naive date-time out of a date and a time; the zone travels separately.
pub fn combine(date: NaiveDate, time: NaiveTime) -> NaiveDateTime {
    date.and_time(time)
}
