//! Static checks on the text of a workflow file.
//!
//! These are line-pattern scans, not a Python parser: the gate only needs the
//! literal assigned to `schedule_interval` and whether any `start_date` line
//! derives its value from the current time.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use cron::Schedule;
use regex::Regex;

use crate::{GateError, GatePolicy, ReferenceInstant};

/// Attribute holding the workflow's schedule.
pub const INTERVAL_ATTRIBUTE: &str = "schedule_interval";

/// Attribute holding the workflow's first logical date.
pub const START_DATE_ATTRIBUTE: &str = "start_date";

/// Schedule macros rejected outright.
pub const DISALLOWED_MACROS: &[&str] = &["@once", "@yearly"];

/// Schedule macros accepted without further checks.
pub const ALLOWED_MACROS: &[&str] = &["@hourly", "@daily", "@weekly", "@monthly"];

/// Alternative spellings of the macros above.
const MACRO_ALIASES: &[(&str, &str)] = &[("@annually", "@yearly"), ("@midnight", "@daily")];

static INTERVAL_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"schedule_interval\s*=\s*['"]([^'"|]*)"#).expect("interval pattern is valid")
});

static CURRENT_INSTANT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:datetime\.(?:now|utcnow|today)|pendulum\.now|timezone\.utcnow)\s*\(")
        .expect("current-instant pattern is valid")
});

/// What the schedule-interval check established about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntervalCheck {
    /// The file never assigns `schedule_interval`; the scheduler default applies.
    Absent,
    /// One of the [`ALLOWED_MACROS`].
    Macro(String),
    /// A cron expression whose first firing is far enough from the reference.
    Cron {
        expression: String,
        next_fire: NaiveDateTime,
        gap: Duration,
    },
}

/// Locates the first `schedule_interval` line and validates its literal.
pub fn check_schedule_interval(
    source: &str,
    reference: ReferenceInstant,
    policy: &GatePolicy,
) -> Result<IntervalCheck, GateError> {
    let Some(line) = source
        .lines()
        .map(str::trim)
        .find(|line| line.contains(INTERVAL_ATTRIBUTE))
    else {
        return Ok(IntervalCheck::Absent);
    };

    let interval = INTERVAL_LITERAL
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or_else(|| GateError::IntervalNotLiteral {
            line: line.to_string(),
        })?;

    evaluate_interval(interval, reference, policy)
}

/// Applies the interval rules to an extracted literal.
pub fn evaluate_interval(
    interval: &str,
    reference: ReferenceInstant,
    policy: &GatePolicy,
) -> Result<IntervalCheck, GateError> {
    let canonical = MACRO_ALIASES
        .iter()
        .find(|(alias, _)| *alias == interval)
        .map_or(interval, |(_, name)| *name);
    if DISALLOWED_MACROS.contains(&canonical) {
        return Err(GateError::DisallowedInterval {
            interval: interval.to_string(),
        });
    }
    if ALLOWED_MACROS.contains(&canonical) {
        return Ok(IntervalCheck::Macro(interval.to_string()));
    }

    let unparseable = |reason: String| GateError::UnparseableInterval {
        interval: interval.to_string(),
        reason,
    };

    let base = reference.as_naive().and_utc();
    let mut next_fire = None;
    for expanded in to_seconds_schedules(interval).map_err(unparseable)? {
        let schedule = Schedule::from_str(&expanded).map_err(|e| unparseable(e.to_string()))?;
        if let Some(fire) = schedule.after(&base).next() {
            next_fire = Some(next_fire.map_or(fire, |earliest: DateTime<Utc>| earliest.min(fire)));
        }
    }
    let next_fire = next_fire.ok_or_else(|| unparseable("expression never fires".to_string()))?;

    let gap = next_fire - base;
    if gap <= policy.rejected_gap() {
        return Err(GateError::CadenceTooShort {
            interval: interval.to_string(),
            gap_minutes: gap.num_minutes(),
            minimum_minutes: policy.minimum_cadence_minutes,
        });
    }

    Ok(IntervalCheck::Cron {
        expression: interval.to_string(),
        next_fire: next_fire.naive_utc(),
        gap,
    })
}

/// Converts a five-field crontab expression into the seconds-first form the
/// `cron` crate parses.
///
/// Crontab fires when either the day of month or the day of week matches if
/// both are restricted; the `cron` crate requires both. Such expressions
/// become two schedules, one per day field, and the earlier firing wins.
fn to_seconds_schedules(expression: &str) -> Result<Vec<String>, String> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let [minute, hour, day_of_month, month, day_of_week] = fields.as_slice() else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };
    let day_of_week = weekday_names(day_of_week)?;
    let seconds_form = |dom: &str, dow: &str| format!("0 {minute} {hour} {dom} {month} {dow}");

    if is_unrestricted(day_of_month) || is_unrestricted(&day_of_week) {
        return Ok(vec![seconds_form(day_of_month, &day_of_week)]);
    }
    Ok(vec![
        seconds_form(day_of_month, "*"),
        seconds_form("*", &day_of_week),
    ])
}

fn is_unrestricted(field: &str) -> bool {
    field == "*" || field == "?"
}

/// Crontab numbers weekdays `0..=7` from Sunday, with both `0` and `7`
/// meaning Sunday; the `cron` crate numbers them `1..=7`. Numeric weekdays
/// are therefore rewritten as names, and numeric ranges are listed day by
/// day so a range ending on `7` stays in order.
fn weekday_names(field: &str) -> Result<String, String> {
    const NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let is_number = |value: &str| !value.is_empty() && value.chars().all(|c| c.is_ascii_digit());
    let number = |value: &str| -> Result<usize, String> {
        value
            .parse::<usize>()
            .ok()
            .filter(|n| *n < NAMES.len())
            .ok_or_else(|| format!("day of week '{value}' is out of range"))
    };

    let mut items: Vec<String> = Vec::new();
    for item in field.split(',') {
        // The step after '/' is a count, not a weekday.
        let (range, step) = match item.split_once('/') {
            Some((range, step)) => (range, Some(step)),
            None => (item, None),
        };

        match range.split_once('-') {
            Some((first, last)) if is_number(first) && is_number(last) => {
                let (first, last) = (number(first)?, number(last)?);
                if first > last {
                    return Err(format!("day of week range '{range}' is reversed"));
                }
                let step = match step {
                    Some(step) => step
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| format!("day of week step '{step}' is invalid"))?,
                    None => 1,
                };
                for day in (first..=last).step_by(step) {
                    let name = NAMES[day].to_string();
                    if !items.contains(&name) {
                        items.push(name);
                    }
                }
            }
            _ => {
                let renamed = range
                    .split('-')
                    .map(|value| {
                        if is_number(value) {
                            number(value).map(|n| NAMES[n].to_string())
                        } else {
                            Ok(value.to_string())
                        }
                    })
                    .collect::<Result<Vec<_>, _>>()?
                    .join("-");
                items.push(match step {
                    Some(step) => format!("{renamed}/{step}"),
                    None => renamed,
                });
            }
        }
    }
    Ok(items.join(","))
}

/// Rejects files whose `start_date` lines call a current-time function.
///
/// Returns the inspected `start_date` lines for the transcript.
pub fn check_start_date(source: &str) -> Result<Vec<String>, GateError> {
    let lines: Vec<String> = source
        .lines()
        .map(str::trim)
        .filter(|line| line.contains(START_DATE_ATTRIBUTE))
        .map(str::to_string)
        .collect();

    let dynamic: Vec<String> = lines
        .iter()
        .filter(|line| CURRENT_INSTANT.is_match(line))
        .cloned()
        .collect();

    if !dynamic.is_empty() {
        return Err(GateError::DynamicStartDate { lines: dynamic });
    }
    Ok(lines)
}
