//! Occurrence sources: the timestamps a trigger could fire at.
//!
//! Two sources exist:
//!
//! - [`CronOccurrences`]: a recurring cron expression, evaluated in an IANA
//!   timezone. Five-field expressions run at second 0; six-field expressions
//!   carry a leading seconds field.
//! - [`DateOccurrences`]: an explicit, finite list of instants.
//!
//! All results are UTC and truncated to whole seconds.

use crate::error::ScheduleError;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use chrono_tz::Tz;
use cron::Schedule;
use rootcause::Report;
use std::str::FromStr;

/// A sequence of occurrences that can be searched in both directions.
pub trait OccurrenceSource: Send + Sync {
    /// First occurrence strictly after `from`.
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// First occurrence at or after `from`.
    fn next_at_or_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// Last occurrence strictly before `from`.
    fn previous_before(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>>;

    /// The source's natural "next" operation.
    ///
    /// Exclusive unless the source says otherwise.
    fn next(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_after(from)
    }

    /// The source's natural "previous" operation.
    fn previous(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.previous_before(from)
    }
}

/// Occurrences of a cron expression.
#[derive(Debug, Clone)]
pub struct CronOccurrences {
    expression: String,
    schedule: Schedule,
    timezone: Tz,
}

impl PartialEq for CronOccurrences {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression && self.timezone == other.timezone
    }
}

impl CronOccurrences {
    /// Parses a cron expression evaluated in `timezone` (UTC when `None`).
    ///
    /// # Errors
    ///
    /// Returns an error if the expression has the wrong number of fields, does
    /// not parse, or the timezone is not a known IANA name.
    pub fn parse(expression: &str, timezone: Option<&str>) -> Result<Self, Report<ScheduleError>> {
        Ok(Self::try_parse(expression, timezone)?)
    }

    pub(crate) fn try_parse(expression: &str, timezone: Option<&str>) -> Result<Self, ScheduleError> {
        let timezone = match timezone {
            Some(name) => Tz::from_str(name).map_err(|_| ScheduleError::InvalidTimezone {
                timezone: name.to_string(),
            })?,
            None => Tz::UTC,
        };

        let normalized = normalize(expression)?;
        let schedule =
            Schedule::from_str(&normalized).map_err(|e| ScheduleError::InvalidCronExpression {
                expression: expression.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            expression: expression.to_string(),
            schedule,
            timezone,
        })
    }

    /// The expression as written in the definition.
    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The timezone the expression is evaluated in.
    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }
}

impl OccurrenceSource for CronOccurrences {
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = from.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .map(|d| d.with_timezone(&Utc).trunc_subsecs(0))
            .find(|d| *d > from)
    }

    fn next_at_or_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = (from - Duration::seconds(1)).with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .map(|d| d.with_timezone(&Utc).trunc_subsecs(0))
            .find(|d| *d >= from)
    }

    fn previous_before(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = from.with_timezone(&self.timezone);
        self.schedule
            .after(&local)
            .rev()
            .map(|d| d.with_timezone(&Utc).trunc_subsecs(0))
            .find(|d| *d < from)
    }
}

/// Turns a 5- or 6-field expression (or a nickname) into the seconds-first
/// form the `cron` crate parses, translating numeric days of week.
fn normalize(expression: &str) -> Result<String, ScheduleError> {
    let trimmed = expression.trim();
    let expanded = match trimmed.to_ascii_lowercase().as_str() {
        "@yearly" | "@annually" => "0 0 0 1 1 *",
        "@monthly" => "0 0 0 1 * *",
        "@weekly" => "0 0 0 * * Sun",
        "@daily" | "@midnight" => "0 0 0 * * *",
        "@hourly" => "0 0 * * * *",
        _ => trimmed,
    };

    let invalid = |reason: String| ScheduleError::InvalidCronExpression {
        expression: expression.to_string(),
        reason,
    };

    let mut fields: Vec<String> = expanded.split_whitespace().map(str::to_string).collect();
    match fields.len() {
        5 => fields.insert(0, "0".to_string()),
        6 => {}
        n => return Err(invalid(format!("expected 5 or 6 fields, got {n}"))),
    }

    fields[5] = translate_day_of_week(&fields[5]).map_err(invalid)?;
    Ok(fields.join(" "))
}

/// Rewrites numeric day-of-week items (0-7, Sunday as 0 or 7) as explicit
/// lists in the `cron` crate's numbering (1-7, Sunday as 1).
///
/// Named days and `*`/`?` are left alone.
fn translate_day_of_week(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut items = Vec::new();
    for item in field.split(',') {
        let numeric = item
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '-' | '/' | '*'));
        if !numeric {
            items.push(item.to_string());
            continue;
        }

        let mut days: Vec<u32> = expand_day_item(item)?
            .into_iter()
            .map(|day| day % 7 + 1)
            .collect();
        days.sort_unstable();
        days.dedup();
        items.extend(days.into_iter().map(|d| d.to_string()));
    }

    Ok(items.join(","))
}

fn expand_day_item(item: &str) -> Result<Vec<u32>, String> {
    let parse = |s: &str| -> Result<u32, String> {
        let day: u32 = s
            .parse()
            .map_err(|_| format!("invalid day of week '{s}'"))?;
        if day > 7 {
            return Err(format!("day of week {day} is out of range 0-7"));
        }
        Ok(day)
    };

    let (base, step) = match item.split_once('/') {
        Some((base, step)) => {
            let step: u32 = step
                .parse()
                .map_err(|_| format!("invalid step '{step}'"))?;
            if step == 0 {
                return Err("step must be positive".to_string());
            }
            (base, Some(step))
        }
        None => (item, None),
    };

    let (start, end) = match base {
        "*" => (0, 6),
        range if range.contains('-') => {
            let (a, b) = range
                .split_once('-')
                .ok_or_else(|| format!("invalid range '{range}'"))?;
            (parse(a)?, parse(b)?)
        }
        single => {
            let day = parse(single)?;
            if step.is_some() { (day, 7) } else { (day, day) }
        }
    };

    if start > end {
        return Err(format!("invalid range {start}-{end}"));
    }

    Ok((start..=end).step_by(step.unwrap_or(1) as usize).collect())
}

/// An explicit list of occurrences.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateOccurrences {
    dates: Vec<DateTime<Utc>>,
}

impl DateOccurrences {
    /// Builds a source from instants, sorting and de-duplicating them.
    ///
    /// # Errors
    ///
    /// Returns an error if no date is given.
    pub fn new(
        dates: impl IntoIterator<Item = DateTime<Utc>>,
    ) -> Result<Self, Report<ScheduleError>> {
        Ok(Self::from_dates(dates)?)
    }

    fn from_dates(dates: impl IntoIterator<Item = DateTime<Utc>>) -> Result<Self, ScheduleError> {
        let mut dates: Vec<DateTime<Utc>> = dates.into_iter().map(|d| d.trunc_subsecs(0)).collect();
        if dates.is_empty() {
            return Err(ScheduleError::EmptyDateList);
        }
        dates.sort_unstable();
        dates.dedup();
        Ok(Self { dates })
    }

    /// Parses RFC 3339 timestamps (any offset) into a source.
    ///
    /// # Errors
    ///
    /// Returns an error for the first value that does not parse, or if the
    /// list is empty.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, Report<ScheduleError>> {
        Ok(Self::try_parse(values)?)
    }

    pub(crate) fn try_parse<S: AsRef<str>>(values: &[S]) -> Result<Self, ScheduleError> {
        let dates = values
            .iter()
            .map(|value| {
                let value = value.as_ref();
                DateTime::parse_from_rfc3339(value.trim())
                    .map(|d| d.with_timezone(&Utc))
                    .map_err(|e| ScheduleError::InvalidDate {
                        value: value.to_string(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_dates(dates)
    }

    /// The normalized dates in ascending order.
    #[must_use]
    pub fn dates(&self) -> &[DateTime<Utc>] {
        &self.dates
    }
}

impl OccurrenceSource for DateOccurrences {
    fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let idx = self.dates.partition_point(|d| *d <= from);
        self.dates.get(idx).copied()
    }

    fn next_at_or_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let idx = self.dates.partition_point(|d| *d < from);
        self.dates.get(idx).copied()
    }

    fn previous_before(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let idx = self.dates.partition_point(|d| *d < from);
        idx.checked_sub(1).and_then(|i| self.dates.get(i).copied())
    }

    fn next(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.next_at_or_after(from)
    }
}
