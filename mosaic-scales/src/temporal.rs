//! Time grains and calendar-aware step arithmetic over epoch-millisecond timestamps.

use crate::error::MosaicScaleError;
use chrono::{DateTime, Datelike, Duration, Months, NaiveDateTime, Timelike};

const SECOND: i64 = 1_000;
const MINUTE: i64 = 60 * SECOND;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// A step made of a calendar part (months) and a fixed part (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GrainStep {
    pub months: u32,
    pub millis: i64,
}

impl GrainStep {
    /// Parse an ISO-8601 duration such as `P1D`, `PT0.5H`, `P0.25Y` or `P1W`
    pub fn parse(token: &str) -> Result<Self, MosaicScaleError> {
        let invalid = || MosaicScaleError::InvalidTimeGrain(token.to_string());
        let body = token.trim().strip_prefix('P').ok_or_else(invalid)?;

        let mut months = 0.0f64;
        let mut millis = 0.0f64;
        let mut in_time = false;
        let mut number = String::new();

        for ch in body.chars() {
            match ch {
                'T' if !in_time && number.is_empty() => in_time = true,
                '0'..='9' | '.' => number.push(ch),
                designator => {
                    let value = number.parse::<f64>().map_err(|_| invalid())?;
                    number.clear();
                    match (in_time, designator) {
                        (false, 'Y') => months += value * 12.0,
                        (false, 'M') => months += value,
                        (false, 'W') => millis += value * WEEK as f64,
                        (false, 'D') => millis += value * DAY as f64,
                        (true, 'H') => millis += value * HOUR as f64,
                        (true, 'M') => millis += value * MINUTE as f64,
                        (true, 'S') => millis += value * SECOND as f64,
                        _ => return Err(invalid()),
                    }
                }
            }
        }

        if !number.is_empty() || months.fract() != 0.0 || (months == 0.0 && millis.round() <= 0.0) {
            return Err(invalid());
        }

        Ok(Self {
            months: months as u32,
            millis: millis.round() as i64,
        })
    }

    pub fn is_calendar(&self) -> bool {
        self.months > 0
    }
}

/// Granularity of the playback control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeGrain {
    /// No truncation, the finest available resolution (one millisecond)
    Raw,
    /// A duration, optionally anchored at a reference instant
    Step {
        step: GrainStep,
        reference: Option<i64>,
    },
}

impl TimeGrain {
    /// Parse a grain token.
    ///
    /// Accepts plain durations (`P1D`), and anchored intervals in either order
    /// (`P1W/1970-01-03T00:00:00Z` or `1969-12-28T00:00:00Z/P1W`). `None`, the empty string
    /// and `raw` select [`TimeGrain::Raw`].
    pub fn parse(token: Option<&str>) -> Result<Self, MosaicScaleError> {
        let token = match token.map(str::trim) {
            None | Some("") => return Ok(TimeGrain::Raw),
            Some(t) if t.eq_ignore_ascii_case("raw") || t.eq_ignore_ascii_case("null") => {
                return Ok(TimeGrain::Raw)
            }
            Some(t) => t,
        };

        if let Some((first, second)) = token.split_once('/') {
            let (reference, duration) = if first.ends_with('Z') {
                (first, second)
            } else {
                (second, first)
            };
            let reference = DateTime::parse_from_rfc3339(reference)
                .map_err(|_| MosaicScaleError::InvalidTimeGrain(token.to_string()))?
                .timestamp_millis();
            return Ok(TimeGrain::Step {
                step: GrainStep::parse(duration)?,
                reference: Some(reference),
            });
        }

        Ok(TimeGrain::Step {
            step: GrainStep::parse(token)?,
            reference: None,
        })
    }

    pub fn is_finest(&self) -> bool {
        matches!(self, TimeGrain::Raw)
    }

    /// Move `ts` by `steps` grain steps (negative steps move backwards)
    pub fn offset(&self, ts: i64, steps: i64) -> Result<i64, MosaicScaleError> {
        match self {
            TimeGrain::Raw => Ok(ts + steps),
            TimeGrain::Step { step, .. } => {
                let mut date = to_naive(ts)?;
                if step.months > 0 {
                    let total = (step.months as i64 * steps.abs()) as u32;
                    date = if steps >= 0 {
                        date.checked_add_months(Months::new(total))
                    } else {
                        date.checked_sub_months(Months::new(total))
                    }
                    .ok_or(MosaicScaleError::TimestampOutOfRange(ts))?;
                }
                date = date
                    .checked_add_signed(Duration::milliseconds(step.millis * steps))
                    .ok_or(MosaicScaleError::TimestampOutOfRange(ts))?;
                Ok(from_naive(date))
            }
        }
    }

    /// The position following `ts`
    pub fn next(&self, ts: i64) -> Result<i64, MosaicScaleError> {
        self.offset(ts, 1)
    }

    /// Length of the step starting at `ts`. Varies for calendar grains
    pub fn step_size(&self, ts: i64) -> Result<i64, MosaicScaleError> {
        Ok(self.next(ts)? - ts)
    }

    /// Largest grain boundary that is `<= ts`
    pub fn floor(&self, ts: i64) -> Result<i64, MosaicScaleError> {
        match self {
            TimeGrain::Raw => Ok(ts),
            TimeGrain::Step {
                step,
                reference: Some(reference),
            } => {
                if !step.is_calendar() {
                    let k = (ts - reference).div_euclid(step.millis);
                    return Ok(reference + k * step.millis);
                }
                let mut current = *reference;
                while current > ts {
                    current = self.offset(current, -1)?;
                }
                loop {
                    let next = self.next(current)?;
                    if next > ts {
                        return Ok(current);
                    }
                    current = next;
                }
            }
            TimeGrain::Step {
                step,
                reference: None,
            } => truncate(ts, step),
        }
    }

    /// Smallest grain boundary that is `>= ts`
    pub fn ceil(&self, ts: i64) -> Result<i64, MosaicScaleError> {
        let floored = self.floor(ts)?;
        if floored == ts {
            Ok(ts)
        } else {
            self.next(floored)
        }
    }
}

/// Truncate to the start of the coarsest unit the step is expressed in
fn truncate(ts: i64, step: &GrainStep) -> Result<i64, MosaicScaleError> {
    let date = to_naive(ts)?;
    let day_start = |d: NaiveDateTime| d.date().and_hms_opt(0, 0, 0);

    let truncated = if step.months > 0 && step.months % 12 == 0 {
        date.with_month(1)
            .and_then(|d| d.with_day(1))
            .and_then(day_start)
    } else if step.months > 0 {
        date.with_day(1).and_then(day_start)
    } else if step.millis % WEEK == 0 {
        let days_from_sunday = date.weekday().num_days_from_sunday() as i64;
        day_start(date).map(|d| d - Duration::days(days_from_sunday))
    } else if step.millis % DAY == 0 {
        day_start(date)
    } else if step.millis % HOUR == 0 {
        date.with_minute(0)
            .and_then(|d| d.with_second(0))
            .and_then(|d| d.with_nanosecond(0))
    } else if step.millis % MINUTE == 0 {
        date.with_second(0).and_then(|d| d.with_nanosecond(0))
    } else if step.millis % SECOND == 0 {
        date.with_nanosecond(0)
    } else {
        Some(date)
    };

    truncated
        .map(from_naive)
        .ok_or(MosaicScaleError::TimestampOutOfRange(ts))
}

fn to_naive(ts: i64) -> Result<NaiveDateTime, MosaicScaleError> {
    DateTime::from_timestamp_millis(ts)
        .map(|d| d.naive_utc())
        .ok_or(MosaicScaleError::TimestampOutOfRange(ts))
}

fn from_naive(date: NaiveDateTime) -> i64 {
    date.and_utc().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn ms(y: i32, m: u32, d: u32, h: u32) -> i64 {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
            .and_utc()
            .timestamp_millis()
    }

    #[rstest]
    #[case("PT1S", 0, SECOND)]
    #[case("PT15M", 0, 15 * MINUTE)]
    #[case("PT0.5H", 0, 30 * MINUTE)]
    #[case("P1D", 0, DAY)]
    #[case("P1W", 0, WEEK)]
    #[case("P1M", 1, 0)]
    #[case("P3M", 3, 0)]
    #[case("P0.25Y", 3, 0)]
    #[case("P1Y", 12, 0)]
    fn test_parse_step(#[case] token: &str, #[case] months: u32, #[case] millis: i64) {
        assert_eq!(GrainStep::parse(token).unwrap(), GrainStep { months, millis });
    }

    #[rstest]
    #[case("1D")]
    #[case("P")]
    #[case("P0D")]
    #[case("PT0.0001S")]
    #[case("P0.5M")]
    #[case("PT1X")]
    fn test_parse_invalid_step(#[case] token: &str) {
        assert!(matches!(
            GrainStep::parse(token),
            Err(MosaicScaleError::InvalidTimeGrain(_))
        ));
    }

    #[test]
    fn test_raw_grain() -> Result<(), MosaicScaleError> {
        for token in [None, Some(""), Some("raw")] {
            assert_eq!(TimeGrain::parse(token)?, TimeGrain::Raw);
        }
        assert!(TimeGrain::Raw.is_finest());
        assert_eq!(TimeGrain::Raw.next(41)?, 42);
        Ok(())
    }

    #[test]
    fn test_month_steps_are_calendar_aware() -> Result<(), MosaicScaleError> {
        let grain = TimeGrain::parse(Some("P1M"))?;
        let jan = ms(2021, 1, 1, 0);
        let feb = grain.next(jan)?;
        assert_eq!(feb, ms(2021, 2, 1, 0));
        assert_eq!(grain.step_size(jan)?, 31 * DAY);
        assert_eq!(grain.step_size(feb)?, 28 * DAY);
        assert_eq!(grain.offset(feb, -1)?, jan);
        Ok(())
    }

    #[test]
    fn test_floor_and_ceil() -> Result<(), MosaicScaleError> {
        let day = TimeGrain::parse(Some("P1D"))?;
        let t = ms(2021, 3, 4, 15);
        assert_eq!(day.floor(t)?, ms(2021, 3, 4, 0));
        assert_eq!(day.ceil(t)?, ms(2021, 3, 5, 0));
        assert_eq!(day.ceil(ms(2021, 3, 4, 0))?, ms(2021, 3, 4, 0));

        let year = TimeGrain::parse(Some("P1Y"))?;
        assert_eq!(year.floor(t)?, ms(2021, 1, 1, 0));

        // 2021-03-04 is a Thursday, the week starts on Sunday 2021-02-28
        let week = TimeGrain::parse(Some("P1W"))?;
        assert_eq!(week.floor(t)?, ms(2021, 2, 28, 0));
        Ok(())
    }

    #[test]
    fn test_anchored_grain() -> Result<(), MosaicScaleError> {
        // Weeks ending on Saturday
        let grain = TimeGrain::parse(Some("P1W/1970-01-03T00:00:00Z"))?;
        assert!(matches!(grain, TimeGrain::Step { reference: Some(_), .. }));
        // 2021-03-04 (Thursday) floors to Saturday 2021-02-27
        assert_eq!(grain.floor(ms(2021, 3, 4, 15))?, ms(2021, 2, 27, 0));

        let reversed = TimeGrain::parse(Some("1970-01-03T00:00:00Z/P1W"))?;
        assert_eq!(reversed, grain);

        let monthly = TimeGrain::parse(Some("P1M/2000-01-15T00:00:00Z"))?;
        assert_eq!(monthly.floor(ms(2000, 3, 20, 0))?, ms(2000, 3, 15, 0));
        assert_eq!(monthly.floor(ms(1999, 12, 1, 0))?, ms(1999, 11, 15, 0));
        Ok(())
    }
}
