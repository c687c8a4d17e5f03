//! Raw rows → canonical [`BarSequence`].
//!
//! Normalization is a pure function of its inputs:
//! - columns are found by case-insensitive header lookup
//! - only the newest [`MAX_BARS`] rows are considered
//! - rows whose open/high/low/close do not parse as finite numbers are dropped
//! - volume defaults to 0
//! - the label is the raw `date` and `time` text joined by one space
//! - the timestamp is composed from `Y.M.D` and `H:M` in the local time zone

use chrono::{Local, NaiveDate, NaiveDateTime, TimeDelta, TimeZone};

use crate::domain::{BarSequence, PriceBar, MAX_BARS};

/// Column positions resolved from a header row. `None` means the column is absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub date: Option<usize>,
    pub time: Option<usize>,
    pub open: Option<usize>,
    pub high: Option<usize>,
    pub low: Option<usize>,
    pub close: Option<usize>,
    pub volume: Option<usize>,
}

impl ColumnMap {
    /// Resolve columns by case-insensitive name. The first matching column wins.
    pub fn resolve<S: AsRef<str>>(header: &[S]) -> Self {
        let find = |name: &str| {
            header
                .iter()
                .position(|h| h.as_ref().trim().eq_ignore_ascii_case(name))
        };
        Self {
            date: find("date"),
            time: find("time"),
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: find("close"),
            volume: find("volume"),
        }
    }

    /// True when all four price columns are present.
    pub fn has_prices(&self) -> bool {
        self.open.is_some() && self.high.is_some() && self.low.is_some() && self.close.is_some()
    }
}

/// Bar normalizer bound to the time zone used for composing timestamps.
///
/// `Normalizer::new()` uses the machine's local zone. Tests and callers that
/// need reproducible epoch values can pass a fixed zone.
#[derive(Debug, Clone)]
pub struct Normalizer<Tz: TimeZone = Local> {
    tz: Tz,
}

impl Normalizer<Local> {
    pub fn new() -> Self {
        Self { tz: Local }
    }
}

impl Default for Normalizer<Local> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Tz: TimeZone> Normalizer<Tz> {
    pub fn with_timezone(tz: Tz) -> Self {
        Self { tz }
    }

    /// Normalize `rows` using columns resolved from `header`.
    pub fn normalize<S: AsRef<str>>(&self, header: &[S], rows: &[Vec<String>]) -> BarSequence {
        self.normalize_with(&ColumnMap::resolve(header), rows)
    }

    /// Normalize `rows` using an explicit column map.
    pub fn normalize_with(&self, columns: &ColumnMap, rows: &[Vec<String>]) -> BarSequence {
        let tail = &rows[rows.len().saturating_sub(MAX_BARS)..];
        let bars: Vec<PriceBar> = tail
            .iter()
            .filter_map(|row| self.normalize_row(columns, row))
            .collect();
        let dropped = tail.len() - bars.len();
        if dropped > 0 {
            tracing::debug!(dropped, kept = bars.len(), "dropped rows with unparseable prices");
        }
        BarSequence::from_bars(bars)
    }

    /// Convert one row, or `None` if any price cell is not a finite number.
    pub fn normalize_row(&self, columns: &ColumnMap, row: &[String]) -> Option<PriceBar> {
        let open = parse_number(cell(row, columns.open))?;
        let high = parse_number(cell(row, columns.high))?;
        let low = parse_number(cell(row, columns.low))?;
        let close = parse_number(cell(row, columns.close))?;
        let volume = parse_number(cell(row, columns.volume)).unwrap_or(0.0);

        let date = cell(row, columns.date).unwrap_or("");
        let time = cell(row, columns.time).unwrap_or("");
        let (label, timestamp) = if date.is_empty() {
            (String::new(), None)
        } else {
            (format!("{date} {time}"), compose_timestamp(date, time, &self.tz))
        };

        Some(PriceBar {
            label,
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Normalize with the local time zone.
pub fn normalize<S: AsRef<str>>(header: &[S], rows: &[Vec<String>]) -> BarSequence {
    Normalizer::new().normalize(header, rows)
}

fn cell(row: &[String], index: Option<usize>) -> Option<&str> {
    index.and_then(|i| row.get(i)).map(|c| c.trim())
}

fn parse_number(cell: Option<&str>) -> Option<f64> {
    cell?.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integer component of a date/time token; fractions truncate.
fn component(part: Option<&str>) -> Option<i64> {
    let value = part?.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
    Some(value.trunc() as i64)
}

/// Epoch milliseconds of `Y.M.D` + `H:M` in `tz`.
///
/// Missing or non-numeric month/day default to 1 (zero also reads as 1),
/// hour/minute to 0. Out-of-range components roll over into the next unit,
/// so `2024.13.01` is January 2025. A missing year yields `None`.
pub fn compose_timestamp<Tz: TimeZone>(date: &str, time: &str, tz: &Tz) -> Option<i64> {
    let naive = compose_local(date, time)?;
    let resolved = tz
        .from_local_datetime(&naive)
        .earliest()
        // Nonexistent local time (DST gap): move forward like a wall clock.
        .or_else(|| {
            let shifted = naive.checked_add_signed(TimeDelta::hours(1))?;
            tz.from_local_datetime(&shifted).earliest()
        })?;
    Some(resolved.timestamp_millis())
}

fn compose_local(date: &str, time: &str) -> Option<NaiveDateTime> {
    let mut date_parts = date.split('.');
    let year = component(date_parts.next())?;
    let month = component(date_parts.next()).filter(|&m| m != 0).unwrap_or(1);
    let day = component(date_parts.next()).filter(|&d| d != 0).unwrap_or(1);

    let mut time_parts = time.split(':');
    let hour = component(time_parts.next()).unwrap_or(0);
    let minute = component(time_parts.next()).unwrap_or(0);

    let months = year.checked_mul(12)?.checked_add(month.checked_sub(1)?)?;
    let first_of_month = NaiveDate::from_ymd_opt(
        i32::try_from(months.div_euclid(12)).ok()?,
        u32::try_from(months.rem_euclid(12) + 1).ok()?,
        1,
    )?;

    first_of_month
        .and_hms_opt(0, 0, 0)?
        .checked_add_signed(TimeDelta::try_days(day.checked_sub(1)?)?)?
        .checked_add_signed(TimeDelta::try_hours(hour)?)?
        .checked_add_signed(TimeDelta::try_minutes(minute)?)
}
