//! Date and time extraction from free text.
//!
//! Numeric dates are read day-first (UK convention). Offsets are byte offsets.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::recognizer::{Recognizer, RecognizerResult};

const MONTHS: &str = "jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?";

static ISO: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("iso date regex"));

static NUMERIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{4}|\d{2})\b").expect("numeric date regex")
});

static DAY_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?(?:\s+of)?\s+({})\.?,?\s+(\d{{4}})\b",
        MONTHS
    ))
    .expect("day month date regex")
});

static MONTH_DAY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b",
        MONTHS
    ))
    .expect("month day date regex")
});

static TRAILING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^,?\s*(?:at\s+)?(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm|a\.m\.|p\.m\.)?")
        .expect("time regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Iso,
    Numeric,
    DayMonthName,
    MonthNameDay,
}

impl DateFormat {
    pub fn confidence(&self) -> f32 {
        match self {
            DateFormat::Iso => 0.95,
            DateFormat::DayMonthName | DateFormat::MonthNameDay => 0.9,
            DateFormat::Numeric => 0.75,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDate {
    pub text: String,
    pub date: NaiveDate,
    pub time: Option<NaiveTime>,
    pub start: usize,
    pub end: usize,
    pub format: DateFormat,
}

impl ExtractedDate {
    pub fn confidence(&self) -> f32 {
        self.format.confidence()
    }
}

/// Find every date in `text`, ordered by position. Overlapping candidates resolve
/// to the earliest-starting, then longest, match; impossible dates are dropped.
pub fn extract_dates(text: &str) -> Vec<ExtractedDate> {
    let mut candidates: Vec<(usize, usize, NaiveDate, DateFormat)> = Vec::new();

    collect(&ISO, text, DateFormat::Iso, &mut candidates, |c| {
        ymd(num(c, 1)?, num(c, 2)?, num(c, 3)?)
    });
    collect(&NUMERIC, text, DateFormat::Numeric, &mut candidates, |c| {
        ymd(year(c.get(3)?.as_str())?, num(c, 2)?, num(c, 1)?)
    });
    collect(&DAY_MONTH, text, DateFormat::DayMonthName, &mut candidates, |c| {
        ymd(num(c, 3)?, month(c.get(2)?.as_str())?, num(c, 1)?)
    });
    collect(&MONTH_DAY, text, DateFormat::MonthNameDay, &mut candidates, |c| {
        ymd(num(c, 3)?, month(c.get(1)?.as_str())?, num(c, 2)?)
    });

    candidates.sort_by(|a, b| a.0.cmp(&b.0).then((b.1 - b.0).cmp(&(a.1 - a.0))));

    let mut dates: Vec<ExtractedDate> = Vec::new();
    for (start, end, date, format) in candidates {
        if dates.last().is_some_and(|d| start < d.end) {
            continue;
        }
        let (time, end) = match trailing_time(&text[end..]) {
            Some((t, len)) => (Some(t), end + len),
            None => (None, end),
        };
        dates.push(ExtractedDate {
            text: text[start..end].to_string(),
            date,
            time,
            start,
            end,
            format,
        });
    }
    dates
}

fn collect<F>(
    regex: &Regex,
    text: &str,
    format: DateFormat,
    out: &mut Vec<(usize, usize, NaiveDate, DateFormat)>,
    parse: F,
) where
    F: Fn(&Captures) -> Option<NaiveDate>,
{
    for caps in regex.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        if let Some(date) = parse(&caps) {
            out.push((m.start(), m.end(), date, format));
        }
    }
}

fn num<T: std::str::FromStr>(caps: &Captures, idx: usize) -> Option<T> {
    caps.get(idx)?.as_str().parse().ok()
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn year(s: &str) -> Option<i32> {
    let y: i32 = s.parse().ok()?;
    match s.len() {
        2 if y < 70 => Some(2000 + y),
        2 => Some(1900 + y),
        _ => Some(y),
    }
}

fn month(s: &str) -> Option<u32> {
    let lower = s.to_ascii_lowercase();
    let m = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(m)
}

/// A time immediately following a date, e.g. "at 10:30" or "2pm". Returns the time
/// and the byte length consumed. A bare number without minutes or am/pm is not a time.
fn trailing_time(rest: &str) -> Option<(NaiveTime, usize)> {
    let caps = TRAILING_TIME.captures(rest)?;
    let whole = caps.get(0)?;
    let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
    let minute: Option<u32> = caps.get(2).and_then(|m| m.as_str().parse().ok());
    let meridiem = caps.get(3).map(|m| m.as_str().to_ascii_lowercase());

    if minute.is_none() && meridiem.is_none() {
        return None;
    }
    let digits_end = caps.get(2).or(caps.get(1))?.end();
    if continues_as_date(&rest[digits_end..]) {
        return None;
    }

    match meridiem.as_deref().map(|m| m.starts_with('p')) {
        Some(true) if hour < 12 => hour += 12,
        Some(false) if hour == 12 => hour = 0,
        _ => {}
    }
    if meridiem.is_some() && caps.get(1)?.as_str().parse::<u32>().ok()? > 12 {
        return None;
    }

    let time = NaiveTime::from_hms_opt(hour, minute.unwrap_or(0), 0)?;
    Some((time, whole.as_str().trim_end().len()))
}

/// True when `rest` carries on with another date component, as in the "14.03" of
/// a following "14.03.2024".
fn continues_as_date(rest: &str) -> bool {
    let mut chars = rest.chars();
    matches!(chars.next(), Some('.' | '/' | '-')) && chars.next().is_some_and(|c| c.is_ascii_digit())
}

/// Exposes date extraction through the recognizer interface under a chosen label
pub struct DateRecognizer {
    entity_type: &'static str,
}

impl DateRecognizer {
    pub fn new(entity_type: &'static str) -> Self {
        Self { entity_type }
    }
}

impl Recognizer for DateRecognizer {
    fn name(&self) -> &str {
        "dates"
    }

    fn supported_entities(&self) -> Vec<&'static str> {
        vec![self.entity_type]
    }

    fn analyze(&self, text: &str) -> Vec<RecognizerResult> {
        extract_dates(text)
            .into_iter()
            .map(|d| RecognizerResult {
                entity_type: self.entity_type,
                start: d.start,
                end: d.end,
                score: d.confidence(),
            })
            .collect()
    }
}
