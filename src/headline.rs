use std::fmt::{Display, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, TimeZone, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;

pub const TITLE_FIELD: usize = 0;
pub const URL_FIELD: usize = 1;
pub const TIMESTAMP_FIELD: usize = 8;

/// Same layout as the classic `current-time-string`, e.g. `Sun Sep  9 01:46:40 2001`.
pub const DEFAULT_TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("record has {len} fields, expected at least {}", TIMESTAMP_FIELD + 1)]
    TooShort { len: usize },
    #[error("field {position} must be a string")]
    NotAString { position: usize },
    #[error("field {} is not a recognised time value", TIMESTAMP_FIELD)]
    BadTimestamp,
}

/// One captured story. Only the title, url and capture time are
/// interpreted; every field is kept in its original position.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineRecord {
    title: String,
    url: String,
    timestamp: DateTime<Utc>,
    fields: Vec<Value>,
}

impl HeadlineRecord {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// `<title> <URL:<url>>`
    pub fn citation(&self) -> String {
        format!("{} {}", self.title, self.url_reference())
    }

    /// `<URL:<url>>`
    pub fn url_reference(&self) -> String {
        format!("<URL:{}>", self.url)
    }
}

impl TryFrom<Vec<Value>> for HeadlineRecord {
    type Error = RecordError;

    fn try_from(fields: Vec<Value>) -> Result<Self, Self::Error> {
        if fields.len() <= TIMESTAMP_FIELD {
            return Err(RecordError::TooShort { len: fields.len() });
        }
        let title = string_field(&fields, TITLE_FIELD)?;
        let url = string_field(&fields, URL_FIELD)?;
        let timestamp = decode_timestamp(&fields[TIMESTAMP_FIELD])
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .ok_or(RecordError::BadTimestamp)?;
        Ok(Self {
            title,
            url,
            timestamp,
            fields,
        })
    }
}

impl Serialize for HeadlineRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

fn string_field(fields: &[Value], position: usize) -> Result<String, RecordError> {
    fields[position]
        .as_str()
        .map(str::to_string)
        .ok_or(RecordError::NotAString { position })
}

/// Accepts plain epoch seconds or a `[high, low, usec?, psec?]` time list.
fn decode_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|secs| secs.floor() as i64)),
        Value::Array(parts) if (2..=4).contains(&parts.len()) => {
            if !parts.iter().all(Value::is_number) {
                return None;
            }
            let high = parts[0].as_i64()?;
            let low = parts[1].as_i64()?;
            high.checked_mul(65536)?.checked_add(low)
        }
        _ => None,
    }
}

/// A `(key, record)` pair as stored in the database. The key is passed
/// through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlineEntry {
    pub key: Value,
    pub record: HeadlineRecord,
}

impl Serialize for HeadlineEntry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.key, &self.record).serialize(serializer)
    }
}

pub type Formatter = Box<dyn Fn(&HeadlineRecord) -> String>;

/// Whether chrono understands every specifier in `pattern`.
pub fn is_valid_time_format(pattern: &str) -> bool {
    !StrftimeItems::new(pattern).any(|item| matches!(item, Item::Error))
}

/// An unusable pattern falls back to [`DEFAULT_TIME_FORMAT`].
pub fn default_formatter(time_format: impl Into<String>) -> Formatter {
    let mut pattern = time_format.into();
    if !is_valid_time_format(&pattern) {
        tracing::warn!(%pattern, "invalid time format, using default");
        pattern = DEFAULT_TIME_FORMAT.to_string();
    }
    Box::new(move |record: &HeadlineRecord| format_in(record, &pattern, &Local))
}

/// `<time> - <title>` with the capture time rendered in `zone`.
pub fn format_in<Tz>(record: &HeadlineRecord, pattern: &str, zone: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let when = record.timestamp().with_timezone(zone);
    let mut stamp = String::new();
    if write!(stamp, "{}", when.format(pattern)).is_err() {
        stamp.clear();
        let _ = write!(stamp, "{}", when.format(DEFAULT_TIME_FORMAT));
    }
    format!("{stamp} - {}", record.title())
}

#[cfg(test)]
pub(crate) fn sample_fields(title: &str, url: &str, timestamp: Value) -> Vec<Value> {
    vec![
        Value::from(title),
        Value::from(url),
        Value::from("Slashdot"),
        Value::from("timothy"),
        Value::from("from-the-test-dept"),
        Value::from(12),
        Value::from("news"),
        Value::from("topicnews.gif"),
        timestamp,
        Value::Null,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn big_news() -> HeadlineRecord {
        HeadlineRecord::try_from(sample_fields(
            "Big News",
            "http://example.com/a",
            json!(1_000_000_000),
        ))
        .unwrap()
    }

    #[test]
    fn reads_positional_fields() {
        let record = big_news();
        assert_eq!(record.title(), "Big News");
        assert_eq!(record.url(), "http://example.com/a");
        assert_eq!(record.timestamp().timestamp(), 1_000_000_000);
    }

    #[test]
    fn accepts_high_low_time_lists() {
        let high = 1_000_000_000 / 65536;
        let low = 1_000_000_000 % 65536;
        let record = HeadlineRecord::try_from(sample_fields(
            "Big News",
            "http://example.com/a",
            json!([high, low, 0]),
        ))
        .unwrap();
        assert_eq!(record.timestamp().timestamp(), 1_000_000_000);
    }

    #[test]
    fn rejects_short_and_mistyped_records() {
        let short = vec![json!("title"), json!("url")];
        assert_eq!(
            HeadlineRecord::try_from(short),
            Err(RecordError::TooShort { len: 2 })
        );

        let mut fields = sample_fields("t", "u", json!(0));
        fields[URL_FIELD] = json!(42);
        assert_eq!(
            HeadlineRecord::try_from(fields),
            Err(RecordError::NotAString { position: 1 })
        );

        let fields = sample_fields("t", "u", json!("yesterday"));
        assert_eq!(
            HeadlineRecord::try_from(fields),
            Err(RecordError::BadTimestamp)
        );
    }

    #[test]
    fn default_format_uses_time_then_title() {
        let line = format_in(&big_news(), DEFAULT_TIME_FORMAT, &Utc);
        assert_eq!(line, "Sun Sep  9 01:46:40 2001 - Big News");

        let local = default_formatter(DEFAULT_TIME_FORMAT)(&big_news());
        assert!(local.ends_with(" - Big News"), "line was {local}");
    }

    #[test]
    fn bad_time_pattern_falls_back_to_default() {
        assert!(!is_valid_time_format("%Q"));
        assert!(is_valid_time_format(DEFAULT_TIME_FORMAT));

        let line = format_in(&big_news(), "%Q", &Utc);
        assert_eq!(line, "Sun Sep  9 01:46:40 2001 - Big News");
        let local = default_formatter("%Q")(&big_news());
        assert!(local.ends_with(" - Big News"), "line was {local}");
    }

    #[test]
    fn oversized_time_list_is_rejected() {
        let fields = sample_fields("t", "u", json!([i64::MAX, 1]));
        assert_eq!(
            HeadlineRecord::try_from(fields),
            Err(RecordError::BadTimestamp)
        );
    }

    #[test]
    fn citation_text() {
        let record = big_news();
        assert_eq!(record.citation(), "Big News <URL:http://example.com/a>");
        assert_eq!(record.url_reference(), "<URL:http://example.com/a>");
    }

    #[test]
    fn serialises_every_field_back_in_place() {
        let fields = sample_fields("Big News", "http://example.com/a", json!([15258, 51712]));
        let entry = HeadlineEntry {
            key: json!("k1"),
            record: HeadlineRecord::try_from(fields.clone()).unwrap(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value, json!(["k1", fields]));
    }
}
