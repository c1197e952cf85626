//! Domain records exchanged between the feed, the store and the HTTP layer.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::str::FromStr;

/// Sentinel reported when the latest aggregate period cannot be determined.
pub const UNKNOWN_PERIOD: &str = "unknown";

/// One transaction as published by the upstream feed.
///
/// `order_id` is the natural key: re-ingesting the same id overwrites
/// `status` and `value` and leaves the other fields as first stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub order_id: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub created_at: NaiveDateTime,
    /// Status label such as `approved`, `pending` or `cancelled`.
    pub status: String,
    #[serde(deserialize_with = "deserialize_amount")]
    pub value: Decimal,
    pub payment_method: String,
}

/// Stored login identity. The hash is an argon2 PHC string.
#[derive(Clone, PartialEq, Eq)]
pub struct UserCredentials {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
}

impl std::fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserCredentials")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .finish()
    }
}

/// Per-day revenue and order counts, bucketed by status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue_approved: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue_pending: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_revenue_cancelled: Decimal,
    pub count_approved: i64,
    pub count_pending: i64,
    pub count_cancelled: i64,
}

/// Outcome of a successful sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub status: String,
    pub records_synced: usize,
    pub last_processed_period: String,
    pub message: String,
}

impl RunSummary {
    #[must_use]
    pub fn success(records_synced: usize, latest: Option<NaiveDate>) -> Self {
        Self {
            status: "success".to_string(),
            records_synced,
            last_processed_period: latest
                .map_or_else(|| UNKNOWN_PERIOD.to_string(), |d| d.to_string()),
            message: "Raw data synchronized and daily metrics refreshed.".to_string(),
        }
    }
}

/// Optional inclusive date bounds for a metrics query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsFilter {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl MetricsFilter {
    #[must_use]
    pub fn new(start_date: Option<NaiveDate>, end_date: Option<NaiveDate>) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Returns true when `date` satisfies every bound that is set.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

/// Accepts a JSON number or a numeric string using `.` or `,` as the decimal
/// separator (the feed is exported from a spreadsheet-style CSV).
fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAmount {
        Int(i64),
        Float(f64),
        Text(String),
    }

    match RawAmount::deserialize(deserializer)? {
        RawAmount::Int(i) => Ok(Decimal::from(i)),
        RawAmount::Float(f) => Decimal::try_from(f)
            .map(|d| d.normalize())
            .map_err(|e| de::Error::custom(format!("invalid amount {f}: {e}"))),
        RawAmount::Text(s) => parse_amount(&s).map_err(de::Error::custom),
    }
}

/// Parses an amount such as `"100.50"` or `"100,50"`.
///
/// # Errors
/// Returns a message when the text is not a decimal number.
pub fn parse_amount(text: &str) -> Result<Decimal, String> {
    let normalized = text.trim().replace(',', ".");
    Decimal::from_str(&normalized)
        .or_else(|_| Decimal::from_scientific(&normalized))
        .map_err(|e| format!("invalid amount {text:?}: {e}"))
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).map_err(de::Error::custom)
}

/// Parses the timestamp layouts the feed has been seen to emit.
///
/// # Errors
/// Returns a message when none of the layouts match.
pub fn parse_timestamp(text: &str) -> Result<NaiveDateTime, String> {
    let text = text.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Ok(dt.naive_utc());
    }
    for layout in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, layout) {
            return Ok(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| format!("unrecognized timestamp {text:?}"))
}
