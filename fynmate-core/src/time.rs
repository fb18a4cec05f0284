//! Time utilities: one configured IANA zone decides both the wall-clock stamp
//! written with each record and what "today" means for queries.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Storage/wire format of `created_at`.
pub const WALL_CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimePolicy {
    tz: Tz,
}

impl TimePolicy {
    /// Build a policy from an IANA zone name like "Asia/Jakarta".
    pub fn new(tz: &str) -> Result<Self> {
        let tz: Tz = tz
            .parse()
            .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))?;
        Ok(Self { tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Local wall-clock time for a UTC instant.
    pub fn local(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.tz).naive_local()
    }

    pub fn now(&self) -> NaiveDateTime {
        self.local(Utc::now())
    }

    /// Calendar day in the configured zone.
    pub fn day_of(&self, at: DateTime<Utc>) -> NaiveDate {
        self.local(at).date()
    }

    pub fn today(&self) -> NaiveDate {
        self.day_of(Utc::now())
    }

    /// Parse a timestamp as local wall-clock time.
    ///
    /// Naive forms are taken to already be in the configured zone; RFC 3339 input
    /// carries its own offset and is converted. A bare date means midnight.
    pub fn parse_local(&self, raw: &str) -> Option<NaiveDateTime> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&self.tz).naive_local());
        }
        parse_wall_clock(raw)
    }
}

impl Default for TimePolicy {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Asia::Jakarta,
        }
    }
}

/// Parse the naive timestamp shapes we accept on input, without zone conversion.
pub fn parse_wall_clock(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

pub fn format_wall_clock(dt: NaiveDateTime) -> String {
    dt.format(WALL_CLOCK_FORMAT).to_string()
}

/// serde adapter for `created_at`: written as `YYYY-MM-DD HH:MM:SS`, read leniently.
pub mod wall_clock {
    use super::{format_wall_clock, parse_wall_clock};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(dt: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_wall_clock(*dt))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_wall_clock(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }
}
