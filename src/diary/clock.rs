use chrono::{DateTime, FixedOffset, Utc};

/// The logical day and time of one run, pinned to a fixed UTC offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeContext {
    pub date_key: String,
    pub display_date: String,
    pub time: String,
    pub timestamp_ms: i64,
}

impl TimeContext {
    pub fn at(instant: DateTime<Utc>, offset: FixedOffset) -> Self {
        let local = instant.with_timezone(&offset);
        Self {
            date_key: local.format("%Y-%m-%d").to_string(),
            display_date: local.format("%Y/%m/%d").to_string(),
            time: local.format("%H:%M:%S").to_string(),
            timestamp_ms: instant.timestamp_millis(),
        }
    }

    pub fn now(offset: FixedOffset) -> Self {
        Self::at(Utc::now(), offset)
    }

    /// Offset label such as `UTC+08:00` for prompts and reports.
    pub fn offset_label(offset: FixedOffset) -> String {
        let secs = offset.local_minus_utc();
        let sign = if secs < 0 { '-' } else { '+' };
        let abs = secs.unsigned_abs();
        format!("UTC{sign}{:02}:{:02}", abs / 3600, (abs % 3600) / 60)
    }
}
