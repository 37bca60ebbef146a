use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Epoch values below this are taken to be seconds rather than millis.
const SECONDS_CUTOFF: f64 = 1e11;

/// Formats engine timestamps for display in one fixed timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayClock {
    tz: Tz,
}

impl Default for DisplayClock {
    fn default() -> Self {
        Self::utc()
    }
}

impl DisplayClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn utc() -> Self {
        Self { tz: chrono_tz::UTC }
    }

    pub fn tz(&self) -> Tz {
        self.tz
    }

    pub fn format_at(&self, at: DateTime<Utc>) -> String {
        at.with_timezone(&self.tz).format("%H:%M:%S").to_string()
    }

    pub fn format_millis(&self, ms: i64) -> String {
        match self.tz.timestamp_millis_opt(ms).single() {
            Some(t) => t.format("%H:%M:%S").to_string(),
            None => "--:--:--".to_string(),
        }
    }

    /// Display form of a raw entry `time` field.
    pub fn format_entry_time(&self, raw: f64) -> String {
        self.format_millis(entry_time_millis(raw))
    }
}

/// Entry time in epoch millis; the bridge sends seconds or millis.
pub fn entry_time_millis(raw: f64) -> i64 {
    if !raw.is_finite() {
        return 0;
    }
    if raw.abs() < SECONDS_CUTOFF {
        (raw * 1000.0) as i64
    } else {
        raw as i64
    }
}
