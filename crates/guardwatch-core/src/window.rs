use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Closed time range used to query the invocation log stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// `[center - half_width, center + half_width]`
    pub fn around(center: DateTime<Utc>, half_width: Duration) -> Self {
        Self {
            start: center - half_width,
            end: center + half_width,
        }
    }

    /// Window around `center`, or around now when no reference time is known
    pub fn around_or_now(center: Option<DateTime<Utc>>, half_width: Duration) -> Self {
        Self::around(center.unwrap_or_else(Utc::now), half_width)
    }

    pub fn start_millis(&self) -> i64 {
        self.start.timestamp_millis()
    }

    pub fn end_millis(&self) -> i64 {
        self.end.timestamp_millis()
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}
