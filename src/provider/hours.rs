//! Exchange trading windows

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;

/// Weekday session between two local times, both ends inclusive
#[derive(Debug, Clone, Copy)]
pub struct TradingWindow {
    pub timezone: Tz,
    /// Session open, seconds after local midnight
    pub open_secs: u32,
    /// Session close, seconds after local midnight
    pub close_secs: u32,
}

const fn hms(hour: u32, minute: u32) -> u32 {
    hour * 3600 + minute * 60
}

impl TradingWindow {
    /// NYSE / NASDAQ regular session
    pub fn us() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            open_secs: hms(9, 30),
            close_secs: hms(16, 0),
        }
    }

    /// TWSE / TPEx regular session
    pub fn taiwan() -> Self {
        Self {
            timezone: chrono_tz::Asia::Taipei,
            open_secs: hms(9, 0),
            close_secs: hms(13, 30),
        }
    }

    /// Check whether `now` falls inside the session
    pub fn is_open_at(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return false;
        }
        let secs = local.time().num_seconds_from_midnight();
        secs >= self.open_secs && secs <= self.close_secs
    }
}
