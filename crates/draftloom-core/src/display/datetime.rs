//! Timestamp formatting in the operator's time zone.

use std::fmt;

use jiff::{tz::TimeZone, Timestamp};

/// Formats a UTC `Timestamp` as `YYYY-MM-DD HH:MM:SS TZ` in the system time
/// zone. Field timestamps are stored in UTC and only converted for display.
pub struct LocalDateTime<'a>(pub &'a Timestamp);

impl fmt::Display for LocalDateTime<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let zoned = self.0.to_zoned(TimeZone::system());
        write!(f, "{}", zoned.strftime("%Y-%m-%d %H:%M:%S %Z"))
    }
}
