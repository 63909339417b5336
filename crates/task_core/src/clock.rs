use crate::error::AppError;
use time::format_description::{self, OwnedFormatItem};
use time::{Date, OffsetDateTime, UtcOffset};

/// Source of "now" for stamping and date-relative queries.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;

    fn today(&self) -> Date {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(local_offset())
    }
}

pub fn local_offset() -> UtcOffset {
    UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC)
}

/// Parses a `time` format description such as
/// `[year]-[month]-[day] [hour]:[minute]:[second]`.
pub fn parse_timestamp_format(pattern: &str) -> Result<OwnedFormatItem, AppError> {
    format_description::parse_owned::<2>(pattern).map_err(|err| {
        AppError::invalid_input(format!("invalid timestamp format '{pattern}': {err}"))
    })
}

pub fn format_timestamp(moment: OffsetDateTime, pattern: &str) -> Result<String, AppError> {
    let format = parse_timestamp_format(pattern)?;
    moment
        .format(&format)
        .map_err(|err| AppError::invalid_data(format!("cannot format timestamp: {err}")))
}


#[cfg(test)]
mod tests {
    use super::{format_timestamp, parse_timestamp_format};
    use time::macros::datetime;

    const DEFAULT_PATTERN: &str = "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]";

    #[test]
    fn formats_with_microsecond_precision() {
        let moment = datetime!(2025-07-22 10:00:00.123456 UTC);
        let stamp = format_timestamp(moment, DEFAULT_PATTERN).unwrap();
        assert_eq!(stamp, "2025-07-22 10:00:00.123456");
    }

    #[test]
    fn default_format_orders_lexicographically() {
        let earlier = format_timestamp(datetime!(2025-07-22 09:59:59.999999 UTC), DEFAULT_PATTERN)
            .unwrap();
        let later =
            format_timestamp(datetime!(2025-07-22 10:00:00 UTC), DEFAULT_PATTERN).unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn rejects_malformed_pattern() {
        let err = parse_timestamp_format("[year]-[nonsense]").unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }
}
