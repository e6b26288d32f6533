use chrono::{DateTime, Utc};

const MINUTE_MS: u64 = 60_000;
const DAY_MS: u64 = 86_400_000;
const MONTH_MS: u64 = 30 * DAY_MS;

fn utc(timestamp_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(timestamp_ms as i64)
}

/// Time-axis label in UTC, coarsened by the span between two labels.
///
/// - `span < 1m` -> `HH:MM:SS`
/// - `span < 1d` -> `HH:MM`
/// - `span < 30d` -> `DD.MM`
/// - otherwise -> `MM.YYYY`
pub fn format_time_label(timestamp_ms: u64, label_span_ms: u64) -> String {
    let Some(time) = utc(timestamp_ms) else {
        return String::new();
    };
    let pattern = if label_span_ms < MINUTE_MS {
        "%H:%M:%S"
    } else if label_span_ms < DAY_MS {
        "%H:%M"
    } else if label_span_ms < MONTH_MS {
        "%d.%m"
    } else {
        "%m.%Y"
    };
    time.format(pattern).to_string()
}

/// Full UTC timestamp for tooltips and the crosshair label.
pub fn format_full_time(timestamp_ms: u64) -> String {
    utc(timestamp_ms).map(|t| t.format("%Y-%m-%d %H:%M").to_string()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-03-05 14:07:09 UTC
    const TS: u64 = 1_709_647_629_000;

    #[test]
    fn label_coarsens_with_span() {
        assert_eq!(format_time_label(TS, 1_000), "14:07:09");
        assert_eq!(format_time_label(TS, 5 * MINUTE_MS), "14:07");
        assert_eq!(format_time_label(TS, DAY_MS), "05.03");
        assert_eq!(format_time_label(TS, 60 * DAY_MS), "03.2024");
    }

    #[test]
    fn full_time_is_utc() {
        assert_eq!(format_full_time(0), "1970-01-01 00:00");
        assert_eq!(format_full_time(TS), "2024-03-05 14:07");
    }
}
