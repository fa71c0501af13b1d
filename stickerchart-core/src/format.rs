//! Formatting helpers shared across front ends.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

/// Header for a history day: "Today", "Yesterday", or e.g. "Saturday, Mar 9".
pub fn format_day_label(day: NaiveDate, today: NaiveDate) -> String {
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%A, %b %-d").to_string()
    }
}

/// Time of a batch in `tz`, e.g. "10:03".
pub fn format_batch_time<Tz: TimeZone>(ts: DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.with_timezone(tz).format("%H:%M").to_string()
}

/// "1 sticker", "3 stickers".
pub fn format_sticker_count(count: usize) -> String {
    if count == 1 {
        "1 sticker".to_string()
    } else {
        format!("{} stickers", count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    #[test]
    fn test_day_labels() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 11).unwrap();
        assert_eq!(format_day_label(today, today), "Today");
        assert_eq!(
            format_day_label(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(), today),
            "Yesterday"
        );
        assert_eq!(
            format_day_label(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(), today),
            "Saturday, Mar 9"
        );
    }

    #[test]
    fn test_batch_time_uses_zone() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 23, 30, 0).unwrap();
        assert_eq!(format_batch_time(ts, &Utc), "23:30");
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(format_batch_time(ts, &plus_two), "01:30");
    }

    #[test]
    fn test_sticker_count() {
        assert_eq!(format_sticker_count(0), "0 stickers");
        assert_eq!(format_sticker_count(1), "1 sticker");
        assert_eq!(format_sticker_count(5), "5 stickers");
    }
}
