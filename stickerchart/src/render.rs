//! Plain-text output for the CLI.

use chrono::{NaiveDate, TimeZone};
use std::fmt::Write;
use stickerchart_core::format::{format_batch_time, format_day_label, format_sticker_count};
use stickerchart_core::{AppState, DayGroup};

/// Short form of an id for listings
pub fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Render grouped history as text, newest day first.
pub fn history_text<Tz>(chart_name: &str, groups: &[DayGroup], today: NaiveDate, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let _ = writeln!(out, "{}", chart_name);

    if groups.is_empty() {
        let _ = writeln!(out, "  No stickers yet.");
        return out;
    }

    for day in groups {
        let _ = writeln!(
            out,
            "\n{:<28} {}",
            format_day_label(day.day, today),
            format_sticker_count(day.total_count)
        );
        for batch in &day.batches {
            let images: Vec<&str> = batch
                .stickers
                .iter()
                .map(|s| s.event.image_name.as_str())
                .collect();
            let _ = writeln!(
                out,
                "  {}  {:<14} {}",
                format_batch_time(batch.timestamp, tz),
                batch.creator_name,
                images.join(" ")
            );
        }
    }
    out
}

/// People, with the selected one starred.
pub fn people_text(state: &AppState) -> String {
    let mut out = String::new();
    if state.people.is_empty() {
        let _ = writeln!(out, "No people yet.");
        return out;
    }
    for person in &state.people {
        let marker = if state.selected_person_id.as_deref() == Some(person.id.as_str()) {
            "*"
        } else {
            " "
        };
        let _ = writeln!(out, "{} {}  {}", marker, short_id(&person.id), person.name);
    }
    out
}

/// Charts visible for the current selection.
pub fn charts_text(state: &AppState) -> String {
    let mut out = String::new();
    let charts = state.visible_charts();
    if charts.is_empty() {
        let _ = writeln!(out, "No charts yet.");
        return out;
    }
    for chart in charts {
        let owner = chart
            .person_id
            .as_deref()
            .and_then(|id| state.person(id))
            .map(|p| p.name.as_str())
            .unwrap_or("-");
        let _ = writeln!(
            out,
            "{}  {:<20} {:<7} {:<12} {}",
            short_id(&chart.id),
            chart.name,
            chart.color,
            owner,
            format_sticker_count(state.sticker_count(&chart.id))
        );
        for qa in &chart.quick_actions {
            let _ = writeln!(out, "          + {} ({} x {})", qa.name, qa.sticker_count, qa.image_name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use stickerchart_core::history::HistorySticker;
    use stickerchart_core::{Batch, StickerEvent};

    fn sticker(id: &str, image: &str, ts: DateTime<Utc>) -> HistorySticker {
        HistorySticker {
            event: StickerEvent::new(id, "c1", image),
            timestamp: ts,
        }
    }

    #[test]
    fn test_history_text_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 9, 10, 0, 0).unwrap();
        let groups = vec![DayGroup {
            day: ts.date_naive(),
            total_count: 2,
            batches: vec![Batch {
                timestamp: ts,
                time_window_bucket: 0,
                creator_key: "X".to_string(),
                creator_name: "Grandma".to_string(),
                stickers: vec![sticker("a", "star", ts), sticker("b", "heart", ts)],
            }],
        }];

        let text = history_text("Chores", &groups, ts.date_naive(), &Utc);
        assert!(text.starts_with("Chores\n"));
        assert!(text.contains("Today"));
        assert!(text.contains("2 stickers"));
        assert!(text.contains("10:00  Grandma"));
        assert!(text.contains("star heart"));
    }

    #[test]
    fn test_empty_history() {
        let today = Utc::now().date_naive();
        let text = history_text("Chores", &[], today, &Utc);
        assert!(text.contains("No stickers yet."));
    }
}
