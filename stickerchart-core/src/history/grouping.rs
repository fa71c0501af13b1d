//! Day and batch grouping for a chart's sticker history.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::creators::CreatorDirectory;
use super::timestamps::{resolve_timestamp, FallbackTimestamps};
use crate::config::HistoryConfig;
use crate::types::StickerEvent;

/// Sort and grouping keys derived for one sticker.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupingContext {
    pub event: StickerEvent,
    pub resolved_timestamp: DateTime<Utc>,
    pub creator_key: String,
    /// Calendar day of the resolved timestamp in the display time zone
    pub day_bucket: NaiveDate,
    /// Index of the window the resolved timestamp falls in, counted from the epoch
    pub time_window_bucket: i64,
}

/// A sticker as it appears in history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySticker {
    #[serde(flatten)]
    pub event: StickerEvent,
    pub timestamp: DateTime<Utc>,
}

/// Adjacent stickers from one creator within one time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Batch {
    /// Resolved timestamp of the first sticker
    pub timestamp: DateTime<Utc>,
    pub time_window_bucket: i64,
    pub creator_key: String,
    pub creator_name: String,
    /// Ascending by timestamp, then id
    pub stickers: Vec<HistorySticker>,
}

/// All batches for one calendar day, newest window first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub day: NaiveDate,
    pub total_count: usize,
    pub batches: Vec<Batch>,
}

/// Index of the window containing `ts`. Floors toward negative infinity so
/// pre-epoch timestamps still bucket consistently.
pub fn window_bucket(ts: DateTime<Utc>, window_ms: i64) -> i64 {
    ts.timestamp_millis().div_euclid(window_ms.max(1))
}

/// Derive grouping contexts for every sticker.
///
/// Stickers needing a fresh fallback timestamp are visited in ascending id
/// order, so fallback assignment does not depend on input order.
pub fn build_contexts<Tz: TimeZone>(
    events: &[StickerEvent],
    modification_times: &HashMap<String, i64>,
    fallbacks: &mut FallbackTimestamps,
    directory: &CreatorDirectory,
    config: &HistoryConfig,
    tz: &Tz,
) -> Vec<GroupingContext> {
    let mut ordered: Vec<&StickerEvent> = events.iter().collect();
    ordered.sort_by(|a, b| a.id.cmp(&b.id));

    let local_key = directory.local_creator_key(ordered.iter().map(|e| e.id.as_str()));
    let window_ms = config.window().num_milliseconds();

    ordered
        .into_iter()
        .map(|event| {
            let resolved_timestamp = resolve_timestamp(event, modification_times, fallbacks);
            GroupingContext {
                creator_key: directory.creator_key(&event.id, &local_key),
                day_bucket: resolved_timestamp.with_timezone(tz).date_naive(),
                time_window_bucket: window_bucket(resolved_timestamp, window_ms),
                resolved_timestamp,
                event: event.clone(),
            }
        })
        .collect()
}

/// Total order used for the history feed: day desc, window desc, creator
/// asc, timestamp asc, id asc.
pub fn compare_contexts(a: &GroupingContext, b: &GroupingContext) -> Ordering {
    b.day_bucket
        .cmp(&a.day_bucket)
        .then_with(|| b.time_window_bucket.cmp(&a.time_window_bucket))
        .then_with(|| a.creator_key.cmp(&b.creator_key))
        .then_with(|| a.resolved_timestamp.cmp(&b.resolved_timestamp))
        .then_with(|| a.event.id.cmp(&b.event.id))
}

/// Sort contexts and fold them into day groups and batches in one pass.
pub fn group_contexts(
    mut contexts: Vec<GroupingContext>,
    directory: &CreatorDirectory,
    config: &HistoryConfig,
) -> Vec<DayGroup> {
    contexts.sort_by(compare_contexts);

    let mut days: Vec<DayGroup> = Vec::new();
    for ctx in contexts {
        if days.last().map(|d| d.day) != Some(ctx.day_bucket) {
            days.push(DayGroup {
                day: ctx.day_bucket,
                total_count: 0,
                batches: Vec::new(),
            });
        }
        let Some(day) = days.last_mut() else {
            continue;
        };

        let continues_batch = day.batches.last().is_some_and(|b| {
            b.time_window_bucket == ctx.time_window_bucket && b.creator_key == ctx.creator_key
        });
        if !continues_batch {
            day.batches.push(Batch {
                timestamp: ctx.resolved_timestamp,
                time_window_bucket: ctx.time_window_bucket,
                creator_name: directory.display_name(&ctx.creator_key, config),
                creator_key: ctx.creator_key.clone(),
                stickers: Vec::new(),
            });
        }
        if let Some(batch) = day.batches.last_mut() {
            batch.stickers.push(HistorySticker {
                event: ctx.event,
                timestamp: ctx.resolved_timestamp,
            });
            day.total_count += 1;
        }
    }
    days
}

/// Group a chart's stickers into the history feed.
pub fn group_history<Tz: TimeZone>(
    events: &[StickerEvent],
    modification_times: &HashMap<String, i64>,
    fallbacks: &mut FallbackTimestamps,
    directory: &CreatorDirectory,
    config: &HistoryConfig,
    tz: &Tz,
) -> Vec<DayGroup> {
    let contexts = build_contexts(events, modification_times, fallbacks, directory, config, tz);
    group_contexts(contexts, directory, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, h, m, s).unwrap()
    }

    fn nanos(ts: DateTime<Utc>) -> i64 {
        ts.timestamp_nanos_opt().unwrap()
    }

    fn fixture(times: &[(&str, DateTime<Utc>)]) -> (Vec<StickerEvent>, HashMap<String, i64>) {
        let events = times
            .iter()
            .map(|(id, _)| StickerEvent::new(*id, "chart", "star"))
            .collect();
        let mod_times = times
            .iter()
            .map(|(id, ts)| (id.to_string(), nanos(*ts)))
            .collect();
        (events, mod_times)
    }

    fn group(
        events: &[StickerEvent],
        mod_times: &HashMap<String, i64>,
        directory: &CreatorDirectory,
    ) -> Vec<DayGroup> {
        let mut fallbacks = FallbackTimestamps::new(Duration::milliseconds(1), at(0, 0, 0));
        group_history(
            events,
            mod_times,
            &mut fallbacks,
            directory,
            &HistoryConfig::default(),
            &Utc,
        )
    }

    fn ids(batch: &Batch) -> Vec<&str> {
        batch.stickers.iter().map(|s| s.event.id.as_str()).collect()
    }

    #[test]
    fn test_window_bucket_floors() {
        assert_eq!(window_bucket(at(10, 0, 0), 120_000), window_bucket(at(10, 1, 59), 120_000));
        assert_ne!(window_bucket(at(10, 1, 59), 120_000), window_bucket(at(10, 2, 0), 120_000));
        let before_epoch = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(window_bucket(before_epoch, 120_000), -1);
    }

    #[test]
    fn test_window_boundary_splits_batches() {
        let (events, times) = fixture(&[
            ("a", at(10, 0, 0)),
            ("b", at(10, 0, 30)),
            ("c", at(10, 3, 10)),
        ]);
        let days = group(&events, &times, &CreatorDirectory::default());

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].total_count, 3);
        assert_eq!(days[0].batches.len(), 2);
        assert_eq!(ids(&days[0].batches[0]), vec!["c"]);
        assert_eq!(ids(&days[0].batches[1]), vec!["a", "b"]);
        assert_eq!(days[0].batches[1].timestamp, at(10, 0, 0));
    }

    #[test]
    fn test_adjacent_timestamps_across_boundary_split() {
        let (events, times) = fixture(&[("a", at(10, 1, 59)), ("b", at(10, 2, 1))]);
        let days = group(&events, &times, &CreatorDirectory::default());
        assert_eq!(days[0].batches.len(), 2);
    }

    #[test]
    fn test_creator_change_splits_batch() {
        let (events, times) = fixture(&[
            ("a", at(10, 0, 0)),
            ("b", at(10, 0, 10)),
            ("c", at(10, 0, 20)),
        ]);
        let mut directory = CreatorDirectory::default();
        directory.creators.insert("b".to_string(), "grandma".to_string());
        directory.device_user = Some("me".to_string());
        directory
            .display_names
            .insert("grandma".to_string(), "Grandma".to_string());

        let days = group(&events, &times, &directory);
        let batches = &days[0].batches;
        assert_eq!(batches.len(), 2);
        // Same window, so creator key ascending decides
        assert_eq!(batches[0].creator_key, "grandma");
        assert_eq!(batches[0].creator_name, "Grandma");
        assert_eq!(ids(&batches[0]), vec!["b"]);
        assert_eq!(batches[1].creator_key, "me");
        assert_eq!(batches[1].creator_name, "You");
        assert_eq!(ids(&batches[1]), vec!["a", "c"]);
    }

    #[test]
    fn test_days_newest_first() {
        let yesterday = at(23, 59, 0) - Duration::days(1);
        let (events, times) = fixture(&[("a", at(9, 0, 0)), ("b", yesterday), ("c", at(18, 0, 0))]);
        let days = group(&events, &times, &CreatorDirectory::default());

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(days[0].total_count, 2);
        assert_eq!(ids(&days[0].batches[0]), vec!["c"]);
        assert_eq!(ids(&days[0].batches[1]), vec!["a"]);
        assert_eq!(days[1].day, NaiveDate::from_ymd_opt(2024, 3, 8).unwrap());
    }

    #[test]
    fn test_day_follows_display_time_zone() {
        let (events, times) = fixture(&[("a", at(23, 30, 0)), ("b", at(22, 30, 0))]);
        let mut fallbacks = FallbackTimestamps::new(Duration::milliseconds(1), at(0, 0, 0));
        let plus_one = FixedOffset::east_opt(3600).unwrap();

        let days = group_history(
            &events,
            &times,
            &mut fallbacks,
            &CreatorDirectory::default(),
            &HistoryConfig::default(),
            &plus_one,
        );
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert_eq!(days[1].day, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[test]
    fn test_identical_timestamps_tie_break_on_id() {
        let (events, times) = fixture(&[("b", at(10, 0, 0)), ("a", at(10, 0, 0))]);
        let days = group(&events, &times, &CreatorDirectory::default());
        assert_eq!(ids(&days[0].batches[0]), vec!["a", "b"]);
    }

    #[test]
    fn test_empty_history() {
        let days = group(&[], &HashMap::new(), &CreatorDirectory::default());
        assert!(days.is_empty());
    }
}
