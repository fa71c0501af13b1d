//! Sticker history for a chart.
//!
//! Turns a flat set of stickers into a feed of days, each holding batches
//! of stickers one person added within the same short time window:
//!
//! ```text
//! Saturday, Mar 9          3 stickers
//!   10:03  You             ★
//!   10:00  Grandma         ★ ★
//! ```
//!
//! Grouping is a pure function of the sticker set plus two tables that the
//! sync layer fills in asynchronously: who created each sticker and when
//! it was last modified. [`HistoryView`] owns those tables together with
//! the fallback timestamps used until the sync layer reports real times.

pub mod creators;
pub mod grouping;
pub mod refresh;
pub mod timestamps;

pub use creators::{CreatorDirectory, LOCAL_CREATOR_KEY};
pub use grouping::{group_history, Batch, DayGroup, GroupingContext, HistorySticker};
pub use refresh::{
    RefreshChanges, RefreshOutcome, RefreshRequest, RefreshTrigger, SyncActivity,
    SyncMetadataSource,
};
pub use timestamps::{timestamp_from_nanos, FallbackTimestamps};

use chrono::{DateTime, Local, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::HistoryConfig;
use crate::error::Result;
use crate::types::StickerEvent;

/// Presentation state for one chart's sticker history.
///
/// Single owner; every cache here is only touched through `&mut self`.
#[derive(Debug, Clone)]
pub struct HistoryView {
    chart_id: String,
    config: HistoryConfig,
    events: Vec<StickerEvent>,
    fallbacks: FallbackTimestamps,
    directory: CreatorDirectory,
    modification_times: HashMap<String, i64>,
    sync_activity: SyncActivity,
    next_generation: u64,
    written: WriteGenerations,
}

/// Generation that last wrote each cached entry.
#[derive(Debug, Clone, Default)]
struct WriteGenerations {
    creators: HashMap<String, u64>,
    modification_times: HashMap<String, u64>,
    display_names: Option<u64>,
    device_user: Option<u64>,
}

impl WriteGenerations {
    fn retain_present(&mut self, present: &HashSet<String>) {
        self.creators.retain(|id, _| present.contains(id));
        self.modification_times.retain(|id, _| present.contains(id));
    }
}

/// Record `generation` as the writer unless a newer one already wrote.
fn claim(slot: &mut Option<u64>, generation: u64) -> bool {
    if slot.is_some_and(|written| written > generation) {
        return false;
    }
    *slot = Some(generation);
    true
}

fn claim_entry(slots: &mut HashMap<String, u64>, id: &str, generation: u64) -> bool {
    let mut slot = slots.get(id).copied();
    let claimed = claim(&mut slot, generation);
    if claimed {
        slots.insert(id.to_string(), generation);
    }
    claimed
}

impl HistoryView {
    /// Create an empty view for a chart
    pub fn new(chart_id: impl Into<String>, config: HistoryConfig, now: DateTime<Utc>) -> Self {
        let fallbacks = FallbackTimestamps::new(config.fallback_step(), now);
        Self {
            chart_id: chart_id.into(),
            config,
            events: Vec::new(),
            fallbacks,
            directory: CreatorDirectory::default(),
            modification_times: HashMap::new(),
            sync_activity: SyncActivity::default(),
            next_generation: 0,
            written: WriteGenerations::default(),
        }
    }

    pub fn chart_id(&self) -> &str {
        &self.chart_id
    }

    pub fn events(&self) -> &[StickerEvent] {
        &self.events
    }

    pub fn directory(&self) -> &CreatorDirectory {
        &self.directory
    }

    pub fn modification_times(&self) -> &HashMap<String, i64> {
        &self.modification_times
    }

    /// Fallback timestamp currently held for a sticker
    pub fn fallback_timestamp(&self, sticker_id: &str) -> Option<DateTime<Utc>> {
        self.fallbacks.get(sticker_id)
    }

    /// Replace the visible sticker set.
    ///
    /// When the set of ids changed, caches for departed stickers are pruned
    /// and an incremental refresh request is returned for stickers whose
    /// metadata is still incomplete.
    pub fn set_events(
        &mut self,
        events: Vec<StickerEvent>,
        now: DateTime<Utc>,
    ) -> Option<RefreshRequest> {
        let changed = self
            .fallbacks
            .observe(events.iter().map(|e| e.id.as_str()), now);
        self.events = events;
        if !changed {
            return None;
        }

        let present = self.present_ids();
        self.directory.creators.retain(|id, _| present.contains(id));
        self.modification_times.retain(|id, _| present.contains(id));
        self.written.retain_present(&present);

        let request = self.begin_refresh(RefreshTrigger::StickersChanged);
        (!request.sticker_ids.is_empty()).then_some(request)
    }

    /// Feed the sync-in-progress flag; returns a forced refresh request when
    /// a sync pass just finished.
    pub fn observe_sync_activity(&mut self, in_progress: bool) -> Option<RefreshRequest> {
        self.sync_activity
            .observe(in_progress)
            .then(|| self.begin_refresh(RefreshTrigger::SyncFinished))
    }

    /// Build the next refresh request.
    pub fn begin_refresh(&mut self, trigger: RefreshTrigger) -> RefreshRequest {
        let forced = trigger == RefreshTrigger::SyncFinished;
        let mut sticker_ids: Vec<String> = self
            .events
            .iter()
            .filter(|e| forced || !self.is_resolved(&e.id))
            .map(|e| e.id.clone())
            .collect();
        sticker_ids.sort();
        sticker_ids.dedup();

        self.next_generation += 1;
        RefreshRequest {
            generation: self.next_generation,
            chart_id: self.chart_id.clone(),
            sticker_ids,
            forced,
        }
    }

    /// Merge a refresh result.
    ///
    /// Results may arrive out of order. Each cached entry remembers the
    /// generation that wrote it, and an older result only fills entries no
    /// newer generation has written. Each table is compared with its
    /// current value and only replaced when it differs.
    pub fn apply_refresh(&mut self, outcome: RefreshOutcome) -> RefreshChanges {
        let generation = outcome.generation;
        let mut changes = RefreshChanges::default();
        let mut skipped = 0usize;

        if let Some(device_user) = outcome.device_user {
            if !claim(&mut self.written.device_user, generation) {
                skipped += 1;
            } else if self.directory.device_user != device_user {
                self.directory.device_user = device_user;
                changes.device_user = true;
            }
        }

        if let Some(display_names) = outcome.display_names {
            if !claim(&mut self.written.display_names, generation) {
                skipped += 1;
            } else if display_names != self.directory.display_names {
                self.directory.display_names = display_names;
                changes.display_names = true;
            }
        }

        let present = self.present_ids();
        let mut creators = self.directory.creators.clone();
        let mut modification_times = self.modification_times.clone();
        for id in outcome.looked_up.iter().filter(|id| present.contains(*id)) {
            if claim_entry(&mut self.written.creators, id, generation) {
                match outcome.creators.get(id) {
                    Some(creator) => creators.insert(id.clone(), creator.clone()),
                    None => creators.remove(id),
                };
            } else {
                skipped += 1;
            }
            if claim_entry(&mut self.written.modification_times, id, generation) {
                match outcome.modification_times.get(id) {
                    Some(time) => modification_times.insert(id.clone(), *time),
                    None => modification_times.remove(id),
                };
            } else {
                skipped += 1;
            }
        }
        creators.retain(|id, _| present.contains(id));
        modification_times.retain(|id, _| present.contains(id));

        if creators != self.directory.creators {
            self.directory.creators = creators;
            changes.creators = true;
        }
        if modification_times != self.modification_times {
            self.modification_times = modification_times;
            changes.modification_times = true;
        }

        if skipped > 0 {
            tracing::debug!(
                chart_id = %self.chart_id,
                generation,
                skipped,
                "Kept newer metadata over a late refresh"
            );
        }
        if changes.any() {
            tracing::debug!(chart_id = %self.chart_id, ?changes, "Applied metadata refresh");
        }
        changes
    }

    /// Run a refresh against `source` and merge it.
    pub async fn refresh<S>(&mut self, source: Arc<S>, trigger: RefreshTrigger) -> RefreshChanges
    where
        S: SyncMetadataSource + Send + Sync + 'static,
    {
        let request = self.begin_refresh(trigger);
        let outcome = refresh::resolve(source, request).await;
        self.apply_refresh(outcome)
    }

    /// Pull the current stickers and sync flag from `source`, running any
    /// refresh either of them calls for.
    pub async fn sync_with<S>(&mut self, source: Arc<S>, now: DateTime<Utc>) -> Result<RefreshChanges>
    where
        S: SyncMetadataSource + Send + Sync + 'static,
    {
        let events = source.stickers_for_chart(&self.chart_id)?;
        let mut changes = RefreshChanges::default();

        if let Some(request) = self.set_events(events, now) {
            let outcome = refresh::resolve(Arc::clone(&source), request).await;
            changes = merge_changes(changes, self.apply_refresh(outcome));
        }

        let in_progress = match source.sync_in_progress() {
            Ok(flag) => flag,
            Err(e) => {
                tracing::debug!(error = %e, "Sync status lookup failed");
                false
            }
        };
        if let Some(request) = self.observe_sync_activity(in_progress) {
            let outcome = refresh::resolve(source, request).await;
            changes = merge_changes(changes, self.apply_refresh(outcome));
        }

        Ok(changes)
    }

    /// Group the current stickers for display in `tz`.
    pub fn groups<Tz: TimeZone>(&mut self, tz: &Tz) -> Vec<DayGroup> {
        group_history(
            &self.events,
            &self.modification_times,
            &mut self.fallbacks,
            &self.directory,
            &self.config,
            tz,
        )
    }

    /// Group the current stickers in the local time zone.
    pub fn groups_local(&mut self) -> Vec<DayGroup> {
        self.groups(&Local)
    }

    /// Creator key a sticker currently groups under
    pub fn creator_key_for(&self, sticker_id: &str) -> String {
        let local_key = self
            .directory
            .local_creator_key(self.events.iter().map(|e| e.id.as_str()));
        self.directory.creator_key(sticker_id, &local_key)
    }

    /// Label for a creator key
    pub fn display_name_for(&self, creator_key: &str) -> String {
        self.directory.display_name(creator_key, &self.config)
    }

    fn present_ids(&self) -> HashSet<String> {
        self.events.iter().map(|e| e.id.clone()).collect()
    }

    fn is_resolved(&self, sticker_id: &str) -> bool {
        self.directory.creators.contains_key(sticker_id)
            && self.modification_times.contains_key(sticker_id)
    }
}

fn merge_changes(a: RefreshChanges, b: RefreshChanges) -> RefreshChanges {
    RefreshChanges {
        device_user: a.device_user || b.device_user,
        display_names: a.display_names || b.display_names,
        creators: a.creators || b.creators,
        modification_times: a.modification_times || b.modification_times,
    }
}
