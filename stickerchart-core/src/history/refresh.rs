//! Background resolution of sync metadata for sticker history.
//!
//! Refreshes read from a [`SyncMetadataSource`] and never fail: each step
//! that errors is logged and skipped, and the history keeps showing
//! whatever it had before. Attribution is cosmetic.
//!
//! Refreshes are not cancelled. Each carries a generation number, and the
//! view lets an entry written by a newer generation win over an older
//! result that finishes later.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::Result;
use crate::types::{ShareParticipant, StickerEvent, SyncMetadata};

/// Read-only view of the sync layer that history needs.
pub trait SyncMetadataSource {
    /// All stickers currently stored for a chart
    fn stickers_for_chart(&self, chart_id: &str) -> Result<Vec<StickerEvent>>;

    /// Sync metadata for one sticker, if the sync layer has any
    fn sync_metadata(&self, sticker_id: &str) -> Result<Option<SyncMetadata>>;

    /// Participants of the chart's share
    fn share_participants(&self, chart_id: &str) -> Result<Vec<ShareParticipant>>;

    /// Identifier of the user on this device, if available
    fn current_user_identifier(&self) -> Result<Option<String>>;

    /// Whether a sync pass is running right now
    fn sync_in_progress(&self) -> Result<bool>;
}

/// Why a refresh was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The visible sticker set changed; only unresolved stickers are looked up
    StickersChanged,
    /// A sync pass just finished; every visible sticker is looked up again
    SyncFinished,
}

/// A refresh to run against a [`SyncMetadataSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub generation: u64,
    pub chart_id: String,
    pub sticker_ids: Vec<String>,
    pub forced: bool,
}

/// What a refresh found. `None` fields mean the step failed and previous
/// data should be kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub generation: u64,
    /// `Some(None)` when the lookups succeeded but found no identity
    pub device_user: Option<Option<String>>,
    pub display_names: Option<HashMap<String, String>>,
    /// Stickers whose metadata lookup succeeded, with or without a result
    pub looked_up: HashSet<String>,
    pub creators: HashMap<String, String>,
    pub modification_times: HashMap<String, i64>,
}

/// Which tables an applied refresh actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshChanges {
    pub device_user: bool,
    pub display_names: bool,
    pub creators: bool,
    pub modification_times: bool,
}

impl RefreshChanges {
    /// Whether anything changed
    pub fn any(&self) -> bool {
        self.device_user || self.display_names || self.creators || self.modification_times
    }
}

/// Detects the moment a sync pass finishes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncActivity {
    in_progress: bool,
}

impl SyncActivity {
    /// Record the current flag; true only on an in-progress -> idle edge.
    pub fn observe(&mut self, in_progress: bool) -> bool {
        let finished = self.in_progress && !in_progress;
        self.in_progress = in_progress;
        finished
    }
}

/// Run a refresh synchronously.
pub fn resolve_blocking<S>(source: &S, request: &RefreshRequest) -> RefreshOutcome
where
    S: SyncMetadataSource + ?Sized,
{
    let mut outcome = RefreshOutcome {
        generation: request.generation,
        ..Default::default()
    };

    let participants = match source.share_participants(&request.chart_id) {
        Ok(participants) => Some(participants),
        Err(e) => {
            tracing::debug!(chart_id = %request.chart_id, error = %e, "Share lookup failed");
            None
        }
    };

    // Outer `None`: unknown. `Some(None)`: known to have no identity.
    let current_participant = participants.as_ref().map(|participants| {
        participants
            .iter()
            .find(|p| p.is_current_user)
            .map(|p| p.identifier.clone())
    });
    outcome.device_user = match source.current_user_identifier() {
        Ok(Some(id)) => Some(Some(id)),
        Ok(None) => current_participant,
        Err(e) => {
            tracing::debug!(error = %e, "Device identity lookup failed");
            current_participant.filter(Option::is_some)
        }
    };

    outcome.display_names = participants.map(|participants| {
        participants
            .iter()
            .map(|p| (p.identifier.clone(), p.display_name()))
            .collect()
    });

    for sticker_id in &request.sticker_ids {
        match source.sync_metadata(sticker_id) {
            Ok(metadata) => {
                outcome.looked_up.insert(sticker_id.clone());
                if let Some(metadata) = metadata {
                    if let Some(creator) = metadata.creator_identifier {
                        outcome.creators.insert(sticker_id.clone(), creator);
                    }
                    outcome
                        .modification_times
                        .insert(sticker_id.clone(), metadata.user_modification_time);
                }
            }
            Err(e) => {
                tracing::debug!(sticker_id = %sticker_id, error = %e, "Sync metadata lookup failed");
            }
        }
    }

    tracing::debug!(
        generation = request.generation,
        forced = request.forced,
        requested = request.sticker_ids.len(),
        resolved = outcome.looked_up.len(),
        "Metadata refresh finished"
    );

    outcome
}

/// Run a refresh on the blocking pool.
pub async fn resolve<S>(source: Arc<S>, request: RefreshRequest) -> RefreshOutcome
where
    S: SyncMetadataSource + Send + Sync + 'static,
{
    let generation = request.generation;
    match tokio::task::spawn_blocking(move || resolve_blocking(source.as_ref(), &request)).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::debug!(generation, error = %e, "Metadata refresh task failed");
            RefreshOutcome {
                generation,
                ..Default::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct FakeSource {
        metadata: HashMap<String, SyncMetadata>,
        participants: Option<Vec<ShareParticipant>>,
        device_user: Option<String>,
        failing_sticker: Option<String>,
        identity_offline: bool,
    }

    impl SyncMetadataSource for FakeSource {
        fn stickers_for_chart(&self, _chart_id: &str) -> Result<Vec<StickerEvent>> {
            Ok(vec![])
        }

        fn sync_metadata(&self, sticker_id: &str) -> Result<Option<SyncMetadata>> {
            if self.failing_sticker.as_deref() == Some(sticker_id) {
                return Err(Error::Validation("boom".to_string()));
            }
            Ok(self.metadata.get(sticker_id).cloned())
        }

        fn share_participants(&self, _chart_id: &str) -> Result<Vec<ShareParticipant>> {
            self.participants
                .clone()
                .ok_or_else(|| Error::Validation("offline".to_string()))
        }

        fn current_user_identifier(&self) -> Result<Option<String>> {
            if self.identity_offline {
                return Err(Error::Validation("no account".to_string()));
            }
            Ok(self.device_user.clone())
        }

        fn sync_in_progress(&self) -> Result<bool> {
            Ok(false)
        }
    }

    fn request(ids: &[&str]) -> RefreshRequest {
        RefreshRequest {
            generation: 7,
            chart_id: "chart".to_string(),
            sticker_ids: ids.iter().map(|s| s.to_string()).collect(),
            forced: false,
        }
    }

    fn participant(id: &str, name: Option<&str>, current: bool) -> ShareParticipant {
        ShareParticipant {
            identifier: id.to_string(),
            full_name: name.map(str::to_string),
            email: None,
            is_current_user: current,
        }
    }

    #[test]
    fn test_sync_activity_edges() {
        let mut activity = SyncActivity::default();
        assert!(!activity.observe(false));
        assert!(!activity.observe(true));
        assert!(!activity.observe(true));
        assert!(activity.observe(false));
        assert!(!activity.observe(false));
    }

    #[test]
    fn test_resolves_metadata_and_names() {
        let mut metadata = HashMap::new();
        metadata.insert(
            "s1".to_string(),
            SyncMetadata {
                user_modification_time: 42,
                creator_identifier: Some("X".to_string()),
            },
        );
        metadata.insert(
            "s2".to_string(),
            SyncMetadata {
                user_modification_time: 43,
                creator_identifier: None,
            },
        );
        let source = FakeSource {
            metadata,
            participants: Some(vec![participant("X", Some("Grandma"), false)]),
            device_user: Some("me".to_string()),
            failing_sticker: None,
            identity_offline: false,
        };

        let outcome = resolve_blocking(&source, &request(&["s1", "s2", "s3"]));
        assert_eq!(outcome.generation, 7);
        assert_eq!(outcome.device_user, Some(Some("me".to_string())));
        assert_eq!(outcome.display_names.unwrap()["X"], "Grandma");
        assert_eq!(outcome.creators.len(), 1);
        assert_eq!(outcome.creators["s1"], "X");
        assert_eq!(outcome.modification_times["s2"], 43);
        assert_eq!(outcome.looked_up.len(), 3);
    }

    #[test]
    fn test_failures_are_absorbed() {
        let source = FakeSource {
            metadata: HashMap::new(),
            participants: None,
            device_user: None,
            failing_sticker: Some("s2".to_string()),
            identity_offline: false,
        };

        let outcome = resolve_blocking(&source, &request(&["s1", "s2"]));
        assert!(outcome.display_names.is_none());
        assert!(outcome.device_user.is_none());
        assert!(outcome.looked_up.contains("s1"));
        assert!(!outcome.looked_up.contains("s2"));
    }

    #[test]
    fn test_device_user_from_current_participant() {
        let source = FakeSource {
            metadata: HashMap::new(),
            participants: Some(vec![
                participant("X", None, false),
                participant("me", Some("Pat"), true),
            ]),
            device_user: None,
            failing_sticker: None,
            identity_offline: false,
        };

        let outcome = resolve_blocking(&source, &request(&[]));
        assert_eq!(outcome.device_user, Some(Some("me".to_string())));
        assert_eq!(outcome.display_names.unwrap()["X"], "Unknown");
    }

    #[test]
    fn test_device_user_known_absent_or_unknown() {
        let mut source = FakeSource {
            metadata: HashMap::new(),
            participants: Some(vec![participant("X", None, false)]),
            device_user: None,
            failing_sticker: None,
            identity_offline: false,
        };
        let outcome = resolve_blocking(&source, &request(&[]));
        assert_eq!(outcome.device_user, Some(None));

        // Share unavailable: nothing rules out a current participant
        source.participants = None;
        let outcome = resolve_blocking(&source, &request(&[]));
        assert_eq!(outcome.device_user, None);

        source.participants = Some(vec![participant("me", None, true)]);
        source.identity_offline = true;
        let outcome = resolve_blocking(&source, &request(&[]));
        assert_eq!(outcome.device_user, Some(Some("me".to_string())));

        source.participants = Some(vec![]);
        let outcome = resolve_blocking(&source, &request(&[]));
        assert_eq!(outcome.device_user, None);
    }

    #[tokio::test]
    async fn test_resolve_runs_on_blocking_pool() {
        let source = Arc::new(FakeSource {
            metadata: HashMap::new(),
            participants: Some(vec![]),
            device_user: Some("me".to_string()),
            failing_sticker: None,
            identity_offline: false,
        });

        let outcome = resolve(source, request(&["s1"])).await;
        assert_eq!(outcome.device_user, Some(Some("me".to_string())));
        assert!(outcome.looked_up.contains("s1"));
    }
}
