//! Core domain types for stickerchart
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Person** | A child whose charts are tracked |
//! | **Chart** | A named reward tracker ("Chores") holding stickers and quick actions |
//! | **Sticker** | One awarded sticker instance tied to a chart |
//! | **Quick Action** | A named shortcut that awards a fixed count of stickers at once |
//! | **Participant** | Someone a chart is shared with through the sync backend |
//! | **Creator** | The participant who added a sticker, once sync metadata says so |
//!
//! Sticker events are immutable. Who added a sticker and when the sync
//! backend saw it live in [`SyncMetadata`], which arrives after the sticker
//! itself and may change as pending writes are attributed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// People
// ============================================

/// A child whose charts are tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Unique identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// When this person was added
    pub created_at: DateTime<Utc>,
}

// ============================================
// Charts
// ============================================

/// Fixed palette a chart can be drawn in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartColor {
    #[default]
    Blue,
    Green,
    Orange,
    Pink,
    Purple,
    Red,
    Teal,
    Yellow,
}

impl ChartColor {
    /// Every selectable color, in picker order
    pub const ALL: [ChartColor; 8] = [
        ChartColor::Blue,
        ChartColor::Green,
        ChartColor::Orange,
        ChartColor::Pink,
        ChartColor::Purple,
        ChartColor::Red,
        ChartColor::Teal,
        ChartColor::Yellow,
    ];

    /// Returns the identifier used in database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartColor::Blue => "blue",
            ChartColor::Green => "green",
            ChartColor::Orange => "orange",
            ChartColor::Pink => "pink",
            ChartColor::Purple => "purple",
            ChartColor::Red => "red",
            ChartColor::Teal => "teal",
            ChartColor::Yellow => "yellow",
        }
    }
}

impl std::fmt::Display for ChartColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ChartColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChartColor::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown chart color: {}", s))
    }
}

/// A named reward tracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    /// Unique identifier
    pub id: String,
    /// Person this chart belongs to (None for shared/unassigned charts)
    pub person_id: Option<String>,
    /// Display name, e.g. "Chores"
    pub name: String,
    /// Accent color
    pub color: ChartColor,
    /// When the chart was created
    pub created_at: DateTime<Utc>,
    /// Shortcuts for awarding several stickers at once
    pub quick_actions: Vec<QuickAction>,
}

impl Chart {
    /// Find a quick action by id or case-insensitive name
    pub fn quick_action(&self, key: &str) -> Option<&QuickAction> {
        self.quick_actions
            .iter()
            .find(|qa| qa.id == key)
            .or_else(|| {
                self.quick_actions
                    .iter()
                    .find(|qa| qa.name.eq_ignore_ascii_case(key))
            })
    }
}

/// A shortcut that awards `sticker_count` stickers in one tap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuickAction {
    /// Unique identifier
    pub id: String,
    /// Owning chart
    pub chart_id: String,
    /// Display name, e.g. "Brushed teeth"
    pub name: String,
    /// Stickers awarded per use
    pub sticker_count: u32,
    /// Sticker image applied
    pub image_name: String,
}

// ============================================
// Stickers
// ============================================

/// One sticker awarded to a chart. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StickerEvent {
    /// Unique, opaque identifier
    pub id: String,
    /// Owning chart
    pub chart_id: String,
    /// Sticker image applied
    pub image_name: String,
    /// Authoritative modification time from the sync backend, in
    /// nanoseconds since the Unix epoch. Absent right after local creation.
    pub server_modification_time: Option<i64>,
}

impl StickerEvent {
    /// Create a locally-added sticker with no server time yet
    pub fn new(
        id: impl Into<String>,
        chart_id: impl Into<String>,
        image_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            chart_id: chart_id.into(),
            image_name: image_name.into(),
            server_modification_time: None,
        }
    }
}

// ============================================
// Sync metadata
// ============================================

/// Per-sticker metadata recorded by the sync layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncMetadata {
    /// Last modification time in nanoseconds since the Unix epoch
    pub user_modification_time: i64,
    /// Identifier of the participant who created the server record, once known
    pub creator_identifier: Option<String>,
}

/// Someone a chart is shared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareParticipant {
    /// Remote user identifier
    pub identifier: String,
    /// Full name from the participant's profile
    pub full_name: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Whether this participant is the user of this device
    pub is_current_user: bool,
}

impl ShareParticipant {
    /// Human-readable name: full name, then email, then "Unknown"
    pub fn display_name(&self) -> String {
        self.full_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.as_deref().filter(|e| !e.trim().is_empty()))
            .unwrap_or("Unknown")
            .to_string()
    }
}

// ============================================
// Navigation
// ============================================

/// Top-level tab selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    #[default]
    Charts,
    History,
    People,
    Settings,
}
