//! Database repository layer
//!
//! Provides query and insert operations for all entity types, and applies
//! the [`Effect`]s produced by the reducer.

use crate::error::{Error, Result};
use crate::history::SyncMetadataSource;
use crate::store::{AppState, Effect};
use crate::types::*;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

const SETTING_DEVICE_USER: &str = "device_user";
const SETTING_SYNC_IN_PROGRESS: &str = "sync_in_progress";
const SETTING_SELECTED_PERSON: &str = "selected_person";
const SETTING_SELECTED_TAB: &str = "selected_tab";

/// Database handle (single connection)
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        let conn = self.conn();
        super::schema::run_migrations(&conn)
    }

    /// Get the underlying connection (for advanced use)
    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn()
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock leaves SQLite itself consistent.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ============================================
    // People
    // ============================================

    /// Insert or update a person
    pub fn upsert_person(&self, person: &Person) -> Result<()> {
        upsert_person(&self.conn(), person)
    }

    /// Get a person by ID
    pub fn get_person(&self, id: &str) -> Result<Option<Person>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM people WHERE id = ?", [id], row_to_person)
            .optional()
            .map_err(Error::from)
    }

    /// List people in the order they were added
    pub fn list_people(&self) -> Result<Vec<Person>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM people ORDER BY created_at, id")?;
        let people = stmt
            .query_map([], row_to_person)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(people)
    }

    // ============================================
    // Charts
    // ============================================

    /// Insert or update a chart row (quick actions are stored separately)
    pub fn upsert_chart(&self, chart: &Chart) -> Result<()> {
        upsert_chart(&self.conn(), chart)
    }

    /// Get a chart with its quick actions
    pub fn get_chart(&self, id: &str) -> Result<Option<Chart>> {
        let conn = self.conn();
        let chart = conn
            .query_row("SELECT * FROM charts WHERE id = ?", [id], row_to_chart)
            .optional()?;
        match chart {
            Some(mut chart) => {
                chart.quick_actions = quick_actions_for(&conn, &chart.id)?;
                Ok(Some(chart))
            }
            None => Ok(None),
        }
    }

    /// List all charts with their quick actions, oldest first
    pub fn list_charts(&self) -> Result<Vec<Chart>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT * FROM charts ORDER BY created_at, id")?;
        let mut charts = stmt
            .query_map([], row_to_chart)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        for chart in &mut charts {
            chart.quick_actions = quick_actions_for(&conn, &chart.id)?;
        }
        Ok(charts)
    }

    /// Delete a chart; stickers, quick actions, metadata and participants go with it
    pub fn delete_chart(&self, id: &str) -> Result<()> {
        delete_chart(&self.conn(), id)
    }

    // ============================================
    // Quick actions
    // ============================================

    /// Insert or update a quick action at a list position
    pub fn upsert_quick_action(&self, quick_action: &QuickAction, position: usize) -> Result<()> {
        upsert_quick_action(&self.conn(), quick_action, position)
    }

    // ============================================
    // Stickers
    // ============================================

    /// Insert stickers, recording `recorded_at` as their local modification time
    pub fn insert_stickers(&self, stickers: &[StickerEvent], recorded_at: DateTime<Utc>) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        insert_stickers(&tx, stickers, recorded_at)?;
        tx.commit()?;
        Ok(())
    }

    /// Get a sticker by ID
    pub fn get_sticker(&self, id: &str) -> Result<Option<StickerEvent>> {
        let conn = self.conn();
        conn.query_row("SELECT * FROM stickers WHERE id = ?", [id], row_to_sticker)
            .optional()
            .map_err(Error::from)
    }

    /// All stickers of a chart, in insertion order
    pub fn list_stickers(&self, chart_id: &str) -> Result<Vec<StickerEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM stickers WHERE chart_id = ? ORDER BY created_at, id",
        )?;
        let stickers = stmt
            .query_map([chart_id], row_to_sticker)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stickers)
    }

    /// Sticker count per chart id
    pub fn sticker_counts(&self) -> Result<HashMap<String, usize>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT chart_id, COUNT(*) FROM stickers GROUP BY chart_id")?;
        let counts = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })?
            .collect::<rusqlite::Result<HashMap<_, _>>>()?;
        Ok(counts)
    }

    /// Delete one sticker from a chart
    pub fn delete_sticker(&self, chart_id: &str, id: &str) -> Result<()> {
        delete_sticker(&self.conn(), chart_id, id)
    }

    /// Record the server's modification time for a sticker
    pub fn set_server_modification_time(&self, sticker_id: &str, nanos: i64) -> Result<()> {
        let conn = self.conn();
        let updated = conn.execute(
            "UPDATE stickers SET server_modification_time = ?1 WHERE id = ?2",
            params![nanos, sticker_id],
        )?;
        if updated == 0 {
            return Err(Error::StickerNotFound(sticker_id.to_string()));
        }
        Ok(())
    }

    // ============================================
    // Sync metadata
    // ============================================

    /// Insert or replace sync metadata for a sticker
    pub fn upsert_sync_metadata(&self, sticker_id: &str, metadata: &SyncMetadata) -> Result<()> {
        let conn = self.conn();
        if !sticker_exists(&conn, sticker_id)? {
            return Err(Error::StickerNotFound(sticker_id.to_string()));
        }
        upsert_sync_metadata(&conn, sticker_id, metadata)
    }

    /// Sync metadata for a sticker
    pub fn get_sync_metadata(&self, sticker_id: &str) -> Result<Option<SyncMetadata>> {
        let conn = self.conn();
        conn.query_row(
            "SELECT user_modification_time, creator_identifier
             FROM sticker_sync_metadata WHERE sticker_id = ?",
            [sticker_id],
            |row| {
                Ok(SyncMetadata {
                    user_modification_time: row.get(0)?,
                    creator_identifier: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(Error::from)
    }

    /// Insert or update a participant of a chart's share
    pub fn upsert_share_participant(&self, chart_id: &str, participant: &ShareParticipant) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            r#"
            INSERT INTO share_participants (chart_id, identifier, full_name, email, is_current_user)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(chart_id, identifier) DO UPDATE SET
                full_name = excluded.full_name,
                email = excluded.email,
                is_current_user = excluded.is_current_user
            "#,
            params![
                chart_id,
                participant.identifier,
                participant.full_name,
                participant.email,
                participant.is_current_user,
            ],
        )?;
        Ok(())
    }

    /// Participants of a chart's share
    pub fn list_share_participants(&self, chart_id: &str) -> Result<Vec<ShareParticipant>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT identifier, full_name, email, is_current_user
             FROM share_participants WHERE chart_id = ? ORDER BY identifier",
        )?;
        let participants = stmt
            .query_map([chart_id], |row| {
                Ok(ShareParticipant {
                    identifier: row.get(0)?,
                    full_name: row.get(1)?,
                    email: row.get(2)?,
                    is_current_user: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(participants)
    }

    // ============================================
    // Settings
    // ============================================

    /// Read a setting
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        get_setting(&self.conn(), key)
    }

    /// Write a setting; `None` removes it
    pub fn set_setting(&self, key: &str, value: Option<&str>) -> Result<()> {
        set_setting(&self.conn(), key, value)
    }

    /// Identifier of this device's user, if recorded
    pub fn device_user(&self) -> Result<Option<String>> {
        self.get_setting(SETTING_DEVICE_USER)
    }

    pub fn set_device_user(&self, identifier: Option<&str>) -> Result<()> {
        self.set_setting(SETTING_DEVICE_USER, identifier)
    }

    /// Whether a sync pass is marked as running
    pub fn is_sync_in_progress(&self) -> Result<bool> {
        Ok(self.get_setting(SETTING_SYNC_IN_PROGRESS)?.as_deref() == Some("true"))
    }

    pub fn set_sync_in_progress(&self, in_progress: bool) -> Result<()> {
        let value = if in_progress { "true" } else { "false" };
        self.set_setting(SETTING_SYNC_IN_PROGRESS, Some(value))
    }

    // ============================================
    // App state
    // ============================================

    /// Load everything the store starts from
    pub fn load_app_state(&self) -> Result<AppState> {
        let people = self.list_people()?;
        let charts = self.list_charts()?;
        let mut sticker_counts = self.sticker_counts()?;
        for chart in &charts {
            sticker_counts.entry(chart.id.clone()).or_insert(0);
        }

        let selected_person_id = self
            .get_setting(SETTING_SELECTED_PERSON)?
            .filter(|id| people.iter().any(|p| &p.id == id));
        let selected_tab = self
            .get_setting(SETTING_SELECTED_TAB)?
            .and_then(|s| serde_json::from_value(serde_json::Value::String(s)).ok())
            .unwrap_or_default();

        Ok(AppState {
            people,
            charts,
            sticker_counts,
            selected_person_id,
            selected_tab,
        })
    }

    /// Apply reducer effects in one transaction
    pub fn apply_effects(&self, effects: &[Effect]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        for effect in effects {
            apply_effect(&tx, effect)?;
        }
        tx.commit()?;
        tracing::debug!(count = effects.len(), "Applied effects");
        Ok(())
    }
}

impl SyncMetadataSource for Database {
    fn stickers_for_chart(&self, chart_id: &str) -> Result<Vec<StickerEvent>> {
        self.list_stickers(chart_id)
    }

    fn sync_metadata(&self, sticker_id: &str) -> Result<Option<SyncMetadata>> {
        self.get_sync_metadata(sticker_id)
    }

    fn share_participants(&self, chart_id: &str) -> Result<Vec<ShareParticipant>> {
        self.list_share_participants(chart_id)
    }

    fn current_user_identifier(&self) -> Result<Option<String>> {
        self.device_user()
    }

    fn sync_in_progress(&self) -> Result<bool> {
        self.is_sync_in_progress()
    }
}

// ============================================
// Connection-level helpers (shared by methods and transactions)
// ============================================

fn apply_effect(conn: &Connection, effect: &Effect) -> Result<()> {
    match effect {
        Effect::SavePerson(person) => upsert_person(conn, person),
        Effect::SaveChart(chart) => upsert_chart(conn, chart),
        Effect::DeleteChart { chart_id } => delete_chart(conn, chart_id),
        Effect::SaveQuickAction {
            quick_action,
            position,
        } => upsert_quick_action(conn, quick_action, *position),
        Effect::DeleteQuickAction { quick_action_id } => {
            conn.execute("DELETE FROM quick_actions WHERE id = ?", [quick_action_id])?;
            Ok(())
        }
        Effect::InsertStickers {
            stickers,
            recorded_at,
        } => insert_stickers(conn, stickers, *recorded_at),
        Effect::DeleteSticker {
            chart_id,
            sticker_id,
        } => delete_sticker(conn, chart_id, sticker_id),
        Effect::SaveSelection { person_id, tab } => {
            set_setting(conn, SETTING_SELECTED_PERSON, person_id.as_deref())?;
            let tab = serde_json::to_value(tab)?;
            set_setting(conn, SETTING_SELECTED_TAB, tab.as_str())
        }
    }
}

fn upsert_person(conn: &Connection, person: &Person) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO people (id, name, created_at)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name
        "#,
        params![person.id, person.name, person.created_at.to_rfc3339()],
    )?;
    Ok(())
}

fn upsert_chart(conn: &Connection, chart: &Chart) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO charts (id, person_id, name, color, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5)
        ON CONFLICT(id) DO UPDATE SET
            person_id = excluded.person_id,
            name = excluded.name,
            color = excluded.color
        "#,
        params![
            chart.id,
            chart.person_id,
            chart.name,
            chart.color.as_str(),
            chart.created_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

fn delete_chart(conn: &Connection, id: &str) -> Result<()> {
    let deleted = conn.execute("DELETE FROM charts WHERE id = ?", [id])?;
    if deleted == 0 {
        return Err(Error::ChartNotFound(id.to_string()));
    }
    tracing::info!(chart_id = %id, "Deleted chart");
    Ok(())
}

fn upsert_quick_action(conn: &Connection, quick_action: &QuickAction, position: usize) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO quick_actions (id, chart_id, name, sticker_count, image_name, position)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            sticker_count = excluded.sticker_count,
            image_name = excluded.image_name,
            position = excluded.position
        "#,
        params![
            quick_action.id,
            quick_action.chart_id,
            quick_action.name,
            quick_action.sticker_count,
            quick_action.image_name,
            position as i64,
        ],
    )?;
    Ok(())
}

fn quick_actions_for(conn: &Connection, chart_id: &str) -> Result<Vec<QuickAction>> {
    let mut stmt = conn.prepare(
        "SELECT id, chart_id, name, sticker_count, image_name
         FROM quick_actions WHERE chart_id = ? ORDER BY position, id",
    )?;
    let quick_actions = stmt
        .query_map([chart_id], |row| {
            Ok(QuickAction {
                id: row.get(0)?,
                chart_id: row.get(1)?,
                name: row.get(2)?,
                sticker_count: row.get(3)?,
                image_name: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(quick_actions)
}

fn insert_stickers(conn: &Connection, stickers: &[StickerEvent], recorded_at: DateTime<Utc>) -> Result<()> {
    // Local writes carry a modification time but no creator until the server
    // record comes back.
    let recorded_nanos = recorded_at.timestamp_nanos_opt().unwrap_or_default();
    for sticker in stickers {
        conn.execute(
            r#"
            INSERT INTO stickers (id, chart_id, image_name, server_modification_time, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                sticker.id,
                sticker.chart_id,
                sticker.image_name,
                sticker.server_modification_time,
                recorded_at.to_rfc3339(),
            ],
        )?;
        upsert_sync_metadata(
            conn,
            &sticker.id,
            &SyncMetadata {
                user_modification_time: recorded_nanos,
                creator_identifier: None,
            },
        )?;
    }
    tracing::debug!(count = stickers.len(), "Inserted stickers");
    Ok(())
}

fn delete_sticker(conn: &Connection, chart_id: &str, id: &str) -> Result<()> {
    let deleted = conn.execute(
        "DELETE FROM stickers WHERE id = ?1 AND chart_id = ?2",
        params![id, chart_id],
    )?;
    if deleted == 0 {
        return Err(Error::StickerNotFound(id.to_string()));
    }
    Ok(())
}

fn sticker_exists(conn: &Connection, id: &str) -> Result<bool> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM stickers WHERE id = ?", [id], |r| r.get(0))?;
    Ok(count > 0)
}

fn upsert_sync_metadata(conn: &Connection, sticker_id: &str, metadata: &SyncMetadata) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO sticker_sync_metadata (sticker_id, user_modification_time, creator_identifier)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(sticker_id) DO UPDATE SET
            user_modification_time = excluded.user_modification_time,
            creator_identifier = excluded.creator_identifier
        "#,
        params![sticker_id, metadata.user_modification_time, metadata.creator_identifier],
    )?;
    Ok(())
}

fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row("SELECT value FROM settings WHERE key = ?", [key], |r| r.get(0))
        .optional()
        .map_err(Error::from)
}

fn set_setting(conn: &Connection, key: &str, value: Option<&str>) -> Result<()> {
    match value {
        Some(value) => conn.execute(
            r#"
            INSERT INTO settings (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value
            "#,
            params![key, value],
        )?,
        None => conn.execute("DELETE FROM settings WHERE key = ?", [key])?,
    };
    Ok(())
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_person(row: &Row) -> rusqlite::Result<Person> {
    let created_at_str: String = row.get("created_at")?;
    Ok(Person {
        id: row.get("id")?,
        name: row.get("name")?,
        created_at: parse_timestamp(&created_at_str),
    })
}

fn row_to_chart(row: &Row) -> rusqlite::Result<Chart> {
    let color_str: String = row.get("color")?;
    let created_at_str: String = row.get("created_at")?;
    Ok(Chart {
        id: row.get("id")?,
        person_id: row.get("person_id")?,
        name: row.get("name")?,
        color: color_str.parse().unwrap_or_default(),
        created_at: parse_timestamp(&created_at_str),
        quick_actions: Vec::new(),
    })
}

fn row_to_sticker(row: &Row) -> rusqlite::Result<StickerEvent> {
    Ok(StickerEvent {
        id: row.get("id")?,
        chart_id: row.get("chart_id")?,
        image_name: row.get("image_name")?,
        server_modification_time: row.get("server_modification_time")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StickerConfig;
    use crate::store::{Action, Store};

    fn test_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    fn create_test_chart(db: &Database, id: &str) -> Chart {
        let chart = Chart {
            id: id.to_string(),
            person_id: None,
            name: format!("Chart {}", id),
            color: ChartColor::Orange,
            created_at: Utc::now(),
            quick_actions: vec![],
        };
        db.upsert_chart(&chart).unwrap();
        chart
    }

    #[test]
    fn test_chart_crud() {
        let db = test_db();
        let chart = create_test_chart(&db, "c1");

        let retrieved = db.get_chart("c1").unwrap().unwrap();
        assert_eq!(retrieved.name, chart.name);
        assert_eq!(retrieved.color, ChartColor::Orange);

        assert_eq!(db.list_charts().unwrap().len(), 1);

        db.delete_chart("c1").unwrap();
        assert!(db.get_chart("c1").unwrap().is_none());
        assert!(matches!(db.delete_chart("c1"), Err(Error::ChartNotFound(_))));
    }

    #[test]
    fn test_sticker_insert_records_metadata() {
        let db = test_db();
        create_test_chart(&db, "c1");
        let recorded_at = Utc::now();

        db.insert_stickers(&[StickerEvent::new("s1", "c1", "star")], recorded_at)
            .unwrap();

        let stickers = db.list_stickers("c1").unwrap();
        assert_eq!(stickers.len(), 1);
        assert_eq!(stickers[0].server_modification_time, None);

        let metadata = db.get_sync_metadata("s1").unwrap().unwrap();
        assert_eq!(
            metadata.user_modification_time,
            recorded_at.timestamp_nanos_opt().unwrap()
        );
        assert!(metadata.creator_identifier.is_none());
    }

    #[test]
    fn test_chart_delete_cascades() {
        let db = test_db();
        create_test_chart(&db, "c1");
        db.insert_stickers(&[StickerEvent::new("s1", "c1", "star")], Utc::now())
            .unwrap();
        db.upsert_share_participant(
            "c1",
            &ShareParticipant {
                identifier: "X".to_string(),
                full_name: None,
                email: None,
                is_current_user: false,
            },
        )
        .unwrap();

        db.delete_chart("c1").unwrap();
        assert!(db.get_sticker("s1").unwrap().is_none());
        assert!(db.get_sync_metadata("s1").unwrap().is_none());
        assert!(db.list_share_participants("c1").unwrap().is_empty());
    }

    #[test]
    fn test_metadata_for_missing_sticker() {
        let db = test_db();
        let metadata = SyncMetadata {
            user_modification_time: 1,
            creator_identifier: Some("X".to_string()),
        };
        assert!(matches!(
            db.upsert_sync_metadata("nope", &metadata),
            Err(Error::StickerNotFound(_))
        ));
    }

    #[test]
    fn test_settings_round_trip() {
        let db = test_db();
        assert_eq!(db.device_user().unwrap(), None);
        db.set_device_user(Some("me")).unwrap();
        assert_eq!(db.device_user().unwrap().as_deref(), Some("me"));
        db.set_device_user(None).unwrap();
        assert_eq!(db.device_user().unwrap(), None);

        assert!(!db.is_sync_in_progress().unwrap());
        db.set_sync_in_progress(true).unwrap();
        assert!(db.is_sync_in_progress().unwrap());
    }

    #[test]
    fn test_effects_round_trip_through_store() {
        let db = test_db();
        let mut store = Store::new(db.load_app_state().unwrap(), StickerConfig::default());

        let add_person = Action::add_person("Ada");
        let Action::AddPerson { id: ada, .. } = &add_person else {
            unreachable!()
        };
        let ada = ada.clone();
        let effects = store.dispatch(add_person).unwrap();
        db.apply_effects(&effects).unwrap();

        let create = Action::create_chart("Chores", ChartColor::Teal, Some(ada.clone()));
        let Action::CreateChart { id: chart_id, .. } = &create else {
            unreachable!()
        };
        let chart_id = chart_id.clone();
        db.apply_effects(&store.dispatch(create).unwrap()).unwrap();

        let add_qa = Action::add_quick_action(&chart_id, "Tidy room", 2, "heart");
        let Action::AddQuickAction { id: qa_id, .. } = &add_qa else {
            unreachable!()
        };
        let qa_id = qa_id.clone();
        db.apply_effects(&store.dispatch(add_qa).unwrap()).unwrap();
        db.apply_effects(
            &store
                .dispatch(Action::apply_quick_action(&chart_id, &qa_id))
                .unwrap(),
        )
        .unwrap();
        db.apply_effects(
            &store
                .dispatch(Action::SelectPerson {
                    person_id: Some(ada.clone()),
                })
                .unwrap(),
        )
        .unwrap();

        let loaded = db.load_app_state().unwrap();
        assert_eq!(loaded, *store.state());
        assert_eq!(loaded.sticker_count(&chart_id), 2);
        assert_eq!(loaded.selected_person_id.as_deref(), Some(ada.as_str()));
        assert_eq!(loaded.charts[0].quick_actions[0].name, "Tidy room");
    }

    #[test]
    fn test_failed_effect_rolls_back() {
        let db = test_db();
        create_test_chart(&db, "c1");

        let effects = vec![
            Effect::InsertStickers {
                stickers: vec![StickerEvent::new("s1", "c1", "star")],
                recorded_at: Utc::now(),
            },
            Effect::DeleteSticker {
                chart_id: "c1".to_string(),
                sticker_id: "missing".to_string(),
            },
        ];
        assert!(db.apply_effects(&effects).is_err());
        assert!(db.list_stickers("c1").unwrap().is_empty());
    }

    #[test]
    fn test_delete_sticker_scoped_to_chart() {
        let db = test_db();
        create_test_chart(&db, "c1");
        create_test_chart(&db, "c2");
        db.insert_stickers(&[StickerEvent::new("s1", "c2", "star")], Utc::now())
            .unwrap();

        let wrong_chart = vec![Effect::DeleteSticker {
            chart_id: "c1".to_string(),
            sticker_id: "s1".to_string(),
        }];
        assert!(matches!(
            db.apply_effects(&wrong_chart),
            Err(Error::StickerNotFound(_))
        ));
        assert!(db.get_sticker("s1").unwrap().is_some());
        assert_eq!(db.sticker_counts().unwrap().get("c2"), Some(&1));

        db.delete_sticker("c2", "s1").unwrap();
        assert!(db.get_sticker("s1").unwrap().is_none());
    }
}
