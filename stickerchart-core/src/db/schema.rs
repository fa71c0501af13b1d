//! Database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: people, charts, quick actions, stickers
    r#"
    CREATE TABLE IF NOT EXISTS people (
        id               TEXT PRIMARY KEY,
        name             TEXT NOT NULL,
        created_at       DATETIME NOT NULL
    );

    CREATE TABLE IF NOT EXISTS charts (
        id               TEXT PRIMARY KEY,
        person_id        TEXT REFERENCES people(id) ON DELETE SET NULL,
        name             TEXT NOT NULL,
        color            TEXT NOT NULL,      -- 'blue', 'green', ...
        created_at       DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_charts_person ON charts(person_id);

    CREATE TABLE IF NOT EXISTS quick_actions (
        id               TEXT PRIMARY KEY,
        chart_id         TEXT NOT NULL REFERENCES charts(id) ON DELETE CASCADE,
        name             TEXT NOT NULL,
        sticker_count    INTEGER NOT NULL,
        image_name       TEXT NOT NULL,
        position         INTEGER NOT NULL DEFAULT 0
    );

    CREATE INDEX IF NOT EXISTS idx_quick_actions_chart ON quick_actions(chart_id, position);

    -- Stickers are immutable; rows only ever get inserted or deleted
    CREATE TABLE IF NOT EXISTS stickers (
        id                       TEXT PRIMARY KEY,
        chart_id                 TEXT NOT NULL REFERENCES charts(id) ON DELETE CASCADE,
        image_name               TEXT NOT NULL,
        server_modification_time INTEGER,    -- ns since epoch, once the server has it
        created_at               DATETIME NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_stickers_chart ON stickers(chart_id);
    "#,
    // Version 2: sync metadata, share participants, settings
    r#"
    CREATE TABLE IF NOT EXISTS sticker_sync_metadata (
        sticker_id             TEXT PRIMARY KEY REFERENCES stickers(id) ON DELETE CASCADE,
        user_modification_time INTEGER NOT NULL,   -- ns since epoch
        creator_identifier     TEXT                -- NULL until the server record is known
    );

    CREATE TABLE IF NOT EXISTS share_participants (
        chart_id         TEXT NOT NULL REFERENCES charts(id) ON DELETE CASCADE,
        identifier       TEXT NOT NULL,
        full_name        TEXT,
        email            TEXT,
        is_current_user  INTEGER NOT NULL DEFAULT 0,

        PRIMARY KEY (chart_id, identifier)
    );

    CREATE TABLE IF NOT EXISTS settings (
        key              TEXT PRIMARY KEY,
        value            TEXT NOT NULL
    );
    "#,
];

/// Run all pending migrations
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version: i32 = conn
        .query_row("PRAGMA user_version", [], |r| r.get(0))
        .unwrap_or(0);

    tracing::info!(
        current_version,
        target_version = SCHEMA_VERSION,
        "Checking database migrations"
    );

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running migration");
            conn.execute_batch(migration)?;
            conn.execute(&format!("PRAGMA user_version = {}", version), [])?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::info!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
