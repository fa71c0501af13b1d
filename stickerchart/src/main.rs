//! stickerchart - reward charts for kids
//!
//! Command-line front end over `stickerchart-core`. Every change goes
//! through the store's reducer and the resulting effects are written to
//! SQLite in one transaction.
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/stickerchart/data.db (~/.local/share/stickerchart/data.db)
//! - Logs: $XDG_STATE_HOME/stickerchart/stickerchart.log (~/.local/state/stickerchart/stickerchart.log)
//! - Config: $XDG_CONFIG_HOME/stickerchart/config.toml (~/.config/stickerchart/config.toml)

mod cli;
mod lookup;
mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{Local, Utc};
use clap::Parser;
use stickerchart_core::config::HistoryConfig;
use stickerchart_core::{
    Action, Config, Database, Error, HistoryView, ShareParticipant, Store, SyncMetadata,
};

use crate::cli::{
    Args, ChartCommand, Command, HistoryArgs, OutputFormat, PersonCommand, QuickActionCommand,
    StickerCommand, SyncCommand, SyncStatus,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Ensure XDG environment variables are set before using core library
    Config::ensure_xdg_env();

    let config = Config::load().context("failed to load configuration")?;

    let _log_guard = stickerchart_core::logging::init(&config.logging)
        .context("failed to initialize logging")?;

    let db_path = Config::database_path();
    tracing::info!(path = %db_path.display(), "Opening database");

    let db = Database::open(&db_path).context("failed to open database")?;
    db.migrate().context("failed to run database migrations")?;

    let state = db.load_app_state().context("failed to load charts")?;
    let mut store = Store::new(state, config.stickers.clone());

    match args.command {
        Command::Person(cmd) => person(&mut store, &db, cmd),
        Command::Chart(cmd) => chart(&mut store, &db, cmd),
        Command::QuickAction(cmd) => quick_action(&mut store, &db, &config, cmd),
        Command::Sticker(cmd) => sticker(&mut store, &db, &config, cmd),
        Command::History(history_args) => {
            history(&store, Arc::new(db), config.history.clone(), history_args).await
        }
        Command::Sync(cmd) => sync(&store, &db, cmd),
    }
}

/// Reduce an action and persist its effects.
fn commit(store: &mut Store, db: &Database, action: Action) -> Result<()> {
    let effects = store.dispatch(action)?;
    db.apply_effects(&effects).context("failed to save changes")?;
    Ok(())
}

fn person(store: &mut Store, db: &Database, cmd: PersonCommand) -> Result<()> {
    match cmd {
        PersonCommand::Add { name } => {
            commit(store, db, Action::add_person(name))?;
            if let Some(person) = store.state().people.last() {
                println!("Added {} ({})", person.name, render::short_id(&person.id));
            }
        }
        PersonCommand::List => print!("{}", render::people_text(store.state())),
        PersonCommand::Select { person } => {
            let person_id = match person {
                Some(key) => Some(lookup::person(store.state(), &key)?.id.clone()),
                None => None,
            };
            commit(store, db, Action::SelectPerson { person_id })?;
            let state = store.state();
            match state.selected_person_id.as_deref().and_then(|id| state.person(id)) {
                Some(person) => println!("Showing charts for {}", person.name),
                None => println!("Showing all charts"),
            }
        }
    }
    Ok(())
}

fn chart(store: &mut Store, db: &Database, cmd: ChartCommand) -> Result<()> {
    match cmd {
        ChartCommand::Add {
            name,
            color,
            person,
        } => {
            let person_id = match person {
                Some(key) => Some(lookup::person(store.state(), &key)?.id.clone()),
                None => None,
            };
            commit(store, db, Action::create_chart(name, color, person_id))?;
            if let Some(chart) = store.state().charts.last() {
                println!("Created chart {} ({})", chart.name, render::short_id(&chart.id));
            }
        }
        ChartCommand::List => print!("{}", render::charts_text(store.state())),
        ChartCommand::Rename { chart, name } => {
            let chart_id = lookup::chart(store.state(), &chart)?.id.clone();
            commit(store, db, Action::RenameChart { chart_id, name })?;
            println!("Renamed chart");
        }
        ChartCommand::Color { chart, color } => {
            let chart_id = lookup::chart(store.state(), &chart)?.id.clone();
            commit(store, db, Action::SetChartColor { chart_id, color })?;
            println!("Chart color set to {}", color);
        }
        ChartCommand::Delete { chart } => {
            let chart = lookup::chart(store.state(), &chart)?;
            let (chart_id, name) = (chart.id.clone(), chart.name.clone());
            commit(store, db, Action::DeleteChart { chart_id })?;
            println!("Deleted chart {}", name);
        }
    }
    Ok(())
}

fn quick_action(
    store: &mut Store,
    db: &Database,
    config: &Config,
    cmd: QuickActionCommand,
) -> Result<()> {
    match cmd {
        QuickActionCommand::Add {
            chart,
            name,
            count,
            image,
        } => {
            let chart_id = lookup::chart(store.state(), &chart)?.id.clone();
            let image = image.unwrap_or_else(|| config.stickers.default_image.clone());
            commit(
                store,
                db,
                Action::add_quick_action(chart_id, name.clone(), count, image),
            )?;
            println!("Added quick action {} ({} per use)", name.trim(), count);
        }
        QuickActionCommand::Remove { chart, name } => {
            let chart = lookup::chart(store.state(), &chart)?;
            let quick_action = chart
                .quick_action(&name)
                .ok_or_else(|| Error::QuickActionNotFound(name.clone()))?;
            let action = Action::RemoveQuickAction {
                chart_id: chart.id.clone(),
                quick_action_id: quick_action.id.clone(),
            };
            commit(store, db, action)?;
            println!("Removed quick action {}", name);
        }
        QuickActionCommand::Apply { chart, name } => {
            let chart = lookup::chart(store.state(), &chart)?;
            let quick_action = chart
                .quick_action(&name)
                .ok_or_else(|| Error::QuickActionNotFound(name.clone()))?;
            let message = format!(
                "Awarded {} {} to {}",
                quick_action.sticker_count, quick_action.image_name, chart.name
            );
            let action = Action::apply_quick_action(chart.id.clone(), quick_action.id.clone());
            commit(store, db, action)?;
            println!("{}", message);
        }
    }
    Ok(())
}

fn sticker(store: &mut Store, db: &Database, config: &Config, cmd: StickerCommand) -> Result<()> {
    match cmd {
        StickerCommand::Add { chart, image } => {
            let chart = lookup::chart(store.state(), &chart)?;
            let chart_name = chart.name.clone();
            let image = image.unwrap_or_else(|| config.stickers.default_image.clone());
            let action = Action::add_sticker(chart.id.clone(), image.clone());
            commit(store, db, action)?;
            println!("Added {} to {}", image, chart_name);
        }
        StickerCommand::Remove { id } => {
            let sticker = db
                .get_sticker(&id)?
                .ok_or_else(|| Error::StickerNotFound(id.clone()))?;
            commit(
                store,
                db,
                Action::RemoveSticker {
                    chart_id: sticker.chart_id,
                    sticker_id: sticker.id,
                },
            )?;
            println!("Removed sticker {}", id);
        }
    }
    Ok(())
}

async fn history(
    store: &Store,
    db: Arc<Database>,
    mut history_config: HistoryConfig,
    args: HistoryArgs,
) -> Result<()> {
    let chart = lookup::chart(store.state(), &args.chart)?;
    if let Some(window_secs) = args.window_secs {
        history_config.window_secs = window_secs;
        history_config.validate()?;
    }

    let now = Utc::now();
    let mut view = HistoryView::new(chart.id.clone(), history_config, now);
    let changes = view
        .sync_with(db, now)
        .await
        .context("failed to load stickers")?;
    tracing::debug!(chart_id = %chart.id, ?changes, "History loaded");

    let groups = view.groups_local();
    match args.format {
        OutputFormat::Text => print!(
            "{}",
            render::history_text(&chart.name, &groups, Local::now().date_naive(), &Local)
        ),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&groups)?),
    }
    Ok(())
}

fn sync(store: &Store, db: &Database, cmd: SyncCommand) -> Result<()> {
    match cmd {
        SyncCommand::DeviceUser { id } => {
            db.set_device_user(id.as_deref())?;
            match id {
                Some(id) => println!("Device user set to {}", id),
                None => println!("Device user cleared"),
            }
        }
        SyncCommand::Attribute {
            sticker,
            creator,
            modified_ns,
            server_ns,
        } => {
            let existing = db.get_sync_metadata(&sticker)?;
            let metadata = SyncMetadata {
                user_modification_time: modified_ns
                    .or(existing.as_ref().map(|m| m.user_modification_time))
                    .or_else(|| Utc::now().timestamp_nanos_opt())
                    .unwrap_or_default(),
                creator_identifier: creator.or(existing.and_then(|m| m.creator_identifier)),
            };
            db.upsert_sync_metadata(&sticker, &metadata)?;
            if let Some(server_ns) = server_ns {
                db.set_server_modification_time(&sticker, server_ns)?;
            }
            println!("Updated sync metadata for {}", sticker);
        }
        SyncCommand::Participant {
            chart,
            id,
            name,
            email,
            current,
        } => {
            let chart = lookup::chart(store.state(), &chart)?;
            let participant = ShareParticipant {
                identifier: id,
                full_name: name,
                email,
                is_current_user: current,
            };
            db.upsert_share_participant(&chart.id, &participant)?;
            println!("{} shares {}", participant.display_name(), chart.name);
        }
        SyncCommand::Status { status } => {
            let in_progress = status == SyncStatus::InProgress;
            db.set_sync_in_progress(in_progress)?;
            println!("Sync {}", if in_progress { "in progress" } else { "idle" });
        }
    }
    Ok(())
}
