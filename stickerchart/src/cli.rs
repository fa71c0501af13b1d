//! Command-line arguments.

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use stickerchart_core::ChartColor;

#[derive(Parser)]
#[command(name = "stickerchart")]
#[command(about = "Reward charts and sticker history")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Manage people
    #[command(subcommand)]
    Person(PersonCommand),

    /// Manage charts
    #[command(subcommand)]
    Chart(ChartCommand),

    /// Manage and use quick actions
    #[command(subcommand, name = "quick-action")]
    QuickAction(QuickActionCommand),

    /// Add or remove single stickers
    #[command(subcommand)]
    Sticker(StickerCommand),

    /// Show a chart's sticker history
    History(HistoryArgs),

    /// Record what the sync backend reports
    #[command(subcommand)]
    Sync(SyncCommand),
}

#[derive(Subcommand)]
pub enum PersonCommand {
    /// Add a person
    Add { name: String },
    /// List people (the selected one is marked with *)
    List,
    /// Select whose charts are shown; omit to show everyone's
    Select { person: Option<String> },
}

#[derive(Subcommand)]
pub enum ChartCommand {
    /// Create a chart
    Add {
        name: String,
        #[arg(long, default_value = "blue")]
        color: ChartColor,
        /// Person the chart belongs to
        #[arg(long)]
        person: Option<String>,
    },
    /// List charts for the selected person
    List,
    /// Rename a chart
    Rename { chart: String, name: String },
    /// Change a chart's color
    Color { chart: String, color: ChartColor },
    /// Delete a chart and all of its stickers
    Delete { chart: String },
}

#[derive(Subcommand)]
pub enum QuickActionCommand {
    /// Add a quick action to a chart
    Add {
        chart: String,
        name: String,
        /// Stickers awarded each time
        #[arg(long, default_value_t = 1)]
        count: u32,
        /// Sticker image (defaults to the configured image)
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a quick action
    Remove { chart: String, name: String },
    /// Award a quick action's stickers
    Apply { chart: String, name: String },
}

#[derive(Subcommand)]
pub enum StickerCommand {
    /// Add one sticker to a chart
    Add {
        chart: String,
        #[arg(long)]
        image: Option<String>,
    },
    /// Remove a sticker by id
    Remove { id: String },
}

#[derive(ClapArgs)]
pub struct HistoryArgs {
    pub chart: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Batch window in seconds (overrides config)
    #[arg(long)]
    pub window_secs: Option<u64>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum SyncCommand {
    /// Set (or clear, with no id) the identity of this device's user
    DeviceUser { id: Option<String> },

    /// Set a sticker's creator and modification time
    Attribute {
        sticker: String,
        #[arg(long)]
        creator: Option<String>,
        /// User modification time, nanoseconds since the Unix epoch
        #[arg(long, allow_negative_numbers = true)]
        modified_ns: Option<i64>,
        /// Server record modification time, nanoseconds since the Unix epoch
        #[arg(long, allow_negative_numbers = true)]
        server_ns: Option<i64>,
    },

    /// Add or update a share participant of a chart
    Participant {
        chart: String,
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// This participant is the user of this device
        #[arg(long)]
        current: bool,
    },

    /// Mark a sync pass as running or finished
    Status {
        #[arg(value_enum)]
        status: SyncStatus,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SyncStatus {
    InProgress,
    Idle,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parses_history_flags() {
        let args = Args::parse_from([
            "stickerchart",
            "history",
            "Chores",
            "--format",
            "json",
            "--window-secs",
            "60",
        ]);
        let Command::History(history) = args.command else {
            panic!("expected history command");
        };
        assert_eq!(history.chart, "Chores");
        assert!(history.format == OutputFormat::Json);
        assert_eq!(history.window_secs, Some(60));
    }

    #[test]
    fn test_parses_color() {
        let args = Args::parse_from(["stickerchart", "chart", "add", "Reading", "--color", "teal"]);
        let Command::Chart(ChartCommand::Add { color, .. }) = args.command else {
            panic!("expected chart add");
        };
        assert_eq!(color, ChartColor::Teal);
    }
}
