use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "farm-bot")]
#[command(about = "Daily reward claiming and operator preferences for the farm game")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one mailbox reward check
    Check {
        /// Ignore the daily-done marker and the cooldown
        #[arg(short, long)]
        force: bool,
    },

    /// Check the mailbox on a fixed interval until interrupted
    Auto {
        /// Check interval in seconds
        #[arg(short, long, default_value = "600")]
        interval: u64,
    },

    /// Show recent claim cycles
    History {
        /// Number of cycles to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show claim statistics
    Stats {
        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Show or change operator settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },

    /// Manage game accounts
    Accounts {
        #[command(subcommand)]
        action: AccountsAction,
    },

    /// Rank crops by efficiency
    Rankings {
        /// Plant catalog JSON file
        #[arg(long, default_value = "data/plants.json")]
        catalog: String,

        /// Sort by: exp, fert, gold, profit, fert_profit, level
        #[arg(short, long, default_value = "exp")]
        sort: String,

        /// Number of rows to show
        #[arg(short, long)]
        limit: Option<usize>,

        /// Output format: table or json
        #[arg(short, long, default_value = "table")]
        format: String,
    },

    /// Initialize data directory and history database
    Init,
}

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print current settings as JSON
    Show,

    /// Turn an automation feature on or off (fertilizer takes both|normal|organic|none)
    Automation { key: String, value: String },

    /// Set a loop interval in seconds (farm or friend)
    Interval { kind: String, seconds: String },

    /// Planting strategy: preferred or level
    Strategy { strategy: String },

    /// Preferred seed id
    Seed { seed_id: String },

    /// Friend quiet hours
    QuietHours {
        #[arg(long)]
        enabled: Option<bool>,
        /// Start time, HH:MM
        #[arg(long)]
        start: Option<String>,
        /// End time, HH:MM
        #[arg(long)]
        end: Option<String>,
    },

    /// UI theme: dark or light
    Theme { theme: String },
}

#[derive(Subcommand)]
pub enum AccountsAction {
    /// List registered accounts
    List,

    /// Add an account, or update one when --id is given
    Add {
        #[arg(long)]
        id: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        platform: Option<String>,
        #[arg(long)]
        uin: Option<String>,
    },

    /// Remove an account
    Remove {
        id: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}
