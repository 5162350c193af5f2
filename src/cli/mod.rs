pub mod commands;

pub use commands::{AccountsAction, Cli, Commands, SettingsAction};
