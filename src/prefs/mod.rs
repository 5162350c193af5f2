pub mod accounts;
pub mod settings;

pub use accounts::{Account, AccountInput, AccountStore, AccountsData};
pub use settings::{Settings, SettingsPatch, SettingsStore};
