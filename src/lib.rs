pub mod analytics;
pub mod config;
pub mod error;
pub mod prefs;
pub mod rewards;
pub mod rpc;
pub mod storage;
pub mod utils;

pub use config::Config;
pub use error::{BotError, Result, TransportError};
