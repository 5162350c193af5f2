use chrono::FixedOffset;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::rewards::types::SourceId;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub rewards: RewardsConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RewardsConfig {
    /// Inbox partitions to poll, highest priority first
    pub sources: Vec<u32>,
    /// Partition that claim calls are sent to
    pub primary_source: u32,
    pub cooldown_secs: u64,
    /// Offset of the reference time zone used for the daily key
    pub utc_offset_hours: i32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    pub data_dir: String,
}

impl Config {
    /// Load layered configuration: built-in defaults, `config/default`, the
    /// file passed on the command line, then `FARMBOT__*` environment variables.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let mut builder = config::Config::builder()
            .set_default("server.base_url", "http://127.0.0.1:8080")?
            .set_default("server.timeout_ms", 10_000)?
            .set_default("rewards.sources", vec![1, 2])?
            .set_default("rewards.primary_source", 1)?
            .set_default("rewards.cooldown_secs", 300)?
            .set_default("rewards.utc_offset_hours", 8)?
            .set_default("database.path", "data/history.db")?
            .set_default("storage.data_dir", "data")?
            .add_source(config::File::with_name("config/default").required(false));

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("FARMBOT")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("rewards.sources")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rewards.sources.is_empty() {
            anyhow::bail!("rewards.sources must name at least one inbox");
        }
        if self.server.timeout_ms == 0 {
            anyhow::bail!("server.timeout_ms must be positive");
        }
        self.reference_offset()?;
        Ok(())
    }

    pub fn sources(&self) -> Vec<SourceId> {
        self.rewards.sources.iter().copied().map(SourceId).collect()
    }

    pub fn primary_source(&self) -> SourceId {
        SourceId(self.rewards.primary_source)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.rewards.cooldown_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.timeout_ms)
    }

    pub fn reference_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.rewards.utc_offset_hours * 3600).ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid rewards.utc_offset_hours: {}",
                self.rewards.utc_offset_hours
            )
        })
    }

    pub fn store_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join("store.json")
    }

    pub fn accounts_file(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir).join("accounts.json")
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server: ServerConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            timeout_ms: 1000,
        },
        rewards: RewardsConfig {
            sources: vec![1, 2],
            primary_source: 1,
            cooldown_secs: 300,
            utc_offset_hours: 8,
        },
        database: DatabaseConfig {
            path: ":memory:".to_string(),
        },
        storage: StorageConfig {
            data_dir: "data".to_string(),
        },
    }
}
