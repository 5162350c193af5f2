use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{BotError, Result};
use crate::rewards::types::lenient_string;

/// A game account the bot can log in with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub code: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub uin: String,
    #[serde(default)]
    pub qq: String,
    #[serde(default)]
    pub avatar: String,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    /// Fields written by other tools, carried through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_platform() -> String {
    "qq".to_string()
}

/// Fields supplied when adding or editing an account. With an `id` the
/// matching account is updated; without one a new account is created.
#[derive(Debug, Clone, Default)]
pub struct AccountInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
    pub platform: Option<String>,
    pub uin: Option<String>,
    pub qq: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsData {
    pub accounts: Vec<Account>,
    pub next_id: u64,
}

impl Default for AccountsData {
    fn default() -> Self {
        Self {
            accounts: Vec::new(),
            next_id: 1,
        }
    }
}

impl AccountsData {
    /// Build from an arbitrary JSON document, repairing `next_id` so it is
    /// always greater than every numeric account id (and 1 when empty).
    pub fn normalize(raw: Value) -> Self {
        let accounts: Vec<Account> = raw
            .get("accounts")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value(entry.clone()).ok())
                    .collect()
            })
            .unwrap_or_default();

        let stored_next = raw.get("nextId").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        });

        Self::repaired(accounts, stored_next)
    }

    fn repaired(accounts: Vec<Account>, next_id: Option<u64>) -> Self {
        let max_id = accounts
            .iter()
            .filter_map(|a| a.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        let mut next_id = next_id.filter(|n| *n > 0).unwrap_or(max_id + 1);
        if accounts.is_empty() {
            next_id = 1;
        }
        if next_id <= max_id {
            next_id = max_id + 1;
        }

        Self { accounts, next_id }
    }

    pub fn find(&self, id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }
}

/// Account registry persisted in `accounts.json`
pub struct AccountStore {
    path: PathBuf,
}

impl AccountStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Read the registry. A missing or corrupt file reads as empty.
    pub fn load(&self) -> AccountsData {
        if !self.path.exists() {
            return AccountsData::default();
        }

        match fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(serde_json::from_str::<Value>(&raw)?))
        {
            Ok(raw) => AccountsData::normalize(raw),
            Err(e) => {
                warn!("Failed to read accounts from {}: {}", self.path.display(), e);
                AccountsData::default()
            }
        }
    }

    fn save(&self, data: &AccountsData) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let data = AccountsData::repaired(data.accounts.clone(), Some(data.next_id));
        fs::write(&self.path, serde_json::to_string_pretty(&data)?)?;
        Ok(())
    }

    /// Update an existing account or register a new one
    pub fn add_or_update(&self, input: AccountInput) -> Result<AccountsData> {
        let mut data = self.load();
        let now = Utc::now().timestamp_millis();

        match input.id.as_deref() {
            Some(id) => {
                let account = data
                    .accounts
                    .iter_mut()
                    .find(|a| a.id == id)
                    .ok_or_else(|| BotError::AccountNotFound(id.to_string()))?;
                merge_into(account, input.clone());
                account.updated_at = now;
                info!(id, "Updated account");
            }
            None => {
                let id = data.next_id;
                data.next_id += 1;
                let uin = input.uin.unwrap_or_default();
                data.accounts.push(Account {
                    id: id.to_string(),
                    name: input
                        .name
                        .filter(|n| !n.is_empty())
                        .unwrap_or_else(|| format!("Account {}", id)),
                    code: input.code.unwrap_or_default(),
                    platform: input
                        .platform
                        .filter(|p| !p.is_empty())
                        .unwrap_or_else(default_platform),
                    qq: input
                        .qq
                        .filter(|q| !q.is_empty())
                        .unwrap_or_else(|| uin.clone()),
                    uin,
                    avatar: input.avatar.unwrap_or_default(),
                    created_at: now,
                    updated_at: now,
                    extra: Map::new(),
                });
                info!(id, "Added account");
            }
        }

        self.save(&data)?;
        Ok(data)
    }

    pub fn delete(&self, id: &str) -> Result<AccountsData> {
        let mut data = self.load();
        data.accounts.retain(|a| a.id != id);
        if data.accounts.is_empty() {
            data.next_id = 1;
        }
        self.save(&data)?;
        Ok(data)
    }
}

fn merge_into(account: &mut Account, input: AccountInput) {
    if let Some(name) = input.name {
        account.name = name;
    }
    if let Some(code) = input.code {
        account.code = code;
    }
    if let Some(platform) = input.platform {
        account.platform = platform;
    }
    if let Some(uin) = input.uin {
        account.uin = uin;
    }
    if let Some(qq) = input.qq {
        account.qq = qq;
    }
    if let Some(avatar) = input.avatar {
        account.avatar = avatar;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> (tempfile::TempDir, AccountStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::new(dir.path().join("accounts.json"));
        (dir, store)
    }

    #[test]
    fn test_new_accounts_get_sequential_ids_and_defaults() {
        let (_dir, store) = store();

        store
            .add_or_update(AccountInput {
                uin: Some("12345".to_string()),
                ..Default::default()
            })
            .unwrap();
        let data = store
            .add_or_update(AccountInput {
                name: Some("Alt".to_string()),
                platform: Some("wx".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(data.next_id, 3);
        let first = data.find("1").unwrap();
        assert_eq!(first.name, "Account 1");
        assert_eq!(first.platform, "qq");
        assert_eq!(first.qq, "12345");
        assert_eq!(data.find("2").unwrap().platform, "wx");

        assert_eq!(store.load(), data);
    }

    #[test]
    fn test_update_merges_fields() {
        let (_dir, store) = store();
        store
            .add_or_update(AccountInput {
                name: Some("Main".to_string()),
                code: Some("abc".to_string()),
                ..Default::default()
            })
            .unwrap();

        let data = store
            .add_or_update(AccountInput {
                id: Some("1".to_string()),
                code: Some("xyz".to_string()),
                ..Default::default()
            })
            .unwrap();

        let account = data.find("1").unwrap();
        assert_eq!(account.name, "Main");
        assert_eq!(account.code, "xyz");
        assert!(account.updated_at >= account.created_at);
    }

    #[test]
    fn test_update_of_unknown_id_fails() {
        let (_dir, store) = store();
        let result = store.add_or_update(AccountInput {
            id: Some("9".to_string()),
            ..Default::default()
        });
        assert!(matches!(result, Err(BotError::AccountNotFound(_))));
    }

    #[test]
    fn test_delete_resets_next_id_when_empty() {
        let (_dir, store) = store();
        store.add_or_update(AccountInput::default()).unwrap();
        store.add_or_update(AccountInput::default()).unwrap();

        let data = store.delete("1").unwrap();
        assert_eq!(data.accounts.len(), 1);
        assert_eq!(data.next_id, 3);

        let data = store.delete("2").unwrap();
        assert!(data.accounts.is_empty());
        assert_eq!(data.next_id, 1);
    }

    #[test]
    fn test_normalize_repairs_next_id() {
        let data = AccountsData::normalize(json!({
            "accounts": [{ "id": "4" }, { "id": "7" }, "garbage"],
            "nextId": 2
        }));
        assert_eq!(data.accounts.len(), 2);
        assert_eq!(data.next_id, 8);

        let data = AccountsData::normalize(json!({ "accounts": [], "nextId": 40 }));
        assert_eq!(data.next_id, 1);

        let data = AccountsData::normalize(json!({ "accounts": [{ "id": "3" }] }));
        assert_eq!(data.next_id, 4);
    }

    #[test]
    fn test_numeric_ids_and_unknown_fields_survive_rewrite() {
        let (dir, store) = store();
        let path = dir.path().join("accounts.json");
        fs::write(
            &path,
            json!({
                "accounts": [{ "id": 4, "name": "Main", "platform": "wx", "region": "cn" }],
                "nextId": 5
            })
            .to_string(),
        )
        .unwrap();

        let loaded = store.load();
        let main = loaded.find("4").unwrap();
        assert_eq!(main.name, "Main");
        assert_eq!(main.extra.get("region"), Some(&json!("cn")));

        let data = store
            .add_or_update(AccountInput {
                name: Some("Alt".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(data.find("5").unwrap().name, "Alt");

        let written: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let accounts = written["accounts"].as_array().unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0]["name"], json!("Main"));
        assert_eq!(accounts[0]["region"], json!("cn"));
        assert_eq!(written["nextId"], json!(6));
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let (dir, store) = store();
        fs::write(dir.path().join("accounts.json"), "[[[").unwrap();
        assert_eq!(store.load(), AccountsData::default());
    }
}
