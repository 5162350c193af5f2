use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Identifier of the daily mailbox task, used in status and outcome records
pub const DAILY_KEY: &str = "email_rewards";

/// A remote reward partition (the server calls it a box type)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId(pub u32);

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "box {}", self.0)
    }
}

/// One reward-bearing mail visible in a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClaimableItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub has_reward: bool,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub claimed: bool,
    /// Any other fields the server sent (title, sender, expiry, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ClaimableItem {
    pub fn new(id: impl Into<String>, has_reward: bool, claimed: bool) -> Self {
        Self {
            id: id.into(),
            has_reward,
            claimed,
            extra: Map::new(),
        }
    }
}

/// One granted reward: `count` units of item kind `id`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLineItem {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub count: i64,
}

impl RewardLineItem {
    pub fn new(id: i64, count: i64) -> Self {
        Self { id, count }
    }
}

/// Result of one `check_and_claim` invocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckOutcome {
    pub claimed: u32,
    pub reward_items: usize,
}

impl CheckOutcome {
    pub const ZERO: CheckOutcome = CheckOutcome {
        claimed: 0,
        reward_items: 0,
    };
}

/// Read-only view of the daily task state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyStatus {
    pub key: &'static str,
    pub done_today: bool,
    pub last_check_at: Option<DateTime<Utc>>,
}

/// Accepts a string or a number and yields its string form. Null becomes "".
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

/// Only a literal `true` counts; null and other shapes read as `false`.
fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Accepts a number or a numeric string. Anything else becomes 0.
fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<i64>().unwrap_or(0),
        _ => 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_accepts_numeric_id_and_keeps_extra_fields() {
        let item: ClaimableItem = serde_json::from_value(json!({
            "id": 42,
            "has_reward": true,
            "title": "Weekly gift"
        }))
        .unwrap();

        assert_eq!(item.id, "42");
        assert!(item.has_reward);
        assert!(!item.claimed);
        assert_eq!(item.extra.get("title"), Some(&json!("Weekly gift")));
    }

    #[test]
    fn test_line_item_tolerates_strings_and_missing_fields() {
        let item: RewardLineItem =
            serde_json::from_value(json!({ "id": "1002", "count": "7" })).unwrap();
        assert_eq!(item, RewardLineItem::new(1002, 7));

        let empty: RewardLineItem = serde_json::from_value(json!({})).unwrap();
        assert_eq!(empty, RewardLineItem::new(0, 0));
    }
}
