use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

use crate::{
    error::TransportError,
    rewards::types::{ClaimableItem, RewardLineItem, SourceId},
    rpc::Transport,
};

pub const EMAIL_SERVICE: &str = "gamepb.emailpb.EmailService";
pub const METHOD_LIST: &str = "GetEmailList";
pub const METHOD_CLAIM: &str = "ClaimEmail";
pub const METHOD_BATCH_CLAIM: &str = "BatchClaimEmail";

/// The three remote operations the orchestrator needs
#[async_trait]
pub trait ClaimApi: Send + Sync {
    /// Items currently visible in a source
    async fn list_claimable(&self, source: SourceId) -> Result<Vec<ClaimableItem>, TransportError>;

    /// Claim a single item, returning what it granted
    async fn claim_one(
        &self,
        source: SourceId,
        item_id: &str,
    ) -> Result<Vec<RewardLineItem>, TransportError>;

    /// Claim the server-defined batch that `representative_id` belongs to
    async fn claim_batch(
        &self,
        source: SourceId,
        representative_id: &str,
    ) -> Result<Vec<RewardLineItem>, TransportError>;
}

#[derive(Debug, Default, Deserialize)]
struct ListReply {
    #[serde(default, deserialize_with = "lenient_vec")]
    emails: Vec<ClaimableItem>,
}

#[derive(Debug, Default, Deserialize)]
struct ClaimReply {
    #[serde(default, deserialize_with = "lenient_vec")]
    items: Vec<RewardLineItem>,
}

/// Typed wrapper over a `Transport` for the mailbox service
pub struct ClaimClient<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> ClaimClient<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    async fn call<R: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<R, TransportError> {
        let reply = self.transport.send(EMAIL_SERVICE, method, body).await?;
        decode_reply(method, reply)
    }
}

#[async_trait]
impl<T: Transport> ClaimApi for ClaimClient<T> {
    async fn list_claimable(&self, source: SourceId) -> Result<Vec<ClaimableItem>, TransportError> {
        let reply: ListReply = self
            .call(METHOD_LIST, json!({ "box_type": source.0 }))
            .await?;
        debug!(%source, count = reply.emails.len(), "Listed mailbox");
        Ok(reply.emails)
    }

    async fn claim_one(
        &self,
        source: SourceId,
        item_id: &str,
    ) -> Result<Vec<RewardLineItem>, TransportError> {
        let reply: ClaimReply = self
            .call(
                METHOD_CLAIM,
                json!({ "box_type": source.0, "email_id": item_id }),
            )
            .await?;
        Ok(reply.items)
    }

    async fn claim_batch(
        &self,
        source: SourceId,
        representative_id: &str,
    ) -> Result<Vec<RewardLineItem>, TransportError> {
        let reply: ClaimReply = self
            .call(
                METHOD_BATCH_CLAIM,
                json!({ "box_type": source.0, "email_id": representative_id }),
            )
            .await?;
        Ok(reply.items)
    }
}

/// Decode a reply document. A null reply is treated as an empty object;
/// anything else that is not an object cannot be interpreted.
fn decode_reply<R: DeserializeOwned>(method: &str, reply: Value) -> Result<R, TransportError> {
    let reply = match reply {
        Value::Null => Value::Object(Default::default()),
        Value::Object(_) => reply,
        other => {
            return Err(TransportError::Decode(format!(
                "{} returned non-object reply: {}",
                method, other
            )))
        }
    };

    serde_json::from_value(reply)
        .map_err(|e| TransportError::Decode(format!("{}: {}", method, e)))
}

/// A missing, null or non-array field decodes to an empty list. Array
/// entries that do not decode are skipped.
fn lenient_vec<'de, D, E>(deserializer: D) -> Result<Vec<E>, D::Error>
where
    D: serde::Deserializer<'de>,
    E: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(entries) => entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Replays a fixed reply and records every request
    struct ScriptedTransport {
        reply: Result<Value, fn() -> TransportError>,
        requests: Mutex<Vec<(String, String, Value)>>,
    }

    impl ScriptedTransport {
        fn replying(reply: Value) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(err: fn() -> TransportError) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(err),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            service: &str,
            method: &str,
            body: Value,
        ) -> Result<Value, TransportError> {
            self.requests
                .lock()
                .unwrap()
                .push((service.to_string(), method.to_string(), body));
            match &self.reply {
                Ok(value) => Ok(value.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    #[tokio::test]
    async fn test_list_sends_box_type_and_decodes_emails() {
        let transport = ScriptedTransport::replying(json!({
            "emails": [
                { "id": "m1", "has_reward": true },
                { "id": 7, "has_reward": false, "claimed": true }
            ]
        }));
        let client = ClaimClient::new(transport.clone());

        let items = client.list_claimable(SourceId(2)).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, "m1");
        assert_eq!(items[1].id, "7");
        assert!(items[1].claimed);

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].0, EMAIL_SERVICE);
        assert_eq!(requests[0].1, METHOD_LIST);
        assert_eq!(requests[0].2, json!({ "box_type": 2 }));
    }

    #[tokio::test]
    async fn test_null_flags_keep_the_mail_as_unclaimed() {
        let transport = ScriptedTransport::replying(json!({
            "emails": [
                { "id": "m1", "has_reward": true, "claimed": null },
                { "id": "m2", "has_reward": null, "claimed": "yes" }
            ]
        }));
        let client = ClaimClient::new(transport);

        let items = client.list_claimable(SourceId(1)).await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ClaimableItem::new("m1", true, false));
        assert_eq!(items[1], ClaimableItem::new("m2", false, false));
    }

    #[tokio::test]
    async fn test_missing_fields_decode_to_empty() {
        let transport = ScriptedTransport::replying(json!({}));
        let client = ClaimClient::new(transport);

        assert!(client.list_claimable(SourceId(1)).await.unwrap().is_empty());
        assert!(client.claim_one(SourceId(1), "m1").await.unwrap().is_empty());

        let null_reply = ClaimClient::new(ScriptedTransport::replying(Value::Null));
        assert!(null_reply.claim_batch(SourceId(1), "m1").await.unwrap().is_empty());

        let wrong_shape = ClaimClient::new(ScriptedTransport::replying(json!({ "items": 5 })));
        assert!(wrong_shape.claim_one(SourceId(1), "m1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_claim_requests_carry_item_id() {
        let transport = ScriptedTransport::replying(json!({
            "items": [{ "id": 1, "count": 100 }, { "id": "1002", "count": 5 }]
        }));
        let client = ClaimClient::new(transport.clone());

        let granted = client.claim_batch(SourceId(1), "m9").await.unwrap();
        assert_eq!(
            granted,
            vec![RewardLineItem::new(1, 100), RewardLineItem::new(1002, 5)]
        );
        client.claim_one(SourceId(1), "m9").await.unwrap();

        let requests = transport.requests.lock().unwrap();
        assert_eq!(requests[0].1, METHOD_BATCH_CLAIM);
        assert_eq!(requests[1].1, METHOD_CLAIM);
        assert_eq!(requests[1].2, json!({ "box_type": 1, "email_id": "m9" }));
    }

    #[tokio::test]
    async fn test_non_object_reply_is_decode_error() {
        let client = ClaimClient::new(ScriptedTransport::replying(json!([1, 2, 3])));
        let result = client.list_claimable(SourceId(1)).await;
        assert!(matches!(result, Err(TransportError::Decode(_))));
    }

    #[tokio::test]
    async fn test_transport_failure_propagates() {
        let client = ClaimClient::new(ScriptedTransport::failing(|| {
            TransportError::Unreachable("connection refused".to_string())
        }));
        let result = client.claim_one(SourceId(1), "m1").await;
        assert!(matches!(result, Err(TransportError::Unreachable(_))));
    }
}
