//! The backend contract and its Redis implementation.
//!
//! Stores are generic over [`Backend`], so the same store code runs
//! against a live Redis or the in-memory backend used for embedding and
//! tests.

use redis::aio::ConnectionManager;
use serde_json::{Map, Value};
use tracing::debug;

use super::commands::{MutationPlan, PlanOutcome};
use super::scripts::PLAN_APPLY_SCRIPT;
use super::{DocFields, decode_doc};
use crate::errors::StoreError;

/// Sorts after any ASCII member; used to close a lexicographic prefix range.
const LEX_MAX_SUFFIX: char = '\u{10FFFF}';

#[allow(async_fn_in_trait)]
pub trait Backend: Clone + Send {
    /// Applies a mutation plan atomically.
    async fn apply(&mut self, plan: &MutationPlan) -> Result<PlanOutcome, StoreError>;

    /// Fetches a document; `None` when the key is missing.
    async fn get_doc(&mut self, key: &str) -> Result<Option<Map<String, Value>>, StoreError>;

    /// Batch document fetch, preserving input order.
    async fn get_docs(&mut self, keys: &[String]) -> Result<Vec<Option<Map<String, Value>>>, StoreError>;

    /// Fetches a plain string value.
    async fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>, StoreError>;

    async fn set_contains(&mut self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Entries of a score-ordered index, highest score first, ties broken
    /// by member descending. `max_score` is an inclusive upper bound.
    async fn zrevrange(
        &mut self,
        key: &str,
        max_score: Option<i64>,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>, StoreError>;

    /// Members of a constant-score index starting with `prefix`, ascending.
    async fn zrange_lex_prefix(&mut self, key: &str, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError>;
}

/// Backend over a shared [`ConnectionManager`]. Cloning is cheap; clones
/// share the underlying multiplexed connection.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self::new(conn))
    }
}

/// Decodes the flat `[k1, v1, k2, v2, ...]` array the Lua script returns
/// for a captured document.
fn doc_from_flat_array(value: &Value) -> Result<Map<String, Value>, StoreError> {
    let entries = value
        .as_array()
        .ok_or_else(|| StoreError::internal("captured document is not an array"))?;
    let mut fields: DocFields = Vec::with_capacity(entries.len() / 2);
    for pair in entries.chunks(2) {
        let [field, raw] = pair else {
            return Err(StoreError::internal("captured document has odd field count"));
        };
        let (Some(field), Some(raw)) = (field.as_str(), raw.as_str()) else {
            return Err(StoreError::internal("captured document has non-string entries"));
        };
        fields.push((field.to_string(), raw.to_string()));
    }
    decode_doc(fields)
}

/// Maps the script's JSON reply onto a [`PlanOutcome`].
pub(crate) fn decode_plan_reply(raw: &str) -> Result<PlanOutcome, StoreError> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| StoreError::internal(format!("failed to parse lua response: {err}")))?;

    if let Some(error) = value.get("error").and_then(|v| v.as_str()) {
        let key = value.get("key").and_then(|v| v.as_str()).unwrap_or("?");
        return Err(StoreError::internal(format!("plan failed: {error} ({key})")));
    }

    match value.get("status").and_then(|v| v.as_str()) {
        Some("applied") => {
            let previous = match value.get("previous") {
                Some(prev) if !prev.is_null() => Some(doc_from_flat_array(prev)?),
                _ => None,
            };
            Ok(PlanOutcome::Applied { previous })
        }
        Some("skipped") => Ok(PlanOutcome::Skipped),
        Some("require_failed") => {
            let index = value
                .get("index")
                .and_then(|v| v.as_u64())
                .ok_or_else(|| StoreError::internal("require_failed reply without index"))?;
            Ok(PlanOutcome::RequireFailed {
                index: index as usize,
            })
        }
        other => Err(StoreError::internal(format!("unexpected lua reply status: {other:?}"))),
    }
}

fn doc_from_hash(entries: Vec<(String, String)>) -> Result<Option<Map<String, Value>>, StoreError> {
    if entries.is_empty() {
        return Ok(None);
    }
    decode_doc(entries).map(Some)
}

impl Backend for RedisBackend {
    async fn apply(&mut self, plan: &MutationPlan) -> Result<PlanOutcome, StoreError> {
        let payload = serde_json::to_string(plan)
            .map_err(|err| StoreError::internal(format!("failed to serialize plan: {err}")))?;
        debug!(commands = plan.commands.len(), "applying mutation plan");
        let raw: String = PLAN_APPLY_SCRIPT
            .prepare_invoke()
            .arg(payload)
            .invoke_async(&mut self.conn)
            .await?;
        decode_plan_reply(&raw)
    }

    async fn get_doc(&mut self, key: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let entries: Vec<(String, String)> = redis::cmd("HGETALL").arg(key).query_async(&mut self.conn).await?;
        doc_from_hash(entries)
    }

    async fn get_docs(&mut self, keys: &[String]) -> Result<Vec<Option<Map<String, Value>>>, StoreError> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("HGETALL").arg(key);
        }
        let batches: Vec<Vec<(String, String)>> = pipe.query_async(&mut self.conn).await?;
        batches.into_iter().map(doc_from_hash).collect()
    }

    async fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(redis::cmd("GET").arg(key).query_async(&mut self.conn).await?)
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(redis::cmd("SMEMBERS").arg(key).query_async(&mut self.conn).await?)
    }

    async fn set_contains(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        Ok(redis::cmd("SISMEMBER")
            .arg(key)
            .arg(member)
            .query_async(&mut self.conn)
            .await?)
    }

    async fn zrevrange(
        &mut self,
        key: &str,
        max_score: Option<i64>,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let max = match max_score {
            Some(score) => score.to_string(),
            None => "+inf".to_string(),
        };
        let entries: Vec<(String, f64)> = redis::cmd("ZREVRANGEBYSCORE")
            .arg(key)
            .arg(max)
            .arg("-inf")
            .arg("WITHSCORES")
            .arg("LIMIT")
            .arg(offset)
            .arg(count)
            .query_async(&mut self.conn)
            .await?;
        Ok(entries
            .into_iter()
            .map(|(member, score)| (member, score as i64))
            .collect())
    }

    async fn zrange_lex_prefix(&mut self, key: &str, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        Ok(redis::cmd("ZRANGEBYLEX")
            .arg(key)
            .arg(format!("[{prefix}"))
            .arg(format!("[{prefix}{LEX_MAX_SUFFIX}"))
            .arg("LIMIT")
            .arg(0)
            .arg(limit)
            .query_async(&mut self.conn)
            .await?)
    }
}
