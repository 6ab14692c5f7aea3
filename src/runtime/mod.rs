//! Backend runtime: serializable mutation plans, the Lua interpreter that
//! applies them atomically on Redis, and an in-memory backend with the
//! same semantics.

pub mod backend;
pub mod commands;
pub mod memory;
pub mod scripts;

pub use backend::{Backend, RedisBackend};
pub use commands::{MutationCommand, MutationPlan, PlanOutcome, Precondition};
pub use memory::MemoryBackend;

use serde_json::{Map, Value};

use crate::errors::StoreError;

/// Raw document representation shared by both backends: hash fields whose
/// values are individually JSON-encoded. Keeping values pre-encoded on the
/// Rust side means the Lua interpreter never re-serializes JSON (and never
/// hits cjson's empty-array ambiguity).
pub type DocFields = Vec<(String, String)>;

/// Serializes a record into hash fields.
pub(crate) fn encode_doc<T: serde::Serialize>(record: &T) -> Result<DocFields, StoreError> {
    let value = serde_json::to_value(record)
        .map_err(|err| StoreError::internal(format!("cannot serialize record: {err}")))?;
    let Value::Object(map) = value else {
        return Err(StoreError::internal("record did not serialize to an object"));
    };
    map.into_iter()
        .map(|(field, value)| {
            let raw = serde_json::to_string(&value)
                .map_err(|err| StoreError::internal(format!("cannot serialize field {field}: {err}")))?;
            Ok((field, raw))
        })
        .collect()
}

/// Encodes a single named field for a merge command.
pub(crate) fn field<T: serde::Serialize>(name: &str, value: &T) -> Result<(String, String), StoreError> {
    let raw = serde_json::to_string(value)
        .map_err(|err| StoreError::internal(format!("cannot serialize field {name}: {err}")))?;
    Ok((name.to_string(), raw))
}

/// Parses hash fields back into a JSON object.
pub(crate) fn decode_doc(fields: DocFields) -> Result<Map<String, Value>, StoreError> {
    let mut map = Map::with_capacity(fields.len());
    for (field, raw) in fields {
        let value: Value = serde_json::from_str(&raw)
            .map_err(|err| StoreError::internal(format!("corrupt stored field {field}: {err}")))?;
        map.insert(field, value);
    }
    Ok(map)
}

/// Deserializes a JSON object into a typed record.
pub(crate) fn record_from_doc<T: serde::de::DeserializeOwned>(doc: Map<String, Value>) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc))
        .map_err(|err| StoreError::internal(format!("corrupt stored record: {err}")))
}
