//! In-memory backend.
//!
//! Implements the same key kinds and plan semantics as the Redis backend:
//! whole plans apply under a single lock, documents are field maps of
//! JSON-encoded strings, indexes order by score descending with member
//! descending as the tie-break. Used for tests and for embedding the
//! store without a server.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};

use super::commands::{MutationCommand, MutationPlan, PlanOutcome, Precondition};
use super::decode_doc;
use crate::errors::StoreError;

#[derive(Debug, Clone)]
enum Entry {
    Doc(HashMap<String, String>),
    Value(String),
    Set(HashSet<String>),
    Zset(HashMap<String, i64>),
}

#[derive(Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned lock means a panic mid-plan; tests should see it.
        self.entries.lock().expect("memory backend lock poisoned")
    }
}

fn wrong_type(key: &str) -> StoreError {
    StoreError::internal(format!("wrong entry kind at key {key}"))
}

fn doc_missing(key: &str) -> StoreError {
    StoreError::internal(format!("plan failed: doc_missing ({key})"))
}

fn holds(entries: &HashMap<String, Entry>, condition: &Precondition) -> bool {
    match condition {
        Precondition::KeyExists { key } => entries.contains_key(key),
        Precondition::KeyAbsent { key } => !entries.contains_key(key),
        Precondition::SetContains { key, member } => match entries.get(key) {
            Some(Entry::Set(members)) => members.contains(member),
            _ => false,
        },
        Precondition::SetMissing { key, member } => match entries.get(key) {
            Some(Entry::Set(members)) => !members.contains(member),
            _ => true,
        },
    }
}

fn doc_fields_mut<'a>(
    entries: &'a mut HashMap<String, Entry>,
    key: &str,
) -> Result<Option<&'a mut HashMap<String, String>>, StoreError> {
    match entries.get_mut(key) {
        Some(Entry::Doc(fields)) => Ok(Some(fields)),
        Some(_) => Err(wrong_type(key)),
        None => Ok(None),
    }
}

fn apply_command(entries: &mut HashMap<String, Entry>, command: &MutationCommand) -> Result<(), StoreError> {
    match command {
        MutationCommand::PutDoc { key, fields } => {
            let doc: HashMap<String, String> = fields.iter().cloned().collect();
            entries.insert(key.clone(), Entry::Doc(doc));
        }
        MutationCommand::MergeDoc { key, fields } => {
            let doc = doc_fields_mut(entries, key)?.ok_or_else(|| doc_missing(key))?;
            for (field, raw) in fields {
                doc.insert(field.clone(), raw.clone());
            }
        }
        MutationCommand::IncrField { key, field, delta } => {
            let doc = doc_fields_mut(entries, key)?.ok_or_else(|| doc_missing(key))?;
            let current: i64 = doc
                .get(field)
                .map(|raw| raw.parse())
                .transpose()
                .map_err(|_| StoreError::internal(format!("non-integer field {field} at {key}")))?
                .unwrap_or(0);
            doc.insert(field.clone(), (current + delta).to_string());
        }
        MutationCommand::PutValue { key, value } => {
            entries.insert(key.clone(), Entry::Value(value.clone()));
        }
        MutationCommand::DeleteKey { key } => {
            entries.remove(key);
        }
        MutationCommand::SetAdd { key, member } => match entries
            .entry(key.clone())
            .or_insert_with(|| Entry::Set(HashSet::new()))
        {
            Entry::Set(members) => {
                members.insert(member.clone());
            }
            _ => return Err(wrong_type(key)),
        },
        MutationCommand::SetRemove { key, member } => {
            if let Some(entry) = entries.get_mut(key) {
                let Entry::Set(members) = entry else {
                    return Err(wrong_type(key));
                };
                members.remove(member);
                if members.is_empty() {
                    entries.remove(key);
                }
            }
        }
        MutationCommand::ZsetAdd { key, member, score } => match entries
            .entry(key.clone())
            .or_insert_with(|| Entry::Zset(HashMap::new()))
        {
            Entry::Zset(scores) => {
                scores.insert(member.clone(), *score);
            }
            _ => return Err(wrong_type(key)),
        },
        MutationCommand::ZsetRemove { key, member } => {
            if let Some(entry) = entries.get_mut(key) {
                let Entry::Zset(scores) = entry else {
                    return Err(wrong_type(key));
                };
                scores.remove(member);
                if scores.is_empty() {
                    entries.remove(key);
                }
            }
        }
    }
    Ok(())
}

impl super::backend::Backend for MemoryBackend {
    async fn apply(&mut self, plan: &MutationPlan) -> Result<PlanOutcome, StoreError> {
        let mut entries = self.lock();

        for (index, condition) in plan.require.iter().enumerate() {
            if !holds(&entries, condition) {
                return Ok(PlanOutcome::RequireFailed { index });
            }
        }

        if let Some(guard) = &plan.guard
            && !holds(&entries, guard)
        {
            return Ok(PlanOutcome::Skipped);
        }

        let previous = match &plan.capture {
            Some(key) => match entries.get(key) {
                Some(Entry::Doc(fields)) => Some(decode_doc(fields.clone().into_iter().collect())?),
                Some(_) => return Err(wrong_type(key)),
                None => None,
            },
            None => None,
        };

        for command in &plan.commands {
            apply_command(&mut entries, command)?;
        }

        Ok(PlanOutcome::Applied { previous })
    }

    async fn get_doc(&mut self, key: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let entries = self.lock();
        match entries.get(key) {
            Some(Entry::Doc(fields)) => decode_doc(fields.clone().into_iter().collect()).map(Some),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn get_docs(&mut self, keys: &[String]) -> Result<Vec<Option<Map<String, Value>>>, StoreError> {
        let mut docs = Vec::with_capacity(keys.len());
        for key in keys {
            docs.push(self.get_doc(key).await?);
        }
        Ok(docs)
    }

    async fn get_value(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.lock();
        match entries.get(key) {
            Some(Entry::Value(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        }
    }

    async fn set_members(&mut self, key: &str) -> Result<Vec<String>, StoreError> {
        let entries = self.lock();
        match entries.get(key) {
            Some(Entry::Set(members)) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(Vec::new()),
        }
    }

    async fn set_contains(&mut self, key: &str, member: &str) -> Result<bool, StoreError> {
        let entries = self.lock();
        match entries.get(key) {
            Some(Entry::Set(members)) => Ok(members.contains(member)),
            Some(_) => Err(wrong_type(key)),
            None => Ok(false),
        }
    }

    async fn zrevrange(
        &mut self,
        key: &str,
        max_score: Option<i64>,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>, StoreError> {
        let entries = self.lock();
        let scores = match entries.get(key) {
            Some(Entry::Zset(scores)) => scores,
            Some(_) => return Err(wrong_type(key)),
            None => return Ok(Vec::new()),
        };
        let mut ordered: Vec<(String, i64)> = scores
            .iter()
            .filter(|(_, score)| max_score.is_none_or(|max| **score <= max))
            .map(|(member, score)| (member.clone(), *score))
            .collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        Ok(ordered.into_iter().skip(offset).take(count).collect())
    }

    async fn zrange_lex_prefix(&mut self, key: &str, prefix: &str, limit: usize) -> Result<Vec<String>, StoreError> {
        let entries = self.lock();
        let scores = match entries.get(key) {
            Some(Entry::Zset(scores)) => scores,
            Some(_) => return Err(wrong_type(key)),
            None => return Ok(Vec::new()),
        };
        let mut members: Vec<String> = scores.keys().filter(|m| m.starts_with(prefix)).cloned().collect();
        members.sort();
        members.truncate(limit);
        Ok(members)
    }
}
