//! Mutation plans.
//!
//! A plan is the unit of atomicity: preconditions, an optional idempotency
//! guard, an optional capture of the previous document, and a command
//! list. The Redis backend ships the whole plan to a single Lua `EVAL`;
//! the memory backend applies it under one lock. Either way, no observer
//! sees a partially applied plan, which is what keeps the denormalized
//! counters honest.

use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use super::DocFields;

/// A condition evaluated inside the atomic section, before any command
/// runs.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Precondition {
    /// The key (document, value, or set) exists.
    KeyExists { key: String },
    KeyAbsent { key: String },
    SetContains { key: String, member: String },
    SetMissing { key: String, member: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum MutationCommand {
    /// Writes a full document (replacing any previous fields).
    PutDoc { key: String, fields: DocFields },
    /// Assigns a subset of fields on an existing document.
    MergeDoc { key: String, fields: DocFields },
    /// Adjusts an integer field on an existing document.
    IncrField { key: String, field: String, delta: i64 },
    /// Writes a plain string value (mappings such as username -> id).
    PutValue { key: String, value: String },
    DeleteKey { key: String },
    SetAdd { key: String, member: String },
    SetRemove { key: String, member: String },
    ZsetAdd { key: String, member: String, score: i64 },
    ZsetRemove { key: String, member: String },
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct MutationPlan {
    /// Violating any of these aborts the plan; the store maps the failing
    /// index back to a domain error.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub require: Vec<Precondition>,
    /// A failed guard skips the plan instead of failing it: the repeat
    /// press of a like button is a no-op, not an error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guard: Option<Precondition>,
    /// Document key whose pre-mutation fields are returned with the
    /// outcome, for previous-value reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<String>,
    pub commands: Vec<MutationCommand>,
}

impl MutationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, condition: Precondition) -> Self {
        self.require.push(condition);
        self
    }

    pub fn guard(mut self, condition: Precondition) -> Self {
        self.guard = Some(condition);
        self
    }

    pub fn capture(mut self, key: impl Into<String>) -> Self {
        self.capture = Some(key.into());
        self
    }

    pub fn command(mut self, command: MutationCommand) -> Self {
        self.commands.push(command);
        self
    }
}

/// Result of applying a plan.
#[derive(Debug, Clone)]
pub enum PlanOutcome {
    /// All commands ran. `previous` holds the captured document, when one
    /// was requested and existed.
    Applied { previous: Option<Map<String, Value>> },
    /// The guard did not hold; nothing was written.
    Skipped,
    /// `require[index]` did not hold; nothing was written.
    RequireFailed { index: usize },
}

impl PlanOutcome {
    /// True when the plan's commands actually ran.
    pub fn applied(&self) -> bool {
        matches!(self, PlanOutcome::Applied { .. })
    }
}
