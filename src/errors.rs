use std::borrow::Cow;

use thiserror::Error;

/// Top-level error type returned by h4ul-store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Validation failed for one or more fields before any backend call.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Target record was not found when performing a mutation.
    ///
    /// Lookups report absence as `Ok(None)`; this variant is for mutations
    /// aimed at a record that must exist.
    #[error("{entity} not found: {entity_id}")]
    NotFound {
        entity: &'static str,
        entity_id: String,
    },

    /// Caller is not allowed to perform the operation (ownership, wishlist
    /// protection, admin-only moderation).
    #[error("forbidden: {message}")]
    Forbidden { message: Cow<'static, str> },

    /// Invalid input supplied to a store operation (bad cursor, fan-in
    /// over the cap, zero page size).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// A record with this identity already exists.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Anything else: malformed stored documents, unexpected Lua replies.
    #[error("{message}")]
    Internal { message: Cow<'static, str> },
}

impl StoreError {
    pub(crate) fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub(crate) fn forbidden(message: impl Into<Cow<'static, str>>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, entity_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            entity_id: entity_id.into(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while preparing a mutation.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Convenience alias for boundary checks that produce a validated value.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}
