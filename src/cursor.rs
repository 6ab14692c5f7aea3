//! Cursor pagination.
//!
//! Every listing orders by creation time descending, ties broken by record
//! id descending (unspecified but stable, matching the index ordering of
//! both backends). A cursor names the last item already returned; the next
//! page resumes strictly after it.

use crate::errors::StoreError;

/// Opaque position in an ordered listing.
///
/// The token encodes `{score}.{id}`; the id alphabet contains no `.`, so
/// the split is unambiguous. Callers should treat it as opaque.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub(crate) score: i64,
    pub(crate) id: String,
}

impl PageCursor {
    pub(crate) fn new(score: i64, id: impl Into<String>) -> Self {
        Self {
            score,
            id: id.into(),
        }
    }

    /// Serializes the cursor into its wire token.
    pub fn encode(&self) -> String {
        format!("{}.{}", self.score, self.id)
    }

    /// Parses a wire token produced by [`PageCursor::encode`].
    pub fn decode(token: &str) -> Result<Self, StoreError> {
        let (score, id) = token
            .split_once('.')
            .ok_or_else(|| StoreError::invalid(format!("malformed cursor {token:?}")))?;
        let score: i64 = score
            .parse()
            .map_err(|_| StoreError::invalid(format!("malformed cursor {token:?}")))?;
        if id.is_empty() {
            return Err(StoreError::invalid(format!("malformed cursor {token:?}")));
        }
        Ok(Self::new(score, id))
    }

    /// True if `(score, id)` sorts strictly after this cursor in the
    /// descending listing order.
    pub(crate) fn admits(&self, score: i64, id: &str) -> bool {
        score < self.score || (score == self.score && id < self.id.as_str())
    }
}

/// One page of a listing. `next` is `None` once the listing is exhausted.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    pub(crate) fn empty() -> Self {
        Self {
            items: Vec::new(),
            next: None,
        }
    }
}
