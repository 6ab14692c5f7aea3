//! The store facade and its per-domain handles.
//!
//! [`Store`] is the entry point: it owns a backend and hands out cheap
//! clones wrapped in typed handles (`profiles()`, `posts()`, ...), the
//! same shape as a client handing out collection accessors.

pub mod collections;
pub mod engagement;
pub mod graph;
pub mod posts;
pub mod profiles;
pub mod reports;

pub use collections::CollectionStore;
pub use engagement::EngagementStore;
pub use graph::GraphStore;
pub use posts::PostStore;
pub use profiles::ProfileStore;
pub use reports::ReportStore;

use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::cursor::{Page, PageCursor};
use crate::errors::StoreError;
use crate::keys::Keys;
use crate::limits;
use crate::runtime::{Backend, MemoryBackend, RedisBackend, record_from_doc};
use crate::session::Session;
use crate::types::{Collection, User, UserInput};

pub struct Store<B: Backend> {
    backend: B,
    keys: Keys,
}

impl Store<RedisBackend> {
    /// Connects to the Redis backend named by the config.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let backend = RedisBackend::connect(&config.redis_url).await?;
        Ok(Self::new(backend, &config.key_prefix))
    }
}

impl Store<MemoryBackend> {
    /// A self-contained store for tests and embedding.
    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new(), "h4ul")
    }
}

impl<B: Backend> Store<B> {
    pub fn new(backend: B, prefix: &str) -> Self {
        Self {
            backend,
            keys: Keys::new(prefix),
        }
    }

    pub fn profiles(&self) -> ProfileStore<B> {
        ProfileStore::new(self.backend.clone(), self.keys.clone())
    }

    pub fn posts(&self) -> PostStore<B> {
        PostStore::new(self.backend.clone(), self.keys.clone())
    }

    pub fn graph(&self) -> GraphStore<B> {
        GraphStore::new(self.backend.clone(), self.keys.clone())
    }

    pub fn engagement(&self) -> EngagementStore<B> {
        EngagementStore::new(self.backend.clone(), self.keys.clone())
    }

    pub fn collections(&self) -> CollectionStore<B> {
        CollectionStore::new(self.backend.clone(), self.keys.clone())
    }

    pub fn reports(&self) -> ReportStore<B> {
        ReportStore::new(self.backend.clone(), self.keys.clone())
    }

    /// Profile setup: creates the user record and bootstraps their
    /// wishlist collection, the way the signup flow does it.
    pub async fn setup_profile(
        &self,
        user_id: &str,
        email: &str,
        input: UserInput,
    ) -> Result<(User, Collection), StoreError> {
        let user = self.profiles().create(user_id, email, input).await?;
        let wishlist = self.collections().ensure_wishlist(user_id).await?;
        Ok((user, wishlist))
    }

    /// Convenience for callers acting as `user_id`.
    pub fn session(&self, user_id: &str) -> Session {
        Session::new(user_id)
    }
}

// Shared listing internals.

pub(crate) fn score_of(created_at: DateTime<Utc>) -> i64 {
    created_at.timestamp_millis()
}

pub(crate) fn check_page_size(page_size: usize) -> Result<usize, StoreError> {
    if page_size == 0 {
        return Err(StoreError::invalid("page size must be at least 1"));
    }
    Ok(page_size.min(limits::MAX_PAGE_SIZE))
}

/// Collects up to `page_size + 1` index entries strictly after `cursor`.
/// The surplus entry is how the caller knows another page exists.
///
/// The loop exists because an inclusive score bound can return entries the
/// cursor already covered (same creation millisecond); those are skipped
/// and replaced from deeper offsets.
pub(crate) async fn collect_index_page<B: Backend>(
    backend: &mut B,
    key: &str,
    cursor: Option<&PageCursor>,
    page_size: usize,
) -> Result<Vec<(String, i64)>, StoreError> {
    let want = page_size + 1;
    let max_score = cursor.map(|c| c.score);
    let mut admitted = Vec::with_capacity(want);
    let mut offset = 0;

    loop {
        let batch = backend.zrevrange(key, max_score, offset, want).await?;
        let batch_len = batch.len();
        for (member, score) in batch {
            if cursor.is_none_or(|c| c.admits(score, &member)) {
                admitted.push((member, score));
                if admitted.len() == want {
                    return Ok(admitted);
                }
            }
        }
        if batch_len < want {
            return Ok(admitted);
        }
        offset += batch_len;
    }
}

/// Drains an entire index, newest first.
pub(crate) async fn collect_index_all<B: Backend>(
    backend: &mut B,
    key: &str,
) -> Result<Vec<(String, i64)>, StoreError> {
    const BATCH: usize = 128;
    let mut entries = Vec::new();
    let mut offset = 0;
    loop {
        let batch = backend.zrevrange(key, None, offset, BATCH).await?;
        let batch_len = batch.len();
        entries.extend(batch);
        if batch_len < BATCH {
            return Ok(entries);
        }
        offset += batch_len;
    }
}

/// Turns admitted entries (at most `page_size + 1` of them) into the page
/// ids plus the cursor for the next call.
pub(crate) fn page_ids(mut entries: Vec<(String, i64)>, page_size: usize) -> (Vec<String>, Option<PageCursor>) {
    let next = if entries.len() > page_size {
        entries.truncate(page_size);
        entries
            .last()
            .map(|(member, score)| PageCursor::new(*score, member.clone()))
    } else {
        None
    };
    (entries.into_iter().map(|(member, _)| member).collect(), next)
}

/// Fetches and parses the records for `keys`, dropping entries whose
/// document has disappeared (dangling references are tolerated, not
/// surfaced).
pub(crate) async fn hydrate_records<B: Backend, T: serde::de::DeserializeOwned>(
    backend: &mut B,
    keys: &[String],
) -> Result<Vec<T>, StoreError> {
    let docs = backend.get_docs(keys).await?;
    let mut records = Vec::with_capacity(docs.len());
    for doc in docs.into_iter().flatten() {
        records.push(record_from_doc(doc)?);
    }
    Ok(records)
}

/// Fetches one typed record.
pub(crate) async fn fetch_record<B: Backend, T: serde::de::DeserializeOwned>(
    backend: &mut B,
    key: &str,
) -> Result<Option<T>, StoreError> {
    match backend.get_doc(key).await? {
        Some(doc) => record_from_doc(doc).map(Some),
        None => Ok(None),
    }
}

/// Assembles a page of records from an index key.
pub(crate) async fn list_page<B: Backend, T: serde::de::DeserializeOwned>(
    backend: &mut B,
    index_key: &str,
    cursor: Option<&PageCursor>,
    page_size: usize,
    doc_key: impl Fn(&str) -> String,
) -> Result<Page<T>, StoreError> {
    let page_size = check_page_size(page_size)?;
    let entries = collect_index_page(backend, index_key, cursor, page_size).await?;
    let (ids, next) = page_ids(entries, page_size);
    let keys: Vec<String> = ids.iter().map(|id| doc_key(id)).collect();
    let items = hydrate_records(backend, &keys).await?;
    Ok(Page { items, next })
}
