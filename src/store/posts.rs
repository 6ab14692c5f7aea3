//! Posts: creation, lookup, owner/public/tag listings, the feed, update,
//! and delete.
//!
//! Listing order comes from score indexes keyed by creation millis. A post
//! appears in: its owner's index always; the global public index, its
//! owner's public index, and one index per tag when it is public. Privacy
//! and tag edits re-home the memberships in the same plan as the document
//! merge, so a listing can never observe a half-moved post.

use chrono::Utc;
use tracing::debug;

use super::{check_page_size, collect_index_page, fetch_record, hydrate_records, list_page, page_ids, score_of};
use crate::cursor::{Page, PageCursor};
use crate::errors::StoreError;
use crate::id::generate_record_id;
use crate::keys::Keys;
use crate::limits;
use crate::runtime::{
    Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition, encode_doc, field, record_from_doc,
};
use crate::session::Session;
use crate::types::{Collection, Mutation, Post, PostInput, PostUpdate};
use crate::validate::{validate_new_post, validate_post_update};

pub struct PostStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> PostStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    /// Index memberships a public post holds beyond its owner index.
    fn public_index_keys(&self, post: &Post) -> Vec<String> {
        let mut keys = vec![
            self.keys.public_posts(),
            self.keys.public_posts_by_owner(&post.user_id),
        ];
        keys.extend(post.tags.iter().map(|tag| self.keys.public_posts_by_tag(tag)));
        keys
    }

    /// Creates a post owned by the session user. Requested collections
    /// must exist and belong to the creator; the post lands in them within
    /// the same plan, so there is no window with a half-registered post.
    pub async fn create(&mut self, session: &Session, input: PostInput) -> Result<Post, StoreError> {
        let tags = validate_new_post(&input)?;
        let user_id = session.user_id();

        let mut collection_ids: Vec<String> = Vec::new();
        for id in input.collection_ids.unwrap_or_default() {
            if !collection_ids.contains(&id) {
                collection_ids.push(id);
            }
        }
        for collection_id in &collection_ids {
            let collection: Collection = fetch_record(&mut self.backend, &self.keys.collection(collection_id))
                .await?
                .ok_or_else(|| StoreError::not_found("collection", collection_id))?;
            if collection.user_id != user_id {
                return Err(StoreError::forbidden(format!(
                    "collection {collection_id} belongs to another user"
                )));
            }
        }

        let now = Utc::now();
        let post = Post {
            id: generate_record_id(),
            user_id: user_id.to_string(),
            image_url: input.image_url,
            caption: input.caption.unwrap_or_default(),
            tags,
            collection_ids: collection_ids.clone(),
            is_private: input.is_private.unwrap_or(false),
            like_count: 0,
            created_at: now,
            updated_at: now,
        };
        let score = score_of(post.created_at);

        let mut plan = MutationPlan::new().require(Precondition::KeyExists {
            key: self.keys.user(user_id),
        });
        for collection_id in &collection_ids {
            plan = plan.require(Precondition::KeyExists {
                key: self.keys.collection(collection_id),
            });
        }
        plan = plan
            .command(MutationCommand::PutDoc {
                key: self.keys.post(&post.id),
                fields: encode_doc(&post)?,
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.posts_by_owner(user_id),
                member: post.id.clone(),
                score,
            });
        if !post.is_private {
            for key in self.public_index_keys(&post) {
                plan = plan.command(MutationCommand::ZsetAdd {
                    key,
                    member: post.id.clone(),
                    score,
                });
            }
        }
        let updated_at = field("updated_at", &now)?;
        for collection_id in &collection_ids {
            plan = plan
                .command(MutationCommand::SetAdd {
                    key: self.keys.collection_posts(collection_id),
                    member: post.id.clone(),
                })
                .command(MutationCommand::MergeDoc {
                    key: self.keys.collection(collection_id),
                    fields: vec![updated_at.clone()],
                });
        }

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(post_id = %post.id, user_id, "created post");
                Ok(post)
            }
            PlanOutcome::RequireFailed { index: 0 } => Err(StoreError::not_found("user", user_id)),
            PlanOutcome::RequireFailed { index } => {
                Err(StoreError::not_found("collection", collection_ids[index - 1].clone()))
            }
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    pub async fn get(&mut self, post_id: &str) -> Result<Option<Post>, StoreError> {
        fetch_record(&mut self.backend, &self.keys.post(post_id)).await
    }

    /// All posts by one owner, newest first, private included. The profile
    /// surface decides what a visitor may see.
    pub async fn list_by_owner(
        &mut self,
        user_id: &str,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page<Post>, StoreError> {
        let index = self.keys.posts_by_owner(user_id);
        let keys = self.keys.clone();
        list_page(&mut self.backend, &index, cursor, page_size, |id| keys.post(id)).await
    }

    /// Public posts, newest first, optionally narrowed to one tag.
    pub async fn list_public(
        &mut self,
        tag_filter: Option<&str>,
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page<Post>, StoreError> {
        let index = match tag_filter {
            Some(tag) => self.keys.public_posts_by_tag(&tag.trim().to_ascii_lowercase()),
            None => self.keys.public_posts(),
        };
        let keys = self.keys.clone();
        list_page(&mut self.backend, &index, cursor, page_size, |id| keys.post(id)).await
    }

    /// Feed page: public posts of the supplied owners, merge-sorted across
    /// their per-owner indexes. At most [`limits::MAX_FEED_OWNERS`] owners
    /// per call; callers following more accounts shard their owner set.
    pub async fn list_feed(
        &mut self,
        owner_ids: &[String],
        cursor: Option<&PageCursor>,
        page_size: usize,
    ) -> Result<Page<Post>, StoreError> {
        let page_size = check_page_size(page_size)?;

        let mut owners: Vec<&str> = Vec::new();
        for id in owner_ids {
            if !owners.contains(&id.as_str()) {
                owners.push(id.as_str());
            }
        }
        if owners.is_empty() {
            return Ok(Page::empty());
        }
        if owners.len() > limits::MAX_FEED_OWNERS {
            return Err(StoreError::invalid(format!(
                "feed fan-in is capped at {} owners per call ({} supplied); shard the owner set",
                limits::MAX_FEED_OWNERS,
                owners.len()
            )));
        }

        // Each owner stream is cut at the same global cursor, so merging
        // page-size slices from every stream cannot miss an entry that
        // belongs on this page.
        let mut merged: Vec<(String, i64)> = Vec::new();
        for owner in owners {
            let index = self.keys.public_posts_by_owner(owner);
            let entries = collect_index_page(&mut self.backend, &index, cursor, page_size).await?;
            merged.extend(entries);
        }
        merged.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        merged.truncate(page_size + 1);

        let (ids, next) = page_ids(merged, page_size);
        let keys: Vec<String> = ids.iter().map(|id| self.keys.post(id)).collect();
        let items = hydrate_records(&mut self.backend, &keys).await?;
        Ok(Page { items, next })
    }

    /// Owner-only metadata update. Privacy and tag changes move the post
    /// between listing indexes atomically with the document merge.
    pub async fn update(
        &mut self,
        session: &Session,
        post_id: &str,
        update: PostUpdate,
    ) -> Result<Mutation<Post>, StoreError> {
        let tags = validate_post_update(&update)?;
        let current = self
            .get(post_id)
            .await?
            .ok_or_else(|| StoreError::not_found("post", post_id))?;
        if current.user_id != session.user_id() {
            return Err(StoreError::forbidden("only the owner may edit a post"));
        }

        let mut next = current.clone();
        let mut fields = Vec::new();
        if let Some(caption) = update.caption {
            next.caption = caption;
            fields.push(field("caption", &next.caption)?);
        }
        if let Some(tags) = tags {
            next.tags = tags;
            fields.push(field("tags", &next.tags)?);
        }
        if let Some(is_private) = update.is_private {
            next.is_private = is_private;
            fields.push(field("is_private", &next.is_private)?);
        }
        next.updated_at = Utc::now();
        fields.push(field("updated_at", &next.updated_at)?);

        let post_key = self.keys.post(post_id);
        let mut plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: post_key.clone(),
            })
            .capture(post_key.clone())
            .command(MutationCommand::MergeDoc {
                key: post_key,
                fields,
            });

        // Re-home index memberships. Listing scores stay pinned to the
        // creation time, so edits do not bump a post to the top.
        let score = score_of(current.created_at);
        let before: Vec<String> = if current.is_private {
            Vec::new()
        } else {
            self.public_index_keys(&current)
        };
        let after: Vec<String> = if next.is_private {
            Vec::new()
        } else {
            self.public_index_keys(&next)
        };
        for key in before.iter().filter(|key| !after.contains(key)) {
            plan = plan.command(MutationCommand::ZsetRemove {
                key: key.clone(),
                member: post_id.to_string(),
            });
        }
        for key in after.iter().filter(|key| !before.contains(key)) {
            plan = plan.command(MutationCommand::ZsetAdd {
                key: key.clone(),
                member: post_id.to_string(),
                score,
            });
        }

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { previous } => {
                let previous = match previous {
                    Some(doc) => record_from_doc(doc)?,
                    None => current,
                };
                Ok(Mutation {
                    record: next,
                    previous,
                })
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Owner-only delete. Removes the document and the post's own index
    /// memberships; ids already filed into collections and liker sets stay
    /// behind and are filtered out when those are read.
    pub async fn delete(&mut self, session: &Session, post_id: &str) -> Result<Post, StoreError> {
        let current = self
            .get(post_id)
            .await?
            .ok_or_else(|| StoreError::not_found("post", post_id))?;
        if current.user_id != session.user_id() {
            return Err(StoreError::forbidden("only the owner may delete a post"));
        }

        let post_key = self.keys.post(post_id);
        let mut plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: post_key.clone(),
            })
            .capture(post_key.clone())
            .command(MutationCommand::DeleteKey { key: post_key })
            .command(MutationCommand::ZsetRemove {
                key: self.keys.posts_by_owner(&current.user_id),
                member: post_id.to_string(),
            });
        if !current.is_private {
            for key in self.public_index_keys(&current) {
                plan = plan.command(MutationCommand::ZsetRemove {
                    key,
                    member: post_id.to_string(),
                });
            }
        }

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { previous } => {
                debug!(post_id, "deleted post");
                match previous {
                    Some(doc) => record_from_doc(doc),
                    None => Ok(current),
                }
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }
}
