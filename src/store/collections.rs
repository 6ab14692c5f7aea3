//! Collections, including the wishlist.
//!
//! Each user gets exactly one wishlist, bootstrapped at profile setup
//! behind a guarded plan keyed on the wishlist pointer, so concurrent
//! setup calls converge on a single record. The wishlist cannot be renamed
//! or deleted; the store enforces that, not the caller.
//!
//! Membership truth lives in a per-collection set. Collection documents
//! carry no post ids; reads hydrate the set and post hydration quietly
//! drops ids whose post has since been deleted.

use chrono::Utc;
use tracing::debug;

use super::{collect_index_all, fetch_record, hydrate_records, score_of};
use crate::errors::StoreError;
use crate::id::generate_record_id;
use crate::keys::Keys;
use crate::limits;
use crate::runtime::{
    Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition, encode_doc, field, record_from_doc,
};
use crate::session::Session;
use crate::types::{Collection, CollectionInput, CollectionUpdate, Mutation, Post};
use crate::validate::{validate_collection_update, validate_new_collection};

pub struct CollectionStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> CollectionStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    async fn hydrate_post_ids(&mut self, collection: &mut Collection) -> Result<(), StoreError> {
        let mut ids = self
            .backend
            .set_members(&self.keys.collection_posts(&collection.id))
            .await?;
        ids.sort();
        collection.post_ids = ids;
        Ok(())
    }

    /// Creates a regular collection owned by the session user.
    pub async fn create(&mut self, session: &Session, input: CollectionInput) -> Result<Collection, StoreError> {
        validate_new_collection(&input)?;
        let user_id = session.user_id();

        let now = Utc::now();
        let collection = Collection {
            id: generate_record_id(),
            user_id: user_id.to_string(),
            name: input.name.trim().to_string(),
            is_private: input.is_private.unwrap_or(false),
            is_wishlist: false,
            post_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.user(user_id),
            })
            .command(MutationCommand::PutDoc {
                key: self.keys.collection(&collection.id),
                fields: encode_doc(&collection)?,
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.collections_by_owner(user_id),
                member: collection.id.clone(),
                score: score_of(collection.created_at),
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(collection_id = %collection.id, user_id, "created collection");
                Ok(collection)
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("user", user_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Creates the user's wishlist if it does not exist yet and returns it
    /// either way. The guard on the wishlist pointer makes concurrent
    /// calls converge: whoever loses the race reads the winner's record.
    pub async fn ensure_wishlist(&mut self, user_id: &str) -> Result<Collection, StoreError> {
        let pointer_key = self.keys.wishlist(user_id);

        let now = Utc::now();
        let wishlist = Collection {
            id: generate_record_id(),
            user_id: user_id.to_string(),
            name: limits::WISHLIST_NAME.to_string(),
            is_private: true,
            is_wishlist: true,
            post_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.user(user_id),
            })
            .guard(Precondition::KeyAbsent {
                key: pointer_key.clone(),
            })
            .command(MutationCommand::PutDoc {
                key: self.keys.collection(&wishlist.id),
                fields: encode_doc(&wishlist)?,
            })
            .command(MutationCommand::PutValue {
                key: pointer_key.clone(),
                value: wishlist.id.clone(),
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.collections_by_owner(user_id),
                member: wishlist.id.clone(),
                score: score_of(wishlist.created_at),
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(user_id, wishlist_id = %wishlist.id, "created wishlist");
                Ok(wishlist)
            }
            PlanOutcome::Skipped => {
                let existing_id = self
                    .backend
                    .get_value(&pointer_key)
                    .await?
                    .ok_or_else(|| StoreError::internal("wishlist pointer vanished"))?;
                self.get(&existing_id)
                    .await?
                    .ok_or_else(|| StoreError::not_found("collection", existing_id))
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("user", user_id)),
        }
    }

    pub async fn get(&mut self, collection_id: &str) -> Result<Option<Collection>, StoreError> {
        let Some(mut collection) =
            fetch_record::<_, Collection>(&mut self.backend, &self.keys.collection(collection_id)).await?
        else {
            return Ok(None);
        };
        self.hydrate_post_ids(&mut collection).await?;
        Ok(Some(collection))
    }

    /// The user's wishlist, if their profile has been set up.
    pub async fn wishlist(&mut self, user_id: &str) -> Result<Option<Collection>, StoreError> {
        let Some(id) = self.backend.get_value(&self.keys.wishlist(user_id)).await? else {
            return Ok(None);
        };
        self.get(&id).await
    }

    /// All collections of one owner, newest first. Collection counts stay
    /// small (they are user-curated), so this returns the full list.
    pub async fn list_by_owner(&mut self, user_id: &str) -> Result<Vec<Collection>, StoreError> {
        let entries = collect_index_all(&mut self.backend, &self.keys.collections_by_owner(user_id)).await?;
        let keys: Vec<String> = entries
            .iter()
            .map(|(id, _)| self.keys.collection(id))
            .collect();
        let mut collections: Vec<Collection> = hydrate_records(&mut self.backend, &keys).await?;
        for collection in &mut collections {
            self.hydrate_post_ids(collection).await?;
        }
        Ok(collections)
    }

    async fn owned_collection(
        &mut self,
        session: &Session,
        collection_id: &str,
    ) -> Result<Collection, StoreError> {
        let collection = self
            .get(collection_id)
            .await?
            .ok_or_else(|| StoreError::not_found("collection", collection_id))?;
        if collection.user_id != session.user_id() {
            return Err(StoreError::forbidden("only the owner may modify a collection"));
        }
        Ok(collection)
    }

    /// Files a post into an owned collection. Returns `false` when it was
    /// already there.
    pub async fn add_post(
        &mut self,
        session: &Session,
        collection_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError> {
        self.owned_collection(session, collection_id).await?;
        let members_key = self.keys.collection_posts(collection_id);

        // The collection was just read, but it can be deleted before the
        // plan runs; the precondition keeps that window closed.
        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.collection(collection_id),
            })
            .require(Precondition::KeyExists {
                key: self.keys.post(post_id),
            })
            .guard(Precondition::SetMissing {
                key: members_key.clone(),
                member: post_id.to_string(),
            })
            .command(MutationCommand::SetAdd {
                key: members_key,
                member: post_id.to_string(),
            })
            .command(MutationCommand::MergeDoc {
                key: self.keys.collection(collection_id),
                fields: vec![field("updated_at", &Utc::now())?],
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => Ok(true),
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { index: 0 } => Err(StoreError::not_found("collection", collection_id)),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
        }
    }

    /// Removes a post from an owned collection. Returns `false` when it
    /// was not there. Works even if the post record is already gone, which
    /// is how dangling ids get cleaned up.
    pub async fn remove_post(
        &mut self,
        session: &Session,
        collection_id: &str,
        post_id: &str,
    ) -> Result<bool, StoreError> {
        self.owned_collection(session, collection_id).await?;
        let members_key = self.keys.collection_posts(collection_id);

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.collection(collection_id),
            })
            .guard(Precondition::SetContains {
                key: members_key.clone(),
                member: post_id.to_string(),
            })
            .command(MutationCommand::SetRemove {
                key: members_key,
                member: post_id.to_string(),
            })
            .command(MutationCommand::MergeDoc {
                key: self.keys.collection(collection_id),
                fields: vec![field("updated_at", &Utc::now())?],
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => Ok(true),
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("collection", collection_id)),
        }
    }

    /// True if `post_id` is filed into `collection_id`.
    pub async fn contains(&mut self, collection_id: &str, post_id: &str) -> Result<bool, StoreError> {
        self.backend
            .set_contains(&self.keys.collection_posts(collection_id), post_id)
            .await
    }

    /// The posts filed into a collection, newest first. Ids whose post was
    /// deleted are dropped silently.
    pub async fn posts(&mut self, collection_id: &str) -> Result<Vec<Post>, StoreError> {
        let collection = self
            .get(collection_id)
            .await?
            .ok_or_else(|| StoreError::not_found("collection", collection_id))?;
        let keys: Vec<String> = collection.post_ids.iter().map(|id| self.keys.post(id)).collect();
        let mut posts: Vec<Post> = hydrate_records(&mut self.backend, &keys).await?;
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(posts)
    }

    /// Renames or re-privatizes an owned collection. The wishlist is off
    /// limits.
    pub async fn update(
        &mut self,
        session: &Session,
        collection_id: &str,
        update: CollectionUpdate,
    ) -> Result<Mutation<Collection>, StoreError> {
        validate_collection_update(&update)?;
        let current = self.owned_collection(session, collection_id).await?;
        if current.is_wishlist {
            return Err(StoreError::forbidden("the wishlist cannot be edited"));
        }

        let mut next = current.clone();
        let mut fields = Vec::new();
        if let Some(name) = update.name {
            next.name = name.trim().to_string();
            fields.push(field("name", &next.name)?);
        }
        if let Some(is_private) = update.is_private {
            next.is_private = is_private;
            fields.push(field("is_private", &next.is_private)?);
        }
        next.updated_at = Utc::now();
        fields.push(field("updated_at", &next.updated_at)?);

        let collection_key = self.keys.collection(collection_id);
        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: collection_key.clone(),
            })
            .capture(collection_key.clone())
            .command(MutationCommand::MergeDoc {
                key: collection_key,
                fields,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { previous } => {
                let mut previous: Collection = match previous {
                    Some(doc) => record_from_doc(doc)?,
                    None => current,
                };
                previous.post_ids = next.post_ids.clone();
                Ok(Mutation {
                    record: next,
                    previous,
                })
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("collection", collection_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Deletes an owned, non-wishlist collection along with its membership
    /// set. Posts filed into it are untouched.
    pub async fn delete(&mut self, session: &Session, collection_id: &str) -> Result<Collection, StoreError> {
        let current = self.owned_collection(session, collection_id).await?;
        if current.is_wishlist {
            return Err(StoreError::forbidden("the wishlist cannot be deleted"));
        }

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.collection(collection_id),
            })
            .command(MutationCommand::DeleteKey {
                key: self.keys.collection(collection_id),
            })
            .command(MutationCommand::DeleteKey {
                key: self.keys.collection_posts(collection_id),
            })
            .command(MutationCommand::ZsetRemove {
                key: self.keys.collections_by_owner(&current.user_id),
                member: collection_id.to_string(),
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(collection_id, "deleted collection");
                Ok(current)
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("collection", collection_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Files a post into the session user's wishlist.
    pub async fn save_post(&mut self, session: &Session, post_id: &str) -> Result<bool, StoreError> {
        let wishlist = self.ensure_wishlist(session.user_id()).await?;
        self.add_post(session, &wishlist.id, post_id).await
    }

    /// Removes a post from the session user's wishlist.
    pub async fn unsave_post(&mut self, session: &Session, post_id: &str) -> Result<bool, StoreError> {
        let Some(wishlist) = self.wishlist(session.user_id()).await? else {
            return Ok(false);
        };
        self.remove_post(session, &wishlist.id, post_id).await
    }

    /// True if the session user's wishlist contains `post_id`.
    pub async fn is_saved(&mut self, session: &Session, post_id: &str) -> Result<bool, StoreError> {
        let Some(id) = self
            .backend
            .get_value(&self.keys.wishlist(session.user_id()))
            .await?
        else {
            return Ok(false);
        };
        self.contains(&id, post_id).await
    }
}
