//! Likes.
//!
//! A like is membership of the user id in the post's liker set; the set
//! mutation and the `like_count` adjustment share one plan, so a repeated
//! like can never double-increment and the counter cannot drift.

use tracing::debug;

use crate::errors::StoreError;
use crate::keys::Keys;
use crate::runtime::{Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition};
use crate::session::Session;

pub struct EngagementStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> EngagementStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    /// Likes a post. Returns `false` when the session user already liked
    /// it (the counter is untouched in that case).
    pub async fn like(&mut self, session: &Session, post_id: &str) -> Result<bool, StoreError> {
        let user_id = session.user_id();
        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.post(post_id),
            })
            .guard(Precondition::SetMissing {
                key: self.keys.post_likes(post_id),
                member: user_id.to_string(),
            })
            .command(MutationCommand::SetAdd {
                key: self.keys.post_likes(post_id),
                member: user_id.to_string(),
            })
            .command(MutationCommand::IncrField {
                key: self.keys.post(post_id),
                field: "like_count".to_string(),
                delta: 1,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(user_id, post_id, "liked");
                Ok(true)
            }
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
        }
    }

    /// Removes a like. Returns `false` when there was none.
    pub async fn unlike(&mut self, session: &Session, post_id: &str) -> Result<bool, StoreError> {
        let user_id = session.user_id();
        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.post(post_id),
            })
            .guard(Precondition::SetContains {
                key: self.keys.post_likes(post_id),
                member: user_id.to_string(),
            })
            .command(MutationCommand::SetRemove {
                key: self.keys.post_likes(post_id),
                member: user_id.to_string(),
            })
            .command(MutationCommand::IncrField {
                key: self.keys.post(post_id),
                field: "like_count".to_string(),
                delta: -1,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(user_id, post_id, "unliked");
                Ok(true)
            }
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("post", post_id)),
        }
    }

    pub async fn is_liked(&mut self, user_id: &str, post_id: &str) -> Result<bool, StoreError> {
        self.backend.set_contains(&self.keys.post_likes(post_id), user_id).await
    }

    /// Ids of users who liked the post. Unordered.
    pub async fn likers(&mut self, post_id: &str) -> Result<Vec<String>, StoreError> {
        self.backend.set_members(&self.keys.post_likes(post_id)).await
    }
}
