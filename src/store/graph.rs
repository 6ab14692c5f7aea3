//! Follow edges and their denormalized counters.
//!
//! An edge lives in two sets at once (the follower's `following` and the
//! followee's `followers`), and both user counters move in the same plan
//! as the sets, so `follower_count`/`following_count` always equal the
//! true edge counts. Repeats are no-ops reported through the `changed`
//! return, not errors.

use tracing::debug;

use crate::errors::StoreError;
use crate::keys::Keys;
use crate::runtime::{Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition};
use crate::session::Session;

pub struct GraphStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> GraphStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    /// Creates the follow edge from the session user to `target_id`.
    /// Returns `false` when the edge already existed.
    pub async fn follow(&mut self, session: &Session, target_id: &str) -> Result<bool, StoreError> {
        let follower_id = session.user_id();
        if follower_id == target_id {
            return Err(StoreError::invalid("cannot follow yourself"));
        }

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.user(follower_id),
            })
            .require(Precondition::KeyExists {
                key: self.keys.user(target_id),
            })
            .guard(Precondition::SetMissing {
                key: self.keys.following(follower_id),
                member: target_id.to_string(),
            })
            .command(MutationCommand::SetAdd {
                key: self.keys.following(follower_id),
                member: target_id.to_string(),
            })
            .command(MutationCommand::SetAdd {
                key: self.keys.followers(target_id),
                member: follower_id.to_string(),
            })
            .command(MutationCommand::IncrField {
                key: self.keys.user(follower_id),
                field: "following_count".to_string(),
                delta: 1,
            })
            .command(MutationCommand::IncrField {
                key: self.keys.user(target_id),
                field: "follower_count".to_string(),
                delta: 1,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(follower_id, target_id, "followed");
                Ok(true)
            }
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { index: 0 } => Err(StoreError::not_found("user", follower_id)),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("user", target_id)),
        }
    }

    /// Removes the follow edge. Returns `false` when it did not exist.
    pub async fn unfollow(&mut self, session: &Session, target_id: &str) -> Result<bool, StoreError> {
        let follower_id = session.user_id();
        if follower_id == target_id {
            return Err(StoreError::invalid("cannot unfollow yourself"));
        }

        let plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: self.keys.user(follower_id),
            })
            .require(Precondition::KeyExists {
                key: self.keys.user(target_id),
            })
            .guard(Precondition::SetContains {
                key: self.keys.following(follower_id),
                member: target_id.to_string(),
            })
            .command(MutationCommand::SetRemove {
                key: self.keys.following(follower_id),
                member: target_id.to_string(),
            })
            .command(MutationCommand::SetRemove {
                key: self.keys.followers(target_id),
                member: follower_id.to_string(),
            })
            .command(MutationCommand::IncrField {
                key: self.keys.user(follower_id),
                field: "following_count".to_string(),
                delta: -1,
            })
            .command(MutationCommand::IncrField {
                key: self.keys.user(target_id),
                field: "follower_count".to_string(),
                delta: -1,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(follower_id, target_id, "unfollowed");
                Ok(true)
            }
            PlanOutcome::Skipped => Ok(false),
            PlanOutcome::RequireFailed { index: 0 } => Err(StoreError::not_found("user", follower_id)),
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("user", target_id)),
        }
    }

    pub async fn is_following(&mut self, follower_id: &str, target_id: &str) -> Result<bool, StoreError> {
        self.backend
            .set_contains(&self.keys.following(follower_id), target_id)
            .await
    }

    /// Ids of users who follow `user_id`. Unordered.
    pub async fn followers(&mut self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.backend.set_members(&self.keys.followers(user_id)).await
    }

    /// Ids of users `user_id` follows. Unordered.
    pub async fn following(&mut self, user_id: &str) -> Result<Vec<String>, StoreError> {
        self.backend.set_members(&self.keys.following(user_id)).await
    }
}
