//! User records: lookup, availability, creation, partial update, and
//! username prefix search.
//!
//! Username uniqueness is advisory by design: `is_username_available` is a
//! point lookup, and `create` writes the username mapping last-writer-wins
//! without reserving it. Two writers racing the same name can both land;
//! callers must treat "available" as a hint, not a reservation.

use chrono::Utc;
use tracing::debug;

use super::{fetch_record, hydrate_records};
use crate::errors::StoreError;
use crate::keys::Keys;
use crate::runtime::{
    Backend, MutationCommand, MutationPlan, PlanOutcome, Precondition, encode_doc, field, record_from_doc,
};
use crate::session::Session;
use crate::types::{Mutation, User, UserInput, UserUpdate};
use crate::validate::{normalize_username, validate_new_user, validate_user_update};

pub struct ProfileStore<B: Backend> {
    backend: B,
    keys: Keys,
}

impl<B: Backend> ProfileStore<B> {
    pub(crate) fn new(backend: B, keys: Keys) -> Self {
        Self { backend, keys }
    }

    /// Member of the lexicographic username index: `{username}:{id}`.
    fn index_member(username: &str, user_id: &str) -> String {
        format!("{username}:{user_id}")
    }

    pub async fn get(&mut self, user_id: &str) -> Result<Option<User>, StoreError> {
        fetch_record(&mut self.backend, &self.keys.user(user_id)).await
    }

    /// Case-insensitive username lookup.
    pub async fn get_by_username(&mut self, username: &str) -> Result<Option<User>, StoreError> {
        let lowered = normalize_username(username);
        let Some(user_id) = self.backend.get_value(&self.keys.username(&lowered)).await? else {
            return Ok(None);
        };
        // The mapping can outlive a rename; trust the record, not the key.
        match self.get(&user_id).await? {
            Some(user) if user.username == lowered => Ok(Some(user)),
            _ => Ok(None),
        }
    }

    /// Advisory availability check: a point lookup, not a reservation.
    pub async fn is_username_available(&mut self, username: &str) -> Result<bool, StoreError> {
        Ok(self.get_by_username(username).await?.is_none())
    }

    /// Creates the user record for an externally authenticated identity.
    /// Counters start at zero; the caller is expected to have consulted
    /// [`Self::is_username_available`] first, but nothing enforces it.
    pub async fn create(&mut self, user_id: &str, email: &str, input: UserInput) -> Result<User, StoreError> {
        validate_new_user(email, &input)?;
        let username = normalize_username(&input.username);
        let now = Utc::now();
        let user = User {
            id: user_id.to_string(),
            username: username.clone(),
            email: email.to_string(),
            display_name: input.display_name.trim().to_string(),
            bio: input.bio.unwrap_or_default(),
            profile_photo_url: input.profile_photo_url.unwrap_or_default(),
            is_private: input.is_private.unwrap_or(false),
            follower_count: 0,
            following_count: 0,
            is_admin: false,
            is_banned: false,
            created_at: now,
            updated_at: now,
        };

        let user_key = self.keys.user(user_id);
        let plan = MutationPlan::new()
            .require(Precondition::KeyAbsent {
                key: user_key.clone(),
            })
            .command(MutationCommand::PutDoc {
                key: user_key,
                fields: encode_doc(&user)?,
            })
            .command(MutationCommand::PutValue {
                key: self.keys.username(&username),
                value: user_id.to_string(),
            })
            .command(MutationCommand::ZsetAdd {
                key: self.keys.username_index(),
                member: Self::index_member(&username, user_id),
                score: 0,
            });

        match self.backend.apply(&plan).await? {
            PlanOutcome::Applied { .. } => {
                debug!(user_id, %username, "created user");
                Ok(user)
            }
            PlanOutcome::RequireFailed { .. } => Err(StoreError::conflict(format!("user {user_id} already exists"))),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Merges the supplied fields into the caller's own record and
    /// refreshes `updated_at`. Returns the new record together with the
    /// one it replaced.
    pub async fn update(&mut self, session: &Session, update: UserUpdate) -> Result<Mutation<User>, StoreError> {
        validate_user_update(&update)?;
        let user_id = session.user_id();
        let current = self
            .get(user_id)
            .await?
            .ok_or_else(|| StoreError::not_found("user", user_id))?;

        // Merge only the supplied profile fields. The counters are owned
        // by the graph plans and must never be written from a stale read.
        let mut next = current.clone();
        let mut fields = Vec::new();
        if let Some(username) = &update.username {
            next.username = normalize_username(username);
            fields.push(field("username", &next.username)?);
        }
        if let Some(display_name) = update.display_name {
            next.display_name = display_name.trim().to_string();
            fields.push(field("display_name", &next.display_name)?);
        }
        if let Some(bio) = update.bio {
            next.bio = bio;
            fields.push(field("bio", &next.bio)?);
        }
        if let Some(url) = update.profile_photo_url {
            next.profile_photo_url = url;
            fields.push(field("profile_photo_url", &next.profile_photo_url)?);
        }
        if let Some(is_private) = update.is_private {
            next.is_private = is_private;
            fields.push(field("is_private", &next.is_private)?);
        }
        next.updated_at = Utc::now();
        fields.push(field("updated_at", &next.updated_at)?);

        let user_key = self.keys.user(user_id);
        let mut plan = MutationPlan::new()
            .require(Precondition::KeyExists {
                key: user_key.clone(),
            })
            .capture(user_key.clone())
            .command(MutationCommand::MergeDoc {
                key: user_key,
                fields,
            });

        if next.username != current.username {
            plan = plan
                .command(MutationCommand::DeleteKey {
                    key: self.keys.username(&current.username),
                })
                .command(MutationCommand::PutValue {
                    key: self.keys.username(&next.username),
                    value: user_id.to_string(),
                })
                .command(MutationCommand::ZsetRemove {
                    key: self.keys.username_index(),
                    member: Self::index_member(&current.username, user_id),
                })
                .command(MutationCommand::ZsetAdd {
                    key: self.keys.username_index(),
                    member: Self::index_member(&next.username, user_id),
                    score: 0,
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
            PlanOutcome::RequireFailed { .. } => Err(StoreError::not_found("user", user_id)),
            PlanOutcome::Skipped => Err(StoreError::internal("unguarded plan reported skipped")),
        }
    }

    /// Username prefix search for the explore surface. Matches are
    /// returned in username order.
    pub async fn search(&mut self, prefix: &str, limit: usize) -> Result<Vec<User>, StoreError> {
        let lowered = normalize_username(prefix);
        if lowered.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }
        let members = self
            .backend
            .zrange_lex_prefix(&self.keys.username_index(), &lowered, limit)
            .await?;
        // Usernames cannot contain ':', user ids can (external auth
        // identities), so the id is everything after the first colon.
        let keys: Vec<String> = members
            .iter()
            .filter_map(|member| member.split_once(':'))
            .map(|(_, user_id)| self.keys.user(user_id))
            .collect();
        hydrate_records(&mut self.backend, &keys).await
    }
}
