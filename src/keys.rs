//! Key-construction helpers shared by every store handle.
//!
//! Layout: `{prefix}:{kind}:{...}`. Documents live under their record id,
//! listings under score-ordered index keys, edges under forward/reverse
//! set pairs.

use crate::types::ReportStatus;

#[derive(Debug, Clone)]
pub struct Keys {
    prefix: String,
}

impl Keys {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    // Documents

    pub fn user(&self, user_id: &str) -> String {
        format!("{}:user:{user_id}", self.prefix)
    }

    pub fn post(&self, post_id: &str) -> String {
        format!("{}:post:{post_id}", self.prefix)
    }

    pub fn collection(&self, collection_id: &str) -> String {
        format!("{}:collection:{collection_id}", self.prefix)
    }

    pub fn report(&self, report_id: &str) -> String {
        format!("{}:report:{report_id}", self.prefix)
    }

    // Plain-value mappings

    /// Lowercased username -> user id. Written last-writer-wins; the
    /// availability check against it is advisory, not a reservation.
    pub fn username(&self, lowered: &str) -> String {
        format!("{}:username:{lowered}", self.prefix)
    }

    /// User id -> id of that user's wishlist collection.
    pub fn wishlist(&self, user_id: &str) -> String {
        format!("{}:wishlist:{user_id}", self.prefix)
    }

    // Score-ordered indexes (score = creation time in millis)

    pub fn posts_by_owner(&self, user_id: &str) -> String {
        format!("{}:idx:posts:owner:{user_id}", self.prefix)
    }

    /// Public posts of one owner; the feed merges across these.
    pub fn public_posts_by_owner(&self, user_id: &str) -> String {
        format!("{}:idx:posts:pub_owner:{user_id}", self.prefix)
    }

    pub fn public_posts(&self) -> String {
        format!("{}:idx:posts:public", self.prefix)
    }

    pub fn public_posts_by_tag(&self, tag: &str) -> String {
        format!("{}:idx:posts:tag:{tag}", self.prefix)
    }

    pub fn collections_by_owner(&self, user_id: &str) -> String {
        format!("{}:idx:collections:owner:{user_id}", self.prefix)
    }

    pub fn reports_by_status(&self, status: ReportStatus) -> String {
        format!("{}:idx:reports:{}", self.prefix, status.as_str())
    }

    /// Lexicographic username index for prefix search. Members are
    /// `{username}:{user_id}` at a constant score.
    pub fn username_index(&self) -> String {
        format!("{}:idx:usernames", self.prefix)
    }

    // Edge sets

    /// Ids of users who follow `user_id`.
    pub fn followers(&self, user_id: &str) -> String {
        format!("{}:edge:followers:{user_id}", self.prefix)
    }

    /// Ids of users `user_id` follows.
    pub fn following(&self, user_id: &str) -> String {
        format!("{}:edge:following:{user_id}", self.prefix)
    }

    /// Ids of users who liked `post_id`.
    pub fn post_likes(&self, post_id: &str) -> String {
        format!("{}:edge:likes:{post_id}", self.prefix)
    }

    /// Ids of posts filed into `collection_id`. Membership truth lives
    /// here, not in the collection document.
    pub fn collection_posts(&self, collection_id: &str) -> String {
        format!("{}:edge:collection_posts:{collection_id}", self.prefix)
    }
}
