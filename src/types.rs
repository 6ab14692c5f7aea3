//! Domain records and the input/update structs accepted at the store
//! boundary.
//!
//! Records are stored as JSON documents; `created_at`/`updated_at` are
//! RFC3339 via chrono, and the millisecond value of `created_at` doubles
//! as the score in the ordered listing indexes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalogue member.
///
/// `follower_count`/`following_count` are denormalized and maintained in
/// the same atomic plan as the edge mutation, so they cannot drift from
/// the edge sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    /// Stored lowercased; uniqueness is advisory (see `ProfileStore`).
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub profile_photo_url: String,
    pub is_private: bool,
    pub follower_count: i64,
    pub following_count: i64,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single h4ul: one image, a caption, and up to ten tags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    pub caption: String,
    pub tags: Vec<String>,
    /// Collections the post was filed into at creation time. Membership
    /// truth lives in `Collection::post_ids`; this field is not updated
    /// afterwards.
    pub collection_ids: Vec<String>,
    pub is_private: bool,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A named grouping of posts. At most one wishlist exists per user; it is
/// created at profile setup and cannot be deleted or renamed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub is_private: bool,
    pub is_wishlist: bool,
    /// Set semantics: add is a union, remove a difference. Not part of the
    /// stored document; hydrated from the membership set on read. May
    /// contain ids of since-deleted posts, which post hydration filters.
    #[serde(default, skip_serializing)]
    pub post_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Inappropriate,
    Spam,
    Harassment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Reviewed,
    Actioned,
}

impl ReportStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Actioned => "actioned",
        }
    }
}

/// A moderation report against a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub id: String,
    pub reporter_id: String,
    pub post_id: String,
    pub reason: ReportReason,
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
}

// Inputs. Optional fields default the same way the records do.

#[derive(Debug, Clone, Default)]
pub struct UserInput {
    pub username: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub profile_photo_url: Option<String>,
    pub is_private: Option<bool>,
}

/// Partial profile update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub profile_photo_url: Option<String>,
    pub is_private: Option<bool>,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.bio.is_none()
            && self.profile_photo_url.is_none()
            && self.is_private.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostInput {
    pub image_url: String,
    pub caption: Option<String>,
    pub tags: Option<Vec<String>>,
    pub collection_ids: Option<Vec<String>>,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct PostUpdate {
    pub caption: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_private: Option<bool>,
}

impl PostUpdate {
    pub fn is_empty(&self) -> bool {
        self.caption.is_none() && self.tags.is_none() && self.is_private.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionInput {
    pub name: String,
    pub is_private: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct CollectionUpdate {
    pub name: Option<String>,
    pub is_private: Option<bool>,
}

impl CollectionUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.is_private.is_none()
    }
}

/// Result of an update-style mutation: the new record plus the one it
/// replaced, so callers can implement their own compensation instead of
/// relying on implicit rollback closures.
#[derive(Debug, Clone)]
pub struct Mutation<T> {
    pub record: T,
    pub previous: T,
}
