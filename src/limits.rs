//! Size and shape bounds enforced at the store boundary.
//!
//! Anything larger is rejected with a validation error before a single
//! backend call is made.

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 30;
pub const BIO_MAX_LENGTH: usize = 200;
pub const CAPTION_MAX_LENGTH: usize = 500;
pub const COLLECTION_NAME_MAX_LENGTH: usize = 50;
pub const MAX_TAGS_PER_POST: usize = 10;
pub const TAG_MAX_LENGTH: usize = 30;

/// Hard cap on a single page.
pub const MAX_PAGE_SIZE: usize = 100;

/// Most owners a single feed query will merge across. Callers following
/// more accounts must shard their owner set over several calls.
pub const MAX_FEED_OWNERS: usize = 30;

/// Fixed name of the per-user wishlist collection.
pub const WISHLIST_NAME: &str = "My Wishlist";
