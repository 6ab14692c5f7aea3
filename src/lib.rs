//! h4ul-store: the data-access layer behind the h4ul fashion catalogue.
//!
//! The crate stores users, posts, the follow graph, likes, collections,
//! and moderation reports as JSON documents in Redis, with score-ordered
//! indexes for every listing surface. All multi-key writes go through
//! mutation plans applied in a single Lua script, so denormalized counters
//! and index memberships never drift from the records they describe.
//!
//! ```no_run
//! use h4ul_store::{Store, StoreConfig, UserInput};
//!
//! # async fn demo() -> Result<(), h4ul_store::StoreError> {
//! let store = Store::connect(&StoreConfig::from_env()).await?;
//! let (user, wishlist) = store
//!     .setup_profile("auth0|42", "ada@example.com", UserInput {
//!         username: "Ada_Lovelace".into(),
//!         display_name: "Ada".into(),
//!         ..Default::default()
//!     })
//!     .await?;
//! assert_eq!(user.username, "ada_lovelace");
//! assert!(wishlist.is_wishlist);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod cursor;
pub mod errors;
pub mod id;
pub mod keys;
pub mod limits;
pub mod runtime;
pub mod session;
pub mod store;
pub mod types;
pub mod validate;

pub use config::StoreConfig;
pub use cursor::{Page, PageCursor};
pub use errors::{StoreError, ValidationError, ValidationIssue};
pub use runtime::{Backend, MemoryBackend, RedisBackend};
pub use session::Session;
pub use store::{
    CollectionStore, EngagementStore, GraphStore, PostStore, ProfileStore, ReportStore, Store,
};
pub use types::{
    Collection, CollectionInput, CollectionUpdate, Mutation, Post, PostInput, PostUpdate, Report,
    ReportReason, ReportStatus, User, UserInput, UserUpdate,
};
