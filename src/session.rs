//! Explicit caller identity.
//!
//! Every mutating operation takes a [`Session`] instead of reading an
//! ambient "current user". The store trusts the id: authentication belongs
//! to the platform in front of it, ownership checks belong here.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    user_id: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}
