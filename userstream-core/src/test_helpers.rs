//! Test helpers and fixtures for userstream-core tests

use crate::models::{User, UserId, NOT_SET};

/// Test fixture builder for User
pub struct UserFixture {
    id: UserId,
    first_name: String,
    last_name: String,
    created_at: i64,
    parent_user_id: Option<UserId>,
}

impl UserFixture {
    pub fn new() -> Self {
        Self {
            id: 1,
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            created_at: 1_700_000_000_000,
            parent_user_id: None,
        }
    }

    pub fn with_id(mut self, id: UserId) -> Self {
        self.id = id;
        self
    }

    pub fn with_name(mut self, first: &str, last: &str) -> Self {
        self.first_name = first.to_string();
        self.last_name = last.to_string();
        self
    }

    pub fn with_parent(mut self, parent: UserId) -> Self {
        self.parent_user_id = Some(parent);
        self
    }

    pub fn build(self) -> User {
        User {
            id: self.id,
            email_address: format!("user{}@example.com", self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            created_at: self.created_at,
            deleted_at: NOT_SET,
            merged_at: NOT_SET,
            parent_user_id: self.parent_user_id,
        }
    }
}

impl Default for UserFixture {
    fn default() -> Self {
        Self::new()
    }
}
