//! Persisted entities

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A registered account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
}

/// A titled note owned by exactly one user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub user_id: i64,
}

/// An entry joined with its owner's username, for the admin dashboard
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnedEntry {
    pub entry: Entry,
    pub owner: String,
}
