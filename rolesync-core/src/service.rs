//! Membership service trait and the records it exchanges.
//!
//! The [`MembershipService`] trait is the only seam between reconciliation
//! and the remote system. [`GitLabClient`](crate::GitLabClient) implements
//! it over the GitLab REST API; the in-memory `MockMembershipService`
//! implements it for tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{AccessLevel, Error, Result};

/// Path separator between a group and its parent.
pub const GROUP_PATH_SEPARATOR: char = '/';

/// A group as listed by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: u64,
    pub full_path: String,
}

impl Group {
    pub fn new(id: u64, full_path: impl Into<String>) -> Self {
        Self {
            id,
            full_path: full_path.into(),
        }
    }

    /// Whether the group has no parent group.
    pub fn is_top_level(&self) -> bool {
        !self.full_path.contains(GROUP_PATH_SEPARATOR)
    }
}

/// A direct member of a group. `id` is the member's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: u64,
    pub username: String,
    pub access_level: AccessLevel,
}

impl Member {
    pub fn new(id: u64, username: impl Into<String>, access_level: impl Into<AccessLevel>) -> Self {
        Self {
            id,
            username: username.into(),
            access_level: access_level.into(),
        }
    }
}

/// A user identity returned by a username lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
}

impl User {
    pub fn new(id: u64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }
}

/// Operations reconciliation needs from the remote membership service.
///
/// Every listing method returns the fully materialized collection; any
/// pagination is the implementation's concern.
#[async_trait]
pub trait MembershipService: Send + Sync {
    /// List every group visible to the caller.
    async fn list_groups(&self) -> Result<Vec<Group>>;

    /// List the direct members of a group.
    async fn list_members(&self, group_id: u64) -> Result<Vec<Member>>;

    /// Change the access level of an existing member.
    async fn update_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()>;

    /// Search users by username. May return partial or case-insensitive
    /// matches; see [`resolve_user`] for the exact lookup.
    async fn find_users(&self, username: &str) -> Result<Vec<User>>;

    /// Add a user to a group with the given access level.
    async fn add_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()>;
}

/// Resolve a username to exactly one user identity.
///
/// Only case-sensitive exact matches count. Zero matches is
/// [`Error::UserNotFound`], more than one is [`Error::AmbiguousUser`].
pub async fn resolve_user<S>(service: &S, username: &str) -> Result<User>
where
    S: MembershipService + ?Sized,
{
    let mut matches: Vec<User> = service
        .find_users(username)
        .await?
        .into_iter()
        .filter(|user| user.username == username)
        .collect();

    debug!(username, matches = matches.len(), "resolved user lookup");

    match matches.len() {
        0 => Err(Error::UserNotFound(username.to_string())),
        1 => Ok(matches.remove(0)),
        count => Err(Error::AmbiguousUser {
            username: username.to_string(),
            count,
        }),
    }
}
