//! In-memory membership service for testing.
//!
//! `MockMembershipService` holds groups, members and users in memory,
//! applies mutations to that state, and records every call so tests can
//! assert on exactly which requests reconciliation made.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::service::{Group, Member, MembershipService, User};
use crate::{AccessLevel, Error, Result};

/// A call recorded by [`MockMembershipService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    ListGroups,
    ListMembers {
        group_id: u64,
    },
    UpdateMember {
        group_id: u64,
        user_id: u64,
        level: AccessLevel,
    },
    FindUsers {
        username: String,
    },
    AddMember {
        group_id: u64,
        user_id: u64,
        level: AccessLevel,
    },
}

impl MockCall {
    /// Whether the call changes remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(self, MockCall::UpdateMember { .. } | MockCall::AddMember { .. })
    }
}

#[derive(Debug, Default)]
struct MockState {
    groups: Vec<Group>,
    members: HashMap<u64, Vec<Member>>,
    users: Vec<User>,
    calls: Vec<MockCall>,
    fail_on_add: Option<u64>,
}

/// Mock implementation of [`MembershipService`] for testing.
///
/// Build the remote state with the `with_*` methods, run a reconciliation,
/// then inspect [`calls`](Self::calls) and [`members_of`](Self::members_of).
#[derive(Debug, Default)]
pub struct MockMembershipService {
    state: Mutex<MockState>,
}

impl MockMembershipService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a group with no members.
    pub fn with_group(mut self, group: Group) -> Self {
        let state = self.state.get_mut();
        state.members.entry(group.id).or_default();
        state.groups.push(group);
        self
    }

    /// Add a member to a group added earlier.
    pub fn with_member(mut self, group_id: u64, member: Member) -> Self {
        self.state
            .get_mut()
            .members
            .entry(group_id)
            .or_default()
            .push(member);
        self
    }

    /// Register a user that lookups can find.
    pub fn with_user(mut self, user: User) -> Self {
        self.state.get_mut().users.push(user);
        self
    }

    /// Make `add_member` fail with a 403 for the given group.
    pub fn failing_add_on(mut self, group_id: u64) -> Self {
        self.state.get_mut().fail_on_add = Some(group_id);
        self
    }

    /// Every call made so far, in order.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.state.lock().await.calls.clone()
    }

    /// Only the calls that changed remote state.
    pub async fn mutations(&self) -> Vec<MockCall> {
        self.calls()
            .await
            .into_iter()
            .filter(MockCall::is_mutation)
            .collect()
    }

    /// Forget recorded calls, keeping remote state.
    pub async fn clear_calls(&self) {
        self.state.lock().await.calls.clear();
    }

    /// Current members of a group.
    pub async fn members_of(&self, group_id: u64) -> Vec<Member> {
        self.state
            .lock()
            .await
            .members
            .get(&group_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Current access level of a username in a group.
    pub async fn level_of(&self, group_id: u64, username: &str) -> Option<AccessLevel> {
        self.members_of(group_id)
            .await
            .into_iter()
            .find(|m| m.username == username)
            .map(|m| m.access_level)
    }
}

fn not_found(what: String) -> Error {
    Error::Api {
        status: 404,
        body: format!("404 {what} Not Found"),
    }
}

#[async_trait]
impl MembershipService for MockMembershipService {
    async fn list_groups(&self) -> Result<Vec<Group>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::ListGroups);
        Ok(state.groups.clone())
    }

    async fn list_members(&self, group_id: u64) -> Result<Vec<Member>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::ListMembers { group_id });
        state
            .members
            .get(&group_id)
            .cloned()
            .ok_or_else(|| not_found(format!("Group {group_id}")))
    }

    async fn update_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::UpdateMember {
            group_id,
            user_id,
            level,
        });
        let member = state
            .members
            .get_mut(&group_id)
            .and_then(|members| members.iter_mut().find(|m| m.id == user_id))
            .ok_or_else(|| not_found(format!("Member {user_id}")))?;
        member.access_level = level;
        Ok(())
    }

    /// Matches like GitLab search: case-insensitive substring.
    async fn find_users(&self, username: &str) -> Result<Vec<User>> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::FindUsers {
            username: username.to_string(),
        });
        let needle = username.to_lowercase();
        Ok(state
            .users
            .iter()
            .filter(|u| u.username.to_lowercase().contains(&needle))
            .cloned()
            .collect())
    }

    async fn add_member(&self, group_id: u64, user_id: u64, level: AccessLevel) -> Result<()> {
        let mut state = self.state.lock().await;
        state.calls.push(MockCall::AddMember {
            group_id,
            user_id,
            level,
        });
        if state.fail_on_add == Some(group_id) {
            return Err(Error::Api {
                status: 403,
                body: "403 Forbidden".to_string(),
            });
        }
        let user = state
            .users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| not_found(format!("User {user_id}")))?;
        let members = state
            .members
            .get_mut(&group_id)
            .ok_or_else(|| not_found(format!("Group {group_id}")))?;
        if members.iter().any(|m| m.id == user_id) {
            return Err(Error::Api {
                status: 409,
                body: "Member already exists".to_string(),
            });
        }
        members.push(Member::new(user.id, user.username, level));
        Ok(())
    }
}
