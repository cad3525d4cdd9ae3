//! The desired membership table.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::Role;

/// Immutable mapping from username to the role it must hold in every
/// top-level group.
///
/// Usernames are matched case-sensitively against GitLab. Iteration is
/// ordered by username.
///
/// # Examples
///
/// ```
/// use rolesync_core::{DesiredMembership, Role};
///
/// let desired: DesiredMembership = [("alice.doe", Role::Owner), ("bob.doe", Role::Guest)]
///     .into_iter()
///     .collect();
///
/// assert_eq!(desired.role_for("alice.doe"), Some(Role::Owner));
/// assert_eq!(desired.role_for("Alice.Doe"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DesiredMembership(BTreeMap<String, Role>);

impl DesiredMembership {
    /// Create a table from an existing map.
    pub fn new(entries: BTreeMap<String, Role>) -> Self {
        Self(entries)
    }

    /// The desired role for a username, if it is in the table.
    pub fn role_for(&self, username: &str) -> Option<Role> {
        self.0.get(username).copied()
    }

    /// Whether the username is in the table.
    pub fn contains(&self, username: &str) -> bool {
        self.0.contains_key(username)
    }

    /// Usernames in the table, in sorted order.
    pub fn usernames(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(username, role)` pairs in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Role)> {
        self.0.iter().map(|(name, role)| (name.as_str(), *role))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Combine two tables; entries in `overlay` replace those in `self`.
    pub fn merged_with(mut self, overlay: DesiredMembership) -> Self {
        self.0.extend(overlay.0);
        self
    }
}

impl<S: Into<String>> FromIterator<(S, Role)> for DesiredMembership {
    fn from_iter<I: IntoIterator<Item = (S, Role)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(name, role)| (name.into(), role)).collect())
    }
}
