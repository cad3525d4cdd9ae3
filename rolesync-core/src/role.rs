//! Membership roles and GitLab access levels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A membership role, ordered by privilege.
///
/// # Examples
///
/// ```
/// use rolesync_core::{AccessLevel, Role};
///
/// assert!(Role::Guest < Role::Owner);
/// assert_eq!(Role::Developer.access_level(), AccessLevel(30));
/// assert_eq!("Maintainer".parse::<Role>().unwrap(), Role::Maintainer);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Role {
    Guest,
    Reporter,
    Developer,
    Maintainer,
    Owner,
}

impl Role {
    /// All roles from least to most privileged.
    pub const ALL: [Role; 5] = [
        Role::Guest,
        Role::Reporter,
        Role::Developer,
        Role::Maintainer,
        Role::Owner,
    ];

    /// The GitLab access level code for this role.
    pub fn access_level(self) -> AccessLevel {
        match self {
            Role::Guest => AccessLevel(10),
            Role::Reporter => AccessLevel(20),
            Role::Developer => AccessLevel(30),
            Role::Maintainer => AccessLevel(40),
            Role::Owner => AccessLevel(50),
        }
    }

    /// The role for a GitLab access level code, if it is one of the five roles.
    pub fn from_access_level(level: AccessLevel) -> Option<Role> {
        Self::ALL.into_iter().find(|role| role.access_level() == level)
    }

    /// Canonical role name.
    pub fn name(self) -> &'static str {
        match self {
            Role::Guest => "Guest",
            Role::Reporter => "Reporter",
            Role::Developer => "Developer",
            Role::Maintainer => "Maintainer",
            Role::Owner => "Owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = Error;

    /// Accepts the canonical name (`Owner`) or its lowercase form (`owner`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.name() == s || role.name().to_lowercase() == s)
            .ok_or_else(|| Error::UnknownRole(s.to_string()))
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Raw access level code as reported by GitLab.
///
/// GitLab defines codes beyond the five roles (no access, minimal access,
/// planner), so this is kept as an open newtype rather than an enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessLevel(pub u16);

impl AccessLevel {
    /// The role this level corresponds to, if any.
    pub fn role(self) -> Option<Role> {
        Role::from_access_level(self)
    }
}

impl From<Role> for AccessLevel {
    fn from(role: Role) -> Self {
        role.access_level()
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.role() {
            Some(role) => write!(f, "{role}"),
            None => write!(f, "access level {}", self.0),
        }
    }
}
