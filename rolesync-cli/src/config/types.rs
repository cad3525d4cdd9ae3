use rolesync_core::{DesiredMembership, GitLabSection};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files.
///
/// Every field is optional so that layers can be merged.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolesyncConfig {
    /// GitLab connection
    #[serde(default)]
    pub gitlab: GitLabSection,

    /// Desired role for each username
    #[serde(default)]
    pub members: DesiredMembership,
}
