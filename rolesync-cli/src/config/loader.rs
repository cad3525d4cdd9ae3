use super::types::RolesyncConfig;
use anyhow::{Context, Result};
use rolesync_core::GitLabSection;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<RolesyncConfig> {
        let mut config = RolesyncConfig::default();

        // Layer 1: User config
        let user_path = Self::user_config_path();
        if user_path.exists() {
            config = Self::merge(config, Self::load_from_path(&user_path)?);
        }

        // Layer 2: Project config
        let project_path = Self::project_config_path();
        if project_path.exists() {
            config = Self::merge(config, Self::load_from_path(&project_path)?);
        }

        Ok(config)
    }

    /// Load a single config file.
    ///
    /// Relative `token_file` and `ca_bundle` paths are resolved against the
    /// directory holding the file.
    pub fn load_from_path(path: &Path) -> Result<RolesyncConfig> {
        debug!(path = %path.display(), "loading config");
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: RolesyncConfig = toml::from_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;

        if let Some(dir) = path.parent() {
            config.gitlab = Self::anchor_paths(config.gitlab, dir);
        }

        Ok(config)
    }

    /// Get user config path (`$XDG_CONFIG_HOME/rolesync/config.toml`)
    pub fn user_config_path() -> PathBuf {
        rolesync_paths::user_config_file()
    }

    /// Get project config path
    /// Can be overridden with ROLESYNC_PROJECT_CONFIG_DIR env var (useful for isolated e2e tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("ROLESYNC_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join(rolesync_paths::CONFIG_FILE_NAME)
        } else {
            PathBuf::from(".rolesync").join(rolesync_paths::CONFIG_FILE_NAME)
        }
    }

    /// Merge two configs (overlay values override base only if explicitly set)
    fn merge(base: RolesyncConfig, overlay: RolesyncConfig) -> RolesyncConfig {
        RolesyncConfig {
            gitlab: base.gitlab.merged_with(overlay.gitlab),
            members: base.members.merged_with(overlay.members),
        }
    }

    fn anchor_paths(section: GitLabSection, dir: &Path) -> GitLabSection {
        let anchor = |path: PathBuf| {
            if path.is_relative() {
                dir.join(path)
            } else {
                path
            }
        };
        GitLabSection {
            token_file: section.token_file.map(anchor),
            ca_bundle: section.ca_bundle.map(anchor),
            ..section
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rolesync_core::{DesiredMembership, Role};
    use serial_test::serial;
    use std::io::Write;
    use tempfile::TempDir;

    fn members(entries: &[(&str, Role)]) -> DesiredMembership {
        entries.iter().map(|(name, role)| (*name, *role)).collect()
    }

    // ==================== Load Tests ====================

    #[test]
    fn test_load_from_valid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[gitlab]
url = "https://gitlab.example.com"
token_file = "/etc/rolesync/token.txt"

[members]
"alice.doe" = "Owner"
"#
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(
            config.gitlab.url.as_deref(),
            Some("https://gitlab.example.com")
        );
        assert_eq!(
            config.gitlab.token_file,
            Some(PathBuf::from("/etc/rolesync/token.txt"))
        );
        assert_eq!(config.members.role_for("alice.doe"), Some(Role::Owner));
    }

    #[test]
    fn test_load_anchors_relative_paths() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[gitlab]\ntoken_file = \"token.txt\"\nca_bundle = \"certs/ca.pem\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_path(&path).unwrap();

        assert_eq!(
            config.gitlab.token_file,
            Some(temp_dir.path().join("token.txt"))
        );
        assert_eq!(
            config.gitlab.ca_bundle,
            Some(temp_dir.path().join("certs/ca.pem"))
        );
    }

    #[test]
    fn test_load_nonexistent_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nonexistent.toml");

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_invalid_toml_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("invalid.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "this is not valid toml {{{{").unwrap();

        let result = ConfigLoader::load_from_path(&path);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_unknown_role_returns_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[members]\n\"alice.doe\" = \"Admin\"\n").unwrap();

        let err = ConfigLoader::load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Admin"));
    }

    // ==================== Merge Tests ====================

    #[test]
    fn test_merge_overlay_overrides_base() {
        let base = RolesyncConfig {
            gitlab: GitLabSection {
                url: Some("https://base.example.com".to_string()),
                token_file: Some(PathBuf::from("/base/token.txt")),
                ..Default::default()
            },
            members: members(&[("alice.doe", Role::Guest), ("bob.doe", Role::Reporter)]),
        };

        let overlay = RolesyncConfig {
            gitlab: GitLabSection {
                url: Some("https://project.example.com".to_string()),
                ca_bundle: Some(PathBuf::from("/project/ca.pem")),
                ..Default::default()
            },
            members: members(&[("alice.doe", Role::Owner), ("carol.doe", Role::Developer)]),
        };

        let merged = ConfigLoader::merge(base, overlay);

        assert_eq!(
            merged.gitlab.url.as_deref(),
            Some("https://project.example.com")
        );
        // overlay's None falls through to base value via .or()
        assert_eq!(
            merged.gitlab.token_file,
            Some(PathBuf::from("/base/token.txt"))
        );
        assert_eq!(merged.gitlab.ca_bundle, Some(PathBuf::from("/project/ca.pem")));

        assert_eq!(merged.members.len(), 3);
        assert_eq!(merged.members.role_for("alice.doe"), Some(Role::Owner));
        assert_eq!(merged.members.role_for("bob.doe"), Some(Role::Reporter));
    }

    #[test]
    fn test_merge_empty_overlay_preserves_base() {
        let base = RolesyncConfig {
            gitlab: GitLabSection {
                url: Some("https://base.example.com".to_string()),
                ..Default::default()
            },
            members: members(&[("alice.doe", Role::Owner)]),
        };

        let merged = ConfigLoader::merge(base, RolesyncConfig::default());

        assert_eq!(merged.gitlab.url.as_deref(), Some("https://base.example.com"));
        assert_eq!(merged.members.role_for("alice.doe"), Some(Role::Owner));
    }

    // ==================== Path Tests ====================

    #[test]
    fn test_user_config_path() {
        let path = ConfigLoader::user_config_path();
        assert!(path.to_string_lossy().contains("rolesync"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path() {
        let path = ConfigLoader::project_config_path();
        assert_eq!(path, PathBuf::from(".rolesync/config.toml"));
    }

    #[test]
    #[serial]
    fn test_project_config_path_respects_env() {
        unsafe {
            std::env::set_var("ROLESYNC_PROJECT_CONFIG_DIR", "/tmp/rolesync-project");
        }
        let path = ConfigLoader::project_config_path();
        unsafe {
            std::env::remove_var("ROLESYNC_PROJECT_CONFIG_DIR");
        }
        assert_eq!(path, PathBuf::from("/tmp/rolesync-project/config.toml"));
    }

    #[test]
    #[serial]
    fn test_load_reads_project_layer() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("config.toml"),
            "[members]\n\"dave.doe\" = \"Reporter\"\n",
        )
        .unwrap();

        unsafe {
            std::env::set_var("ROLESYNC_PROJECT_CONFIG_DIR", temp_dir.path());
        }
        let config = ConfigLoader::load();
        unsafe {
            std::env::remove_var("ROLESYNC_PROJECT_CONFIG_DIR");
        }

        let config = config.unwrap();
        assert_eq!(config.members.role_for("dave.doe"), Some(Role::Reporter));
    }
}
