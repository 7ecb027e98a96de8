//! Configuration for the command kit
//!
//! Settings can be built in code or loaded from a TOML file. Relative
//! directory paths in a loaded file are resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{CommandKitError, Result};

/// Resolve a path relative to a base directory
fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

fn default_extensions() -> Vec<String> {
    vec!["toml".to_string(), "json".to_string()]
}

/// Top-level configuration for a [`CommandKit`](crate::CommandKit)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandKitConfig {
    /// Directory holding command definition files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands_path: Option<PathBuf>,

    /// Directory holding validation definition files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validations_path: Option<PathBuf>,

    /// File extensions (without the dot) treated as definition files
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Disable the built-in dev-only and permission validations
    #[serde(default)]
    pub skip_built_in_validations: bool,

    /// Users allowed to run dev-only commands
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dev_user_ids: Vec<String>,

    /// Guilds where dev-only commands may be used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dev_guild_ids: Vec<String>,

    /// Roles allowed to run dev-only commands
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dev_role_ids: Vec<String>,
}

impl Default for CommandKitConfig {
    fn default() -> Self {
        Self {
            commands_path: None,
            validations_path: None,
            extensions: default_extensions(),
            skip_built_in_validations: false,
            dev_user_ids: Vec::new(),
            dev_guild_ids: Vec::new(),
            dev_role_ids: Vec::new(),
        }
    }
}

impl CommandKitConfig {
    /// Load configuration from a TOML file
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CommandKitError::io(path, e))?;

        let mut config: Self = toml::from_str(&content).map_err(|e| {
            CommandKitError::configuration(format!("{} is not valid: {}", path.display(), e))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.commands_path = config
            .commands_path
            .map(|p| resolve_path(base_dir, &p));
        config.validations_path = config
            .validations_path
            .map(|p| resolve_path(base_dir, &p));

        Ok(config)
    }

    /// Load configuration from a file if it exists, otherwise use defaults
    pub async fn load_or_default(path: &Path) -> Result<Self> {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            Self::load(path).await
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Whether a file extension is in the configured allow-list
    pub fn accepts_extension(&self, path: &Path) -> bool {
        accepts_extension(&self.extensions, path)
    }
}

pub(crate) fn accepts_extension(extensions: &[String], path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy())
        .is_some_and(|ext| {
            extensions
                .iter()
                .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(&ext))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_extension_filter_is_case_insensitive() {
        let config = CommandKitConfig::default();
        assert!(config.accepts_extension(Path::new("a/ping.toml")));
        assert!(config.accepts_extension(Path::new("a/ping.JSON")));
        assert!(!config.accepts_extension(Path::new("a/ping.rs")));
        assert!(!config.accepts_extension(Path::new("a/README")));
    }

    #[test]
    fn test_extension_filter_tolerates_leading_dot() {
        let extensions = vec![".yaml".to_string()];
        assert!(accepts_extension(&extensions, Path::new("ping.yaml")));
    }

    #[tokio::test]
    async fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdkit.toml");
        std::fs::write(
            &path,
            r#"
commands_path = "commands"
validations_path = "/abs/validations"
dev_user_ids = ["42"]
"#,
        )
        .unwrap();

        let config = CommandKitConfig::load(&path).await.unwrap();
        assert_eq!(config.commands_path, Some(dir.path().join("commands")));
        assert_eq!(
            config.validations_path,
            Some(PathBuf::from("/abs/validations"))
        );
        assert_eq!(config.extensions, default_extensions());
        assert_eq!(config.dev_user_ids, vec!["42".to_string()]);
        assert!(!config.skip_built_in_validations);
    }

    #[tokio::test]
    async fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CommandKitConfig::load_or_default(&dir.path().join("nope.toml"))
            .await
            .unwrap();
        assert!(config.commands_path.is_none());
    }

    #[tokio::test]
    async fn test_invalid_file_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cmdkit.toml");
        std::fs::write(&path, "extensions = 5").unwrap();

        let err = CommandKitConfig::load(&path).await.unwrap_err();
        assert!(matches!(err, CommandKitError::Configuration { .. }));
    }
}
