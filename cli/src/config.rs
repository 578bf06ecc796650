use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use healthlog_core::appwrite::AppwriteConfig;
use healthlog_core::auth::AuthConfig;

const ENV_ENDPOINT: &str = "HEALTHLOG_ENDPOINT";
const ENV_PROJECT_ID: &str = "HEALTHLOG_PROJECT_ID";
const ENV_DATABASE_ID: &str = "HEALTHLOG_DATABASE_ID";

/// Shape of `config.toml`. Every section and key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    backend: AppwriteConfig,
    auth: AuthConfig,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    project_id: String,
    secret: String,
}

pub struct Config {
    pub data_dir: PathBuf,
    pub backend: AppwriteConfig,
    pub auth: AuthConfig,
}

impl Config {
    pub fn load() -> Result<Self> {
        let proj_dirs =
            ProjectDirs::from("", "", "healthlog").context("Could not determine home directory")?;

        let data_dir = proj_dirs.data_dir().to_path_buf();
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;

        let config_path = proj_dirs.config_dir().join("config.toml");
        Self::from_paths(data_dir, &config_path, |key| std::env::var(key).ok())
    }

    fn from_paths(
        data_dir: PathBuf,
        config_path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let file = read_file_config(config_path)?;
        let mut backend = file.backend;
        apply_env_overrides(&mut backend, env);
        tracing::debug!(
            endpoint = %backend.endpoint,
            project = %backend.project_id,
            database = %backend.database_id,
            "configuration loaded"
        );
        Ok(Config {
            data_dir,
            backend,
            auth: file.auth,
        })
    }

    fn session_path(&self) -> PathBuf {
        self.data_dir.join("session.json")
    }

    /// The saved session secret for the configured project, if any.
    pub fn load_session(&self) -> Result<Option<String>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let stored: StoredSession = match serde_json::from_str(&text) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable session file");
                return Ok(None);
            }
        };
        if stored.project_id != self.backend.project_id {
            tracing::warn!(
                saved = %stored.project_id,
                configured = %self.backend.project_id,
                "saved session belongs to another project"
            );
            return Ok(None);
        }
        Ok(Some(stored.secret))
    }

    pub fn save_session(&self, secret: &str) -> Result<()> {
        let path = self.session_path();
        let stored = StoredSession {
            project_id: self.backend.project_id.clone(),
            secret: secret.to_string(),
        };
        write_private(&path, &serde_json::to_string(&stored)?)
            .context("Failed to write session file")
    }

    pub fn clear_session(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(&path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    /// Load the API key from disk, or generate a new one.
    ///
    /// Returns `(key, newly_created)` where `newly_created` is true when a
    /// fresh key was just generated (first run).
    pub fn load_or_create_api_key(&self) -> Result<(String, bool)> {
        use rand::Rng;
        use std::fmt::Write;

        let path = self.data_dir.join("api_key");

        if path.exists() {
            let key = std::fs::read_to_string(&path).context("Failed to read API key file")?;
            let key = key.trim().to_string();
            if !key.is_empty() {
                return Ok((key, false));
            }
        }

        let bytes: [u8; 32] = rand::rng().random();
        let key = bytes
            .iter()
            .fold(String::with_capacity(64), |mut acc: String, b| {
                let _ = write!(acc, "{b:02x}");
                acc
            });
        write_private(&path, &key).context("Failed to write API key file")?;
        eprintln!("Generated new API key: {key}");
        eprintln!("Include in requests: Authorization: Bearer {key}");
        Ok((key, true))
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Invalid config file {}", path.display()))
}

fn apply_env_overrides(backend: &mut AppwriteConfig, env: impl Fn(&str) -> Option<String>) {
    let non_empty = |key: &str| env(key).filter(|v: &String| !v.trim().is_empty());
    if let Some(endpoint) = non_empty(ENV_ENDPOINT) {
        backend.endpoint = endpoint;
    }
    if let Some(project) = non_empty(ENV_PROJECT_ID) {
        backend.project_id = project;
    }
    if let Some(database) = non_empty(ENV_DATABASE_ID) {
        backend.database_id = database;
    }
}

/// Write `contents` to a file only the owner can read. New files are created
/// with mode 0600; an existing file is narrowed to 0600 as well.
fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    use std::io::Write;

    let mut options = std::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    restrict_permissions(path)?;
    file.write_all(contents.as_bytes())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
