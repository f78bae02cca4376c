//! Layered configuration loading.
//!
//! The priority chain (later overrides earlier):
//! 1. Built-in defaults ([`HarnessConfig::default()`])
//! 2. User-level: `~/.termprobe/config.toml`
//! 3. Workspace-level: `./.termprobe/config.toml`
//! 4. `TERMPROBE_*` environment variables
//!
//! Each field in the final [`EffectiveConfig`] is annotated with the
//! [`ConfigSource`] that determined its value.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::{HarnessConfig, ShellProfile, CONFIG_FILENAME};
use crate::ProbeError;

/// Config files larger than this are rejected.
const MAX_CONFIG_FILE_SIZE: u64 = 256 * 1024;

/// Where a configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    BuiltinDefault,
    UserFile(PathBuf),
    WorkspaceFile(PathBuf),
    EnvVar(String),
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::BuiltinDefault => write!(f, "built-in default"),
            ConfigSource::UserFile(p) => write!(f, "user file: {}", p.display()),
            ConfigSource::WorkspaceFile(p) => write!(f, "workspace file: {}", p.display()),
            ConfigSource::EnvVar(name) => write!(f, "env var: {name}"),
        }
    }
}

/// The merged config plus provenance for each field.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    pub config: HarnessConfig,
    /// Dot-separated field path -> the source that determined its value.
    pub sources: HashMap<String, ConfigSource>,
    /// Config files that were found and loaded, in priority order.
    pub source_files: Vec<PathBuf>,
}

/// Hierarchical configuration loader.
pub struct ConfigLoader {
    user_config_path: Option<PathBuf>,
    workspace_config_path: Option<PathBuf>,
    read_env: bool,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a loader with default paths and environment overrides enabled.
    pub fn new() -> Self {
        Self {
            user_config_path: None,
            workspace_config_path: None,
            read_env: true,
        }
    }

    /// Override the user config file path.
    #[must_use]
    pub fn with_user_path(mut self, path: PathBuf) -> Self {
        self.user_config_path = Some(path);
        self
    }

    /// Override the workspace config file path.
    #[must_use]
    pub fn with_workspace_path(mut self, path: PathBuf) -> Self {
        self.workspace_config_path = Some(path);
        self
    }

    /// Ignore `TERMPROBE_*` environment variables.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    /// Load and merge configuration from all sources.
    pub fn load(&self) -> Result<EffectiveConfig, ProbeError> {
        let mut sources = HashMap::new();
        let mut source_files = Vec::new();

        let mut merged = toml::Value::try_from(HarnessConfig::default())
            .map_err(|e| ProbeError::ConfigError(format!("failed to serialize defaults: {e}")))?;
        if let toml::Value::Table(ref table) = merged {
            for key in table.keys() {
                sources.insert(key.clone(), ConfigSource::BuiltinDefault);
            }
        }

        let user_path = self.user_config_path.clone().unwrap_or_else(|| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
            PathBuf::from(home).join(".termprobe").join(CONFIG_FILENAME)
        });
        if user_path.exists() {
            let layer = read_layer(&user_path)?;
            deep_merge(&mut merged, &layer);
            record_sources(&layer, &mut sources, &ConfigSource::UserFile(user_path.clone()), "");
            source_files.push(user_path);
        }

        let workspace_path = self
            .workspace_config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(".termprobe").join(CONFIG_FILENAME));
        if workspace_path.exists() {
            let layer = read_layer(&workspace_path)?;
            deep_merge(&mut merged, &layer);
            record_sources(
                &layer,
                &mut sources,
                &ConfigSource::WorkspaceFile(workspace_path.clone()),
                "",
            );
            source_files.push(workspace_path);
        }

        if self.read_env {
            apply_env_overrides(&mut merged, &mut sources)?;
        }

        let config: HarnessConfig = merged
            .try_into()
            .map_err(|e| ProbeError::ConfigError(format!("failed to parse merged config: {e}")))?;
        validate_config(&config)?;

        Ok(EffectiveConfig {
            config,
            sources,
            source_files,
        })
    }
}

fn read_layer(path: &Path) -> Result<toml::Value, ProbeError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        ProbeError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;
    if metadata.len() > MAX_CONFIG_FILE_SIZE {
        return Err(ProbeError::ConfigError(format!(
            "config file {} exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path).map_err(|e| {
        ProbeError::ConfigError(format!("cannot read config file {}: {e}", path.display()))
    })?;
    toml::from_str(&content)
        .map_err(|e| ProbeError::ConfigError(format!("invalid config {}: {e}", path.display())))
}

/// Deep-merge `overlay` into `base`. Tables merge field-by-field; anything
/// else is replaced.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                if let Some(base_val) = base_table.get_mut(key) {
                    deep_merge(base_val, overlay_val);
                } else {
                    base_table.insert(key.clone(), overlay_val.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

fn record_sources(
    layer: &toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
    source: &ConfigSource,
    prefix: &str,
) {
    if let toml::Value::Table(table) = layer {
        for (key, value) in table {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{prefix}.{key}")
            };
            sources.insert(path.clone(), source.clone());
            record_sources(value, sources, source, &path);
        }
    }
}

/// Known environment variable mappings.
pub struct EnvMapping {
    pub env_var: &'static str,
    /// Dot-separated TOML path segments.
    pub toml_path: &'static [&'static str],
}

/// All supported `TERMPROBE_*` environment variables. A double underscore
/// marks nesting.
pub const ENV_MAPPINGS: &[EnvMapping] = &[
    EnvMapping {
        env_var: "TERMPROBE_TMUX",
        toml_path: &["tmux_binary"],
    },
    EnvMapping {
        env_var: "TERMPROBE_TMUX_SESSION",
        toml_path: &["tmux_session"],
    },
    EnvMapping {
        env_var: "TERMPROBE_SHELL",
        toml_path: &["shell"],
    },
    EnvMapping {
        env_var: "TERMPROBE_KEY_DELAY_MS",
        toml_path: &["key_delay_ms"],
    },
    EnvMapping {
        env_var: "TERMPROBE_POLL__INTERVAL_MS",
        toml_path: &["poll", "interval_ms"],
    },
    EnvMapping {
        env_var: "TERMPROBE_POLL__TIMEOUT_MS",
        toml_path: &["poll", "timeout_ms"],
    },
    EnvMapping {
        env_var: "TERMPROBE_CAPTURE__RETRY_TIMEOUT_MS",
        toml_path: &["capture", "retry_timeout_ms"],
    },
    EnvMapping {
        env_var: "TERMPROBE_ARTIFACT__BASE_PATH",
        toml_path: &["artifact", "base_path"],
    },
    EnvMapping {
        env_var: "TERMPROBE_ARTIFACT__TIMEOUT_MS",
        toml_path: &["artifact", "timeout_ms"],
    },
];

fn apply_env_overrides(
    merged: &mut toml::Value,
    sources: &mut HashMap<String, ConfigSource>,
) -> Result<(), ProbeError> {
    for mapping in ENV_MAPPINGS {
        if let Ok(raw) = std::env::var(mapping.env_var) {
            if raw.chars().any(|c| c.is_control()) {
                return Err(ProbeError::ConfigError(format!(
                    "environment variable {} contains control characters",
                    mapping.env_var
                )));
            }
            let value = env_value_to_toml(mapping, &raw)?;
            set_nested_value(merged, mapping.toml_path, value);
            sources.insert(
                mapping.toml_path.join("."),
                ConfigSource::EnvVar(mapping.env_var.to_string()),
            );
        }
    }
    Ok(())
}

fn env_value_to_toml(mapping: &EnvMapping, raw: &str) -> Result<toml::Value, ProbeError> {
    let last = mapping.toml_path.last().copied().unwrap_or_default();

    if last == "shell" {
        let profile = ShellProfile::parse(raw)?;
        let value = toml::Value::try_from(profile)
            .map_err(|e| ProbeError::ConfigError(format!("{}: {e}", mapping.env_var)))?;
        return Ok(value);
    }

    if last.ends_with("_ms") {
        let n: i64 = raw.trim().parse().map_err(|_| {
            ProbeError::ConfigError(format!(
                "{} must be a non-negative integer, got {raw:?}",
                mapping.env_var
            ))
        })?;
        if n < 0 {
            return Err(ProbeError::ConfigError(format!(
                "{} must be a non-negative integer, got {raw:?}",
                mapping.env_var
            )));
        }
        return Ok(toml::Value::Integer(n));
    }

    Ok(toml::Value::String(raw.to_string()))
}

fn set_nested_value(root: &mut toml::Value, path: &[&str], value: toml::Value) {
    let Some((last, parents)) = path.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        let toml::Value::Table(table) = current else {
            return;
        };
        current = table
            .entry(segment.to_string())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }
    if let toml::Value::Table(table) = current {
        table.insert(last.to_string(), value);
    }
}

fn validate_config(config: &HarnessConfig) -> Result<(), ProbeError> {
    if config.tmux_binary.trim().is_empty() {
        return Err(ProbeError::ConfigError("tmux_binary cannot be empty".into()));
    }
    if config.poll.interval_ms == 0 {
        return Err(ProbeError::ConfigError("poll.interval_ms must be positive".into()));
    }
    if config.poll.interval_ms > config.poll.timeout_ms {
        return Err(ProbeError::ConfigError(format!(
            "poll.interval_ms ({}) exceeds poll.timeout_ms ({})",
            config.poll.interval_ms, config.poll.timeout_ms
        )));
    }
    if config.capture.retry_interval_ms == 0 {
        return Err(ProbeError::ConfigError(
            "capture.retry_interval_ms must be positive".into(),
        ));
    }
    if config.artifact.base_path.as_os_str().is_empty() {
        return Err(ProbeError::ConfigError("artifact.base_path cannot be empty".into()));
    }
    if config.prepare_sentinel.is_empty() {
        return Err(ProbeError::ConfigError("prepare_sentinel cannot be empty".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    fn clear_env_vars() {
        for mapping in ENV_MAPPINGS {
            std::env::remove_var(mapping.env_var);
        }
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join(CONFIG_FILENAME);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn loader_in(tmp: &TempDir) -> ConfigLoader {
        ConfigLoader::new()
            .with_user_path(tmp.path().join("missing-user.toml"))
            .with_workspace_path(tmp.path().join("missing-workspace.toml"))
    }

    #[test]
    fn defaults_when_no_files_exist() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");

        let effective = loader_in(&tmp).load().unwrap();
        assert_eq!(effective.config, HarnessConfig::default());
        assert!(effective.source_files.is_empty());
        assert_eq!(
            effective.sources.get("tmux_binary"),
            Some(&ConfigSource::BuiltinDefault)
        );
    }

    #[test]
    fn workspace_overrides_user() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");
        let user_dir = tmp.path().join("user");
        let workspace_dir = tmp.path().join("workspace");
        std::fs::create_dir_all(&user_dir).unwrap();
        std::fs::create_dir_all(&workspace_dir).unwrap();

        let user = write_config(
            &user_dir,
            r#"
            tmux_binary = "/opt/tmux"
            [poll]
            interval_ms = 50
            timeout_ms = 3000
            "#,
        );
        let workspace = write_config(
            &workspace_dir,
            r#"
            [poll]
            timeout_ms = 7000
            "#,
        );

        let effective = ConfigLoader::new()
            .with_user_path(user.clone())
            .with_workspace_path(workspace.clone())
            .load()
            .unwrap();

        assert_eq!(effective.config.tmux_binary, "/opt/tmux");
        assert_eq!(effective.config.poll.interval_ms, 50);
        assert_eq!(effective.config.poll.timeout_ms, 7000);
        assert_eq!(effective.source_files, vec![user.clone(), workspace.clone()]);
        assert_eq!(
            effective.sources.get("poll.timeout_ms"),
            Some(&ConfigSource::WorkspaceFile(workspace))
        );
        assert_eq!(
            effective.sources.get("poll.interval_ms"),
            Some(&ConfigSource::UserFile(user))
        );
    }

    #[test]
    fn env_var_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");
        let user = write_config(tmp.path(), "shell = \"bash\"\n");

        std::env::set_var("TERMPROBE_SHELL", "zsh");
        std::env::set_var("TERMPROBE_POLL__TIMEOUT_MS", "1234");
        std::env::set_var("TERMPROBE_ARTIFACT__BASE_PATH", "/var/tmp/out");
        let result = ConfigLoader::new()
            .with_user_path(user)
            .with_workspace_path(tmp.path().join("none.toml"))
            .load();
        clear_env_vars();

        let effective = result.unwrap();
        assert_eq!(effective.config.shell, ShellProfile::Zsh);
        assert_eq!(effective.config.poll.timeout_ms, 1234);
        assert_eq!(
            effective.config.artifact.base_path,
            PathBuf::from("/var/tmp/out")
        );
        assert_eq!(
            effective.sources.get("shell"),
            Some(&ConfigSource::EnvVar("TERMPROBE_SHELL".into()))
        );
    }

    #[test]
    fn env_var_ignored_when_disabled() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");

        std::env::set_var("TERMPROBE_TMUX", "/nowhere/tmux");
        let result = loader_in(&tmp).without_env().load();
        clear_env_vars();

        assert_eq!(result.unwrap().config.tmux_binary, "tmux");
    }

    #[test]
    fn bad_numeric_env_var_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");

        std::env::set_var("TERMPROBE_KEY_DELAY_MS", "soon");
        let result = loader_in(&tmp).load();
        clear_env_vars();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("TERMPROBE_KEY_DELAY_MS"), "{err}");
    }

    #[test]
    fn interval_longer_than_timeout_is_rejected() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");
        let user = write_config(
            tmp.path(),
            r#"
            [poll]
            interval_ms = 500
            timeout_ms = 100
            "#,
        );

        let err = ConfigLoader::new()
            .with_user_path(user)
            .with_workspace_path(tmp.path().join("none.toml"))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("exceeds"));
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env_vars();
        let tmp = TempDir::new().expect("should create temp dir");
        let user = write_config(tmp.path(), "poll = [not toml");

        let err = ConfigLoader::new()
            .with_user_path(user.clone())
            .with_workspace_path(tmp.path().join("none.toml"))
            .load()
            .unwrap_err();
        assert!(err.to_string().contains(&user.display().to_string()));
    }
}
