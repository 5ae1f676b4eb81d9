//! Configuration file for the `pegasus-cluster` tool.
//!
//! The file describes where the Pegasus admin tools live and, per cluster,
//! the meta servers and the deployment backend commands:
//!
//! ```yaml
//! shell_dir: /opt/pegasus/tools
//! command_timeout_secs: 60
//! clusters:
//!   onebox:
//!     meta_servers: ["10.0.0.1:34601", "10.0.0.2:34601"]
//!     deployment:
//!       kind: script
//!       list: ./deploy.sh list {cluster}
//!       start: ./deploy.sh start {cluster} {role} {name}
//!       stop: ./deploy.sh stop {cluster} {role} {name}
//!       rolling_update: ./deploy.sh rolling_update {cluster} {role} {name}
//! timing:
//!   rebalance_warmup_secs: 60
//! ```
//!
//! The config path resolution chain (highest priority first):
//! 1. Explicit `--config` flag
//! 2. `PEGASUS_CLUSTER_CONFIG` environment variable (read by clap into `--config`)
//! 3. `~/.pegasus-cluster/config.yaml`

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use pegasus_cluster_lifecycle::{DeploymentConfig, LifecycleSettings};

use crate::{Error, Result};

const CONFIG_DIR_NAME: &str = ".pegasus-cluster";
const CONFIG_FILE_NAME: &str = "config.yaml";

/// Whole configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct PegasusConfig {
    /// Directory containing the Pegasus `run.sh`
    pub shell_dir: PathBuf,
    /// Per-command timeout for admin commands
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
    /// Known clusters by name
    #[serde(default)]
    pub clusters: BTreeMap<String, ClusterConfig>,
    /// Timing overrides applied on top of the built-in defaults
    #[serde(default)]
    pub timing: TimingConfig,
}

/// One cluster's entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterConfig {
    /// Meta server addresses
    #[serde(default)]
    pub meta_servers: Vec<String>,
    /// Process management backend
    pub deployment: DeploymentConfig,
}

/// Optional overrides for every poll cadence and sleep.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimingConfig {
    pub poll_interval_secs: Option<u64>,
    pub bounded_attempts: Option<u32>,
    pub resend_every: Option<u32>,
    pub settle_secs: Option<u64>,
    pub stabilization_secs: Option<u64>,
    pub rebalance_warmup_secs: Option<u64>,
    pub rebalance_debounce_secs: Option<u64>,
    pub rebalance_debounce_rounds: Option<u32>,
    pub rebalance_busy_interval_secs: Option<u64>,
    pub abort_on_close_timeout: Option<bool>,
}

impl TimingConfig {
    /// Defaults with every configured override applied
    pub fn settings(&self) -> LifecycleSettings {
        let mut s = LifecycleSettings::default();
        let secs = Duration::from_secs;
        if let Some(v) = self.poll_interval_secs {
            s.poll_interval = secs(v);
        }
        if let Some(v) = self.bounded_attempts {
            s.bounded_attempts = v;
        }
        if let Some(v) = self.resend_every {
            s.resend_every = v;
        }
        if let Some(v) = self.settle_secs {
            s.settle = secs(v);
        }
        if let Some(v) = self.stabilization_secs {
            s.stabilization = secs(v);
        }
        if let Some(v) = self.rebalance_warmup_secs {
            s.rebalance_warmup = secs(v);
        }
        if let Some(v) = self.rebalance_debounce_secs {
            s.rebalance_debounce = secs(v);
        }
        if let Some(v) = self.rebalance_debounce_rounds {
            s.rebalance_debounce_rounds = v;
        }
        if let Some(v) = self.rebalance_busy_interval_secs {
            s.rebalance_busy_interval = secs(v);
        }
        if let Some(v) = self.abort_on_close_timeout {
            s.abort_on_close_timeout = v;
        }
        s
    }
}

impl PegasusConfig {
    /// Entry for `name`
    pub fn cluster(&self, name: &str) -> Result<&ClusterConfig> {
        self.clusters.get(name).ok_or_else(|| {
            Error::config(format!(
                "cluster '{}' is not configured (known: {})",
                name,
                self.clusters.keys().cloned().collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Path to `~/.pegasus-cluster/config.yaml`.
pub fn default_config_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| Error::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Resolve the config file path: the flag (or its env var) if set, else home.
pub fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit.filter(|path| !path.as_os_str().is_empty()) {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path(),
    }
}

/// Read and parse the config file at `path`.
pub fn load_config(path: &Path) -> Result<PegasusConfig> {
    let data = std::fs::read_to_string(path).map_err(|e| {
        Error::config(format!("failed to read {}: {}", path.display(), e))
    })?;
    serde_yaml::from_str(&data).map_err(|source| Error::ConfigParse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
shell_dir: /opt/pegasus/tools
command_timeout_secs: 30
clusters:
  onebox:
    meta_servers: ["10.0.0.1:34601", "10.0.0.2:34601"]
    deployment:
      kind: script
      list: ./deploy.sh list {cluster}
      start: ./deploy.sh start {cluster} {role} {name}
      stop: ./deploy.sh stop {cluster} {role} {name}
      rolling_update: ./deploy.sh rolling_update {cluster} {role} {name}
timing:
  rebalance_warmup_secs: 60
  abort_on_close_timeout: false
"#;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_cluster_entries() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.shell_dir, PathBuf::from("/opt/pegasus/tools"));
        assert_eq!(config.command_timeout_secs, Some(30));
        let onebox = config.cluster("onebox").unwrap();
        assert_eq!(onebox.meta_servers.len(), 2);
        assert!(matches!(onebox.deployment, DeploymentConfig::Script(_)));
    }

    #[test]
    fn timing_overrides_only_touch_named_fields() {
        let file = write_config(SAMPLE);
        let settings = load_config(file.path()).unwrap().timing.settings();

        assert_eq!(settings.rebalance_warmup, Duration::from_secs(60));
        assert!(!settings.abort_on_close_timeout);
        assert_eq!(settings.bounded_attempts, 28);
        assert_eq!(settings.rebalance_debounce, Duration::from_secs(30));
    }

    #[test]
    fn unknown_cluster_lists_known_ones() {
        let file = write_config(SAMPLE);
        let config = load_config(file.path()).unwrap();
        let err = config.cluster("production").unwrap_err();
        assert!(err.to_string().contains("onebox"));
    }

    #[test]
    fn unknown_timing_key_is_rejected() {
        let file = write_config("shell_dir: /opt/pegasus\ntiming:\n  warmup: 3\n");
        assert!(matches!(
            load_config(file.path()),
            Err(Error::ConfigParse { .. })
        ));
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn explicit_path_is_used_as_is() {
        let explicit = PathBuf::from("/etc/pegasus/cluster.yaml");
        assert_eq!(resolve_config_path(Some(&explicit)).unwrap(), explicit);
    }

    #[test]
    fn empty_or_absent_path_falls_back_to_home() {
        let path = resolve_config_path(Some(Path::new(""))).unwrap();
        assert!(path.ends_with(".pegasus-cluster/config.yaml"));
        assert_eq!(resolve_config_path(None).unwrap(), path);
    }
}
