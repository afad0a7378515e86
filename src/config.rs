use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MonitorConfig {
    #[serde(default = "default_target")]
    pub target: String,
    /// Seconds between two probes.
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
    #[serde(default = "default_log_file")]
    pub log_file: PathBuf,
    #[serde(default)]
    pub probe: ProbeMethod,
}

fn default_target() -> String { "1.1.1.1".into() }
fn default_check_interval() -> u64 { 10 }
fn default_log_file() -> PathBuf { PathBuf::from("ict.log") }

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            target: default_target(),
            check_interval: default_check_interval(),
            log_file: default_log_file(),
            probe: ProbeMethod::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum ProbeMethod {
    /// Runs an external echo utility; `{target}` in `args` is substituted.
    Command {
        #[serde(default = "default_program")]
        program: String,
        #[serde(default = "default_args")]
        args: Vec<String>,
        #[serde(default = "default_timeout")]
        timeout_ms: u64,
    },
    Icmp {
        #[serde(default = "default_timeout")]
        timeout_ms: u64,
    },
}

impl Default for ProbeMethod {
    fn default() -> Self {
        ProbeMethod::Command {
            program: default_program(),
            args: default_args(),
            timeout_ms: default_timeout(),
        }
    }
}

impl ProbeMethod {
    pub fn timeout_ms(&self) -> u64 {
        match self {
            ProbeMethod::Command { timeout_ms, .. } | ProbeMethod::Icmp { timeout_ms } => {
                *timeout_ms
            }
        }
    }
}

pub fn default_program() -> String { "ping".into() }
pub fn default_timeout() -> u64 { 3500 }

#[cfg(windows)]
pub fn default_args() -> Vec<String> {
    vec!["-n".into(), "1".into(), "{target}".into()]
}

#[cfg(not(windows))]
pub fn default_args() -> Vec<String> {
    vec!["-c".into(), "1".into(), "{target}".into()]
}

impl MonitorConfig {
    /// Reads the config file at `path`, falling back to defaults when it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        } else {
            info!("{} not found, using defaults", path.display());
            MonitorConfig::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.target.trim().is_empty() {
            bail!("target must not be empty");
        }
        if self.check_interval == 0 {
            bail!("check_interval must be at least one second");
        }
        if self.probe.timeout_ms() == 0 {
            bail!("probe timeout_ms must be greater than zero");
        }
        if self.log_file.as_os_str().is_empty() {
            bail!("log_file must not be empty");
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.check_interval)
    }

    /// Probe timeout, capped so a probe never outlives one tick.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe.timeout_ms()).min(self.interval())
    }
}
