use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// How to run the analysis engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// A short name for logs and transcripts.
    pub nick: String,
    pub cmd: String,
    pub args: Vec<String>,
    /// How long one hint request may take before the engine is killed.
    pub timeout_ms: u64,
    /// How many engine processes may run at the same time.
    pub max_concurrent: usize,
    /// Record every engine exchange as a JSON file into this directory.
    pub record_transcripts_to: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            nick: String::from("gnubg"),
            cmd: String::from("gnubg"),
            args: vec![String::from("--tty")],
            timeout_ms: 10_000,
            max_concurrent: 4,
            record_transcripts_to: None,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read engine config '{}'", path.display()))?;
        let config: EngineConfig = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid engine config '{}'", path.display()))?;
        if config.max_concurrent == 0 {
            anyhow::bail!("max_concurrent must be at least 1");
        }
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_partial_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"cmd": "/usr/local/bin/gnubg", "timeout_ms": 2500}"#).unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.cmd, "/usr/local/bin/gnubg");
        assert_eq!(config.args, ["--tty"]);
        assert_eq!(config.timeout(), Duration::from_millis(2500));
        assert_eq!(config.max_concurrent, 4);
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"max_concurrent": 0}"#).unwrap();
        assert!(EngineConfig::load(&path).is_err());
    }
}
