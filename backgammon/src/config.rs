use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{ClassMap, Template};

/// Everything needed to turn detections into a board reading.
///
/// Passed explicitly to every call, so several boards (or templates) can be
/// read side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub template: Template,
    pub classes: ClassMap,
    /// Detections below this confidence are ignored.
    pub min_confidence: f32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            template: Template::standard(),
            classes: ClassMap::default(),
            min_confidence: 0.3,
        }
    }
}

impl VisionConfig {
    /// Loads a config from a JSON file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read vision config '{}'", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid vision config '{}'", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_takes_defaults() {
        let config: VisionConfig =
            serde_json::from_str(r#"{"min_confidence": 0.5, "classes": {"white_disk": 11}}"#).unwrap();
        assert_eq!(config.min_confidence, 0.5);
        assert_eq!(config.classes.white_disk, 11);
        assert_eq!(config.classes.black_disk, 9);
        assert_eq!(config.template, Template::standard());
    }
}
