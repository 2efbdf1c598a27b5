use modelgraph_document::LoadOptions;
use serde::{Deserialize, Serialize};

/// What a command does when the element it addresses is no longer in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingTargetPolicy {
    /// Log a warning, count it, and do nothing.
    #[default]
    Ignore,
    /// Fail the command with `CommandError::MissingTarget`.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_undo_depth: usize,
    pub missing_target: MissingTargetPolicy,
    pub strict_load: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_undo_depth: 100,
            missing_target: MissingTargetPolicy::Ignore,
            strict_load: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict_load,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.max_undo_depth, 100);
        assert_eq!(config.missing_target, MissingTargetPolicy::Ignore);
        assert!(!config.load_options().strict);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "missing_target": "fail" }"#).unwrap();
        assert_eq!(config.missing_target, MissingTargetPolicy::Fail);
        assert_eq!(config.max_undo_depth, 100);
        assert!(EngineConfig::from_json(r#"{ "missing_target": "explode" }"#).is_err());
    }
}
