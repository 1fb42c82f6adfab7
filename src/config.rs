//! Startup configuration for a conversation session.
//!
//! Loaded once (from a JSON file or built in code) and shared read-only for
//! the lifetime of the process. The path rule specs are parsed into a
//! [`PathPolicy`](crate::policy::PathPolicy) at startup so malformed rules
//! fail before any conversation begins.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AccordError, AccordResult};
use crate::policy::PathPolicy;

fn default_path_rules() -> Vec<String> {
    vec!["~:r".to_string()]
}

fn default_command_timeout() -> u64 {
    10
}

fn default_url() -> String {
    "http://localhost:5001/v1/chat/completions".to_string()
}

fn default_model() -> String {
    "local".to_string()
}

fn default_temperature() -> f32 {
    0.5
}

fn default_max_output_chars() -> usize {
    4096
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccordConfig {
    /// Ordered `path:mode-letter` rule specs (`m`/`r`/`w`/`n`).
    #[serde(default = "default_path_rules")]
    pub path_rules: Vec<String>,
    /// Whether command requirements are honored at all.
    #[serde(default)]
    pub allow_commands: bool,
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
    /// OpenAI-compatible chat completions endpoint.
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Truncation limit for content echoed to the user.
    #[serde(default = "default_max_output_chars")]
    pub max_output_chars: usize,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for AccordConfig {
    fn default() -> Self {
        Self {
            path_rules: default_path_rules(),
            allow_commands: false,
            command_timeout_secs: default_command_timeout(),
            url: default_url(),
            model: default_model(),
            api_key: None,
            temperature: default_temperature(),
            max_output_chars: default_max_output_chars(),
            verbose: false,
        }
    }
}

impl AccordConfig {
    /// Load from a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> AccordResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            AccordError::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            AccordError::Config(format!("Invalid config file {}: {e}", path.display()))
        })?;
        // Surface malformed rule specs at load time, not mid-conversation.
        config.policy()?;
        Ok(config)
    }

    /// Parse the configured rule specs into a policy.
    pub fn policy(&self) -> AccordResult<PathPolicy> {
        PathPolicy::from_specs(&self.path_rules)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AccessLevel;

    #[test]
    fn defaults_are_conservative() {
        let config = AccordConfig::default();
        assert!(!config.allow_commands);
        assert_eq!(config.command_timeout_secs, 10);
        assert_eq!(config.path_rules, vec!["~:r"]);
    }

    #[test]
    fn policy_is_built_from_rule_specs() {
        let config = AccordConfig {
            path_rules: vec!["/srv/data:r".into(), "/srv/data/secret:n".into()],
            ..Default::default()
        };
        let policy = config.policy().unwrap();
        assert!(policy.is_allowed("/srv/data/a.txt", AccessLevel::Read));
        assert!(!policy.is_allowed("/srv/data/secret/a.txt", AccessLevel::Metadata));
    }

    #[test]
    fn bad_rule_spec_is_a_config_error() {
        let config = AccordConfig {
            path_rules: vec!["/srv/data:q".into()],
            ..Default::default()
        };
        assert!(matches!(config.policy(), Err(AccordError::Config(_))));
    }

    #[test]
    fn json_round_trip() {
        let config = AccordConfig {
            allow_commands: true,
            model: "qwen".into(),
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        let back: AccordConfig = serde_json::from_str(&json).unwrap();
        assert!(back.allow_commands);
        assert_eq!(back.model, "qwen");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let back: AccordConfig = serde_json::from_str(r#"{"allow_commands": true}"#).unwrap();
        assert!(back.allow_commands);
        assert_eq!(back.url, default_url());
        assert_eq!(back.path_rules, vec!["~:r"]);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accord.json");
        std::fs::write(&path, r#"{"path_rules": ["/tmp:w"], "allow_commands": true}"#).unwrap();

        let config = AccordConfig::load(&path).unwrap();
        assert!(config.allow_commands);
        assert_eq!(config.path_rules, vec!["/tmp:w"]);

        assert!(AccordConfig::load(dir.path().join("missing.json")).is_err());
    }

    #[test]
    fn load_rejects_bad_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accord.json");
        std::fs::write(&path, r#"{"path_rules": ["nonsense"]}"#).unwrap();
        assert!(matches!(
            AccordConfig::load(&path),
            Err(AccordError::Config(_))
        ));
    }
}
