//! Engine and session configuration.
//!
//! Every field has a default matching the module's firmware behaviour, so an
//! empty YAML document is a valid configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vr3_protocol::{RecordId, MAX_FRAME_SIZE, RECORD_NONE};

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Engine
// ============================================================================

/// Timeouts and limits for the command engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name used to tag log lines.
    pub name: String,
    /// How long to wait for the answer to a request.
    pub response_timeout_ms: u64,
    /// How long a single recognition poll waits.
    pub recognize_timeout_ms: u64,
    /// Idle window while training; reset by every prompt frame.
    pub train_idle_timeout_ms: u64,
    /// Frames after which a query-all training check is complete.
    pub query_all_frames: usize,
    /// Idle window ending a query-all training check.
    pub query_all_idle_ms: u64,
    /// Largest frame accepted from the module.
    pub max_frame_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            name: "vr3".to_string(),
            response_timeout_ms: 1000,
            recognize_timeout_ms: 50,
            train_idle_timeout_ms: 8000,
            query_all_frames: 51,
            query_all_idle_ms: 500,
            max_frame_len: MAX_FRAME_SIZE,
        }
    }
}

impl EngineConfig {
    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn recognize_timeout(&self) -> Duration {
        Duration::from_millis(self.recognize_timeout_ms)
    }

    pub fn train_idle_timeout(&self) -> Duration {
        Duration::from_millis(self.train_idle_timeout_ms)
    }

    pub fn query_all_idle(&self) -> Duration {
        Duration::from_millis(self.query_all_idle_ms)
    }

    /// Check limits that would make the engine unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.query_all_frames == 0 {
            return Err(ConfigError::Invalid("query_all_frames must be at least 1".into()));
        }
        if !(4..=MAX_FRAME_SIZE).contains(&self.max_frame_len) {
            return Err(ConfigError::Invalid(format!(
                "max_frame_len must be between 4 and {}, got {}",
                MAX_FRAME_SIZE, self.max_frame_len
            )));
        }
        if self.response_timeout_ms == 0 {
            return Err(ConfigError::Invalid("response_timeout_ms must be nonzero".into()));
        }
        Ok(())
    }
}

// ============================================================================
// Session
// ============================================================================

/// A record to load at startup and the name it is reported under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLabel {
    pub record: RecordId,
    pub label: String,
}

/// Startup behaviour of a [`RecognitionSession`](crate::RecognitionSession).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Clear attempts before the session gives up on the module.
    pub clear_attempts: u32,
    /// Records loaded one at a time after the recognizer is cleared.
    pub records: Vec<RecordLabel>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            clear_attempts: 3,
            records: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Label configured for a record.
    pub fn label_for(&self, record: RecordId) -> Option<&str> {
        self.records
            .iter()
            .find(|r| r.record == record)
            .map(|r| r.label.as_str())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.clear_attempts == 0 {
            return Err(ConfigError::Invalid("clear_attempts must be at least 1".into()));
        }
        if let Some(r) = self.records.iter().find(|r| r.record == RECORD_NONE) {
            return Err(ConfigError::Invalid(format!(
                "record 0x{:02X} ({}) is reserved",
                r.record, r.label
            )));
        }
        Ok(())
    }
}

// ============================================================================
// File
// ============================================================================

/// Top-level configuration file.
///
/// ```yaml
/// engine:
///   response_timeout_ms: 1000
/// session:
///   records:
///     - { record: 0, label: "on" }
///     - { record: 1, label: "off" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vr3Config {
    pub engine: EngineConfig,
    pub session: SessionConfig,
}

impl Vr3Config {
    /// Load and validate a YAML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Vr3Config = if text.trim().is_empty() {
            Vr3Config::default()
        } else {
            serde_yaml::from_str(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        self.session.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.response_timeout(), Duration::from_millis(1000));
        assert_eq!(config.query_all_frames, 51);
        assert_eq!(config.query_all_idle(), Duration::from_millis(500));
        assert_eq!(config.max_frame_len, 257);
        assert_eq!(SessionConfig::default().clear_attempts, 3);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Vr3Config::from_yaml_str("").unwrap(), Vr3Config::default());
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
engine:
  response_timeout_ms: 250
  query_all_frames: 10
session:
  records:
    - { record: 0, label: "on" }
    - { record: 1, label: "off" }
"#;
        let config = Vr3Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.engine.response_timeout_ms, 250);
        assert_eq!(config.engine.query_all_idle_ms, 500);
        assert_eq!(config.session.label_for(1), Some("off"));
        assert_eq!(config.session.label_for(2), None);
        assert_eq!(config.session.clear_attempts, 3);
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            Vr3Config::from_yaml_str("engine:\n  query_all_frames: 0\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Vr3Config::from_yaml_str("engine:\n  max_frame_len: 400\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Vr3Config::from_yaml_str("session:\n  records:\n    - { record: 255, label: x }\n"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Vr3Config::from_yaml_str("engine: [1, 2"),
            Err(ConfigError::Yaml(_))
        ));
    }
}
