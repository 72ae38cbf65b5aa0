//! Engine configuration

use crate::error::{EngineError, EngineResult};
use assess_state::{LinkConfidence, Relevance, UserId};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Session engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Autosave behavior
    pub autosave: AutosaveConfig,
    /// Evidence linking defaults
    pub evidence: EvidenceConfig,
    /// User recorded on links and change-log entries
    pub user: UserId,
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With autosave quiet period
    #[inline]
    #[must_use]
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.autosave.quiet_period_ms = u64::try_from(quiet_period.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With success notifications for autosaves
    #[inline]
    #[must_use]
    pub fn with_success_notifications(mut self, enabled: bool) -> Self {
        self.autosave.notify_on_success = enabled;
        self
    }

    /// With acting user
    #[inline]
    #[must_use]
    pub fn with_user(mut self, user: impl Into<UserId>) -> Self {
        self.user = user.into();
        self
    }

    /// With evidence defaults
    #[inline]
    #[must_use]
    pub fn with_evidence_defaults(mut self, relevance: Relevance, confidence: LinkConfidence) -> Self {
        self.evidence = EvidenceConfig {
            default_relevance: relevance,
            default_confidence: confidence,
        };
        self
    }

    /// Autosave quiet period
    #[inline]
    #[must_use]
    pub fn quiet_period(&self) -> Duration {
        Duration::from_millis(self.autosave.quiet_period_ms)
    }

    /// Parse from TOML text
    ///
    /// # Errors
    /// `Config` on malformed TOML
    pub fn from_toml_str(text: &str) -> EngineResult<Self> {
        toml::from_str(text).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `Config` if the file cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            autosave: AutosaveConfig::default(),
            evidence: EvidenceConfig::default(),
            user: UserId::new("local"),
        }
    }
}

/// Autosave configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Quiet period before a debounced save, in milliseconds
    pub quiet_period_ms: u64,
    /// Emit a success notification after each autosave
    pub notify_on_success: bool,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            quiet_period_ms: 5_000,
            notify_on_success: false,
        }
    }
}

/// Evidence linking defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceConfig {
    /// Relevance for uploads linked to the active question
    pub default_relevance: Relevance,
    /// Confidence for uploads linked to the active question
    pub default_confidence: LinkConfidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::new();
        assert_eq!(config.quiet_period(), Duration::from_secs(5));
        assert!(!config.autosave.notify_on_success);
        assert_eq!(config.evidence.default_relevance, Relevance::Primary);
        assert_eq!(config.evidence.default_confidence, LinkConfidence::Medium);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            user = "auditor-7"

            [autosave]
            quiet_period_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(config.user, UserId::new("auditor-7"));
        assert_eq!(config.quiet_period(), Duration::from_millis(1500));
        assert!(!config.autosave.notify_on_success);
        assert_eq!(config.evidence, EvidenceConfig::default());
    }

    #[test]
    fn malformed_toml_is_config_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("autosave = 3"),
            Err(EngineError::Config(_))
        ));
    }

    #[test]
    fn builders() {
        let config = EngineConfig::new()
            .with_quiet_period(Duration::from_millis(250))
            .with_user("bob")
            .with_success_notifications(true)
            .with_evidence_defaults(Relevance::Supporting, LinkConfidence::High);
        assert_eq!(config.autosave.quiet_period_ms, 250);
        assert!(config.autosave.notify_on_success);
        assert_eq!(config.evidence.default_relevance, Relevance::Supporting);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("assess.toml");
        std::fs::write(&path, "[evidence]\ndefault_confidence = \"high\"\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.evidence.default_confidence, LinkConfidence::High);
        assert!(EngineConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
