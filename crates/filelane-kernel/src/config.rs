//! Manager configuration.
//!
//! Loaded from RON. Every field has a default, so a partial document (or an
//! empty `()`) is valid:
//!
//! ```ron
//! (
//!     case_folding: Some(preserve),
//!     slow_op_warn_ms: 250,
//! )
//! ```
//!
//! Leave `case_folding` unset to follow the store's own case handling.

use std::path::Path;
use std::time::Duration;

use filelane_types::CaseFolding;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_QUEUE_DEPTH_WARN, DEFAULT_SLOW_OP_THRESHOLD};

/// Error type for config loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Configuration for a [`FilesManager`](crate::FilesManager).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// How paths fold into file keys. `None` uses
    /// [`RemoteStore::case_folding`](crate::RemoteStore::case_folding).
    pub case_folding: Option<CaseFolding>,
    /// Remote calls taking at least this many milliseconds are logged.
    pub slow_op_warn_ms: u64,
    /// Lane queue depth at which submissions are logged.
    pub queue_depth_warn: usize,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            case_folding: None,
            slow_op_warn_ms: DEFAULT_SLOW_OP_THRESHOLD.as_millis() as u64,
            queue_depth_warn: DEFAULT_QUEUE_DEPTH_WARN,
        }
    }
}

impl FilesConfig {
    /// Parse a RON document.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Read and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Force a case folding policy instead of asking the store.
    pub fn with_case_folding(mut self, folding: CaseFolding) -> Self {
        self.case_folding = Some(folding);
        self
    }

    /// Set the slow remote call threshold.
    pub fn with_slow_op_threshold(mut self, threshold: Duration) -> Self {
        self.slow_op_warn_ms = threshold.as_millis() as u64;
        self
    }

    /// Set the queue depth warning level.
    pub fn with_queue_depth_warn(mut self, depth: usize) -> Self {
        self.queue_depth_warn = depth;
        self
    }

    pub fn slow_op_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_op_warn_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = FilesConfig::default();
        assert_eq!(config.case_folding, None);
        assert_eq!(config.slow_op_threshold(), DEFAULT_SLOW_OP_THRESHOLD);
        assert_eq!(config.queue_depth_warn, DEFAULT_QUEUE_DEPTH_WARN);
    }

    #[test]
    fn test_partial_ron() {
        let config = FilesConfig::from_ron("(case_folding: Some(preserve), slow_op_warn_ms: 250)").unwrap();
        assert_eq!(config.case_folding, Some(CaseFolding::Preserve));
        assert_eq!(config.slow_op_threshold(), Duration::from_millis(250));
        assert_eq!(config.queue_depth_warn, DEFAULT_QUEUE_DEPTH_WARN);

        assert_eq!(FilesConfig::from_ron("()").unwrap(), FilesConfig::default());
    }

    #[test]
    fn test_bad_ron() {
        let err = FilesConfig::from_ron("(case_folding: Some(sideways))").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "(queue_depth_warn: 8)").unwrap();
        let config = FilesConfig::load(file.path()).unwrap();
        assert_eq!(config.queue_depth_warn, 8);

        let err = FilesConfig::load("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_builders() {
        let config = FilesConfig::default()
            .with_case_folding(CaseFolding::Preserve)
            .with_slow_op_threshold(Duration::from_millis(10))
            .with_queue_depth_warn(2);
        assert_eq!(config.case_folding, Some(CaseFolding::Preserve));
        assert_eq!(config.slow_op_warn_ms, 10);
        assert_eq!(config.queue_depth_warn, 2);
    }
}
