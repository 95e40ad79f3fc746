//! Configuration for hybrid object dispatch.

use serde::{Deserialize, Serialize};

/// Dispatch settings shared by every member of a hybrid object.
///
/// Can be embedded in a host application's settings file; missing fields
/// fall back to the defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Reject calls that pass more arguments than the declared arity.
    /// Calls with too few arguments are always rejected.
    /// Default: false
    pub strict_arity: bool,

    /// Convert panics inside native methods into runtime errors instead of
    /// unwinding through the engine.
    /// Default: true
    pub catch_panics: bool,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            strict_arity: false,
            catch_panics: true,
        }
    }
}

impl HybridConfig {
    /// Create a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable strict arity checking.
    pub fn strict_arity(mut self, enabled: bool) -> Self {
        self.strict_arity = enabled;
        self
    }

    /// Enable or disable panic capture.
    pub fn catch_panics(mut self, enabled: bool) -> Self {
        self.catch_panics = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HybridConfig::default();
        assert!(!config.strict_arity);
        assert!(config.catch_panics);
    }

    #[test]
    fn test_builder() {
        let config = HybridConfig::new().strict_arity(true).catch_panics(false);
        assert!(config.strict_arity);
        assert!(!config.catch_panics);
    }

    #[test]
    fn test_partial_json() {
        let config: HybridConfig = serde_json::from_str(r#"{ "strict_arity": true }"#).unwrap();
        assert!(config.strict_arity);
        assert!(config.catch_panics);
    }
}
