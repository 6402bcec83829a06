//! Configuration for the engines.
//!
//! Configuration is plain TOML; every field has a default, so an empty
//! file (or no file at all) yields [`Config::default`].
//!
//! ```toml
//! [rga]
//! out_of_order = "buffer"   # or "append"
//!
//! [server]
//! history_limit = 1024      # omit for unbounded history
//! ```

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings for replicated sequences.
    pub rga: RgaConfig,
    /// Settings for the OT sequencing server.
    pub server: ServerConfig,
}

/// What an RGA replica does with an insert whose anchor it has not seen
/// yet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutOfOrderPolicy {
    /// Hold the operation until its dependency arrives.
    #[default]
    Buffer,
    /// Place an orphaned insert at the end of the array. Placement can
    /// differ from what causally ordered delivery would have produced.
    /// Deletes of unseen characters are still held until the insert
    /// arrives.
    Append,
}

/// RGA settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RgaConfig {
    pub out_of_order: OutOfOrderPolicy,
}

/// OT server settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Number of committed operations kept for rebasing stale client
    /// operations. `None` keeps everything.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_limit: Option<usize>,
}

impl Config {
    /// Parse configuration from a TOML string.
    pub fn from_toml_str(source: &str) -> Result<Config> {
        let config = toml::from_str(source)?;
        return Ok(config);
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config> {
        let source = std::fs::read_to_string(path.as_ref())?;
        log::debug!("loaded config from {}", path.as_ref().display());
        return Config::from_toml_str(&source);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_source_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.rga.out_of_order, OutOfOrderPolicy::Buffer);
        assert_eq!(config.server.history_limit, None);
    }

    #[test]
    fn parses_every_field() {
        let config = Config::from_toml_str(
            r#"
            [rga]
            out_of_order = "append"

            [server]
            history_limit = 16
            "#,
        )
        .unwrap();
        assert_eq!(config.rga.out_of_order, OutOfOrderPolicy::Append);
        assert_eq!(config.server.history_limit, Some(16));
    }

    #[test]
    fn rejects_unknown_policy() {
        let result = Config::from_toml_str("[rga]\nout_of_order = \"sometimes\"\n");
        assert!(matches!(result, Err(crate::Error::ConfigParse(_))));
    }

    #[test]
    fn load_reports_missing_file() {
        let result = Config::load("/definitely/not/here/converge.toml");
        assert!(matches!(result, Err(crate::Error::Io(_))));
    }
}
