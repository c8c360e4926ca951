use std::path::Path;

use relink_store::{ApiConfig, PutOptions};
use serde::{Deserialize, Serialize};

use crate::error::{RepairError, RepairResult};

/// Options for a repair run.
///
/// ```toml
/// encrypt = false
/// pin = true
///
/// [api]
/// host = "127.0.0.1"
/// port = 1633
/// ssl = false
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairConfig {
    /// Node API the repaired manifest is written to.
    pub api: ApiConfig,
    /// Upload new manifest nodes encrypted.
    pub encrypt: bool,
    /// Pin new manifest nodes on the node.
    pub pin: bool,
}

impl RepairConfig {
    pub fn from_toml_str(s: &str) -> RepairResult<Self> {
        toml::from_str(s).map_err(|e| RepairError::Config(e.to_string()))
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> RepairResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| RepairError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> RepairResult<()> {
        if self.api.host.trim().is_empty() {
            return Err(RepairError::Config("api host is empty".into()));
        }
        if self.api.port == 0 {
            return Err(RepairError::Config("api port must be non-zero".into()));
        }
        Ok(())
    }

    /// Write options applied to every chunk the repair stores.
    pub fn put_options(&self) -> PutOptions {
        PutOptions {
            pin: self.pin,
            encrypt: self.encrypt,
        }
    }
}
