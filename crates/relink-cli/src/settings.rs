use std::path::Path;

use anyhow::Context;
use relink_export::ExportConfig;
use relink_repair::RepairConfig;
use serde::{Deserialize, Serialize};

/// Contents of the `--config` file.
///
/// ```toml
/// [repair]
/// pin = true
///
/// [repair.api]
/// host = "127.0.0.1"
/// port = 1633
///
/// [export]
/// destination = "swarm-exportdb.tar"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub repair: RepairConfig,
    pub export: ExportConfig,
}

impl Settings {
    /// Load settings from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing settings in {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn no_file_means_defaults() {
        assert_eq!(Settings::load(None).unwrap(), Settings::default());
    }

    #[test]
    fn load_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relink.toml");
        std::fs::write(
            &path,
            "[repair]\npin = true\n[repair.api]\nhost = \"10.0.0.2\"\n[export]\ndestination = \"x.tar\"\n",
        )
        .unwrap();
        let s = Settings::load(Some(&path)).unwrap();
        assert!(s.repair.pin);
        assert_eq!(s.repair.api.host, "10.0.0.2");
        assert_eq!(s.repair.api.port, 1633);
        assert_eq!(s.export.destination, PathBuf::from("x.tar"));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
