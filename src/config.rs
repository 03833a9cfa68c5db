//! Client tuning loaded from an optional TOML file

use crate::error::{Error, Result};
use crate::protocol::{timeouts, UNIT_SIZE};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub first_wait_secs: u64,
    pub next_wait_secs: u64,
    pub unit_size: usize,
    pub connect_timeout_secs: Option<u64>,
    /// Local address for the data port; defaults to the control connection's local IP.
    pub data_bind_ip: Option<IpAddr>,
    /// Directory that receives downloaded files.
    pub download_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            first_wait_secs: timeouts::FIRST_WAIT_SECS,
            next_wait_secs: timeouts::NEXT_WAIT_SECS,
            unit_size: UNIT_SIZE,
            connect_timeout_secs: None,
            data_bind_ip: None,
            download_dir: PathBuf::from("."),
        }
    }
}

impl ClientConfig {
    /// Read a config file. `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let data = std::fs::read_to_string(path).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        let cfg: ClientConfig = toml::from_str(&data).map_err(|e| Error::Config {
            path: path.to_path_buf(),
            msg: e.to_string(),
        })?;
        cfg.validate(path)?;
        Ok(cfg)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.unit_size < 2 {
            return Err(Error::Config {
                path: path.to_path_buf(),
                msg: format!("unit_size must be at least 2, got {}", self.unit_size),
            });
        }
        if self.first_wait_secs == 0 || self.next_wait_secs == 0 {
            return Err(Error::Config {
                path: path.to_path_buf(),
                msg: "wait timeouts must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn first_wait(&self) -> Duration {
        Duration::from_secs(self.first_wait_secs)
    }

    pub fn next_wait(&self) -> Duration {
        Duration::from_secs(self.next_wait_secs)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_path_gives_defaults() {
        let cfg = ClientConfig::load(None).unwrap();
        assert_eq!(cfg.first_wait(), Duration::from_secs(60));
        assert_eq!(cfg.next_wait(), Duration::from_secs(10));
        assert_eq!(cfg.unit_size, 4096);
        assert_eq!(cfg.download_dir, PathBuf::from("."));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "next_wait_secs = 2\ndata_bind_ip = \"127.0.0.1\"").unwrap();
        let cfg = ClientConfig::load(Some(f.path())).unwrap();
        assert_eq!(cfg.next_wait_secs, 2);
        assert_eq!(cfg.first_wait_secs, 60);
        assert_eq!(cfg.data_bind_ip, Some("127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn rejects_bad_values() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "unit_size = 1").unwrap();
        assert!(matches!(
            ClientConfig::load(Some(f.path())),
            Err(Error::Config { .. })
        ));

        let mut g = tempfile::NamedTempFile::new().unwrap();
        writeln!(g, "first_wait_secs = \"soon\"").unwrap();
        assert!(matches!(
            ClientConfig::load(Some(g.path())),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
