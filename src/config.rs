//! Configuration: which device to talk to and how to scroll.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [link]
//! kind = "tcp"
//! address = "192.168.1.50:2208"
//!
//! [scroll]
//! speed = 7
//! ```

use crate::error::{Error, Result};
use crate::link::{LinkTimeouts, Protocol};
use crate::scroll::ScrollSpeed;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Where frames go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Arduino on a USB serial port.
    #[default]
    Serial,
    /// Spark Core (or the emulator) over TCP.
    Tcp,
    /// No device: draw in the terminal.
    Preview,
}

impl LinkKind {
    /// Wire protocol for this kind, if it has one.
    pub const fn protocol(self) -> Option<Protocol> {
        match self {
            Self::Serial => Some(Protocol::Serial),
            Self::Tcp => Some(Protocol::Socket),
            Self::Preview => None,
        }
    }
}

/// `[link]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinkConfig {
    /// Device kind.
    pub kind: LinkKind,
    /// Serial port path.
    pub port: String,
    /// Serial baud rate.
    pub baud: u32,
    /// TCP `host:port`.
    pub address: String,
    /// TCP connect timeout.
    pub connect_timeout_ms: u64,
    /// Deadline for `S` and `A` bytes. Defaults to 1 s on serial, 5 s on TCP.
    pub ack_timeout_ms: Option<u64>,
    /// Deadline for the `D` after an effect.
    pub effect_timeout_ms: u64,
    /// Longest single blocking read.
    pub poll_interval_ms: u64,
    /// Pause after opening the serial port (the Arduino resets on open).
    pub startup_delay_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            kind: LinkKind::default(),
            port: "/dev/tty.usbmodem411".to_string(),
            baud: 400_000,
            address: "127.0.0.1:2208".to_string(),
            connect_timeout_ms: 10_000,
            ack_timeout_ms: None,
            effect_timeout_ms: 30_000,
            poll_interval_ms: 100,
            startup_delay_ms: 2_000,
        }
    }
}

impl LinkConfig {
    /// Effective ack deadline for the configured kind.
    pub fn ack_timeout(&self) -> Duration {
        let default = match self.kind {
            LinkKind::Serial => 1_000,
            LinkKind::Tcp | LinkKind::Preview => 5_000,
        };
        Duration::from_millis(self.ack_timeout_ms.unwrap_or(default))
    }

    /// Read deadlines for a [`Link`](crate::link::Link).
    pub fn timeouts(&self) -> LinkTimeouts {
        LinkTimeouts {
            ack: self.ack_timeout(),
            effect: Duration::from_millis(self.effect_timeout_ms),
            poll: self.poll_interval(),
        }
    }

    /// Longest single blocking read.
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// TCP connect timeout.
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Pause after opening the serial port.
    pub const fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}

/// `[scroll]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScrollConfig {
    /// 1 (slowest) to 10 (fastest).
    pub speed: u8,
    /// Sub-pixel smoothing.
    pub antialias: bool,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            speed: ScrollSpeed::default().get(),
            antialias: true,
        }
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Device link.
    pub link: LinkConfig,
    /// Text scrolling.
    pub scroll: ScrollConfig,
}

impl Config {
    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that cannot work, before touching the device.
    pub fn validate(&self) -> Result<()> {
        let link = &self.link;
        match link.kind {
            LinkKind::Serial => {
                if link.port.trim().is_empty() {
                    return Err(Error::Config("serial port must not be empty".into()));
                }
                if link.baud == 0 {
                    return Err(Error::Config("baud rate must be positive".into()));
                }
            }
            LinkKind::Tcp => {
                if link.address.trim().is_empty() {
                    return Err(Error::Config("address must not be empty".into()));
                }
                if link.connect_timeout_ms == 0 {
                    return Err(Error::Config("connect_timeout_ms must be positive".into()));
                }
            }
            LinkKind::Preview => {}
        }

        for (name, value) in [
            ("ack_timeout_ms", link.ack_timeout_ms.unwrap_or(1)),
            ("effect_timeout_ms", link.effect_timeout_ms),
            ("poll_interval_ms", link.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(Error::Config(format!("{name} must be positive")));
            }
        }

        self.scroll_speed().map(drop)
    }

    /// The configured scroll speed.
    pub const fn scroll_speed(&self) -> Result<ScrollSpeed> {
        ScrollSpeed::new(self.scroll.speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.link.baud, 400_000);
        assert_eq!(config.link.ack_timeout(), Duration::from_secs(1));
        assert!(config.scroll.antialias);
    }

    #[test]
    fn test_tcp_section() {
        let config = Config::from_toml(
            r#"
            [link]
            kind = "tcp"
            address = "10.0.0.7:2208"
            poll_interval_ms = 50

            [scroll]
            speed = 9
            antialias = false
            "#,
        )
        .unwrap();

        assert_eq!(config.link.kind, LinkKind::Tcp);
        assert_eq!(config.link.kind.protocol(), Some(Protocol::Socket));
        assert_eq!(config.link.ack_timeout(), Duration::from_secs(5));
        assert_eq!(config.link.timeouts().poll, Duration::from_millis(50));
        assert_eq!(config.scroll_speed().unwrap().get(), 9);
    }

    #[test]
    fn test_rejects_bad_speed() {
        let err = Config::from_toml("[scroll]\nspeed = 11\n").unwrap_err();
        assert!(matches!(err, Error::ScrollSpeed(11)));
    }

    #[test]
    fn test_rejects_zero_baud() {
        let err = Config::from_toml("[link]\nbaud = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let err = Config::from_toml("[link]\nack_timeout_ms = 0\n").unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("ack_timeout_ms")));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            Config::from_toml("[link]\nspeed = 3\n"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("superled.toml");
        fs::write(&path, "[link]\nkind = \"preview\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.link.kind, LinkKind::Preview);
        assert_eq!(config.link.kind.protocol(), None);
    }
}
