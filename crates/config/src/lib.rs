//! Athena Client Configuration
//!
//! Loads the headless client's settings from a line-oriented `key = value`
//! file. Lines starting with `#` are comments. Unknown keys and unparsable
//! values are reported and otherwise ignored, so a partially broken file
//! still yields a usable configuration.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use athena_core::{Dialect, Result, ServerFeatures, ServerInfo};

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/client.conf";

/// What to do when a server stops answering pings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PingTimeoutAction {
    /// Report the timeout and keep the connection
    #[default]
    Warn,
    /// Report the timeout and tear the session down
    Disconnect,
}

impl FromStr for PingTimeoutAction {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "disconnect" => Ok(Self::Disconnect),
            _ => Err(()),
        }
    }
}

/// Complete client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // Server
    /// Server family (from "dialect", `tmwa` or `eathena`)
    pub dialect: Dialect,
    /// Login server host (from "login_host")
    pub login_host: String,
    /// Login server port (from "login_port", default: 6901)
    pub login_port: u16,

    // Account
    pub username: String,
    pub password: String,
    /// Version sent with the login request (from "client_version", default: 20)
    pub client_version: u32,

    // Protocol features
    /// Optional layouts (from "item_colors" and "vending")
    pub features: ServerFeatures,

    // Timing
    /// TCP connect timeout (from "connect_timeout_secs")
    pub connect_timeout: Duration,
    /// Keep-alive ping period (from "ping_interval_secs")
    pub ping_interval: Duration,
    /// Silence tolerated before a ping timeout (from "ping_timeout_secs")
    pub ping_timeout: Duration,
    pub ping_timeout_action: PingTimeoutAction,

    // Headless choices
    /// Char server to pick from the login server's list
    pub char_server_index: usize,
    /// Character slot to play
    pub character_slot: u8,

    /// Replace loopback addresses advertised by remote servers with the login host
    pub resolve_loopback: bool,

    /// Default tracing filter (from "log_filter"), `RUST_LOG` wins
    pub log_filter: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dialect: Dialect::TmwAthena,
            login_host: "127.0.0.1".into(),
            login_port: 6901,
            username: String::new(),
            password: String::new(),
            client_version: 20,
            features: ServerFeatures::default(),
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(30),
            ping_timeout: Duration::from_secs(90),
            ping_timeout_action: PingTimeoutAction::Warn,
            char_server_index: 0,
            character_slot: 0,
            resolve_loopback: true,
            log_filter: "info".into(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// Fails only when the file cannot be read. Bad lines are warned about
    /// and skipped.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        tracing::debug!("Loaded config from {}", path.as_ref().display());
        Ok(Self::parse(&content))
    }

    /// Load `config/client.conf`, falling back to defaults when it is missing
    pub fn load_default() -> Self {
        match Self::load_from_file(DEFAULT_CONFIG_PATH) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Could not read {}: {}, using defaults", DEFAULT_CONFIG_PATH, e);
                Self::default()
            }
        }
    }

    /// Parse configuration text
    pub fn parse(content: &str) -> Self {
        let mut config = Self::default();

        for (number, line) in content.lines().enumerate() {
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            match line.split_once('=') {
                Some((key, value)) => config.parse_option(key.trim(), value.trim()),
                None => tracing::warn!("Config line {} has no '=': {}", number + 1, line),
            }
        }

        config
    }

    fn parse_option(&mut self, key: &str, value: &str) {
        match key {
            "dialect" => match Dialect::from_name(value) {
                Some(dialect) => self.dialect = dialect,
                None => warn_invalid(key, value),
            },
            "login_host" => self.login_host = value.into(),
            "login_port" => self.login_port = parse_or_keep(key, value, self.login_port),
            "username" => self.username = value.into(),
            "password" => self.password = value.into(),
            "client_version" => {
                self.client_version = parse_or_keep(key, value, self.client_version);
            }
            "item_colors" => {
                self.features.item_colors = parse_flag(key, value, self.features.item_colors);
            }
            "vending" => {
                self.features.vending = parse_flag(key, value, self.features.vending);
            }
            "connect_timeout_secs" => {
                self.connect_timeout = parse_secs(key, value, self.connect_timeout);
            }
            "ping_interval_secs" => {
                self.ping_interval = parse_secs(key, value, self.ping_interval);
            }
            "ping_timeout_secs" => {
                self.ping_timeout = parse_secs(key, value, self.ping_timeout);
            }
            "ping_timeout_action" => {
                self.ping_timeout_action = parse_or_keep(key, value, self.ping_timeout_action);
            }
            "char_server_index" => {
                self.char_server_index = parse_or_keep(key, value, self.char_server_index);
            }
            "character_slot" => {
                self.character_slot = parse_or_keep(key, value, self.character_slot);
            }
            "resolve_loopback" => {
                self.resolve_loopback = parse_flag(key, value, self.resolve_loopback);
            }
            "log_filter" => self.log_filter = value.into(),
            _ => tracing::warn!("Unknown config option: {} = {}", key, value),
        }
    }

    /// Address of the login server
    pub fn login_server(&self) -> ServerInfo {
        ServerInfo::new(self.login_host.clone(), self.login_port).with_name("login")
    }

    /// Display configuration summary
    pub fn display(&self) {
        tracing::info!("Client configuration:");
        tracing::info!("  Dialect: {}", self.dialect);
        tracing::info!("  Login server: {}:{}", self.login_host, self.login_port);
        tracing::info!("  Account: {}", if self.username.is_empty() { "(unset)" } else { self.username.as_str() });
        tracing::info!("  Client version: {}", self.client_version);
        tracing::info!(
            "  Features: item_colors={} vending={}",
            self.features.item_colors,
            self.features.vending
        );
        tracing::info!(
            "  Timing: connect {:?}, ping every {:?}, timeout {:?} ({:?})",
            self.connect_timeout,
            self.ping_interval,
            self.ping_timeout,
            self.ping_timeout_action
        );
        tracing::info!(
            "  Char server #{}, slot {}, resolve loopback: {}",
            self.char_server_index,
            self.character_slot,
            self.resolve_loopback
        );
    }
}

fn warn_invalid(key: &str, value: &str) {
    tracing::warn!("Invalid value for {}: {:?}, keeping default", key, value);
}

fn parse_or_keep<T: FromStr>(key: &str, value: &str, current: T) -> T {
    match value.parse() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn_invalid(key, value);
            current
        }
    }
}

fn parse_flag(key: &str, value: &str, current: bool) -> bool {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => true,
        "false" | "no" | "off" | "0" => false,
        _ => {
            warn_invalid(key, value);
            current
        }
    }
}

fn parse_secs(key: &str, value: &str, current: Duration) -> Duration {
    match value.parse::<u64>() {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => {
            warn_invalid(key, value);
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.dialect, Dialect::TmwAthena);
        assert_eq!(config.login_port, 6901);
        assert_eq!(config.client_version, 20);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert!(config.resolve_loopback);
        assert!(!config.features.item_colors);
    }

    #[test]
    fn test_parse_every_key() {
        let config_text = r#"
# headless test account
dialect = eathena
login_host = play.example.org
login_port = 6900
username = tester
password = secret = yes
client_version = 25
item_colors = false
vending = yes
connect_timeout_secs = 5
ping_interval_secs = 15
ping_timeout_secs = 45
ping_timeout_action = disconnect
char_server_index = 1
character_slot = 2
resolve_loopback = off
log_filter = athena=debug
"#;
        let config = ClientConfig::parse(config_text);
        assert_eq!(config.dialect, Dialect::EAthena);
        assert_eq!(config.login_host, "play.example.org");
        assert_eq!(config.login_port, 6900);
        assert_eq!(config.username, "tester");
        assert_eq!(config.password, "secret = yes");
        assert_eq!(config.client_version, 25);
        assert!(!config.features.item_colors);
        assert!(config.features.vending);
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.ping_interval, Duration::from_secs(15));
        assert_eq!(config.ping_timeout, Duration::from_secs(45));
        assert_eq!(config.ping_timeout_action, PingTimeoutAction::Disconnect);
        assert_eq!(config.char_server_index, 1);
        assert_eq!(config.character_slot, 2);
        assert!(!config.resolve_loopback);
        assert_eq!(config.log_filter, "athena=debug");
    }

    #[test]
    fn test_bad_values_keep_defaults() {
        let config_text = "\
dialect = manaserv
login_port = 70000
ping_interval_secs = 0
ping_timeout_action = explode
vending = maybe
unknown_key = 1
no equals sign here
";
        let config = ClientConfig::parse(config_text);
        assert_eq!(config.dialect, Dialect::TmwAthena);
        assert_eq!(config.login_port, 6901);
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.ping_timeout_action, PingTimeoutAction::Warn);
        assert!(!config.features.vending);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "login_host = 10.0.0.5").unwrap();
        writeln!(file, "username = alice").unwrap();

        let config = ClientConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.login_host, "10.0.0.5");
        assert_eq!(config.username, "alice");
        assert_eq!(config.login_server().address(), "10.0.0.5:6901");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ClientConfig::load_from_file(dir.path().join("absent.conf")).is_err());
    }
}
