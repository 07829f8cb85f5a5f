//! Server configuration and config-file loading.

use std::path::{Path, PathBuf};

use inkbridge_relay::RelayConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid listen address '{0}' (expected host:port)")]
    Listen(String),
}

/// Configuration for the relay server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind (default `"0.0.0.0"`).
    pub host: String,
    /// Port to bind (default `8080`, `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Outbound frames buffered per connection. A drawing batch waits for
    /// room; other sends into a full queue count as failed.
    pub max_send_queue: usize,
    /// How long a drawing batch waits on a full queue before the slow peer
    /// is dropped, in milliseconds.
    pub send_stall_timeout_ms: u64,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Close connections whose last pong is older than this.
    pub heartbeat_timeout_secs: u64,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_connections: 50,
            max_send_queue: 256,
            send_stall_timeout_ms: 5_000,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            max_message_size: 16 * 1024 * 1024, // 16 MB
        }
    }
}

impl ServerConfig {
    /// Override host and port from a `host:port` string.
    pub fn apply_listen(&mut self, listen: &str) -> Result<(), ConfigError> {
        let (host, port) = listen
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::Listen(listen.to_string()))?;
        if host.is_empty() {
            return Err(ConfigError::Listen(listen.to_string()));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| ConfigError::Listen(listen.to_string()))?;
        self.host = host.to_string();
        self.port = port;
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Everything the config file may contain. Missing sections keep defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub relay: RelayConfig,
}

impl AppConfig {
    /// Load from a JSON file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkbridge_relay::BindingPolicy;
    use std::io::Write;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.max_connections, 50);
        assert_eq!(cfg.max_send_queue, 256);
        assert_eq!(cfg.send_stall_timeout_ms, 5_000);
        assert_eq!(cfg.heartbeat_interval_secs, 30);
        assert_eq!(cfg.heartbeat_timeout_secs, 90);
        assert_eq!(cfg.max_message_size, 16 * 1024 * 1024);
    }

    #[test]
    fn serde_roundtrip() {
        let cfg = ServerConfig {
            port: 9000,
            max_send_queue: 8,
            ..Default::default()
        };
        let json = serde_json::to_string(&cfg).unwrap();
        let back: ServerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn apply_listen_sets_host_and_port() {
        let mut cfg = ServerConfig::default();
        cfg.apply_listen("127.0.0.1:9191").unwrap();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 9191);
        assert_eq!(cfg.bind_addr(), "127.0.0.1:9191");
    }

    #[test]
    fn apply_listen_keeps_bracketed_ipv6() {
        let mut cfg = ServerConfig::default();
        cfg.apply_listen("[::1]:7000").unwrap();
        assert_eq!(cfg.bind_addr(), "[::1]:7000");
    }

    #[test]
    fn apply_listen_rejects_garbage() {
        let mut cfg = ServerConfig::default();
        assert!(matches!(cfg.apply_listen("localhost"), Err(ConfigError::Listen(_))));
        assert!(matches!(cfg.apply_listen(":80"), Err(ConfigError::Listen(_))));
        assert!(matches!(cfg.apply_listen("host:http"), Err(ConfigError::Listen(_))));
        assert_eq!(cfg, ServerConfig::default());
    }

    #[test]
    fn load_without_path_is_default() {
        assert_eq!(AppConfig::load(None).unwrap(), AppConfig::default());
    }

    #[test]
    fn load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server":{{"port":0}},"relay":{{"binding_policy":"reject-second"}}}}"#
        )
        .unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.server.port, 0);
        assert_eq!(cfg.server.host, "0.0.0.0");
        assert_eq!(cfg.relay.binding_policy, BindingPolicy::RejectSecond);
        assert_eq!(cfg.relay.angle_decimals, 2);
    }

    #[test]
    fn load_rejects_zero_length_link() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"relay":{{"geometry":{{"link1":{{"x":0,"y":0}},"link2":{{"x":5,"y":0}}}}}}}}"#
        )
        .unwrap();

        let err = AppConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn load_missing_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/inkbridge.json"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
