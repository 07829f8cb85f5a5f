//! # inkbridge
//!
//! Relay binary: accepts an operator and an arm over WebSocket and turns
//! the operator's strokes into joint commands for the arm.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use inkbridge_relay::BindingPolicy;
use inkbridge_server::AppConfig;
use inkbridge_telemetry::{LogFormat, TelemetryConfig};
use tracing::Level;

/// Operator-to-arm drawing relay.
#[derive(Parser, Debug)]
#[command(name = "inkbridge", about = "Operator-to-arm drawing relay")]
struct Cli {
    /// Listening endpoint as host:port.
    #[arg(long, env = "INKBRIDGE_LISTEN")]
    listen: Option<String>,

    /// JSON config file; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// What to do when a role is claimed twice.
    #[arg(long)]
    binding_policy: Option<BindingPolicy>,

    /// Maximum concurrent WebSocket connections.
    #[arg(long)]
    max_connections: Option<usize>,

    /// Default log level (RUST_LOG takes precedence).
    #[arg(long, default_value = "info")]
    log_level: Level,

    /// Log output format: pretty or json.
    #[arg(long, default_value = "pretty")]
    log_format: LogFormat,
}

impl Cli {
    /// Defaults, then the config file, then flags.
    fn app_config(&self) -> Result<AppConfig> {
        let mut config = AppConfig::load(self.config.as_deref()).context("failed to load config")?;
        if let Some(listen) = &self.listen {
            config
                .server
                .apply_listen(listen)
                .context("invalid --listen / INKBRIDGE_LISTEN")?;
        }
        if let Some(policy) = self.binding_policy {
            config.relay.binding_policy = policy;
        }
        if let Some(max) = self.max_connections {
            config.server.max_connections = max;
        }
        Ok(config)
    }

    fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            log_level: self.log_level,
            format: self.log_format,
            ..Default::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    inkbridge_telemetry::init_telemetry(&cli.telemetry_config())
        .context("failed to initialise logging")?;

    let config = cli.app_config()?;
    tracing::info!(
        listen = %config.server.bind_addr(),
        binding_policy = %config.relay.binding_policy,
        "starting inkbridge"
    );

    let handle = inkbridge_server::start(config.server, config.relay)
        .await
        .context("failed to start server")?;
    tracing::info!(addr = %handle.local_addr(), "ready, press ctrl+c to stop");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("ctrl+c received");
    handle.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["inkbridge"]);
        assert!(cli.config.is_none());
        assert!(cli.binding_policy.is_none());
        assert_eq!(cli.log_level, Level::INFO);
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }

    #[test]
    fn cli_listen_overrides_port() {
        let cli = Cli::parse_from(["inkbridge", "--listen", "127.0.0.1:9000"]);
        let config = cli.app_config().unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn cli_bad_listen_is_an_error() {
        let cli = Cli::parse_from(["inkbridge", "--listen", "nowhere"]);
        assert!(cli.app_config().is_err());
    }

    #[test]
    fn cli_binding_policy() {
        let cli = Cli::parse_from(["inkbridge", "--binding-policy", "reject-second"]);
        assert_eq!(cli.binding_policy, Some(BindingPolicy::RejectSecond));
    }

    #[test]
    fn cli_rejects_unknown_policy() {
        assert!(Cli::try_parse_from(["inkbridge", "--binding-policy", "first-wins"]).is_err());
    }

    #[test]
    fn cli_log_options() {
        let cli = Cli::parse_from(["inkbridge", "--log-level", "debug", "--log-format", "json"]);
        let telemetry = cli.telemetry_config();
        assert_eq!(telemetry.log_level, Level::DEBUG);
        assert_eq!(telemetry.format, LogFormat::Json);
    }

    #[test]
    fn flags_win_over_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"server":{{"max_connections":3}},"relay":{{"binding_policy":"reject-second"}}}}"#
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let cli = Cli::parse_from([
            "inkbridge",
            "--config",
            path.as_str(),
            "--binding-policy",
            "evict-previous",
        ]);
        let config = cli.app_config().unwrap();
        assert_eq!(config.server.max_connections, 3);
        assert_eq!(config.relay.binding_policy, BindingPolicy::EvictPrevious);
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let cli = Cli::parse_from(["inkbridge", "--config", "/nonexistent/inkbridge.json"]);
        assert!(cli.app_config().is_err());
    }
}
