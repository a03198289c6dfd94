//! Server configuration and command-line arguments.

use std::net::SocketAddr;

use clap::{Parser, ValueEnum};
use logbook_core::{ServiceConfig, Zone};
use logbook_core::config::{DEFAULT_PAGE_SIZE, DEFAULT_SEQUENCE_SPACE, MAX_PAGE_SIZE};

/// Configuration for the logbook HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Allowed CORS origins (empty allows any origin).
    pub cors_origins: Vec<String>,
    /// Settings passed to the logbook service.
    pub service: ServiceConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080"
                .parse()
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
            cors_origins: Vec::new(),
            service: ServiceConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the given bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Default::default()
        }
    }

    /// Set the allowed CORS origins.
    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    /// Set the service configuration.
    #[must_use]
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Operations logbook HTTP server.
#[derive(Parser, Debug, Clone)]
#[command(name = "logbook-server")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Address to listen on.
    #[arg(short, long, env = "LOGBOOK_BIND", default_value = "0.0.0.0:8080")]
    pub bind: SocketAddr,

    /// Page size for searches that do not give `size` or `limit`.
    #[arg(long, env = "LOGBOOK_DEFAULT_SIZE", default_value_t = DEFAULT_PAGE_SIZE)]
    pub default_size: usize,

    /// Largest page size a search may request.
    #[arg(long, env = "LOGBOOK_MAX_SIZE", default_value_t = MAX_PAGE_SIZE)]
    pub max_size: usize,

    /// Zone for timestamps without one, e.g. `Europe/Stockholm` or `+02:00`.
    #[arg(long, env = "LOGBOOK_TIME_ZONE", default_value = "UTC", value_parser = parse_zone)]
    pub time_zone: Zone,

    /// Counter space for log entry ids.
    #[arg(long, env = "LOGBOOK_SEQUENCE_SPACE", default_value = DEFAULT_SEQUENCE_SPACE)]
    pub sequence_space: String,

    /// Allowed CORS origins, comma separated.
    #[arg(long, env = "LOGBOOK_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Log output format.
    #[arg(long, env = "LOGBOOK_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Args {
    /// Builds the server configuration these arguments describe.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        let service = ServiceConfig::default()
            .with_default_page_size(self.default_size)
            .with_max_page_size(self.max_size)
            .with_sequence_space(self.sequence_space.clone())
            .with_time_zone(self.time_zone);

        ServerConfig::new(self.bind)
            .with_cors_origins(self.cors_origins.clone())
            .with_service(service)
    }
}

fn parse_zone(value: &str) -> Result<Zone, String> {
    Zone::parse(value).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;
    use proptest::prelude::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn test_config_builder() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::new(addr)
            .with_cors_origins(vec!["http://localhost:3000".to_string()])
            .with_service(ServiceConfig::default().with_max_page_size(10));

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.cors_origins.len(), 1);
        assert_eq!(config.service.max_page_size, 10);
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["logbook-server"]).unwrap();
        let config = args.server_config();

        assert_eq!(args.log_format, LogFormat::Text);
        assert_eq!(config.service, ServiceConfig::default());
    }

    #[test]
    fn test_args_override() {
        let args = Args::try_parse_from([
            "logbook-server",
            "--bind",
            "127.0.0.1:7070",
            "--max-size",
            "50",
            "--time-zone",
            "Europe/Stockholm",
            "--cors-origins",
            "http://a.example,http://b.example",
            "--log-format",
            "json",
        ])
        .unwrap();
        let config = args.server_config();

        assert_eq!(config.bind_addr.port(), 7070);
        assert_eq!(config.service.max_page_size, 50);
        assert_eq!(config.service.time_zone.to_string(), "Europe/Stockholm");
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(args.log_format, LogFormat::Json);
    }

    #[test]
    fn test_bad_zone_is_rejected() {
        assert!(Args::try_parse_from(["logbook-server", "--time-zone", "noon"]).is_err());
        assert!(Args::try_parse_from(["logbook-server", "--time-zone", "UTC+300"]).is_err());
    }

    proptest! {
        #[test]
        fn offsets_in_range_parse(hours in -17i32..=17, minutes in 0i32..60) {
            let sign = if hours < 0 { '-' } else { '+' };
            let text = format!("UTC{sign}{:02}:{minutes:02}", hours.abs());
            let zone = parse_zone(&text).unwrap();
            let magnitude = hours.abs() * 3600 + minutes * 60;
            let expected = if sign == '-' { -magnitude } else { magnitude };
            prop_assert_eq!(zone, Zone::Fixed(FixedOffset::east_opt(expected).unwrap()));
        }
    }
}
