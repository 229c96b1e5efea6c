//! Demo server configuration.
//!
//! Read from `graphql-sugar.toml` with `GRAPHQL_SUGAR__*` environment
//! overrides, e.g. `GRAPHQL_SUGAR__SERVER__PORT=9090`.
//!
//! ```toml
//! [server]
//! host = "127.0.0.1"
//! port = 8080
//!
//! [logging]
//! level = "info"
//!
//! [graphql]
//! max_depth = 10
//! max_complexity = 200
//! introspection = true
//! graphiql = true
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Default configuration file name.
pub const DEFAULT_CONFIG_PATH: &str = "graphql-sugar.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub graphql: GraphQLConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        self.graphql.validate()
    }

    pub fn addr(&self) -> SocketAddr {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// GraphQL endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphQLConfig {
    /// Maximum query depth allowed.
    /// Default: 10
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum query complexity allowed.
    /// Default: 200
    #[serde(default = "default_max_complexity")]
    pub max_complexity: usize,

    /// Enable introspection queries.
    /// Default: true
    #[serde(default = "default_true")]
    pub introspection: bool,

    /// Serve the GraphiQL IDE on `GET /graphql`.
    /// Default: true
    #[serde(default = "default_true")]
    pub graphiql: bool,
}

fn default_max_depth() -> usize {
    10
}

fn default_max_complexity() -> usize {
    200
}

fn default_true() -> bool {
    true
}

impl Default for GraphQLConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_complexity: default_max_complexity(),
            introspection: default_true(),
            graphiql: default_true(),
        }
    }
}

impl GraphQLConfig {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration values are invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_depth == 0 {
            return Err("graphql.max_depth must be > 0".into());
        }
        if self.max_complexity == 0 {
            return Err("graphql.max_complexity must be > 0".into());
        }
        Ok(())
    }
}

pub mod loader {
    use std::path::PathBuf;

    use config::{Config, Environment, File};

    use super::{AppConfig, DEFAULT_CONFIG_PATH};

    /// Loads the configuration file (if it exists), applies environment
    /// overrides and validates the result.
    pub fn load_config(path: Option<&str>) -> Result<AppConfig, String> {
        let mut builder = Config::builder();
        let pathbuf = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_PATH));
        if pathbuf.exists() {
            builder = builder.add_source(File::from(pathbuf));
        }
        // Environment variable overrides, e.g., GRAPHQL_SUGAR__SERVER__PORT=9090
        builder = builder.add_source(
            Environment::with_prefix("GRAPHQL_SUGAR")
                .try_parsing(true)
                .separator("__"),
        );
        let cfg = builder
            .build()
            .map_err(|e| format!("config build error: {e}"))?;
        let merged: AppConfig = cfg
            .try_deserialize()
            .map_err(|e| format!("config deserialize error: {e}"))?;
        merged.validate()?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.graphql.max_depth, 10);
        assert_eq!(config.graphql.max_complexity, 200);
        assert!(config.graphql.introspection);
        assert!(config.graphql.graphiql);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut config = AppConfig::default();
        config.graphql.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_addr() {
        let mut config = AppConfig::default();
        config.server.host = "127.0.0.1".into();
        config.server.port = 9000;
        assert_eq!(config.addr(), "127.0.0.1:9000".parse().unwrap());

        config.server.host = "not-an-ip".into();
        assert_eq!(config.addr().ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("graphql-sugar.toml");
        std::fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 8181

[graphql]
max_depth = 4
introspection = false
"#,
        )
        .expect("write toml");

        let cfg = loader::load_config(path.to_str()).expect("should parse config");
        assert_eq!(cfg.server.port, 8181);
        assert_eq!(cfg.graphql.max_depth, 4);
        assert_eq!(cfg.graphql.max_complexity, 200);
        assert!(!cfg.graphql.introspection);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_load_config_rejects_invalid_file() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("graphql-sugar.toml");
        std::fs::write(&path, "[graphql]\nmax_complexity = 0\n").expect("write toml");

        let err = loader::load_config(path.to_str()).unwrap_err();
        assert!(err.contains("max_complexity"));
    }
}
