//! Client configuration.

use std::time::Duration;

use minitel_core::OrchestratorConfig;

/// Default server port.
pub const DEFAULT_PORT: u16 = 7000;

/// Where and how patiently to connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// How long to wait for the transport to connect
    pub connect_timeout: Duration,
    /// How long each command waits for its response
    pub response_timeout: Duration,
    /// Size of each read from the transport
    pub read_buffer_size: usize,
}

impl ClientConfig {
    /// Default configuration for `host:port`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port, ..Self::default() }
    }

    /// `host:port` for logging.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Orchestrator settings derived from this configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig { response_timeout: self.response_timeout }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(5),
            read_buffer_size: 4096,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_keeps_default_timeouts() {
        let config = ClientConfig::new("minitel.example", 9000);
        assert_eq!(config.address(), "minitel.example:9000");
        assert_eq!(config.response_timeout, ClientConfig::default().response_timeout);
        assert_eq!(config.orchestrator_config().response_timeout, Duration::from_secs(5));
    }
}
