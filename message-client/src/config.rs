use std::time::Duration;

/// Where the directory server lives and how long the client waits on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Bound on opening a request connection.
    pub connect_timeout: Duration,
    /// Bound on reading one push off an accepted connection. Keep it below
    /// `stop_timeout` so a stalled push cannot outlast a stop request.
    pub push_read_timeout: Duration,
    /// Bound on waiting for the push listener to exit after the sentinel was sent.
    pub stop_timeout: Duration,
}

impl ClientConfig {
    pub fn new(server_host: impl Into<String>, server_port: u16) -> Self {
        Self {
            server_host: server_host.into(),
            server_port,
            ..Self::default()
        }
    }

    pub fn server_address(&self) -> (&str, u16) {
        (self.server_host.as_str(), self.server_port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 8888,
            connect_timeout: Duration::from_secs(5),
            push_read_timeout: Duration::from_secs(1),
            stop_timeout: Duration::from_secs(2),
        }
    }
}
