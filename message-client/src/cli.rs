use std::time::Duration;

use clap::Parser;

use crate::{config::ClientConfig, filter::FilterKind};

/// Interactive client for the message directory service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Host name or IP address of the directory server.
    #[arg(short = 's', long)]
    pub server: String,

    /// TCP port of the directory server.
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u16).range(1024..=65535))]
    pub port: u16,

    /// Milliseconds to wait when opening a connection to the server.
    #[arg(long, default_value_t = 5000)]
    pub connect_timeout_ms: u64,

    /// Transformation applied to message bodies before SEND.
    #[arg(long, value_enum, default_value_t = FilterKind::CollapseSpaces)]
    pub filter: FilterKind,
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            ..ClientConfig::new(self.server.clone(), self.port)
        }
    }
}
