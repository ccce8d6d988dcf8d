//! HTTP Listener Config

use clap::Args;

/// Where the cart API listens.
#[derive(Debug, Args)]
pub struct ServerRuntimeConfig {
    /// Interface the cart API binds to
    #[arg(short = 'H', long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the cart API binds to
    #[arg(short, long, env = "SERVER_PORT", default_value = "8698")]
    pub port: u16,
}

impl ServerRuntimeConfig {
    /// `host:port` for the TCP listener.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
