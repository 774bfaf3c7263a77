//! Opens the TCP connection to the authorizer or BOS host, with a
//! configurable connect timeout.

use crate::error::{Error, Result};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default connect timeout, used when a caller doesn't supply one.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Resolves and connects to an OSCAR endpoint.
#[derive(Debug, Clone, Copy)]
pub struct Connector {
    connect_timeout: Duration,
}

impl Default for Connector {
    fn default() -> Connector {
        Connector { connect_timeout: DEFAULT_CONNECT_TIMEOUT }
    }
}

impl Connector {
    /// Creates a connector with the default connect timeout.
    pub fn new() -> Connector {
        Connector::default()
    }

    /// Creates a connector with a custom connect timeout.
    pub fn with_timeout(connect_timeout: Duration) -> Connector {
        Connector { connect_timeout }
    }

    /// Connects to `host:port`, failing with [`Error::Transport`] on a DNS
    /// failure, a refused/unreachable connection, or exceeding the
    /// configured timeout.
    pub async fn connect(&self, host: &str, port: u16) -> Result<TcpStream> {
        let addr = format!("{host}:{port}");
        match timeout(self.connect_timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => {
                log::debug!("connected to {addr}");
                Ok(stream)
            }
            Ok(Err(e)) => Err(Error::Transport(format!("connecting to {addr}: {e}"))),
            Err(_) => Err(Error::Transport(format!("timed out connecting to {addr}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_reasonable() {
        let connector = Connector::new();
        assert_eq!(connector.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    }

    #[tokio::test]
    async fn connect_refused_is_a_transport_error() {
        let connector = Connector::with_timeout(Duration::from_millis(500));
        let result = connector.connect("127.0.0.1", 1).await;
        assert!(result.is_err());
    }
}
