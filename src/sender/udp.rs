use super::transport::{Framing, Transport, TransportError};
use crate::domain::TimeUnit;
use bytes::Bytes;
use std::net::SocketAddr;
use tokio::net::{UdpSocket, lookup_host};
use tracing::debug;

/// Sends one datagram per record with nanosecond timestamps.
#[derive(Debug)]
pub struct UdpTransport {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpTransport {
    /// Resolves `address` (`host:port`) and binds a local socket of the
    /// matching address family.
    pub async fn connect(address: &str) -> Result<Self, TransportError> {
        let target = lookup_host(address)
            .await?
            .next()
            .ok_or_else(|| {
                TransportError::InvalidConfiguration(format!("Could not resolve '{address}'"))
            })?;

        let local = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        debug!(%target, "UDP transport ready");

        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

impl Transport for UdpTransport {
    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        self.socket.send(&payload).await?;
        Ok(())
    }

    fn framing(&self) -> Framing {
        Framing::PerRecord
    }

    fn precision(&self) -> TimeUnit {
        TimeUnit::Nanoseconds
    }
}
