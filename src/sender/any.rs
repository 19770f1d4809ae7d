use super::http::HttpTransport;
use super::transport::{Framing, Transport, TransportError};
use super::udp::UdpTransport;
use crate::domain::TimeUnit;
use bytes::Bytes;
use std::future::Future;

/// A transport picked at runtime from configuration.
#[derive(Debug)]
pub enum AnyTransport {
    Http(HttpTransport),
    Udp(UdpTransport),
}

impl Transport for AnyTransport {
    fn send(&self, payload: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send {
        async move {
            match self {
                AnyTransport::Http(transport) => transport.send(payload).await,
                AnyTransport::Udp(transport) => transport.send(payload).await,
            }
        }
    }

    fn framing(&self) -> Framing {
        match self {
            AnyTransport::Http(transport) => transport.framing(),
            AnyTransport::Udp(transport) => transport.framing(),
        }
    }

    fn precision(&self) -> TimeUnit {
        match self {
            AnyTransport::Http(transport) => transport.precision(),
            AnyTransport::Udp(transport) => transport.precision(),
        }
    }
}

impl From<HttpTransport> for AnyTransport {
    fn from(transport: HttpTransport) -> Self {
        AnyTransport::Http(transport)
    }
}

impl From<UdpTransport> for AnyTransport {
    fn from(transport: UdpTransport) -> Self {
        AnyTransport::Udp(transport)
    }
}
