//! Legacy fallback: forward queries no rule answered to an upstream resolver.

use crate::error::Error;
use std::net::SocketAddr;
use tokio::net::UdpSocket;
use trust_dns_client::client::{AsyncClient, ClientHandle};
use trust_dns_client::op::ResponseCode;
use trust_dns_client::rr::{DNSClass, Name, Record, RecordType};
use trust_dns_client::udp::UdpClientStream;

#[derive(Debug, Clone, Copy)]
pub struct Passthrough {
    upstream: SocketAddr,
}

/// The parts of the upstream response relayed to the client.
#[derive(Debug, Clone)]
pub struct Forwarded {
    pub response_code: ResponseCode,
    pub answers: Vec<Record>,
}

impl Passthrough {
    #[must_use]
    pub fn new(upstream: SocketAddr) -> Self {
        Self { upstream }
    }

    #[must_use]
    pub fn upstream(&self) -> SocketAddr {
        self.upstream
    }

    /// Ask the upstream resolver for `name` over UDP.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Passthrough`] or [`Error::DNSError`] if the upstream exchange fails.
    pub async fn lookup(&self, name: Name, record_type: RecordType) -> Result<Forwarded, Error> {
        let stream = UdpClientStream::<UdpSocket>::new(self.upstream);
        let (mut client, background) = AsyncClient::connect(stream).await?;
        tokio::spawn(background);

        tracing::debug!("passing \"{name}\" {record_type} through to {}", self.upstream);
        let response = client.query(name, DNSClass::IN, record_type).await?;
        Ok(Forwarded {
            response_code: response.response_code(),
            answers: response.answers().to_vec(),
        })
    }
}
