use crate::config::Shared;
use crate::dns::handlers::Handler;
use crate::dns::passthrough::Passthrough;
use crate::rules::RuleSet;
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use trust_dns_server::ServerFuture;

/// Bind the UDP and TCP sockets from `config` and serve `rules` on them.
///
/// # Errors
///
/// Returns an error if either socket can't be bound.
pub async fn new(config: Shared, rules: RuleSet) -> anyhow::Result<ServerFuture<Handler>> {
    let udp_addr = config.dns_udp_bind_addr;
    let tcp_addr = config.dns_tcp_bind_addr;
    let tcp_timeout = config.dns_tcp_timeout;
    let passthrough = config.passthrough.map(Passthrough::new);
    let dns_handler = Handler::new(Arc::new(rules), passthrough);
    let mut dns_server = ServerFuture::new(dns_handler);
    dns_server.register_socket(UdpSocket::bind(udp_addr).await?);
    dns_server.register_listener(TcpListener::bind(tcp_addr).await?, tcp_timeout);
    Ok(dns_server)
}
