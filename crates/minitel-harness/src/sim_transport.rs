//! Simulated transport over turmoil TCP.

use std::io;

use async_trait::async_trait;
use minitel_core::Transport;

/// Transport connecting through turmoil's simulated network.
///
/// `host` is a turmoil host name such as `"server"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimTransport;

#[async_trait]
impl Transport for SimTransport {
    type Stream = turmoil::net::TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<Self::Stream> {
        turmoil::net::TcpStream::connect((host, port)).await
    }
}
