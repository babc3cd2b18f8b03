//! TCP transport.

use std::io;

use async_trait::async_trait;
use minitel_core::Transport;
use tokio::net::TcpStream;

/// Plain TCP. MiniTel-Lite has no transport security of its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpTransport;

#[async_trait]
impl Transport for TcpTransport {
    type Stream = TcpStream;

    async fn connect(&self, host: &str, port: u16) -> io::Result<TcpStream> {
        let stream = TcpStream::connect((host, port)).await?;
        // Frames are tiny and strictly request/response
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}
