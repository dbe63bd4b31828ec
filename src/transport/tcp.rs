//! TCP connection to the BAPS server.
//!
//! # Example
//!
//! ```ignore
//! use baps_gateway::transport::BapsStream;
//!
//! let stream = BapsStream::connect("127.0.0.1", 1350).await?;
//! let (reader, writer) = stream.into_split();
//! ```

use std::net::SocketAddr;

use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::error::Result;

/// Default BAPS server port.
pub const DEFAULT_PORT: u16 = 1350;

/// Connected BAPS server stream.
pub struct BapsStream {
    stream: TcpStream,
    peer: SocketAddr,
}

impl BapsStream {
    /// Connect to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        Self::from_stream(stream)
    }

    /// Wrap an already-connected socket.
    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        // Requests are small and written whole
        stream.set_nodelay(true)?;
        let peer = stream.peer_addr()?;
        tracing::info!(%peer, "connected to server");
        Ok(Self { stream, peer })
    }

    /// Server address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Split into read and write halves.
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }

    /// Get a reference to the underlying stream.
    pub fn inner(&self) -> &TcpStream {
        &self.stream
    }
}

/// Connect to the server and split the socket.
pub async fn connect(host: &str, port: u16) -> Result<(OwnedReadHalf, OwnedWriteHalf)> {
    Ok(BapsStream::connect(host, port).await?.into_split())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_connect_to_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let accept = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4];
            socket.read_exact(&mut buf).await.unwrap();
            buf
        });

        let stream = BapsStream::connect("127.0.0.1", addr.port()).await.unwrap();
        assert_eq!(stream.peer_addr(), addr);
        assert!(stream.inner().nodelay().unwrap());

        let (_reader, mut writer) = stream.into_split();
        writer.write_all(b"ping").await.unwrap();

        assert_eq!(&accept.await.unwrap(), b"ping");
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = connect("127.0.0.1", port).await;

        assert!(matches!(result, Err(crate::error::GatewayError::Io(_))));
    }
}
