//! Socket plumbing for the two connection shapes the client uses.
//!
//! - Request connections are short-lived: one request, one reply, then the
//!   socket is dropped. Connect failures collapse to `None` so each operation
//!   can map them to its own generic failure code.
//! - The push listener socket is bound once per session on an OS-assigned port.

use std::{
    io,
    net::{Ipv4Addr, SocketAddr},
    time::Duration,
};

use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream, ToSocketAddrs},
    time::timeout,
};
use tracing::{debug, warn};

use crate::wire::{self, Request};

pub async fn open_request_connection<A>(addr: A, connect_timeout: Duration) -> Option<TcpStream>
where
    A: ToSocketAddrs,
{
    match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => Some(stream),
        Ok(Err(err)) => {
            warn!(error = ?err, "failed to open request connection");
            None
        }
        Err(_) => {
            warn!(?connect_timeout, "timed out opening request connection");
            None
        }
    }
}

/// Binds the wildcard address on port 0 and reports the port the OS picked.
pub async fn open_ephemeral_listener() -> io::Result<(u16, TcpListener)> {
    let listener = TcpListener::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))).await?;
    let port = listener.local_addr()?.port();
    debug!(port, "bound push listener socket");
    Ok((port, listener))
}

/// One request/reply exchange. The socket closes when this value is dropped.
pub struct Exchange {
    stream: BufReader<TcpStream>,
}

impl Exchange {
    pub async fn open<A>(addr: A, connect_timeout: Duration) -> Option<Self>
    where
        A: ToSocketAddrs,
    {
        let stream = open_request_connection(addr, connect_timeout).await?;
        Some(Self {
            stream: BufReader::new(stream),
        })
    }

    pub async fn send(&mut self, request: &Request) -> io::Result<()> {
        request.write_to(self.stream.get_mut()).await
    }

    pub async fn read_error_code(&mut self) -> io::Result<u8> {
        wire::read_error_code(&mut self.stream).await
    }

    pub async fn read_field(&mut self) -> io::Result<String> {
        wire::read_field(&mut self.stream).await
    }
}
