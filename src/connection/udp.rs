use std::{
    io,
    net::{SocketAddr, UdpSocket},
    sync::OnceLock,
};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio_util::{codec::BytesCodec, udp::UdpFramed};

use super::{Transport, TransportTarget};
use crate::{chunk::Chunks, error::Error};

/// Bind address version must match address version.
fn bind_addr(addr: &SocketAddr) -> &'static str {
    if addr.is_ipv4() {
        "0.0.0.0:0"
    } else {
        "[::]:0"
    }
}

/// Sends datagrams straight from the calling thread.
///
/// Sockets are bound to an ephemeral port, one per address family, on first use and reused
/// afterwards. They are non-blocking: a send that would block fails instead.
#[derive(Debug)]
pub struct UdpTransport {
    target: TransportTarget,
    v4: OnceLock<UdpSocket>,
    v6: OnceLock<UdpSocket>,
}

impl UdpTransport {
    pub fn new(target: TransportTarget) -> Self {
        UdpTransport {
            target,
            v4: OnceLock::new(),
            v6: OnceLock::new(),
        }
    }

    pub fn target(&self) -> &TransportTarget {
        &self.target
    }

    fn socket(&self, addr: &SocketAddr) -> io::Result<&UdpSocket> {
        let cell = if addr.is_ipv4() { &self.v4 } else { &self.v6 };
        if let Some(socket) = cell.get() {
            return Ok(socket);
        }

        let socket = UdpSocket::bind(bind_addr(addr))?;
        socket.set_nonblocking(true)?;
        // Losing a race here only drops the extra socket
        let _ = cell.set(socket);
        cell.get()
            .ok_or_else(|| io::Error::other("socket was not initialised"))
    }
}

impl Transport for UdpTransport {
    fn send(&self, chunks: Chunks<'_>) -> Result<usize, Error> {
        let addr = self.target.resolve().map_err(Error::Transport)?;
        let socket = self.socket(&addr).map_err(Error::Transport)?;

        let mut sent = 0;
        for chunk in chunks {
            let datagram = chunk.to_bytes();
            let written = socket
                .send_to(&datagram, addr)
                .map_err(Error::Transport)?;
            if written != datagram.len() {
                return Err(Error::Transport(io::Error::new(
                    io::ErrorKind::WriteZero,
                    format!("datagram truncated to {} of {} bytes", written, datagram.len()),
                )));
            }
            sent += 1;
        }
        Ok(sent)
    }
}

/// A UDP connection to Graylog, driven by a [`ConnectionHandle`](super::ConnectionHandle).
#[derive(Debug)]
pub struct UdpConnection;

impl UdpConnection {
    pub(super) async fn handle<S>(
        &self,
        addr: SocketAddr,
        receiver: &mut S,
    ) -> Result<(), std::io::Error>
    where
        S: Stream<Item = Bytes>,
        S: Unpin,
    {
        let udp_socket = tokio::net::UdpSocket::bind(bind_addr(&addr)).await?;

        // Writer
        let udp_stream = UdpFramed::new(udp_socket, BytesCodec::new());
        let (sink, _) = udp_stream.split();
        receiver
            .map(|bytes| Ok((bytes, addr)))
            .forward(sink)
            .await?;

        Ok(())
    }
}
