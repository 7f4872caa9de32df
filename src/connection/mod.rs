mod udp;

use std::{
    fmt, io,
    net::{SocketAddr, ToSocketAddrs},
};

use bytes::Bytes;
use tokio::{
    net::lookup_host,
    sync::mpsc::{self, error::TrySendError},
};
use tokio_stream::wrappers::ReceiverStream;
use tracing_core::subscriber::NoSubscriber;
use tracing_futures::WithSubscriber;

use crate::{chunk::Chunks, error::Error};

pub use udp::*;

/// Where datagrams are sent. The protocol is always UDP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportTarget {
    host: String,
    port: u16,
}

impl TransportTarget {
    pub fn new<S: Into<String>>(host: S, port: u16) -> Self {
        TransportTarget {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolve the target. Hostnames are looked up on every call so address changes are followed.
    pub fn resolve(&self) -> io::Result<SocketAddr> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{} did not resolve to any address", self),
                )
            })
    }
}

impl fmt::Display for TransportTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Delivers the chunks of one message.
pub trait Transport: Send + Sync {
    /// Send every chunk, returning the number of datagrams handed off.
    fn send(&self, chunks: Chunks<'_>) -> Result<usize, Error>;
}

/// Hands datagrams to a [`ConnectionHandle`] through a bounded queue.
///
/// A message is queued whole or not at all. Sending never waits for queue space.
#[derive(Debug, Clone)]
pub struct QueuedTransport {
    sender: mpsc::Sender<Bytes>,
}

impl Transport for QueuedTransport {
    fn send(&self, chunks: Chunks<'_>) -> Result<usize, Error> {
        let count = chunks.len();
        if count > self.sender.max_capacity() {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::OutOfMemory,
                "message has more chunks than the delivery queue holds",
            )));
        }

        let permits = self.sender.try_reserve_many(count).map_err(|err| {
            let msg = match err {
                TrySendError::Full(()) => "delivery queue is full",
                TrySendError::Closed(()) => "delivery queue is closed",
            };
            Error::Transport(io::Error::new(io::ErrorKind::WouldBlock, msg))
        })?;
        for (permit, chunk) in permits.zip(chunks) {
            permit.send(chunk.to_bytes());
        }
        Ok(count)
    }
}

/// A sequence of [errors](std::io::Error) which occurred during a connection attempt.
///
/// These are paired with a [`SocketAddr`] because the target may resolve to several addresses.
#[derive(Debug)]
pub struct ConnectionErrors(pub Vec<(SocketAddr, io::Error)>);

/// Drains the delivery queue of a queued [`GelfHandler`](crate::GelfHandler) to Graylog.
///
/// Messages handled while no connection is running sit in the queue until it is drained or
/// fills up.
#[derive(Debug)]
#[must_use]
pub struct ConnectionHandle {
    pub(crate) target: TransportTarget,
    pub(crate) receiver: ReceiverStream<Bytes>,
    pub(crate) conn: UdpConnection,
}

impl ConnectionHandle {
    pub(crate) fn new(target: TransportTarget, buffer: usize) -> (QueuedTransport, Self) {
        let (sender, receiver) = mpsc::channel(buffer);
        let handle = ConnectionHandle {
            target,
            receiver: ReceiverStream::new(receiver),
            conn: UdpConnection,
        };
        (QueuedTransport { sender }, handle)
    }

    /// Returns the connection target.
    pub fn target(&self) -> &TransportTarget {
        &self.target
    }

    /// Sends queued datagrams to Graylog via UDP.
    ///
    /// This will perform DNS resolution and forward through each [`SocketAddr`] in turn. It
    /// returns once every handler feeding the queue has been dropped, or every address failed.
    pub async fn connect(&mut self) -> ConnectionErrors {
        // Do a DNS lookup if the host is a hostname
        let addrs = lookup_host((self.target.host(), self.target.port()))
            .await
            .into_iter()
            .flatten();

        // Loop through the IP addresses that the hostname resolved to
        let mut errors = Vec::new();
        for addr in addrs {
            let fut = self
                .conn
                .handle(addr, &mut self.receiver)
                .with_subscriber(NoSubscriber::default());
            match fut.await {
                Ok(()) => break,
                Err(err) => errors.push((addr, err)),
            }
        }
        ConnectionErrors(errors)
    }
}
