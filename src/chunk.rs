//! GELF chunked framing.
//!
//! A payload larger than the configured chunk size is cut into at most [`MAX_CHUNKS`] pieces,
//! each prefixed with a 12 byte header:
//!
//! | bytes   | content                        |
//! |---------|--------------------------------|
//! | 0..2    | magic `1E 0F`                  |
//! | 2..10   | message id, shared by a message|
//! | 10      | sequence index, 0-based        |
//! | 11      | sequence count                 |
//! | 12..    | payload                        |
//!
//! A payload that fits is sent as-is, without a header.

use std::{fmt, iter::FusedIterator};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::Error;

pub const CHUNK_MAGIC: [u8; 2] = [0x1e, 0x0f];
pub const CHUNK_HEADER_SIZE: usize = 12;
/// Receivers discard messages with more chunks than this.
pub const MAX_CHUNKS: usize = 128;
/// Keeps a chunk inside a single Ethernet frame.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 1420;

/// Random id shared by all chunks of one message.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub [u8; 8]);

impl MessageId {
    pub fn random() -> Self {
        MessageId(rand::random())
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId(")?;
        for b in self.0 {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub message_id: MessageId,
    pub index: u8,
    pub count: u8,
}

impl ChunkHeader {
    fn put(&self, buf: &mut BytesMut) {
        buf.put_slice(&CHUNK_MAGIC);
        buf.put_slice(&self.message_id.0);
        buf.put_u8(self.index);
        buf.put_u8(self.count);
    }
}

/// One datagram's worth of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    header: Option<ChunkHeader>,
    payload: &'a [u8],
}

impl<'a> Chunk<'a> {
    /// `None` for a message sent without chunking.
    pub fn header(&self) -> Option<&ChunkHeader> {
        self.header.as_ref()
    }

    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Size of the datagram this chunk becomes.
    pub fn len(&self) -> usize {
        self.header.map_or(0, |_| CHUNK_HEADER_SIZE) + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The datagram: header, if any, followed by the payload.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.len());
        if let Some(header) = &self.header {
            header.put(&mut buf);
        }
        buf.put_slice(self.payload);
        buf.freeze()
    }
}

/// The chunks of one message, in index order.
#[derive(Debug)]
pub struct Chunks<'a> {
    payload: &'a [u8],
    message_id: Option<MessageId>,
    usable: usize,
    count: u8,
    next: u8,
}

impl<'a> Chunks<'a> {
    /// `true` if the payload is sent without chunk headers.
    pub fn is_unchunked(&self) -> bool {
        self.message_id.is_none()
    }

    pub fn message_id(&self) -> Option<MessageId> {
        self.message_id
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let index = self.next;
        self.next += 1;

        let message_id = match self.message_id {
            Some(message_id) => message_id,
            None => {
                return Some(Chunk {
                    header: None,
                    payload: self.payload,
                })
            }
        };

        let start = index as usize * self.usable;
        let end = (start + self.usable).min(self.payload.len());
        Some(Chunk {
            header: Some(ChunkHeader {
                message_id,
                index,
                count: self.count,
            }),
            payload: &self.payload[start..end],
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.count - self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks<'_> {}

impl FusedIterator for Chunks<'_> {}

/// Split a serialized message into datagrams of at most `max_chunk_size` bytes.
///
/// Fails without producing any chunk if more than [`MAX_CHUNKS`] would be needed.
pub fn split(payload: &[u8], max_chunk_size: usize) -> Result<Chunks<'_>, Error> {
    if payload.len() <= max_chunk_size {
        return Ok(Chunks {
            payload,
            message_id: None,
            usable: payload.len(),
            count: 1,
            next: 0,
        });
    }

    let usable = max_chunk_size.saturating_sub(CHUNK_HEADER_SIZE).max(1);
    let count = payload.len().div_ceil(usable);
    if count > MAX_CHUNKS {
        return Err(Error::MessageTooLarge {
            size: payload.len(),
            chunks: count,
        });
    }

    Ok(Chunks {
        payload,
        message_id: Some(MessageId::random()),
        usable,
        count: count as u8,
        next: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn small_payload_is_unchunked() {
        let data = payload(1420);
        let chunks: Vec<_> = split(&data, 1420).unwrap().collect();

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].header().is_none());
        assert_eq!(chunks[0].payload(), &data[..]);
        assert_eq!(&chunks[0].to_bytes()[..], &data[..]);
    }

    #[test]
    fn empty_payload_is_one_datagram() {
        let chunks: Vec<_> = split(b"", 1420).unwrap().collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].is_empty());
    }

    #[test]
    fn large_payload_reassembles() {
        let data = payload(5000);
        let chunks = split(&data, 1420).unwrap();
        assert!(!chunks.is_unchunked());
        // 1408 usable bytes per chunk
        assert_eq!(chunks.len(), 4);

        let chunks: Vec<_> = chunks.collect();
        let id = chunks[0].header().unwrap().message_id;
        let mut rebuilt = Vec::new();
        for (i, chunk) in chunks.iter().enumerate() {
            let header = chunk.header().unwrap();
            assert_eq!(header.message_id, id);
            assert_eq!(header.index as usize, i);
            assert_eq!(header.count, 4);
            assert!(chunk.len() <= 1420);
            rebuilt.extend_from_slice(chunk.payload());
        }
        assert_eq!(rebuilt, data);
    }

    #[test]
    fn datagram_layout() {
        let data = payload(30);
        let chunk = split(&data, 20).unwrap().next().unwrap();
        let header = *chunk.header().unwrap();
        let bytes = chunk.to_bytes();

        assert_eq!(bytes.len(), 20);
        assert_eq!(&bytes[0..2], &CHUNK_MAGIC);
        assert_eq!(&bytes[2..10], &header.message_id.0);
        assert_eq!(bytes[10], 0);
        assert_eq!(bytes[11], 4);
        assert_eq!(&bytes[12..], &data[..8]);
    }

    #[test]
    fn exactly_max_chunks_is_allowed() {
        let data = payload(128 * 100);
        let chunks = split(&data, 100 + CHUNK_HEADER_SIZE).unwrap();
        assert_eq!(chunks.len(), MAX_CHUNKS);
    }

    #[test]
    fn too_many_chunks() {
        let data = payload(128 * 100 + 1);
        let err = split(&data, 100 + CHUNK_HEADER_SIZE).unwrap_err();
        assert!(matches!(
            err,
            Error::MessageTooLarge {
                size: 12801,
                chunks: 129
            }
        ));
    }

    #[test]
    fn tiny_chunk_size_does_not_panic() {
        let data = payload(64);
        let chunks = split(&data, 4).unwrap();
        assert_eq!(chunks.len(), 64);
        assert!(split(&payload(500), 4).is_err());
    }

    #[test]
    fn ids_differ_between_messages() {
        let data = payload(3000);
        let a = split(&data, 1420).unwrap().message_id();
        let b = split(&data, 1420).unwrap().message_id();
        assert_ne!(a, b);
    }

    #[test]
    fn iterator_is_fused() {
        let data = payload(10);
        let mut chunks = split(&data, 1420).unwrap();
        assert!(chunks.next().is_some());
        assert!(chunks.next().is_none());
        assert!(chunks.next().is_none());
    }
}
