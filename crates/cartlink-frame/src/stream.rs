use bytes::{Buf, Bytes, BytesMut};
use cartlink_transport::Transport;
use tracing::{debug, trace};

use crate::codec::{aligned_size, framed_size, Packet, HEADER_MARKER, TRAILER_MARKER};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 8 * 1024;

/// Reads complete packets from a [`Transport`].
///
/// Short reads are absorbed internally: every primitive blocks and fetches
/// more input until it can return exactly what was asked for. Callers always
/// get whole packets, and after a successful [`read_packet`] the buffer sits
/// on the next packet boundary.
///
/// [`read_packet`]: PacketStream::read_packet
pub struct PacketStream<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Transport> PacketStream<T> {
    /// Attach a packet stream to a transport.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next packet (blocking).
    ///
    /// Returns `Ok(None)` when a zero byte sits where a packet header should
    /// start, meaning the device has gone quiet for good (typically powered
    /// off). The zero byte is left in the buffer.
    ///
    /// A marker mismatch is fatal: there is no way to find the next packet
    /// boundary without trusting the markers, so the stream should be
    /// dropped.
    pub fn read_packet(&mut self) -> Result<Option<Packet>> {
        if self.peek_byte()? == 0 {
            debug!("end-of-stream sentinel");
            return Ok(None);
        }

        let marker = self.take_array::<4>()?;
        if marker != HEADER_MARKER {
            return Err(FrameError::BadLeadingMarker { found: marker });
        }

        let kind = self.take_byte()?;
        let len = self.take_array::<3>()?;
        let len = u32::from_be_bytes([0, len[0], len[1], len[2]]) as usize;
        let payload = self.take_n(len)?;

        let marker = self.take_array::<4>()?;
        if marker != TRAILER_MARKER {
            return Err(FrameError::BadTrailingMarker { found: marker });
        }

        let padding = aligned_size(len) - framed_size(len);
        self.take_n(padding)?;

        trace!(kind, len, "packet");
        Ok(Some(Packet { kind, payload }))
    }

    /// Next byte without consuming it.
    pub fn peek_byte(&mut self) -> Result<u8> {
        while self.buf.is_empty() {
            self.fill()?;
        }
        Ok(self.buf[0])
    }

    /// Consume and return the next byte.
    pub fn take_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.buf.advance(1);
        Ok(byte)
    }

    /// Consume exactly `n` bytes, fetching as often as needed.
    pub fn take_n(&mut self, n: usize) -> Result<Bytes> {
        while self.buf.len() < n {
            self.fill()?;
        }
        Ok(self.buf.split_to(n).freeze())
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        while self.buf.len() < N {
            self.fill()?;
        }
        let mut out = [0u8; N];
        self.buf.copy_to_slice(&mut out);
        Ok(out)
    }

    /// Block until input is pending, then pull all of it into the buffer.
    fn fill(&mut self) -> Result<()> {
        let pending = self.inner.wait()?.max(1);
        let start = self.buf.len();
        self.buf.resize(start + pending, 0);

        match self.inner.read(&mut self.buf[start..]) {
            Ok(read) => {
                self.buf.truncate(start + read);
                trace!(read, buffered = self.buf.len(), "fetched");
                Ok(())
            }
            Err(err) => {
                self.buf.truncate(start);
                Err(err.into())
            }
        }
    }

    /// Bytes fetched from the transport but not yet consumed.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Consume the stream and return the transport. Buffered bytes are lost.
    pub fn into_inner(self) -> T {
        self.inner
    }
}
