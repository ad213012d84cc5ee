use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

/// Marker that opens every packet.
pub const HEADER_MARKER: [u8; 4] = *b"DMA@";

/// Marker that closes every packet.
pub const TRAILER_MARKER: [u8; 4] = *b"CMPH";

/// Marker (4) + type (1) + length (3).
pub const HEADER_SIZE: usize = 8;

/// Largest payload the 24-bit length field can describe.
pub const MAX_PAYLOAD: usize = (1 << 24) - 1;

/// A packet received from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet type code (see [`crate::kind`]).
    pub kind: u8,
    /// The packet payload.
    pub payload: Bytes,
}

impl Packet {
    /// Create a new packet.
    pub fn new(kind: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Bytes this packet occupies on the wire, alignment padding included.
    pub fn wire_size(&self) -> usize {
        aligned_size(self.payload.len())
    }
}

/// Unpadded size of a packet carrying `payload_len` bytes.
pub fn framed_size(payload_len: usize) -> usize {
    HEADER_SIZE + payload_len + TRAILER_MARKER.len()
}

/// Framed size rounded up to the next even offset.
pub fn aligned_size(payload_len: usize) -> usize {
    (framed_size(payload_len) + 1) & !1
}

/// Encode a packet the way the device emits it.
///
/// Wire format:
/// ```text
/// ┌────────────┬──────────┬───────────┬───────────────┬────────────┬─────────┐
/// │ Marker(4B) │ Type(1B) │ Length    │ Payload       │ Marker(4B) │ Pad     │
/// │ "DMA@"     │          │ (3B BE)   │ (Length bytes)│ "CMPH"     │ (0/1B)  │
/// └────────────┴──────────┴───────────┴───────────────┴────────────┴─────────┘
/// ```
pub fn encode_packet(kind: u8, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }

    let framed = framed_size(payload.len());
    let aligned = aligned_size(payload.len());
    dst.reserve(aligned);
    dst.put_slice(&HEADER_MARKER);
    dst.put_u8(kind);
    dst.put_uint(payload.len() as u64, 3);
    dst.put_slice(payload);
    dst.put_slice(&TRAILER_MARKER);
    dst.put_bytes(0, aligned - framed);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_even_payload_without_padding() {
        let mut buf = BytesMut::new();
        encode_packet(0x01, b"abcd", &mut buf).unwrap();

        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[..4], b"DMA@");
        assert_eq!(buf[4], 0x01);
        assert_eq!(&buf[5..8], &[0, 0, 4]);
        assert_eq!(&buf[8..12], b"abcd");
        assert_eq!(&buf[12..16], b"CMPH");
    }

    #[test]
    fn encodes_odd_payload_with_one_pad_byte() {
        let mut buf = BytesMut::new();
        encode_packet(0x05, b"abc", &mut buf).unwrap();

        assert_eq!(buf.len(), 16);
        assert_eq!(&buf[11..15], b"CMPH");
        assert_eq!(buf[15], 0);
    }

    #[test]
    fn length_field_is_24_bit_big_endian() {
        let payload = vec![0x11; 0x01_02_03];
        let mut buf = BytesMut::new();
        encode_packet(0x07, &payload, &mut buf).unwrap();
        assert_eq!(&buf[5..8], &[0x01, 0x02, 0x03]);
    }

    #[test]
    fn rejects_oversized_payload() {
        let payload = vec![0u8; MAX_PAYLOAD + 1];
        let mut buf = BytesMut::new();
        let err = encode_packet(0x01, &payload, &mut buf).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
        assert!(buf.is_empty());
    }

    #[test]
    fn sizes_round_up_to_even() {
        assert_eq!(framed_size(0), 12);
        assert_eq!(aligned_size(0), 12);
        assert_eq!(framed_size(3), 15);
        assert_eq!(aligned_size(3), 16);
        assert_eq!(aligned_size(4), 16);
        assert_eq!(Packet::new(1, Bytes::from_static(b"hello")).wire_size(), 18);
    }
}
