use cartlink_transport::TransportError;

/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The four bytes at a packet boundary were not `DMA@`.
    #[error("invalid packet header marker {found:02x?} (expected \"DMA@\")")]
    BadLeadingMarker { found: [u8; 4] },

    /// The four bytes after the payload were not `CMPH`.
    #[error("invalid packet trailer marker {found:02x?} (expected \"CMPH\")")]
    BadTrailingMarker { found: [u8; 4] },

    /// The payload does not fit the 24-bit length field.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The underlying transport failed while a packet was being read.
    #[error("frame transport error: {0}")]
    Transport(#[from] TransportError),
}

pub type Result<T> = std::result::Result<T, FrameError>;
