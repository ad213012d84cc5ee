/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] cartlink_transport::TransportError),

    /// Framing error while reading device packets.
    #[error("frame error: {0}")]
    Frame(#[from] cartlink_frame::FrameError),

    /// No candidate port identified as a known flashcart.
    #[error("no device found")]
    NoDevice,

    /// The named port answered, but not as any known flashcart.
    #[error("{port} did not identify as a known flashcart")]
    NotIdentified { port: String },

    /// The image does not fit the 32-bit length field of a command.
    #[error("image too large ({size} bytes, max {max})")]
    ImageTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, SessionError>;
