//! Flashcart sessions: find a device, upload an image, boot it, and
//! optionally stay attached to receive its runtime output.
//!
//! Bring your own transport, or use [`discover`] to probe the local serial
//! ports against every known [`DeviceKind`].

pub mod cancel;
pub mod device;
pub mod error;
pub mod listen;
pub mod session;
pub mod upload;

pub use cancel::CancelToken;
pub use device::{attach_port, discover, open_port, probe, Device, DeviceKind, Flashcart};
pub use error::{Result, SessionError};
pub use listen::{listen, DoneReason, ListenObserver, ListenOutcome, DONE_MARKER};
pub use session::Session;
pub use upload::{pad_image, upload_image, UploadProgress, UploadReport};

#[cfg(test)]
pub(crate) mod mock;
