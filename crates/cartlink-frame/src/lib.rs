//! Flashcart wire formats.
//!
//! Two directions, two formats:
//! - Host to device: fixed 16-byte command frames (`cmd` tag, opcode,
//!   three big-endian words). See [`command`].
//! - Device to host: variable-length packets delimited by `DMA@` / `CMPH`
//!   markers and padded to an even offset. See [`codec`] and [`stream`].
//!
//! [`PacketStream`] turns an arbitrarily chunked byte transport into a
//! sequence of whole packets.

pub mod codec;
pub mod command;
pub mod error;
pub mod kind;
pub mod stream;

pub use codec::{encode_packet, Packet, HEADER_MARKER, MAX_PAYLOAD, TRAILER_MARKER};
pub use command::{encode_command, is_test_reply, Command, Opcode, BLOCK_SIZE, COMMAND_SIZE};
pub use error::{FrameError, Result};
pub use kind::{HEARTBEAT, TEXT};
pub use stream::PacketStream;
