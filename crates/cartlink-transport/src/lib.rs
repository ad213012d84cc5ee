//! Byte transport abstraction for flashcart links.
//!
//! Everything above this crate talks to the device through the [`Transport`]
//! capability trait:
//! - `wait` blocks until input is pending
//! - `read` returns whatever is currently available (possibly short)
//! - `write` blocks until every byte is accepted
//!
//! [`SerialTransport`] is the native backend over a USB serial port.

pub mod error;
pub mod serial;
pub mod traits;

pub use error::{Result, TransportError};
pub use serial::{available_ports, PortInfo, SerialConfig, SerialTransport};
pub use traits::Transport;
