//! Upload program images to flashcarts and follow their runtime output.
//!
//! # Crate Structure
//!
//! - [`transport`]: Byte transport trait and serial-port backend
//! - [`frame`]: Command encoding and device packet framing
//! - [`session`]: Upload, listen loop, device discovery

/// Re-export transport types.
pub mod transport {
    pub use cartlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use cartlink_frame::*;
}

/// Re-export session types.
pub mod session {
    pub use cartlink_session::*;
}

#[cfg(test)]
mod tests {
    use super::frame::{is_test_reply, Command, Opcode};
    use super::session::{pad_image, DeviceKind};
    use super::transport::SerialConfig;

    #[test]
    fn facade_reaches_every_layer() {
        assert_eq!(Command::new(Opcode::Test).to_bytes().len(), 16);
        assert!(is_test_reply(b"cmdr"));
        assert_eq!(pad_image(&[1]).len(), 512);
        assert_eq!(DeviceKind::ALL.len(), 1);
        assert_eq!(SerialConfig::default().baud_rate, 9600);
    }
}
