//! Packet type codes emitted by the device.

/// Free-form log text.
pub const TEXT: u8 = 0x01;

/// Liveness signal with no payload of interest.
pub const HEARTBEAT: u8 = 0x05;

/// Returns a human-readable name for a packet type.
pub fn kind_name(kind: u8) -> &'static str {
    match kind {
        TEXT => "TEXT",
        HEARTBEAT => "HEARTBEAT",
        _ => "UNKNOWN",
    }
}
