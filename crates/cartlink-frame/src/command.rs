use bytes::{BufMut, BytesMut};

/// Size of every command frame on the wire.
pub const COMMAND_SIZE: usize = 16;

/// Tag that opens every command frame.
pub const COMMAND_TAG: [u8; 3] = *b"cmd";

/// Reply prefix the device sends back for a TEST command.
pub const TEST_REPLY: [u8; 4] = *b"cmdr";

/// Unit of the length field. Lengths are sent as a count of these blocks.
pub const BLOCK_SIZE: u32 = 512;

/// Device control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Ask the device to identify itself.
    Test,
    /// Start executing the uploaded image.
    Start,
    /// Write the following bytes into cartridge space.
    Write,
    /// Read cartridge space back.
    Read,
    /// Clear a region of cartridge space.
    Fill,
    /// Read device RAM.
    RamRead,
    /// Upload an FPGA configuration.
    FpgaWrite,
}

impl Opcode {
    /// The ASCII byte that identifies this operation on the wire.
    pub const fn as_byte(self) -> u8 {
        match self {
            Opcode::Test => b't',
            Opcode::Start => b's',
            Opcode::Write => b'W',
            Opcode::Read => b'R',
            Opcode::Fill => b'c',
            Opcode::RamRead => b'r',
            Opcode::FpgaWrite => b'f',
        }
    }
}

/// A device command before encoding.
///
/// `length` is in bytes and must already be a multiple of [`BLOCK_SIZE`];
/// the encoder sends `length / 512` and any remainder is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command {
    pub op: Opcode,
    pub address: u32,
    pub length: u32,
    pub arg: u32,
}

impl Command {
    /// A command with address, length and argument all zero.
    pub const fn new(op: Opcode) -> Self {
        Self {
            op,
            address: 0,
            length: 0,
            arg: 0,
        }
    }

    pub const fn address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }

    pub const fn length(mut self, length: u32) -> Self {
        self.length = length;
        self
    }

    pub const fn arg(mut self, arg: u32) -> Self {
        self.arg = arg;
        self
    }

    /// Encode into a fixed-size frame.
    pub fn to_bytes(&self) -> [u8; COMMAND_SIZE] {
        let mut out = [0u8; COMMAND_SIZE];
        out[..3].copy_from_slice(&COMMAND_TAG);
        out[3] = self.op.as_byte();
        out[4..8].copy_from_slice(&self.address.to_be_bytes());
        out[8..12].copy_from_slice(&(self.length / BLOCK_SIZE).to_be_bytes());
        out[12..16].copy_from_slice(&self.arg.to_be_bytes());
        out
    }
}

/// Append the encoded command to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────┬────────┬──────────────┬──────────────┬──────────────┐
/// │ Tag (3B) │ Op(1B) │ Address      │ Blocks       │ Arg          │
/// │ "cmd"    │        │ (4B BE)      │ (4B BE)      │ (4B BE)      │
/// └──────────┴────────┴──────────────┴──────────────┴──────────────┘
/// ```
pub fn encode_command(cmd: &Command, dst: &mut BytesMut) {
    dst.reserve(COMMAND_SIZE);
    dst.put_slice(&COMMAND_TAG);
    dst.put_u8(cmd.op.as_byte());
    dst.put_u32(cmd.address);
    dst.put_u32(cmd.length / BLOCK_SIZE);
    dst.put_u32(cmd.arg);
}

/// True if `reply` starts with the TEST acknowledgement.
pub fn is_test_reply(reply: &[u8]) -> bool {
    reply.len() >= TEST_REPLY.len() && reply[..TEST_REPLY.len()] == TEST_REPLY
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_command_layout() {
        let bytes = Command::new(Opcode::Write)
            .address(0x1000_0000)
            .length(0x0010_0000)
            .to_bytes();

        assert_eq!(bytes.len(), COMMAND_SIZE);
        assert_eq!(&bytes[..4], b"cmdW");
        assert_eq!(&bytes[4..8], &[0x10, 0x00, 0x00, 0x00]);
        // 1 MiB is 2048 blocks of 512.
        assert_eq!(&bytes[8..12], &[0x00, 0x00, 0x08, 0x00]);
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
    }

    #[test]
    fn defaults_are_zero() {
        let bytes = Command::new(Opcode::Test).to_bytes();
        assert_eq!(&bytes[..4], b"cmdt");
        assert!(bytes[4..].iter().all(|b| *b == 0));
    }

    #[test]
    fn start_carries_argument() {
        let bytes = Command::new(Opcode::Start).arg(1).to_bytes();
        assert_eq!(&bytes[..4], b"cmds");
        assert_eq!(&bytes[12..16], &[0, 0, 0, 1]);
    }

    #[test]
    fn fill_region_block_count() {
        let bytes = Command::new(Opcode::Fill)
            .address(0x1000_0000)
            .length(0x0010_1000)
            .to_bytes();
        assert_eq!(&bytes[..4], b"cmdc");
        assert_eq!(u32::from_be_bytes(bytes[8..12].try_into().unwrap()), 0x808);
    }

    #[test]
    fn unaligned_length_truncates() {
        let bytes = Command::new(Opcode::Read).length(1023).to_bytes();
        assert_eq!(u32::from_be_bytes(bytes[8..12].try_into().unwrap()), 1);
    }

    #[test]
    fn opcode_bytes() {
        let ops = [
            (Opcode::Test, b't'),
            (Opcode::Start, b's'),
            (Opcode::Write, b'W'),
            (Opcode::Read, b'R'),
            (Opcode::Fill, b'c'),
            (Opcode::RamRead, b'r'),
            (Opcode::FpgaWrite, b'f'),
        ];
        for (op, byte) in ops {
            assert_eq!(op.as_byte(), byte);
        }
    }

    #[test]
    fn encode_appends_same_bytes_as_to_bytes() {
        let cmd = Command::new(Opcode::RamRead)
            .address(0xDEAD_BEEF)
            .length(4096)
            .arg(0x0102_0304);
        let mut buf = BytesMut::from(&b"xx"[..]);
        encode_command(&cmd, &mut buf);

        assert_eq!(buf.len(), 2 + COMMAND_SIZE);
        assert_eq!(&buf[2..], &cmd.to_bytes());
    }

    #[test]
    fn recognizes_test_reply() {
        assert!(is_test_reply(b"cmdr"));
        assert!(is_test_reply(b"cmdr\x00\x00 trailing"));
        assert!(!is_test_reply(b"cmd"));
        assert!(!is_test_reply(b"cmdt"));
        assert!(!is_test_reply(b""));
    }
}
