use std::time::{Duration, Instant};

use bytes::BytesMut;
use cartlink_frame::{encode_command, Command, Opcode, BLOCK_SIZE};
use cartlink_transport::Transport;
use tracing::{debug, info};

use crate::error::{Result, SessionError};

/// Cartridge-space address images are written to.
pub const ROM_BASE: u32 = 0x1000_0000;

/// Region cleared before writing an image smaller than it.
pub const FILL_REGION: u32 = 0x0010_1000;

/// Largest single write while streaming the image.
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Zero block sent after START. Reserved for metadata such as the image name.
pub const TERMINATOR_SIZE: usize = 256;

/// Snapshot reported after each streamed chunk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    pub sent: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl UploadProgress {
    /// Share of the padded image transferred so far, 0 to 100.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.sent as f64 / self.total as f64 * 100.0
    }
}

/// Summary of a finished upload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadReport {
    pub image_size: usize,
    pub padded_size: usize,
    /// Whether the target region was cleared first.
    pub filled: bool,
    /// Time spent streaming the image itself.
    pub elapsed: Duration,
}

/// Pad `raw` with zeros up to the next multiple of the 512-byte block size.
pub fn pad_image(raw: &[u8]) -> BytesMut {
    let block = BLOCK_SIZE as usize;
    let padded = raw.len().div_ceil(block) * block;
    let mut buf = BytesMut::with_capacity(padded);
    buf.extend_from_slice(raw);
    buf.resize(padded, 0);
    buf
}

/// Upload `raw` to the device and start it.
///
/// Sequence: optional FILL of the whole region, WRITE, the image in chunks
/// of at most 1 MiB, START with argument 1, then the 256-byte terminator.
/// Any transport failure aborts the upload; there is no resume.
pub fn upload_image<T: Transport + ?Sized>(
    transport: &mut T,
    raw: &[u8],
    progress: &mut dyn FnMut(&UploadProgress),
) -> Result<UploadReport> {
    let image = pad_image(raw);
    let size = u32::try_from(image.len()).map_err(|_| SessionError::ImageTooLarge {
        size: image.len(),
        max: u32::MAX as usize,
    })?;

    info!(size, "uploading image (0x{size:X} bytes)");

    let filled = size < FILL_REGION;
    if filled {
        send_command(
            transport,
            Command::new(Opcode::Fill)
                .address(ROM_BASE)
                .length(FILL_REGION),
        )?;
    }
    send_command(
        transport,
        Command::new(Opcode::Write).address(ROM_BASE).length(size),
    )?;

    let started = Instant::now();
    let mut sent = 0usize;
    for chunk in image.chunks(CHUNK_SIZE) {
        transport.write(chunk)?;
        sent += chunk.len();
        let snapshot = UploadProgress {
            sent,
            total: image.len(),
            elapsed: started.elapsed(),
        };
        debug!(sent, percent = snapshot.percent(), "chunk written");
        progress(&snapshot);
    }
    let elapsed = started.elapsed();
    info!(?elapsed, "upload finished");

    info!("booting image");
    send_command(transport, Command::new(Opcode::Start).arg(1))?;
    transport.write(&[0u8; TERMINATOR_SIZE])?;

    Ok(UploadReport {
        image_size: raw.len(),
        padded_size: image.len(),
        filled,
        elapsed,
    })
}

pub(crate) fn send_command<T: Transport + ?Sized>(transport: &mut T, cmd: Command) -> Result<()> {
    let mut buf = BytesMut::new();
    encode_command(&cmd, &mut buf);
    debug!(op = ?cmd.op, address = cmd.address, length = cmd.length, arg = cmd.arg, "command");
    transport.write(&buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use cartlink_transport::TransportError;

    use super::*;
    use crate::mock::MockTransport;

    fn no_progress() -> impl FnMut(&UploadProgress) {
        |_| {}
    }

    #[test]
    fn pads_to_block_multiple() {
        let padded = pad_image(&[0xFF; 10]);
        assert_eq!(padded.len(), 512);
        assert!(padded[..10].iter().all(|b| *b == 0xFF));
        assert!(padded[10..].iter().all(|b| *b == 0));
        assert_eq!(padded[10..].len(), 502);
    }

    #[test]
    fn aligned_image_is_not_padded() {
        assert_eq!(pad_image(&[1; 1024]).len(), 1024);
        assert_eq!(pad_image(&[]).len(), 0);
        assert_eq!(pad_image(&[1; 513]).len(), 1024);
    }

    #[test]
    fn small_image_sequence() {
        let mut transport = MockTransport::new();
        let image = vec![0xAB; 0x100];

        let report = upload_image(&mut transport, &image, &mut no_progress()).unwrap();

        assert_eq!(transport.writes.len(), 5);
        assert_eq!(
            transport.writes[0],
            Command::new(Opcode::Fill)
                .address(ROM_BASE)
                .length(FILL_REGION)
                .to_bytes()
        );
        assert_eq!(
            transport.writes[1],
            Command::new(Opcode::Write)
                .address(ROM_BASE)
                .length(512)
                .to_bytes()
        );
        assert_eq!(transport.writes[2].len(), 512);
        assert_eq!(&transport.writes[2][..0x100], image.as_slice());
        assert!(transport.writes[2][0x100..].iter().all(|b| *b == 0));
        assert_eq!(
            transport.writes[3],
            Command::new(Opcode::Start).arg(1).to_bytes()
        );
        assert_eq!(transport.writes[4], vec![0u8; TERMINATOR_SIZE]);

        assert_eq!(report.image_size, 0x100);
        assert_eq!(report.padded_size, 512);
        assert!(report.filled);
    }

    #[test]
    fn large_image_skips_fill_and_chunks() {
        let mut transport = MockTransport::new();
        let image = vec![0x11; 2 * CHUNK_SIZE + 100];
        let mut reports = Vec::new();

        let report = upload_image(&mut transport, &image, &mut |p: &UploadProgress| {
            reports.push(*p)
        })
        .unwrap();

        let padded = 2 * CHUNK_SIZE + 512;
        assert!(!report.filled);
        assert_eq!(report.padded_size, padded);
        assert_eq!(&transport.writes[0][..4], b"cmdW");
        assert_eq!(
            u32::from_be_bytes(transport.writes[0][8..12].try_into().unwrap()),
            (padded / 512) as u32
        );

        let chunk_lens: Vec<usize> = transport.writes[1..4].iter().map(Vec::len).collect();
        assert_eq!(chunk_lens, vec![CHUNK_SIZE, CHUNK_SIZE, 512]);
        assert_eq!(&transport.writes[4][..4], b"cmds");
        assert_eq!(transport.writes.len(), 6);

        let sent: Vec<usize> = reports.iter().map(|p| p.sent).collect();
        assert_eq!(sent, vec![CHUNK_SIZE, 2 * CHUNK_SIZE, padded]);
        assert!((reports[2].percent() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn image_exactly_fill_region_skips_fill() {
        let mut transport = MockTransport::new();
        let image = vec![0u8; FILL_REGION as usize];

        let report = upload_image(&mut transport, &image, &mut no_progress()).unwrap();

        assert!(!report.filled);
        assert_eq!(&transport.writes[0][..4], b"cmdW");
    }

    #[test]
    fn upload_never_reads() {
        let mut transport = MockTransport::with_input(vec![b"unread".to_vec()]);
        upload_image(&mut transport, &[1, 2, 3], &mut no_progress()).unwrap();
        assert_eq!(transport.input.len(), 1);
    }

    #[test]
    fn write_failure_aborts_upload() {
        let mut transport = MockTransport {
            fail_write_at: Some(2),
            ..MockTransport::new()
        };

        let err = upload_image(&mut transport, &[0u8; 16], &mut no_progress()).unwrap_err();

        assert!(matches!(
            err,
            SessionError::Transport(TransportError::Closed)
        ));
        assert_eq!(transport.writes.len(), 2);
    }

    #[test]
    fn progress_percent() {
        let half = UploadProgress {
            sent: 256,
            total: 512,
            elapsed: Duration::ZERO,
        };
        assert!((half.percent() - 50.0).abs() < f64::EPSILON);

        let empty = UploadProgress {
            sent: 0,
            total: 0,
            elapsed: Duration::ZERO,
        };
        assert!((empty.percent() - 100.0).abs() < f64::EPSILON);
    }
}
