//! In-memory transports for exercising sessions without hardware.

use std::collections::VecDeque;

use bytes::BytesMut;
use cartlink_frame::encode_packet;
use cartlink_transport::{Result, Transport, TransportError};

/// Serves scripted input chunks and records every write.
#[derive(Debug, Default)]
pub(crate) struct MockTransport {
    pub input: VecDeque<Vec<u8>>,
    pub writes: Vec<Vec<u8>>,
    pub resets: usize,
    pub fail_write_at: Option<usize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(chunks: Vec<Vec<u8>>) -> Self {
        Self {
            input: chunks.into(),
            ..Self::default()
        }
    }

    /// Input consisting of the given packets, delivered as one chunk each.
    pub fn with_packets(packets: &[(u8, &[u8])]) -> Self {
        let chunks = packets
            .iter()
            .map(|(kind, payload)| {
                let mut buf = BytesMut::new();
                encode_packet(*kind, payload, &mut buf).unwrap();
                buf.to_vec()
            })
            .collect();
        Self::with_input(chunks)
    }

    pub fn push_input(&mut self, bytes: &[u8]) {
        self.input.push_back(bytes.to_vec());
    }
}

impl Transport for MockTransport {
    fn reset(&mut self) -> Result<()> {
        self.resets += 1;
        Ok(())
    }

    fn wait(&mut self) -> Result<usize> {
        self.input
            .front()
            .map(Vec::len)
            .ok_or(TransportError::Closed)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(chunk) = self.input.front_mut() else {
            return Err(TransportError::Closed);
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.input.pop_front();
        }
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.fail_write_at == Some(self.writes.len()) {
            return Err(TransportError::Closed);
        }
        self.writes.push(data.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
