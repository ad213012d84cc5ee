use cartlink_frame::command::TEST_REPLY;
use cartlink_frame::{is_test_reply, Command, Opcode};
use cartlink_transport::{
    available_ports, Result as TransportResult, SerialConfig, SerialTransport, Transport,
    TransportError,
};
use tracing::{debug, info};

use crate::error::{Result, SessionError};
use crate::upload::{send_command, upload_image, UploadProgress, UploadReport};

/// Largest TEST reply the device sends.
const PROBE_REPLY_MAX: usize = 512;

/// What every supported flashcart can do beyond moving bytes.
pub trait Flashcart: Transport {
    /// Human-readable identity, e.g. `Everdrive 64 on /dev/ttyUSB0`.
    fn identify(&self) -> String;

    /// Upload `image` and start executing it.
    fn boot_rom(
        &mut self,
        image: &[u8],
        progress: &mut dyn FnMut(&UploadProgress),
    ) -> Result<UploadReport>;
}

/// Known flashcart families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    #[default]
    Everdrive64,
}

impl DeviceKind {
    /// Every kind discovery tries, in order.
    pub const ALL: &'static [DeviceKind] = &[DeviceKind::Everdrive64];

    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Everdrive64 => "Everdrive 64",
        }
    }

    /// Ask whatever is on the other end of `transport` whether it is this kind.
    ///
    /// A timeout counts as "no"; other transport errors are returned.
    pub fn identifies<T: Transport + ?Sized>(self, transport: &mut T) -> Result<bool> {
        match self {
            DeviceKind::Everdrive64 => {
                send_command(transport, Command::new(Opcode::Test))?;
                match read_reply(transport) {
                    Ok(reply) => Ok(is_test_reply(&reply)),
                    Err(TransportError::Timeout(_)) => Ok(false),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    /// Wrap an opened transport as a device of this kind.
    pub fn bind(self, transport: SerialTransport) -> Device {
        match self {
            DeviceKind::Everdrive64 => Device::Everdrive64(transport),
        }
    }
}

fn read_reply<T: Transport + ?Sized>(transport: &mut T) -> TransportResult<Vec<u8>> {
    let mut reply = vec![0u8; PROBE_REPLY_MAX];
    let mut got = 0usize;
    while got < TEST_REPLY.len() {
        let n = transport.read(&mut reply[got..])?;
        if n == 0 {
            break;
        }
        got += n;
    }
    reply.truncate(got);
    Ok(reply)
}

/// An identified flashcart bound to its transport.
#[derive(Debug)]
pub enum Device {
    Everdrive64(SerialTransport),
}

impl Device {
    pub fn kind(&self) -> DeviceKind {
        match self {
            Device::Everdrive64(_) => DeviceKind::Everdrive64,
        }
    }

    fn transport(&self) -> &SerialTransport {
        match self {
            Device::Everdrive64(transport) => transport,
        }
    }

    fn transport_mut(&mut self) -> &mut SerialTransport {
        match self {
            Device::Everdrive64(transport) => transport,
        }
    }
}

impl Transport for Device {
    fn reset(&mut self) -> TransportResult<()> {
        self.transport_mut().reset()
    }

    fn wait(&mut self) -> TransportResult<usize> {
        self.transport_mut().wait()
    }

    fn read(&mut self, buf: &mut [u8]) -> TransportResult<usize> {
        self.transport_mut().read(buf)
    }

    fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        self.transport_mut().write(data)
    }

    fn describe(&self) -> String {
        self.transport().describe()
    }
}

impl Flashcart for Device {
    fn identify(&self) -> String {
        format!("{} on {}", self.kind().name(), self.transport().name())
    }

    fn boot_rom(
        &mut self,
        image: &[u8],
        progress: &mut dyn FnMut(&UploadProgress),
    ) -> Result<UploadReport> {
        match self {
            Device::Everdrive64(transport) => upload_image(transport, image, progress),
        }
    }
}

/// Probe one port against every known kind.
///
/// Each kind gets a fresh short-timeout handle. The handle that identifies
/// is switched to the session timeout and kept.
pub fn probe(port: &str, config: &SerialConfig) -> Result<Option<Device>> {
    for kind in DeviceKind::ALL {
        let mut transport = SerialTransport::open_for_probe(port, config)?;
        if kind.identifies(&mut transport)? {
            transport.set_timeout(config.timeout)?;
            return Ok(Some(kind.bind(transport)));
        }
        debug!(port, kind = kind.name(), "not identified");
    }
    Ok(None)
}

/// Probe exactly one named port.
pub fn open_port(port: &str, config: &SerialConfig) -> Result<Device> {
    probe(port, config)?.ok_or_else(|| SessionError::NotIdentified {
        port: port.to_string(),
    })
}

/// Bind `port` as `kind` without writing anything to it.
///
/// A program already running on the cart streams packets and never answers
/// TEST, so identifying it would fail and eat part of its output.
pub fn attach_port(port: &str, kind: DeviceKind, config: &SerialConfig) -> Result<Device> {
    let transport = SerialTransport::open(port, config)?;
    info!(port, kind = kind.name(), "attached without identifying");
    Ok(kind.bind(transport))
}

/// Find the first local port that identifies as a known flashcart.
///
/// Failures on individual candidates are logged and skipped.
pub fn discover(config: &SerialConfig) -> Result<Device> {
    for port in available_ports()? {
        match probe(&port.name, config) {
            Ok(Some(device)) => {
                info!(port = %port.name, kind = device.kind().name(), "device found");
                return Ok(device);
            }
            Ok(None) => debug!(port = %port.name, "no flashcart on port"),
            Err(err) => debug!(port = %port.name, error = %err, "probe failed, skipping"),
        }
    }
    Err(SessionError::NoDevice)
}
