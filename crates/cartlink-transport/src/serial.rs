use std::io::{ErrorKind, Read, Write};
use std::thread;
use std::time::{Duration, Instant};

use serialport::{ClearBuffer, FlowControl, SerialPort, SerialPortType};
use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// Serial line settings shared by probing and bound sessions.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Line rate. USB CDC devices ignore it, but the OS still wants one.
    pub baud_rate: u32,
    /// Read/write timeout once a session is bound.
    pub timeout: Duration,
    /// Read/write timeout while probing candidate ports.
    pub probe_timeout: Duration,
    /// Upper bound on `wait()`. `None` waits indefinitely.
    pub wait_timeout: Option<Duration>,
    /// Sleep between polls of the pending-input counter.
    pub poll_interval: Duration,
    /// Use RTS/CTS flow control.
    pub hardware_flow_control: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            timeout: Duration::from_secs(5),
            probe_timeout: Duration::from_secs(1),
            wait_timeout: None,
            poll_interval: Duration::from_millis(1),
            hardware_flow_control: true,
        }
    }
}

/// A candidate port reported by the operating system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub description: String,
}

/// List the serial ports the operating system currently knows about.
pub fn available_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|port| PortInfo {
            description: describe_port_type(&port.port_type),
            name: port.port_name,
        })
        .collect())
}

fn describe_port_type(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut out = format!("usb {:04x}:{:04x}", usb.vid, usb.pid);
            if let Some(product) = &usb.product {
                out.push(' ');
                out.push_str(product);
            } else if let Some(manufacturer) = &usb.manufacturer {
                out.push(' ');
                out.push_str(manufacturer);
            }
            out
        }
        SerialPortType::PciPort => "pci".to_string(),
        SerialPortType::BluetoothPort => "bluetooth".to_string(),
        SerialPortType::Unknown => "unknown".to_string(),
    }
}

/// Serial-port transport backed by the `serialport` crate.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
    config: SerialConfig,
    timeout: Duration,
}

impl SerialTransport {
    /// Open `path` with the session timeout from `config`.
    pub fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        Self::open_with_timeout(path, config, config.timeout)
    }

    /// Open `path` with the shorter probe timeout from `config`.
    pub fn open_for_probe(path: &str, config: &SerialConfig) -> Result<Self> {
        Self::open_with_timeout(path, config, config.probe_timeout)
    }

    fn open_with_timeout(path: &str, config: &SerialConfig, timeout: Duration) -> Result<Self> {
        let flow = if config.hardware_flow_control {
            FlowControl::Hardware
        } else {
            FlowControl::None
        };

        let port = serialport::new(path, config.baud_rate)
            .timeout(timeout)
            .flow_control(flow)
            .open()
            .map_err(|source| TransportError::Open {
                port: path.to_string(),
                source,
            })?;

        debug!(port = path, baud = config.baud_rate, ?timeout, "opened serial port");
        Ok(Self {
            port,
            name: path.to_string(),
            config: config.clone(),
            timeout,
        })
    }

    /// Path the port was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Change the read/write timeout of the open port.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<()> {
        self.port.set_timeout(timeout)?;
        self.timeout = timeout;
        Ok(())
    }

    fn map_io(&self, err: std::io::Error) -> TransportError {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => TransportError::Timeout(self.timeout),
            ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof | ErrorKind::NotConnected => {
                TransportError::Closed
            }
            _ => TransportError::Io(err),
        }
    }
}

impl Transport for SerialTransport {
    fn reset(&mut self) -> Result<()> {
        self.port.clear(ClearBuffer::All)?;
        Ok(())
    }

    fn wait(&mut self) -> Result<usize> {
        let start = Instant::now();
        loop {
            let pending = self.port.bytes_to_read()? as usize;
            if pending > 0 {
                trace!(pending, "input ready");
                return Ok(pending);
            }
            if let Some(limit) = self.config.wait_timeout {
                if start.elapsed() >= limit {
                    return Err(TransportError::Timeout(limit));
                }
            }
            thread::sleep(self.config.poll_interval);
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        loop {
            match self.port.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(self.map_io(err)),
            }
        }
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        self.port.write_all(data).map_err(|err| self.map_io(err))?;
        self.port.flush().map_err(|err| self.map_io(err))
    }

    fn describe(&self) -> String {
        self.name.clone()
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .finish()
    }
}
