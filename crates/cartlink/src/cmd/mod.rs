use std::path::PathBuf;
use std::time::Duration;

use cartlink_session::{attach_port, discover, open_port, CancelToken, Device, DeviceKind};
use cartlink_transport::SerialConfig;
use clap::{Args, Subcommand};
use tracing::debug;

use crate::exit::{session_error, CliError, CliResult, INTERNAL, INTERRUPTED, USAGE};
use crate::output::OutputFormat;

pub mod boot;
pub mod listen;
pub mod ports;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload an image, boot it, and optionally follow its output.
    Boot(BootArgs),
    /// Attach to a running device and print its output.
    Listen(ListenArgs),
    /// List serial ports and probe them for flashcarts.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, serial: &SerialArgs, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Boot(args) => boot::run(args, serial, format),
        Command::Listen(args) => listen::run(args, serial, format),
        Command::Ports(args) => ports::run(args, serial, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial settings shared by every command that talks to a device.
#[derive(Args, Debug, Clone)]
pub struct SerialArgs {
    /// Serial port to use instead of probing every port.
    #[arg(long, value_name = "PATH", env = "CARTLINK_PORT", global = true)]
    pub port: Option<String>,
    /// Line rate.
    #[arg(long, default_value = "9600", global = true)]
    pub baud: u32,
    /// Read/write timeout once connected (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s", global = true)]
    pub timeout: String,
    /// Give up when the device sends nothing for this long. Default: wait forever.
    #[arg(long, value_name = "DURATION", global = true)]
    pub idle_timeout: Option<String>,
}

impl SerialArgs {
    pub fn to_config(&self) -> CliResult<SerialConfig> {
        let mut config = SerialConfig {
            baud_rate: self.baud,
            timeout: parse_duration(&self.timeout)?,
            ..SerialConfig::default()
        };
        if let Some(idle) = &self.idle_timeout {
            config.wait_timeout = Some(parse_duration(idle)?);
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
pub struct BootArgs {
    /// Image file to upload (e.g. a .z64 ROM).
    pub rom: PathBuf,
    /// Stay attached after booting and print device output.
    #[arg(long)]
    pub keep_alive: bool,
    /// Also append device text output to this file, byte for byte.
    #[arg(long, value_name = "PATH", requires = "keep_alive")]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Also append device text output to this file, byte for byte.
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PortsArgs {
    /// Probe each port for a known flashcart.
    #[arg(long)]
    pub probe: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open the device named by `--port`, or the first one discovery finds.
pub fn connect(serial: &SerialArgs) -> CliResult<Device> {
    let config = serial.to_config()?;
    match &serial.port {
        Some(port) => open_port(port, &config).map_err(|err| session_error("connect failed", err)),
        None => discover(&config).map_err(|err| session_error("discovery failed", err)),
    }
}

/// Open the port named by `--port` without identifying what is on it.
///
/// Discovery cannot find a cart whose program is already running, so a port
/// is required.
pub fn attach(serial: &SerialArgs) -> CliResult<Device> {
    let config = serial.to_config()?;
    let port = serial.port.as_deref().ok_or_else(|| {
        CliError::new(
            USAGE,
            "listen needs --port (or CARTLINK_PORT): a running program cannot be discovered",
        )
    })?;
    attach_port(port, DeviceKind::default(), &config)
        .map_err(|err| session_error("attach failed", err))
}

/// First Ctrl-C cancels between packets; a second one exits at once, since a
/// silent device can keep `wait` blocked indefinitely.
pub fn install_ctrlc_handler(cancel: CancelToken) -> CliResult<()> {
    let mut presses = 0u32;
    ctrlc::set_handler(move || {
        presses += 1;
        if presses == 1 {
            debug!("cancellation requested");
            cancel.cancel();
        } else {
            eprintln!("interrupted");
            std::process::exit(INTERRUPTED);
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
