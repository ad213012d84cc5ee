use std::fmt;
use std::io;

use cartlink_frame::FrameError;
use cartlink_session::SessionError;
use cartlink_transport::TransportError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const TRANSPORT_ERROR: i32 = 3;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;
pub const INTERRUPTED: i32 = 130;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

fn io_kind_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound | io::ErrorKind::BrokenPipe => FAILURE,
        _ => INTERNAL,
    }
}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    CliError::new(io_kind_code(err.kind()), format!("{context}: {err}"))
}

fn serial_code(err: &serialport::Error) -> i32 {
    match err.kind() {
        serialport::ErrorKind::NoDevice => FAILURE,
        serialport::ErrorKind::Io(kind) => io_kind_code(kind),
        _ => TRANSPORT_ERROR,
    }
}

pub fn transport_error(context: &str, err: TransportError) -> CliError {
    let code = match &err {
        TransportError::Open { source, .. } | TransportError::Serial(source) => serial_code(source),
        TransportError::Enumerate(_) => TRANSPORT_ERROR,
        TransportError::Io(source) => io_kind_code(source.kind()),
        TransportError::Timeout(_) => TIMEOUT,
        TransportError::Closed => FAILURE,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Transport(err) => transport_error(context, err),
        FrameError::BadLeadingMarker { .. }
        | FrameError::BadTrailingMarker { .. }
        | FrameError::PayloadTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}

pub fn session_error(context: &str, err: SessionError) -> CliError {
    match err {
        SessionError::Transport(err) => transport_error(context, err),
        SessionError::Frame(err) => frame_error(context, err),
        SessionError::ImageTooLarge { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
        SessionError::NoDevice | SessionError::NotIdentified { .. } => {
            CliError::new(FAILURE, format!("{context}: {err}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn framing_violations_are_data_invalid() {
        let err = session_error(
            "listen failed",
            SessionError::Frame(FrameError::BadLeadingMarker { found: *b"JUNK" }),
        );
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.starts_with("listen failed: "));
    }

    #[test]
    fn transport_timeouts_map_to_timeout() {
        let err = session_error(
            "listen failed",
            SessionError::Frame(FrameError::Transport(TransportError::Timeout(
                Duration::from_secs(5),
            ))),
        );
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn permission_denied_is_reported() {
        let err = transport_error(
            "connect failed",
            TransportError::Io(io::Error::from(io::ErrorKind::PermissionDenied)),
        );
        assert_eq!(err.code, PERMISSION_DENIED);
    }

    #[test]
    fn serial_open_failures_use_driver_kind() {
        let err = transport_error(
            "connect failed",
            TransportError::Open {
                port: "/dev/ttyUSB9".to_string(),
                source: serialport::Error::new(serialport::ErrorKind::NoDevice, "gone"),
            },
        );
        assert_eq!(err.code, FAILURE);
        assert!(err.message.contains("/dev/ttyUSB9"));
    }

    #[test]
    fn missing_device_is_failure() {
        assert_eq!(session_error("x", SessionError::NoDevice).code, FAILURE);
    }
}
