use std::fs::{File, OpenOptions};
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use cartlink_frame::kind::kind_name;
use cartlink_frame::Packet;
use cartlink_session::{DoneReason, ListenObserver, ListenOutcome, UploadProgress, UploadReport};
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tracing::warn;

use crate::exit::{io_error, CliResult};

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Raw
        }
    }
}

/// One line of `--format json` output.
#[derive(Serialize, Debug)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event<'a> {
    Device {
        identity: &'a str,
    },
    Progress {
        sent: usize,
        total: usize,
        percent: f64,
    },
    Uploaded {
        image_size: usize,
        padded_size: usize,
        filled: bool,
        elapsed_ms: u128,
    },
    Text {
        device: &'a str,
        text: &'a str,
        timestamp: String,
    },
    Packet {
        device: &'a str,
        kind: u8,
        kind_name: &'a str,
        payload_size: usize,
        payload: String,
        timestamp: String,
    },
    Finished {
        outcome: &'a str,
    },
    Port {
        name: &'a str,
        description: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        device: Option<&'a str>,
    },
}

pub fn print_event(event: &Event<'_>) {
    println!(
        "{}",
        serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Identity of the bound device. Status lines go to stderr so stdout carries
/// only device output.
pub fn print_device(identity: &str, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_event(&Event::Device { identity }),
        _ => eprintln!("{identity}"),
    }
}

pub fn print_progress(progress: &UploadProgress, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_event(&Event::Progress {
            sent: progress.sent,
            total: progress.total,
            percent: progress.percent(),
        }),
        _ => eprintln!("Uploaded {:.2}%", progress.percent()),
    }
}

pub fn print_upload(report: &UploadReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_event(&Event::Uploaded {
            image_size: report.image_size,
            padded_size: report.padded_size,
            filled: report.filled,
            elapsed_ms: report.elapsed.as_millis(),
        }),
        _ => eprintln!(
            "Upload took {:.3} seconds (0x{:X} bytes)",
            report.elapsed.as_secs_f64(),
            report.padded_size
        ),
    }
}

pub fn outcome_name(outcome: ListenOutcome) -> &'static str {
    match outcome {
        ListenOutcome::Done(DoneReason::Marker) => "done",
        ListenOutcome::Done(DoneReason::PowerOff) => "powered_off",
        ListenOutcome::Aborted => "aborted",
    }
}

pub fn print_outcome(outcome: ListenOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_event(&Event::Finished {
            outcome: outcome_name(outcome),
        }),
        _ => eprintln!("\n{}", outcome_name(outcome)),
    }
}

/// Prints device output as it arrives and optionally tees TEXT to a file.
///
/// The file is truncated on open so it only ever holds the current run.
pub struct TerminalObserver {
    format: OutputFormat,
    device: String,
    log: Option<File>,
}

impl TerminalObserver {
    pub fn new(format: OutputFormat, device: &str, log_path: Option<&Path>) -> CliResult<Self> {
        let log = match log_path {
            Some(path) => Some(
                OpenOptions::new()
                    .create(true)
                    .write(true)
                    .truncate(true)
                    .open(path)
                    .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
            ),
            None => None,
        };
        Ok(Self {
            format,
            device: device.to_string(),
            log,
        })
    }

    fn tee(&mut self, text: &str) {
        let Some(log) = &mut self.log else {
            return;
        };
        if let Err(err) = log.write_all(text.as_bytes()).and_then(|()| log.flush()) {
            warn!(error = %err, "log file write failed, no longer capturing");
            self.log = None;
        }
    }
}

impl ListenObserver for TerminalObserver {
    fn on_text(&mut self, text: &str) {
        match self.format {
            OutputFormat::Json => print_event(&Event::Text {
                device: &self.device,
                text,
                timestamp: now_unix_seconds(),
            }),
            _ => print_raw(text.as_bytes()),
        }
        self.tee(text);
    }

    fn on_unclassified(&mut self, packet: &Packet) {
        let payload = packet.payload.as_ref();
        match self.format {
            OutputFormat::Json => print_event(&Event::Packet {
                device: &self.device,
                kind: packet.kind,
                kind_name: kind_name(packet.kind),
                payload_size: payload.len(),
                payload: payload_preview(payload),
                timestamp: now_unix_seconds(),
            }),
            OutputFormat::Table => {
                let mut table = Table::new();
                table
                    .load_preset(UTF8_FULL)
                    .set_content_arrangement(ContentArrangement::Dynamic)
                    .set_header(vec!["TYPE", "SIZE", "PAYLOAD"])
                    .add_row(vec![
                        format!("0x{:02X} ({})", packet.kind, kind_name(packet.kind)),
                        payload.len().to_string(),
                        payload_preview(payload),
                    ]);
                println!("\n{table}");
            }
            OutputFormat::Pretty => {
                println!("\n{} payload={}", packet_summary(packet), payload_preview(payload));
            }
            // Stdout stays TEXT only so a pipe carries the device log unchanged.
            OutputFormat::Raw => eprintln!("{}", packet_summary(packet)),
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn packet_summary(packet: &Packet) -> String {
    format!(
        "packet type=0x{:02X} ({}) size={}",
        packet.kind,
        kind_name(packet.kind),
        packet.payload.len()
    )
}

fn payload_preview(payload: &[u8]) -> String {
    match std::str::from_utf8(payload) {
        Ok(text) => text.to_string(),
        Err(_) => format!("{payload:02x?}"),
    }
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
