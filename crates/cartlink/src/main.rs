mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::{Command, SerialArgs};
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "cartlink", version, about = "Flashcart upload and runtime log client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "warn", global = true)]
    log_level: LogLevel,

    #[command(flatten)]
    serial: SerialArgs,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, &cli.serial, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_boot_subcommand() {
        let cli = Cli::try_parse_from([
            "cartlink",
            "boot",
            "game.z64",
            "--keep-alive",
            "--log-file",
            "results.txt",
        ])
        .expect("boot args should parse");

        match cli.command {
            Command::Boot(args) => {
                assert_eq!(args.rom.to_str(), Some("game.z64"));
                assert!(args.keep_alive);
                assert!(args.log_file.is_some());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn log_file_requires_keep_alive() {
        let err = Cli::try_parse_from(["cartlink", "boot", "game.z64", "--log-file", "out.txt"])
            .expect_err("log file without keep-alive should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn serial_overrides_are_global() {
        let cli = Cli::try_parse_from([
            "cartlink",
            "listen",
            "--port",
            "/dev/ttyUSB1",
            "--baud",
            "115200",
            "--idle-timeout",
            "30s",
        ])
        .expect("listen args should parse");

        assert!(matches!(cli.command, Command::Listen(_)));
        assert_eq!(cli.serial.port.as_deref(), Some("/dev/ttyUSB1"));
        assert_eq!(cli.serial.baud, 115_200);
        assert_eq!(cli.serial.idle_timeout.as_deref(), Some("30s"));
    }

    #[test]
    fn parses_ports_with_format() {
        let cli = Cli::try_parse_from(["cartlink", "ports", "--probe", "--format", "json"])
            .expect("ports args should parse");

        assert!(matches!(cli.command, Command::Ports(ref args) if args.probe));
        assert_eq!(cli.format, Some(OutputFormat::Json));
    }

    #[test]
    fn boot_requires_rom() {
        let err = Cli::try_parse_from(["cartlink", "boot"]).expect_err("rom is required");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }
}
