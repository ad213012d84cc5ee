use cartlink_session::{probe, Flashcart};
use cartlink_transport::{available_ports, PortInfo};
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use tracing::debug;

use crate::cmd::{PortsArgs, SerialArgs};
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_event, Event, OutputFormat};

struct PortRow {
    info: PortInfo,
    device: Option<String>,
}

pub fn run(args: PortsArgs, serial: &SerialArgs, format: OutputFormat) -> CliResult<i32> {
    let config = serial.to_config()?;
    let ports = available_ports().map_err(|err| transport_error("enumeration failed", err))?;

    let rows: Vec<PortRow> = ports
        .into_iter()
        .map(|info| {
            let device = if args.probe {
                match probe(&info.name, &config) {
                    Ok(found) => found.map(|device| device.identify()),
                    Err(err) => {
                        debug!(port = %info.name, error = %err, "probe failed");
                        None
                    }
                }
            } else {
                None
            };
            PortRow { info, device }
        })
        .collect();

    print_ports(&rows, args.probe, format);
    Ok(SUCCESS)
}

fn print_ports(rows: &[PortRow], probed: bool, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for row in rows {
                print_event(&Event::Port {
                    name: &row.info.name,
                    description: &row.info.description,
                    device: row.device.as_deref(),
                });
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            let mut header = vec!["PORT", "DESCRIPTION"];
            if probed {
                header.push("DEVICE");
            }
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(header);
            for row in rows {
                let mut cells = vec![row.info.name.clone(), row.info.description.clone()];
                if probed {
                    cells.push(row.device.clone().unwrap_or_else(|| "-".to_string()));
                }
                table.add_row(cells);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for row in rows {
                match &row.device {
                    Some(device) => {
                        println!("{} ({}) -> {}", row.info.name, row.info.description, device)
                    }
                    None => println!("{} ({})", row.info.name, row.info.description),
                }
            }
        }
        OutputFormat::Raw => {
            for row in rows {
                println!("{}", row.info.name);
            }
        }
    }
}
