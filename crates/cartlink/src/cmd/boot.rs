use std::fs;

use cartlink_session::{CancelToken, Session, UploadProgress};
use tracing::info;

use crate::cmd::{connect, install_ctrlc_handler, BootArgs, SerialArgs};
use crate::exit::{io_error, session_error, CliResult, SUCCESS};
use crate::output::{
    print_device, print_outcome, print_progress, print_upload, OutputFormat, TerminalObserver,
};

pub fn run(args: BootArgs, serial: &SerialArgs, format: OutputFormat) -> CliResult<i32> {
    let image = fs::read(&args.rom)
        .map_err(|err| io_error(&format!("failed reading {}", args.rom.display()), err))?;
    info!(path = %args.rom.display(), size = image.len(), "loaded image");

    let cancel = CancelToken::new();
    if args.keep_alive {
        install_ctrlc_handler(cancel.clone())?;
    }

    let device = connect(serial)?;
    let mut session = Session::bind(device).map_err(|err| session_error("bind failed", err))?;
    print_device(session.identity(), format);

    let report = session
        .boot(&image, &mut |progress: &UploadProgress| {
            print_progress(progress, format)
        })
        .map_err(|err| session_error("upload failed", err))?;
    print_upload(&report, format);

    if !args.keep_alive {
        return Ok(SUCCESS);
    }

    let mut observer = TerminalObserver::new(format, session.identity(), args.log_file.as_deref())?;
    let outcome = session
        .listen(&mut observer, &cancel)
        .map_err(|err| session_error("listen failed", err))?;
    print_outcome(outcome, format);

    Ok(SUCCESS)
}
