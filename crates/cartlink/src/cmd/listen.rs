use cartlink_session::{CancelToken, Session};

use crate::cmd::{attach, install_ctrlc_handler, ListenArgs, SerialArgs};
use crate::exit::{session_error, CliResult, SUCCESS};
use crate::output::{print_device, print_outcome, OutputFormat, TerminalObserver};

pub fn run(args: ListenArgs, serial: &SerialArgs, format: OutputFormat) -> CliResult<i32> {
    let cancel = CancelToken::new();
    install_ctrlc_handler(cancel.clone())?;

    let mut session = Session::attach(attach(serial)?);
    print_device(session.identity(), format);

    let mut observer = TerminalObserver::new(format, session.identity(), args.log_file.as_deref())?;
    let outcome = session
        .listen(&mut observer, &cancel)
        .map_err(|err| session_error("listen failed", err))?;
    print_outcome(outcome, format);

    Ok(SUCCESS)
}
