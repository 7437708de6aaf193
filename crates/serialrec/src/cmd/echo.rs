use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::cmd::listen::POLL_DEADLINE;
use crate::cmd::{install_ctrlc_handler, next_record, open_channel, EchoArgs};
use crate::exit::{channel_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

pub fn run(args: EchoArgs, _format: OutputFormat) -> CliResult<i32> {
    let mut channel = open_channel(&args.port, &args.line, POLL_DEADLINE)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    while let Some(payload) = next_record(&mut channel, &running)? {
        tracing::info!(size = payload.len(), "echoing record");

        channel
            .write_record(&payload)
            .map_err(|err| channel_error("echo send failed", err))?;
    }

    Ok(SUCCESS)
}
