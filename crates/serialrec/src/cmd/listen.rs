use std::num::NonZeroUsize;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use serialrec_transport::Deadline;

use crate::cmd::{install_ctrlc_handler, next_record, open_channel, ListenArgs};
use crate::exit::{CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

/// Short enough that Ctrl-C is noticed promptly on a quiet line.
pub(crate) const POLL_DEADLINE: Deadline = Deadline::Bounded(Duration::from_secs(1));

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut channel = open_channel(&args.port, &args.line, POLL_DEADLINE)?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let limit = args.count.map(NonZeroUsize::get);
    let mut printed = 0usize;

    while let Some(payload) = next_record(&mut channel, &running)? {
        print_record(&payload, &args.port, format);
        printed = printed.saturating_add(1);

        if limit.is_some_and(|limit| printed >= limit) {
            break;
        }
    }

    tracing::info!(records = printed, "listen finished");
    Ok(SUCCESS)
}
