use std::fs;
use std::time::Duration;

use serialrec_frame::MAX_PAYLOAD;
use serialrec_transport::Deadline;

use crate::cmd::{open_channel, SendArgs};
use crate::exit::{channel_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_record, OutputFormat};

/// Reply deadline used by `--wait` when `--timeout` is not given.
const DEFAULT_WAIT: Deadline = Deadline::Bounded(Duration::from_secs(5));

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args)?;
    if payload.len() > MAX_PAYLOAD {
        return Err(CliError::new(
            USAGE,
            format!(
                "payload is {} bytes; a record carries at most {MAX_PAYLOAD}",
                payload.len()
            ),
        ));
    }

    let mut channel = open_channel(&args.port, &args.line, DEFAULT_WAIT)?;

    let written = channel
        .write_record(&payload)
        .map_err(|err| channel_error("send failed", err))?;
    tracing::debug!(size = written, "record sent");

    if args.wait {
        let reply = channel
            .recv_record()
            .map_err(|err| channel_error("receive failed", err))?;
        print_record(&reply, &args.port, format);
    }

    channel
        .close()
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(hex) = &args.hex {
        return parse_hex(hex);
    }
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    Ok(Vec::new())
}

/// Decode hex digits, ignoring whitespace and an optional `0x` prefix.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let trimmed = input.trim();
    let trimmed = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = trimmed.split_ascii_whitespace().collect();

    hex::decode(&digits)
        .map_err(|err| CliError::new(USAGE, format!("--hex is not valid hex: {err}")))
}
