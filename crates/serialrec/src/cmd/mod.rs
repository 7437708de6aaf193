use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use bytes::Bytes;
use clap::{Args, Subcommand};
use serialrec_channel::{Channel, ChannelError};
use serialrec_frame::FrameError;
use serialrec_transport::{BaudRate, ChannelConfig, Deadline, RawChannel};

use crate::exit::{channel_error, io_error, CliError, CliResult, DATA_INVALID, INTERNAL, USAGE};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod ports;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write one record to a port.
    Send(SendArgs),
    /// Print records received on a port.
    Listen(ListenArgs),
    /// Write every received record back to the sender.
    Echo(EchoArgs),
    /// List serial ports on this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Echo(args) => echo::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

// Line settings shared by every command that opens a port.
#[derive(Args, Debug, Default)]
pub struct LineArgs {
    /// Line speed in bits per second (9600, 19200, 38400, 57600, 115200).
    #[arg(long, value_name = "BPS")]
    pub baud: Option<u32>,
    /// JSON file with line settings. --baud overrides its rate.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Read deadline in seconds: negative blocks forever, 0 never blocks.
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial port name (e.g. COM3, /dev/ttyUSB0).
    pub port: String,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["file", "hex"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Payload as hex digits (e.g. 0102ff).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Wait for one reply record and print it.
    #[arg(long)]
    pub wait: bool,
    #[command(flatten)]
    pub line: LineArgs,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial port name (e.g. COM3, /dev/ttyUSB0).
    pub port: String,
    /// Exit after receiving N records (at least 1).
    #[arg(long)]
    pub count: Option<NonZeroUsize>,
    #[command(flatten)]
    pub line: LineArgs,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Serial port name (e.g. COM3, /dev/ttyUSB0).
    pub port: String,
    #[command(flatten)]
    pub line: LineArgs,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Resolve the line settings named on the command line.
pub(crate) fn line_config(line: &LineArgs) -> CliResult<ChannelConfig> {
    let mut config = match &line.config {
        Some(path) => load_config(path)?,
        None => ChannelConfig::default(),
    };
    if let Some(bps) = line.baud {
        config.baud_rate = BaudRate::from_bps(bps)
            .ok_or_else(|| CliError::new(USAGE, format!("unsupported baud rate {bps}")))?;
    }
    Ok(config)
}

fn load_config(path: &Path) -> CliResult<ChannelConfig> {
    let raw = fs::read(path)
        .map_err(|err| io_error(&format!("failed reading {}", path.display()), err))?;
    serde_json::from_slice(&raw).map_err(|err| {
        CliError::new(
            DATA_INVALID,
            format!("invalid line settings in {}: {err}", path.display()),
        )
    })
}

/// Open `port` with the requested settings and read deadline.
pub(crate) fn open_channel(
    port: &str,
    line: &LineArgs,
    default_read: Deadline,
) -> CliResult<Channel> {
    let config = line_config(line)?;
    let mut channel = Channel::open_with_config(port, &config)
        .map_err(|err| channel_error("open failed", err))?;

    let deadline = line.timeout.map(Deadline::from_secs).unwrap_or(default_read);
    channel
        .set_read_deadline(deadline)
        .map_err(|err| channel_error("setting read deadline failed", err))?;

    tracing::info!(port, config = %config, read_deadline = %deadline, "port open");
    Ok(channel)
}

pub(crate) enum RecvErrorDisposition {
    /// Nothing arrived before the deadline.
    Idle,
    /// A damaged record was dropped; keep reading.
    Skip(FrameError),
    Fatal(CliError),
}

pub(crate) fn classify_recv_error(err: ChannelError) -> RecvErrorDisposition {
    match err {
        ChannelError::Frame(FrameError::ReadTimeout)
        | ChannelError::Frame(FrameError::MalformedHeader { found: None }) => {
            RecvErrorDisposition::Idle
        }
        ChannelError::Frame(
            err @ (FrameError::MalformedHeader { .. }
            | FrameError::MalformedLength { .. }
            | FrameError::MalformedPayload { .. }
            | FrameError::MalformedTrailer { .. }
            | FrameError::MissingChecksum
            | FrameError::ChecksumMismatch { .. }),
        ) => RecvErrorDisposition::Skip(err),
        other => RecvErrorDisposition::Fatal(channel_error("receive failed", other)),
    }
}

/// Pause between polls of an empty line when the read deadline never blocks.
pub(crate) const IDLE_BACKOFF: Duration = Duration::from_millis(50);

/// Wait for the next intact record, dropping damaged ones.
///
/// Returns `None` once `running` is cleared.
pub(crate) fn next_record<T: RawChannel>(
    channel: &mut Channel<T>,
    running: &AtomicBool,
) -> CliResult<Option<Bytes>> {
    let backoff = match channel.deadlines() {
        Some(deadlines) if !deadlines.read_blocks() => Some(IDLE_BACKOFF),
        _ => None,
    };

    while running.load(Ordering::SeqCst) {
        let err = match channel.recv_record() {
            Ok(payload) => return Ok(Some(payload)),
            Err(err) => err,
        };
        match classify_recv_error(err) {
            RecvErrorDisposition::Idle => {
                if let Some(pause) = backoff {
                    thread::sleep(pause);
                }
            }
            RecvErrorDisposition::Skip(err) => {
                tracing::warn!(error = %err, "dropped damaged record");
            }
            RecvErrorDisposition::Fatal(cli_err) => return Err(cli_err),
        }
    }
    Ok(None)
}

pub(crate) fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    use serialrec_transport::{Direction, MemoryChannel};

    use super::*;
    use crate::exit::{TRANSPORT_ERROR, USAGE};

    /// Counts raw read passes on top of a loopback channel.
    #[derive(Debug)]
    struct CountedReads {
        inner: MemoryChannel,
        reads: Arc<AtomicUsize>,
    }

    impl RawChannel for CountedReads {
        fn raw_read(&mut self, buf: &mut [u8]) -> serialrec_transport::Result<usize> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.raw_read(buf)
        }

        fn raw_write(&mut self, buf: &[u8]) -> serialrec_transport::Result<usize> {
            self.inner.raw_write(buf)
        }

        fn configure(&mut self, config: &ChannelConfig) -> serialrec_transport::Result<()> {
            self.inner.configure(config)
        }

        fn set_timeouts(
            &mut self,
            direction: Direction,
            deadline: Deadline,
        ) -> serialrec_transport::Result<()> {
            self.inner.set_timeouts(direction, deadline)
        }

        fn close(&mut self) -> serialrec_transport::Result<()> {
            self.inner.close()
        }
    }

    #[test]
    fn quiet_non_blocking_line_backs_off_between_polls() {
        let reads = Arc::new(AtomicUsize::new(0));
        let mut channel = Channel::from_raw(CountedReads {
            inner: MemoryChannel::new(),
            reads: Arc::clone(&reads),
        });
        channel.set_read_deadline(Deadline::from_secs(0)).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let stopper = {
            let running = Arc::clone(&running);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(200));
                running.store(false, Ordering::SeqCst);
            })
        };

        let started = Instant::now();
        assert!(next_record(&mut channel, &running).unwrap().is_none());
        stopper.join().unwrap();

        let passes = reads.load(Ordering::SeqCst);
        assert!(
            passes <= 10,
            "{passes} read passes in {:?}",
            started.elapsed()
        );
    }

    #[test]
    fn next_record_skips_damage_and_returns_payload() {
        let bytes = [b'x', 0x02, 0x00, 0x02, b'h', b'i', 0x03, b'a'];
        let mut channel = Channel::from_raw(MemoryChannel::with_inbound(&bytes));
        channel.set_read_deadline(Deadline::NonBlocking).unwrap();
        let running = AtomicBool::new(true);

        let payload = next_record(&mut channel, &running).unwrap();
        assert_eq!(payload.as_deref(), Some(&b"hi"[..]));
    }

    #[test]
    fn next_record_stops_without_reading_once_cleared() {
        let mut channel = Channel::from_raw(MemoryChannel::with_inbound(&[0x02]));
        let running = AtomicBool::new(false);

        assert!(next_record(&mut channel, &running).unwrap().is_none());
        assert_eq!(channel.get_ref().pending(), 1);
    }

    #[test]
    fn next_record_surfaces_fatal_errors() {
        let mut channel = Channel::from_raw(MemoryChannel::new().fail_reads());
        let running = AtomicBool::new(true);

        let err = next_record(&mut channel, &running).unwrap_err();
        assert_eq!(err.code, crate::exit::INTERNAL);
    }

    #[test]
    fn timeouts_and_silence_are_idle() {
        assert!(matches!(
            classify_recv_error(ChannelError::Frame(FrameError::ReadTimeout)),
            RecvErrorDisposition::Idle
        ));
        assert!(matches!(
            classify_recv_error(ChannelError::Frame(FrameError::MalformedHeader {
                found: None
            })),
            RecvErrorDisposition::Idle
        ));
    }

    #[test]
    fn damaged_records_are_skipped() {
        let disposition = classify_recv_error(ChannelError::Frame(FrameError::ChecksumMismatch {
            expected: 1,
            found: 2,
        }));
        assert!(matches!(
            disposition,
            RecvErrorDisposition::Skip(FrameError::ChecksumMismatch { .. })
        ));

        let disposition =
            classify_recv_error(ChannelError::Frame(FrameError::MalformedHeader {
                found: Some(b'x'),
            }));
        assert!(matches!(disposition, RecvErrorDisposition::Skip(_)));
    }

    #[test]
    fn closed_channel_is_fatal() {
        match classify_recv_error(ChannelError::Closed) {
            RecvErrorDisposition::Fatal(err) => assert_eq!(err.code, TRANSPORT_ERROR),
            _ => panic!("expected fatal disposition"),
        }
    }

    #[test]
    fn baud_flag_overrides_default() {
        let line = LineArgs {
            baud: Some(115_200),
            ..LineArgs::default()
        };
        let config = line_config(&line).unwrap();
        assert_eq!(config.baud_rate, BaudRate::B115200);
    }

    #[test]
    fn unsupported_baud_is_usage_error() {
        let line = LineArgs {
            baud: Some(1_200),
            ..LineArgs::default()
        };
        let err = line_config(&line).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn config_file_is_loaded() {
        let path = std::env::temp_dir().join(format!(
            "serialrec-line-{}.json",
            std::process::id()
        ));
        fs::write(&path, br#"{"baud_rate": 57600}"#).unwrap();

        let line = LineArgs {
            config: Some(path.clone()),
            ..LineArgs::default()
        };
        let config = line_config(&line).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.baud_rate, BaudRate::B57600);
        assert_eq!(config.to_string(), "57600 8N1");
    }
}
