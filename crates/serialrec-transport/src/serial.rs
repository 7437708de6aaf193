use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serde::Serialize;
use serialport::{ClearBuffer, FlowControl, SerialPort, SerialPortType};
use tracing::{debug, info, trace};

use crate::config::{ChannelConfig, DataBits, Deadline, IoDeadlines, Parity, StopBits};
use crate::error::{Result, TransportError};
use crate::traits::{Direction, RawChannel};

/// Longest timeout accepted by every backend's poll/COMMTIMEOUTS call.
pub const FOREVER_TIMEOUT: Duration = Duration::from_millis(i32::MAX as u64);

/// A serial port driven through the `serialport` crate.
///
/// `serialport` keeps a single timeout for both directions, so the transport
/// remembers the read and write deadlines separately and switches the port's
/// timeout right before each raw call when the direction changes.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
    deadlines: IoDeadlines,
    applied: Option<Duration>,
}

impl SerialTransport {
    /// Open `name` at 9600 8N1, blocking forever in both directions.
    ///
    /// Bytes already queued in the OS buffers are discarded.
    pub fn open(name: &str) -> Result<Self> {
        let config = ChannelConfig::default();
        let port = serialport::new(name, config.baud_rate.bps())
            .data_bits(to_serialport_data_bits(config.data_bits))
            .parity(to_serialport_parity(config.parity))
            .stop_bits(to_serialport_stop_bits(config.stop_bits))
            .flow_control(FlowControl::None)
            .timeout(FOREVER_TIMEOUT)
            .open()
            .map_err(|source| TransportError::Open {
                port: name.to_string(),
                source,
            })?;
        port.clear(ClearBuffer::All)?;

        info!(port = name, "opened serial port");

        Ok(Self {
            port: Some(port),
            name: name.to_string(),
            deadlines: IoDeadlines::default(),
            applied: Some(FOREVER_TIMEOUT),
        })
    }

    /// The OS name this transport was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Deadlines applied to subsequent raw operations.
    pub fn deadlines(&self) -> IoDeadlines {
        self.deadlines
    }

    fn port_for(&mut self, deadline: Deadline) -> Result<&mut dyn SerialPort> {
        let timeout = timeout_for(deadline);
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        if self.applied != Some(timeout) {
            port.set_timeout(timeout)?;
            self.applied = Some(timeout);
        }
        Ok(&mut **port)
    }
}

impl RawChannel for SerialTransport {
    fn raw_read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let deadline = self.deadlines.read;
        let port = self.port_for(deadline)?;
        loop {
            match port.read(buf) {
                Ok(n) => {
                    trace!(n, "raw read");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_deadline(&err) => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn raw_write(&mut self, buf: &[u8]) -> Result<usize> {
        let deadline = self.deadlines.write;
        let port = self.port_for(deadline)?;
        loop {
            match port.write(buf) {
                Ok(n) => {
                    trace!(n, "raw write");
                    return Ok(n);
                }
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_deadline(&err) => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn configure(&mut self, config: &ChannelConfig) -> Result<()> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        let apply = |port: &mut Box<dyn SerialPort>| -> serialport::Result<()> {
            port.set_baud_rate(config.baud_rate.bps())?;
            port.set_data_bits(to_serialport_data_bits(config.data_bits))?;
            port.set_parity(to_serialport_parity(config.parity))?;
            port.set_stop_bits(to_serialport_stop_bits(config.stop_bits))
        };
        apply(port).map_err(|err| TransportError::Configure(err.to_string()))?;
        debug!(port = %self.name, %config, "applied line settings");
        Ok(())
    }

    fn set_timeouts(&mut self, direction: Direction, deadline: Deadline) -> Result<()> {
        if self.port.is_none() {
            return Err(TransportError::Closed);
        }
        self.deadlines.set(direction, deadline);
        debug!(port = %self.name, ?direction, %deadline, "updated deadline");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut port = self.port.take().ok_or(TransportError::Closed)?;
        self.applied = None;
        port.flush()?;
        info!(port = %self.name, "closed serial port");
        Ok(())
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("open", &self.port.is_some())
            .field("deadlines", &self.deadlines)
            .finish()
    }
}

/// One serial port found on the host.
#[derive(Debug, Clone, Serialize)]
pub struct PortSummary {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// List the serial ports visible to this process.
pub fn available_ports() -> Result<Vec<PortSummary>> {
    let ports = serialport::available_ports()?;
    Ok(ports
        .into_iter()
        .map(|p| {
            let (kind, description) = match p.port_type {
                SerialPortType::UsbPort(usb) => (
                    "usb",
                    usb.product
                        .or(usb.manufacturer)
                        .or_else(|| Some(format!("{:04x}:{:04x}", usb.vid, usb.pid))),
                ),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortSummary {
                name: p.port_name,
                kind,
                description,
            }
        })
        .collect())
}

/// Platform device name for a numbered port.
pub fn port_name(number: u32) -> String {
    if cfg!(windows) {
        format!("COM{number}")
    } else {
        format!("/dev/ttyS{number}")
    }
}

fn timeout_for(deadline: Deadline) -> Duration {
    match deadline {
        Deadline::Forever => FOREVER_TIMEOUT,
        Deadline::NonBlocking => Duration::ZERO,
        Deadline::Bounded(d) => d.min(FOREVER_TIMEOUT),
    }
}

fn is_deadline(err: &std::io::Error) -> bool {
    matches!(err.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

fn to_serialport_data_bits(bits: DataBits) -> serialport::DataBits {
    match bits {
        DataBits::Eight => serialport::DataBits::Eight,
    }
}

fn to_serialport_parity(parity: Parity) -> serialport::Parity {
    match parity {
        Parity::None => serialport::Parity::None,
    }
}

fn to_serialport_stop_bits(bits: StopBits) -> serialport::StopBits {
    match bits {
        StopBits::One => serialport::StopBits::One,
    }
}
