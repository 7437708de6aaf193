//! Two channels wired back to back in memory, no hardware needed.
//!
//! Run with:
//!   cargo run --example loopback
//!
//! Against a real port, the same calls work on `Channel::open("/dev/ttyUSB0")`.

use serialrec::channel::Channel;
use serialrec::frame::FrameError;
use serialrec::transport::{Deadline, MemoryChannel};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (a, b) = MemoryChannel::pair();
    let mut client = Channel::from_raw(a);
    // The device end drips bytes one at a time, like a slow UART.
    let mut device = Channel::from_raw(b.read_chunk(1));

    for message in ["AB", "hello", "serial"] {
        client.write_record(message.as_bytes())?;

        // The device answers every record with its payload reversed.
        let request = device.recv_record()?;
        let mut reply = request.to_vec();
        reply.reverse();
        device.write_record(&reply)?;

        let mut buf = [0u8; 64];
        let n = client.read_record(&mut buf)?;
        eprintln!(
            "sent {message:?}, got {:?}",
            String::from_utf8_lossy(&buf[..n])
        );
    }

    // A record cut short on the wire is reported, not waited on forever.
    client.set_read_deadline(Deadline::NonBlocking)?;
    device.writen(&[0x02, 0x00, 0x08, b'c', b'u', b't'], 6)?;
    match client.recv_record() {
        Err(serialrec::channel::ChannelError::Frame(err @ FrameError::MalformedPayload { .. })) => {
            eprintln!("truncated record rejected: {err}")
        }
        other => eprintln!("unexpected result: {other:?}"),
    }

    device.close()?;
    client.close()?;
    Ok(())
}
