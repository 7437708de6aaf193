use serialrec_channel::{Channel, ChannelError};
use serialrec_frame::{ChecksumPolicy, FrameError, Placeholder, FRAME_OVERHEAD, MAX_PAYLOAD};
use serialrec_transport::{Deadline, MemoryChannel};

fn connected() -> (Channel<MemoryChannel>, Channel<MemoryChannel>) {
    let (a, b) = MemoryChannel::pair();
    (Channel::from_raw(a), Channel::from_raw(b))
}

#[derive(Debug)]
struct XorLrc;

impl ChecksumPolicy for XorLrc {
    fn compute(&self, payload: &[u8]) -> u8 {
        payload.iter().fold(0u8, |acc, b| acc ^ b)
    }
}

#[test]
fn ab_scenario_on_the_wire() {
    let (a, b) = MemoryChannel::pair();
    let mut tx = Channel::from_raw(a);

    assert_eq!(tx.write_record(b"AB").unwrap(), 2);

    let mut buf = [0u8; 16];
    let mut peer = b;
    let n = serialrec_transport::RawChannel::raw_read(&mut peer, &mut buf).unwrap();
    assert_eq!(
        &buf[..n],
        &[0x02, 0x00, 0x02, 0x41, 0x42, 0x03, Placeholder::BYTE]
    );

    peer.feed(&buf[..n]);
    let mut rx = Channel::from_raw(peer);
    let mut out = [0u8; 2];
    assert_eq!(rx.read_record(&mut out).unwrap(), 2);
    assert_eq!(&out, b"AB");
}

#[test]
fn payload_sizes_round_trip() {
    let (mut tx, mut rx) = connected();

    for len in [0usize, 1, 2, 255, 256, 4096, MAX_PAYLOAD] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        assert_eq!(tx.write_record(&payload).unwrap(), len);

        let received = rx.recv_record().unwrap();
        assert_eq!(received.len(), len);
        assert_eq!(received.as_ref(), payload.as_slice());
    }
}

#[test]
fn chunked_line_round_trips() {
    let (a, b) = MemoryChannel::pair();
    let mut tx = Channel::from_raw(a.write_chunk(3));
    let mut rx = Channel::from_raw(b.read_chunk(1));

    tx.write_record(b"dribbled one byte at a time").unwrap();
    assert_eq!(
        rx.recv_record().unwrap().as_ref(),
        b"dribbled one byte at a time"
    );
}

#[test]
fn records_stay_in_order() {
    let (mut tx, mut rx) = connected();

    for i in 0..32u32 {
        tx.write_record(format!("msg-{i}").as_bytes()).unwrap();
    }
    for i in 0..32u32 {
        assert_eq!(
            rx.recv_record().unwrap().as_ref(),
            format!("msg-{i}").as_bytes()
        );
    }
}

#[test]
fn matching_checksum_policies_round_trip() {
    let (a, b) = MemoryChannel::pair();
    let mut tx = Channel::from_raw(a).with_checksum(XorLrc);
    let mut rx = Channel::from_raw(b).with_checksum(XorLrc);

    tx.write_record(&[0x10, 0x01]).unwrap();
    assert_eq!(rx.recv_record().unwrap().as_ref(), &[0x10, 0x01]);
}

#[test]
fn strict_reader_rejects_placeholder_writer() {
    let (a, b) = MemoryChannel::pair();
    let mut tx = Channel::from_raw(a);
    let mut rx = Channel::from_raw(b).with_checksum(XorLrc);

    tx.write_record(&[0x10, 0x01]).unwrap();
    let err = rx.recv_record().unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Frame(FrameError::ChecksumMismatch {
            expected: 0x11,
            found: Placeholder::BYTE
        })
    ));
}

#[test]
fn truncated_record_is_malformed_not_a_hang() {
    let (mut tx, mut rx) = connected();
    rx.set_read_deadline(Deadline::NonBlocking).unwrap();

    tx.writen(&[0x02, 0x00, 0x0A, b'p', b'a', b'r'], 6).unwrap();
    let err = rx.recv_record().unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Frame(FrameError::MalformedPayload { expected: 10, got: 3 })
    ));
}

#[test]
fn readn_consumes_only_what_was_asked() {
    let (mut tx, mut rx) = connected();
    tx.writen(b"0123456789", 10).unwrap();

    let mut first = [0u8; 4];
    assert_eq!(rx.readn(&mut first, 4).unwrap(), 4);
    assert_eq!(&first, b"0123");
    assert_eq!(rx.get_ref().pending(), 6);
}

#[test]
fn non_blocking_writer_never_times_out_on_draining_line() {
    let (mut tx, _rx) = connected();
    tx.set_write_deadline(Deadline::from_secs(0)).unwrap();

    for _ in 0..16 {
        assert_eq!(tx.write(b"x").unwrap(), 1);
        assert_eq!(tx.writen(b"xyz", 3).unwrap(), 3);
        tx.write_record(b"record").unwrap();
    }
}

#[test]
fn stalled_peer_leaves_incomplete_record() {
    let (a, _b) = MemoryChannel::pair();
    let mut tx = Channel::from_raw(a.write_capacity(FRAME_OVERHEAD));
    tx.set_write_deadline(Deadline::NonBlocking).unwrap();

    let err = tx.write_record(b"too long").unwrap_err();
    assert!(matches!(
        err,
        ChannelError::Frame(FrameError::IncompleteWrite { written, .. })
            if written == FRAME_OVERHEAD
    ));
}

#[test]
fn channel_moves_across_threads() {
    let (mut tx, mut rx) = connected();

    let writer = std::thread::spawn(move || {
        for i in 0..8u8 {
            tx.write_record(&[i; 3]).unwrap();
        }
        tx
    });
    let tx = writer.join().unwrap();

    for i in 0..8u8 {
        assert_eq!(rx.recv_record().unwrap().as_ref(), &[i; 3]);
    }
    drop(tx);
}
