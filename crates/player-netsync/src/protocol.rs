//! Wire format for the UDP clock-sync protocol.
//!
//! Every datagram starts with a 3-byte header (version, message type,
//! sequence number); [`Message::GO`] and [`Message::Ping`] append a
//! big-endian nanosecond timestamp, and `Ping` a further 4-byte
//! microsecond RTT estimate. `Pong` carries no payload; the master
//! measures round-trip time itself from its own send/receive instants
//! keyed by sequence number, so the reply only needs to echo it.
//!
//! ```text
//! byte:     0         1         2         3..11        11..15
//!         version   msg_type   seqno   [send_time_ns]  [rtt_us]
//! ```

use crate::error::{NetsyncError, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const PROTOCOL_VERSION: u8 = 0;

const MSG_HELLO: u8 = 0;
const MSG_READY: u8 = 1;
const MSG_GO: u8 = 2;
const MSG_PING: u8 = 3;
const MSG_PONG: u8 = 4;

const HEADER_LEN: usize = 3;
const GO_LEN: usize = HEADER_LEN + 8;
const PING_LEN: usize = HEADER_LEN + 8 + 4;

/// A parsed netsync datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    /// Slave -> master: announces presence, requests to join the barrier.
    Hello { seqno: u8 },
    /// Slave -> master: clock offset established, ready for `Go`.
    Ready { seqno: u8 },
    /// Master -> slaves (broadcast): the synchronized playback epoch.
    Go { seqno: u8, start_time: SystemTime },
    /// Master -> slave: periodic clock-offset probe.
    Ping {
        seqno: u8,
        send_time: SystemTime,
        rtt_estimate: Duration,
    },
    /// Slave -> master: echoes a `Ping`'s sequence number.
    Pong { seqno: u8 },
}

fn system_time_to_nanos(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).as_nanos() as u64
}

fn nanos_to_system_time(nanos: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_nanos(nanos)
}

/// Signed nanoseconds from `b` to `a` (positive when `a` is later).
#[must_use]
pub fn nanos_between(a: SystemTime, b: SystemTime) -> i64 {
    match a.duration_since(b) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

impl Message {
    fn msg_type(&self) -> u8 {
        match self {
            Message::Hello { .. } => MSG_HELLO,
            Message::Ready { .. } => MSG_READY,
            Message::Go { .. } => MSG_GO,
            Message::Ping { .. } => MSG_PING,
            Message::Pong { .. } => MSG_PONG,
        }
    }

    fn seqno(&self) -> u8 {
        match self {
            Message::Hello { seqno }
            | Message::Ready { seqno }
            | Message::Go { seqno, .. }
            | Message::Ping { seqno, .. }
            | Message::Pong { seqno } => *seqno,
        }
    }

    /// Serializes this message to its wire form.
    #[must_use]
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = vec![PROTOCOL_VERSION, self.msg_type(), self.seqno()];

        match self {
            Message::Go { start_time, .. } => {
                buf.extend_from_slice(&system_time_to_nanos(*start_time).to_be_bytes());
            }
            Message::Ping {
                send_time,
                rtt_estimate,
                ..
            } => {
                buf.extend_from_slice(&system_time_to_nanos(*send_time).to_be_bytes());
                buf.extend_from_slice(&(rtt_estimate.as_micros() as u32).to_be_bytes());
            }
            Message::Hello { .. } | Message::Ready { .. } | Message::Pong { .. } => {}
        }

        buf
    }

    /// Parses a datagram. Rejects unsupported versions, unknown message
    /// types, and payloads shorter than their message type requires.
    pub fn unpack(buf: &[u8]) -> Result<Message> {
        if buf.len() < HEADER_LEN {
            return Err(NetsyncError::TruncatedMessage {
                expected: HEADER_LEN,
                got: buf.len(),
            });
        }

        let version = buf[0];
        if version != PROTOCOL_VERSION {
            return Err(NetsyncError::UnsupportedVersion(version));
        }

        let msg_type = buf[1];
        let seqno = buf[2];

        match msg_type {
            MSG_HELLO => Ok(Message::Hello { seqno }),
            MSG_READY => Ok(Message::Ready { seqno }),
            MSG_GO => {
                if buf.len() < GO_LEN {
                    return Err(NetsyncError::TruncatedMessage {
                        expected: GO_LEN,
                        got: buf.len(),
                    });
                }
                let nanos = u64::from_be_bytes(buf[3..11].try_into().expect("8 bytes"));
                Ok(Message::Go {
                    seqno,
                    start_time: nanos_to_system_time(nanos),
                })
            }
            MSG_PING => {
                if buf.len() < PING_LEN {
                    return Err(NetsyncError::TruncatedMessage {
                        expected: PING_LEN,
                        got: buf.len(),
                    });
                }
                let nanos = u64::from_be_bytes(buf[3..11].try_into().expect("8 bytes"));
                let rtt_us = u32::from_be_bytes(buf[11..15].try_into().expect("4 bytes"));
                Ok(Message::Ping {
                    seqno,
                    send_time: nanos_to_system_time(nanos),
                    rtt_estimate: Duration::from_micros(u64::from(rtt_us)),
                })
            }
            MSG_PONG => Ok(Message::Pong { seqno }),
            other => Err(NetsyncError::UnknownMessageType(other)),
        }
    }
}
