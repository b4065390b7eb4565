//! Slave side of the barrier: announces itself, answers each `PING`
//! with a `PONG`, accumulates a clock-offset estimate from the
//! master's send time and its own last-known RTT, and signals `READY`
//! once it has collected enough samples.

use crate::error::Result;
use crate::protocol::{nanos_between, Message};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Number of `PING` samples collected before the slave reports `READY`.
pub const READY_AFTER_PINGS: u32 = 10;

const HELLO_RETRY_INTERVAL: Duration = Duration::from_millis(500);
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

/// Runs the slave barrier against `master_addr`. Returns the
/// synchronized start time and the estimated clock offset (signed
/// nanoseconds, master minus local) once `GO` arrives.
pub fn run_barrier(
    socket: &UdpSocket,
    master_addr: SocketAddr,
    stop: &AtomicBool,
) -> Result<(SystemTime, i64)> {
    socket.set_read_timeout(Some(POLL_TIMEOUT))?;

    let mut ping_count: u32 = 0;
    let mut offset_sum: i64 = 0;
    let mut ready_sent = false;
    let mut last_hello = std::time::Instant::now() - HELLO_RETRY_INTERVAL;
    let mut buf = [0u8; 64];

    socket.send_to(&Message::Hello { seqno: 0 }.pack(), master_addr)?;

    loop {
        if stop.load(Ordering::Relaxed) {
            return Err(crate::error::NetsyncError::BarrierTimeout("slave barrier (stopped)"));
        }

        if !ready_sent && last_hello.elapsed() >= HELLO_RETRY_INTERVAL {
            socket.send_to(&Message::Hello { seqno: 0 }.pack(), master_addr)?;
            last_hello = std::time::Instant::now();
        }

        let (len, from) = match socket.recv_from(&mut buf) {
            Ok(r) => r,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if from != master_addr {
            continue;
        }

        let msg = match Message::unpack(&buf[..len]) {
            Ok(m) => m,
            Err(e) => {
                debug!(error = %e, "dropping malformed netsync datagram");
                continue;
            }
        };

        match msg {
            Message::Hello { .. } => {
                debug!("master acknowledged HELLO");
            }
            Message::Ping {
                seqno,
                send_time,
                rtt_estimate,
            } => {
                let recv_time = SystemTime::now();
                socket.send_to(&Message::Pong { seqno }.pack(), master_addr)?;

                let one_way = rtt_estimate / 2;
                let adjusted_send = send_time + one_way;
                offset_sum += nanos_between(adjusted_send, recv_time);
                ping_count += 1;

                if ping_count >= READY_AFTER_PINGS && !ready_sent {
                    socket.send_to(&Message::Ready { seqno }.pack(), master_addr)?;
                    ready_sent = true;
                    info!(ping_count, "clock offset established, signalled READY");
                }
            }
            Message::Go { start_time, .. } => {
                let offset = if ping_count > 0 {
                    offset_sum / i64::from(ping_count)
                } else {
                    0
                };
                return Ok((start_time, offset));
            }
            Message::Ready { .. } | Message::Pong { .. } => {
                debug!("ignoring slave-originated message type received by slave");
            }
        }
    }
}
