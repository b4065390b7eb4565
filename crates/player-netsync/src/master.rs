//! Master side of the barrier: tracks slaves as they announce themselves
//! via `HELLO`, pings each once per [`PING_INTERVAL`] to build an RTT
//! estimate, waits for every known slave to report `READY`, then
//! broadcasts `GO` with a synchronized start time a little in the
//! future.

use crate::error::Result;
use crate::protocol::Message;
use std::collections::HashMap;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

/// How often the master pings each known slave to refresh its RTT
/// estimate.
pub const PING_INTERVAL: Duration = Duration::from_millis(1000);

/// Margin added to "now" when computing the broadcast start time, so
/// every slave's `GO` arrives before that instant.
const START_MARGIN: Duration = Duration::from_secs(1);

/// Socket recv timeout: bounds how long a poll iteration can block, so
/// the ping cadence and stop flag both get checked promptly.
const POLL_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct SlaveState {
    ready: bool,
    rtt_estimate: Duration,
    last_ping_sent: Option<Instant>,
    last_ping_seqno: u8,
}

/// Runs the master barrier: returns the synchronized start time once
/// `expected_slaves` distinct peers have reported `READY`, or an error
/// if `stop` is set first.
pub fn run_barrier(
    socket: &UdpSocket,
    expected_slaves: usize,
    stop: &AtomicBool,
) -> Result<SystemTime> {
    socket.set_read_timeout(Some(POLL_TIMEOUT))?;

    let mut slaves: HashMap<SocketAddr, SlaveState> = HashMap::new();
    let mut seqno: u8 = 0;
    let mut buf = [0u8; 64];

    loop {
        if stop.load(Ordering::Relaxed) {
            return Err(crate::error::NetsyncError::BarrierTimeout("master barrier (stopped)"));
        }

        ping_due_slaves(socket, &mut slaves, &mut seqno)?;

        match socket.recv_from(&mut buf) {
            Ok((len, from)) => handle_datagram(socket, &buf[..len], from, &mut slaves)?,
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }

        let ready_count = slaves.values().filter(|s| s.ready).count();
        if expected_slaves > 0 && ready_count >= expected_slaves {
            break;
        }
    }

    let start_time = SystemTime::now() + START_MARGIN;
    info!(slaves = slaves.len(), "all slaves ready, broadcasting GO");
    let go = Message::Go {
        seqno,
        start_time,
    };
    for addr in slaves.keys() {
        socket.send_to(&go.pack(), addr)?;
    }

    Ok(start_time)
}

fn ping_due_slaves(
    socket: &UdpSocket,
    slaves: &mut HashMap<SocketAddr, SlaveState>,
    seqno: &mut u8,
) -> Result<()> {
    let now = Instant::now();
    for (addr, state) in slaves.iter_mut() {
        let due = state
            .last_ping_sent
            .map_or(true, |t| now.duration_since(t) >= PING_INTERVAL);
        if !due {
            continue;
        }

        *seqno = seqno.wrapping_add(1);
        state.last_ping_seqno = *seqno;
        state.last_ping_sent = Some(now);

        let ping = Message::Ping {
            seqno: *seqno,
            send_time: SystemTime::now(),
            rtt_estimate: state.rtt_estimate,
        };
        socket.send_to(&ping.pack(), addr)?;
        debug!(%addr, seqno = *seqno, "sent PING");
    }
    Ok(())
}

fn handle_datagram(
    socket: &UdpSocket,
    buf: &[u8],
    from: SocketAddr,
    slaves: &mut HashMap<SocketAddr, SlaveState>,
) -> Result<()> {
    let msg = match Message::unpack(buf) {
        Ok(m) => m,
        Err(e) => {
            debug!(%from, error = %e, "dropping malformed netsync datagram");
            return Ok(());
        }
    };

    match msg {
        Message::Hello { seqno } => {
            slaves.entry(from).or_default();
            debug!(%from, "slave HELLO");
            socket.send_to(&Message::Hello { seqno }.pack(), from)?;
        }
        Message::Ready { .. } => {
            if let Some(state) = slaves.get_mut(&from) {
                state.ready = true;
                debug!(%from, "slave READY");
            }
        }
        Message::Pong { seqno } => {
            if let Some(state) = slaves.get_mut(&from) {
                if state.last_ping_seqno == seqno {
                    if let Some(sent) = state.last_ping_sent {
                        state.rtt_estimate = sent.elapsed();
                    }
                }
            }
        }
        Message::Go { .. } | Message::Ping { .. } => {
            debug!(%from, "ignoring master-originated message type received by master");
        }
    }

    Ok(())
}
