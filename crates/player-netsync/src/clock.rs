//! [`NetsyncTimer`]: a `player_core::driver::Timer` backed by the
//! master/slave barrier, so the display scheduler can pace itself
//! against a clock shared across a fleet of players instead of its own
//! wall clock.

use crate::error::NetsyncError;
use crate::{master, slave};
use player_core::driver::Timer;
use player_core::error::{PlayerError, Result as PlayerResult};
use player_core::Semaphore;
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, SystemTime};

impl From<NetsyncError> for PlayerError {
    fn from(e: NetsyncError) -> Self {
        PlayerError::ProtocolError(e.to_string())
    }
}

const DEFAULT_BIND_PORT: u16 = 9999;

#[derive(Debug, Clone, Copy)]
enum Role {
    Master { expected_slaves: usize },
    Slave { master_addr: SocketAddr },
}

/// Wraps a malformed-spec message in [`NetsyncError::InvalidSpec`] before
/// surfacing it as the usual [`PlayerError::UsageError`], so spec-parsing
/// failures are constructed through the netsync crate's own error type
/// rather than bypassing it.
fn invalid_spec(msg: impl Into<String>) -> PlayerError {
    PlayerError::usage(NetsyncError::InvalidSpec(msg.into()).to_string())
}

fn parse_params(params: Option<&str>) -> PlayerResult<(Role, Option<u16>)> {
    let params = params.ok_or_else(|| {
        invalid_spec("netsync timer requires params: s=<slave count> or m=<host:port>[,p=<port>]")
    })?;

    let mut role = None;
    let mut port = None;

    for kv in params.split(',') {
        let (k, v) = kv
            .split_once('=')
            .ok_or_else(|| invalid_spec(format!("invalid netsync param '{kv}'")))?;
        match k {
            "s" => {
                let n: usize = v
                    .parse()
                    .map_err(|_| invalid_spec(format!("invalid slave count '{v}'")))?;
                role = Some(Role::Master { expected_slaves: n });
            }
            "m" => {
                let addr: SocketAddr = v
                    .parse()
                    .map_err(|_| invalid_spec(format!("invalid master address '{v}'")))?;
                role = Some(Role::Slave { master_addr: addr });
            }
            "p" => {
                let p: u16 = v
                    .parse()
                    .map_err(|_| invalid_spec(format!("invalid port '{v}'")))?;
                port = Some(p);
            }
            other => return Err(invalid_spec(format!("unknown netsync param '{other}'"))),
        }
    }

    let role = role.ok_or_else(|| invalid_spec("netsync timer requires s=<slave count> or m=<host:port>"))?;
    Ok((role, port))
}

fn apply_offset(now: SystemTime, offset_nanos: i64) -> SystemTime {
    if offset_nanos >= 0 {
        now + Duration::from_nanos(offset_nanos as u64)
    } else {
        now - Duration::from_nanos((-offset_nanos) as u64)
    }
}

/// Timer driver that synchronizes playback start and clock offset over
/// UDP with `player-netsync`'s master/slave barrier. Registered under
/// the name `"netsync"`; resolved as `netsync:s=3` (master, expects 3
/// slaves) or `netsync:m=10.0.0.5:9999` (slave, connects to that
/// master), with an optional `,p=<port>` to override the local bind
/// port.
pub struct NetsyncTimer {
    role: Option<Role>,
    bind_port: u16,
    socket: Option<UdpSocket>,
    offset_nanos: AtomicI64,
    cancel: Semaphore,
    stop: AtomicBool,
}

impl Default for NetsyncTimer {
    fn default() -> Self {
        Self {
            role: None,
            bind_port: DEFAULT_BIND_PORT,
            socket: None,
            offset_nanos: AtomicI64::new(0),
            cancel: Semaphore::new(0),
            stop: AtomicBool::new(false),
        }
    }
}

impl NetsyncTimer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Timer for NetsyncTimer {
    fn open(&mut self, params: Option<&str>) -> PlayerResult<()> {
        let (role, port_override) = parse_params(params)?;
        self.role = Some(role);
        if let Some(p) = port_override {
            self.bind_port = p;
        }

        let socket = UdpSocket::bind(("0.0.0.0", self.bind_port))?;
        self.socket = Some(socket);
        Ok(())
    }

    fn start(&mut self) -> PlayerResult<SystemTime> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| PlayerError::usage("netsync timer used before open()"))?;
        let role = self
            .role
            .ok_or_else(|| PlayerError::usage("netsync timer used before open()"))?;

        match role {
            Role::Master { expected_slaves } => {
                let start_time = master::run_barrier(socket, expected_slaves, &self.stop)?;
                self.offset_nanos.store(0, Ordering::Relaxed);
                Ok(start_time)
            }
            Role::Slave { master_addr } => {
                let (start_time, offset) = slave::run_barrier(socket, master_addr, &self.stop)?;
                self.offset_nanos.store(offset, Ordering::Relaxed);
                Ok(start_time)
            }
        }
    }

    fn read(&self) -> SystemTime {
        apply_offset(SystemTime::now(), self.offset_nanos.load(Ordering::Relaxed))
    }

    fn wait(&self, deadline: SystemTime) -> bool {
        // `cancel` is posted only by `close`; inverting its result turns
        // "a cancellation arrived before the deadline" into "the
        // deadline was *not* reached normally".
        !self.cancel.wait_until(deadline)
    }

    fn close(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        self.cancel.post();
    }
}
