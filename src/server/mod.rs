//! Single-threaded, event-driven scrape server (§4.6), grounded on the accept/poll
//! loop shape in `AmakeSashaDev-maker_web`'s `server/server.rs` but rebuilt on `mio`
//! instead of tokio: one process, one `Poll`, a fixed-capacity slot array, no tasks.

pub mod slot;

use std::io::{self, ErrorKind as IoErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::time::{Duration, Instant};

use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use socket2::{Domain, Protocol, Socket, Type};

use crate::buffer::ByteBuffer;
use crate::collector::Collector;
use crate::config::{limits, Config};
use crate::errors::LaunchError;
use crate::http::request::Progress;
use crate::server::slot::{Phase, PhaseKind, Slot};

const LISTENER_TOKEN_BASE: usize = 0;
const SLOT_TOKEN_BASE: usize = limits::MAX_LISTENERS;

fn bind_listener(addr: SocketAddr) -> io::Result<StdTcpListener> {
    let domain = if addr.is_ipv6() { Domain::IPV6 } else { Domain::IPV4 };
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    if addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.bind(&addr.into())?;
    socket.listen(limits::LISTEN_BACKLOG)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Resolves the configured port to concrete listen addresses and binds each (§4.6).
/// At most `MAX_LISTENERS` addresses are attempted; fails if none bind.
fn bind_all(port: u16) -> Result<Vec<TcpListener>, LaunchError> {
    let candidates: [SocketAddr; 2] = [
        SocketAddr::new(std::net::Ipv4Addr::UNSPECIFIED.into(), port),
        SocketAddr::new(std::net::Ipv6Addr::UNSPECIFIED.into(), port),
    ];

    let mut listeners = Vec::new();
    for addr in candidates {
        match bind_listener(addr) {
            Ok(std_listener) => listeners.push(TcpListener::from_std(std_listener)),
            Err(e) => tracing::debug!(%addr, error = %e, "failed to bind listen address"),
        }
    }

    if listeners.is_empty() {
        return Err(LaunchError::BindFailed { port });
    }
    Ok(listeners)
}

/// Listeners bound and registered with a poll instance, ready to be handed across a
/// `daemonize()` call (§4.8/§4.8a: binding must happen before the double fork, since a
/// bind failure after detaching from the terminal would be invisible to the operator).
pub struct Bound {
    poll: Poll,
    listeners: Vec<TcpListener>,
}

/// Resolves and binds the configured port, registering every listener with a fresh
/// `Poll` instance. Must be called before `daemonize()`: the bound sockets (and the
/// `Poll`'s epoll fd) are ordinary file descriptors and survive `fork()` untouched,
/// while `daemonize()` only closes fds 0/1/2.
pub fn bind(config: &Config) -> Result<Bound, LaunchError> {
    let mut listeners = bind_all(config.port)?;
    let poll = Poll::new().map_err(|_| LaunchError::BindFailed { port: config.port })?;

    for (i, listener) in listeners.iter_mut().enumerate() {
        poll.registry()
            .register(listener, Token(LISTENER_TOKEN_BASE + i), Interest::READABLE)
            .map_err(|_| LaunchError::BindFailed { port: config.port })?;
    }

    Ok(Bound { poll, listeners })
}

/// Runs the scrape server until the process is terminated. Never returns `Ok` in
/// normal operation; only returns on a fatal setup error.
pub fn run(bound: Bound, config: &Config, collectors: &[Box<dyn Collector>]) -> Result<(), LaunchError> {
    let Bound { mut poll, mut listeners } = bound;

    let mut slots: Vec<Option<Slot>> = (0..limits::MAX_SLOTS).map(|_| None).collect();
    let mut events = Events::with_capacity(limits::MAX_SLOTS + limits::MAX_LISTENERS);
    // Reclaimed from slot 0 on close and handed back the next time slot 0 is filled,
    // so the hot slot never reallocates its buffer in steady state (§3, §4.6).
    let mut spare_buf: Option<ByteBuffer> = None;

    tracing::info!(port = config.port, "listening");

    loop {
        let timeout = next_timeout(&slots);
        if let Err(e) = poll.poll(&mut events, timeout) {
            if e.kind() == IoErrorKind::Interrupted {
                continue;
            }
            return Err(LaunchError::BindFailed { port: config.port });
        }

        let now = Instant::now();

        for event in events.iter() {
            let idx = event.token().0;
            if idx < SLOT_TOKEN_BASE {
                accept_connections(&mut listeners[idx], &mut slots, &poll, now, &mut spare_buf);
            }
        }

        // Sweep every active slot each iteration: timeouts need checking even when
        // no event fired for them this round, and advancing one slot's state can
        // make progress possible without a fresh readiness notification (e.g. the
        // synthetic first-read after accept).
        for slot_idx in 0..slots.len() {
            advance_slot(slot_idx, &mut slots, &poll, collectors, now, &mut spare_buf);
        }

        compact(&mut slots, &poll);
    }
}

fn next_timeout(slots: &[Option<Slot>]) -> Option<Duration> {
    let now = Instant::now();
    slots
        .iter()
        .flatten()
        .map(|s| s.deadline.saturating_duration_since(now))
        .min()
}

fn accept_connections(
    listener: &mut TcpListener,
    slots: &mut [Option<Slot>],
    poll: &Poll,
    now: Instant,
    spare_buf: &mut Option<ByteBuffer>,
) {
    loop {
        let (stream, _addr) = match listener.accept() {
            Ok(pair) => pair,
            Err(e) if e.kind() == IoErrorKind::WouldBlock => return,
            Err(_) => return,
        };
        let Some(free_idx) = slots.iter().position(Option::is_none) else {
            drop(stream);
            continue;
        };
        place_slot(slots, poll, free_idx, stream, now, spare_buf);
    }
}

fn place_slot(
    slots: &mut [Option<Slot>],
    poll: &Poll,
    idx: usize,
    mut stream: TcpStream,
    now: Instant,
    spare_buf: &mut Option<ByteBuffer>,
) {
    if poll
        .registry()
        .register(&mut stream, Token(SLOT_TOKEN_BASE + idx), Interest::READABLE | Interest::WRITABLE)
        .is_err()
    {
        return;
    }
    // Slot 0 keeps its buffer across connections to avoid steady-state reallocation
    // (§3, §4.6); every other slot allocates fresh and releases it on close.
    let buf = if idx == 0 {
        spare_buf
            .take()
            .unwrap_or_else(|| ByteBuffer::new(limits::INITIAL_BUFFER, limits::MAX_BUFFER))
    } else {
        ByteBuffer::new(limits::INITIAL_BUFFER, limits::MAX_BUFFER)
    };
    slots[idx] = Some(Slot::accept(stream, now, buf));
}

fn advance_slot(
    idx: usize,
    slots: &mut [Option<Slot>],
    poll: &Poll,
    collectors: &[Box<dyn Collector>],
    now: Instant,
    spare_buf: &mut Option<ByteBuffer>,
) {
    if slots[idx].is_none() {
        return;
    }
    if slots[idx].as_ref().unwrap().is_expired(now) {
        close_slot(slots, poll, idx, spare_buf);
        return;
    }

    loop {
        match slots[idx].as_ref().unwrap().phase_kind() {
            PhaseKind::Read => {
                let mut chunk = [0u8; 4096];
                match slots[idx].as_mut().unwrap().socket.read(&mut chunk) {
                    Ok(0) => {
                        close_slot(slots, poll, idx, spare_buf);
                        return;
                    }
                    Ok(n) => {
                        let progress = slots[idx].as_mut().unwrap().feed(&chunk[..n]);
                        match progress {
                            Progress::NeedMore => continue,
                            Progress::Accepted => slots[idx].as_mut().unwrap().begin_response(),
                            Progress::Rejected(kind) => slots[idx].as_mut().unwrap().fail(kind),
                        }
                    }
                    Err(e) if e.kind() == IoErrorKind::WouldBlock => return,
                    Err(_) => {
                        close_slot(slots, poll, idx, spare_buf);
                        return;
                    }
                }
            }
            PhaseKind::WriteHeaders | PhaseKind::WriteMetrics | PhaseKind::WriteError => {
                let remaining = slots[idx].as_ref().unwrap().outgoing().to_vec();
                if remaining.is_empty() {
                    if !drain_complete(slots, poll, collectors, idx, spare_buf) {
                        return;
                    }
                    continue;
                }
                match slots[idx].as_mut().unwrap().socket.write(&remaining) {
                    Ok(0) => {
                        close_slot(slots, poll, idx, spare_buf);
                        return;
                    }
                    Ok(n) => {
                        slots[idx].as_mut().unwrap().advance_written(n);
                        if !slots[idx].as_ref().unwrap().outgoing_drained() {
                            return;
                        }
                        if !drain_complete(slots, poll, collectors, idx, spare_buf) {
                            return;
                        }
                    }
                    Err(e) if e.kind() == IoErrorKind::WouldBlock => return,
                    Err(_) => {
                        close_slot(slots, poll, idx, spare_buf);
                        return;
                    }
                }
            }
        }
    }
}

/// Called once the current outgoing slice has fully drained. Performs the
/// WRITE_HEADERS → WRITE_METRICS and WRITE_ERROR/WRITE_METRICS-exhausted → close
/// transitions (§4.6). Returns `true` if the slot is still alive and should keep
/// being advanced this iteration.
fn drain_complete(
    slots: &mut [Option<Slot>],
    poll: &Poll,
    collectors: &[Box<dyn Collector>],
    idx: usize,
    spare_buf: &mut Option<ByteBuffer>,
) -> bool {
    match slots[idx].as_ref().unwrap().phase_kind() {
        PhaseKind::WriteError => {
            close_slot(slots, poll, idx, spare_buf);
            false
        }
        PhaseKind::WriteHeaders => {
            slots[idx].as_mut().unwrap().phase = Phase::WriteMetrics { collector_idx: 0 };
            true
        }
        PhaseKind::WriteMetrics => {
            if slots[idx].as_mut().unwrap().run_next_collector(collectors) {
                true
            } else {
                close_slot(slots, poll, idx, spare_buf);
                false
            }
        }
        PhaseKind::Read => unreachable!("drain_complete called while reading"),
    }
}

/// Deregisters and drops the slot. For slot 0, the buffer is reclaimed into
/// `spare_buf` instead of being dropped with the rest of the `Slot`, so the next
/// connection placed into slot 0 can reuse the allocation (§3, §4.6).
fn close_slot(slots: &mut [Option<Slot>], poll: &Poll, idx: usize, spare_buf: &mut Option<ByteBuffer>) {
    if let Some(mut slot) = slots[idx].take() {
        let _ = poll.registry().deregister(&mut slot.socket);
        if idx == 0 {
            slot.buf.reset();
            *spare_buf = Some(slot.buf);
        }
    }
}

/// Compacts the active-descriptor run (§3, §4.6): not load-bearing for `mio` (there
/// is no flat pollfd array to shrink), kept as a no-op hook for symmetry with the
/// slot-array invariant described in the data model.
fn compact(_slots: &mut [Option<Slot>], _poll: &Poll) {}
