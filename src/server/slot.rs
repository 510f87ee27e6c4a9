//! Per-connection state machine (§3 Request slot, §4.6), grounded on the
//! `HttpConnection`/`Connection` split in `AmakeSashaDev-maker_web`, rebuilt around a
//! single-threaded, nonblocking socket instead of a tokio-driven one: there is no async
//! task per connection here, only a state value advanced by the event loop on each
//! wake-up.

use std::time::Instant;

use mio::net::TcpStream;

use crate::buffer::ByteBuffer;
use crate::collector::Collector;
use crate::config::limits;
use crate::errors::ErrorKind;
use crate::http::request::{Progress, RequestParser};
use crate::http::response::Outcome;
use crate::sink::Sink;

/// What a slot is currently doing (§3). `WriteHeaders` only ever carries the fixed
/// `200 OK` prelude; a rejected request goes straight to `WriteError`, which writes
/// the self-contained `400 Bad Request` template in one shot.
pub enum Phase {
    Read(RequestParser),
    WriteHeaders,
    WriteMetrics { collector_idx: usize },
    WriteError,
}

/// `Phase` without its payload, cheap to read for dispatch without holding a borrow
/// of the payload across a match arm that also needs to mutate the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseKind {
    Read,
    WriteHeaders,
    WriteMetrics,
    WriteError,
}

/// An active connection. `None` slots in the server's array are INACTIVE (§3).
pub struct Slot {
    pub socket: TcpStream,
    pub buf: ByteBuffer,
    pub phase: Phase,
    /// Byte offset into the current outgoing slice (either `buf` or a constant
    /// response prelude) that has already been written.
    pub written: usize,
    pub deadline: Instant,
}

impl Slot {
    pub fn accept(socket: TcpStream, now: Instant, initial_buf: ByteBuffer) -> Self {
        Self {
            socket,
            buf: initial_buf,
            phase: Phase::Read(RequestParser::new()),
            written: 0,
            deadline: now + limits::REQUEST_TIMEOUT,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    pub fn phase_kind(&self) -> PhaseKind {
        match self.phase {
            Phase::Read(_) => PhaseKind::Read,
            Phase::WriteHeaders => PhaseKind::WriteHeaders,
            Phase::WriteMetrics { .. } => PhaseKind::WriteMetrics,
            Phase::WriteError => PhaseKind::WriteError,
        }
    }

    /// Feeds freshly-read bytes into the request parser. Returns the outcome so the
    /// caller can transition the slot (§4.5, §4.6).
    pub fn feed(&mut self, chunk: &[u8]) -> Progress {
        let Phase::Read(parser) = &mut self.phase else {
            unreachable!("feed called outside READ phase")
        };
        self.buf.append_bytes(chunk);
        parser.advance(self.buf.view())
    }

    /// Transitions READ → WRITE_HEADERS, loading the fixed `200 OK` prelude as the
    /// outgoing slice and clearing the request buffer for reuse (§4.6).
    pub fn begin_response(&mut self) {
        self.buf.reset();
        self.written = 0;
        self.phase = Phase::WriteHeaders;
    }

    /// The bytes still to be written for the current phase.
    pub fn outgoing(&self) -> &[u8] {
        match &self.phase {
            Phase::WriteHeaders => &Outcome::Ok.headers()[self.written..],
            Phase::WriteError => &Outcome::BadRequest.headers()[self.written..],
            Phase::WriteMetrics { .. } => &self.buf.view()[self.written..],
            Phase::Read(_) => &[],
        }
    }

    /// Records that `n` more bytes of the current outgoing slice were written.
    pub fn advance_written(&mut self, n: usize) {
        self.written += n;
    }

    pub fn outgoing_drained(&self) -> bool {
        self.outgoing().is_empty()
    }

    /// Runs one collector into the request buffer, publishing it as the new outgoing
    /// slice if non-empty (§4.6). Returns `true` if there is more to write.
    pub fn run_next_collector(&mut self, collectors: &[Box<dyn Collector>]) -> bool {
        let Phase::WriteMetrics { collector_idx } = &mut self.phase else {
            unreachable!("run_next_collector called outside WRITE_METRICS")
        };
        while *collector_idx < collectors.len() {
            self.buf.reset();
            self.written = 0;
            {
                let mut sink = Sink::new(&mut self.buf, true);
                collectors[*collector_idx].collect(&mut sink);
            }
            *collector_idx += 1;
            if !self.buf.is_empty() {
                return true;
            }
        }
        false
    }

    pub fn fail(&mut self, kind: ErrorKind) {
        tracing::debug!(reason = %kind, "rejecting request");
        self.buf.reset();
        self.written = 0;
        self.phase = Phase::WriteError;
    }
}
