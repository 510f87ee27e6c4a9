//! Error taxonomy (§7): startup-fatal conditions get a `thiserror` enum surfaced to
//! `main`; connection-local conditions get a small `Copy` enum with no heap payload,
//! mirroring `AmakeSashaDev-maker_web`'s `ErrorKind` + `http_errors!` const-response-template
//! idiom but pared to the two outcomes this wire protocol actually has.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Startup-fatal errors. Any of these abort the launcher before the server starts.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),

    #[error("collector {collector} takes no arguments (got {arg})")]
    UnexpectedCollectorArg { collector: String, arg: String },

    #[error("failed to initialize collector {0}")]
    CollectorInit(String),

    #[error("could not bind to port {port} on any resolved address")]
    BindFailed { port: u16 },

    #[error("daemonize: {0}")]
    Daemonize(#[source] io::Error),

    #[error("could not write pidfile {path}: {source}")]
    PidFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Connection-local HTTP parse outcome (§4.5, §7). Carries no data: the parser only
/// ever needs to decide accept-vs-reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidMethod,
    InvalidPath,
    InvalidVersion,
    MalformedHeaders,
    Timeout,
    Io,
}

/// Fixed `400 Bad Request` response bytes, `Connection: close` (§4.5, §6).
pub const BAD_REQUEST: &[u8] = concat!(
    "HTTP/1.1 400 Bad Request\r\n",
    "connection: close\r\n",
    "content-type: text/plain; charset=UTF-8\r\n",
    "server: nano-exporter\r\n",
    "\r\n",
    "bad request\n",
)
.as_bytes();

/// Fixed `200 OK` header prelude; the metric body follows, written separately by the
/// collector dispatch loop (§4.6).
pub const OK_HEADERS: &[u8] = concat!(
    "HTTP/1.1 200 OK\r\n",
    "connection: close\r\n",
    "content-type: text/plain; charset=UTF-8\r\n",
    "server: nano-exporter\r\n",
    "\r\n",
)
.as_bytes();

impl ErrorKind {
    /// Short, stable, human-readable reason string (never sent over the wire; used
    /// only for `tracing::debug!` diagnostics per §7's "logged at debug" policy).
    pub const fn reason(self) -> &'static str {
        match self {
            ErrorKind::InvalidMethod => "invalid method",
            ErrorKind::InvalidPath => "invalid path",
            ErrorKind::InvalidVersion => "invalid version",
            ErrorKind::MalformedHeaders => "malformed headers",
            ErrorKind::Timeout => "timed out",
            ErrorKind::Io => "io error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.reason())
    }
}

impl std::error::Error for ErrorKind {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_request_template_is_well_formed() {
        let s = std::str::from_utf8(BAD_REQUEST).unwrap();
        assert!(s.starts_with("HTTP/1.1 400 Bad Request\r\n"));
        assert!(s.ends_with("bad request\n"));
        assert!(s.contains("connection: close"));
    }

    #[test]
    fn ok_headers_have_no_content_length() {
        let s = std::str::from_utf8(OK_HEADERS).unwrap();
        assert!(s.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(!s.contains("content-length"));
        assert!(s.ends_with("\r\n\r\n"));
    }

    #[test]
    fn error_kind_reasons_are_distinct() {
        let kinds = [
            ErrorKind::InvalidMethod,
            ErrorKind::InvalidPath,
            ErrorKind::InvalidVersion,
            ErrorKind::MalformedHeaders,
            ErrorKind::Timeout,
            ErrorKind::Io,
        ];
        let mut reasons: Vec<_> = kinds.iter().map(|k| k.reason()).collect();
        reasons.sort_unstable();
        reasons.dedup();
        assert_eq!(reasons.len(), kinds.len());
    }
}
