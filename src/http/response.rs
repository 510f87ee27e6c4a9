//! The two fixed response templates this server ever produces (§4.5, §6).
//!
//! Grounded on `AmakeSashaDev-maker_web`'s `errors.rs` `http_errors!` const-byte-template
//! idiom and on `Response::reset`'s capacity-reuse-vs-reallocate logic, pared down: there is no
//! builder here, because there are only ever two outcomes (accept/reject) and no
//! request body, headers, or keep-alive to negotiate.

use crate::errors;

/// Which of the two fixed response shapes a slot is currently writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    BadRequest,
}

impl Outcome {
    /// The fixed header prelude for this outcome. For `Ok`, the metric body follows,
    /// written separately by the collector dispatch loop (§4.6).
    pub fn headers(self) -> &'static [u8] {
        match self {
            Outcome::Ok => errors::OK_HEADERS,
            Outcome::BadRequest => errors::BAD_REQUEST,
        }
    }
}
