//! nano-exporter - a minimal, resource-frugal Prometheus-style metrics exporter
//! for Linux hosts.
//!
//! A single-threaded, event-driven HTTP server that answers `GET /metrics` with
//! a fixed set of host metrics (CPU, memory, disks, filesystems, network
//! interfaces, hardware sensors, kernel identity) plus any textfile-collector
//! output, scraped fresh on every request. No background sampling, no metric
//! registry, no persistent state beyond what each collector reads from the
//! host at scrape time.

pub mod buffer;
pub mod collector;
pub mod config;
pub mod daemonize;
pub mod errors;
pub mod http {
    pub mod request;
    pub mod response;
}
pub mod launcher;
pub mod server;
pub mod sink;
pub mod strlist;
pub mod syscalls;

pub use config::Config;
pub use errors::LaunchError;

/// Installs the `tracing` subscriber, honoring `RUST_LOG` if set and otherwise
/// filtering at `log_level` (§1.1, §6).
pub fn init_logging(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
