//! Single configuration surface assembled once by the launcher (§1.1, §3 Config).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub foreground: bool,
    pub pidfile: Option<PathBuf>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 9100,
            foreground: false,
            pidfile: None,
            log_level: "info".to_string(),
        }
    }
}

/// Compile-time server resource bounds (§5).
pub mod limits {
    /// Maximum in-flight request slots (R).
    pub const MAX_SLOTS: usize = 16;
    /// Maximum resolved listen addresses (L).
    pub const MAX_LISTENERS: usize = 4;
    /// Listen backlog (B).
    pub const LISTEN_BACKLOG: i32 = 16;
    /// Per-request buffer ceiling.
    pub const MAX_BUFFER: usize = 64 * 1024;
    /// Initial per-request buffer allocation.
    pub const INITIAL_BUFFER: usize = 1024;
    /// Per-connection absolute deadline from accept.
    pub const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
    /// Parser field limits (§4.5).
    pub const MAX_METHOD_LEN: usize = 16;
    pub const MAX_PATH_LEN: usize = 128;
    pub const MAX_VERSION_LEN: usize = 16;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_wire_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.port, 9100);
        assert!(!cfg.foreground);
        assert!(cfg.pidfile.is_none());
    }
}
