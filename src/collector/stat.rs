//! Kernel counter collector (§4.7g), grounded on `original_source/stat.c`.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::Sink;

const METRICS: [(&str, &str); 6] = [
    ("node_boot_time_seconds", "btime "),
    ("node_context_switches_total", "ctxt "),
    ("node_forks_total", "processes "),
    ("node_intr_total", "intr "),
    ("node_procs_blocked", "procs_blocked "),
    ("node_procs_running", "procs_running "),
];

pub struct StatCollector;

impl StatCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StatCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for StatCollector {
    fn name(&self) -> &'static str {
        "stat"
    }

    fn init(&mut self, _args: &[String]) -> Result<(), LaunchError> {
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, "/proc/stat");
    }
}

fn collect_from(sink: &mut Sink<'_>, path: &str) {
    let Ok(f) = File::open(path) else { return };
    for line in BufReader::new(f).lines().map_while(Result::ok) {
        for (name, key) in METRICS {
            let Some(rest) = line.strip_prefix(key) else { continue };
            // Only the leading token is a value; `intr` lines trail with per-IRQ
            // counts that are never part of the emitted total.
            if let Some(token) = rest.split_whitespace().next() {
                if let Ok(value) = token.parse::<f64>() {
                    sink.emit(name, &[], value);
                }
            }
            break;
        }
    }
}
