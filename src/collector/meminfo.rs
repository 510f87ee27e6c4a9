//! Memory-info collector (§4.7e), grounded on `original_source/meminfo.c`.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::Sink;

pub struct MeminfoCollector;

impl MeminfoCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MeminfoCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for MeminfoCollector {
    fn name(&self) -> &'static str {
        "meminfo"
    }

    fn init(&mut self, _args: &[String]) -> Result<(), LaunchError> {
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, "/proc/meminfo");
    }
}

fn collect_from(sink: &mut Sink<'_>, path: &str) {
    let Ok(f) = File::open(path) else { return };
    for line in BufReader::new(f).lines().map_while(Result::ok) {
        let Some((key, rest)) = line.split_once(':') else { continue };
        let metric_key: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        let metric_key = metric_key.trim_end_matches('_');
        if metric_key.is_empty() {
            continue;
        }

        let rest = rest.trim_start();
        let (number_part, after) = match rest.find(|c: char| c != '.' && c != '-' && !c.is_ascii_digit()) {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        // The original only accepts a value immediately followed by end-of-line,
        // a space, or nothing else; anything else means the whole line is malformed.
        if !(after.is_empty() || after.starts_with(' ')) {
            continue;
        }
        let Ok(mut value) = number_part.parse::<f64>() else { continue };
        let unit_part = after.trim_start();

        let (metric_name, is_bytes) = if unit_part.starts_with("kB") {
            (format!("node_memory_{metric_key}_bytes"), true)
        } else {
            (format!("node_memory_{metric_key}"), false)
        };
        if is_bytes {
            value *= 1024.0;
        }
        sink.emit(&metric_name, &[], value);
    }
}
