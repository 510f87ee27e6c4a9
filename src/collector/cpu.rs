//! CPU time and frequency collector (§4.7a), grounded on `original_source/cpu.c`.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::{label, Sink};
use crate::syscalls;

const MODES: [&str; 8] = [
    "user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal",
];

pub struct CpuCollector {
    clock_tick: i64,
}

impl CpuCollector {
    pub fn new() -> Self {
        Self { clock_tick: 100 }
    }

    /// Test-only constructor injecting a clock tick rate instead of calling
    /// `sysconf(_SC_CLK_TCK)` (§4.9).
    #[cfg(test)]
    pub fn with_clock_tick(clock_tick: i64) -> Self {
        Self { clock_tick }
    }
}

impl Default for CpuCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for CpuCollector {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn init(&mut self, _args: &[String]) -> Result<(), LaunchError> {
        self.clock_tick = syscalls::real_clock_tick()
            .map_err(|_| LaunchError::CollectorInit("cpu".to_string()))?;
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_stat(sink, self.clock_tick, "/proc/stat");
        collect_freq(sink, "/sys/devices/system/cpu");
    }
}

fn collect_stat(sink: &mut Sink<'_>, clock_tick: i64, path: &str) {
    let Ok(f) = File::open(path) else { return };
    for line in BufReader::new(f).lines().map_while(Result::ok) {
        let Some(rest) = line.strip_prefix("cpu") else { continue };
        let Some(first) = rest.as_bytes().first() else { continue };
        if !first.is_ascii_digit() {
            continue;
        }
        let mut parts = rest.split_whitespace();
        let Some(cpu_id) = parts.next() else { continue };
        for (mode, value) in MODES.iter().zip(parts) {
            let Ok(raw) = value.parse::<f64>() else { break };
            sink.emit(
                "node_cpu_seconds_total",
                &[label("cpu", cpu_id), label("mode", mode)],
                raw / clock_tick as f64,
            );
        }
    }
}

fn collect_freq(sink: &mut Sink<'_>, cpu_root: &str) {
    for cpu in 0.. {
        let path = format!("{cpu_root}/cpu{cpu}/cpufreq/scaling_cur_freq");
        let Ok(contents) = std::fs::read_to_string(&path) else { break };
        let Ok(khz) = contents.trim_end().parse::<f64>() else { continue };
        sink.emit(
            "node_cpu_frequency_hertz",
            &[label("cpu", &cpu.to_string())],
            khz * 1000.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;
    use std::io::Write;

    #[test]
    fn collect_stat_emits_per_mode_samples() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat");
        let mut f = File::create(&path).unwrap();
        writeln!(f, "cpu  10 20 30 40 50 60 70 80").unwrap();
        writeln!(f, "cpu0 5 5 5 5 5 5 5 5").unwrap();

        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_stat(&mut sink, 100, path.to_str().unwrap());
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert!(body.contains(r#"node_cpu_seconds_total{cpu="",mode="user"} 0.1"#));
        assert!(body.contains(r#"node_cpu_seconds_total{cpu="0",mode="user"} 0.05"#));
    }

    #[test]
    fn collect_stat_missing_file_emits_nothing() {
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_stat(&mut sink, 100, "/nonexistent/path/stat");
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn collect_freq_reads_sequential_cpu_dirs() {
        let dir = tempfile::tempdir().unwrap();
        for cpu in 0..2 {
            let cpufreq_dir = dir.path().join(format!("cpu{cpu}/cpufreq"));
            std::fs::create_dir_all(&cpufreq_dir).unwrap();
            std::fs::write(cpufreq_dir.join("scaling_cur_freq"), "1800000\n").unwrap();
        }
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_freq(&mut sink, dir.path().to_str().unwrap());
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert!(body.contains(r#"node_cpu_frequency_hertz{cpu="0"} 1800000000"#));
        assert!(body.contains(r#"node_cpu_frequency_hertz{cpu="1"} 1800000000"#));
    }

    #[test]
    fn collect_freq_stops_at_first_missing_cpu() {
        let dir = tempfile::tempdir().unwrap();
        let cpufreq_dir = dir.path().join("cpu0/cpufreq");
        std::fs::create_dir_all(&cpufreq_dir).unwrap();
        std::fs::write(cpufreq_dir.join("scaling_cur_freq"), "1000000\n").unwrap();
        // cpu1 deliberately absent; cpu2 present but must never be reached.
        let cpu2 = dir.path().join("cpu2/cpufreq");
        std::fs::create_dir_all(&cpu2).unwrap();
        std::fs::write(cpu2.join("scaling_cur_freq"), "2000000\n").unwrap();

        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_freq(&mut sink, dir.path().to_str().unwrap());
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert!(body.contains(r#"cpu="0""#));
        assert!(!body.contains(r#"cpu="2""#));
    }
}
