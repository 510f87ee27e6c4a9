//! Collector interface and the fixed, process-lifetime registry of collectors
//! (§4.4, §9 redesign note: modeled as a trait-object registry instead of a
//! function-pointer table plus void-pointer ctx, echoing `AmakeSashaDev-maker_web`'s
//! `Handler<S>` trait-dispatch pattern).

pub mod cpu;
pub mod diskstats;
pub mod filesystem;
pub mod hwmon;
pub mod meminfo;
pub mod netdev;
pub mod stat;
pub mod textfile;
pub mod uname;

use crate::errors::LaunchError;
use crate::sink::Sink;

/// A named producer of metric samples from a specific host source (§4.4, §4.7).
pub trait Collector: Send {
    /// Stable name, used both for flag matching (`--<name>-...`) and log messages.
    fn name(&self) -> &'static str;

    /// Whether `--<name>-<argname>[=<val>]` flags are meaningful for this collector.
    fn has_args(&self) -> bool {
        false
    }

    /// Called once, at startup, with any `--<name>-<arg>` flag fragments collected
    /// for this collector (in CLI order). Failure is fatal to the launcher (§4.4,
    /// §7 Startup-fatal).
    fn init(&mut self, args: &[String]) -> Result<(), LaunchError>;

    /// Called once per scrape. Must not block on anything but its own source files,
    /// must be idempotent, and must treat missing sources as "no samples" (§4.7).
    fn collect(&self, sink: &mut Sink<'_>);
}

/// Registration order fixed at build time (§2, §4.8): `cpu, diskstats, filesystem,
/// hwmon, meminfo, netdev, stat, textfile, uname`. This is also the enablement-flag
/// match order used by the launcher when resolving `--<name>-...` fragments.
pub fn all_collectors() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(cpu::CpuCollector::new()),
        Box::new(diskstats::DiskstatsCollector::new()),
        Box::new(filesystem::FilesystemCollector::new()),
        Box::new(hwmon::HwmonCollector::new()),
        Box::new(meminfo::MeminfoCollector::new()),
        Box::new(netdev::NetdevCollector::new()),
        Box::new(stat::StatCollector::new()),
        Box::new(textfile::TextfileCollector::new()),
        Box::new(uname::UnameCollector::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_order_matches_fixed_sequence() {
        let names: Vec<_> = all_collectors().iter().map(|c| c.name()).collect();
        assert_eq!(
            names,
            vec![
                "cpu",
                "diskstats",
                "filesystem",
                "hwmon",
                "meminfo",
                "netdev",
                "stat",
                "textfile",
                "uname",
            ]
        );
    }
}
