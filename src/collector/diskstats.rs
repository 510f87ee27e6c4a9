//! Disk I/O counters collector (§4.7b), grounded on `original_source/diskstats.c`.

use std::fs::File;
use std::io::{BufRead, BufReader};

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::{label, Sink};
use crate::strlist::StrList;

const SECTOR_SIZE: f64 = 512.0;

const COLUMNS: [(&str, f64); 15] = [
    ("node_disk_reads_completed_total", 1.0),
    ("node_disk_reads_merged_total", 1.0),
    ("node_disk_read_bytes_total", SECTOR_SIZE),
    ("node_disk_read_time_seconds_total", 0.001),
    ("node_disk_writes_completed_total", 1.0),
    ("node_disk_writes_merged_total", 1.0),
    ("node_disk_written_bytes_total", SECTOR_SIZE),
    ("node_disk_write_time_seconds_total", 0.001),
    ("node_disk_io_now", 1.0),
    ("node_disk_io_time_seconds_total", 0.001),
    ("node_disk_io_time_weighted_seconds_total", 0.001),
    ("node_disk_discards_completed_total", 1.0),
    ("node_disk_discards_merged_total", 1.0),
    ("node_disk_discarded_sectors_total", 1.0),
    ("node_disk_discard_time_seconds_total", 0.001),
];

pub struct DiskstatsCollector {
    include: StrList,
    exclude: StrList,
    filter_unused: bool,
}

impl DiskstatsCollector {
    pub fn new() -> Self {
        Self {
            include: StrList::new(),
            exclude: StrList::new(),
            filter_unused: true,
        }
    }
}

impl Default for DiskstatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for DiskstatsCollector {
    fn name(&self) -> &'static str {
        "diskstats"
    }

    fn has_args(&self) -> bool {
        true
    }

    fn init(&mut self, args: &[String]) -> Result<(), LaunchError> {
        for arg in args {
            if let Some(csv) = arg.strip_prefix("include=") {
                self.include = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("exclude=") {
                self.exclude = StrList::split(csv, ',');
            } else if arg == "keep-unused" {
                self.filter_unused = false;
            } else {
                return Err(LaunchError::UnknownArgument(arg.clone()));
            }
        }
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, "/proc/diskstats", &self.include, &self.exclude, self.filter_unused);
    }
}

fn collect_from(sink: &mut Sink<'_>, path: &str, include: &StrList, exclude: &StrList, filter_unused: bool) {
    let Ok(f) = File::open(path) else { return };
    for line in BufReader::new(f).lines().map_while(Result::ok) {
        let mut fields = line.split_whitespace();
        // skip major/minor device numbers
        if fields.next().is_none() || fields.next().is_none() {
            continue;
        }
        let Some(dev) = fields.next() else { continue };

        if !include.is_empty() {
            if !include.matches(dev) {
                continue;
            }
        } else if !exclude.is_empty() && exclude.matches(dev) {
            continue;
        }

        let rest: Vec<&str> = fields.collect();
        if filter_unused && rest.iter().all(|v| v.chars().all(|c| c == '0')) {
            continue;
        }

        for ((metric, factor), value) in COLUMNS.iter().zip(rest.iter()) {
            if let Ok(v) = value.parse::<f64>() {
                sink.emit(metric, &[label("device", dev)], v * factor);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;

    #[test]
    fn label_emission_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diskstats");
        std::fs::write(
            &path,
            "   8       0 sda 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15\n",
        )
        .unwrap();

        let include = StrList::new();
        let exclude = StrList::new();
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_from(&mut sink, path.to_str().unwrap(), &include, &exclude, true);
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert!(body.contains(r#"node_disk_read_bytes_total{device="sda"} 1536"#));
    }

    #[test]
    fn filter_prefix_match_excludes_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diskstats");
        std::fs::write(
            &path,
            "   7       0 loop0 1 2 3 4 5 6 7 8 9 10 11 12 13 14 15\n",
        )
        .unwrap();

        let include = StrList::new();
        let exclude = StrList::split("lo*", ',');
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_from(&mut sink, path.to_str().unwrap(), &include, &exclude, true);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn unused_device_is_skipped_unless_kept() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diskstats");
        std::fs::write(&path, "   8       1 sda1 0 0 0 0 0 0 0 0 0 0 0 0 0 0 0\n").unwrap();

        let include = StrList::new();
        let exclude = StrList::new();
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_from(&mut sink, path.to_str().unwrap(), &include, &exclude, true);
        }
        assert!(buf.is_empty());

        let mut buf2 = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf2, true);
            collect_from(&mut sink, path.to_str().unwrap(), &include, &exclude, false);
        }
        assert!(!buf2.is_empty());
    }
}
