//! Mounted filesystem collector (§4.7c), grounded on `original_source/filesystem.c`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::{label, Sink};
use crate::strlist::StrList;
use crate::syscalls::{self, Statvfs};

type StatvfsFn = Box<dyn Fn(&Path) -> std::io::Result<Statvfs> + Send>;

pub struct FilesystemCollector {
    include_device: StrList,
    exclude_device: StrList,
    include_mount: StrList,
    exclude_mount: StrList,
    include_type: StrList,
    exclude_type: StrList,
    statvfs_fn: StatvfsFn,
}

impl FilesystemCollector {
    pub fn new() -> Self {
        Self {
            include_device: StrList::new(),
            exclude_device: StrList::new(),
            include_mount: StrList::new(),
            exclude_mount: StrList::new(),
            include_type: StrList::new(),
            exclude_type: StrList::new(),
            statvfs_fn: Box::new(syscalls::real_statvfs),
        }
    }

    /// Test-only constructor injecting a fake `statvfs` capability (§4.9).
    #[cfg(test)]
    pub fn with_statvfs(statvfs_fn: impl Fn(&Path) -> std::io::Result<Statvfs> + Send + 'static) -> Self {
        let mut c = Self::new();
        c.statvfs_fn = Box::new(statvfs_fn);
        c
    }
}

impl Default for FilesystemCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for FilesystemCollector {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn has_args(&self) -> bool {
        true
    }

    fn init(&mut self, args: &[String]) -> Result<(), LaunchError> {
        for arg in args {
            if let Some(csv) = arg.strip_prefix("include-device=") {
                self.include_device = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("exclude-device=") {
                self.exclude_device = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("include-mount=") {
                self.include_mount = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("exclude-mount=") {
                self.exclude_mount = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("include-type=") {
                self.include_type = StrList::split(csv, ',');
            } else if let Some(csv) = arg.strip_prefix("exclude-type=") {
                self.exclude_type = StrList::split(csv, ',');
            } else {
                return Err(LaunchError::UnknownArgument(arg.clone()));
            }
        }
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, "/proc/mounts", self, &*self.statvfs_fn);
    }
}

fn collect_from(
    sink: &mut Sink<'_>,
    path: &str,
    ctx: &FilesystemCollector,
    statvfs_fn: &dyn Fn(&Path) -> std::io::Result<Statvfs>,
) {
    let Ok(f) = File::open(path) else { return };
    for line in BufReader::new(f).lines().map_while(Result::ok) {
        let mut fields = line.split_whitespace();
        let Some(dev) = fields.next() else { continue };
        let Some(mount) = fields.next() else { continue };
        let Some(fstype) = fields.next() else { continue };

        if !ctx.include_device.is_empty() {
            if !ctx.include_device.matches(dev) {
                continue;
            }
        } else {
            if !dev.starts_with('/') {
                continue;
            }
            if !ctx.exclude_device.is_empty() && ctx.exclude_device.matches(dev) {
                continue;
            }
        }
        if !ctx.include_mount.is_empty() {
            if !ctx.include_mount.matches(mount) {
                continue;
            }
        } else if !ctx.exclude_mount.is_empty() && ctx.exclude_mount.matches(mount) {
            continue;
        }
        if !ctx.include_type.is_empty() {
            if !ctx.include_type.matches(fstype) {
                continue;
            }
        } else if !ctx.exclude_type.is_empty() && ctx.exclude_type.matches(fstype) {
            continue;
        }

        let Ok(fs) = statvfs_fn(Path::new(mount)) else { continue };
        let bs = fs.frsize as f64;
        let labels = [label("device", dev), label("fstype", fstype), label("mountpoint", mount)];
        sink.emit("node_filesystem_avail_bytes", &labels, fs.bavail as f64 * bs);
        sink.emit("node_filesystem_files", &labels, fs.files as f64);
        sink.emit("node_filesystem_files_free", &labels, fs.ffree as f64);
        sink.emit("node_filesystem_free_bytes", &labels, fs.bfree as f64 * bs);
        sink.emit(
            "node_filesystem_readonly",
            &labels,
            if fs.readonly { 1.0 } else { 0.0 },
        );
        sink.emit("node_filesystem_size_bytes", &labels, fs.blocks as f64 * bs);
    }
}
