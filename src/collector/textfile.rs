//! Textfile collector (§4.7h), grounded on `original_source/textfile.c`.

use std::fs;

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::Sink;

const DEFAULT_DIR: &str = "/var/lib/prometheus/node-exporter";

pub struct TextfileCollector {
    dir: String,
}

impl TextfileCollector {
    pub fn new() -> Self {
        Self {
            dir: DEFAULT_DIR.to_string(),
        }
    }
}

impl Default for TextfileCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for TextfileCollector {
    fn name(&self) -> &'static str {
        "textfile"
    }

    fn has_args(&self) -> bool {
        true
    }

    fn init(&mut self, args: &[String]) -> Result<(), LaunchError> {
        for arg in args {
            if let Some(dir) = arg.strip_prefix("dir=") {
                self.dir = dir.to_string();
            } else {
                return Err(LaunchError::UnknownArgument(arg.clone()));
            }
        }
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, &self.dir);
    }
}

fn collect_from(sink: &mut Sink<'_>, dir: &str) {
    let Ok(entries) = fs::read_dir(dir) else { return };
    let mut names: Vec<_> = entries
        .flatten()
        .filter_map(|e| e.file_name().to_str().map(str::to_owned))
        .filter(|n| n.ends_with(".prom"))
        .collect();
    names.sort();

    for name in names {
        let Ok(contents) = fs::read(format!("{dir}/{name}")) else { continue };
        sink.emit_raw(&contents);
        if contents.last() != Some(&b'\n') {
            sink.emit_raw(b"\n");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;

    #[test]
    fn streams_prom_files_and_fixes_missing_newline() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.prom"), "custom_metric 1\n").unwrap();
        fs::write(dir.path().join("b.prom"), "other_metric 2").unwrap();
        fs::write(dir.path().join("ignored.txt"), "nope").unwrap();

        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_from(&mut sink, dir.path().to_str().unwrap());
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert_eq!(body, "custom_metric 1\nother_metric 2\n");
    }

    #[test]
    fn missing_directory_emits_nothing() {
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            collect_from(&mut sink, "/nonexistent/textfile/dir");
        }
        assert!(buf.is_empty());
    }
}
