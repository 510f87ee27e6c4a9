//! Kernel identity collector (§4.7i), grounded on `original_source/uname.c`.

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::{label, Sink};
use crate::syscalls::{self, UtsName};

pub struct UnameCollector {
    info: Option<UtsName>,
}

impl UnameCollector {
    pub fn new() -> Self {
        Self { info: None }
    }

    #[cfg(test)]
    fn with_info(info: UtsName) -> Self {
        Self { info: Some(info) }
    }
}

impl Default for UnameCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for UnameCollector {
    fn name(&self) -> &'static str {
        "uname"
    }

    fn init(&mut self, _args: &[String]) -> Result<(), LaunchError> {
        self.info = Some(
            syscalls::real_uname().map_err(|_| LaunchError::CollectorInit("uname".to_string()))?,
        );
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        let Some(info) = &self.info else { return };
        sink.emit(
            "node_uname_info",
            &[
                label("machine", &info.machine),
                label("nodename", &info.nodename),
                label("release", &info.release),
                label("sysname", &info.sysname),
                label("version", &info.version),
            ],
            1.0,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::ByteBuffer;

    #[test]
    fn emits_single_sample_with_all_labels() {
        let ctx = UnameCollector::with_info(UtsName {
            sysname: "Linux".to_string(),
            nodename: "host1".to_string(),
            release: "6.1.0".to_string(),
            version: "#1 SMP".to_string(),
            machine: "x86_64".to_string(),
        });

        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            ctx.collect(&mut sink);
        }
        let body = String::from_utf8(buf.view().to_vec()).unwrap();
        assert_eq!(
            body,
            "node_uname_info{machine=\"x86_64\",nodename=\"host1\",release=\"6.1.0\",sysname=\"Linux\",version=\"#1 SMP\"} 1\n"
        );
    }

    #[test]
    fn collect_without_init_emits_nothing() {
        let ctx = UnameCollector::new();
        let mut buf = ByteBuffer::new(256, 8192);
        {
            let mut sink = Sink::new(&mut buf, true);
            ctx.collect(&mut sink);
        }
        assert!(buf.is_empty());
    }
}
