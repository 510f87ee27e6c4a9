//! Hardware sensor collector (§4.7d), grounded on `original_source/hwmon.c`.

use std::fs;
use std::path::Path;

use crate::collector::Collector;
use crate::errors::LaunchError;
use crate::sink::{label, Sink};

struct MetricType {
    suffix: &'static str,
    metric: &'static str,
    conv: fn(&str) -> Option<f64>,
}

struct MetricClass {
    prefix: &'static str,
    types: &'static [MetricType],
}

fn conv_millis(text: &str) -> Option<f64> {
    text.trim_end().parse::<f64>().ok().map(|v| v / 1000.0)
}

fn conv_id(text: &str) -> Option<f64> {
    text.trim_end().parse::<f64>().ok()
}

fn conv_flag(text: &str) -> Option<f64> {
    match text.trim_end() {
        "0" => Some(0.0),
        "1" => Some(1.0),
        _ => None,
    }
}

const METRICS: &[MetricClass] = &[
    MetricClass {
        prefix: "in",
        types: &[
            MetricType { suffix: "_input", metric: "node_hwmon_in_volts", conv: conv_millis },
            MetricType { suffix: "_min", metric: "node_hwmon_in_min_volts", conv: conv_millis },
            MetricType { suffix: "_max", metric: "node_hwmon_in_max_volts", conv: conv_millis },
            MetricType { suffix: "_alarm", metric: "node_hwmon_in_alarm", conv: conv_flag },
        ],
    },
    MetricClass {
        prefix: "fan",
        types: &[
            MetricType { suffix: "_input", metric: "node_hwmon_fan_rpm", conv: conv_id },
            MetricType { suffix: "_min", metric: "node_hwmon_fan_min_rpm", conv: conv_id },
            MetricType { suffix: "_alarm", metric: "node_hwmon_fan_alarm", conv: conv_flag },
        ],
    },
    MetricClass {
        prefix: "temp",
        types: &[
            MetricType { suffix: "_input", metric: "node_hwmon_temp_celsius", conv: conv_millis },
        ],
    },
];

pub struct HwmonCollector;

impl HwmonCollector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for HwmonCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector for HwmonCollector {
    fn name(&self) -> &'static str {
        "hwmon"
    }

    fn init(&mut self, _args: &[String]) -> Result<(), LaunchError> {
        Ok(())
    }

    fn collect(&self, sink: &mut Sink<'_>) {
        collect_from(sink, Path::new("/sys/class/hwmon"));
    }
}

/// Derives the `chip` label for a hwmon instance directory (§4.7d).
fn hwmon_name(path: &Path) -> String {
    if let Ok(target) = fs::read_link(path) {
        if let Some(target_str) = target.to_str() {
            if let Some(stripped) = target_str.strip_prefix("../../devices/") {
                let mut parts = stripped.splitn(3, '/');
                match (parts.next(), parts.next()) {
                    (Some(a), Some(b)) => {
                        let combined = format!("{a}/{b}");
                        if combined != "virtual/hwmon" {
                            return combined;
                        }
                    }
                    (Some(a), None) => {
                        if a != "virtual/hwmon" {
                            return a.to_string();
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    if let Ok(contents) = fs::read_to_string(path.join("name")) {
        let trimmed = contents.trim_end_matches('\n');
        if !trimmed.is_empty() {
            return format!("hwmon/{trimmed}");
        }
    }

    "unknown".to_string()
}

fn collect_from(sink: &mut Sink<'_>, root: &Path) {
    let Ok(entries) = fs::read_dir(root) else { return };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !name.starts_with("hwmon") {
            continue;
        }
        let chip_path = root.join(name);
        let chip = hwmon_name(&chip_path);

        let Ok(sensors) = fs::read_dir(&chip_path) else { continue };
        for sensor_entry in sensors.flatten() {
            let sensor_name = sensor_entry.file_name();
            let Some(sensor_name) = sensor_name.to_str() else { continue };

            for class in METRICS {
                if !sensor_name.starts_with(class.prefix) {
                    continue;
                }
                let Some(underscore) = sensor_name.find('_') else { continue };
                let sensor_label = &sensor_name[..underscore];
                let suffix = &sensor_name[underscore..];

                for ty in class.types {
                    if suffix != ty.suffix {
                        continue;
                    }
                    let file_path = chip_path.join(sensor_name);
                    let Ok(contents) = fs::read_to_string(&file_path) else { continue };
                    if let Some(value) = (ty.conv)(contents.trim()) {
                        sink.emit(
                            ty.metric,
                            &[label("chip", &chip), label("sensor", sensor_label)],
                            value,
                        );
                    }
                }
            }
        }
    }
}
