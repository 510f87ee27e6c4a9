//! The write-only API handed to collectors during a scrape (§4.3).
//!
//! Deliberately separate from any generic `Display`/`WriteBuffer`-style serialization:
//! floating-point formatting here needs C's `%.16g` semantics (16 significant digits,
//! shortest of fixed/exponential notation, trailing zeros trimmed), which general-purpose
//! write-buffer traits in this lineage explicitly decline to implement to avoid
//! locale-dependent formatting. Label values are written verbatim; collectors are
//! responsible for avoiding `"`, `\`, and newline in label values (§4.3, §9).

use crate::buffer::ByteBuffer;

/// One (key, value) label pair to attach to a metric sample.
pub struct Label<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

pub fn label<'a>(key: &'a str, value: &'a str) -> Label<'a> {
    Label { key, value }
}

/// Sink bound to a request buffer. Writes are no-ops unless `active` is true — the
/// server only constructs an active sink while a slot is in WRITE_METRICS (§4.3, §9).
pub struct Sink<'a> {
    buf: &'a mut ByteBuffer,
    active: bool,
}

impl<'a> Sink<'a> {
    pub fn new(buf: &'a mut ByteBuffer, active: bool) -> Self {
        Self { buf, active }
    }

    /// Appends one exposition-format line: `name{k="v",...} value\n`.
    pub fn emit(&mut self, name: &str, labels: &[Label<'_>], value: f64) {
        if !self.active {
            return;
        }
        self.buf.append_cstring(name);
        if !labels.is_empty() {
            self.buf.append_char(b'{');
            for (i, l) in labels.iter().enumerate() {
                if i > 0 {
                    self.buf.append_char(b',');
                }
                self.buf.append_cstring(l.key);
                self.buf.append_bytes(b"=\"");
                self.buf.append_cstring(l.value);
                self.buf.append_char(b'"');
            }
            self.buf.append_char(b'}');
        }
        self.buf.append_char(b' ');
        let mut tmp = [0u8; 32];
        let n = format_g16(value, &mut tmp);
        self.buf.append_bytes(&tmp[..n]);
        self.buf.append_char(b'\n');
    }

    /// Appends uninterpreted bytes; caller guarantees well-formedness (used by the
    /// textfile collector to stream `.prom` file contents verbatim).
    pub fn emit_raw(&mut self, bytes: &[u8]) {
        if !self.active {
            return;
        }
        self.buf.append_bytes(bytes);
    }
}

/// Formats `value` the way glibc's `printf("%.16g", value)` would: 16 significant
/// digits, trailing fractional zeros trimmed, switching to exponential notation only
/// when the fixed-notation exponent falls outside [-4, 16).
///
/// Returns the number of bytes written into `out`.
fn format_g16(value: f64, out: &mut [u8; 32]) -> usize {
    use std::io::Write;

    if value == 0.0 {
        let s = if value.is_sign_negative() { "-0" } else { "0" };
        let mut cur = &mut out[..];
        let _ = cur.write(s.as_bytes());
        return s.len();
    }
    if !value.is_finite() {
        let s = if value.is_nan() {
            "nan"
        } else if value > 0.0 {
            "inf"
        } else {
            "-inf"
        };
        let mut cur = &mut out[..];
        let _ = cur.write(s.as_bytes());
        return s.len();
    }

    const SIG: usize = 16;
    let exponent = value.abs().log10().floor() as i32;
    let use_exp = exponent < -4 || exponent >= SIG as i32;

    let rendered = if use_exp {
        let mantissa_digits = SIG.saturating_sub(1);
        let formatted = format!("{:.*e}", mantissa_digits, value);
        normalize_exponential(&formatted)
    } else {
        let decimals = (SIG as i32 - 1 - exponent).max(0) as usize;
        let formatted = format!("{:.*}", decimals, value);
        trim_trailing_zeros(&formatted)
    };

    let bytes = rendered.as_bytes();
    let n = bytes.len().min(out.len());
    out[..n].copy_from_slice(&bytes[..n]);
    n
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0');
    let trimmed = trimmed.trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Rust's `{:e}` renders e.g. `1.2300000000000000e2`; collapse the mantissa's trailing
/// zeros and normalize the exponent to `e+NN`/`e-NN` the way `%g` does.
fn normalize_exponential(s: &str) -> String {
    let (mantissa, exp) = s.split_once('e').unwrap_or((s, "0"));
    let mantissa = trim_trailing_zeros(mantissa);
    let exp_val: i32 = exp.parse().unwrap_or(0);
    format!("{}e{}{:02}", mantissa, if exp_val < 0 { "-" } else { "+" }, exp_val.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g16(v: f64) -> String {
        let mut out = [0u8; 32];
        let n = format_g16(v, &mut out);
        String::from_utf8(out[..n].to_vec()).unwrap()
    }

    #[test]
    fn integers_render_without_decimal_point() {
        assert_eq!(g16(1048576.0), "1048576");
        assert_eq!(g16(1536.0), "1536");
        assert_eq!(g16(0.0), "0");
    }

    #[test]
    fn fractional_values_trim_trailing_zeros() {
        assert_eq!(g16(0.5), "0.5");
        assert_eq!(g16(1.25), "1.25");
    }

    #[test]
    fn negative_values() {
        assert_eq!(g16(-42.0), "-42");
    }

    #[test]
    fn emit_without_labels_omits_braces() {
        let mut buf = ByteBuffer::new(64, 4096);
        {
            let mut sink = Sink::new(&mut buf, true);
            sink.emit("node_memory_MemTotal_bytes", &[], 1048576.0);
        }
        assert_eq!(buf.view(), b"node_memory_MemTotal_bytes 1048576\n");
    }

    #[test]
    fn emit_with_labels() {
        let mut buf = ByteBuffer::new(64, 4096);
        {
            let mut sink = Sink::new(&mut buf, true);
            sink.emit(
                "node_disk_read_bytes_total",
                &[label("device", "sda")],
                1536.0,
            );
        }
        assert_eq!(buf.view(), b"node_disk_read_bytes_total{device=\"sda\"} 1536\n");
    }

    #[test]
    fn emit_is_noop_when_inactive() {
        let mut buf = ByteBuffer::new(64, 4096);
        {
            let mut sink = Sink::new(&mut buf, false);
            sink.emit("x", &[], 1.0);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn emit_raw_passes_bytes_through() {
        let mut buf = ByteBuffer::new(64, 4096);
        {
            let mut sink = Sink::new(&mut buf, true);
            sink.emit_raw(b"custom_metric 1\n");
        }
        assert_eq!(buf.view(), b"custom_metric 1\n");
    }
}
