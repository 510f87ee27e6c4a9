//! Dependency-injection capability points for system calls that collectors need but
//! cannot sensibly fake by redirecting a file path (§4.9).
//!
//! Replaces the original's `#ifdef NANO_EXPORTER_TEST` hooks with ordinary
//! constructor-injected closures: production and test code share the same binary.

use std::ffi::CStr;
use std::io;
use std::path::Path;

/// Fields read out of `struct statvfs` that the `filesystem` collector needs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Statvfs {
    pub frsize: u64,
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub readonly: bool,
}

/// Real `statvfs(2)` call, used in production.
pub fn real_statvfs(path: &Path) -> io::Result<Statvfs> {
    use std::os::unix::ffi::OsStrExt;

    let bytes = path.as_os_str().as_bytes();
    let mut buf = Vec::with_capacity(bytes.len() + 1);
    buf.extend_from_slice(bytes);
    buf.push(0);
    let cpath = CStr::from_bytes_with_nul(&buf).map_err(|_| io::Error::from(io::ErrorKind::InvalidInput))?;

    let mut raw: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(cpath.as_ptr(), &mut raw) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(Statvfs {
        frsize: raw.f_frsize as u64,
        blocks: raw.f_blocks as u64,
        bfree: raw.f_bfree as u64,
        bavail: raw.f_bavail as u64,
        files: raw.f_files as u64,
        ffree: raw.f_ffree as u64,
        readonly: raw.f_flag & (libc::ST_RDONLY as u64) != 0,
    })
}

/// Fields read out of `struct utsname` that the `uname` collector needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UtsName {
    pub sysname: String,
    pub nodename: String,
    pub release: String,
    pub version: String,
    pub machine: String,
}

/// Real `uname(2)` call, used in production.
pub fn real_uname() -> io::Result<UtsName> {
    let mut raw: libc::utsname = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::uname(&mut raw) };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(UtsName {
        sysname: cstr_field(&raw.sysname),
        nodename: cstr_field(&raw.nodename),
        release: cstr_field(&raw.release),
        version: cstr_field(&raw.version),
        machine: cstr_field(&raw.machine),
    })
}

fn cstr_field(field: &[libc::c_char]) -> String {
    let bytes: Vec<u8> = field.iter().take_while(|&&c| c != 0).map(|&c| c as u8).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Real `sysconf(_SC_CLK_TCK)`, used by the `cpu` collector's `init`.
pub fn real_clock_tick() -> io::Result<i64> {
    let ticks = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if ticks <= 0 {
        Err(io::Error::from(io::ErrorKind::Other))
    } else {
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_clock_tick_is_positive_on_linux() {
        assert!(real_clock_tick().unwrap() > 0);
    }

    #[test]
    fn real_uname_reports_nonempty_sysname() {
        let uts = real_uname().unwrap();
        assert!(!uts.sysname.is_empty());
    }
}
