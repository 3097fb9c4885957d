//! Serial line interrupt counters (`TIOCGICOUNT`).
//!
//! A line running faster than the pulse rate is expected to report framing
//! and parity errors while `rx` keeps pace with the pulses. Reading the
//! counters confirms that without touching the measurement.
//!
//! Only Linux exposes these counters; elsewhere every read fails with
//! [`io::ErrorKind::Unsupported`].

use std::fmt;
use std::io;

use serde::Serialize;

/// Snapshot of the driver's interrupt counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineCounters {
    pub cts: i32,
    pub dcd: i32,
    pub rx: i32,
    pub tx: i32,
    pub frame: i32,
    pub overrun: i32,
    pub parity: i32,
    pub brk: i32,
}

impl fmt::Display for LineCounters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cts {} dcd {} rx {} tx {} frame {} overrun {} parity {} brk {}",
            self.cts, self.dcd, self.rx, self.tx, self.frame, self.overrun, self.parity, self.brk
        )
    }
}

/// Handle used to read [`LineCounters`] of one serial device.
#[derive(Debug)]
pub struct LineCounterReader {
    #[cfg(target_os = "linux")]
    fd: std::os::fd::OwnedFd,
}

#[cfg(target_os = "linux")]
mod sys {
    use std::fs::{File, OpenOptions};
    use std::io;
    use std::os::fd::{AsRawFd, BorrowedFd, OwnedFd, RawFd};
    use std::os::unix::fs::OpenOptionsExt;

    use super::LineCounters;

    /// `struct serial_icounter_struct` from `<linux/serial.h>`.
    #[repr(C)]
    #[derive(Default)]
    #[allow(dead_code)]
    struct SerialIcounter {
        cts: libc::c_int,
        dsr: libc::c_int,
        rng: libc::c_int,
        dcd: libc::c_int,
        rx: libc::c_int,
        tx: libc::c_int,
        frame: libc::c_int,
        overrun: libc::c_int,
        parity: libc::c_int,
        brk: libc::c_int,
        buf_overrun: libc::c_int,
        reserved: [libc::c_int; 9],
    }

    pub(super) fn open(device: &str) -> io::Result<OwnedFd> {
        let file: File = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOCTTY | libc::O_NONBLOCK)
            .open(device)?;
        Ok(file.into())
    }

    /// Duplicates `fd`; the caller keeps its own descriptor open.
    pub(super) fn duplicate(fd: RawFd) -> io::Result<OwnedFd> {
        // SAFETY: `fd` is open for the duration of this call.
        unsafe { BorrowedFd::borrow_raw(fd) }.try_clone_to_owned()
    }

    pub(super) fn read(fd: &OwnedFd) -> io::Result<LineCounters> {
        let mut raw = SerialIcounter::default();
        // SAFETY: TIOCGICOUNT writes one `serial_icounter_struct` into `raw`.
        let rc = unsafe { libc::ioctl(fd.as_raw_fd(), libc::TIOCGICOUNT, &mut raw) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(LineCounters {
            cts: raw.cts,
            dcd: raw.dcd,
            rx: raw.rx,
            tx: raw.tx,
            frame: raw.frame,
            overrun: raw.overrun,
            parity: raw.parity,
            brk: raw.brk,
        })
    }
}

#[cfg(target_os = "linux")]
impl LineCounterReader {
    /// Opens `device` read-only, without making it the controlling tty.
    pub fn open(device: &str) -> io::Result<Self> {
        Ok(Self {
            fd: sys::open(device)?,
        })
    }

    /// Reads through a duplicate of an already open port.
    pub fn for_port<P: std::os::fd::AsRawFd>(port: &P) -> io::Result<Self> {
        Ok(Self {
            fd: sys::duplicate(port.as_raw_fd())?,
        })
    }

    pub fn read(&self) -> io::Result<LineCounters> {
        sys::read(&self.fd)
    }
}

#[cfg(not(target_os = "linux"))]
impl LineCounterReader {
    pub fn open(_device: &str) -> io::Result<Self> {
        Err(unsupported())
    }

    pub fn read(&self) -> io::Result<LineCounters> {
        Err(unsupported())
    }
}

#[cfg(not(target_os = "linux"))]
fn unsupported() -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        "line counters are only available on Linux",
    )
}
