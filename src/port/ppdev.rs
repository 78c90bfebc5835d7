//! Linux ppdev implementation.
//!
//! Drives `/dev/parportN` nodes through the ppdev ioctl interface in
//! compatibility (SPP) mode: data lines are written with `PPWDATA`, status
//! lines are read with `PPRSTATUS`.

use super::traits::{ParallelPort, PortBackend};
use std::io;

/// Backend that opens real ppdev device nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PpdevBackend;

impl PpdevBackend {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(target_os = "linux")]
mod imp {
    use super::*;
    use std::fs::OpenOptions;
    use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd};

    // ioctl request encoding from <asm-generic/ioctl.h>.
    const IOC_NRBITS: libc::c_ulong = 8;
    const IOC_TYPEBITS: libc::c_ulong = 8;
    const IOC_SIZEBITS: libc::c_ulong = 14;
    const IOC_NRSHIFT: libc::c_ulong = 0;
    const IOC_TYPESHIFT: libc::c_ulong = IOC_NRSHIFT + IOC_NRBITS;
    const IOC_SIZESHIFT: libc::c_ulong = IOC_TYPESHIFT + IOC_TYPEBITS;
    const IOC_DIRSHIFT: libc::c_ulong = IOC_SIZESHIFT + IOC_SIZEBITS;

    const IOC_NONE: libc::c_ulong = 0;
    const IOC_WRITE: libc::c_ulong = 1;
    const IOC_READ: libc::c_ulong = 2;

    const fn ioc(dir: libc::c_ulong, nr: libc::c_ulong, size: libc::c_ulong) -> libc::c_ulong {
        (dir << IOC_DIRSHIFT) | (PP_IOCTL << IOC_TYPESHIFT) | (nr << IOC_NRSHIFT) | (size << IOC_SIZESHIFT)
    }

    // <linux/ppdev.h>
    const PP_IOCTL: libc::c_ulong = b'p' as libc::c_ulong;
    const BYTE: libc::c_ulong = std::mem::size_of::<libc::c_uchar>() as libc::c_ulong;

    pub(super) const PPRSTATUS: libc::c_ulong = ioc(IOC_READ, 0x81, BYTE);
    pub(super) const PPWDATA: libc::c_ulong = ioc(IOC_WRITE, 0x86, BYTE);
    pub(super) const PPCLAIM: libc::c_ulong = ioc(IOC_NONE, 0x8b, 0);
    pub(super) const PPRELEASE: libc::c_ulong = ioc(IOC_NONE, 0x8c, 0);

    /// An opened ppdev device node.
    #[derive(Debug)]
    pub struct PpdevPort {
        fd: OwnedFd,
        path: String,
    }

    impl PpdevPort {
        fn ioctl_none(&self, request: libc::c_ulong) -> io::Result<()> {
            // SAFETY: `fd` is an open descriptor owned by `self`; the request takes no argument.
            let rc = unsafe { libc::ioctl(self.fd.as_raw_fd(), request as _) };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }

        fn ioctl_byte(&self, request: libc::c_ulong, byte: &mut libc::c_uchar) -> io::Result<()> {
            // SAFETY: ppdev reads or writes exactly one byte through the pointer,
            // which is valid for the duration of the call.
            let rc = unsafe {
                libc::ioctl(
                    self.fd.as_raw_fd(),
                    request as _,
                    byte as *mut libc::c_uchar,
                )
            };
            if rc < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl ParallelPort for PpdevPort {
        fn path(&self) -> &str {
            &self.path
        }

        fn claim(&mut self) -> io::Result<()> {
            self.ioctl_none(PPCLAIM)
        }

        fn release(&mut self) -> io::Result<()> {
            self.ioctl_none(PPRELEASE)
        }

        fn write_data(&mut self, value: u8) -> io::Result<()> {
            let mut byte = value;
            self.ioctl_byte(PPWDATA, &mut byte)
        }

        fn read_status(&mut self) -> io::Result<u8> {
            let mut byte: libc::c_uchar = 0;
            self.ioctl_byte(PPRSTATUS, &mut byte)?;
            Ok(byte)
        }

        fn close(self: Box<Self>) -> io::Result<()> {
            let raw = self.fd.into_raw_fd();
            // SAFETY: ownership of `raw` was just taken from the OwnedFd, so it
            // is closed exactly once here.
            if unsafe { libc::close(raw) } < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        }
    }

    impl PortBackend for PpdevBackend {
        fn open(&self, path: &str) -> io::Result<Box<dyn ParallelPort>> {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            Ok(Box::new(PpdevPort {
                fd: file.into(),
                path: path.to_string(),
            }))
        }
    }
}

#[cfg(target_os = "linux")]
pub use imp::PpdevPort;

#[cfg(not(target_os = "linux"))]
impl PortBackend for PpdevBackend {
    fn open(&self, path: &str) -> io::Result<Box<dyn ParallelPort>> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("ppdev is only available on Linux (cannot open {path})"),
        ))
    }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::imp::{PPCLAIM, PPRELEASE, PPRSTATUS, PPWDATA};
    use super::*;

    #[test]
    fn test_ioctl_numbers_match_linux_headers() {
        assert_eq!(PPRSTATUS, 0x8001_7081);
        assert_eq!(PPWDATA, 0x4001_7086);
        assert_eq!(PPCLAIM, 0x708b);
        assert_eq!(PPRELEASE, 0x708c);
    }

    #[test]
    fn test_open_missing_device() {
        let backend = PpdevBackend::new();
        let err = backend
            .open("/dev/nonexistent_parport_12345")
            .expect_err("opening a missing node must fail");
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
