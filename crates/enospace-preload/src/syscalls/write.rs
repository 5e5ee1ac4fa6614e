//! Write-family inception layers.
//!
//! Each one asks the quota engine first. A denial fails the call with the
//! configured errno and the real implementation is never reached; an allow
//! forwards the caller's arguments untouched and returns whatever the real
//! implementation returns.

use enospace_quota::Verdict;
use libc::{c_int, c_void, iovec, off_t, size_t, ssize_t};

use crate::errno::{get_errno, set_errno};
use crate::macros::{stderr_write, StackWriter};
use crate::reals::{RealSymbol, REAL_PWRITE, REAL_PWRITEV, REAL_WRITE, REAL_WRITEV};
use crate::state::ShimState;

/// Quota check for one call. `true` means the write may proceed, with
/// `errno` exactly as the caller left it.
#[inline(always)]
unsafe fn quota_allows(state: &ShimState, fd: c_int) -> bool {
    let saved = get_errno();
    match state.engine.decide(fd) {
        Ok(decision) => {
            if state.debug() {
                let mut buf = [0u8; 256];
                let mut writer = StackWriter::new(&mut buf);
                let _ = decision.write_diagnostic(&mut writer);
                stderr_write(writer.as_str());
            }
            match decision.verdict {
                Verdict::Allow => {
                    set_errno(saved);
                    true
                }
                Verdict::Deny(errno) => {
                    set_errno(errno);
                    false
                }
            }
        }
        Err(err) => {
            set_errno(err.raw_os_error().unwrap_or(libc::EIO));
            false
        }
    }
}

/// Calls arriving before the constructor has run skip the quota and go
/// straight to the next definition of the symbol.
#[cold]
unsafe fn early_original(sym: &RealSymbol) -> Option<*mut c_void> {
    let f = sym.lookup(false);
    if f.is_null() {
        set_errno(libc::ENOSYS);
        None
    } else {
        Some(f)
    }
}

macro_rules! early_passthrough {
    ($sym:expr, $t:ty $(, $arg:expr)*) => {
        match early_original(&$sym) {
            Some(f) => {
                let real = std::mem::transmute::<*mut c_void, $t>(f);
                real($($arg),*)
            }
            None => -1,
        }
    };
}

pub unsafe fn write_inception(fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(REAL_WRITE, crate::reals::WriteFn, fd, buf, count);
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.write())(fd, buf, count)
}

pub unsafe fn writev_inception(fd: c_int, iov: *const iovec, iovcnt: c_int) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(REAL_WRITEV, crate::reals::WritevFn, fd, iov, iovcnt);
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.writev())(fd, iov, iovcnt)
}

pub unsafe fn pwrite_inception(
    fd: c_int,
    buf: *const c_void,
    count: size_t,
    offset: off_t,
) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(REAL_PWRITE, crate::reals::PwriteFn, fd, buf, count, offset);
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.pwrite())(fd, buf, count, offset)
}

pub unsafe fn pwritev_inception(
    fd: c_int,
    iov: *const iovec,
    iovcnt: c_int,
    offset: off_t,
) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(REAL_PWRITEV, crate::reals::PwritevFn, fd, iov, iovcnt, offset);
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.pwritev())(fd, iov, iovcnt, offset)
}

// glibc's 64-bit offset aliases, used by LFS builds and Rust's std.

#[cfg(target_env = "gnu")]
pub unsafe fn pwrite64_inception(
    fd: c_int,
    buf: *const c_void,
    count: size_t,
    offset: libc::off64_t,
) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(
            crate::reals::REAL_PWRITE64,
            crate::reals::Pwrite64Fn,
            fd,
            buf,
            count,
            offset
        );
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.pwrite64())(fd, buf, count, offset)
}

#[cfg(target_env = "gnu")]
pub unsafe fn pwritev64_inception(
    fd: c_int,
    iov: *const iovec,
    iovcnt: c_int,
    offset: libc::off64_t,
) -> ssize_t {
    let Some(state) = ShimState::get() else {
        return early_passthrough!(
            crate::reals::REAL_PWRITEV64,
            crate::reals::Pwritev64Fn,
            fd,
            iov,
            iovcnt,
            offset
        );
    };
    if !quota_allows(state, fd) {
        return -1;
    }
    (state.originals.pwritev64())(fd, iov, iovcnt, offset)
}
