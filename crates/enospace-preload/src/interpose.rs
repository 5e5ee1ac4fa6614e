//! LD_PRELOAD symbol exports.
//!
//! LD_PRELOAD works by symbol interposition: these definitions shadow the
//! libc ones for every object loaded after this library. Each export keeps
//! the exact signature of the function it replaces.

use crate::syscalls::write::{
    pwrite_inception, pwritev_inception, write_inception, writev_inception,
};
use libc::{c_int, c_void, iovec, off_t, size_t, ssize_t};

#[no_mangle]
pub unsafe extern "C" fn write(fd: c_int, buf: *const c_void, count: size_t) -> ssize_t {
    write_inception(fd, buf, count)
}

#[no_mangle]
pub unsafe extern "C" fn writev(fd: c_int, iov: *const iovec, iovcnt: c_int) -> ssize_t {
    writev_inception(fd, iov, iovcnt)
}

#[no_mangle]
pub unsafe extern "C" fn pwrite(
    fd: c_int,
    buf: *const c_void,
    count: size_t,
    offset: off_t,
) -> ssize_t {
    pwrite_inception(fd, buf, count, offset)
}

#[no_mangle]
pub unsafe extern "C" fn pwritev(
    fd: c_int,
    iov: *const iovec,
    iovcnt: c_int,
    offset: off_t,
) -> ssize_t {
    pwritev_inception(fd, iov, iovcnt, offset)
}

#[cfg(target_env = "gnu")]
#[no_mangle]
pub unsafe extern "C" fn pwrite64(
    fd: c_int,
    buf: *const c_void,
    count: size_t,
    offset: libc::off64_t,
) -> ssize_t {
    crate::syscalls::write::pwrite64_inception(fd, buf, count, offset)
}

#[cfg(target_env = "gnu")]
#[no_mangle]
pub unsafe extern "C" fn pwritev64(
    fd: c_int,
    iov: *const iovec,
    iovcnt: c_int,
    offset: libc::off64_t,
) -> ssize_t {
    crate::syscalls::write::pwritev64_inception(fd, iov, iovcnt, offset)
}
