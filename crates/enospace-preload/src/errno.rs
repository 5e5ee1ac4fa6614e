//! Process error state access.

use libc::c_int;

#[inline(always)]
pub unsafe fn get_errno() -> c_int {
    *libc::__errno_location()
}

#[inline(always)]
pub unsafe fn set_errno(e: c_int) {
    *libc::__errno_location() = e;
}
