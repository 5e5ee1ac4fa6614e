//! # enospace
//!
//! LD_PRELOAD fault-injection layer: `write`, `writev`, `pwrite` and
//! `pwritev` fail with a simulated out-of-space error once the filesystem
//! under the target descriptor has less free capacity than configured.
//!
//! ```bash
//! LIBENOSPACE_AVAIL=1048576 LIBENOSPACE_OPT=bytes \
//!     LD_PRELOAD=target/debug/libenospace.so dd if=/dev/zero of=out bs=1M count=4
//! ```
//!
//! # Safety rules for this crate
//!
//! Every exported function runs inside someone else's `write`:
//! - no `println!`/`eprintln!` → use `shim_log!` (raw `write(2)` syscall)
//! - no `panic!` → use `libc::abort()`
//! - no heap allocation on the call path

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

// Macros must be defined before modules that use them
#[cfg(target_os = "linux")]
#[macro_use]
pub mod macros;

#[cfg(target_os = "linux")]
pub mod errno;
#[cfg(target_os = "linux")]
pub mod interpose;
#[cfg(target_os = "linux")]
pub mod reals;
#[cfg(target_os = "linux")]
pub mod state;
#[cfg(target_os = "linux")]
pub mod syscalls;

/// Load-time constructor. The dynamic loader runs `.init_array` entries of a
/// preloaded object before the program's own initializers and `main`, so the
/// state is in place before user code can reach an entry point.
#[cfg(target_os = "linux")]
#[link_section = ".init_array"]
#[used]
pub static ENOSPACE_INIT: unsafe extern "C" fn() = {
    unsafe extern "C" fn init() {
        crate::state::ShimState::install();
    }
    init
};
