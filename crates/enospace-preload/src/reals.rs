//! Real Symbol Storage
//!
//! The genuine write-family implementations, found with
//! `dlsym(RTLD_NEXT, ..)` so lookups skip this library's own exports.
//! Resolved once by the load-time constructor; a symbol that failed to
//! resolve aborts the process the first time a call must be forwarded to it.

use libc::{c_int, c_void, iovec, off_t, size_t, ssize_t};
use std::ffi::CStr;

pub type WriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t) -> ssize_t;
pub type WritevFn = unsafe extern "C" fn(c_int, *const iovec, c_int) -> ssize_t;
pub type PwriteFn = unsafe extern "C" fn(c_int, *const c_void, size_t, off_t) -> ssize_t;
pub type PwritevFn = unsafe extern "C" fn(c_int, *const iovec, c_int, off_t) -> ssize_t;
#[cfg(target_env = "gnu")]
pub type Pwrite64Fn =
    unsafe extern "C" fn(c_int, *const c_void, size_t, libc::off64_t) -> ssize_t;
#[cfg(target_env = "gnu")]
pub type Pwritev64Fn = unsafe extern "C" fn(c_int, *const iovec, c_int, libc::off64_t) -> ssize_t;

/// Name of a libc symbol this library overrides.
pub struct RealSymbol {
    name: &'static CStr,
}

impl RealSymbol {
    pub const fn new(name: &'static CStr) -> Self {
        Self { name }
    }

    pub fn name(&self) -> &'static str {
        self.name.to_str().unwrap_or("?")
    }

    /// Look the symbol up in the objects loaded after this one.
    /// Returns null when it cannot be found; reports why if `debug` is set.
    pub unsafe fn lookup(&self, debug: bool) -> *mut c_void {
        // Clear any stale error so the check below reflects this lookup.
        libc::dlerror();
        let f = libc::dlsym(libc::RTLD_NEXT, self.name.as_ptr());
        let err = libc::dlerror();
        if !err.is_null() {
            let msg = CStr::from_ptr(err).to_str().unwrap_or("unknown error");
            shim_debug!(debug, "libenospace:dlsym ({}):{}", self.name(), msg);
            return std::ptr::null_mut();
        }
        if f.is_null() {
            shim_debug!(debug, "libenospace:dlsym ({}):symbol not found", self.name());
        }
        f
    }
}

pub static REAL_WRITE: RealSymbol = RealSymbol::new(c"write");
pub static REAL_WRITEV: RealSymbol = RealSymbol::new(c"writev");
pub static REAL_PWRITE: RealSymbol = RealSymbol::new(c"pwrite");
pub static REAL_PWRITEV: RealSymbol = RealSymbol::new(c"pwritev");
#[cfg(target_env = "gnu")]
pub static REAL_PWRITE64: RealSymbol = RealSymbol::new(c"pwrite64");
#[cfg(target_env = "gnu")]
pub static REAL_PWRITEV64: RealSymbol = RealSymbol::new(c"pwritev64");

/// Resolve `sym` into a typed function pointer. Null becomes `None`.
macro_rules! resolve_as {
    ($sym:expr, $t:ty, $debug:expr) => {
        std::mem::transmute::<*mut c_void, Option<$t>>($sym.lookup($debug))
    };
}

/// Report a forward through an unresolved original and abort.
#[cold]
fn unresolved(sym: &RealSymbol) -> ! {
    shim_log!("libenospace:{}:original implementation not resolved", sym.name());
    unsafe { libc::abort() }
}

/// The resolved originals. Immutable once built.
#[derive(Clone, Copy)]
pub struct Originals {
    write: Option<WriteFn>,
    writev: Option<WritevFn>,
    pwrite: Option<PwriteFn>,
    pwritev: Option<PwritevFn>,
    #[cfg(target_env = "gnu")]
    pwrite64: Option<Pwrite64Fn>,
    #[cfg(target_env = "gnu")]
    pwritev64: Option<Pwritev64Fn>,
}

impl Originals {
    /// Bind every original. Never fails: missing symbols stay `None` and are
    /// reported (when `debug` is set) instead.
    pub unsafe fn resolve(debug: bool) -> Self {
        Self {
            write: resolve_as!(REAL_WRITE, WriteFn, debug),
            writev: resolve_as!(REAL_WRITEV, WritevFn, debug),
            pwrite: resolve_as!(REAL_PWRITE, PwriteFn, debug),
            pwritev: resolve_as!(REAL_PWRITEV, PwritevFn, debug),
            #[cfg(target_env = "gnu")]
            pwrite64: resolve_as!(REAL_PWRITE64, Pwrite64Fn, debug),
            #[cfg(target_env = "gnu")]
            pwritev64: resolve_as!(REAL_PWRITEV64, Pwritev64Fn, debug),
        }
    }

    pub fn write(&self) -> WriteFn {
        self.write.unwrap_or_else(|| unresolved(&REAL_WRITE))
    }

    pub fn writev(&self) -> WritevFn {
        self.writev.unwrap_or_else(|| unresolved(&REAL_WRITEV))
    }

    pub fn pwrite(&self) -> PwriteFn {
        self.pwrite.unwrap_or_else(|| unresolved(&REAL_PWRITE))
    }

    pub fn pwritev(&self) -> PwritevFn {
        self.pwritev.unwrap_or_else(|| unresolved(&REAL_PWRITEV))
    }

    #[cfg(target_env = "gnu")]
    pub fn pwrite64(&self) -> Pwrite64Fn {
        self.pwrite64.unwrap_or_else(|| unresolved(&REAL_PWRITE64))
    }

    #[cfg(target_env = "gnu")]
    pub fn pwritev64(&self) -> Pwritev64Fn {
        self.pwritev64.unwrap_or_else(|| unresolved(&REAL_PWRITEV64))
    }
}
