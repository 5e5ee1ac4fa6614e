//! Zero-allocation diagnostics.
//!
//! Everything here may run inside an intercepted `write`, so messages are
//! formatted on the stack and emitted with a raw `write(2)` syscall that can
//! never re-enter the shim.

#[macro_export]
macro_rules! shim_log {
    ($($arg:tt)*) => {{
        use std::fmt::Write;
        let mut buf = [0u8; 512];
        let mut writer = $crate::macros::StackWriter::new(&mut buf);
        let _ = writeln!(writer, $($arg)*);
        $crate::macros::stderr_write(writer.as_str());
    }};
}

#[macro_export]
macro_rules! shim_debug {
    ($enabled:expr, $($arg:tt)*) => {
        if $enabled {
            $crate::shim_log!($($arg)*);
        }
    };
}

pub struct StackWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> StackWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.buf[..self.pos]).unwrap_or("")
    }
}

impl<'a> std::fmt::Write for StackWriter<'a> {
    /// Silently truncates at capacity, on a char boundary.
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let remaining = self.buf.len() - self.pos;
        let mut to_copy = std::cmp::min(s.len(), remaining);
        while !s.is_char_boundary(to_copy) {
            to_copy -= 1;
        }
        self.buf[self.pos..self.pos + to_copy].copy_from_slice(&s.as_bytes()[..to_copy]);
        self.pos += to_copy;
        Ok(())
    }
}

/// Write to fd 2 bypassing libc's `write` symbol. Leaves `errno` untouched.
pub fn stderr_write(msg: &str) {
    if msg.is_empty() {
        return;
    }
    unsafe {
        let saved = crate::errno::get_errno();
        libc::syscall(
            libc::SYS_write,
            libc::STDERR_FILENO,
            msg.as_ptr() as *const libc::c_void,
            msg.len(),
        );
        crate::errno::set_errno(saved);
    }
}
