//! Descriptor metadata queries.
//!
//! The engine asks two questions per call: what kind of file the descriptor
//! refers to (fstat), and what the filesystem underneath reports (fstatfs).
//! Answers are never cached; free space moves between calls.

use std::io;
use std::os::fd::RawFd;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Regular,
    /// Pipe, socket, character or block device, directory, ...
    Other,
}

/// Raw filesystem counters, as reported by `fstatfs(2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsStats {
    /// Filesystem magic (`f_type`).
    pub fs_type: u32,
    /// Total data blocks (`f_blocks`).
    pub blocks: u64,
    /// Blocks available to unprivileged users (`f_bavail`).
    pub bavail: u64,
    /// Block size in bytes (`f_bsize`).
    pub bsize: u64,
}

impl FsStats {
    pub fn available_bytes(&self) -> u64 {
        self.bsize.saturating_mul(self.bavail)
    }

    /// `floor(100 * bavail / blocks)`. Zero blocks means zero free capacity.
    pub fn available_percent(&self) -> u64 {
        if self.blocks == 0 {
            return 0;
        }
        let percent = 100u128 * self.bavail as u128 / self.blocks as u128;
        u64::try_from(percent).unwrap_or(u64::MAX)
    }
}

/// Source of per-descriptor metadata.
pub trait FsProbe {
    fn file_kind(&self, fd: RawFd) -> io::Result<FileKind>;
    fn fs_stats(&self, fd: RawFd) -> io::Result<FsStats>;
}

impl<P: FsProbe + ?Sized> FsProbe for &P {
    fn file_kind(&self, fd: RawFd) -> io::Result<FileKind> {
        (**self).file_kind(fd)
    }

    fn fs_stats(&self, fd: RawFd) -> io::Result<FsStats> {
        (**self).fs_stats(fd)
    }
}

/// Kernel-backed probe: `fstat(2)` and `fstatfs(2)`.
///
/// Allocation-free, so it is safe to call from inside an intercepted write.
#[cfg(target_os = "linux")]
#[derive(Debug, Clone, Copy, Default)]
pub struct SysProbe;

#[cfg(target_os = "linux")]
impl FsProbe for SysProbe {
    fn file_kind(&self, fd: RawFd) -> io::Result<FileKind> {
        let mut st = std::mem::MaybeUninit::<libc::stat>::zeroed();
        if unsafe { libc::fstat(fd, st.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        let st = unsafe { st.assume_init() };
        if st.st_mode & libc::S_IFMT == libc::S_IFREG {
            Ok(FileKind::Regular)
        } else {
            Ok(FileKind::Other)
        }
    }

    fn fs_stats(&self, fd: RawFd) -> io::Result<FsStats> {
        let mut fs = std::mem::MaybeUninit::<libc::statfs>::zeroed();
        if unsafe { libc::fstatfs(fd, fs.as_mut_ptr()) } < 0 {
            return Err(io::Error::last_os_error());
        }
        let fs = unsafe { fs.assume_init() };
        // Magics are 32-bit; f_type is a signed word whose width varies by arch.
        Ok(FsStats {
            fs_type: fs.f_type as u32,
            blocks: fs.f_blocks as u64,
            bavail: fs.f_bavail as u64,
            bsize: fs.f_bsize as u64,
        })
    }
}
