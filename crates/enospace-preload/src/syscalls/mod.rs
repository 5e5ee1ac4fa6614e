//! Syscall inception layers.

pub mod write;
