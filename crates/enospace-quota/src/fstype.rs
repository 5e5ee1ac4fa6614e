//! Filesystems whose free-space counters are trusted for quota comparison.
//!
//! Values match `<linux/magic.h>`.

pub const EXT4_SUPER_MAGIC: u32 = 0xEF53;
pub const ECRYPTFS_SUPER_MAGIC: u32 = 0xF15F;
pub const BTRFS_SUPER_MAGIC: u32 = 0x9123_683E;

pub const QUOTA_TRACKED: [(u32, &str); 3] = [
    (EXT4_SUPER_MAGIC, "ext4"),
    (ECRYPTFS_SUPER_MAGIC, "ecryptfs"),
    (BTRFS_SUPER_MAGIC, "btrfs"),
];

#[inline]
pub fn is_quota_tracked(fs_type: u32) -> bool {
    QUOTA_TRACKED.iter().any(|(magic, _)| *magic == fs_type)
}

/// Human name for a tracked filesystem magic.
pub fn name(fs_type: u32) -> Option<&'static str> {
    QUOTA_TRACKED
        .iter()
        .find(|(magic, _)| *magic == fs_type)
        .map(|(_, name)| *name)
}
