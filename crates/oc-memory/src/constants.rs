//! Memory map constants

/// MEM1 physical base
pub const MEM1_BASE: u32 = 0x0000_0000;
/// MEM1 size (24 MiB on retail hardware)
pub const MEM1_SIZE: u32 = 0x0180_0000;

/// MEM2 physical base (Wii only)
pub const MEM2_BASE: u32 = 0x1000_0000;
/// MEM2 size (64 MiB on retail hardware)
pub const MEM2_SIZE: u32 = 0x0400_0000;

/// Cached and uncached effective-address windows both mirror physical memory
pub const PHYSICAL_MASK: u32 = 0x1FFF_FFFF;

/// Cached MEM1 window
pub const MEM1_CACHED: u32 = 0x8000_0000;
/// Uncached MEM1 window
pub const MEM1_UNCACHED: u32 = 0xC000_0000;
/// Cached MEM2 window
pub const MEM2_CACHED: u32 = 0x9000_0000;

/// Top of MEM1 as seen through the cached window
pub const MEM1_END_CACHED: u32 = MEM1_CACHED + MEM1_SIZE;
