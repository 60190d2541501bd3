//! Common interface over bootable executables

use crate::symbols::SymbolDb;
use oc_core::error::LoaderError;
use oc_memory::Memory;

/// An executable that can be placed in memory and jumped to
pub trait BootExecutableReader: Send + Sync {
    /// Whether the file parsed as a well-formed executable
    fn is_valid(&self) -> bool;

    /// Whether the executable targets Broadway (touches HID4)
    fn is_wii(&self) -> bool;

    /// Copy every loadable section into emulated memory
    fn load_into_memory(&self, memory: &Memory) -> Result<(), LoaderError>;

    /// Effective address of the first instruction
    fn entry_point(&self) -> u32;

    /// Add the executable's symbols to `db`, returning whether any were found
    fn load_symbols(&self, db: &mut SymbolDb) -> bool;

    /// Size of the file in bytes
    fn size(&self) -> usize;
}

/// Scan big-endian code for `mfspr rX, HID4` / `mtspr HID4, rX`, which only Broadway has
pub fn contains_hid4_access(code: &[u8]) -> bool {
    code.chunks_exact(4).any(|word| {
        let word = u32::from_be_bytes([word[0], word[1], word[2], word[3]]);
        let masked = word & 0xFC1F_FFFF;
        masked == 0x7C13_FAA6 || masked == 0x7C13_FBA6
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hid4_detection() {
        // mfspr r3, HID4
        assert!(contains_hid4_access(&0x7C73_FAA6u32.to_be_bytes()));
        // mtspr HID4, r4
        assert!(contains_hid4_access(&[0x60, 0, 0, 0, 0x7C, 0x93, 0xFB, 0xA6]));
        // mfspr r3, HID0
        assert!(!contains_hid4_access(&0x7C70_FAA6u32.to_be_bytes()));
        assert!(!contains_hid4_access(&[]));
    }
}
