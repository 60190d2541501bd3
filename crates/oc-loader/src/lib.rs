//! Executable and boot ROM loading for oxidized-cube

pub mod dol;
pub mod elf;
pub mod ipl;
pub mod reader;
pub mod symbols;

// Re-export main types
pub use dol::{DolHeader, DolReader};
pub use elf::{Elf32Header, Elf32Phdr, Elf32Shdr, ElfReader};
pub use ipl::{descramble, identify_ipl, ipl_crc32, IplDump, IplFamily};
pub use reader::{contains_hid4_access, BootExecutableReader};
pub use symbols::{Symbol, SymbolDb, SymbolKind};
