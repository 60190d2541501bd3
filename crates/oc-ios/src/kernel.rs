//! IOS kernel: owns the NAND and ES, and handles IOS reloads

use crate::es::Es;
use crate::fs::FileSystem;
use crate::iosc::{ConsoleType, Iosc, KeyStore};
use crate::titles;
use oc_core::error::IosError;
use oc_memory::Memory;
use parking_lot::RwLock;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// IOS version word read by titles
pub const ADDR_IOS_VERSION: u32 = 0x8000_3140;
/// Copy of the IOS version word kept for the apploader
pub const ADDR_IOS_VERSION_EXPECTED: u32 = 0x8000_3188;

/// Latest retail revisions of IOSes titles commonly ask for, used when the IOS title itself
/// is not installed in the emulated NAND
const KNOWN_REVISIONS: &[(u32, u16)] = &[
    (9, 1034),
    (31, 3608),
    (36, 3608),
    (53, 5663),
    (55, 5663),
    (56, 5661),
    (57, 5918),
    (58, 6176),
    (61, 5662),
    (80, 6944),
];

/// The emulated IOS kernel
pub struct Ios {
    fs: Arc<FileSystem>,
    iosc: Arc<Iosc>,
    es: Es,
    active_ios: RwLock<Option<u64>>,
}

impl Ios {
    /// Bring up IOS on the NAND at `nand_root`
    pub fn new(nand_root: &Path, console_type: ConsoleType, keys: KeyStore) -> Result<Self, IosError> {
        let fs = Arc::new(FileSystem::new(nand_root)?);
        let iosc = Arc::new(Iosc::new(console_type, keys));
        let es = Es::new(Arc::clone(&fs), Arc::clone(&iosc));
        Ok(Self {
            fs,
            iosc,
            es,
            active_ios: RwLock::new(None),
        })
    }

    pub fn fs(&self) -> &Arc<FileSystem> {
        &self.fs
    }

    pub fn es(&self) -> &Es {
        &self.es
    }

    pub fn iosc(&self) -> &Iosc {
        &self.iosc
    }

    /// Title id of the IOS currently running, if any was booted
    pub fn active_ios(&self) -> Option<u64> {
        *self.active_ios.read()
    }

    /// Reload into the IOS `title_id` and publish its version in low memory
    pub fn boot_ios(&self, title_id: u64, memory: &Memory) -> Result<(), IosError> {
        if !titles::is_ios(title_id) {
            return Err(IosError::NotAnIos(title_id));
        }
        let number = title_id as u32;

        let revision = match self.es.find_installed_tmd(title_id) {
            Ok(tmd) => tmd.title_version(),
            Err(IosError::TitleNotInstalled(_)) => KNOWN_REVISIONS
                .iter()
                .find(|(ios, _)| *ios == number)
                .map(|(_, revision)| *revision)
                .unwrap_or_else(|| {
                    warn!("IOS{} is not installed and has no known revision", number);
                    0xFFFF
                }),
            Err(e) => return Err(e),
        };

        let version = (number << 16) | revision as u32;
        memory.write_be32(ADDR_IOS_VERSION, version)?;
        memory.write_be32(ADDR_IOS_VERSION_EXPECTED, version)?;
        *self.active_ios.write() = Some(title_id);

        info!("Booted IOS{} v{}", number, revision);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_ios() -> (tempfile::TempDir, Ios) {
        let dir = tempfile::tempdir().unwrap();
        let ios = Ios::new(dir.path(), ConsoleType::Retail, KeyStore::default()).unwrap();
        (dir, ios)
    }

    #[test]
    fn test_boot_known_ios() {
        let (_dir, ios) = test_ios();
        let memory = Memory::new();
        ios.boot_ios(titles::ios(58), &memory).unwrap();
        assert_eq!(memory.read_be32(ADDR_IOS_VERSION).unwrap(), 0x003A_1820);
        assert_eq!(memory.read_be32(ADDR_IOS_VERSION_EXPECTED).unwrap(), 0x003A_1820);
        assert_eq!(ios.active_ios(), Some(titles::ios(58)));
    }

    #[test]
    fn test_boot_rejects_non_ios() {
        let (_dir, ios) = test_ios();
        let memory = Memory::new();
        assert!(matches!(
            ios.boot_ios(titles::SYSTEM_MENU, &memory),
            Err(IosError::NotAnIos(_))
        ));
        assert_eq!(ios.active_ios(), None);
    }
}
