//! ES: the title store (tickets, TMDs and contents on NAND)

use crate::formats::{Content, TicketReader, TmdReader};
use crate::fs::{FileSystem, Mode, Modes};
use crate::iosc::{sha1, Iosc};
use crate::titles::{self, SYSMENU_UID, SYSTEM_MENU};
use oc_core::error::IosError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

const FIRST_TITLE_UID: u32 = 0x1001;

const ROOT_ONLY: Modes = Modes::new(Mode::READ_WRITE, Mode::empty(), Mode::empty());
const PUBLIC_READ: Modes = Modes::new(Mode::READ_WRITE, Mode::READ_WRITE, Mode::READ);

/// ES title management
pub struct Es {
    fs: Arc<FileSystem>,
    iosc: Arc<Iosc>,
    uids: RwLock<HashMap<u64, u32>>,
}

impl Es {
    pub fn new(fs: Arc<FileSystem>, iosc: Arc<Iosc>) -> Self {
        let mut uids = HashMap::new();
        uids.insert(SYSTEM_MENU, SYSMENU_UID);
        Self {
            fs,
            iosc,
            uids: RwLock::new(uids),
        }
    }

    /// uid a title's data directory belongs to, assigning one on first use
    pub fn uid_for(&self, title_id: u64) -> u32 {
        if let Some(uid) = self.uids.read().get(&title_id) {
            return *uid;
        }
        let mut uids = self.uids.write();
        let next = uids.values().copied().max().unwrap_or(SYSMENU_UID).max(FIRST_TITLE_UID - 1) + 1;
        *uids.entry(title_id).or_insert(next)
    }

    /// Create `/title/<id>/content` and `/title/<id>/data` for a title
    pub fn create_title_directories(&self, title_id: u64, group_id: u16) -> Result<(), IosError> {
        self.fs
            .create_full_path(0, 0, &titles::title_content_dir(title_id), PUBLIC_READ)?;

        let data_dir = titles::title_data_dir(title_id);
        if !self.fs.exists(&data_dir) {
            let uid = self.uid_for(title_id);
            self.fs.create_directory(uid, group_id, &data_dir, ROOT_ONLY)?;
            debug!(
                "Created data directory for {} (uid 0x{:x}, gid 0x{:x})",
                titles::format_title_id(title_id),
                uid,
                group_id
            );
        }
        Ok(())
    }

    pub fn import_ticket(&self, ticket: &TicketReader) -> Result<(), IosError> {
        let path = titles::ticket_path(ticket.title_id());
        let dir = &path[..path.rfind('/').unwrap_or(0)];
        self.fs.create_full_path(0, 0, dir, ROOT_ONLY)?;
        self.fs.write_file(&path, ticket.bytes(), ROOT_ONLY)?;
        debug!("Imported ticket for {}", titles::format_title_id(ticket.title_id()));
        Ok(())
    }

    pub fn import_tmd(&self, tmd: &TmdReader) -> Result<(), IosError> {
        self.create_title_directories(tmd.title_id(), tmd.group_id())?;
        self.fs
            .write_file(&titles::tmd_path(tmd.title_id()), tmd.bytes(), PUBLIC_READ)?;
        debug!("Imported TMD for {}", titles::format_title_id(tmd.title_id()));
        Ok(())
    }

    /// Decrypt, verify and store one content
    pub fn import_content(
        &self,
        tmd: &TmdReader,
        content: &Content,
        encrypted: &[u8],
        title_key: &[u8; 16],
    ) -> Result<(), IosError> {
        let mut data = self.iosc.decrypt_content(title_key, content.index, encrypted)?;
        data.truncate(content.size as usize);
        if sha1(&data) != content.sha1 {
            return Err(IosError::HashMismatch {
                title_id: tmd.title_id(),
                content_id: content.id,
            });
        }

        self.fs.write_file(
            &titles::content_path(tmd.title_id(), content.id),
            &data,
            PUBLIC_READ,
        )?;
        debug!(
            "Imported content {:08x} ({} bytes{})",
            content.id,
            data.len(),
            if content.is_shared() { ", shared" } else { "" }
        );
        Ok(())
    }

    /// Import a whole title from its ticket, TMD and encrypted contents
    pub fn import_title(
        &self,
        ticket: &TicketReader,
        tmd: &TmdReader,
        contents: &[(Content, Vec<u8>)],
    ) -> Result<(), IosError> {
        let title_key = self.iosc.decrypt_title_key(ticket)?;
        self.import_ticket(ticket)?;
        self.import_tmd(tmd)?;
        for (content, encrypted) in contents {
            self.import_content(tmd, content, encrypted, &title_key)?;
        }
        info!(
            "Installed title {} ({} contents)",
            titles::format_title_id(tmd.title_id()),
            contents.len()
        );
        Ok(())
    }

    pub fn is_installed(&self, title_id: u64) -> bool {
        self.fs.exists(&titles::tmd_path(title_id))
    }

    /// TMD of an installed title
    pub fn find_installed_tmd(&self, title_id: u64) -> Result<TmdReader, IosError> {
        match self.fs.read_file(&titles::tmd_path(title_id)) {
            Ok(bytes) => TmdReader::parse(bytes),
            Err(IosError::NotFound(_)) => Err(IosError::TitleNotInstalled(title_id)),
            Err(e) => Err(e),
        }
    }

    pub fn find_ticket(&self, title_id: u64) -> Result<TicketReader, IosError> {
        TicketReader::parse(self.fs.read_file(&titles::ticket_path(title_id))?)
    }

    /// Decrypted data of an installed content
    pub fn read_content(&self, title_id: u64, content: &Content) -> Result<Vec<u8>, IosError> {
        self.fs.read_file(&titles::content_path(title_id, content.id))
    }

    /// Every title with an installed TMD
    pub fn installed_titles(&self) -> Vec<u64> {
        let mut found = Vec::new();
        let Ok(highs) = self.fs.read_directory("/title") else {
            return found;
        };
        for high in highs {
            let Ok(high_id) = u32::from_str_radix(&high, 16) else {
                continue;
            };
            let Ok(lows) = self.fs.read_directory(&format!("/title/{}", high)) else {
                continue;
            };
            for low in lows {
                if let Ok(low_id) = u32::from_str_radix(&low, 16) {
                    let title_id = ((high_id as u64) << 32) | low_id as u64;
                    if self.is_installed(title_id) {
                        found.push(title_id);
                    }
                }
            }
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::fixtures::{build_ticket, build_tmd};
    use crate::iosc::{aes_encrypt, content_iv, title_key_iv, ConsoleType, KeyStore};

    const COMMON_KEY: [u8; 16] = [0x11; 16];
    const TITLE_ID: u64 = 0x0001_0001_4841_4341;

    fn setup() -> (tempfile::TempDir, Es) {
        let dir = tempfile::tempdir().unwrap();
        let fs = Arc::new(FileSystem::new(dir.path()).unwrap());
        let keys = KeyStore {
            common_key: Some(hex::encode(COMMON_KEY)),
            korean_common_key: None,
        };
        let iosc = Arc::new(Iosc::new(ConsoleType::Retail, keys));
        (dir, Es::new(fs, iosc))
    }

    fn package(payload: &[u8], corrupt_hash: bool) -> (TicketReader, TmdReader, Vec<(Content, Vec<u8>)>) {
        let title_key = [0x5Au8; 16];
        let encrypted_key = aes_encrypt(&COMMON_KEY, &title_key_iv(TITLE_ID), &title_key).unwrap();
        let ticket = TicketReader::parse(build_ticket(TITLE_ID, encrypted_key.try_into().unwrap())).unwrap();

        let mut hash = sha1(payload);
        if corrupt_hash {
            hash[0] ^= 1;
        }
        let content = Content {
            id: 0x0000_0004,
            index: 0,
            content_type: 1,
            size: payload.len() as u64,
            sha1: hash,
        };
        let tmd = TmdReader::parse(build_tmd(TITLE_ID, titles::ios(58), &[content], 0)).unwrap();
        let encrypted = aes_encrypt(&title_key, &content_iv(0), payload).unwrap();
        (ticket, tmd, vec![(content, encrypted)])
    }

    #[test]
    fn test_uid_assignment() {
        let (_dir, es) = setup();
        assert_eq!(es.uid_for(SYSTEM_MENU), SYSMENU_UID);
        let first = es.uid_for(TITLE_ID);
        assert_eq!(first, 0x1001);
        assert_eq!(es.uid_for(TITLE_ID), first);
        assert_eq!(es.uid_for(0x0001_0001_0000_0001), 0x1002);
    }

    #[test]
    fn test_create_title_directories() {
        let (dir, es) = setup();
        es.create_title_directories(SYSTEM_MENU, 1).unwrap();
        assert!(dir.path().join("title/00000001/00000002/content").is_dir());
        assert!(dir.path().join("title/00000001/00000002/data").is_dir());
        // idempotent
        es.create_title_directories(SYSTEM_MENU, 1).unwrap();
    }

    #[test]
    fn test_import_title() {
        let (_dir, es) = setup();
        let payload = b"boot content with an odd length!!".to_vec();
        let (ticket, tmd, contents) = package(&payload, false);

        es.import_title(&ticket, &tmd, &contents).unwrap();
        assert!(es.is_installed(TITLE_ID));
        assert_eq!(es.installed_titles(), vec![TITLE_ID]);

        let installed = es.find_installed_tmd(TITLE_ID).unwrap();
        let boot = installed.boot_content().unwrap();
        assert_eq!(es.read_content(TITLE_ID, &boot).unwrap(), payload);
        assert_eq!(es.find_ticket(TITLE_ID).unwrap().title_id(), TITLE_ID);
    }

    #[test]
    fn test_hash_mismatch() {
        let (_dir, es) = setup();
        let (ticket, tmd, contents) = package(b"payload", true);
        assert!(matches!(
            es.import_title(&ticket, &tmd, &contents),
            Err(IosError::HashMismatch { content_id: 4, .. })
        ));
    }

    #[test]
    fn test_not_installed() {
        let (_dir, es) = setup();
        assert!(matches!(
            es.find_installed_tmd(TITLE_ID),
            Err(IosError::TitleNotInstalled(TITLE_ID))
        ));
    }
}
