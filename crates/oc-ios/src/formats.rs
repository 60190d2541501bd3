//! Title metadata (TMD) and ticket parsing

use oc_core::error::IosError;

/// Content type bit for contents shared between titles
pub const CONTENT_TYPE_SHARED: u16 = 0x8000;

const TMD_IOS_ID: usize = 0x184;
const TMD_TITLE_ID: usize = 0x18C;
const TMD_GROUP_ID: usize = 0x198;
const TMD_TITLE_VERSION: usize = 0x1DC;
const TMD_NUM_CONTENTS: usize = 0x1DE;
const TMD_BOOT_INDEX: usize = 0x1E0;
/// Size of the TMD header preceding the content records
pub const TMD_HEADER_SIZE: usize = 0x1E4;
/// Size of one content record
pub const CONTENT_RECORD_SIZE: usize = 0x24;

const TICKET_TITLE_KEY: usize = 0x1BF;
const TICKET_TITLE_ID: usize = 0x1DC;
const TICKET_COMMON_KEY_INDEX: usize = 0x1F1;
/// Size of a v0 ticket
pub const TICKET_SIZE: usize = 0x2A4;

fn be16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

fn be32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn be64(data: &[u8], offset: usize) -> u64 {
    ((be32(data, offset) as u64) << 32) | be32(data, offset + 4) as u64
}

/// One content record of a TMD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Content {
    pub id: u32,
    pub index: u16,
    pub content_type: u16,
    pub size: u64,
    pub sha1: [u8; 20],
}

impl Content {
    pub fn is_shared(&self) -> bool {
        self.content_type & CONTENT_TYPE_SHARED != 0
    }
}

/// Signed title metadata
#[derive(Debug, Clone, Default)]
pub struct TmdReader {
    bytes: Vec<u8>,
}

impl TmdReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Parse and validate, failing with a description of what is wrong
    pub fn parse(bytes: Vec<u8>) -> Result<Self, IosError> {
        let tmd = Self::new(bytes);
        if !tmd.is_valid() {
            return Err(IosError::InvalidTmd(format!(
                "{} bytes is too short for the header and its content records",
                tmd.bytes.len()
            )));
        }
        Ok(tmd)
    }

    pub fn is_valid(&self) -> bool {
        self.bytes.len() >= TMD_HEADER_SIZE
            && self.bytes.len()
                >= TMD_HEADER_SIZE + self.num_contents() as usize * CONTENT_RECORD_SIZE
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Title id of the IOS this title runs under
    pub fn ios_id(&self) -> u64 {
        be64(&self.bytes, TMD_IOS_ID)
    }

    pub fn title_id(&self) -> u64 {
        be64(&self.bytes, TMD_TITLE_ID)
    }

    pub fn group_id(&self) -> u16 {
        be16(&self.bytes, TMD_GROUP_ID)
    }

    pub fn title_version(&self) -> u16 {
        be16(&self.bytes, TMD_TITLE_VERSION)
    }

    pub fn num_contents(&self) -> u16 {
        if self.bytes.len() < TMD_HEADER_SIZE {
            return 0;
        }
        be16(&self.bytes, TMD_NUM_CONTENTS)
    }

    pub fn boot_index(&self) -> u16 {
        be16(&self.bytes, TMD_BOOT_INDEX)
    }

    /// The `i`-th content record
    pub fn content(&self, i: u16) -> Option<Content> {
        if i >= self.num_contents() {
            return None;
        }
        let base = TMD_HEADER_SIZE + i as usize * CONTENT_RECORD_SIZE;
        let record = self.bytes.get(base..base + CONTENT_RECORD_SIZE)?;
        let mut sha1 = [0u8; 20];
        sha1.copy_from_slice(&record[0x10..0x24]);
        Some(Content {
            id: be32(record, 0),
            index: be16(record, 4),
            content_type: be16(record, 6),
            size: be64(record, 8),
            sha1,
        })
    }

    pub fn contents(&self) -> Vec<Content> {
        (0..self.num_contents()).filter_map(|i| self.content(i)).collect()
    }

    /// Content whose index is the boot index
    pub fn boot_content(&self) -> Option<Content> {
        let boot_index = self.boot_index();
        self.contents().into_iter().find(|c| c.index == boot_index)
    }
}

/// Signed ticket carrying a title's encrypted key
#[derive(Debug, Clone, Default)]
pub struct TicketReader {
    bytes: Vec<u8>,
}

impl TicketReader {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn parse(bytes: Vec<u8>) -> Result<Self, IosError> {
        let ticket = Self::new(bytes);
        if !ticket.is_valid() {
            return Err(IosError::InvalidTicket(format!(
                "expected at least 0x{:x} bytes, got 0x{:x}",
                TICKET_SIZE,
                ticket.bytes.len()
            )));
        }
        Ok(ticket)
    }

    pub fn is_valid(&self) -> bool {
        self.bytes.len() >= TICKET_SIZE
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn title_id(&self) -> u64 {
        be64(&self.bytes, TICKET_TITLE_ID)
    }

    /// Title key, still encrypted with the common key
    pub fn encrypted_title_key(&self) -> [u8; 16] {
        let mut key = [0u8; 16];
        key.copy_from_slice(&self.bytes[TICKET_TITLE_KEY..TICKET_TITLE_KEY + 16]);
        key
    }

    /// 0 = common key, 1 = Korean common key
    pub fn common_key_index(&self) -> u8 {
        self.bytes[TICKET_COMMON_KEY_INDEX]
    }
}

/// Builders for test fixtures
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub(crate) fn build_tmd(title_id: u64, ios_id: u64, contents: &[Content], boot_index: u16) -> Vec<u8> {
        let mut tmd = vec![0u8; TMD_HEADER_SIZE + contents.len() * CONTENT_RECORD_SIZE];
        tmd[TMD_IOS_ID..TMD_IOS_ID + 8].copy_from_slice(&ios_id.to_be_bytes());
        tmd[TMD_TITLE_ID..TMD_TITLE_ID + 8].copy_from_slice(&title_id.to_be_bytes());
        tmd[TMD_GROUP_ID..TMD_GROUP_ID + 2].copy_from_slice(&0x3031u16.to_be_bytes());
        tmd[TMD_TITLE_VERSION..TMD_TITLE_VERSION + 2].copy_from_slice(&0x1820u16.to_be_bytes());
        tmd[TMD_NUM_CONTENTS..TMD_NUM_CONTENTS + 2]
            .copy_from_slice(&(contents.len() as u16).to_be_bytes());
        tmd[TMD_BOOT_INDEX..TMD_BOOT_INDEX + 2].copy_from_slice(&boot_index.to_be_bytes());
        for (i, content) in contents.iter().enumerate() {
            let base = TMD_HEADER_SIZE + i * CONTENT_RECORD_SIZE;
            tmd[base..base + 4].copy_from_slice(&content.id.to_be_bytes());
            tmd[base + 4..base + 6].copy_from_slice(&content.index.to_be_bytes());
            tmd[base + 6..base + 8].copy_from_slice(&content.content_type.to_be_bytes());
            tmd[base + 8..base + 16].copy_from_slice(&content.size.to_be_bytes());
            tmd[base + 16..base + 36].copy_from_slice(&content.sha1);
        }
        tmd
    }

    pub(crate) fn build_ticket(title_id: u64, encrypted_key: [u8; 16]) -> Vec<u8> {
        let mut ticket = vec![0u8; TICKET_SIZE];
        ticket[TICKET_TITLE_KEY..TICKET_TITLE_KEY + 16].copy_from_slice(&encrypted_key);
        ticket[TICKET_TITLE_ID..TICKET_TITLE_ID + 8].copy_from_slice(&title_id.to_be_bytes());
        ticket
    }
}
