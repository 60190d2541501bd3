//! DOL executable parser

use crate::reader::{contains_hid4_access, BootExecutableReader};
use crate::symbols::SymbolDb;
use oc_core::error::LoaderError;
use oc_memory::Memory;
use std::path::Path;
use tracing::{debug, info};

pub const DOL_NUM_TEXT: usize = 7;
pub const DOL_NUM_DATA: usize = 11;
pub const DOL_HEADER_SIZE: usize = 0x100;

/// DOL file header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DolHeader {
    pub text_offset: [u32; DOL_NUM_TEXT],
    pub data_offset: [u32; DOL_NUM_DATA],
    pub text_address: [u32; DOL_NUM_TEXT],
    pub data_address: [u32; DOL_NUM_DATA],
    pub text_size: [u32; DOL_NUM_TEXT],
    pub data_size: [u32; DOL_NUM_DATA],
    pub bss_address: u32,
    pub bss_size: u32,
    pub entry_point: u32,
}

impl DolHeader {
    /// Parse the fixed-size header at the start of a DOL
    pub fn parse(data: &[u8]) -> Result<Self, LoaderError> {
        if data.len() < DOL_HEADER_SIZE {
            return Err(LoaderError::InvalidDol(format!(
                "File too small for a DOL header: {} bytes",
                data.len()
            )));
        }
        let be32 = |o: usize| u32::from_be_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);

        let mut header = Self::default();
        for i in 0..DOL_NUM_TEXT {
            header.text_offset[i] = be32(0x00 + i * 4);
            header.text_address[i] = be32(0x48 + i * 4);
            header.text_size[i] = be32(0x90 + i * 4);
        }
        for i in 0..DOL_NUM_DATA {
            header.data_offset[i] = be32(0x1C + i * 4);
            header.data_address[i] = be32(0x64 + i * 4);
            header.data_size[i] = be32(0xAC + i * 4);
        }
        header.bss_address = be32(0xD8);
        header.bss_size = be32(0xDC);
        header.entry_point = be32(0xE0);
        Ok(header)
    }

    /// Serialize the header back to its on-disk form
    pub fn to_bytes(&self) -> [u8; DOL_HEADER_SIZE] {
        let mut out = [0u8; DOL_HEADER_SIZE];
        let mut put = |o: usize, v: u32| out[o..o + 4].copy_from_slice(&v.to_be_bytes());
        for i in 0..DOL_NUM_TEXT {
            put(i * 4, self.text_offset[i]);
            put(0x48 + i * 4, self.text_address[i]);
            put(0x90 + i * 4, self.text_size[i]);
        }
        for i in 0..DOL_NUM_DATA {
            put(0x1C + i * 4, self.data_offset[i]);
            put(0x64 + i * 4, self.data_address[i]);
            put(0xAC + i * 4, self.data_size[i]);
        }
        put(0xD8, self.bss_address);
        put(0xDC, self.bss_size);
        put(0xE0, self.entry_point);
        out
    }

    /// (file offset, load address, size) of every non-empty text section
    pub fn text_sections(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..DOL_NUM_TEXT)
            .map(|i| (self.text_offset[i], self.text_address[i], self.text_size[i]))
            .filter(|&(_, _, size)| size != 0)
    }

    /// (file offset, load address, size) of every non-empty data section
    pub fn data_sections(&self) -> impl Iterator<Item = (u32, u32, u32)> + '_ {
        (0..DOL_NUM_DATA)
            .map(|i| (self.data_offset[i], self.data_address[i], self.data_size[i]))
            .filter(|&(_, _, size)| size != 0)
    }

    /// Offset of the first byte past every section, the size of the DOL on disc
    pub fn file_size(&self) -> u32 {
        self.text_sections()
            .chain(self.data_sections())
            .map(|(offset, _, size)| offset.saturating_add(size))
            .max()
            .unwrap_or(DOL_HEADER_SIZE as u32)
            .max(DOL_HEADER_SIZE as u32)
    }
}

/// DOL executable reader
pub struct DolReader {
    data: Vec<u8>,
    header: Option<DolHeader>,
}

impl DolReader {
    /// Parse a DOL image from its raw bytes
    pub fn new(data: Vec<u8>) -> Self {
        let header = match Self::validate(&data) {
            Ok(header) => Some(header),
            Err(e) => {
                debug!("Not a usable DOL: {}", e);
                None
            }
        };
        Self { data, header }
    }

    /// Read and parse a DOL file from disk
    pub fn from_file(path: &Path) -> Result<Self, LoaderError> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// Parsed header, if the file is valid
    pub fn header(&self) -> Option<&DolHeader> {
        self.header.as_ref()
    }

    fn validate(data: &[u8]) -> Result<DolHeader, LoaderError> {
        let header = DolHeader::parse(data)?;
        if header.text_sections().next().is_none() {
            return Err(LoaderError::InvalidDol("No text sections".to_string()));
        }
        for (offset, _, size) in header.text_sections().chain(header.data_sections()) {
            let end = offset as u64 + size as u64;
            if (offset as usize) < DOL_HEADER_SIZE || end > data.len() as u64 {
                return Err(LoaderError::InvalidDol(format!(
                    "Section at 0x{:x} with size 0x{:x} lies outside the {} byte file",
                    offset,
                    size,
                    data.len()
                )));
            }
        }
        Ok(header)
    }

    fn section(&self, offset: u32, size: u32) -> &[u8] {
        &self.data[offset as usize..(offset + size) as usize]
    }
}

impl BootExecutableReader for DolReader {
    fn is_valid(&self) -> bool {
        self.header.is_some()
    }

    fn is_wii(&self) -> bool {
        self.header.as_ref().is_some_and(|header| {
            header
                .text_sections()
                .any(|(offset, _, size)| contains_hid4_access(self.section(offset, size)))
        })
    }

    fn load_into_memory(&self, memory: &Memory) -> Result<(), LoaderError> {
        let header = self
            .header
            .as_ref()
            .ok_or_else(|| LoaderError::InvalidDol("DOL header did not validate".to_string()))?;

        for (offset, address, size) in header.text_sections().chain(header.data_sections()) {
            debug!("DOL section 0x{:08x} (0x{:x} bytes)", address, size);
            memory.write_bytes(address, self.section(offset, size))?;
        }

        // BSS is left as-is; the runtime clears it itself

        info!("DOL loaded, entry point 0x{:08x}", header.entry_point);
        Ok(())
    }

    fn entry_point(&self) -> u32 {
        self.header.map(|h| h.entry_point).unwrap_or(0)
    }

    fn load_symbols(&self, _db: &mut SymbolDb) -> bool {
        false
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}
