//! WAD installation packages

use crate::blob::{create_blob_reader, BlobReader};
use crate::fst::align_up;
use oc_core::error::DiscError;
use oc_ios::{Content, TicketReader, TmdReader};
use std::path::Path;
use tracing::{debug, warn};

/// Sections of a WAD start on this boundary
pub const WAD_ALIGNMENT: u64 = 0x40;
const HEADER_SIZE: u64 = 0x20;

/// Fixed header at the start of a WAD
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WadHeader {
    pub header_size: u32,
    pub wad_type: u32,
    pub cert_chain_size: u32,
    pub ticket_size: u32,
    pub tmd_size: u32,
    pub data_size: u32,
    pub footer_size: u32,
}

impl WadHeader {
    pub fn parse(bytes: &[u8; HEADER_SIZE as usize]) -> Self {
        let word = |i: usize| u32::from_be_bytes([bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]]);
        Self {
            header_size: word(0x00),
            wad_type: word(0x04),
            cert_chain_size: word(0x08),
            ticket_size: word(0x10),
            tmd_size: word(0x14),
            data_size: word(0x18),
            footer_size: word(0x1C),
        }
    }

    fn cert_chain_offset(&self) -> u64 {
        align_up(self.header_size as u64, WAD_ALIGNMENT)
    }

    fn ticket_offset(&self) -> u64 {
        align_up(self.cert_chain_offset() + self.cert_chain_size as u64, WAD_ALIGNMENT)
    }

    fn tmd_offset(&self) -> u64 {
        align_up(self.ticket_offset() + self.ticket_size as u64, WAD_ALIGNMENT)
    }

    fn data_offset(&self) -> u64 {
        align_up(self.tmd_offset() + self.tmd_size as u64, WAD_ALIGNMENT)
    }
}

/// An opened WAD: ticket, TMD and encrypted contents
pub struct VolumeWad {
    reader: Box<dyn BlobReader>,
    header: WadHeader,
    ticket: TicketReader,
    tmd: TmdReader,
}

impl std::fmt::Debug for VolumeWad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeWad")
            .field("title_id", &format_args!("{:016x}", self.title_id()))
            .field("header", &self.header)
            .finish()
    }
}

impl VolumeWad {
    pub fn new(reader: Box<dyn BlobReader>) -> Result<Self, DiscError> {
        let mut raw = [0u8; HEADER_SIZE as usize];
        reader.read(0, &mut raw)?;
        let header = WadHeader::parse(&raw);
        if header.header_size as u64 != HEADER_SIZE {
            return Err(DiscError::InvalidWad(format!(
                "unexpected header size 0x{:x}",
                header.header_size
            )));
        }

        if header.data_offset() > reader.size() {
            return Err(DiscError::InvalidWad(format!(
                "sections end at 0x{:x}, past the end of the file (0x{:x} bytes)",
                header.data_offset(),
                reader.size()
            )));
        }

        let mut ticket = vec![0u8; header.ticket_size as usize];
        reader.read(header.ticket_offset(), &mut ticket)?;
        let ticket = TicketReader::parse(ticket).map_err(|e| DiscError::InvalidWad(e.to_string()))?;

        let mut tmd = vec![0u8; header.tmd_size as usize];
        reader.read(header.tmd_offset(), &mut tmd)?;
        let tmd = TmdReader::parse(tmd).map_err(|e| DiscError::InvalidWad(e.to_string()))?;

        if ticket.title_id() != tmd.title_id() {
            warn!(
                "WAD ticket is for {:016x} but the TMD is for {:016x}",
                ticket.title_id(),
                tmd.title_id()
            );
        }
        debug!(
            "WAD for {:016x}: {} contents, data at 0x{:x}",
            tmd.title_id(),
            tmd.num_contents(),
            header.data_offset()
        );

        Ok(Self {
            reader,
            header,
            ticket,
            tmd,
        })
    }

    pub fn header(&self) -> &WadHeader {
        &self.header
    }

    pub fn ticket(&self) -> &TicketReader {
        &self.ticket
    }

    pub fn tmd(&self) -> &TmdReader {
        &self.tmd
    }

    pub fn title_id(&self) -> u64 {
        self.tmd.title_id()
    }

    pub fn cert_chain(&self) -> Result<Vec<u8>, DiscError> {
        let mut chain = vec![0u8; self.header.cert_chain_size as usize];
        self.reader.read(self.header.cert_chain_offset(), &mut chain)?;
        Ok(chain)
    }

    /// Encrypted bytes of the `position`-th content in TMD order
    pub fn content_data(&self, position: usize) -> Result<Vec<u8>, DiscError> {
        let contents = self.tmd.contents();
        let content = contents
            .get(position)
            .ok_or_else(|| DiscError::InvalidWad(format!("no content at position {}", position)))?;

        let mut offset = self.header.data_offset();
        for previous in &contents[..position] {
            offset += align_up(previous.size, WAD_ALIGNMENT);
        }
        let size = align_up(content.size, 0x10);
        if offset + size > self.reader.size() {
            return Err(DiscError::InvalidWad(format!(
                "content {:08x} (0x{:x} bytes at 0x{:x}) is truncated",
                content.id, size, offset
            )));
        }
        let mut data = vec![0u8; size as usize];
        self.reader.read(offset, &mut data)?;
        Ok(data)
    }

    /// Every content record paired with its encrypted bytes
    pub fn contents(&self) -> Result<Vec<(Content, Vec<u8>)>, DiscError> {
        self.tmd
            .contents()
            .into_iter()
            .enumerate()
            .map(|(i, content)| Ok((content, self.content_data(i)?)))
            .collect()
    }
}

/// Open a WAD file
pub fn create_wad(path: &Path) -> Option<VolumeWad> {
    let reader = create_blob_reader(path)?;
    match VolumeWad::new(reader) {
        Ok(wad) => Some(wad),
        Err(e) => {
            warn!("{} is not a valid WAD: {}", path.display(), e);
            None
        }
    }
}
