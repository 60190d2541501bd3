//! ELF file parser (32-bit big-endian PowerPC)

use crate::reader::{contains_hid4_access, BootExecutableReader};
use crate::symbols::{SymbolDb, SymbolKind};
use oc_core::error::LoaderError;
use oc_memory::Memory;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, info, trace, warn};

/// ELF file header (32-bit)
#[derive(Debug, Clone, Copy, Default)]
pub struct Elf32Header {
    pub e_ident: [u8; 16],
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u32,
    pub e_phoff: u32,
    pub e_shoff: u32,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

/// ELF program header (32-bit)
#[derive(Debug, Clone, Copy, Default)]
pub struct Elf32Phdr {
    pub p_type: u32,
    pub p_offset: u32,
    pub p_vaddr: u32,
    pub p_paddr: u32,
    pub p_filesz: u32,
    pub p_memsz: u32,
    pub p_flags: u32,
    pub p_align: u32,
}

/// ELF section header (32-bit)
#[derive(Debug, Clone, Copy, Default)]
pub struct Elf32Shdr {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u32,
    pub sh_addr: u32,
    pub sh_offset: u32,
    pub sh_size: u32,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u32,
    pub sh_entsize: u32,
}

/// ELF magic bytes
pub const ELF_MAGIC: [u8; 4] = [0x7F, b'E', b'L', b'F'];

/// e_machine value for 32-bit PowerPC
pub const EM_PPC: u16 = 20;

const ELFCLASS32: u8 = 1;
const ELFDATA2MSB: u8 = 2;

/// Program header types
pub mod pt {
    pub const NULL: u32 = 0;
    pub const LOAD: u32 = 1;
}

/// Program header flags
pub mod pf {
    pub const X: u32 = 0x1;
    pub const W: u32 = 0x2;
    pub const R: u32 = 0x4;
}

/// Section header types
pub mod sht {
    pub const NULL: u32 = 0;
    pub const PROGBITS: u32 = 1;
    pub const SYMTAB: u32 = 2;
    pub const STRTAB: u32 = 3;
    pub const NOBITS: u32 = 8;
}

/// Symbol type
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;

/// ELF executable reader
///
/// The whole file is kept in memory; parse failures leave the reader in an invalid state
/// rather than failing construction, so callers can fall back to other readers.
pub struct ElfReader {
    data: Vec<u8>,
    header: Option<Elf32Header>,
    phdrs: Vec<Elf32Phdr>,
    shdrs: Vec<Elf32Shdr>,
}

impl ElfReader {
    /// Parse an ELF image from its raw bytes
    pub fn new(data: Vec<u8>) -> Self {
        let mut reader = Cursor::new(&data[..]);
        let parsed = Self::parse_header(&mut reader).and_then(|header| {
            let phdrs = Self::parse_phdrs(&mut reader, &header)?;
            let shdrs = Self::parse_shdrs(&mut reader, &header)?;
            Ok((header, phdrs, shdrs))
        });

        match parsed {
            Ok((header, phdrs, shdrs)) => {
                debug!(
                    "ELF parsed: entry=0x{:08x}, phdrs={}, shdrs={}",
                    header.e_entry,
                    phdrs.len(),
                    shdrs.len()
                );
                Self {
                    data,
                    header: Some(header),
                    phdrs,
                    shdrs,
                }
            }
            Err(e) => {
                debug!("Not a usable ELF: {}", e);
                Self {
                    data,
                    header: None,
                    phdrs: Vec::new(),
                    shdrs: Vec::new(),
                }
            }
        }
    }

    /// Read and parse an ELF file from disk
    pub fn from_file(path: &Path) -> Result<Self, LoaderError> {
        Ok(Self::new(std::fs::read(path)?))
    }

    /// Parsed file header, if the file is valid
    pub fn header(&self) -> Option<&Elf32Header> {
        self.header.as_ref()
    }

    /// Program headers
    pub fn program_headers(&self) -> &[Elf32Phdr] {
        &self.phdrs
    }

    fn segment_data(&self, phdr: &Elf32Phdr) -> Result<&[u8], LoaderError> {
        let start = phdr.p_offset as usize;
        let end = start + phdr.p_filesz as usize;
        self.data.get(start..end).ok_or_else(|| {
            LoaderError::InvalidElf(format!(
                "Segment at offset 0x{:x} with size 0x{:x} extends beyond the {} byte file",
                phdr.p_offset,
                phdr.p_filesz,
                self.data.len()
            ))
        })
    }

    fn section_data(&self, shdr: &Elf32Shdr) -> Option<&[u8]> {
        let start = shdr.sh_offset as usize;
        self.data.get(start..start + shdr.sh_size as usize)
    }

    /// Parse ELF header from reader
    pub fn parse_header<R: Read + Seek>(reader: &mut R) -> Result<Elf32Header, LoaderError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        if file_size < 52 {
            return Err(LoaderError::InvalidElf(format!(
                "File too small to be a valid ELF: {} bytes (minimum 52 bytes required for ELF32 header)",
                file_size
            )));
        }
        reader.seek(SeekFrom::Start(0))?;

        let mut header = Elf32Header::default();
        reader.read_exact(&mut header.e_ident)?;

        if header.e_ident[0..4] != ELF_MAGIC {
            return Err(LoaderError::InvalidElf("Invalid ELF magic bytes".to_string()));
        }
        if header.e_ident[4] != ELFCLASS32 {
            return Err(LoaderError::InvalidElf(format!(
                "Not a 32-bit ELF: class={}",
                header.e_ident[4]
            )));
        }
        if header.e_ident[5] != ELFDATA2MSB {
            return Err(LoaderError::InvalidElf(format!(
                "Not a big-endian ELF: data encoding={}",
                header.e_ident[5]
            )));
        }

        let mut buf = [0u8; 36];
        reader.read_exact(&mut buf)?;
        let be16 = |o: usize| u16::from_be_bytes([buf[o], buf[o + 1]]);
        let be32 = |o: usize| u32::from_be_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]);

        header.e_type = be16(0);
        header.e_machine = be16(2);
        header.e_version = be32(4);
        header.e_entry = be32(8);
        header.e_phoff = be32(12);
        header.e_shoff = be32(16);
        header.e_flags = be32(20);
        header.e_ehsize = be16(24);
        header.e_phentsize = be16(26);
        header.e_phnum = be16(28);
        header.e_shentsize = be16(30);
        header.e_shnum = be16(32);
        header.e_shstrndx = be16(34);

        if header.e_machine != EM_PPC {
            return Err(LoaderError::InvalidElf(format!(
                "Not a PowerPC ELF: machine={}",
                header.e_machine
            )));
        }

        Ok(header)
    }

    /// Parse program headers
    pub fn parse_phdrs<R: Read + Seek>(
        reader: &mut R,
        header: &Elf32Header,
    ) -> Result<Vec<Elf32Phdr>, LoaderError> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        let phtab_end = header.e_phoff as u64 + header.e_phnum as u64 * header.e_phentsize as u64;
        if phtab_end > file_size {
            return Err(LoaderError::InvalidElf(format!(
                "Program header table ends at 0x{:x} but file is only {} bytes",
                phtab_end, file_size
            )));
        }

        let mut phdrs = Vec::with_capacity(header.e_phnum as usize);
        for i in 0..header.e_phnum as u64 {
            reader.seek(SeekFrom::Start(
                header.e_phoff as u64 + i * header.e_phentsize as u64,
            ))?;
            let mut buf = [0u8; 32];
            reader.read_exact(&mut buf)?;
            let be32 = |o: usize| u32::from_be_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]);
            phdrs.push(Elf32Phdr {
                p_type: be32(0),
                p_offset: be32(4),
                p_vaddr: be32(8),
                p_paddr: be32(12),
                p_filesz: be32(16),
                p_memsz: be32(20),
                p_flags: be32(24),
                p_align: be32(28),
            });
        }

        Ok(phdrs)
    }

    /// Parse section headers
    pub fn parse_shdrs<R: Read + Seek>(
        reader: &mut R,
        header: &Elf32Header,
    ) -> Result<Vec<Elf32Shdr>, LoaderError> {
        if header.e_shoff == 0 || header.e_shnum == 0 {
            debug!("No section headers present");
            return Ok(Vec::new());
        }

        let file_size = reader.seek(SeekFrom::End(0))?;
        let shtab_end = header.e_shoff as u64 + header.e_shnum as u64 * header.e_shentsize as u64;
        if shtab_end > file_size {
            // Section headers are optional for execution
            debug!(
                "Section header table ends at 0x{:x} past the {} byte file, ignoring it",
                shtab_end, file_size
            );
            return Ok(Vec::new());
        }

        let mut shdrs = Vec::with_capacity(header.e_shnum as usize);
        for i in 0..header.e_shnum as u64 {
            reader.seek(SeekFrom::Start(
                header.e_shoff as u64 + i * header.e_shentsize as u64,
            ))?;
            let mut buf = [0u8; 40];
            reader.read_exact(&mut buf)?;
            let be32 = |o: usize| u32::from_be_bytes([buf[o], buf[o + 1], buf[o + 2], buf[o + 3]]);
            shdrs.push(Elf32Shdr {
                sh_name: be32(0),
                sh_type: be32(4),
                sh_flags: be32(8),
                sh_addr: be32(12),
                sh_offset: be32(16),
                sh_size: be32(20),
                sh_link: be32(24),
                sh_info: be32(28),
                sh_addralign: be32(32),
                sh_entsize: be32(36),
            });
        }

        Ok(shdrs)
    }
}

impl BootExecutableReader for ElfReader {
    fn is_valid(&self) -> bool {
        self.header.is_some()
    }

    fn is_wii(&self) -> bool {
        self.phdrs
            .iter()
            .filter(|phdr| phdr.p_type == pt::LOAD && phdr.p_flags & pf::X != 0)
            .filter_map(|phdr| self.segment_data(phdr).ok())
            .any(contains_hid4_access)
    }

    fn load_into_memory(&self, memory: &Memory) -> Result<(), LoaderError> {
        if self.header.is_none() {
            return Err(LoaderError::InvalidElf("ELF header did not parse".to_string()));
        }

        for (i, phdr) in self.phdrs.iter().enumerate() {
            if phdr.p_type != pt::LOAD {
                continue;
            }
            debug!(
                "Loading segment {}: vaddr=0x{:08x}, filesz=0x{:x}, memsz=0x{:x}",
                i, phdr.p_vaddr, phdr.p_filesz, phdr.p_memsz
            );

            memory.write_bytes(phdr.p_vaddr, self.segment_data(phdr)?)?;
            if phdr.p_memsz > phdr.p_filesz {
                memory.fill(
                    phdr.p_vaddr + phdr.p_filesz,
                    phdr.p_memsz - phdr.p_filesz,
                    0,
                )?;
            }
        }

        info!("ELF loaded, entry point 0x{:08x}", self.entry_point());
        Ok(())
    }

    fn entry_point(&self) -> u32 {
        self.header.map(|h| h.e_entry).unwrap_or(0)
    }

    fn load_symbols(&self, db: &mut SymbolDb) -> bool {
        let Some(symtab) = self.shdrs.iter().find(|sh| sh.sh_type == sht::SYMTAB) else {
            debug!("No symbol table found");
            return false;
        };
        let Some(strtab) = self
            .shdrs
            .get(symtab.sh_link as usize)
            .and_then(|sh| self.section_data(sh))
        else {
            warn!("Symbol table links to a missing string table");
            return false;
        };
        let Some(entries) = self.section_data(symtab) else {
            warn!("Symbol table extends beyond the file");
            return false;
        };

        let mut added = 0;
        for entry in entries.chunks_exact(16) {
            let be32 = |o: usize| {
                u32::from_be_bytes([entry[o], entry[o + 1], entry[o + 2], entry[o + 3]])
            };
            let st_name = be32(0) as usize;
            let st_value = be32(4);
            let st_size = be32(8);
            let st_info = entry[12];

            let kind = match st_info & 0xF {
                STT_FUNC => SymbolKind::Function,
                STT_OBJECT => SymbolKind::Data,
                _ => continue,
            };
            if st_name == 0 || st_name >= strtab.len() || st_value == 0 {
                continue;
            }

            let name_end = strtab[st_name..]
                .iter()
                .position(|&b| b == 0)
                .map(|pos| st_name + pos)
                .unwrap_or(strtab.len());
            let name = String::from_utf8_lossy(&strtab[st_name..name_end]).to_string();

            trace!("Symbol {} at 0x{:08x} (size 0x{:x})", name, st_value, st_size);
            db.add(st_value, st_size, &name, kind);
            added += 1;
        }

        if added > 0 {
            info!("Loaded {} symbols from ELF", added);
        }
        added > 0
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}
