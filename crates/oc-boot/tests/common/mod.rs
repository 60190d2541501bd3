//! Synthetic boot artifacts shared by the integration tests

#![allow(dead_code)]

use oc_boot::{BootConfig, BootManager, Machine};
use oc_core::config::PathConfig;
use oc_core::{Config, Platform, RecordingHost};
use oc_ios::iosc::{aes_encrypt, content_iv, sha1, title_key_iv};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub const DOL_ENTRY: u32 = 0x8000_3100;
pub const DOL_TEXT_SIZE: usize = 0x40;
pub const ELF_ENTRY: u32 = 0x8000_4000;
/// Common key written by [`Fixture::write_keys`]
pub const COMMON_KEY: [u8; 16] = [0x11; 16];

const DISC_DOL_OFFSET: usize = 0x2460;
const WII_PARTITION: usize = 0x50000;
const WII_PARTITION_DATA: usize = 0x20000;
const WII_CLUSTER_SIZE: usize = 0x8000;
const WII_CLUSTER_HEADER: usize = 0x400;

fn put16(buf: &mut [u8], offset: usize, value: u16) {
    buf[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
}

fn put32(buf: &mut [u8], offset: usize, value: u32) {
    buf[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// Scratch user directory with a configuration pointing into it
pub struct Fixture {
    pub dir: TempDir,
    pub config: Config,
    pub host: Arc<RecordingHost>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.paths = PathConfig::with_user_dir(dir.path().to_path_buf());
        Self {
            dir,
            config,
            host: Arc::new(RecordingHost::new()),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, data: &[u8]) -> PathBuf {
        let path = self.path(name);
        std::fs::write(&path, data).unwrap();
        path
    }

    pub fn manager(&self) -> BootManager {
        BootManager::new(self.config.clone(), self.host.clone())
    }

    pub fn machine(&self, platform: Platform) -> Machine {
        Machine::new(BootConfig::from_config(&self.config, platform), self.host.clone()).unwrap()
    }

    /// Key file holding [`COMMON_KEY`]
    pub fn write_keys(&self) {
        let hex: String = COMMON_KEY.iter().map(|b| format!("{:02x}", b)).collect();
        std::fs::write(&self.config.paths.keys, format!("common_key = \"{}\"\n", hex)).unwrap();
    }

    /// Host path of a NAND file
    pub fn nand_host_path(&self, nand_path: &str) -> PathBuf {
        self.config
            .paths
            .nand_root
            .join(nand_path.trim_start_matches('/'))
    }

    /// Write `data` as an installed NAND file
    pub fn write_nand(&self, nand_path: &str, data: &[u8]) {
        let host = self.nand_host_path(nand_path);
        std::fs::create_dir_all(host.parent().unwrap()).unwrap();
        std::fs::write(host, data).unwrap();
    }
}

/// A DOL with one text section of `nop`s at [`DOL_ENTRY`]
pub fn build_dol() -> Vec<u8> {
    let mut dol = vec![0u8; 0x100 + DOL_TEXT_SIZE];
    put32(&mut dol, 0x00, 0x100);
    put32(&mut dol, 0x48, DOL_ENTRY);
    put32(&mut dol, 0x90, DOL_TEXT_SIZE as u32);
    put32(&mut dol, 0xE0, DOL_ENTRY);
    for word in dol[0x100..].chunks_mut(4) {
        word.copy_from_slice(&0x6000_0000u32.to_be_bytes());
    }
    dol
}

/// Header, DOL and an empty file tree; `shift` is 2 inside a Wii partition
fn build_filesystem(game_id: &str, shift: u32) -> Vec<u8> {
    let dol = build_dol();
    let fst_offset = (DISC_DOL_OFFSET + dol.len() + 0x1F) & !0x1F;
    // root directory entry followed by an empty string table
    let fst: [u8; 13] = [1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 0];
    let fst_size = 0x20;

    let mut image = vec![0u8; fst_offset + fst_size];
    image[..game_id.len()].copy_from_slice(game_id.as_bytes());
    image[0x20..0x29].copy_from_slice(b"Test Game");
    put32(&mut image, 0x420, (DISC_DOL_OFFSET >> shift) as u32);
    put32(&mut image, 0x424, (fst_offset >> shift) as u32);
    put32(&mut image, 0x428, (fst_size >> shift) as u32);
    put32(&mut image, 0x42C, (fst_size >> shift) as u32);
    image[0x2440..0x244A].copy_from_slice(b"2004/02/01");
    image[DISC_DOL_OFFSET..DISC_DOL_OFFSET + dol.len()].copy_from_slice(&dol);
    image[fst_offset..fst_offset + fst.len()].copy_from_slice(&fst);
    image
}

/// A GameCube image; `region_code` 0 = NTSC-J, 1 = NTSC-U, 2 = PAL
pub fn build_gamecube_image(game_id: &str, region_code: u32) -> Vec<u8> {
    let mut image = build_filesystem(game_id, 0);
    put32(&mut image, 0x1C, 0xC233_9F3D);
    put32(&mut image, 0x458, region_code);
    image
}

/// A Wii image with encryption disabled and one game partition running IOS56
pub fn build_wii_image(game_id: &str) -> Vec<u8> {
    const TMD_OFFSET: usize = 0x2C0;
    const TMD_SIZE: usize = 0x1E4;

    let mut data = build_filesystem(game_id, 2);
    data.resize(data.len().max(0x2440 + 0x20), 0);
    let cluster_data = WII_CLUSTER_SIZE - WII_CLUSTER_HEADER;
    let clusters = data.len().div_ceil(cluster_data);
    let data_size = clusters * WII_CLUSTER_SIZE;

    let mut image = vec![0u8; WII_PARTITION + WII_PARTITION_DATA + data_size];
    image[..game_id.len()].copy_from_slice(game_id.as_bytes());
    put32(&mut image, 0x18, 0x5D1C_9EA3);
    image[0x60] = 1;
    image[0x61] = 1;
    put32(&mut image, 0x4E000, 1);

    put32(&mut image, 0x40000, 1);
    put32(&mut image, 0x40004, (0x40020 >> 2) as u32);
    put32(&mut image, 0x40020, (WII_PARTITION >> 2) as u32);
    put32(&mut image, 0x40024, 0);

    let partition = WII_PARTITION;
    put32(&mut image, partition + 0x2A4, TMD_SIZE as u32);
    put32(&mut image, partition + 0x2A8, (TMD_OFFSET >> 2) as u32);
    put32(&mut image, partition + 0x2B8, (WII_PARTITION_DATA >> 2) as u32);
    put32(&mut image, partition + 0x2BC, (data_size >> 2) as u32);

    let tmd = partition + TMD_OFFSET;
    put32(&mut image, tmd + 0x184, 0x0000_0001);
    put32(&mut image, tmd + 0x188, 0x0000_0038);
    put32(&mut image, tmd + 0x18C, 0x0001_0000);
    image[tmd + 0x190..tmd + 0x194].copy_from_slice(&game_id.as_bytes()[..4]);

    for (i, chunk) in data.chunks(cluster_data).enumerate() {
        let at = partition + WII_PARTITION_DATA + i * WII_CLUSTER_SIZE + WII_CLUSTER_HEADER;
        image[at..at + chunk.len()].copy_from_slice(chunk);
    }
    image
}

/// A big-endian PowerPC ELF with one executable segment at [`ELF_ENTRY`]
///
/// With `wii` set the code contains `mtspr HID4, r3`, which marks it as a Broadway binary.
/// `symbols` become function symbols in `.symtab`.
pub fn build_elf(wii: bool, symbols: &[(&str, u32)]) -> Vec<u8> {
    let mut code = vec![0x60, 0, 0, 0, 0x4E, 0x80, 0x00, 0x20];
    if wii {
        code.extend_from_slice(&0x7C73_FBA6u32.to_be_bytes());
    }

    let mut symtab = vec![0u8; 16];
    let mut strtab = vec![0u8];
    for (name, address) in symbols {
        let mut sym = [0u8; 16];
        put32(&mut sym, 0, strtab.len() as u32);
        put32(&mut sym, 4, *address);
        put32(&mut sym, 8, 4);
        // STB_GLOBAL | STT_FUNC
        sym[12] = 0x12;
        put16(&mut sym, 14, 1);
        symtab.extend_from_slice(&sym);
        strtab.extend_from_slice(name.as_bytes());
        strtab.push(0);
    }

    let code_offset = 0x100;
    let symtab_offset = code_offset + code.len();
    let strtab_offset = symtab_offset + symtab.len();
    let shoff = (strtab_offset + strtab.len() + 3) & !3;
    let mut elf = vec![0u8; shoff + 40 * 3];

    elf[0..4].copy_from_slice(&[0x7F, b'E', b'L', b'F']);
    elf[4] = 1;
    elf[5] = 2;
    elf[6] = 1;
    put16(&mut elf, 16, 2);
    put16(&mut elf, 18, 20);
    put32(&mut elf, 20, 1);
    put32(&mut elf, 24, ELF_ENTRY);
    put32(&mut elf, 28, 52);
    put32(&mut elf, 32, shoff as u32);
    put16(&mut elf, 40, 52);
    put16(&mut elf, 42, 32);
    put16(&mut elf, 44, 1);
    put16(&mut elf, 46, 40);
    put16(&mut elf, 48, 3);

    // PT_LOAD, R+X
    put32(&mut elf, 52, 1);
    put32(&mut elf, 56, code_offset as u32);
    put32(&mut elf, 60, ELF_ENTRY);
    put32(&mut elf, 64, ELF_ENTRY & 0x1FFF_FFFF);
    put32(&mut elf, 68, code.len() as u32);
    put32(&mut elf, 72, code.len() as u32);
    put32(&mut elf, 76, 0x4 | 0x1);

    elf[code_offset..code_offset + code.len()].copy_from_slice(&code);
    elf[symtab_offset..symtab_offset + symtab.len()].copy_from_slice(&symtab);
    elf[strtab_offset..strtab_offset + strtab.len()].copy_from_slice(&strtab);

    let sym_sh = shoff + 40;
    put32(&mut elf, sym_sh + 4, 2);
    put32(&mut elf, sym_sh + 16, symtab_offset as u32);
    put32(&mut elf, sym_sh + 20, symtab.len() as u32);
    put32(&mut elf, sym_sh + 24, 2);
    put32(&mut elf, sym_sh + 36, 16);
    let str_sh = shoff + 80;
    put32(&mut elf, str_sh + 4, 3);
    put32(&mut elf, str_sh + 16, strtab_offset as u32);
    put32(&mut elf, str_sh + 20, strtab.len() as u32);

    elf
}

/// A TMD whose single content is the boot content
pub fn build_tmd(title_id: u64, ios_id: u64, content_id: u32, content_size: u64) -> Vec<u8> {
    let mut tmd = vec![0u8; 0x1E4 + 0x24];
    tmd[0x184..0x18C].copy_from_slice(&ios_id.to_be_bytes());
    tmd[0x18C..0x194].copy_from_slice(&title_id.to_be_bytes());
    put16(&mut tmd, 0x198, 0x3031);
    put16(&mut tmd, 0x1DC, 1);
    put16(&mut tmd, 0x1DE, 1);
    put16(&mut tmd, 0x1E0, 0);
    put32(&mut tmd, 0x1E4, content_id);
    put16(&mut tmd, 0x1E8, 0);
    put16(&mut tmd, 0x1EA, 1);
    tmd[0x1EC..0x1F4].copy_from_slice(&content_size.to_be_bytes());
    tmd
}

/// A WAD for `title_id` whose only content, id 0, is `content`
///
/// The title key is encrypted with [`COMMON_KEY`].
pub fn build_wad(title_id: u64, ios_id: u64, content: &[u8]) -> Vec<u8> {
    const TICKET_SIZE: usize = 0x2A4;
    let title_key = [0x5Au8; 16];

    let mut ticket = vec![0u8; TICKET_SIZE];
    let encrypted_key = aes_encrypt(&COMMON_KEY, &title_key_iv(title_id), &title_key).unwrap();
    ticket[0x1BF..0x1CF].copy_from_slice(&encrypted_key);
    ticket[0x1DC..0x1E4].copy_from_slice(&title_id.to_be_bytes());

    let mut tmd = build_tmd(title_id, ios_id, 0, content.len() as u64);
    tmd[0x1F4..0x208].copy_from_slice(&sha1(content));
    let encrypted = aes_encrypt(&title_key, &content_iv(0), content).unwrap();

    let cert = vec![0xCC; 0x10];
    let mut wad = Vec::new();
    for word in [
        0x20,
        0x4973_0000,
        cert.len() as u32,
        0,
        ticket.len() as u32,
        tmd.len() as u32,
        encrypted.len() as u32,
        0,
    ] {
        wad.extend_from_slice(&word.to_be_bytes());
    }
    for section in [&cert, &ticket, &tmd, &encrypted] {
        wad.resize(wad.len().next_multiple_of(0x40), 0);
        wad.extend_from_slice(section);
    }
    wad.resize(wad.len().next_multiple_of(0x40), 0);
    wad
}

/// FIFO log header; `wii` sets the platform flag
pub fn build_dff(wii: bool) -> Vec<u8> {
    let mut data = vec![0u8; 0x80];
    data[0..4].copy_from_slice(&0x0D01_F1F0u32.to_le_bytes());
    data[4..8].copy_from_slice(&5u32.to_le_bytes());
    data[8..12].copy_from_slice(&1u32.to_le_bytes());
    data[0x44..0x48].copy_from_slice(&3u32.to_le_bytes());
    data[0x48..0x4C].copy_from_slice(&(wii as u32).to_le_bytes());
    data
}

pub fn file_name(path: &Path) -> String {
    path.file_name().unwrap().to_string_lossy().into_owned()
}
