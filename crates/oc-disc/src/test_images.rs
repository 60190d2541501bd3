//! Synthetic disc images for unit tests

use crate::fst::{align_up, build_fst, ContentPiece, FstNode};
use crate::volume::{header, GAMECUBE_DISC_MAGIC, WII_DISC_MAGIC};
use crate::volume_wii::{CLUSTER_DATA_SIZE, CLUSTER_HEADER_SIZE, CLUSTER_SIZE, PARTITION_TABLE, REGION_DATA};

pub(crate) const WII_GAME_PARTITION: u64 = 0x50000;
pub(crate) const DOL_ENTRY: u32 = 0x8000_3100;
const APPLOADER_BODY: usize = 0x20;
const DOL_TEXT_SIZE: usize = 0x20;

fn put32(image: &mut [u8], offset: u64, value: u32) {
    let offset = offset as usize;
    image[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
}

/// A DOL with one text section of `nop`s at `DOL_ENTRY`
pub(crate) fn build_dol() -> Vec<u8> {
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

/// Header, apploader, DOL, FST and files of one file system
pub(crate) fn build_filesystem(game_id: &str, revision: u8, wii: bool, files: &[(&str, &[u8])]) -> Vec<u8> {
    let shift = if wii { 2 } else { 0 };
    let dol = build_dol();
    let dol_offset = align_up(header::APPLOADER + 0x20 + APPLOADER_BODY as u64, 0x20);
    let fst_offset = align_up(dol_offset + dol.len() as u64, 0x20);

    let nodes: Vec<FstNode> = files
        .iter()
        .map(|(name, data)| FstNode::file(*name, vec![ContentPiece::data(data.to_vec())]))
        .collect();
    let fst_len = align_up(build_fst(&nodes, 0, shift).fst.len() as u64, 4);
    let built = build_fst(&nodes, fst_offset + fst_len, shift);

    let mut image = vec![0u8; built.end.max(fst_offset + fst_len) as usize];
    image[..game_id.len()].copy_from_slice(game_id.as_bytes());
    image[header::REVISION as usize] = revision;
    if wii {
        put32(&mut image, header::WII_MAGIC, WII_DISC_MAGIC);
    } else {
        put32(&mut image, header::GAMECUBE_MAGIC, GAMECUBE_DISC_MAGIC);
    }
    let name = b"Test Game";
    let name_at = header::INTERNAL_NAME as usize;
    image[name_at..name_at + name.len()].copy_from_slice(name);

    put32(&mut image, header::DOL_OFFSET, (dol_offset >> shift) as u32);
    put32(&mut image, header::FST_OFFSET, (fst_offset >> shift) as u32);
    put32(&mut image, header::FST_SIZE, (fst_len >> shift) as u32);
    put32(&mut image, header::FST_MAX_SIZE, (fst_len >> shift) as u32);
    put32(&mut image, header::GAMECUBE_REGION, 1);

    let apploader = header::APPLOADER as usize;
    image[apploader..apploader + 10].copy_from_slice(b"2004/02/01");
    put32(&mut image, header::APPLOADER + 0x10, 0x8120_0000);
    put32(&mut image, header::APPLOADER + 0x14, APPLOADER_BODY as u32);

    let dol_at = dol_offset as usize;
    image[dol_at..dol_at + dol.len()].copy_from_slice(&dol);
    let fst_at = fst_offset as usize;
    image[fst_at..fst_at + built.fst.len()].copy_from_slice(&built.fst);
    for ((offset, _), (_, data)) in built.files.iter().zip(files) {
        let at = *offset as usize;
        image[at..at + data.len()].copy_from_slice(data);
    }
    image
}

/// A GameCube image with `files` in its root directory
pub(crate) fn build_gamecube_image(game_id: &str, revision: u8, files: &[(&str, &[u8])]) -> Vec<u8> {
    build_filesystem(game_id, revision, false, files)
}

/// A Wii image whose single game partition holds `partition_data`
pub(crate) fn build_wii_image(game_id: &str, partition_data: &[u8], encrypted: bool) -> Vec<u8> {
    const TMD_OFFSET: u64 = 0x2C0;
    const DATA_OFFSET: u64 = 0x20000;

    let clusters = (partition_data.len() as u64).div_ceil(CLUSTER_DATA_SIZE).max(1);
    let data_size = clusters * CLUSTER_SIZE;
    let partition = WII_GAME_PARTITION;
    let mut image = vec![0u8; (partition + DATA_OFFSET + data_size) as usize];

    image[..game_id.len()].copy_from_slice(game_id.as_bytes());
    put32(&mut image, header::WII_MAGIC, WII_DISC_MAGIC);
    if !encrypted {
        image[0x60] = 1;
        image[0x61] = 1;
    }
    put32(&mut image, REGION_DATA, 1);

    put32(&mut image, PARTITION_TABLE, 1);
    put32(&mut image, PARTITION_TABLE + 4, ((PARTITION_TABLE + 0x20) >> 2) as u32);
    put32(&mut image, PARTITION_TABLE + 0x20, (partition >> 2) as u32);
    put32(&mut image, PARTITION_TABLE + 0x24, 0);

    let tmd_size = oc_ios::formats::TMD_HEADER_SIZE as u64;
    put32(&mut image, partition + 0x2A4, tmd_size as u32);
    put32(&mut image, partition + 0x2A8, (TMD_OFFSET >> 2) as u32);
    put32(&mut image, partition + 0x2B8, (DATA_OFFSET >> 2) as u32);
    put32(&mut image, partition + 0x2BC, (data_size >> 2) as u32);

    let tmd = partition + TMD_OFFSET;
    put32(&mut image, tmd + 0x184, 0x0000_0001);
    put32(&mut image, tmd + 0x188, 0x0000_0038);
    let title_low = u32::from_be_bytes([
        game_id.as_bytes()[0],
        game_id.as_bytes()[1],
        game_id.as_bytes()[2],
        game_id.as_bytes()[3],
    ]);
    put32(&mut image, tmd + 0x18C, 0x0001_0000);
    put32(&mut image, tmd + 0x190, title_low);

    for (i, chunk) in partition_data.chunks(CLUSTER_DATA_SIZE as usize).enumerate() {
        let at = (partition + DATA_OFFSET + i as u64 * CLUSTER_SIZE + CLUSTER_HEADER_SIZE) as usize;
        image[at..at + chunk.len()].copy_from_slice(chunk);
    }
    image
}
