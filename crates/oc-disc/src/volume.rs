//! Disc volume abstraction

use oc_core::error::DiscError;
use oc_core::{Platform, Region};
use oc_ios::TmdReader;

/// Magic word at 0x18 of a Wii disc header
pub const WII_DISC_MAGIC: u32 = 0x5D1C_9EA3;
/// Magic word at 0x1C of a GameCube disc header
pub const GAMECUBE_DISC_MAGIC: u32 = 0xC233_9F3D;

/// Offsets in the disc header (boot.bin)
pub mod header {
    pub const GAME_ID: u64 = 0x0;
    pub const DISC_NUMBER: u64 = 0x6;
    pub const REVISION: u64 = 0x7;
    pub const WII_MAGIC: u64 = 0x18;
    pub const GAMECUBE_MAGIC: u64 = 0x1C;
    pub const INTERNAL_NAME: u64 = 0x20;
    pub const DOL_OFFSET: u64 = 0x420;
    pub const FST_OFFSET: u64 = 0x424;
    pub const FST_SIZE: u64 = 0x428;
    pub const FST_MAX_SIZE: u64 = 0x42C;
    /// bi2.bin follows the 0x440-byte boot.bin
    pub const BI2: u64 = 0x440;
    pub const BI2_SIZE: usize = 0x2000;
    pub const GAMECUBE_REGION: u64 = 0x458;
    pub const APPLOADER: u64 = 0x2440;
}

/// A partition on a disc, identified by its offset; `NONE` addresses the raw disc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition(pub u64);

impl Partition {
    pub const NONE: Partition = Partition(u64::MAX);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

/// A readable GameCube or Wii disc
pub trait VolumeDisc: Send + Sync {
    /// Read decoded bytes from `partition`, or from the raw disc for `Partition::NONE`
    fn read(&self, offset: u64, buf: &mut [u8], partition: Partition) -> Result<(), DiscError>;

    fn platform(&self) -> Platform;

    /// Region the disc was released for
    fn region(&self) -> Region;

    /// Partition holding the game's executable and file system
    fn game_partition(&self) -> Partition;

    /// Every partition on the disc
    fn partitions(&self) -> Vec<Partition> {
        Vec::new()
    }

    /// TMD of a partition (Wii only)
    fn tmd(&self, _partition: Partition) -> Option<TmdReader> {
        None
    }

    /// Total size of the raw disc image
    fn size(&self) -> u64;

    /// Whether partition contents are stored encrypted
    fn is_encrypted(&self) -> bool {
        false
    }

    fn read_be32(&self, offset: u64, partition: Partition) -> Result<u32, DiscError> {
        let mut buf = [0u8; 4];
        self.read(offset, &mut buf, partition)?;
        Ok(u32::from_be_bytes(buf))
    }

    fn read_u8(&self, offset: u64, partition: Partition) -> Result<u8, DiscError> {
        let mut buf = [0u8; 1];
        self.read(offset, &mut buf, partition)?;
        Ok(buf[0])
    }

    /// Read an offset field, which Wii partitions store divided by four
    fn read_offset(&self, offset: u64, partition: Partition) -> Result<u64, DiscError> {
        let value = self.read_be32(offset, partition)? as u64;
        Ok(if self.platform().is_wii() && !partition.is_none() {
            value << 2
        } else {
            value
        })
    }

    /// Six-character game id
    fn game_id(&self, partition: Partition) -> String {
        let mut buf = [0u8; 6];
        if self.read(header::GAME_ID, &mut buf, partition).is_err() {
            return String::new();
        }
        decode_string(&buf)
    }

    fn revision(&self, partition: Partition) -> u16 {
        self.read_u8(header::REVISION, partition).map(u16::from).unwrap_or(0)
    }

    fn disc_number(&self, partition: Partition) -> u8 {
        self.read_u8(header::DISC_NUMBER, partition).unwrap_or(0)
    }

    /// Game name stored in the header
    fn internal_name(&self, partition: Partition) -> String {
        let mut buf = [0u8; 0x60];
        if self.read(header::INTERNAL_NAME, &mut buf, partition).is_err() {
            return String::new();
        }
        decode_string(&buf)
    }
}

/// NUL-terminated ASCII field to `String`
pub(crate) fn decode_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).trim_end().to_string()
}

/// Map the region code stored on a disc
pub(crate) fn region_from_code(code: u32) -> Region {
    Region::from_disc_code(code)
}

/// Platform a raw disc header belongs to, if any
pub fn detect_platform(header: &[u8]) -> Option<Platform> {
    let word = |o: usize| {
        header
            .get(o..o + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    };
    if word(header::WII_MAGIC as usize) == Some(WII_DISC_MAGIC) {
        Some(Platform::Wii)
    } else if word(header::GAMECUBE_MAGIC as usize) == Some(GAMECUBE_DISC_MAGIC) {
        Some(Platform::GameCube)
    } else {
        None
    }
}
