//! GameCube disc volumes

use crate::blob::BlobReader;
use crate::volume::{detect_platform, header, region_from_code, Partition, VolumeDisc};
use oc_core::error::DiscError;
use oc_core::{Platform, Region};

/// A GameCube disc: one unpartitioned, unencrypted file system
pub struct VolumeGc {
    reader: Box<dyn BlobReader>,
}

impl VolumeGc {
    /// Wrap `reader` if it holds a GameCube disc header
    pub fn new(reader: Box<dyn BlobReader>) -> Option<Self> {
        let mut magic = [0u8; 0x20];
        reader.read(0, &mut magic).ok()?;
        (detect_platform(&magic) == Some(Platform::GameCube)).then_some(Self { reader })
    }
}

impl VolumeDisc for VolumeGc {
    fn read(&self, offset: u64, buf: &mut [u8], partition: Partition) -> Result<(), DiscError> {
        if !partition.is_none() {
            return Err(DiscError::NoSuchPartition(partition.0));
        }
        self.reader.read(offset, buf)
    }

    fn platform(&self) -> Platform {
        Platform::GameCube
    }

    fn region(&self) -> Region {
        self.read_be32(header::GAMECUBE_REGION, Partition::NONE)
            .map(region_from_code)
            .unwrap_or(Region::Unknown)
    }

    fn game_partition(&self) -> Partition {
        Partition::NONE
    }

    fn size(&self) -> u64 {
        self.reader.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobReader;
    use crate::test_images::build_gamecube_image;

    #[test]
    fn test_gamecube_header() {
        let image = build_gamecube_image("GALE01", 2, &[]);
        let volume = VolumeGc::new(Box::new(MemoryBlobReader::new(image))).unwrap();
        assert_eq!(volume.game_id(Partition::NONE), "GALE01");
        assert_eq!(volume.revision(Partition::NONE), 2);
        assert_eq!(volume.disc_number(Partition::NONE), 0);
        assert_eq!(volume.region(), Region::NtscU);
        assert_eq!(volume.internal_name(Partition::NONE), "Test Game");
        assert!(volume.tmd(Partition::NONE).is_none());
        assert!(matches!(
            volume.read(0, &mut [0u8; 4], Partition(0x50000)),
            Err(DiscError::NoSuchPartition(0x50000))
        ));
    }

    #[test]
    fn test_rejects_non_gamecube() {
        assert!(VolumeGc::new(Box::new(MemoryBlobReader::new(vec![0u8; 0x100]))).is_none());
    }
}
