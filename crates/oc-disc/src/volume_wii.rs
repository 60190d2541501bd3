//! Wii disc volumes
//!
//! Partition data is stored in 0x8000-byte clusters, each starting with 0x400 bytes of
//! hashes. Images with encryption disabled are read directly; encrypted partitions need the
//! decrypting volume provider and fail with `DiscError::EncryptedPartition` here.

use crate::blob::BlobReader;
use crate::volume::{detect_platform, region_from_code, Partition, VolumeDisc};
use oc_core::error::DiscError;
use oc_core::{Platform, Region};
use oc_ios::TmdReader;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const PARTITION_TABLE: u64 = 0x40000;
pub const REGION_DATA: u64 = 0x4E000;
pub const CLUSTER_SIZE: u64 = 0x8000;
pub const CLUSTER_HEADER_SIZE: u64 = 0x400;
pub const CLUSTER_DATA_SIZE: u64 = CLUSTER_SIZE - CLUSTER_HEADER_SIZE;

/// Partition type of the game partition
pub const PARTITION_TYPE_GAME: u32 = 0;

const PARTITION_TMD_SIZE: u64 = 0x2A4;
const PARTITION_TMD_OFFSET: u64 = 0x2A8;
const PARTITION_DATA_OFFSET: u64 = 0x2B8;
const PARTITION_DATA_SIZE: u64 = 0x2BC;

#[derive(Debug, Clone)]
struct PartitionInfo {
    kind: u32,
    tmd: Option<TmdReader>,
    data_offset: u64,
    data_size: u64,
}

/// A Wii disc
pub struct VolumeWii {
    reader: Box<dyn BlobReader>,
    encrypted: bool,
    partitions: BTreeMap<Partition, PartitionInfo>,
    game_partition: Partition,
}

impl VolumeWii {
    /// Wrap `reader` if it holds a Wii disc header
    pub fn new(reader: Box<dyn BlobReader>) -> Option<Self> {
        let mut head = [0u8; 0x20];
        reader.read(0, &mut head).ok()?;
        if detect_platform(&head) != Some(Platform::Wii) {
            return None;
        }

        let read32 = |offset: u64| -> Option<u32> {
            let mut buf = [0u8; 4];
            reader.read(offset, &mut buf).ok()?;
            Some(u32::from_be_bytes(buf))
        };

        // bytes 0x60/0x61 disable hash checks and encryption
        let encrypted = read32(0x60)? == 0;

        let mut partitions = BTreeMap::new();
        for group in 0..4u64 {
            let count = read32(PARTITION_TABLE + group * 8).unwrap_or(0);
            let table = (read32(PARTITION_TABLE + group * 8 + 4).unwrap_or(0) as u64) << 2;
            for i in 0..count as u64 {
                let Some(offset) = read32(table + i * 8).map(|o| (o as u64) << 2) else {
                    continue;
                };
                let kind = read32(table + i * 8 + 4).unwrap_or(u32::MAX);

                let tmd_size = read32(offset + PARTITION_TMD_SIZE).unwrap_or(0) as usize;
                let tmd_offset = (read32(offset + PARTITION_TMD_OFFSET).unwrap_or(0) as u64) << 2;
                let mut tmd_bytes = vec![0u8; tmd_size];
                let tmd = reader
                    .read(offset + tmd_offset, &mut tmd_bytes)
                    .ok()
                    .map(|_| TmdReader::new(tmd_bytes))
                    .filter(TmdReader::is_valid);

                let info = PartitionInfo {
                    kind,
                    tmd,
                    data_offset: (read32(offset + PARTITION_DATA_OFFSET).unwrap_or(0) as u64) << 2,
                    data_size: (read32(offset + PARTITION_DATA_SIZE).unwrap_or(0) as u64) << 2,
                };
                debug!(
                    "Wii partition at 0x{:x}: type {}, data 0x{:x}+0x{:x}",
                    offset, info.kind, info.data_offset, info.data_size
                );
                partitions.insert(Partition(offset), info);
            }
        }

        let game_partition = partitions
            .iter()
            .find(|(_, info)| info.kind == PARTITION_TYPE_GAME)
            .map(|(partition, _)| *partition)
            .unwrap_or(Partition::NONE);
        if game_partition.is_none() {
            warn!("Wii disc has no game partition");
        }

        Some(Self {
            reader,
            encrypted,
            partitions,
            game_partition,
        })
    }
}

impl VolumeDisc for VolumeWii {
    fn read(&self, offset: u64, buf: &mut [u8], partition: Partition) -> Result<(), DiscError> {
        if partition.is_none() {
            return self.reader.read(offset, buf);
        }
        let info = self
            .partitions
            .get(&partition)
            .ok_or(DiscError::NoSuchPartition(partition.0))?;
        if self.encrypted {
            return Err(DiscError::EncryptedPartition(partition.0));
        }

        let capacity = info.data_size / CLUSTER_SIZE * CLUSTER_DATA_SIZE;
        if offset + buf.len() as u64 > capacity {
            return Err(DiscError::ReadOutOfBounds {
                offset,
                length: buf.len() as u64,
            });
        }

        let base = partition.0 + info.data_offset;
        let mut done = 0usize;
        while done < buf.len() {
            let position = offset + done as u64;
            let cluster = position / CLUSTER_DATA_SIZE;
            let within = position % CLUSTER_DATA_SIZE;
            let chunk = ((CLUSTER_DATA_SIZE - within) as usize).min(buf.len() - done);
            let physical = base + cluster * CLUSTER_SIZE + CLUSTER_HEADER_SIZE + within;
            self.reader.read(physical, &mut buf[done..done + chunk])?;
            done += chunk;
        }
        Ok(())
    }

    fn platform(&self) -> Platform {
        Platform::Wii
    }

    fn region(&self) -> Region {
        self.read_be32(REGION_DATA, Partition::NONE)
            .map(region_from_code)
            .unwrap_or(Region::Unknown)
    }

    fn game_partition(&self) -> Partition {
        self.game_partition
    }

    fn partitions(&self) -> Vec<Partition> {
        self.partitions.keys().copied().collect()
    }

    fn tmd(&self, partition: Partition) -> Option<TmdReader> {
        self.partitions.get(&partition)?.tmd.clone()
    }

    fn size(&self) -> u64 {
        self.reader.size()
    }

    fn is_encrypted(&self) -> bool {
        self.encrypted
    }
}
