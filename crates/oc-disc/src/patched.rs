//! A disc volume whose game file system has been rebuilt with patched files

use crate::fst::{align_up, build_fst, parse_fst, read_pieces, ContentPiece, ContentSource, FstNode};
use crate::volume::{header, Partition, VolumeDisc};
use oc_core::error::DiscError;
use oc_core::{Platform, Region};
use oc_ios::TmdReader;
use tracing::{debug, info};

const DOL_HEADER_SIZE: usize = 0x100;
const DOL_SECTIONS: usize = 18;

/// Size of a DOL, from the extents of its sections
fn dol_size(header: &[u8; DOL_HEADER_SIZE]) -> u64 {
    let word = |i: usize| u32::from_be_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]]) as u64;
    (0..DOL_SECTIONS)
        .map(|i| word(i * 4) + word(0x90 + i * 4))
        .max()
        .unwrap_or(0)
        .max(DOL_HEADER_SIZE as u64)
}

#[derive(Debug, Clone)]
struct LayoutEntry {
    offset: u64,
    size: u64,
    pieces: Vec<ContentPiece>,
}

/// Where every byte of the rebuilt file system comes from
#[derive(Debug, Clone)]
pub struct PatchedLayout {
    partition: Partition,
    entries: Vec<LayoutEntry>,
    size: u64,
}

impl PatchedLayout {
    /// Enumerate the game partition of `volume`, let `rewrite` edit the file tree and the
    /// main DOL node, then lay the result out again
    pub fn build<F>(volume: &dyn VolumeDisc, rewrite: F) -> Result<Self, DiscError>
    where
        F: FnOnce(&mut Vec<FstNode>, &mut FstNode),
    {
        let partition = volume.game_partition();
        let shift = if volume.platform().is_wii() && !partition.is_none() {
            2
        } else {
            0
        };

        let apploader_size = volume.read_be32(header::APPLOADER + 0x14, partition)? as u64;
        let apploader_trailer = volume.read_be32(header::APPLOADER + 0x18, partition)? as u64;
        let system_end = align_up(header::APPLOADER + 0x20 + apploader_size + apploader_trailer, 0x20);
        if system_end > volume.size() {
            return Err(DiscError::ReadOutOfBounds {
                offset: header::APPLOADER,
                length: system_end - header::APPLOADER,
            });
        }
        let mut system = vec![0u8; system_end as usize];
        volume.read(0, &mut system, partition)?;

        let dol_offset = volume.read_offset(header::DOL_OFFSET, partition)?;
        let mut dol_header = [0u8; DOL_HEADER_SIZE];
        volume.read(dol_offset, &mut dol_header, partition)?;
        let main_dol_size = dol_size(&dol_header);
        if dol_offset + main_dol_size > volume.size() {
            return Err(DiscError::ReadOutOfBounds {
                offset: dol_offset,
                length: main_dol_size,
            });
        }
        let mut dol = FstNode::file(
            "main.dol",
            vec![ContentPiece {
                size: main_dol_size,
                source: ContentSource::Volume {
                    offset: dol_offset,
                    partition,
                },
            }],
        );

        let mut nodes = parse_fst(volume, partition)?;
        rewrite(&mut nodes, &mut dol);

        let new_dol_offset = system_end;
        let fst_offset = align_up(new_dol_offset + dol.size(), 0x20);
        let fst_len = align_up(build_fst(&nodes, 0, shift).fst.len() as u64, 4);
        let mut built = build_fst(&nodes, fst_offset + fst_len, shift);
        built.fst.resize(fst_len as usize, 0);

        let mut put = |offset: u64, value: u64| {
            let at = offset as usize;
            system[at..at + 4].copy_from_slice(&((value >> shift) as u32).to_be_bytes());
        };
        put(header::DOL_OFFSET, new_dol_offset);
        put(header::FST_OFFSET, fst_offset);
        put(header::FST_SIZE, fst_len);
        put(header::FST_MAX_SIZE, fst_len);

        let mut entries = vec![
            LayoutEntry {
                offset: 0,
                size: system_end,
                pieces: vec![ContentPiece::data(system)],
            },
            LayoutEntry {
                offset: new_dol_offset,
                size: dol.size(),
                pieces: dol.pieces().map(<[ContentPiece]>::to_vec).unwrap_or_default(),
            },
            LayoutEntry {
                offset: fst_offset,
                size: fst_len,
                pieces: vec![ContentPiece::data(built.fst)],
            },
        ];
        for (offset, pieces) in built.files {
            let size = pieces.iter().map(|p| p.size).sum();
            entries.push(LayoutEntry { offset, size, pieces });
        }

        let size = built.end.max(fst_offset + fst_len);
        info!(
            "Rebuilt file system: DOL at 0x{:x}, FST at 0x{:x}, {} files, 0x{:x} bytes",
            new_dol_offset,
            fst_offset,
            entries.len() - 3,
            size
        );
        Ok(Self {
            partition,
            entries,
            size,
        })
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64, buf: &mut [u8], volume: &dyn VolumeDisc) -> Result<(), DiscError> {
        let end = offset + buf.len() as u64;
        if end > self.size {
            return Err(DiscError::ReadOutOfBounds {
                offset,
                length: buf.len() as u64,
            });
        }
        buf.fill(0);

        let first = self.entries.partition_point(|e| e.offset + e.size <= offset);
        for entry in &self.entries[first..] {
            if entry.offset >= end {
                break;
            }
            let from = offset.max(entry.offset);
            let to = end.min(entry.offset + entry.size);
            if from >= to {
                continue;
            }
            let dst = &mut buf[(from - offset) as usize..(to - offset) as usize];
            read_pieces(&entry.pieces, from - entry.offset, dst, volume)?;
        }
        Ok(())
    }
}

/// The original volume with its game partition replaced by a `PatchedLayout`
pub struct PatchedVolume {
    inner: Box<dyn VolumeDisc>,
    layout: PatchedLayout,
}

impl PatchedVolume {
    pub fn new(inner: Box<dyn VolumeDisc>, layout: PatchedLayout) -> Self {
        debug!("Layering patched file system over partition 0x{:x}", layout.partition.0);
        Self { inner, layout }
    }
}

impl VolumeDisc for PatchedVolume {
    fn read(&self, offset: u64, buf: &mut [u8], partition: Partition) -> Result<(), DiscError> {
        if partition == self.layout.partition {
            self.layout.read(offset, buf, self.inner.as_ref())
        } else {
            self.inner.read(offset, buf, partition)
        }
    }

    fn platform(&self) -> Platform {
        self.inner.platform()
    }

    fn region(&self) -> Region {
        self.inner.region()
    }

    fn game_partition(&self) -> Partition {
        self.layout.partition
    }

    fn partitions(&self) -> Vec<Partition> {
        self.inner.partitions()
    }

    fn tmd(&self, partition: Partition) -> Option<TmdReader> {
        self.inner.tmd(partition)
    }

    fn size(&self) -> u64 {
        if self.layout.partition.is_none() {
            self.layout.size()
        } else {
            self.inner.size()
        }
    }
}
