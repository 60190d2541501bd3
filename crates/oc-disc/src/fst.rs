//! Disc file system table (FST)

use crate::volume::{header, Partition, VolumeDisc};
use oc_core::error::DiscError;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::trace;

const ENTRY_SIZE: usize = 12;
/// Alignment of file data laid out by `build_fst`
pub const FILE_ALIGNMENT: u64 = 0x20;

pub(crate) fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

/// Where a run of file bytes comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Bytes of the original volume
    Volume { offset: u64, partition: Partition },
    /// Bytes of a file on the host
    HostFile { path: PathBuf, offset: u64 },
    /// Bytes held in memory
    Data { data: Arc<Vec<u8>>, offset: u64 },
    /// Zero fill
    Zero,
}

/// A run of `size` bytes from `source`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPiece {
    pub size: u64,
    pub source: ContentSource,
}

impl ContentPiece {
    pub fn data(data: Vec<u8>) -> Self {
        Self {
            size: data.len() as u64,
            source: ContentSource::Data {
                data: Arc::new(data),
                offset: 0,
            },
        }
    }

    /// The sub-range `[start, start + size)` of this piece
    pub fn slice(&self, start: u64, size: u64) -> Self {
        let source = match &self.source {
            ContentSource::Volume { offset, partition } => ContentSource::Volume {
                offset: offset + start,
                partition: *partition,
            },
            ContentSource::HostFile { path, offset } => ContentSource::HostFile {
                path: path.clone(),
                offset: offset + start,
            },
            ContentSource::Data { data, offset } => ContentSource::Data {
                data: Arc::clone(data),
                offset: offset + start,
            },
            ContentSource::Zero => ContentSource::Zero,
        };
        Self { size, source }
    }

    /// Fill `buf` with the bytes at `offset` within this piece
    pub fn read(&self, offset: u64, buf: &mut [u8], volume: &dyn VolumeDisc) -> Result<(), DiscError> {
        match &self.source {
            ContentSource::Volume {
                offset: base,
                partition,
            } => volume.read(base + offset, buf, *partition),
            ContentSource::HostFile { path, offset: base } => {
                let mut file = File::open(path)?;
                file.seek(SeekFrom::Start(base + offset))?;
                let mut filled = 0;
                // short host files read as zero past their end
                while filled < buf.len() {
                    let n = file.read(&mut buf[filled..])?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf[filled..].fill(0);
                Ok(())
            }
            ContentSource::Data { data, offset: base } => {
                let start = (base + offset) as usize;
                let available = data.len().saturating_sub(start).min(buf.len());
                if available > 0 {
                    buf[..available].copy_from_slice(&data[start..start + available]);
                }
                buf[available..].fill(0);
                Ok(())
            }
            ContentSource::Zero => {
                buf.fill(0);
                Ok(())
            }
        }
    }
}

/// Read `buf.len()` bytes at `offset` from a file made of `pieces`
pub fn read_pieces(
    pieces: &[ContentPiece],
    offset: u64,
    buf: &mut [u8],
    volume: &dyn VolumeDisc,
) -> Result<(), DiscError> {
    let mut piece_start = 0u64;
    let mut done = 0usize;
    for piece in pieces {
        let piece_end = piece_start + piece.size;
        let position = offset + done as u64;
        if done < buf.len() && position < piece_end && position >= piece_start {
            let within = position - piece_start;
            let n = ((piece.size - within) as usize).min(buf.len() - done);
            piece.read(within, &mut buf[done..done + n], volume)?;
            done += n;
        }
        piece_start = piece_end;
    }
    buf[done..].fill(0);
    Ok(())
}

/// One entry of the file tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FstNode {
    pub name: String,
    pub kind: FstNodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FstNodeKind {
    Directory(Vec<FstNode>),
    File(Vec<ContentPiece>),
}

impl FstNode {
    pub fn file(name: impl Into<String>, pieces: Vec<ContentPiece>) -> Self {
        Self {
            name: name.into(),
            kind: FstNodeKind::File(pieces),
        }
    }

    pub fn directory(name: impl Into<String>, children: Vec<FstNode>) -> Self {
        Self {
            name: name.into(),
            kind: FstNodeKind::Directory(children),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, FstNodeKind::Directory(_))
    }

    /// File size, or 0 for directories
    pub fn size(&self) -> u64 {
        match &self.kind {
            FstNodeKind::File(pieces) => pieces.iter().map(|p| p.size).sum(),
            FstNodeKind::Directory(_) => 0,
        }
    }

    pub fn pieces(&self) -> Option<&[ContentPiece]> {
        match &self.kind {
            FstNodeKind::File(pieces) => Some(pieces),
            FstNodeKind::Directory(_) => None,
        }
    }

    fn count(&self) -> usize {
        match &self.kind {
            FstNodeKind::File(_) => 1,
            FstNodeKind::Directory(children) => 1 + children.iter().map(FstNode::count).sum::<usize>(),
        }
    }
}

/// Find a node by `/`-separated path, ignoring ASCII case
pub fn find_node_mut<'a>(nodes: &'a mut [FstNode], path: &str) -> Option<&'a mut FstNode> {
    let mut components = path.split('/').filter(|c| !c.is_empty());
    let first = components.next()?;
    let mut node = nodes.iter_mut().find(|n| n.name.eq_ignore_ascii_case(first))?;
    for component in components {
        let FstNodeKind::Directory(children) = &mut node.kind else {
            return None;
        };
        node = children
            .iter_mut()
            .find(|n| n.name.eq_ignore_ascii_case(component))?;
    }
    Some(node)
}

/// Find a node by path, creating missing directories and an empty file at the leaf
pub fn create_node_mut<'a>(nodes: &'a mut Vec<FstNode>, path: &str, directory: bool) -> Option<&'a mut FstNode> {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    let (leaf, parents) = components.split_last()?;
    let mut level = nodes;
    for component in parents {
        let index = match level.iter().position(|n| n.name.eq_ignore_ascii_case(component)) {
            Some(index) => index,
            None => {
                level.push(FstNode::directory(*component, Vec::new()));
                level.len() - 1
            }
        };
        let FstNodeKind::Directory(children) = &mut level[index].kind else {
            return None;
        };
        level = children;
    }

    let index = match level.iter().position(|n| n.name.eq_ignore_ascii_case(leaf)) {
        Some(index) => index,
        None => {
            level.push(if directory {
                FstNode::directory(*leaf, Vec::new())
            } else {
                FstNode::file(*leaf, Vec::new())
            });
            level.len() - 1
        }
    };
    Some(&mut level[index])
}

fn be32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn offset_shift(volume: &dyn VolumeDisc, partition: Partition) -> u32 {
    if volume.platform().is_wii() && !partition.is_none() {
        2
    } else {
        0
    }
}

/// Parse the file tree of `partition`
pub fn parse_fst(volume: &dyn VolumeDisc, partition: Partition) -> Result<Vec<FstNode>, DiscError> {
    let fst_offset = volume.read_offset(header::FST_OFFSET, partition)?;
    let fst_size = volume.read_offset(header::FST_SIZE, partition)?;
    if fst_size < ENTRY_SIZE as u64 || fst_size > 0x100_0000 {
        return Err(DiscError::InvalidFst(format!("implausible size 0x{:x}", fst_size)));
    }
    let mut fst = vec![0u8; fst_size as usize];
    volume.read(fst_offset, &mut fst, partition)?;
    parse_fst_bytes(&fst, offset_shift(volume, partition), partition)
}

/// Parse raw FST bytes; file offsets are shifted left by `shift` and point into `partition`
pub fn parse_fst_bytes(fst: &[u8], shift: u32, partition: Partition) -> Result<Vec<FstNode>, DiscError> {
    if fst.len() < ENTRY_SIZE || fst[0] != 1 {
        return Err(DiscError::InvalidFst("root entry is not a directory".to_string()));
    }
    let count = be32(fst, 8) as usize;
    let names_start = count * ENTRY_SIZE;
    if count == 0 || names_start > fst.len() {
        return Err(DiscError::InvalidFst(format!("{} entries do not fit", count)));
    }

    let name_of = |entry: usize| -> Result<String, DiscError> {
        let name_offset = (be32(fst, entry * ENTRY_SIZE) & 0x00FF_FFFF) as usize;
        let start = names_start + name_offset;
        let bytes = fst
            .get(start..)
            .ok_or_else(|| DiscError::InvalidFst(format!("name of entry {} out of range", entry)))?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(String::from_utf8_lossy(&bytes[..end]).to_string())
    };

    fn parse_range(
        fst: &[u8],
        first: usize,
        end: usize,
        shift: u32,
        partition: Partition,
        name_of: &dyn Fn(usize) -> Result<String, DiscError>,
    ) -> Result<Vec<FstNode>, DiscError> {
        let mut nodes = Vec::new();
        let mut i = first;
        while i < end {
            let base = i * ENTRY_SIZE;
            let name = name_of(i)?;
            if fst[base] != 0 {
                let next = be32(fst, base + 8) as usize;
                if next <= i || next > end {
                    return Err(DiscError::InvalidFst(format!("directory {} has bad extent", i)));
                }
                let children = parse_range(fst, i + 1, next, shift, partition, name_of)?;
                nodes.push(FstNode::directory(name, children));
                i = next;
            } else {
                let offset = (be32(fst, base + 4) as u64) << shift;
                let size = be32(fst, base + 8) as u64;
                trace!("FST file {} at 0x{:x} (0x{:x} bytes)", name, offset, size);
                nodes.push(FstNode::file(
                    name,
                    vec![ContentPiece {
                        size,
                        source: ContentSource::Volume { offset, partition },
                    }],
                ));
                i += 1;
            }
        }
        Ok(nodes)
    }

    parse_range(fst, 1, count, shift, partition, &name_of)
}

/// Output of `build_fst`
#[derive(Debug, Clone)]
pub struct BuiltFst {
    pub fst: Vec<u8>,
    /// Disc offset and contents of every file, in layout order
    pub files: Vec<(u64, Vec<ContentPiece>)>,
    /// First byte past the last file
    pub end: u64,
}

/// Serialize a file tree, laying file data out from `data_start`
pub fn build_fst(nodes: &[FstNode], data_start: u64, shift: u32) -> BuiltFst {
    let count = 1 + nodes.iter().map(FstNode::count).sum::<usize>();
    let mut entries = vec![0u8; count * ENTRY_SIZE];
    let mut names = Vec::new();
    let mut files = Vec::new();
    let mut cursor = align_up(data_start, FILE_ALIGNMENT);

    entries[0] = 1;
    entries[8..12].copy_from_slice(&(count as u32).to_be_bytes());

    fn emit(
        nodes: &[FstNode],
        parent: usize,
        index: &mut usize,
        entries: &mut [u8],
        names: &mut Vec<u8>,
        files: &mut Vec<(u64, Vec<ContentPiece>)>,
        cursor: &mut u64,
        shift: u32,
    ) {
        for node in nodes {
            let me = *index;
            *index += 1;
            let base = me * ENTRY_SIZE;
            let name_word = names.len() as u32 & 0x00FF_FFFF;
            names.extend_from_slice(node.name.as_bytes());
            names.push(0);

            match &node.kind {
                FstNodeKind::Directory(children) => {
                    entries[base..base + 4].copy_from_slice(&(0x0100_0000 | name_word).to_be_bytes());
                    entries[base + 4..base + 8].copy_from_slice(&(parent as u32).to_be_bytes());
                    emit(children, me, index, entries, names, files, cursor, shift);
                    entries[base + 8..base + 12].copy_from_slice(&(*index as u32).to_be_bytes());
                }
                FstNodeKind::File(pieces) => {
                    let size = node.size();
                    entries[base..base + 4].copy_from_slice(&name_word.to_be_bytes());
                    entries[base + 4..base + 8]
                        .copy_from_slice(&((*cursor >> shift) as u32).to_be_bytes());
                    entries[base + 8..base + 12].copy_from_slice(&(size as u32).to_be_bytes());
                    files.push((*cursor, pieces.clone()));
                    *cursor = align_up(*cursor + size, FILE_ALIGNMENT);
                }
            }
        }
    }

    let mut index = 1;
    emit(nodes, 0, &mut index, &mut entries, &mut names, &mut files, &mut cursor, shift);

    entries.extend_from_slice(&names);
    BuiltFst {
        fst: entries,
        files,
        end: cursor,
    }
}
