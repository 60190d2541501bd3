//! Applying mod patches to a disc's file tree and to emulated memory

use crate::fst::{create_node_mut, find_node_mut, ContentPiece, ContentSource, FstNode, FstNodeKind};
use crate::mod_descriptor::ModPatchData;
use oc_core::error::DiscError;
use oc_memory::Memory;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Disc path that addresses the main executable
pub const MAIN_DOL: &str = "main.dol";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePatch {
    pub disc: String,
    pub external: PathBuf,
    pub create: bool,
    pub offset: u32,
    pub resize: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderPatch {
    pub disc: String,
    pub external: PathBuf,
    pub create: bool,
    pub recursive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryPatch {
    pub offset: u32,
    pub value: Vec<u8>,
    pub original: Option<Vec<u8>>,
}

/// One patch set, already scoped to the disc it will be applied to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Patch {
    pub root: PathBuf,
    pub file_patches: Vec<FilePatch>,
    pub folder_patches: Vec<FolderPatch>,
    pub memory_patches: Vec<MemoryPatch>,
}

fn decode_hex(descriptor: &Path, field: &str, value: &str) -> Result<Vec<u8>, DiscError> {
    hex::decode(value.trim().trim_start_matches("0x")).map_err(|e| DiscError::InvalidDescriptor {
        path: descriptor.to_path_buf(),
        reason: format!("{} \"{}\" is not valid hex: {}", field, value, e),
    })
}

/// Turn descriptor patch data into the patches that apply to the given disc
///
/// Patch data scoped to another game, revision or disc yields no patches.
pub fn generate_patches(
    data: &ModPatchData,
    descriptor: &Path,
    game_id: &str,
    revision: u16,
    disc_number: u8,
) -> Result<Vec<Patch>, DiscError> {
    if let Some(game) = &data.game {
        if !game_id.starts_with(game.as_str()) {
            info!("Mod patches are for {}, not {}", game, game_id);
            return Ok(Vec::new());
        }
    }
    if data.revision.is_some_and(|r| r != revision) || data.disc.is_some_and(|d| d != disc_number) {
        info!("Mod patches do not match revision {} disc {}", revision, disc_number);
        return Ok(Vec::new());
    }

    let memory_patches = data
        .memory
        .iter()
        .map(|m| {
            Ok(MemoryPatch {
                offset: m.offset,
                value: decode_hex(descriptor, "value", &m.value)?,
                original: m
                    .original
                    .as_deref()
                    .map(|o| decode_hex(descriptor, "original", o))
                    .transpose()?,
            })
        })
        .collect::<Result<Vec<_>, DiscError>>()?;

    let patch = Patch {
        root: data.root.clone(),
        file_patches: data
            .file
            .iter()
            .map(|f| FilePatch {
                disc: f.disc.clone(),
                external: data.root.join(&f.external),
                create: f.create,
                offset: f.offset,
                resize: f.resize,
            })
            .collect(),
        folder_patches: data
            .folder
            .iter()
            .map(|f| FolderPatch {
                disc: f.disc.clone(),
                external: data.root.join(&f.external),
                create: f.create,
                recursive: f.recursive,
            })
            .collect(),
        memory_patches,
    };
    Ok(vec![patch])
}

/// The pieces covering `[start, start + len)` of a file made of `pieces`
fn slice_pieces(pieces: &[ContentPiece], start: u64, len: u64) -> Vec<ContentPiece> {
    let mut out = Vec::new();
    let end = start + len;
    let mut piece_start = 0u64;
    for piece in pieces {
        let piece_end = piece_start + piece.size;
        let from = start.max(piece_start);
        let to = end.min(piece_end);
        if from < to {
            out.push(piece.slice(from - piece_start, to - from));
        }
        piece_start = piece_end;
    }
    out
}

/// Splice `size` bytes of `external` into a file at `offset`
fn patch_file_contents(node: &mut FstNode, external: &Path, size: u64, offset: u64, resize: bool) {
    let old = node.pieces().map(<[ContentPiece]>::to_vec).unwrap_or_default();
    let old_size: u64 = old.iter().map(|p| p.size).sum();

    let mut pieces = slice_pieces(&old, 0, offset.min(old_size));
    if offset > old_size {
        pieces.push(ContentPiece {
            size: offset - old_size,
            source: ContentSource::Zero,
        });
    }
    pieces.push(ContentPiece {
        size,
        source: ContentSource::HostFile {
            path: external.to_path_buf(),
            offset: 0,
        },
    });
    let end = offset + size;
    if !resize && old_size > end {
        pieces.extend(slice_pieces(&old, end, old_size - end));
    }
    node.kind = FstNodeKind::File(pieces);
}

fn is_main_dol(disc_path: &str) -> bool {
    disc_path.trim_start_matches('/').eq_ignore_ascii_case(MAIN_DOL)
}

fn apply_file_patch(patch: &FilePatch, fst: &mut Vec<FstNode>, dol: &mut FstNode) {
    let size = match std::fs::metadata(&patch.external) {
        Ok(metadata) if metadata.is_file() => metadata.len(),
        _ => {
            warn!("Mod file {} does not exist", patch.external.display());
            return;
        }
    };

    let node = if is_main_dol(&patch.disc) {
        Some(dol)
    } else if find_node_mut(fst, &patch.disc).is_some() {
        find_node_mut(fst, &patch.disc)
    } else if patch.create {
        create_node_mut(fst, &patch.disc, false)
    } else {
        None
    };
    let Some(node) = node else {
        warn!("Disc file {} does not exist and is not created", patch.disc);
        return;
    };
    if node.is_directory() {
        warn!("Disc path {} is a directory", patch.disc);
        return;
    }

    debug!("Patching {} with {}", patch.disc, patch.external.display());
    patch_file_contents(node, &patch.external, size, patch.offset as u64, patch.resize);
}

fn host_files(dir: &Path, recursive: bool, prefix: &str, out: &mut Vec<(String, PathBuf)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!("Mod folder {} cannot be read", dir.display());
        return;
    };
    let mut entries: Vec<_> = entries.filter_map(Result::ok).collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = entry.path();
        let relative = format!("{}/{}", prefix, name);
        if path.is_dir() {
            if recursive {
                host_files(&path, recursive, &relative, out);
            }
        } else {
            out.push((relative, path));
        }
    }
}

fn apply_folder_patch(patch: &FolderPatch, fst: &mut Vec<FstNode>, dol: &mut FstNode) {
    let mut files = Vec::new();
    host_files(&patch.external, patch.recursive, patch.disc.trim_end_matches('/'), &mut files);
    for (disc, external) in files {
        let file_patch = FilePatch {
            disc,
            external,
            create: patch.create,
            offset: 0,
            resize: true,
        };
        apply_file_patch(&file_patch, fst, dol);
    }
}

/// Rewrite the file tree and main DOL node according to `patches`, in order
pub fn apply_patches_to_files(patches: &[Patch], fst: &mut Vec<FstNode>, dol: &mut FstNode) {
    for patch in patches {
        for folder in &patch.folder_patches {
            apply_folder_patch(folder, fst, dol);
        }
        for file in &patch.file_patches {
            apply_file_patch(file, fst, dol);
        }
    }
}

/// Write every memory patch whose `original` bytes (if any) match
pub fn apply_memory_patches(patches: &[Patch], memory: &Memory) {
    for patch in patches.iter().flat_map(|p| &p.memory_patches) {
        if let Some(original) = &patch.original {
            match memory.read_bytes(patch.offset, original.len() as u32) {
                Ok(current) if current == *original => {}
                Ok(_) => {
                    debug!("Memory patch at 0x{:08x} skipped: original bytes differ", patch.offset);
                    continue;
                }
                Err(e) => {
                    warn!("Memory patch at 0x{:08x} skipped: {}", patch.offset, e);
                    continue;
                }
            }
        }
        match memory.write_bytes(patch.offset, &patch.value) {
            Ok(()) => debug!("Applied memory patch at 0x{:08x}", patch.offset),
            Err(e) => warn!("Memory patch at 0x{:08x} failed: {}", patch.offset, e),
        }
    }
}
