//! Game mod descriptors (`.json`)
//!
//! ```json
//! {
//!   "type": "game-mod-descriptor",
//!   "version": 1,
//!   "base-file": "game.iso",
//!   "display-name": "Randomizer",
//!   "patches": { "game": "RMG", "root": "mod", "file": [], "folder": [], "memory": [] }
//! }
//! ```

use oc_core::error::DiscError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const DESCRIPTOR_TYPE: &str = "game-mod-descriptor";
pub const DESCRIPTOR_VERSION: u32 = 1;

/// Replace or create one file of the disc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePatchData {
    /// Path on the disc; `main.dol` names the main executable
    pub disc: String,
    /// Host file, relative to the patch root
    pub external: String,
    #[serde(default)]
    pub create: bool,
    /// Write the external file at this offset instead of replacing the whole file
    #[serde(default)]
    pub offset: u32,
    /// Truncate the disc file to the end of the external data
    #[serde(default = "default_true")]
    pub resize: bool,
}

/// Replace files of a disc directory with the files of a host directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderPatchData {
    pub disc: String,
    pub external: String,
    #[serde(default)]
    pub create: bool,
    #[serde(default)]
    pub recursive: bool,
}

/// Write bytes to emulated memory after boot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryPatchData {
    pub offset: u32,
    /// Hex encoded bytes to write
    pub value: String,
    /// Hex encoded bytes that must already be there
    #[serde(default)]
    pub original: Option<String>,
}

/// The `patches` object of a descriptor
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModPatchData {
    /// Game id prefix the patches apply to
    pub game: Option<String>,
    pub revision: Option<u16>,
    pub disc: Option<u8>,
    /// Directory external paths are relative to
    pub root: PathBuf,
    pub file: Vec<FilePatchData>,
    pub folder: Vec<FolderPatchData>,
    pub memory: Vec<MemoryPatchData>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawDescriptor {
    #[serde(rename = "type")]
    kind: String,
    version: u32,
    base_file: PathBuf,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    patches: Option<ModPatchData>,
}

/// A parsed descriptor with paths resolved against its directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameModDescriptor {
    pub base_file: PathBuf,
    pub display_name: Option<String>,
    pub patches: Option<ModPatchData>,
}

/// Parse descriptor text read from `json_path`
pub fn parse_game_mod_descriptor(json: &str, json_path: &Path) -> Result<GameModDescriptor, DiscError> {
    let invalid = |reason: String| DiscError::InvalidDescriptor {
        path: json_path.to_path_buf(),
        reason,
    };

    let raw: RawDescriptor = serde_json::from_str(json).map_err(|e| invalid(e.to_string()))?;
    if raw.kind != DESCRIPTOR_TYPE {
        return Err(invalid(format!("unexpected type \"{}\"", raw.kind)));
    }
    if raw.version != DESCRIPTOR_VERSION {
        return Err(invalid(format!("unsupported version {}", raw.version)));
    }

    let folder = json_path.parent().unwrap_or(Path::new(""));
    let patches = raw.patches.map(|mut patches| {
        patches.root = folder.join(&patches.root);
        patches
    });

    debug!("Parsed game mod descriptor {}", json_path.display());
    Ok(GameModDescriptor {
        base_file: folder.join(raw.base_file),
        display_name: raw.display_name,
        patches,
    })
}

pub fn parse_game_mod_descriptor_file(path: &Path) -> Result<GameModDescriptor, DiscError> {
    let json = std::fs::read_to_string(path)?;
    parse_game_mod_descriptor(&json, path)
}
