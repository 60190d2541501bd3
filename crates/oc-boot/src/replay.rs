//! FIFO log replay
//!
//! A DFF file is a recording of the GPU command stream. Replaying one needs no CPU bring-up:
//! the player only has to accept the file.

use oc_core::error::BootError;
use oc_core::Platform;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Magic word at the start of a DFF file
pub const DFF_FILE_ID: u32 = 0x0D01_F1F0;
/// Newest file version this player understands
pub const DFF_VERSION: u32 = 5;

mod offsets {
    pub const FILE_ID: usize = 0x00;
    pub const FILE_VERSION: usize = 0x04;
    pub const MIN_LOADER_VERSION: usize = 0x08;
    pub const FRAME_COUNT: usize = 0x44;
    pub const FLAGS: usize = 0x48;
    pub const HEADER_END: usize = 0x4C;
}

const FLAG_IS_WII: u32 = 1;

/// Header fields of an opened FIFO log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoFile {
    pub path: PathBuf,
    pub version: u32,
    pub frame_count: u32,
    pub is_wii: bool,
}

impl FifoFile {
    /// Validate the header of a FIFO log
    ///
    /// The header is stored little-endian.
    pub fn parse(path: &Path, data: &[u8]) -> Result<Self, String> {
        if data.len() < offsets::HEADER_END {
            return Err(format!("file is too small ({} bytes)", data.len()));
        }
        let le32 = |o: usize| u32::from_le_bytes([data[o], data[o + 1], data[o + 2], data[o + 3]]);

        let file_id = le32(offsets::FILE_ID);
        if file_id != DFF_FILE_ID {
            return Err(format!("bad magic 0x{:08x}", file_id));
        }
        let min_loader_version = le32(offsets::MIN_LOADER_VERSION);
        if min_loader_version > DFF_VERSION {
            return Err(format!(
                "needs loader version {} but only {} is supported",
                min_loader_version, DFF_VERSION
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            version: le32(offsets::FILE_VERSION),
            frame_count: le32(offsets::FRAME_COUNT),
            is_wii: le32(offsets::FLAGS) & FLAG_IS_WII != 0,
        })
    }
}

/// Plays back FIFO logs
#[derive(Debug, Default)]
pub struct FifoPlayer {
    file: Option<FifoFile>,
}

impl FifoPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the FIFO log at `path`, replacing any open one
    pub fn open(&mut self, path: &Path) -> Result<(), BootError> {
        let failed = |reason: String| BootError::ReplayOpenFailed {
            path: path.to_path_buf(),
            reason,
        };
        let data = std::fs::read(path).map_err(|e| failed(e.to_string()))?;
        let file = FifoFile::parse(path, &data).map_err(failed)?;

        info!(
            "Opened FIFO log {} (version {}, {} frames)",
            path.display(),
            file.version,
            file.frame_count
        );
        self.file = Some(file);
        Ok(())
    }

    pub fn close(&mut self) {
        self.file = None;
    }

    /// The open FIFO log
    pub fn file(&self) -> Option<&FifoFile> {
        self.file.as_ref()
    }
}

/// Platform a FIFO log was recorded on; GameCube when the file cannot be read
pub fn dff_platform(path: &Path) -> Platform {
    match std::fs::read(path).map_err(|e| e.to_string()).and_then(|d| FifoFile::parse(path, &d)) {
        Ok(file) if file.is_wii => Platform::Wii,
        Ok(_) => Platform::GameCube,
        Err(e) => {
            debug!("Could not probe {}: {}", path.display(), e);
            Platform::GameCube
        }
    }
}
