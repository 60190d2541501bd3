//! Host-backed NAND file system
//!
//! NAND paths are mapped onto a directory of the host file system. Ownership and
//! permission metadata is kept alongside in memory; entries created outside this process
//! are treated as root-owned and world accessible.

use bitflags::bitflags;
use oc_core::error::IosError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

bitflags! {
    /// Access mode of a single permission class
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Mode: u8 {
        const READ = 0x1;
        const WRITE = 0x2;
        const READ_WRITE = Self::READ.bits() | Self::WRITE.bits();
    }
}

/// Owner, group and other access modes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Modes {
    pub owner: Mode,
    pub group: Mode,
    pub other: Mode,
}

impl Modes {
    pub const fn new(owner: Mode, group: Mode, other: Mode) -> Self {
        Self { owner, group, other }
    }

    /// Read/write for everyone
    pub const fn all_read_write() -> Self {
        Self::new(Mode::READ_WRITE, Mode::READ_WRITE, Mode::READ_WRITE)
    }
}

/// Ownership of a NAND entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub uid: u32,
    pub gid: u16,
    pub modes: Modes,
    pub is_file: bool,
}

/// An open NAND file
#[derive(Debug)]
pub struct NandFile {
    path: String,
    file: File,
    mode: Mode,
}

impl NandFile {
    /// NAND path the file was opened with
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn size(&self) -> Result<u64, IosError> {
        Ok(self.file.metadata()?.len())
    }

    pub fn seek(&mut self, offset: u64) -> Result<(), IosError> {
        self.file.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Fill `buf` from the current position
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), IosError> {
        if !self.mode.contains(Mode::READ) {
            return Err(IosError::InvalidPath(format!("{} not opened for reading", self.path)));
        }
        self.file.read_exact(buf)?;
        Ok(())
    }

    /// Write `data` at the current position
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), IosError> {
        if !self.mode.contains(Mode::WRITE) {
            return Err(IosError::InvalidPath(format!("{} not opened for writing", self.path)));
        }
        self.file.write_all(data)?;
        Ok(())
    }
}

/// NAND file system rooted at a host directory
pub struct FileSystem {
    root: PathBuf,
    metadata: RwLock<HashMap<String, Metadata>>,
}

impl FileSystem {
    /// Open (creating if needed) a NAND root
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, IosError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        debug!("NAND root at {}", root.display());
        Ok(Self {
            root,
            metadata: RwLock::new(HashMap::new()),
        })
    }

    /// Host directory backing the NAND
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a NAND path to its host path
    pub fn host_path(&self, nand_path: &str) -> Result<PathBuf, IosError> {
        let relative = nand_path
            .strip_prefix('/')
            .ok_or_else(|| IosError::InvalidPath(nand_path.to_string()))?;
        let mut path = self.root.clone();
        for component in relative.split('/').filter(|c| !c.is_empty()) {
            if component == "." || component == ".." {
                return Err(IosError::InvalidPath(nand_path.to_string()));
            }
            path.push(component);
        }
        Ok(path)
    }

    /// Ownership of `nand_path`
    pub fn get_metadata(&self, nand_path: &str) -> Result<Metadata, IosError> {
        let host = self.host_path(nand_path)?;
        if !host.exists() {
            return Err(IosError::NotFound(nand_path.to_string()));
        }
        Ok(self
            .metadata
            .read()
            .get(nand_path)
            .copied()
            .unwrap_or(Metadata {
                uid: 0,
                gid: 0,
                modes: Modes::all_read_write(),
                is_file: host.is_file(),
            }))
    }

    pub fn exists(&self, nand_path: &str) -> bool {
        self.host_path(nand_path).map(|p| p.exists()).unwrap_or(false)
    }

    fn set_metadata(&self, nand_path: &str, metadata: Metadata) {
        self.metadata.write().insert(nand_path.to_string(), metadata);
    }

    /// Whether `uid`/`gid` may access `metadata` with `mode`
    fn check_access(metadata: &Metadata, uid: u32, gid: u16, mode: Mode) -> bool {
        let granted = if uid == 0 {
            Mode::READ_WRITE
        } else if uid == metadata.uid {
            metadata.modes.owner
        } else if gid == metadata.gid {
            metadata.modes.group
        } else {
            metadata.modes.other
        };
        granted.contains(mode)
    }

    /// Create a directory; succeeds if it already exists
    pub fn create_directory(
        &self,
        uid: u32,
        gid: u16,
        nand_path: &str,
        modes: Modes,
    ) -> Result<(), IosError> {
        let host = self.host_path(nand_path)?;
        if host.is_dir() {
            return Ok(());
        }
        std::fs::create_dir(&host)?;
        self.set_metadata(
            nand_path,
            Metadata {
                uid,
                gid,
                modes,
                is_file: false,
            },
        );
        trace!("Created NAND directory {}", nand_path);
        Ok(())
    }

    /// Create every missing directory along `nand_path`, all with the same ownership
    pub fn create_full_path(
        &self,
        uid: u32,
        gid: u16,
        nand_path: &str,
        modes: Modes,
    ) -> Result<(), IosError> {
        let mut current = String::new();
        for component in nand_path.split('/').filter(|c| !c.is_empty()) {
            current.push('/');
            current.push_str(component);
            self.create_directory(uid, gid, &current, modes)?;
        }
        Ok(())
    }

    /// Open an existing file
    pub fn open_file(
        &self,
        uid: u32,
        gid: u16,
        nand_path: &str,
        mode: Mode,
    ) -> Result<NandFile, IosError> {
        let metadata = self.get_metadata(nand_path)?;
        if !metadata.is_file {
            return Err(IosError::InvalidPath(nand_path.to_string()));
        }
        if !Self::check_access(&metadata, uid, gid, mode) {
            return Err(IosError::PermissionDenied {
                path: nand_path.to_string(),
                uid,
                gid,
            });
        }

        let file = OpenOptions::new()
            .read(mode.contains(Mode::READ))
            .write(mode.contains(Mode::WRITE))
            .open(self.host_path(nand_path)?)?;
        Ok(NandFile {
            path: nand_path.to_string(),
            file,
            mode,
        })
    }

    /// Open `nand_path` read/write, creating it with the given ownership if missing
    pub fn create_and_open_file(
        &self,
        uid: u32,
        gid: u16,
        nand_path: &str,
        modes: Modes,
    ) -> Result<NandFile, IosError> {
        let host = self.host_path(nand_path)?;
        if !host.exists() {
            if !host.parent().is_some_and(Path::is_dir) {
                return Err(IosError::NotFound(nand_path.to_string()));
            }
            File::create(&host)?;
            self.set_metadata(
                nand_path,
                Metadata {
                    uid,
                    gid,
                    modes,
                    is_file: true,
                },
            );
        }
        self.open_file(uid, gid, nand_path, Mode::READ_WRITE)
    }

    /// Replace the contents of a file as root, creating it if needed
    pub fn write_file(&self, nand_path: &str, data: &[u8], modes: Modes) -> Result<(), IosError> {
        let host = self.host_path(nand_path)?;
        let existed = host.exists();
        std::fs::write(&host, data)?;
        if !existed {
            self.set_metadata(
                nand_path,
                Metadata {
                    uid: 0,
                    gid: 0,
                    modes,
                    is_file: true,
                },
            );
        }
        Ok(())
    }

    /// Read a whole file as root
    pub fn read_file(&self, nand_path: &str) -> Result<Vec<u8>, IosError> {
        let host = self.host_path(nand_path)?;
        if !host.is_file() {
            return Err(IosError::NotFound(nand_path.to_string()));
        }
        Ok(std::fs::read(host)?)
    }

    /// Remove a file or directory tree
    pub fn delete(&self, nand_path: &str) -> Result<(), IosError> {
        let host = self.host_path(nand_path)?;
        if host.is_dir() {
            std::fs::remove_dir_all(&host)?;
        } else if host.exists() {
            std::fs::remove_file(&host)?;
        } else {
            return Err(IosError::NotFound(nand_path.to_string()));
        }
        self.metadata
            .write()
            .retain(|path, _| path != nand_path && !path.starts_with(&format!("{}/", nand_path)));
        Ok(())
    }

    /// Names of the entries in a directory, sorted
    pub fn read_directory(&self, nand_path: &str) -> Result<Vec<String>, IosError> {
        let host = self.host_path(nand_path)?;
        if !host.is_dir() {
            return Err(IosError::NotFound(nand_path.to_string()));
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(host)? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}
