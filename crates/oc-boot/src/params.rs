//! Boot request types
//!
//! A boot request is classified once into a [`BootParameters`] value and then consumed by
//! [`crate::boot_up`]. Each variant owns the opened artifact it describes.

use oc_core::config::PathConfig;
use oc_core::{Platform, Region};
use oc_disc::{Partition, Patch, VolumeDisc, VolumeWad};
use oc_loader::BootExecutableReader;
use std::fmt;
use std::path::PathBuf;

/// Whether a savestate loaded at boot is deleted afterwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteSavestateAfterBoot {
    #[default]
    No,
    Yes,
}

/// Data that travels with a boot request but does not affect bring-up
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootSessionData {
    savestate_path: Option<PathBuf>,
    delete_savestate: DeleteSavestateAfterBoot,
}

impl BootSessionData {
    pub fn new(savestate_path: Option<PathBuf>, delete_savestate: DeleteSavestateAfterBoot) -> Self {
        Self {
            savestate_path,
            delete_savestate,
        }
    }

    pub fn savestate_path(&self) -> Option<&PathBuf> {
        self.savestate_path.as_ref()
    }

    pub fn delete_savestate(&self) -> DeleteSavestateAfterBoot {
        self.delete_savestate
    }

    pub fn set_savestate(&mut self, path: Option<PathBuf>, delete: DeleteSavestateAfterBoot) {
        self.savestate_path = path;
        self.delete_savestate = delete;
    }
}

/// An opened disc image plus the images the drive may swap to
pub struct Disc {
    pub path: PathBuf,
    pub volume: Box<dyn VolumeDisc>,
    /// Every path of a multi-disc request, primary included; empty for a single disc
    pub auto_disc_change_paths: Vec<PathBuf>,
}

impl fmt::Debug for Disc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disc")
            .field("path", &self.path)
            .field("game_id", &self.volume.game_id(Partition::NONE))
            .field("auto_disc_change_paths", &self.auto_disc_change_paths)
            .finish()
    }
}

/// A standalone ELF or DOL
pub struct Executable {
    pub path: PathBuf,
    pub reader: Box<dyn BootExecutableReader>,
}

impl fmt::Debug for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executable")
            .field("path", &self.path)
            .field("valid", &self.reader.is_valid())
            .field("wii", &self.reader.is_wii())
            .finish()
    }
}

/// An install package (WAD)
#[derive(Debug)]
pub struct Wad {
    pub path: PathBuf,
    pub volume: VolumeWad,
}

/// A title already installed in the emulated NAND
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandTitle {
    pub id: u64,
}

/// The GameCube boot ROM, optionally followed by a disc
#[derive(Debug)]
pub struct Ipl {
    pub region: Region,
    pub path: PathBuf,
    pub disc: Option<Disc>,
}

impl Ipl {
    /// IPL of `region` at its configured location
    pub fn new(region: Region, paths: &PathConfig) -> Self {
        Self {
            region,
            path: paths.boot_rom_path(region.directory_name()),
            disc: None,
        }
    }

    /// IPL of `region` that inserts `disc` once the ROM is loaded
    pub fn with_disc(region: Region, paths: &PathConfig, disc: Disc) -> Self {
        Self {
            disc: Some(disc),
            ..Self::new(region, paths)
        }
    }
}

/// A recorded GPU FIFO log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dff {
    pub path: PathBuf,
}

/// What to boot
#[derive(Debug)]
pub enum BootDescriptor {
    Disc(Disc),
    Executable(Executable),
    Wad(Wad),
    NandTitle(NandTitle),
    Ipl(Ipl),
    Dff(Dff),
}

impl BootDescriptor {
    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Disc(_) => "disc",
            Self::Executable(_) => "executable",
            Self::Wad(_) => "WAD",
            Self::NandTitle(_) => "NAND title",
            Self::Ipl(_) => "IPL",
            Self::Dff(_) => "FIFO log",
        }
    }
}

/// A classified boot request
#[derive(Debug)]
pub struct BootParameters {
    pub parameters: BootDescriptor,
    pub session: BootSessionData,
    /// Game mod patches attached to a disc, applied to the disc layout and to memory
    pub patches: Vec<Patch>,
}

impl BootParameters {
    pub fn new(parameters: BootDescriptor, session: BootSessionData) -> Self {
        Self {
            parameters,
            session,
            patches: Vec::new(),
        }
    }

    /// Platform the request boots, when it can be told without reading more files
    pub fn platform(&self) -> Option<Platform> {
        match &self.parameters {
            BootDescriptor::Disc(disc) => Some(disc.volume.platform()),
            BootDescriptor::Executable(exe) => Some(if exe.reader.is_wii() {
                Platform::Wii
            } else {
                Platform::GameCube
            }),
            BootDescriptor::Wad(_) | BootDescriptor::NandTitle(_) => Some(Platform::Wii),
            BootDescriptor::Ipl(_) => Some(Platform::GameCube),
            BootDescriptor::Dff(_) => None,
        }
    }

    /// Region carried by the artifact itself
    pub fn region(&self) -> Option<Region> {
        let region = match &self.parameters {
            BootDescriptor::Disc(disc) => disc.volume.region(),
            BootDescriptor::Ipl(ipl) => ipl.region,
            _ => return None,
        };
        (region != Region::Unknown).then_some(region)
    }
}
