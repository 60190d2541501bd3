//! Per-boot configuration snapshot

use crate::params::{BootDescriptor, BootParameters};
use crate::replay;
use oc_core::config::{ConsoleType, PathConfig};
use oc_core::{Config, Platform, Region};
use oc_disc::Partition;
use oc_ios::titles;
use std::path::PathBuf;

/// Settings captured once when a boot request starts
///
/// Bring-up only ever reads this snapshot, so later edits to the user configuration cannot
/// change a boot that is already running.
#[derive(Debug, Clone)]
pub struct BootConfig {
    pub platform: Platform,
    pub region: Region,
    /// Identifier used for per-game files such as symbol maps
    pub game_id: String,
    pub skip_ipl: bool,
    pub enable_debugging: bool,
    pub pal60: bool,
    pub console_type: ConsoleType,
    pub serial_number: String,
    pub default_iso: Option<PathBuf>,
    pub paths: PathConfig,
}

impl BootConfig {
    /// Snapshot `config` for booting `params`
    ///
    /// The artifact decides platform and region where it can; the configured region is the
    /// fallback.
    pub fn new(config: &Config, params: &BootParameters) -> Self {
        let platform = params.platform().unwrap_or_else(|| match &params.parameters {
            BootDescriptor::Dff(dff) => replay::dff_platform(&dff.path),
            _ => Platform::GameCube,
        });

        Self {
            platform,
            region: params.region().unwrap_or(config.general.region),
            game_id: game_id_of(params),
            skip_ipl: config.general.skip_ipl,
            enable_debugging: config.general.enable_debugging,
            pal60: config.wii.pal60,
            console_type: config.wii.console_type,
            serial_number: config.wii.serial_number.clone(),
            default_iso: config.general.default_iso.clone(),
            paths: config.paths.clone(),
        }
    }

    /// Snapshot for a bare machine that has not been given anything to boot
    pub fn from_config(config: &Config, platform: Platform) -> Self {
        Self {
            platform,
            region: config.general.region,
            game_id: String::new(),
            skip_ipl: config.general.skip_ipl,
            enable_debugging: config.general.enable_debugging,
            pal60: config.wii.pal60,
            console_type: config.wii.console_type,
            serial_number: config.wii.serial_number.clone(),
            default_iso: config.general.default_iso.clone(),
            paths: config.paths.clone(),
        }
    }

    pub fn is_wii(&self) -> bool {
        self.platform.is_wii()
    }

    /// Video timing: NTSC regions, and PAL Wii consoles set to 60 Hz
    pub fn use_ntsc_timing(&self) -> bool {
        self.region.is_ntsc() || (self.is_wii() && self.pal60)
    }
}

fn game_id_of(params: &BootParameters) -> String {
    match &params.parameters {
        BootDescriptor::Disc(disc) => disc.volume.game_id(Partition::NONE),
        BootDescriptor::Executable(exe) => exe
            .path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        BootDescriptor::Wad(wad) => title_game_id(wad.volume.title_id()),
        BootDescriptor::NandTitle(title) => title_game_id(title.id),
        BootDescriptor::Ipl(ipl) => ipl
            .disc
            .as_ref()
            .map(|disc| disc.volume.game_id(Partition::NONE))
            .unwrap_or_else(|| "00000000".to_string()),
        BootDescriptor::Dff(_) => String::new(),
    }
}

/// Game id of a NAND title: its low word as ASCII when printable, hex otherwise
pub fn title_game_id(title_id: u64) -> String {
    let bytes = (title_id as u32).to_be_bytes();
    if bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        titles::format_title_id(title_id)
    }
}
