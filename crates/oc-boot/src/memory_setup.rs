//! Low-memory globals the boot ROM leaves behind
//!
//! Software expects the IPL (GameCube) or the System Menu (Wii) to have filled in the OS
//! globals at the bottom of MEM1. When bring-up skips those programs, the values are
//! written here instead.

use crate::config::BootConfig;
use crate::settings::{generate_settings, SettingsHandler, SETTINGS_SIZE};
use oc_core::config::ConsoleType;
use oc_core::error::{BootError, MemoryError};
use oc_ios::titles::{self, SYSMENU_GID, SYSTEM_MENU};
use oc_ios::{Ios, Modes};
use oc_memory::Memory;
use tracing::{debug, warn};

/// `rfi`
pub const RFI: u32 = 0x4C00_0064;

/// Exception vectors that get a default `rfi` handler
pub const EXCEPTION_VECTORS: [u32; 15] = [
    0x0100, 0x0200, 0x0300, 0x0400, 0x0500, 0x0600, 0x0700, 0x0800, 0x0900, 0x0C00, 0x0D00,
    0x0F00, 0x1300, 0x1400, 0x1700,
];

/// Where `setting.txt` is placed in memory
pub const SETTINGS_ADDRESS: u32 = 0x8000_3800;

/// OS globals shared by both platforms
pub mod globals {
    pub const BOOT_MAGIC: u32 = 0x8000_0020;
    pub const VERSION: u32 = 0x8000_0024;
    pub const MEMORY_SIZE: u32 = 0x8000_0028;
    pub const CONSOLE_TYPE: u32 = 0x8000_002C;
    pub const ARENA_HIGH: u32 = 0x8000_0034;
    pub const FST_ADDRESS: u32 = 0x8000_0038;
    pub const FST_MAX_SIZE: u32 = 0x8000_003C;
    pub const VIDEO_MODE: u32 = 0x8000_00CC;
    pub const ARAM_SIZE: u32 = 0x8000_00D0;
    pub const BI2_ADDRESS: u32 = 0x8000_00F4;
    pub const BUS_CLOCK: u32 = 0x8000_00F8;
    pub const CPU_CLOCK: u32 = 0x8000_00FC;
    /// Wii game id copy compared against 0x80000000 during boot
    pub const WII_GAME_ID: u32 = 0x8000_3180;
}

/// Magic word software uses to tell it was booted by the boot ROM
pub const BOOT_MAGIC: u32 = 0x0D15_EA5E;

/// Write an `rfi` to every exception vector
pub fn copy_default_exception_handlers(memory: &Memory) -> Result<(), MemoryError> {
    for vector in EXCEPTION_VECTORS {
        memory.write_be32(0x8000_0000 | vector, RFI)?;
    }
    debug!("Installed {} default exception handlers", EXCEPTION_VECTORS.len());
    Ok(())
}

/// Fill in the globals the GameCube IPL would have set
pub fn setup_gc_memory(memory: &Memory, config: &BootConfig) -> Result<(), MemoryError> {
    memory.write_be32(globals::BOOT_MAGIC, BOOT_MAGIC)?;
    memory.write_be32(globals::MEMORY_SIZE, memory.mem1_size())?;
    // Development kit or retail unit
    let console_type = if config.enable_debugging { 0x1000_0006 } else { 0x0000_0003 };
    memory.write_be32(globals::CONSOLE_TYPE, console_type)?;
    memory.write_be32(globals::VIDEO_MODE, if config.region.is_ntsc() { 0 } else { 1 })?;
    memory.write_be32(globals::ARAM_SIZE, 0x0100_0000)?;
    memory.write_be32(globals::BUS_CLOCK, 0x09A7_EC80)?;
    memory.write_be32(globals::CPU_CLOCK, 0x1CF7_C580)?;

    debug!("GameCube low memory set up (region {})", config.region);
    Ok(())
}

/// Fill in the globals the System Menu would have set, and publish `setting.txt`
///
/// The settings block is read back from the NAND when present so that the serial number
/// and model survive across boots; otherwise it is generated for the configured region.
pub fn setup_wii_memory(
    memory: &Memory,
    ios: &Ios,
    config: &BootConfig,
    console_type: ConsoleType,
) -> Result<(), BootError> {
    let settings = load_or_generate_settings(ios, config)?;
    memory.write_bytes(SETTINGS_ADDRESS, settings.bytes())?;

    let board_model = match console_type {
        ConsoleType::Rvt => 0x1000_0021,
        ConsoleType::Retail => 0x0000_0023,
    };

    let words: &[(u32, u32)] = &[
        (globals::BOOT_MAGIC, BOOT_MAGIC),
        (globals::VERSION, 0x0000_0001),
        (globals::MEMORY_SIZE, memory.mem1_size()),
        (globals::CONSOLE_TYPE, board_model),
        (globals::BI2_ADDRESS, 0x8179_B500),
        (globals::BUS_CLOCK, 0x0E7B_E2C0),
        (globals::CPU_CLOCK, 0x2B73_A840),
        (0x8000_30C0, 0),
        (0x8000_30C4, 0),
        (0x8000_30D8, 0xFFFF_FFFF),
        (0x8000_30DC, 0),
        (0x8000_30F0, 0),
        // Simulated MEM1 size and BAT-mapped MEM1 size
        (0x8000_3100, memory.mem1_size()),
        (0x8000_3104, memory.mem1_size()),
        (0x8000_310C, 0),
        (0x8000_3110, 0x8179_D500),
        (0x8000_3118, memory.mem2_size()),
        (0x8000_311C, memory.mem2_size()),
        (0x8000_3120, 0x9340_0000),
        // MEM2 arena for the game, then the range IOS keeps for itself
        (0x8000_3124, 0x9000_0800),
        (0x8000_3128, 0x935E_0000),
        (0x8000_3130, 0x935E_0000),
        (0x8000_3134, 0x93A0_0000),
        (0x8000_3138, 0x0000_0011),
        (0x8000_3158, 0x0000_FF16),
        (0x8000_3160, 0),
        (0x8000_3184, 0x8000_0000),
        (globals::VIDEO_MODE, if config.region.is_ntsc() { 0 } else { 1 }),
    ];
    for &(address, value) in words {
        memory.write_be32(address, value)?;
    }
    memory.write_be16(0x8000_30E0, 0x0000)?;
    memory.write_be16(0x8000_30E6, 0x8201)?;
    memory.write_u8(0x8000_315C, 0x80)?;
    memory.write_be16(0x8000_315E, 0x0113)?;

    // Software re-installs its own handlers; the area starts out clear
    memory.fill(0x8000_3000, 0x3C, 0)?;

    debug!("Wii low memory set up ({:?})", console_type);
    Ok(())
}

fn load_or_generate_settings(ios: &Ios, config: &BootConfig) -> Result<SettingsHandler, BootError> {
    let path = settings_path();
    let existing = match ios.fs().read_file(&path) {
        Ok(data) if data.len() == SETTINGS_SIZE => Some(SettingsHandler::from_encrypted(&data)),
        Ok(data) => {
            warn!("Ignoring {} byte setting.txt", data.len());
            None
        }
        Err(_) => None,
    };

    let model = existing.as_ref().and_then(|s| s.get_value("MODEL"));
    let serial = existing
        .as_ref()
        .and_then(|s| s.get_value("SERNO"))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| config.serial_number.clone());

    let settings = generate_settings(config.region, model.as_deref(), &serial);

    ios.es().create_title_directories(SYSTEM_MENU, SYSMENU_GID)?;
    ios.fs()
        .write_file(&path, settings.bytes(), Modes::all_read_write())?;
    Ok(settings)
}

/// NAND path of `setting.txt`
pub fn settings_path() -> String {
    format!("{}/setting.txt", titles::title_data_dir(SYSTEM_MENU))
}
