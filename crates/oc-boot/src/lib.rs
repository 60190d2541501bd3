//! Boot orchestration for oxidized-cube
//!
//! A boot request goes through two stages:
//! - [`BootParameters::generate_from_files`] classifies user paths (disc images, playlists,
//!   executables, WADs, FIFO logs, mod descriptors) into a typed request.
//! - [`boot_up`] brings a [`Machine`] up for that request: memory, CPU registers, IOS, the
//!   disc drive and the debugger symbol table.
//!
//! [`BootManager`] ties both together for frontends.

pub mod bootup;
pub mod bs2;
pub mod classify;
pub mod config;
pub mod hle;
pub mod machine;
pub mod manager;
pub mod memory_setup;
pub mod nand;
pub mod params;
pub mod replay;
pub mod settings;
pub mod video;

// Re-export main types
pub use bootup::boot_up;
pub use classify::add_mod_patches;
pub use config::BootConfig;
pub use machine::{find_map_file, BootContext, Machine, MapFileLocation};
pub use manager::BootManager;
pub use params::{
    BootDescriptor, BootParameters, BootSessionData, DeleteSavestateAfterBoot, Dff, Disc,
    Executable, Ipl, NandTitle, Wad,
};
pub use replay::{FifoFile, FifoPlayer};
pub use settings::SettingsHandler;
pub use video::{VideoInterface, VideoTiming};
