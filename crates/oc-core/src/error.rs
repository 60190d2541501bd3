//! Error types for the oxidized-cube emulator

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the emulator
#[derive(Error, Debug)]
pub enum EmulatorError {
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Loader error: {0}")]
    Loader(#[from] LoaderError),

    #[error("Disc error: {0}")]
    Disc(#[from] DiscError),

    #[error("IOS error: {0}")]
    Ios(#[from] IosError),

    #[error("Boot error: {0}")]
    Boot(#[from] BootError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}

/// Memory-related errors
#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("Invalid address: 0x{0:08x}")]
    InvalidAddress(u32),

    #[error("Access out of range at 0x{addr:08x} (size 0x{size:x})")]
    OutOfRange { addr: u32, size: u32 },

    #[error("MEM2 is not mapped on this platform (address 0x{0:08x})")]
    Mem2Unavailable(u32),
}

/// Executable and firmware loader errors
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Invalid ELF: {0}")]
    InvalidElf(String),

    #[error("Invalid DOL: {0}")]
    InvalidDol(String),

    #[error("Invalid map file {}: {reason}", .path.display())]
    InvalidMap { path: PathBuf, reason: String },

    #[error("Failed to write executable to memory: {0}")]
    Memory(#[from] MemoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Disc volume, WAD and mod descriptor errors
#[derive(Error, Debug)]
pub enum DiscError {
    #[error("Read of 0x{length:x} bytes at 0x{offset:x} is outside the volume")]
    ReadOutOfBounds { offset: u64, length: u64 },

    #[error("Partition at 0x{0:x} does not exist")]
    NoSuchPartition(u64),

    #[error("Partition at 0x{0:x} is encrypted; decryption is handled by the volume provider")]
    EncryptedPartition(u64),

    #[error("Invalid file system table: {0}")]
    InvalidFst(String),

    #[error("Invalid WAD: {0}")]
    InvalidWad(String),

    #[error("Invalid game mod descriptor {}: {reason}", .path.display())]
    InvalidDescriptor { path: PathBuf, reason: String },

    #[error("No disc in the drive")]
    NoDisc,

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// IOS kernel, NAND and title store errors
#[derive(Error, Debug)]
pub enum IosError {
    #[error("NAND path not found: {0}")]
    NotFound(String),

    #[error("Invalid NAND path: {0}")]
    InvalidPath(String),

    #[error("Permission denied for {path} (uid 0x{uid:x}, gid 0x{gid:x})")]
    PermissionDenied { path: String, uid: u32, gid: u16 },

    #[error("Invalid TMD: {0}")]
    InvalidTmd(String),

    #[error("Invalid ticket: {0}")]
    InvalidTicket(String),

    #[error("Title {0:016x} is not installed")]
    TitleNotInstalled(u64),

    #[error("Title {0:016x} is not an IOS title")]
    NotAnIos(u64),

    #[error("Missing key: {0}")]
    MissingKey(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Content {content_id:08x} of title {title_id:016x} failed hash verification")]
    HashMismatch { title_id: u64, content_id: u32 },

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a disc-family artifact could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreadableReason {
    /// A drive was given but holds no readable disc
    NoMedia,
    /// A file was given but it is not a GameCube/Wii image
    InvalidImage,
}

/// Boot orchestration errors
///
/// Every variant that concerns a user-supplied artifact names its path in the message.
#[derive(Error, Debug)]
pub enum BootError {
    #[error("The specified file \"{}\" does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("{}", unreadable_message(.path, .reason))]
    UnreadableImage {
        path: PathBuf,
        reason: UnreadableReason,
    },

    #[error("Could not recognize file {}", .0.display())]
    UnrecognizedFormat(PathBuf),

    #[error(
        "Files specified in the M3U file \"{}\" were not found:\n{}",
        .playlist.display(),
        join_paths(.missing)
    )]
    PlaylistMissingEntries {
        playlist: PathBuf,
        missing: Vec<PathBuf>,
    },

    #[error("No paths found in the M3U file \"{}\"", .0.display())]
    PlaylistEmpty(PathBuf),

    #[error("{}", firmware_message(.path, .disc_requested))]
    InvalidFirmwareRom { path: PathBuf, disc_requested: bool },

    #[error("\"{}\" is not a valid executable", .0.display())]
    InvalidExecutable(PathBuf),

    #[error("Failed to load the executable \"{}\" to memory: {source}", .path.display())]
    LoadIntoMemoryFailed {
        path: PathBuf,
        #[source]
        source: LoaderError,
    },

    #[error("Could not insert the disc \"{}\" into the drive", .0.display())]
    DiscMountFailed(PathBuf),

    #[error("Emulated BS2 failed for \"{}\": {reason}", .path.display())]
    Bs2Failed { path: PathBuf, reason: String },

    #[error("Cannot boot the WAD \"{}\": {reason}", .path.display())]
    InstallPackageBootFailed { path: PathBuf, reason: String },

    #[error("Cannot boot title {title_id:016x}: {reason}")]
    TitleBootFailed { title_id: u64, reason: String },

    #[error("Invalid game mod descriptor \"{}\": {reason}", .path.display())]
    PatchDescriptorInvalid { path: PathBuf, reason: String },

    #[error("Could not open the FIFO log \"{}\": {reason}", .path.display())]
    ReplayOpenFailed { path: PathBuf, reason: String },

    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("Disc error: {0}")]
    Disc(#[from] DiscError),

    #[error("IOS error: {0}")]
    Ios(#[from] IosError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn unreadable_message(path: &std::path::Path, reason: &UnreadableReason) -> String {
    match reason {
        UnreadableReason::NoMedia => format!(
            "Could not read \"{}\". There is no disc in the drive or it is not a GameCube/Wii \
             backup. Please note that original GameCube and Wii discs cannot be read by most \
             PC drives.",
            path.display()
        ),
        UnreadableReason::InvalidImage => format!(
            "\"{}\" is an invalid GCM/ISO file, or is not a GC/Wii ISO.",
            path.display()
        ),
    }
}

fn firmware_message(path: &std::path::Path, disc_requested: &bool) -> String {
    if *disc_requested {
        format!(
            "Cannot start the game, because the GC IPL could not be found at \"{}\".",
            path.display()
        )
    } else {
        format!("Cannot find the GC IPL at \"{}\".", path.display())
    }
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type alias for emulator operations
pub type Result<T> = std::result::Result<T, EmulatorError>;
