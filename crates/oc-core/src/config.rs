//! Configuration system for oxidized-cube

use crate::region::Region;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub general: GeneralConfig,
    pub wii: WiiConfig,
    pub paths: PathConfig,
    pub debug: DebugConfig,
}

/// General emulator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Region assumed when the booted artifact does not carry one
    pub region: Region,
    /// Disc inserted for executables and NAND titles that probe the drive
    pub default_iso: Option<PathBuf>,
    /// Boot GameCube discs through the HLE BS2 instead of a real IPL dump
    pub skip_ipl: bool,
    /// Report a development console to GameCube software
    pub enable_debugging: bool,
}

/// Wii system settings (SYSCONF equivalents)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WiiConfig {
    /// EuRGB60: PAL consoles output 60 Hz
    pub pal60: bool,
    /// Widescreen flag reported in setting.txt consumers
    pub widescreen: bool,
    /// Console serial number written to setting.txt
    pub serial_number: String,
    /// Retail unit or development kit
    pub console_type: ConsoleType,
}

/// Kind of console the emulated NAND belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConsoleType {
    #[default]
    Retail,
    /// Development kit (RVT)
    Rvt,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    /// User directory root
    pub user: PathBuf,
    /// Read-only system data shipped with the emulator
    pub sys: PathBuf,
    /// Per-region GameCube data (IPL dumps live in `<gc>/<region>/IPL.bin`)
    pub gc: PathBuf,
    /// Host directory backing the emulated NAND
    pub nand_root: PathBuf,
    /// User symbol maps
    pub maps: PathBuf,
    /// Key store (common key for WAD installation)
    pub keys: PathBuf,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            region: Region::default(),
            default_iso: None,
            skip_ipl: true,
            enable_debugging: false,
        }
    }
}

impl Default for WiiConfig {
    fn default() -> Self {
        Self {
            pal60: true,
            widescreen: false,
            serial_number: "000000000".to_string(),
            console_type: ConsoleType::default(),
        }
    }
}

impl Default for PathConfig {
    fn default() -> Self {
        let base = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-cube");

        Self::with_user_dir(base)
    }
}

impl PathConfig {
    /// Lay out every user path below `base`
    pub fn with_user_dir(base: PathBuf) -> Self {
        Self {
            gc: base.join("GC"),
            nand_root: base.join("Wii"),
            maps: base.join("Maps"),
            keys: base.join("keys.toml"),
            sys: base.join("Sys"),
            user: base,
        }
    }

    /// System maps shipped with the emulator
    pub fn sys_maps(&self) -> PathBuf {
        self.sys.join("Maps")
    }

    /// Locate the IPL dump for a region directory
    ///
    /// The user directory wins over the system directory. When neither holds a dump the user
    /// path is returned so that the caller can report where it was expected.
    pub fn boot_rom_path(&self, region_dir: &str) -> PathBuf {
        let user = self.gc.join(region_dir).join("IPL.bin");
        if user.exists() {
            return user;
        }
        let sys = self.sys.join("GC").join(region_dir).join("IPL.bin");
        if sys.exists() {
            return sys;
        }
        user
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit file, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to an explicit file
    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-cube")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.region, Region::NtscU);
        assert!(config.general.skip_ipl);
        assert!(config.general.default_iso.is_none());
        assert!(config.wii.pal60);
        assert_eq!(config.debug.log_level, LogLevel::Info);
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.general.region = Region::Pal;
        config.general.default_iso = Some(PathBuf::from("/games/default.iso"));
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.general.region, Region::Pal);
        assert_eq!(parsed.general.default_iso, config.general.default_iso);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = toml::from_str("[general]\nskip_ipl = false\n").unwrap();
        assert!(!parsed.general.skip_ipl);
        assert!(parsed.wii.pal60);
    }

    #[test]
    fn test_user_dir_layout() {
        let paths = PathConfig::with_user_dir(PathBuf::from("/u"));
        assert_eq!(paths.nand_root, PathBuf::from("/u/Wii"));
        assert_eq!(paths.maps, PathBuf::from("/u/Maps"));
        assert_eq!(paths.sys_maps(), PathBuf::from("/u/Sys/Maps"));
        assert_eq!(paths.boot_rom_path("EUR"), PathBuf::from("/u/GC/EUR/IPL.bin"));
    }
}
