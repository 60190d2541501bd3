//! The System Menu's `setting.txt`
//!
//! A 256-byte block of `KEY=VALUE\r\n` lines, obfuscated by XOR with a key that is rotated
//! left by one bit after every byte. Software reads it from low memory to learn the console
//! region, model and video mode.

use oc_core::Region;
use tracing::debug;

pub const SETTINGS_SIZE: usize = 0x100;
/// Key the obfuscation starts from
pub const INITIAL_SEED: u32 = 0x73B5_DBFA;

/// Builds and reads `setting.txt` blocks
#[derive(Debug, Clone)]
pub struct SettingsHandler {
    buffer: [u8; SETTINGS_SIZE],
    position: usize,
    key: u32,
    decoded: String,
}

impl Default for SettingsHandler {
    fn default() -> Self {
        Self {
            buffer: [0; SETTINGS_SIZE],
            position: 0,
            key: INITIAL_SEED,
            decoded: String::new(),
        }
    }
}

impl SettingsHandler {
    /// An empty block, ready for [`Self::add_setting`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode an existing block
    pub fn from_encrypted(data: &[u8]) -> Self {
        let mut handler = Self::default();
        let len = data.len().min(SETTINGS_SIZE);
        handler.buffer[..len].copy_from_slice(&data[..len]);
        handler.decrypt();
        handler
    }

    fn decrypt(&mut self) {
        let mut key = INITIAL_SEED;
        let mut decoded = Vec::with_capacity(SETTINGS_SIZE);
        for &byte in &self.buffer {
            decoded.push(byte ^ key as u8);
            key = key.rotate_left(1);
        }
        self.decoded = String::from_utf8_lossy(&decoded).into_owned();
    }

    /// Append `key=value`; lines that would overflow the block are dropped
    pub fn add_setting(&mut self, key: &str, value: &str) {
        let line = format!("{}={}\r\n", key, value);
        if self.position + line.len() > SETTINGS_SIZE {
            debug!("setting.txt is full, dropping {}", key);
            return;
        }
        for byte in line.bytes() {
            self.buffer[self.position] = byte ^ self.key as u8;
            self.position += 1;
            self.key = self.key.rotate_left(1);
        }
        self.decoded.push_str(&line);
    }

    /// Value of `key`, if present
    pub fn get_value(&self, key: &str) -> Option<String> {
        self.decoded.split("\r\n").find_map(|line| {
            let (name, value) = line.split_once('=')?;
            (name == key).then(|| value.trim_end_matches('\0').to_string())
        })
    }

    /// The obfuscated block
    pub fn bytes(&self) -> &[u8; SETTINGS_SIZE] {
        &self.buffer
    }
}

/// Per-region values of `setting.txt`
struct RegionSetting {
    area: &'static str,
    video: &'static str,
    game: &'static str,
    code: &'static str,
}

fn region_setting(region: Region) -> RegionSetting {
    match region {
        Region::NtscJ => RegionSetting {
            area: "JPN",
            video: "NTSC",
            game: "JP",
            code: "LJ",
        },
        Region::Pal => RegionSetting {
            area: "EUR",
            video: "PAL",
            game: "EU",
            code: "LE",
        },
        Region::NtscK => RegionSetting {
            area: "KOR",
            video: "NTSC",
            game: "KR",
            code: "LKH",
        },
        Region::NtscU | Region::Unknown => RegionSetting {
            area: "USA",
            video: "NTSC",
            game: "US",
            code: "LU",
        },
    }
}

/// Generate the block for a console of `region`
///
/// `model` and `serial` come from an existing block when one was found on the NAND.
pub fn generate_settings(region: Region, model: Option<&str>, serial: &str) -> SettingsHandler {
    let setting = region_setting(region);
    let default_model = format!("RVL-001({})", setting.area);

    let mut gen = SettingsHandler::new();
    gen.add_setting("AREA", setting.area);
    gen.add_setting("MODEL", model.unwrap_or(&default_model));
    gen.add_setting("DVD", "0");
    gen.add_setting("MPCH", "0x7FFE");
    gen.add_setting("CODE", setting.code);
    gen.add_setting("SERNO", serial);
    gen.add_setting("VIDEO", setting.video);
    gen.add_setting("GAME", setting.game);
    gen
}
