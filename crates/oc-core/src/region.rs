//! Console regions and their video families

use serde::{Deserialize, Serialize};
use std::fmt;

/// Disc/console region
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub enum Region {
    NtscJ,
    #[default]
    NtscU,
    Pal,
    NtscK,
    Unknown,
}

impl Region {
    /// Decode the region word stored in a disc's bi2 (GameCube) or region area (Wii)
    pub fn from_disc_code(code: u32) -> Self {
        match code {
            0 => Self::NtscJ,
            1 => Self::NtscU,
            2 => Self::Pal,
            4 => Self::NtscK,
            _ => Self::Unknown,
        }
    }

    /// Whether this region uses 60 Hz NTSC video timing
    pub fn is_ntsc(&self) -> bool {
        matches!(self, Self::NtscJ | Self::NtscU | Self::NtscK)
    }

    /// Name of the per-region directory that holds an IPL dump
    pub fn directory_name(&self) -> &'static str {
        match self {
            Self::NtscJ | Self::NtscK => "JAP",
            Self::NtscU | Self::Unknown => "USA",
            Self::Pal => "EUR",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NtscJ => "NTSC-J",
            Self::NtscU => "NTSC-U",
            Self::Pal => "PAL",
            Self::NtscK => "NTSC-K",
            Self::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

/// Hardware family being booted
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, Hash)]
pub enum Platform {
    #[default]
    GameCube,
    Wii,
}

impl Platform {
    pub fn is_wii(&self) -> bool {
        *self == Self::Wii
    }
}
