//! GameCube IPL (boot ROM) dumps

use flate2::Crc;
use std::fmt;

/// Full size of an IPL dump
pub const IPL_SIZE: usize = 0x20_0000;

/// Scrambled region holding BS1 and BS2
pub const SCRAMBLED_OFFSET: usize = 0x100;
pub const SCRAMBLED_SIZE: usize = 0x1A_FE00;

/// BS1 bootstrap, copied to its load address
pub const BS1_OFFSET: usize = 0x100;
pub const BS1_SIZE: usize = 0x700;
pub const BS1_LOAD_ADDRESS: u32 = 0x0120_0000;

/// BS2 menu program
pub const BS2_OFFSET: usize = 0x820;
pub const BS2_SIZE: usize = 0x1A_FE00;
pub const BS2_LOAD_ADDRESS: u32 = 0x0130_0000;

/// Where execution resumes once the first BS1 instructions are skipped
pub const BS1_ENTRY: u32 = 0x8120_0150;

/// Video standard an IPL was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IplFamily {
    Ntsc,
    Pal,
}

impl fmt::Display for IplFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IplFamily::Ntsc => write!(f, "NTSC"),
            IplFamily::Pal => write!(f, "PAL"),
        }
    }
}

/// Known good IPL dumps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IplDump {
    NtscV1_0,
    NtscV1_1,
    NtscV1_2,
    /// Brazilian release
    MpalV1_1,
    PalV1_0,
    PalV1_2,
}

impl IplDump {
    pub const ALL: [IplDump; 6] = [
        IplDump::NtscV1_0,
        IplDump::NtscV1_1,
        IplDump::NtscV1_2,
        IplDump::MpalV1_1,
        IplDump::PalV1_0,
        IplDump::PalV1_2,
    ];

    /// CRC32 of the complete dump
    pub fn crc32(self) -> u32 {
        match self {
            IplDump::NtscV1_0 => 0x6DAC_1F2A,
            IplDump::NtscV1_1 => 0xD5E6_FEEA,
            IplDump::NtscV1_2 => 0x8657_3808,
            IplDump::MpalV1_1 => 0x667D_0B64,
            IplDump::PalV1_0 => 0x4F31_9F43,
            IplDump::PalV1_2 => 0xAD1B_7F16,
        }
    }

    pub fn family(self) -> IplFamily {
        match self {
            // MPAL runs at 60 Hz and has always been grouped with NTSC
            IplDump::NtscV1_0 | IplDump::NtscV1_1 | IplDump::NtscV1_2 | IplDump::MpalV1_1 => {
                IplFamily::Ntsc
            }
            IplDump::PalV1_0 | IplDump::PalV1_2 => IplFamily::Pal,
        }
    }
}

/// CRC32 of an IPL dump
pub fn ipl_crc32(data: &[u8]) -> u32 {
    let mut crc = Crc::new();
    crc.update(data);
    crc.sum()
}

/// Look up a dump by its CRC32
pub fn identify_ipl(crc: u32) -> Option<IplDump> {
    IplDump::ALL.into_iter().find(|dump| dump.crc32() == crc)
}

/// Undo the IPL's stream scrambling in place
///
/// The keystream is produced by three linear feedback shift registers; applying it twice
/// restores the input.
pub fn descramble(data: &mut [u8]) {
    let mut acc: u8 = 0;
    let mut nacc: u8 = 0;
    let mut t: u16 = 0x2953;
    let mut u: u16 = 0xd9c2;
    let mut v: u16 = 0x3ff1;
    let mut x: u8 = 1;

    let mut it = 0;
    while it < data.len() {
        let t0 = (t & 1) as u8;
        let t1 = ((t >> 1) & 1) as u8;
        let u0 = (u & 1) as u8;
        let u1 = ((u >> 1) & 1) as u8;
        let v0 = (v & 1) as u8;

        x ^= t1 ^ v0;
        x ^= u0 | u1;
        x ^= (t0 ^ u1 ^ v0) & (t0 ^ u0);

        if t0 == u0 {
            v >>= 1;
            if v0 != 0 {
                v ^= 0xb3d0;
            }
        }

        if t0 == 0 {
            u >>= 1;
            if u0 != 0 {
                u ^= 0xfb10;
            }
        }

        t >>= 1;
        if t0 != 0 {
            t ^= 0xa740;
        }

        nacc += 1;
        acc = acc.wrapping_mul(2).wrapping_add(x);
        if nacc == 8 {
            data[it] ^= acc;
            it += 1;
            nacc = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc_table_families() {
        assert_eq!(identify_ipl(0x6DAC_1F2A), Some(IplDump::NtscV1_0));
        assert_eq!(identify_ipl(0xAD1B_7F16).map(IplDump::family), Some(IplFamily::Pal));
        assert_eq!(identify_ipl(0x667D_0B64).map(IplDump::family), Some(IplFamily::Ntsc));
        assert_eq!(identify_ipl(0x1234_5678), None);

        let ntsc = IplDump::ALL
            .iter()
            .filter(|d| d.family() == IplFamily::Ntsc)
            .count();
        assert_eq!(ntsc, 4);

        let mut crcs: Vec<u32> = IplDump::ALL.iter().map(|d| d.crc32()).collect();
        crcs.dedup();
        assert_eq!(crcs.len(), 6);
    }

    #[test]
    fn test_crc32() {
        assert_eq!(ipl_crc32(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_descrambler_keystream() {
        let mut data = [0u8; 8];
        descramble(&mut data);
        assert_eq!(data, [0x89, 0x7e, 0x47, 0x7f, 0xf4, 0x42, 0x3f, 0xe2]);

        descramble(&mut data);
        assert_eq!(data, [0u8; 8]);
    }
}
