//! Block address translation and the MMU state a boot ROM leaves behind

use crate::registers::{Hid4, Msr, PowerPcState};
use crate::spr::*;
use tracing::debug;

/// One decoded BAT register pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatMapping {
    /// Effective page index (upper 15 bits)
    pub bepi: u32,
    /// Physical page number (upper 15 bits)
    pub brpn: u32,
    /// Block length mask covering the low address bits the block spans
    pub block_mask: u32,
    /// Valid in supervisor mode
    pub vs: bool,
    /// Valid in user mode
    pub vp: bool,
    /// Page protection bits
    pub pp: u8,
}

impl BatMapping {
    /// Decode an upper/lower BAT register pair
    pub fn decode(upper: u32, lower: u32) -> Self {
        let bl = (upper >> 2) & 0x7FF;
        Self {
            bepi: upper & 0xFFFE_0000,
            brpn: lower & 0xFFFE_0000,
            block_mask: (bl << 17) | 0x1_FFFF,
            vs: upper & 0x2 != 0,
            vp: upper & 0x1 != 0,
            pp: (lower & 0x3) as u8,
        }
    }

    /// Translate an effective address if this BAT covers it
    pub fn translate(&self, ea: u32, user: bool) -> Option<u32> {
        let valid = if user { self.vp } else { self.vs };
        if !valid || self.pp == 0 {
            return None;
        }
        if ea & !self.block_mask != self.bepi & !self.block_mask {
            return None;
        }
        Some((self.brpn & !self.block_mask) | (ea & self.block_mask))
    }

    /// Size of the mapped block in bytes
    pub fn block_size(&self) -> u32 {
        self.block_mask.wrapping_add(1)
    }
}

/// Enable floating point and address translation, as the boot ROM does
pub fn setup_msr(state: &mut PowerPcState) {
    state.msr |= Msr::FP | Msr::DR | Msr::IR | Msr::RI;
    debug!("MSR = 0x{:08x}", state.msr.bits());
}

/// Program the BATs to map the cached and uncached MEM1 windows (and MEM2 on Wii)
pub fn setup_bat(state: &mut PowerPcState, is_wii: bool) {
    // 0x80000000: 256 MiB cached window onto physical 0
    state.set_spr(SPR_IBAT0U, 0x8000_1fff);
    state.set_spr(SPR_IBAT0L, 0x0000_0002);
    state.set_spr(SPR_DBAT0U, 0x8000_1fff);
    state.set_spr(SPR_DBAT0L, 0x0000_0002);
    // 0xC0000000: uncached
    state.set_spr(SPR_DBAT1U, 0xc000_1fff);
    state.set_spr(SPR_DBAT1L, 0x0000_002a);

    if is_wii {
        state.set_spr(SPR_IBAT4U, 0x9000_1fff);
        state.set_spr(SPR_IBAT4L, 0x1000_0002);
        state.set_spr(SPR_DBAT4U, 0x9000_1fff);
        state.set_spr(SPR_DBAT4L, 0x1000_0002);
        state.set_spr(SPR_DBAT5U, 0xd000_1fff);
        state.set_spr(SPR_DBAT5L, 0x1000_002a);
        let hid4 = state.hid4() | Hid4::SBE;
        state.set_spr(SPR_HID4, hid4.bits());
    }

    debug!("BATs programmed (wii: {})", is_wii);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_256mb_block() {
        let bat = BatMapping::decode(0x8000_1fff, 0x0000_0002);
        assert_eq!(bat.bepi, 0x8000_0000);
        assert_eq!(bat.brpn, 0);
        assert_eq!(bat.block_size(), 0x1000_0000);
        assert!(bat.vs && bat.vp);
        assert_eq!(bat.pp, 2);
    }

    #[test]
    fn test_setup_msr() {
        let mut state = PowerPcState::new();
        setup_msr(&mut state);
        assert!(state.msr.contains(Msr::FP | Msr::DR | Msr::IR | Msr::RI));
        assert!(!state.msr.contains(Msr::EE));
    }

    #[test]
    fn test_gamecube_bats() {
        let mut state = PowerPcState::new();
        setup_msr(&mut state);
        setup_bat(&mut state, false);

        assert_eq!(state.get_spr(SPR_DBAT1U), 0xc000_1fff);
        assert_eq!(state.get_spr(SPR_DBAT1L), 0x0000_002a);
        assert_eq!(state.translate_data_address(0x8000_3100), Some(0x0000_3100));
        assert_eq!(state.translate_data_address(0xC000_3100), Some(0x0000_3100));
        assert_eq!(state.translate_instruction_address(0x8123_4560), Some(0x0123_4560));
        assert_eq!(state.translate_data_address(0x9000_0000), None);
        assert!(!state.secondary_bats_enabled());
    }

    #[test]
    fn test_wii_bats() {
        let mut state = PowerPcState::new();
        state.set_spr(SPR_HID4, 0x8200_0000);
        setup_msr(&mut state);
        setup_bat(&mut state, true);

        assert!(state.secondary_bats_enabled());
        assert_eq!(state.get_spr(SPR_IBAT4U), 0x9000_1fff);
        assert_eq!(state.get_spr(SPR_DBAT5L), 0x1000_002a);
        assert_eq!(state.translate_data_address(0x9000_0040), Some(0x1000_0040));
        assert_eq!(state.translate_data_address(0xD000_0040), Some(0x1000_0040));
        assert_eq!(state.get_spr(SPR_HID4), 0x8200_0000);
    }
}
