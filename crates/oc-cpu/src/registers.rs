//! Gekko/Broadway architectural register state

use crate::bat::BatMapping;
use crate::spr::*;
use bitflags::bitflags;

bitflags! {
    /// Machine State Register bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Msr: u32 {
        /// Power management enable
        const POW = 0x0004_0000;
        /// Interrupt little-endian mode
        const ILE = 0x0001_0000;
        /// External interrupt enable
        const EE = 0x0000_8000;
        /// Problem (user) state
        const PR = 0x0000_4000;
        /// Floating-point available
        const FP = 0x0000_2000;
        /// Machine check enable
        const ME = 0x0000_1000;
        const FE0 = 0x0000_0800;
        const SE = 0x0000_0400;
        const BE = 0x0000_0200;
        const FE1 = 0x0000_0100;
        /// Exception prefix (vectors at 0xFFF00000)
        const IP = 0x0000_0040;
        /// Instruction address translation
        const IR = 0x0000_0020;
        /// Data address translation
        const DR = 0x0000_0010;
        const PM = 0x0000_0004;
        /// Recoverable exception
        const RI = 0x0000_0002;
        /// Little-endian mode
        const LE = 0x0000_0001;
    }
}

bitflags! {
    /// Broadway HID4 bits used during bring-up
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Hid4: u32 {
        /// Always set on Broadway
        const H4A = 0x8000_0000;
        /// Secondary BAT enable (BATs 4-7)
        const SBE = 0x0200_0000;
    }
}

/// CPU register file as seen by the boot path
#[derive(Debug, Clone)]
pub struct PowerPcState {
    /// General purpose registers
    pub gpr: [u32; 32],
    /// Special purpose registers, indexed by SPR number
    pub spr: [u32; 1024],
    /// Machine State Register
    pub msr: Msr,
    /// Program counter
    pub pc: u32,
    ibat: [BatMapping; 8],
    dbat: [BatMapping; 8],
}

impl Default for PowerPcState {
    fn default() -> Self {
        Self {
            gpr: [0; 32],
            spr: [0; 1024],
            msr: Msr::empty(),
            pc: 0,
            ibat: [BatMapping::default(); 8],
            dbat: [BatMapping::default(); 8],
        }
    }
}

impl PowerPcState {
    /// Create a register file in its power-on state
    pub fn new() -> Self {
        Self::default()
    }

    /// Return every register to its power-on state
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Write a special purpose register
    ///
    /// Writes to BAT or HID4 registers refresh the cached translation tables.
    pub fn set_spr(&mut self, index: usize, value: u32) {
        self.spr[index] = value;
        match index {
            SPR_IBAT0U..=SPR_DBAT3L | SPR_IBAT4U..=SPR_DBAT7L | SPR_HID4 => self.update_bats(),
            _ => {}
        }
    }

    /// Read a special purpose register
    #[inline]
    pub fn get_spr(&self, index: usize) -> u32 {
        self.spr[index]
    }

    /// Current HID4 value
    pub fn hid4(&self) -> Hid4 {
        Hid4::from_bits_retain(self.spr[SPR_HID4])
    }

    /// Whether the secondary BATs are enabled
    pub fn secondary_bats_enabled(&self) -> bool {
        self.hid4().contains(Hid4::SBE)
    }

    /// Rebuild the cached BAT mappings from the SPR array
    pub fn update_bats(&mut self) {
        let count = if self.secondary_bats_enabled() { 8 } else { 4 };
        for i in 0..8 {
            let (ibat_u, ibat_l) = IBAT_PAIRS[i];
            let (dbat_u, dbat_l) = DBAT_PAIRS[i];
            if i < count {
                self.ibat[i] = BatMapping::decode(self.spr[ibat_u], self.spr[ibat_l]);
                self.dbat[i] = BatMapping::decode(self.spr[dbat_u], self.spr[dbat_l]);
            } else {
                self.ibat[i] = BatMapping::default();
                self.dbat[i] = BatMapping::default();
            }
        }
    }

    /// Translate a data effective address through the DBATs
    ///
    /// Returns the effective address unchanged when data translation is off.
    pub fn translate_data_address(&self, ea: u32) -> Option<u32> {
        if !self.msr.contains(Msr::DR) {
            return Some(ea);
        }
        let user = self.msr.contains(Msr::PR);
        self.dbat.iter().find_map(|bat| bat.translate(ea, user))
    }

    /// Translate an instruction effective address through the IBATs
    pub fn translate_instruction_address(&self, ea: u32) -> Option<u32> {
        if !self.msr.contains(Msr::IR) {
            return Some(ea);
        }
        let user = self.msr.contains(Msr::PR);
        self.ibat.iter().find_map(|bat| bat.translate(ea, user))
    }
}
