//! The System Menu's persistent `state.dat` record

use crate::fs::Modes;
use crate::kernel::Ios;
use crate::titles::{self, SYSMENU_GID, SYSMENU_UID, SYSTEM_MENU};
use oc_core::error::IosError;
use tracing::debug;

/// Size of the record on NAND
pub const STATE_FLAGS_SIZE: usize = 32;

/// NAND path of the record
pub fn state_flags_path() -> String {
    format!("{}/state.dat", titles::title_data_dir(SYSTEM_MENU))
}

/// Boot state shared between the System Menu and titles it launches
///
/// All words are little-endian; `checksum` is the wrapping sum of the seven words before it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFlags {
    pub flags: u8,
    pub r#type: u8,
    pub discstate: u8,
    pub returnto: u8,
    pub unknown: [u32; 6],
    pub checksum: u32,
}

impl StateFlags {
    pub fn from_bytes(bytes: &[u8; STATE_FLAGS_SIZE]) -> Self {
        let word = |i: usize| {
            u32::from_le_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        let mut unknown = [0u32; 6];
        for (i, value) in unknown.iter_mut().enumerate() {
            *value = word(i + 1);
        }
        Self {
            flags: bytes[0],
            r#type: bytes[1],
            discstate: bytes[2],
            returnto: bytes[3],
            unknown,
            checksum: word(7),
        }
    }

    pub fn to_bytes(&self) -> [u8; STATE_FLAGS_SIZE] {
        let mut out = [0u8; STATE_FLAGS_SIZE];
        out[0] = self.flags;
        out[1] = self.r#type;
        out[2] = self.discstate;
        out[3] = self.returnto;
        for (i, value) in self.unknown.iter().enumerate() {
            out[(i + 1) * 4..(i + 2) * 4].copy_from_slice(&value.to_le_bytes());
        }
        out[28..32].copy_from_slice(&self.checksum.to_le_bytes());
        out
    }

    /// Wrapping sum of the seven words preceding the checksum
    pub fn compute_checksum(&self) -> u32 {
        let bytes = self.to_bytes();
        bytes[..28]
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .fold(0u32, u32::wrapping_add)
    }

    pub fn update_checksum(&mut self) {
        self.checksum = self.compute_checksum();
    }

    pub fn is_checksum_valid(&self) -> bool {
        self.checksum == self.compute_checksum()
    }
}

/// Read-modify-write `state.dat`
///
/// A file of any size other than 32 bytes is treated as absent and the mutation starts from a
/// zeroed record. The checksum is recomputed after `update` runs.
pub fn update_state_flags<F>(ios: &Ios, update: F) -> Result<(), IosError>
where
    F: FnOnce(&mut StateFlags),
{
    ios.es().create_title_directories(SYSTEM_MENU, SYSMENU_GID)?;

    let path = state_flags_path();
    let mut file = ios.fs().create_and_open_file(
        SYSMENU_UID,
        SYSMENU_GID,
        &path,
        Modes::all_read_write(),
    )?;

    let mut state = StateFlags::default();
    if file.size()? == STATE_FLAGS_SIZE as u64 {
        let mut bytes = [0u8; STATE_FLAGS_SIZE];
        file.read_exact(&mut bytes)?;
        state = StateFlags::from_bytes(&bytes);
    }

    update(&mut state);
    state.update_checksum();

    file.seek(0)?;
    file.write_all(&state.to_bytes())?;
    debug!(
        "State flags updated: flags=0x{:02x} type=0x{:02x} discstate=0x{:02x}",
        state.flags, state.r#type, state.discstate
    );
    Ok(())
}
