//! DVD drive interface: the disc slot of the emulated machine

use crate::create_disc;
use crate::volume::{Partition, VolumeDisc};
use oc_core::error::DiscError;
use oc_memory::Memory;
use std::path::PathBuf;
use tracing::{info, warn};

/// Size of the disc id block copied to low memory
pub const DISC_ID_SIZE: usize = 0x20;

/// State of the drive as seen by software
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveState {
    #[default]
    NoMedium,
    /// A disc is inserted but software has not read its id yet
    DiscIdNotRead,
    ReadyNoReadsMade,
    Ready,
}

/// The drive and its disc slot
#[derive(Default)]
pub struct DvdInterface {
    disc: Option<Box<dyn VolumeDisc>>,
    auto_disc_change_paths: Vec<PathBuf>,
    auto_disc_change_index: usize,
    state: DriveState,
}

impl DvdInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `disc`, replacing whatever was in the slot
    ///
    /// The returned view borrows the drive; it is only meant to be used while the disc is
    /// being booted.
    pub fn set_disc(&mut self, disc: Box<dyn VolumeDisc>, auto_disc_change_paths: Vec<PathBuf>) -> &dyn VolumeDisc {
        if !auto_disc_change_paths.is_empty() {
            info!("Disc swap set: {} discs", auto_disc_change_paths.len());
        }
        self.auto_disc_change_paths = auto_disc_change_paths;
        self.auto_disc_change_index = 0;
        self.state = DriveState::DiscIdNotRead;
        &**self.disc.insert(disc)
    }

    /// Remove the disc from the slot
    pub fn eject_disc(&mut self) -> Option<Box<dyn VolumeDisc>> {
        self.state = DriveState::NoMedium;
        self.disc.take()
    }

    pub fn is_disc_inside(&self) -> bool {
        self.disc.is_some()
    }

    pub fn disc(&self) -> Option<&dyn VolumeDisc> {
        self.disc.as_deref()
    }

    pub fn drive_state(&self) -> DriveState {
        self.state
    }

    pub fn set_drive_state(&mut self, state: DriveState) {
        self.state = state;
    }

    pub fn auto_disc_change_paths(&self) -> &[PathBuf] {
        &self.auto_disc_change_paths
    }

    /// Swap to the next disc of the swap set; false if there is none to swap to
    pub fn auto_change_disc(&mut self) -> bool {
        if self.auto_disc_change_paths.len() < 2 {
            return false;
        }
        self.auto_disc_change_index = (self.auto_disc_change_index + 1) % self.auto_disc_change_paths.len();
        let path = &self.auto_disc_change_paths[self.auto_disc_change_index];
        match create_disc(path) {
            Some(disc) => {
                info!("Changing disc to {}", path.display());
                self.disc = Some(disc);
                self.state = DriveState::DiscIdNotRead;
                true
            }
            None => {
                warn!("Could not open {} for the disc change", path.display());
                false
            }
        }
    }

    /// Copy the disc id block to `address`, as the first read software performs
    pub fn read_disc_id(&mut self, memory: &Memory, address: u32) -> Result<(), DiscError> {
        let disc = self.disc.as_deref().ok_or(DiscError::NoDisc)?;
        read_disc_id(disc, memory, address)?;
        self.state = DriveState::ReadyNoReadsMade;
        Ok(())
    }
}

/// Copy `length` bytes of `partition` at `offset` to emulated memory
pub fn dvd_read(
    disc: &dyn VolumeDisc,
    offset: u64,
    memory: &Memory,
    address: u32,
    length: usize,
    partition: Partition,
) -> Result<(), DiscError> {
    let mut buffer = vec![0u8; length];
    disc.read(offset, &mut buffer, partition)?;
    memory.write_bytes(address, &buffer)?;
    Ok(())
}

/// Copy the raw disc's id block to `address`
pub fn read_disc_id(disc: &dyn VolumeDisc, memory: &Memory, address: u32) -> Result<(), DiscError> {
    dvd_read(disc, 0, memory, address, DISC_ID_SIZE, Partition::NONE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MemoryBlobReader;
    use crate::test_images::build_gamecube_image;
    use crate::volume_gc::VolumeGc;
    use std::io::Write;

    fn gamecube_disc(game_id: &str) -> Box<dyn VolumeDisc> {
        let image = build_gamecube_image(game_id, 0, &[]);
        Box::new(VolumeGc::new(Box::new(MemoryBlobReader::new(image))).unwrap())
    }

    #[test]
    fn test_set_and_eject() {
        let mut dvd = DvdInterface::new();
        assert!(!dvd.is_disc_inside());
        assert_eq!(dvd.drive_state(), DriveState::NoMedium);

        let view = dvd.set_disc(gamecube_disc("GALE01"), Vec::new());
        assert_eq!(view.game_id(Partition::NONE), "GALE01");
        assert_eq!(dvd.drive_state(), DriveState::DiscIdNotRead);

        let memory = Memory::new();
        dvd.read_disc_id(&memory, 0x8000_0000).unwrap();
        assert_eq!(memory.read_bytes(0, 6).unwrap(), b"GALE01");
        assert_eq!(dvd.drive_state(), DriveState::ReadyNoReadsMade);

        assert!(dvd.eject_disc().is_some());
        assert!(dvd.disc().is_none());
        assert!(dvd.read_disc_id(&memory, 0x8000_0000).is_err());
    }

    #[test]
    fn test_auto_change_cycles() {
        let dir = tempfile::tempdir().unwrap();
        let mut paths = Vec::new();
        for (name, id) in [("disc1.iso", "GDQE01"), ("disc2.iso", "GDQE02")] {
            let path = dir.path().join(name);
            let mut file = std::fs::File::create(&path).unwrap();
            file.write_all(&build_gamecube_image(id, 0, &[])).unwrap();
            paths.push(path);
        }

        let mut dvd = DvdInterface::new();
        dvd.set_disc(create_disc(&paths[0]).unwrap(), paths.clone());
        assert!(dvd.auto_change_disc());
        assert_eq!(dvd.disc().unwrap().game_id(Partition::NONE), "GDQE02");
        assert!(dvd.auto_change_disc());
        assert_eq!(dvd.disc().unwrap().game_id(Partition::NONE), "GDQE01");

        dvd.set_disc(gamecube_disc("GALE01"), Vec::new());
        assert!(!dvd.auto_change_disc());
    }
}
