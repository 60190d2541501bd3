//! Disc-family artifacts: volumes, the DVD drive, WADs, playlists and game mods

pub mod blob;
pub mod device;
pub mod dvd;
pub mod fst;
pub mod mod_descriptor;
pub mod patched;
pub mod patches;
pub mod playlist;
pub mod volume;
pub mod volume_gc;
pub mod volume_wii;
pub mod wad;

#[cfg(test)]
pub(crate) mod test_images;

pub use blob::{create_blob_reader, BlobReader, MemoryBlobReader};
pub use device::{extension_of, is_cdrom_device};
pub use dvd::{DriveState, DvdInterface};
pub use fst::{ContentPiece, ContentSource, FstNode, FstNodeKind};
pub use mod_descriptor::{parse_game_mod_descriptor_file, GameModDescriptor, ModPatchData};
pub use patched::{PatchedLayout, PatchedVolume};
pub use patches::{apply_memory_patches, apply_patches_to_files, generate_patches, Patch};
pub use playlist::{is_playlist_extension, read_m3u_file};
pub use volume::{Partition, VolumeDisc};
pub use volume_gc::VolumeGc;
pub use volume_wii::VolumeWii;
pub use wad::{create_wad, VolumeWad};

use std::path::Path;
use tracing::debug;

/// Open a GameCube or Wii disc from an image file or drive
pub fn create_disc(path: &Path) -> Option<Box<dyn VolumeDisc>> {
    create_disc_from_blob(create_blob_reader(path)?)
}

/// Wrap an opened image in the volume type matching its header
pub fn create_disc_from_blob(reader: Box<dyn BlobReader>) -> Option<Box<dyn VolumeDisc>> {
    let mut head = [0u8; 0x20];
    reader.read(0, &mut head).ok()?;
    let disc: Box<dyn VolumeDisc> = match volume::detect_platform(&head)? {
        oc_core::Platform::Wii => Box::new(VolumeWii::new(reader)?),
        oc_core::Platform::GameCube => Box::new(VolumeGc::new(reader)?),
    };
    debug!("Opened {:?} disc {}", disc.platform(), disc.game_id(Partition::NONE));
    Some(disc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_images::{build_gamecube_image, build_wii_image};

    #[test]
    fn test_create_disc_by_platform() {
        let dir = tempfile::tempdir().unwrap();
        let gc = dir.path().join("gc.iso");
        let wii = dir.path().join("wii.iso");
        let junk = dir.path().join("junk.iso");
        std::fs::write(&gc, build_gamecube_image("GALE01", 0, &[])).unwrap();
        std::fs::write(&wii, build_wii_image("RSPE01", &[0u8; 0x40], false)).unwrap();
        std::fs::write(&junk, vec![0u8; 0x1000]).unwrap();

        assert_eq!(create_disc(&gc).unwrap().platform(), oc_core::Platform::GameCube);
        assert_eq!(create_disc(&wii).unwrap().platform(), oc_core::Platform::Wii);
        assert!(create_disc(&junk).is_none());
        assert!(create_disc(&dir.path().join("absent.iso")).is_none());
    }
}
