//! Turning user-supplied paths into a boot request

use crate::params::{BootDescriptor, BootParameters, BootSessionData, Dff, Disc, Executable, Wad};
use oc_core::error::{BootError, UnreadableReason};
use oc_disc::{
    apply_patches_to_files, create_disc, create_wad, extension_of, generate_patches,
    is_cdrom_device, is_playlist_extension, parse_game_mod_descriptor_file, read_m3u_file,
    Partition, Patch, PatchedLayout, PatchedVolume,
};
use oc_loader::{BootExecutableReader, DolReader, ElfReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extensions opened as disc images; `.dol` and `.elf` fall back to executables
const DISC_IMAGE_EXTENSIONS: &[&str] = &[
    ".gcm", ".iso", ".tgc", ".wbfs", ".ciso", ".gcz", ".wia", ".rvz", ".dol", ".elf",
];

impl BootParameters {
    /// Classify a single path
    pub fn generate_from_file(path: impl Into<PathBuf>, session: BootSessionData) -> Result<Self, BootError> {
        Self::generate_from_files(vec![path.into()], session)
    }

    /// Classify a boot request
    ///
    /// The first path decides the kind of boot. With more than one path (directly or through
    /// a playlist) every path, the first included, becomes the disc auto-swap set.
    pub fn generate_from_files(mut paths: Vec<PathBuf>, session: BootSessionData) -> Result<Self, BootError> {
        let Some(first) = paths.first().cloned() else {
            return Err(BootError::NotFound(PathBuf::new()));
        };

        let is_drive = is_cdrom_device(&first);
        if !is_drive && !first.exists() {
            return Err(BootError::NotFound(first));
        }

        let mut extension = extension_of(&first);
        if is_playlist_extension(&extension) {
            let folder = first.parent().unwrap_or(Path::new("")).to_path_buf();
            paths = read_m3u_file(&first, &folder)?;
            match paths.first() {
                Some(head) => extension = extension_of(head),
                None => return Err(BootError::PlaylistEmpty(first)),
            }
        }

        let path = paths[0].clone();
        if paths.len() == 1 {
            paths.clear();
        }
        debug!("Classifying {} (extension \"{}\")", path.display(), extension);

        if is_drive || DISC_IMAGE_EXTENSIONS.contains(&extension.as_str()) {
            return classify_disc_family(path, paths, &extension, is_drive, session);
        }

        match extension.as_str() {
            ".dff" => Ok(Self::new(BootDescriptor::Dff(Dff { path }), session)),
            ".wad" => match create_wad(&path) {
                Some(volume) => Ok(Self::new(BootDescriptor::Wad(Wad { path, volume }), session)),
                None => Err(BootError::UnrecognizedFormat(path)),
            },
            ".json" => classify_mod_descriptor(&path, session),
            _ => Err(BootError::UnrecognizedFormat(path)),
        }
    }
}

fn classify_disc_family(
    path: PathBuf,
    auto_disc_change_paths: Vec<PathBuf>,
    extension: &str,
    is_drive: bool,
    session: BootSessionData,
) -> Result<BootParameters, BootError> {
    if let Some(volume) = create_disc(&path) {
        info!("Recognized disc {}", volume.game_id(Partition::NONE));
        let disc = Disc {
            path,
            volume,
            auto_disc_change_paths,
        };
        return Ok(BootParameters::new(BootDescriptor::Disc(disc), session));
    }

    let reader: Option<Box<dyn BootExecutableReader>> = match extension {
        ".elf" => Some(Box::new(ElfReader::from_file(&path).unwrap_or_else(|e| {
            warn!("Could not read {}: {}", path.display(), e);
            ElfReader::new(Vec::new())
        }))),
        ".dol" => Some(Box::new(DolReader::from_file(&path).unwrap_or_else(|e| {
            warn!("Could not read {}: {}", path.display(), e);
            DolReader::new(Vec::new())
        }))),
        _ => None,
    };
    if let Some(reader) = reader {
        return Ok(BootParameters::new(
            BootDescriptor::Executable(Executable { path, reader }),
            session,
        ));
    }

    let reason = if is_drive {
        UnreadableReason::NoMedia
    } else {
        UnreadableReason::InvalidImage
    };
    Err(BootError::UnreadableImage { path, reason })
}

fn classify_mod_descriptor(path: &Path, session: BootSessionData) -> Result<BootParameters, BootError> {
    let descriptor = parse_game_mod_descriptor_file(path).map_err(|e| BootError::PatchDescriptorInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let params = match BootParameters::generate_from_file(descriptor.base_file.clone(), session) {
        Ok(params) => params,
        Err(e) => {
            warn!("Base file of {} failed to classify: {}", path.display(), e);
            return Err(BootError::UnrecognizedFormat(descriptor.base_file));
        }
    };

    let Some(data) = &descriptor.patches else {
        return Ok(params);
    };
    let BootDescriptor::Disc(disc) = &params.parameters else {
        debug!("Ignoring mod patches for a non-disc base file");
        return Ok(params);
    };

    let game_partition = disc.volume.game_partition();
    let patches = generate_patches(
        data,
        path,
        &disc.volume.game_id(game_partition),
        disc.volume.revision(game_partition),
        disc.volume.disc_number(game_partition),
    )
    .map_err(|e| BootError::PatchDescriptorInvalid {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    add_mod_patches(params, patches)
}

/// Layer `patches` over the disc of a boot request
///
/// Requests that are not discs, and empty patch lists, are returned unchanged. A disc whose
/// file system cannot be rebuilt fails the request.
pub fn add_mod_patches(params: BootParameters, patches: Vec<Patch>) -> Result<BootParameters, BootError> {
    if patches.is_empty() {
        return Ok(params);
    }

    let parameters = match params.parameters {
        BootDescriptor::Disc(disc) => BootDescriptor::Disc(layer_patches(disc, &patches)?),
        other => {
            return Ok(BootParameters {
                parameters: other,
                ..params
            })
        }
    };

    info!("Attached {} mod patch set(s)", patches.len());
    Ok(BootParameters {
        parameters,
        session: params.session,
        patches,
    })
}

fn layer_patches(disc: Disc, patches: &[Patch]) -> Result<Disc, BootError> {
    let layout = PatchedLayout::build(disc.volume.as_ref(), |fst, dol| {
        apply_patches_to_files(patches, fst, dol)
    })
    .map_err(|e| {
        warn!("Could not rebuild {} with mod patches: {}", disc.path.display(), e);
        BootError::DiscMountFailed(disc.path.clone())
    })?;
    Ok(Disc {
        volume: Box::new(PatchedVolume::new(disc.volume, layout)),
        ..disc
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.iso");
        let err = BootParameters::generate_from_file(&path, BootSessionData::default()).unwrap_err();
        assert!(matches!(err, BootError::NotFound(p) if p == path));
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();
        let err = BootParameters::generate_from_file(&path, BootSessionData::default()).unwrap_err();
        assert_eq!(err.to_string(), format!("Could not recognize file {}", path.display()));
    }

    #[test]
    fn test_invalid_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.iso");
        std::fs::write(&path, vec![0u8; 0x1000]).unwrap();
        let err = BootParameters::generate_from_file(&path, BootSessionData::default()).unwrap_err();
        assert!(matches!(
            err,
            BootError::UnreadableImage { reason: UnreadableReason::InvalidImage, .. }
        ));
    }

    #[test]
    fn test_invalid_dol_is_still_an_executable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.dol");
        std::fs::write(&path, vec![0xFFu8; 0x40]).unwrap();
        let params = BootParameters::generate_from_file(&path, BootSessionData::default()).unwrap();
        match params.parameters {
            BootDescriptor::Executable(exe) => assert!(!exe.reader.is_valid()),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_dff_and_bad_wad() {
        let dir = tempfile::tempdir().unwrap();
        let dff = dir.path().join("capture.dff");
        let wad = dir.path().join("broken.wad");
        std::fs::write(&dff, b"").unwrap();
        std::fs::write(&wad, vec![0u8; 0x10]).unwrap();

        let params = BootParameters::generate_from_file(&dff, BootSessionData::default()).unwrap();
        assert!(matches!(params.parameters, BootDescriptor::Dff(Dff { path }) if path == dff));

        let err = BootParameters::generate_from_file(&wad, BootSessionData::default()).unwrap_err();
        assert!(matches!(err, BootError::UnrecognizedFormat(p) if p == wad));
    }

    #[test]
    fn test_playlist_with_missing_entry() {
        let dir = tempfile::tempdir().unwrap();
        let m3u = dir.path().join("set.m3u");
        std::fs::write(dir.path().join("a.iso"), b"").unwrap();
        std::fs::write(&m3u, "a.iso\nb.iso\n").unwrap();

        let err = BootParameters::generate_from_file(&m3u, BootSessionData::default()).unwrap_err();
        match err {
            BootError::PlaylistMissingEntries { missing, .. } => {
                assert_eq!(missing, vec![dir.path().join("b.iso")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_with_missing_base() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("mod.json");
        std::fs::write(
            &json,
            r#"{"type": "game-mod-descriptor", "version": 1, "base-file": "absent.iso"}"#,
        )
        .unwrap();

        let err = BootParameters::generate_from_file(&json, BootSessionData::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Could not recognize file {}", dir.path().join("absent.iso").display())
        );
    }

    #[test]
    fn test_invalid_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("mod.json");
        std::fs::write(&json, "{not json").unwrap();

        let err = BootParameters::generate_from_file(&json, BootSessionData::default()).unwrap_err();
        assert!(matches!(err, BootError::PatchDescriptorInvalid { path, .. } if path == json));
    }

    #[test]
    fn test_empty_patch_list_is_a_no_op() {
        let params = BootParameters::new(
            BootDescriptor::Dff(Dff {
                path: PathBuf::from("capture.dff"),
            }),
            BootSessionData::default(),
        );
        let params = add_mod_patches(params, Vec::new()).unwrap();
        assert!(params.patches.is_empty());

        let params = add_mod_patches(params, vec![Patch::default()]).unwrap();
        assert!(params.patches.is_empty());
        assert!(matches!(params.parameters, BootDescriptor::Dff(_)));
    }
}
