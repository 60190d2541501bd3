//! Multi-disc M3U playlists

use oc_core::error::BootError;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const UTF8_BOM: &str = "\u{FEFF}";

/// Whether `extension` (lowercase, with dot) names a playlist
pub fn is_playlist_extension(extension: &str) -> bool {
    matches!(extension, ".m3u" | ".m3u8")
}

/// Read the disc paths listed in `m3u_path`, resolved against `folder`
///
/// Every entry must exist; the paths come back in file order.
pub fn read_m3u_file(m3u_path: &Path, folder: &Path) -> Result<Vec<PathBuf>, BootError> {
    let mut found = Vec::new();
    let mut missing = Vec::new();

    match File::open(m3u_path) {
        Ok(file) => {
            for line in BufReader::new(file).lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Stopped reading {}: {}", m3u_path.display(), e);
                        break;
                    }
                };
                let mut line = line.trim_end_matches('\r');
                if let Some(stripped) = line.strip_prefix(UTF8_BOM) {
                    warn!("UTF-8 BOM in file: {}", m3u_path.display());
                    line = stripped;
                }
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }

                let path = folder.join(line);
                if path.exists() {
                    found.push(path);
                } else {
                    missing.push(path);
                }
            }
        }
        Err(e) => warn!("Could not open {}: {}", m3u_path.display(), e),
    }

    if !missing.is_empty() {
        return Err(BootError::PlaylistMissingEntries {
            playlist: m3u_path.to_path_buf(),
            missing,
        });
    }
    if found.is_empty() {
        return Err(BootError::PlaylistEmpty(m3u_path.to_path_buf()));
    }

    debug!("{} lists {} discs", m3u_path.display(), found.len());
    Ok(found)
}
