//! Host optical drives and content URIs

use std::path::Path;

const CONTENT_URI_PREFIX: &str = "content://";

/// Whether `path` names a raw optical drive rather than an image file
pub fn is_cdrom_device(path: &Path) -> bool {
    let text = path.to_string_lossy();
    if text.starts_with("/dev/sr") || text.starts_with("/dev/cdrom") {
        return true;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if let Ok(metadata) = std::fs::metadata(path) {
            return metadata.file_type().is_block_device();
        }
    }
    false
}

pub fn is_content_uri(path: &str) -> bool {
    path.starts_with(CONTENT_URI_PREFIX)
}

/// Decode `%XX` escapes; malformed escapes are kept as written
pub fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(decoded) = hex::decode(&bytes[i + 1..i + 3]) {
                out.push(decoded[0]);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).to_string()
}

/// File name a content URI refers to: the last decoded path segment
pub fn content_uri_display_name(uri: &str) -> Option<String> {
    let rest = uri.strip_prefix(CONTENT_URI_PREFIX)?;
    let last = rest.rsplit('/').next()?;
    let decoded = percent_decode(last);
    // document ids look like "primary:Games/disc.iso"
    let name = decoded.rsplit(['/', ':']).next()?.to_string();
    (!name.is_empty()).then_some(name)
}

/// Lowercase extension with a leading dot, or an empty string
pub fn extension_of(path: &Path) -> String {
    let text = path.to_string_lossy();
    if is_content_uri(&text) {
        if let Some(name) = content_uri_display_name(&text) {
            return extension_of(Path::new(&name));
        }
    }
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_paths() {
        assert!(is_cdrom_device(Path::new("/dev/sr0")));
        assert!(is_cdrom_device(Path::new("/dev/cdrom")));
        assert!(!is_cdrom_device(Path::new("/games/game.iso")));

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(!is_cdrom_device(file.path()));
    }

    #[test]
    fn test_percent_decode() {
        assert_eq!(percent_decode("Super%20Game%2Eiso"), "Super Game.iso");
        assert_eq!(percent_decode("100%"), "100%");
        assert_eq!(percent_decode("%zz"), "%zz");
    }

    #[test]
    fn test_content_uri_name() {
        let uri = "content://com.android.externalstorage.documents/document/primary%3AGames%2FMetroid.RVZ";
        assert_eq!(content_uri_display_name(uri).as_deref(), Some("Metroid.RVZ"));
        assert_eq!(extension_of(Path::new(uri)), ".rvz");
        assert_eq!(content_uri_display_name("/not/a/uri"), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Path::new("/games/Game.ISO")), ".iso");
        assert_eq!(extension_of(Path::new("/games/set.m3u8")), ".m3u8");
        assert_eq!(extension_of(Path::new("/games/noext")), "");
    }
}
