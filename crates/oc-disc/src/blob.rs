//! Raw byte sources behind a disc volume

use oc_core::error::DiscError;
use parking_lot::Mutex;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::warn;

/// Random-access byte source
pub trait BlobReader: Send + Sync {
    /// Size of the decoded data
    fn size(&self) -> u64;

    /// Fill `buf` from `offset`
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), DiscError>;
}

/// Container formats that need a decoder this crate does not provide
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedFormat {
    Gcz,
    Ciso,
    Wbfs,
    Wia,
    Rvz,
}

impl CompressedFormat {
    /// Identify a container from its first bytes
    pub fn detect(magic: &[u8; 4]) -> Option<Self> {
        match magic {
            [0x01, 0xC0, 0x0B, 0xB1] => Some(Self::Gcz),
            b"CISO" => Some(Self::Ciso),
            b"WBFS" => Some(Self::Wbfs),
            b"WIA\x01" => Some(Self::Wia),
            b"RVZ\x01" => Some(Self::Rvz),
            _ => None,
        }
    }
}

/// An uncompressed image (or a raw optical drive)
pub struct PlainFileReader {
    file: Mutex<File>,
    size: u64,
}

impl PlainFileReader {
    pub fn open(path: &Path) -> Result<Self, DiscError> {
        let mut file = File::open(path)?;
        let size = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl BlobReader for PlainFileReader {
    fn size(&self) -> u64 {
        self.size
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), DiscError> {
        if offset + buf.len() as u64 > self.size {
            return Err(DiscError::ReadOutOfBounds {
                offset,
                length: buf.len() as u64,
            });
        }
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }
}

/// In-memory image, used for generated content
pub struct MemoryBlobReader {
    data: Vec<u8>,
}

impl MemoryBlobReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl BlobReader for MemoryBlobReader {
    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<(), DiscError> {
        let start = offset as usize;
        let src = self
            .data
            .get(start..start + buf.len())
            .ok_or(DiscError::ReadOutOfBounds {
                offset,
                length: buf.len() as u64,
            })?;
        buf.copy_from_slice(src);
        Ok(())
    }
}

/// Open an image file, returning `None` if it cannot be read as a plain image
pub fn create_blob_reader(path: &Path) -> Option<Box<dyn BlobReader>> {
    let reader = PlainFileReader::open(path).ok()?;
    let mut magic = [0u8; 4];
    if reader.read(0, &mut magic).is_ok() {
        if let Some(format) = CompressedFormat::detect(&magic) {
            warn!(
                "{} is a {:?} container, which needs an external decoder",
                path.display(),
                format
            );
            return None;
        }
    }
    Some(Box::new(reader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_plain_reader() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        file.flush().unwrap();

        let reader = create_blob_reader(file.path()).unwrap();
        assert_eq!(reader.size(), 8);
        let mut buf = [0u8; 3];
        reader.read(4, &mut buf).unwrap();
        assert_eq!(buf, [5, 6, 7]);
        assert!(matches!(
            reader.read(6, &mut buf),
            Err(DiscError::ReadOutOfBounds { offset: 6, length: 3 })
        ));
    }

    #[test]
    fn test_compressed_containers_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"RVZ\x01 and then some").unwrap();
        file.flush().unwrap();
        assert!(create_blob_reader(file.path()).is_none());
        assert_eq!(CompressedFormat::detect(b"WBFS"), Some(CompressedFormat::Wbfs));
        assert_eq!(CompressedFormat::detect(b"\0\0\0\0"), None);
    }

    #[test]
    fn test_missing_file() {
        assert!(create_blob_reader(Path::new("/nonexistent/game.iso")).is_none());
    }
}
