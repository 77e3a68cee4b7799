//! External buffer resources.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::util::{Error, Result};

/// Loads external buffers referenced by URI.
pub trait ResourceReader {
    /// Read at most `max_len` bytes of the resource at `uri`.
    fn read_resource(&self, uri: &str, max_len: u64) -> Result<Vec<u8>>;
}

/// Stores external buffers referenced by URI.
pub trait ResourceWriter {
    fn write_resource(&self, uri: &str, data: &[u8]) -> Result<()>;
}

/// Reject URIs that could escape the document directory.
///
/// Empty URIs, absolute paths (`/`, `\`, drive letters), any `..` and any
/// URI with a scheme are refused.
pub fn validate_resource_uri(uri: &str) -> Result<()> {
    let bytes = uri.as_bytes();
    let invalid = uri.is_empty()
        || uri.contains("..")
        || uri.starts_with('/')
        || uri.starts_with('\\')
        || uri.contains("://")
        || (bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':');
    if invalid {
        return Err(Error::InvalidResourceUri(uri.to_string()));
    }
    Ok(())
}

fn map_not_found(e: std::io::Error, path: &Path) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::FileNotFound(path.to_path_buf())
    } else {
        Error::Io(e)
    }
}

/// Resolves URIs as files relative to a directory.
#[derive(Clone, Debug, Default)]
pub struct RelativeFileHandler {
    dir: PathBuf,
}

impl RelativeFileHandler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Filesystem path of `uri`, after validation.
    pub fn resolve(&self, uri: &str) -> Result<PathBuf> {
        validate_resource_uri(uri)?;
        Ok(self.dir.join(uri))
    }
}

impl ResourceReader for RelativeFileHandler {
    fn read_resource(&self, uri: &str, max_len: u64) -> Result<Vec<u8>> {
        let path = self.resolve(uri)?;
        let file = File::open(&path).map_err(|e| map_not_found(e, &path))?;
        let mut data = Vec::new();
        file.take(max_len).read_to_end(&mut data)?;
        trace!("read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }
}

impl ResourceWriter for RelativeFileHandler {
    fn write_resource(&self, uri: &str, data: &[u8]) -> Result<()> {
        let path = self.resolve(uri)?;
        fs::write(&path, data)?;
        trace!("wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_uri() {
        for ok in ["a.bin", "sub/dir/b.bin", "tile_0.bin", "x:y.bin"] {
            assert!(validate_resource_uri(ok).is_ok(), "{}", ok);
        }
        for bad in ["", "../a.bin", "sub/../../a.bin", "/etc/passwd", "\\\\server\\share", "C:\\a.bin", "c:/a.bin", "http://x/a.bin"] {
            assert!(matches!(validate_resource_uri(bad), Err(Error::InvalidResourceUri(_))), "{}", bad);
        }
    }

    #[test]
    fn test_file_handler() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let handler = RelativeFileHandler::new(dir.path());
        handler.write_resource("side.bin", &[1, 2, 3, 4, 5])?;

        assert_eq!(handler.read_resource("side.bin", 100)?, vec![1, 2, 3, 4, 5]);
        assert_eq!(handler.read_resource("side.bin", 2)?, vec![1, 2]);
        assert!(matches!(handler.read_resource("missing.bin", 10), Err(Error::FileNotFound(_))));
        assert!(matches!(handler.read_resource("../side.bin", 10), Err(Error::InvalidResourceUri(_))));
        Ok(())
    }
}
