use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::ops::Deref;
use std::path::Path;
use tracing::trace;

use crate::errors::{SearchError, SearchResult};

// Files below this size are read into memory, larger ones are mapped
pub(crate) const SMALL_FILE_THRESHOLD: u64 = 32 * 1024; // 32KB
const BUFFER_CAPACITY: usize = 65536;

/// The coordinator's byte sequence, read or mapped from a file
#[derive(Debug)]
pub enum SourceBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

fn open_error(path: &Path, e: std::io::Error) -> SearchError {
    match e.kind() {
        std::io::ErrorKind::NotFound => SearchError::file_not_found(path),
        std::io::ErrorKind::PermissionDenied => SearchError::permission_denied(path),
        _ => SearchError::IoError(e),
    }
}

impl SourceBytes {
    /// Loads the file at `path`. An empty file has nothing to search and is
    /// rejected.
    pub fn open(path: &Path) -> SearchResult<Self> {
        let file = File::open(path).map_err(|e| open_error(path, e))?;
        let size = file.metadata().map_err(|e| open_error(path, e))?.len();
        if size == 0 {
            return Err(SearchError::config_error(format!(
                "{} is empty",
                path.display()
            )));
        }

        if size < SMALL_FILE_THRESHOLD {
            trace!("Reading {} ({} bytes) into memory", path.display(), size);
            let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
            let mut bytes = Vec::with_capacity(size as usize);
            reader
                .read_to_end(&mut bytes)
                .map_err(SearchError::IoError)?;
            Ok(Self::Owned(bytes))
        } else {
            trace!("Memory mapping {} ({} bytes)", path.display(), size);
            // The mapping is read-only and lives no longer than this value.
            let mmap = unsafe { Mmap::map(&file) }.map_err(SearchError::IoError)?;
            Ok(Self::Mapped(mmap))
        }
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self, Self::Mapped(_))
    }
}

impl From<Vec<u8>> for SourceBytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Owned(bytes)
    }
}

impl Deref for SourceBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Owned(bytes) => bytes.as_slice(),
            Self::Mapped(mmap) => &mmap[..],
        }
    }
}

impl AsRef<[u8]> for SourceBytes {
    fn as_ref(&self) -> &[u8] {
        &self[..]
    }
}
