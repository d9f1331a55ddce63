//! Open filesystem objects

use snapfs_core::{DirectoryListing, EntryInfo, SnapError, SnapResult};

use crate::reader::FileReader;

/// Result of opening a path
#[derive(Debug)]
pub enum Handle {
    Directory(DirectoryListing),
    File(FileReader),
}

impl Handle {
    pub fn stat(&self) -> EntryInfo {
        match self {
            Handle::Directory(dir) => dir.stat(),
            Handle::File(file) => file.stat(),
        }
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, Handle::Directory(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::Directory(dir) => dir.name(),
            Handle::File(file) => file.name(),
        }
    }

    pub fn into_file(self) -> SnapResult<FileReader> {
        match self {
            Handle::File(file) => Ok(file),
            Handle::Directory(dir) => Err(SnapError::IsADirectory(dir.name().to_string())),
        }
    }

    pub fn into_directory(self) -> SnapResult<DirectoryListing> {
        match self {
            Handle::Directory(dir) => Ok(dir),
            Handle::File(file) => Err(SnapError::NotADirectory(file.name().to_string())),
        }
    }

    /// Read at the cursor. Directories have no byte content.
    pub async fn read(&mut self, buf: &mut [u8]) -> SnapResult<usize> {
        match self {
            Handle::File(file) => file.read(buf).await,
            Handle::Directory(dir) => Err(SnapError::IsADirectory(dir.name().to_string())),
        }
    }

    pub fn read_dir(&mut self, count: usize) -> SnapResult<Option<Vec<EntryInfo>>> {
        match self {
            Handle::Directory(dir) => Ok(dir.read_dir(count)),
            Handle::File(file) => Err(SnapError::NotADirectory(file.name().to_string())),
        }
    }
}

impl From<FileReader> for Handle {
    fn from(file: FileReader) -> Self {
        Handle::File(file)
    }
}

impl From<DirectoryListing> for Handle {
    fn from(dir: DirectoryListing) -> Self {
        Handle::Directory(dir)
    }
}
