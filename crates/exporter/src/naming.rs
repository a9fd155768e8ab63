//! Output naming
//!
//! Exports go either to an explicit path, whose extension picks the format,
//! or to the export folder under a name drawn from a persisted counter.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use contracts::MeshFormat;
use tracing::debug;

use crate::error::{ExportError, Result};

/// File name prefix for counter-named exports
pub const FILE_PREFIX: &str = "mesh";

/// Where an export is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportDestination {
    /// Next counter name in the export folder
    Counter(MeshFormat),
    /// Explicit path; the extension selects the format
    Path(PathBuf),
}

impl ExportDestination {
    /// Format this destination will be written in
    ///
    /// # Errors
    /// `UnrecognizedExportFormat` for a path without a known extension.
    pub fn format(&self) -> Result<MeshFormat> {
        match self {
            Self::Counter(format) => Ok(*format),
            Self::Path(path) => {
                let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
                Ok(MeshFormat::from_extension(ext)?)
            }
        }
    }
}

/// Persistent export counter
///
/// The file holds the next unused number. A missing file counts as 0.
#[derive(Debug)]
pub struct ExportCounter {
    directory: PathBuf,
    counter_path: PathBuf,
    lock: Mutex<()>,
}

impl ExportCounter {
    pub fn new(directory: impl Into<PathBuf>, counter_file: &str) -> Self {
        let directory = directory.into();
        let counter_path = directory.join(counter_file);
        Self {
            directory,
            counter_path,
            lock: Mutex::new(()),
        }
    }

    /// Export folder
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Value the next export will use, without consuming it
    pub fn peek(&self) -> Result<u64> {
        self.read_value()
    }

    /// Path the next export in `format` would get, without reserving it
    ///
    /// Existing files are not probed, so [`next_path`](Self::next_path) may
    /// still skip past this name.
    pub fn peek_path(&self, format: MeshFormat) -> Result<PathBuf> {
        Ok(self.path_for(self.read_value()?, format))
    }

    /// Reserve the next number and return the path for `format`
    ///
    /// Read and increment happen under one lock, so no two calls in this
    /// process get the same number. Numbers whose file already exists are
    /// skipped.
    pub fn next_path(&self, format: MeshFormat) -> Result<PathBuf> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        fs::create_dir_all(&self.directory)?;
        let mut value = self.read_value()?;
        let mut path = self.path_for(value, format);
        while path.exists() {
            value += 1;
            path = self.path_for(value, format);
        }

        fs::write(&self.counter_path, format!("{}\n", value + 1))?;
        debug!(counter = value, path = %path.display(), "reserved export name");
        Ok(path)
    }

    fn path_for(&self, value: u64, format: MeshFormat) -> PathBuf {
        self.directory
            .join(format!("{FILE_PREFIX}_{value:04}.{}", format.extension()))
    }

    fn read_value(&self) -> Result<u64> {
        match fs::read_to_string(&self.counter_path) {
            Ok(content) => content
                .trim()
                .parse()
                .map_err(|_| ExportError::CorruptCounter {
                    path: self.counter_path.display().to_string(),
                    content,
                }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;
    use std::collections::HashSet;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn test_missing_counter_starts_at_zero() {
        let dir = tempdir().unwrap();
        let counter = ExportCounter::new(dir.path().join("exports"), "counter.txt");

        assert_eq!(counter.peek().unwrap(), 0);
        let path = counter.next_path(MeshFormat::Stl).unwrap();
        assert_eq!(path.file_name().unwrap(), "mesh_0000.stl");
        assert_eq!(counter.peek().unwrap(), 1);
        assert_eq!(
            fs::read_to_string(dir.path().join("exports/counter.txt")).unwrap(),
            "1\n"
        );
    }

    #[test]
    fn test_counter_persists_across_instances() {
        let dir = tempdir().unwrap();
        ExportCounter::new(dir.path(), "c.txt")
            .next_path(MeshFormat::Obj)
            .unwrap();
        let second = ExportCounter::new(dir.path(), "c.txt")
            .next_path(MeshFormat::Ply)
            .unwrap();
        assert_eq!(second.file_name().unwrap(), "mesh_0001.ply");
    }

    #[test]
    fn test_existing_files_are_skipped() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("mesh_0000.stl"), b"taken").unwrap();
        let counter = ExportCounter::new(dir.path(), "c.txt");
        let path = counter.next_path(MeshFormat::Stl).unwrap();
        assert_eq!(path.file_name().unwrap(), "mesh_0001.stl");
        assert_eq!(counter.peek().unwrap(), 2);
    }

    #[test]
    fn test_concurrent_reservations_are_unique() {
        let dir = tempdir().unwrap();
        let counter = Arc::new(ExportCounter::new(dir.path(), "c.txt"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = counter.clone();
                std::thread::spawn(move || counter.next_path(MeshFormat::Stl).unwrap())
            })
            .collect();
        let paths: HashSet<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(paths.len(), 8);
        assert_eq!(counter.peek().unwrap(), 8);
    }

    #[test]
    fn test_corrupt_counter() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("c.txt"), "seven").unwrap();
        let counter = ExportCounter::new(dir.path(), "c.txt");
        assert!(matches!(
            counter.next_path(MeshFormat::Stl),
            Err(ExportError::CorruptCounter { .. })
        ));
    }

    #[test]
    fn test_destination_format() {
        assert_eq!(
            ExportDestination::Path("scan.PLY".into()).format().unwrap(),
            MeshFormat::Ply
        );
        assert!(matches!(
            ExportDestination::Path("scan.fbx".into()).format(),
            Err(ExportError::Contract(ContractError::UnrecognizedExportFormat { .. }))
        ));
    }
}
