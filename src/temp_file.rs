//! Atomically replaced output files
//!
//! Writes go to a uniquely named sibling of the target. [`PendingFile::commit`]
//! renames it into place; dropping an uncommitted file removes it, so a
//! failed write never leaves a truncated list or metrics file behind.
//!
//! # Example
//!
//! ```no_run
//! use bulk_uploadr::temp_file::PendingFile;
//! use std::io::Write;
//!
//! # fn main() -> std::io::Result<()> {
//! let mut pending = PendingFile::create("uploads.list")?;
//! writeln!(pending.writer(), "a.txt")?;
//! pending.commit()?;
//! # Ok(())
//! # }
//! ```

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output file that only becomes visible on commit
///
/// Automatically cleaned up when dropped uncommitted (RAII pattern).
pub struct PendingFile {
    temp_path: PathBuf,
    target: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl PendingFile {
    /// Create a temp file next to `target`
    pub fn create<P: AsRef<Path>>(target: P) -> io::Result<Self> {
        let target = target.as_ref().to_path_buf();
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        let temp_name = format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4());
        let temp_path = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(temp_name),
            _ => PathBuf::from(temp_name),
        };

        let file = File::create(&temp_path)?;

        Ok(Self {
            temp_path,
            target,
            writer: Some(BufWriter::new(file)),
        })
    }

    /// Path of the uncommitted temp file
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn writer(&mut self) -> &mut BufWriter<File> {
        self.writer
            .as_mut()
            .expect("writer is present until commit")
    }

    /// Flush, sync and rename over the target.
    pub fn commit(mut self) -> io::Result<PathBuf> {
        if let Some(writer) = self.writer.take() {
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&self.temp_path, &self.target)?;
        Ok(self.target.clone())
    }
}

impl Drop for PendingFile {
    fn drop(&mut self) {
        // Committed files were renamed away; anything left is a failed write.
        self.writer.take();
        if self.temp_path.exists() {
            if let Err(e) = fs::remove_file(&self.temp_path) {
                tracing::warn!(
                    path = %self.temp_path.display(),
                    error = %e,
                    "Failed to clean up temp file"
                );
            }
        }
    }
}
