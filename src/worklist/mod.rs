//! Work list construction
//!
//! A work list is the ordered set of files one batch uploads. It is built
//! either by walking a local directory or by reading a newline-delimited
//! list of relative paths from a file or standard input.

use crate::destination::Destination;
use crate::temp_file::PendingFile;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

mod shuffle;

/// Enumeration errors
#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("walk({root}): not a directory")]
    NotADirectory { root: PathBuf },

    #[error("walk({root}): {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("open list file {path}: {source}")]
    OpenList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan list file: {0}")]
    ReadList(#[source] io::Error),

    #[error("write list file {path}: {source}")]
    WriteList {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Where a list of relative paths is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    Stdin,
    File(PathBuf),
}

impl ListSource {
    /// `-` means standard input.
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            ListSource::Stdin
        } else {
            ListSource::File(PathBuf::from(arg))
        }
    }
}

/// One file to transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Path opened for reading
    pub local: PathBuf,
    /// Slash-normalized path relative to the source root
    pub relative: String,
    /// Destination object key
    pub key: String,
}

/// A listed file: the path as found on disk and its key form
#[derive(Debug, Clone, PartialEq, Eq)]
struct Entry {
    source: PathBuf,
    relative: String,
}

impl Entry {
    fn new(source: PathBuf) -> Self {
        let relative = normalize_path(&source.to_string_lossy());
        Self { source, relative }
    }
}

/// Ordered files for one batch
#[derive(Debug, Clone, Default)]
pub struct WorkList {
    root: PathBuf,
    entries: Vec<Entry>,
}

impl WorkList {
    /// Paths resolved against `root` exactly as given
    pub fn new(root: impl Into<PathBuf>, paths: Vec<String>) -> Self {
        Self {
            root: root.into(),
            entries: paths.into_iter().map(|p| Entry::new(PathBuf::from(p))).collect(),
        }
    }

    /// Enumerate every regular file under `root`.
    ///
    /// Entries are visited in file-name order. Directories and anything
    /// that does not resolve to a regular file are skipped.
    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self, EnumerationError> {
        let root = root.as_ref();
        if let Ok(meta) = fs::metadata(root) {
            if !meta.is_dir() {
                return Err(EnumerationError::NotADirectory {
                    root: root.to_path_buf(),
                });
            }
        }

        let mut entries = Vec::new();
        for entry in WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|source| EnumerationError::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            if relative.as_os_str().is_empty() {
                continue;
            }
            if relative.to_str().is_none() {
                tracing::warn!(
                    path = %entry.path().display(),
                    "File name is not valid UTF-8, key uses a lossy form"
                );
            }
            entries.push(Entry::new(relative.to_path_buf()));
        }

        tracing::debug!(root = %root.display(), files = entries.len(), "Enumerated source directory");

        Ok(Self {
            root: root.to_path_buf(),
            entries,
        })
    }

    /// Read a list file. Paths resolve against the working directory.
    pub fn from_list_source(source: &ListSource) -> Result<Self, EnumerationError> {
        match source {
            ListSource::Stdin => Self::from_reader(io::stdin().lock()),
            ListSource::File(path) => {
                let file = File::open(path).map_err(|source| EnumerationError::OpenList {
                    path: path.clone(),
                    source,
                })?;
                Self::from_reader(BufReader::new(file))
            }
        }
    }

    /// Parse newline-delimited paths.
    ///
    /// Blank lines are ignored and a trailing `\r` is dropped. Each line is
    /// opened as written; only its key form is normalized.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, EnumerationError> {
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(EnumerationError::ReadList)?;
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            entries.push(Entry::new(PathBuf::from(line)));
        }
        Ok(Self {
            root: PathBuf::new(),
            entries,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Slash-normalized paths in list order
    pub fn paths(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.relative.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Work items in list order, keyed under `destination`.
    pub fn items<'a>(&'a self, destination: &'a Destination) -> impl Iterator<Item = WorkItem> + 'a {
        self.entries.iter().map(move |entry| WorkItem {
            local: self.root.join(&entry.source),
            relative: entry.relative.clone(),
            key: destination.object_key(&entry.relative),
        })
    }

    /// Write the list in list-file format, replacing `path` atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EnumerationError> {
        let path = path.as_ref();
        let write_err = |source| EnumerationError::WriteList {
            path: path.to_path_buf(),
            source,
        };

        let mut pending = PendingFile::create(path).map_err(write_err)?;
        for entry in &self.entries {
            writeln!(pending.writer(), "{}", entry.source.display()).map_err(write_err)?;
        }
        pending.commit().map_err(write_err)?;
        Ok(())
    }
}

/// Forward-slash form of a relative path.
///
/// Backslashes become `/`, and leading `./` or `/` components are dropped.
pub fn normalize_path(path: &str) -> String {
    let mut normalized = path.replace('\\', "/");
    loop {
        if let Some(rest) = normalized.strip_prefix("./") {
            normalized = rest.to_string();
        } else if let Some(rest) = normalized.strip_prefix('/') {
            normalized = rest.to_string();
        } else {
            break;
        }
    }
    normalized
}
