//! Safe unpacking of fetched zip archives.
//!
//! Entry names are resolved lexically against the destination directory and
//! any entry landing outside it aborts the extraction before anything is
//! written for that entry. Permission bits stored in the archive are not
//! applied; files are created with the process defaults.

use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::ExtractError;
use crate::fetch::FetchedArchive;

const S_IFMT: u32 = 0o170000;
const S_IFDIR: u32 = 0o040000;
const S_IFLNK: u32 = 0o120000;

/// Default cap on the total decompressed size of one archive
pub const DEFAULT_MAX_EXTRACTED_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Unpacked archive: the single top-level directory inside the destination
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTree {
    root: PathBuf,
}

impl ExtractedTree {
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Unpack a fetched archive into `dest_dir`, consuming the archive bytes
pub fn extract_archive(
    archive: FetchedArchive,
    dest_dir: &Path,
    max_bytes: u64,
) -> Result<ExtractedTree, ExtractError> {
    debug!(url = %archive.url, dest = %dest_dir.display(), "extracting archive");
    extract_zip(&archive.bytes, dest_dir, max_bytes)
}

/// Unpack zip bytes into `dest_dir` and locate the archive's root folder.
///
/// Fails with `TooLarge` once more than `max_bytes` have been decompressed.
pub fn extract_zip(bytes: &[u8], dest_dir: &Path, max_bytes: u64) -> Result<ExtractedTree, ExtractError> {
    fs::create_dir_all(dest_dir).map_err(|source| io_error(dest_dir, source))?;

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut remaining = max_bytes;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        let entry_mode = entry.unix_mode();
        let is_dir = entry.is_dir() || has_file_type(entry_mode, S_IFDIR);

        let Some(relative) = contained_path(&name)? else {
            // Entry resolves to the destination itself
            if is_dir {
                continue;
            }
            return Err(ExtractError::PathTraversal { entry: name });
        };
        let out_path = dest_dir.join(&relative);

        if is_dir {
            fs::create_dir_all(&out_path).map_err(|source| io_error(&out_path, source))?;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|source| io_error(parent, source))?;
        }

        let mut limited = (&mut entry).take(remaining.saturating_add(1));

        if has_file_type(entry_mode, S_IFLNK) {
            // Links are materialised as plain files holding the target text,
            // and only when the target stays inside the destination.
            let mut target = String::new();
            limited
                .read_to_string(&mut target)
                .map_err(|source| io_error(&out_path, source))?;
            remaining = consume(remaining, target.len() as u64, max_bytes)?;
            let link_base = relative.parent().unwrap_or_else(|| Path::new(""));
            if contained_path(&link_base.join(&target).to_string_lossy())?.is_none() {
                return Err(ExtractError::PathTraversal { entry: name });
            }
            fs::write(&out_path, target.as_bytes()).map_err(|source| io_error(&out_path, source))?;
            continue;
        }

        let mut out_file = File::create(&out_path).map_err(|source| io_error(&out_path, source))?;
        let written = io::copy(&mut limited, &mut out_file).map_err(|source| io_error(&out_path, source))?;
        remaining = consume(remaining, written, max_bytes)?;
    }

    find_root_dir(dest_dir)
}

fn consume(remaining: u64, used: u64, limit: u64) -> Result<u64, ExtractError> {
    remaining
        .checked_sub(used)
        .ok_or(ExtractError::TooLarge { limit })
}

/// Resolve an archive entry name to a path relative to the destination.
///
/// Returns `Ok(None)` when the name resolves to the destination itself and
/// `PathTraversal` when it would land outside it.
fn contained_path(name: &str) -> Result<Option<PathBuf>, ExtractError> {
    let traversal = || ExtractError::PathTraversal {
        entry: name.to_string(),
    };

    if name.contains('\0') {
        return Err(traversal());
    }

    // Zip archives written on Windows may use backslashes as separators
    let normalized = name.replace('\\', "/");

    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if parts.pop().is_none() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }

    if parts.is_empty() {
        return Ok(None);
    }
    Ok(Some(parts.iter().collect()))
}

fn has_file_type(mode: Option<u32>, file_type: u32) -> bool {
    mode.is_some_and(|mode| mode & S_IFMT == file_type)
}

/// Find the single top-level directory of the extracted archive
fn find_root_dir(dest_dir: &Path) -> Result<ExtractedTree, ExtractError> {
    let entries = fs::read_dir(dest_dir)
        .map_err(|source| io_error(dest_dir, source))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| io_error(dest_dir, source))?;

    match entries.as_slice() {
        [entry] => {
            let file_type = entry.file_type().map_err(|source| io_error(&entry.path(), source))?;
            if !file_type.is_dir() {
                return Err(ExtractError::Structure(format!(
                    "top-level entry {} is not a directory",
                    entry.file_name().to_string_lossy()
                )));
            }
            Ok(ExtractedTree { root: entry.path() })
        }
        [] => Err(ExtractError::Structure("archive is empty".to_string())),
        _ => Err(ExtractError::Structure(format!(
            "expected one top-level directory, found {} entries",
            entries.len()
        ))),
    }
}

fn io_error(path: &Path, source: io::Error) -> ExtractError {
    ExtractError::Io {
        path: path.to_path_buf(),
        source,
    }
}
