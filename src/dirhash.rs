//! Directory content hashing (`h1:` scheme).
//!
//! For every regular file a line `"<sha256 hex>  <prefix>/<relative path>\n"`
//! is produced. Lines are ordered by file name, concatenated and hashed again
//! with SHA-256; the result is base64 encoded and tagged `h1:`.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sha2::{Digest as _, Sha256};
use walkdir::WalkDir;

use crate::error::HashError;

/// Algorithm tag of the tree-hash scheme
pub const HASH1_TAG: &str = "h1";

/// A tagged content digest, `"<tag>:<base64>"`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(String);

impl Digest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact textual comparison against a manifest checksum
    pub fn matches(&self, expected: &str) -> bool {
        self.0 == expected
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

/// Hash every regular file under `root`, naming each `<prefix>/<relative path>`
pub fn hash_dir(root: &Path, prefix: &str) -> Result<Digest, HashError> {
    let files = dir_files(root, prefix)?;
    hash_files(files)
}

/// List regular files under `root` as `(name, path on disk)` pairs.
/// Names always use `/` separators.
pub fn dir_files(root: &Path, prefix: &str) -> Result<Vec<(String, PathBuf)>, HashError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|source| HashError::Walk {
            root: root.to_path_buf(),
            source,
        })?;

        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            return Err(HashError::NotRegular {
                path: entry.into_path(),
            });
        }

        // WalkDir yields paths rooted at `root`
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        files.push((format!("{}/{}", prefix, relative.join("/")), entry.into_path()));
    }

    Ok(files)
}

/// Compute the `h1:` digest over named files
pub fn hash_files(mut files: Vec<(String, PathBuf)>) -> Result<Digest, HashError> {
    files.sort_by(|a, b| a.0.cmp(&b.0));

    let mut summary = Sha256::new();
    for (name, path) in &files {
        if name.contains('\n') {
            return Err(HashError::InvalidName(name.clone()));
        }
        let file_hash = hash_file(path)?;
        summary.update(format!("{}  {}\n", file_hash, name).as_bytes());
    }

    Ok(Digest(format!("{}:{}", HASH1_TAG, STANDARD.encode(summary.finalize()))))
}

/// Hex-encoded SHA-256 of a file's contents
fn hash_file(path: &Path) -> Result<String, HashError> {
    let io_error = |source| HashError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_error)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).map_err(io_error)?;
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;
    use sha2::Digest as _;
    use std::fs;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub/deeper")).unwrap();
        fs::write(temp_dir.path().join("go.mod"), "module example.com/pkg\n").unwrap();
        fs::write(temp_dir.path().join("sub/b.go"), "package sub\n").unwrap();
        fs::write(temp_dir.path().join("sub/deeper/c.txt"), "deep").unwrap();
        temp_dir
    }

    #[test]
    fn test_known_digest() {
        // Single empty file: sha256("") followed by the name, hashed again
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("empty"), "").unwrap();

        let line = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855  m@v1/empty\n";
        let expected = format!("h1:{}", STANDARD.encode(Sha256::digest(line.as_bytes())));

        let digest = hash_dir(temp_dir.path(), "m@v1").unwrap();
        assert_eq!(digest.as_str(), expected);
        assert!(digest.matches(&expected));
    }

    #[test]
    fn test_lines_ordered_by_file_name() {
        // Name order (B, a.txt, b.txt, sub/c) differs from content-hash order,
        // so sorting whole lines would give h1:hv2cMAHbryKsdw1WUSHHXu9cXJx7X1+EjZWwSFDYB1k=
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("a.txt"), "zzz").unwrap();
        fs::write(temp_dir.path().join("b.txt"), "aaa").unwrap();
        fs::write(temp_dir.path().join("sub/c"), "q").unwrap();
        fs::write(temp_dir.path().join("B"), "").unwrap();

        let digest = hash_dir(temp_dir.path(), "m@v1").unwrap();
        assert_eq!(digest.as_str(), "h1:NO64Ul9Rs+CQfve2xNlQhZ4Ix2OP01fFKA+iGu8msVU=");
    }

    #[test]
    fn test_deterministic_across_runs() {
        let tree = sample_tree();
        let first = hash_dir(tree.path(), "example.com/pkg@v1.0.0").unwrap();
        let second = hash_dir(tree.path(), "example.com/pkg@v1.0.0").unwrap();
        assert_eq!(first, second);
        assert!(first.as_str().starts_with("h1:"));
    }

    #[test]
    fn test_order_independent() {
        let tree = sample_tree();
        let mut files = dir_files(tree.path(), "p@v").unwrap();
        let forward = hash_files(files.clone()).unwrap();
        files.reverse();
        let reversed = hash_files(files).unwrap();
        assert_eq!(forward, reversed);
    }

    #[test]
    fn test_single_byte_change_detected() {
        let tree = sample_tree();
        let before = hash_dir(tree.path(), "p@v").unwrap();
        fs::write(tree.path().join("sub/deeper/c.txt"), "deeP").unwrap();
        let after = hash_dir(tree.path(), "p@v").unwrap();
        assert_ne!(before, after);
    }

    #[test]
    fn test_prefix_and_rename_change_digest() {
        let tree = sample_tree();
        let base = hash_dir(tree.path(), "p@v1").unwrap();
        assert_ne!(base, hash_dir(tree.path(), "p@v2").unwrap());

        fs::rename(tree.path().join("go.mod"), tree.path().join("go.mod2")).unwrap();
        assert_ne!(base, hash_dir(tree.path(), "p@v1").unwrap());
    }

    #[test]
    fn test_names_use_forward_slashes() {
        let tree = sample_tree();
        let mut names: Vec<String> = dir_files(tree.path(), "p@v")
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["p@v/go.mod", "p@v/sub/b.go", "p@v/sub/deeper/c.txt"]);
    }

    #[test]
    fn test_unreadable_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let files = vec![("p@v/missing".to_string(), temp_dir.path().join("missing"))];
        assert!(matches!(hash_files(files), Err(HashError::Io { .. })));
    }

    #[test]
    fn test_newline_in_name_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("f");
        fs::write(&path, "x").unwrap();
        let files = vec![("p@v/bad\nname".to_string(), path)];
        assert!(matches!(hash_files(files), Err(HashError::InvalidName(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_is_error() {
        let tree = sample_tree();
        std::os::unix::fs::symlink("go.mod", tree.path().join("link")).unwrap();
        assert!(matches!(
            hash_dir(tree.path(), "p@v"),
            Err(HashError::NotRegular { .. })
        ));
    }
}
