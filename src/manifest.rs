use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::ManifestError;

/// Suffix on the version field marking a declaration-file (`go.mod`) checksum
pub const DECLARATION_SUFFIX: &str = "/go.mod";

/// Name of the checksum manifest inside a project directory
pub const MANIFEST_FILE_NAME: &str = "go.sum";

/// What a manifest record's digest covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// The full source archive of the module
    ContentArchive,
    /// Only the module's declaration file
    DeclarationFile,
}

/// One line of the checksum manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    /// Module path, e.g. `github.com/owner/repo`
    pub module_path: String,
    /// Version tag with any declaration suffix removed
    pub version: String,
    /// Tagged checksum, e.g. `h1:...`
    pub expected_digest: String,
    pub target_kind: TargetKind,
}

impl VerificationRecord {
    /// `path@version`, the key used for reporting and as the hash prefix
    pub fn module_id(&self) -> String {
        format!("{}@{}", self.module_path, self.version)
    }

    pub fn is_content_archive(&self) -> bool {
        self.target_kind == TargetKind::ContentArchive
    }

    /// Parse a single manifest line. Returns `None` unless the line has
    /// exactly three whitespace-separated fields.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let (path, version, digest) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() {
            return None;
        }

        let (version, target_kind) = match version.strip_suffix(DECLARATION_SUFFIX) {
            Some(stripped) => (stripped, TargetKind::DeclarationFile),
            None => (version, TargetKind::ContentArchive),
        };

        Some(VerificationRecord {
            module_path: path.to_string(),
            version: version.to_string(),
            expected_digest: digest.to_string(),
            target_kind,
        })
    }
}

impl fmt::Display for VerificationRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target_kind {
            TargetKind::ContentArchive => write!(f, "{}@{}", self.module_path, self.version),
            TargetKind::DeclarationFile => {
                write!(f, "{}@{}{}", self.module_path, self.version, DECLARATION_SUFFIX)
            }
        }
    }
}

/// Parsed checksum manifest, records kept in file order
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    records: Vec<VerificationRecord>,
}

impl Manifest {
    /// Load a manifest from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::parse(&contents))
    }

    /// Parse manifest text. Malformed lines are skipped.
    pub fn parse(text: &str) -> Self {
        let records = text
            .lines()
            .filter_map(VerificationRecord::parse_line)
            .collect();

        Manifest { records }
    }

    pub fn records(&self) -> &[VerificationRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<VerificationRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records whose digest covers the full source archive
    pub fn content_archives(&self) -> impl Iterator<Item = &VerificationRecord> {
        self.records.iter().filter(|r| r.is_content_archive())
    }
}
