use std::path::PathBuf;
use thiserror::Error;

/// Reading the checksum manifest failed. Fatal for the whole run.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Retrieving a module archive failed.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid module path for {convention} hosting: {path}")]
    InvalidModulePath {
        convention: &'static str,
        path: String,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("failed to fetch {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to fetch {url}: HTTP {status}")]
    Status { url: String, status: u16 },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("archive at {url} exceeds the {limit} byte limit")]
    TooLarge { url: String, limit: u64 },
    #[error("no archive available for {0}")]
    NotFound(String),
}

/// Unpacking a fetched archive failed.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("archive entry escapes the destination directory: {entry}")]
    PathTraversal { entry: String },
    #[error("archive expands beyond the {limit} byte limit")]
    TooLarge { limit: u64 },
    #[error("unexpected archive structure: {0}")]
    Structure(String),
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Computing the content digest of an extracted tree failed.
#[derive(Debug, Error)]
pub enum HashError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
    #[error("not a regular file: {}", path.display())]
    NotRegular { path: PathBuf },
    #[error("file name contains a newline: {0:?}")]
    InvalidName(String),
}

/// Failure of one record's pipeline. Never affects sibling records.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("failed to extract archive: {0}")]
    Extract(#[from] ExtractError),
    #[error("failed to calculate checksum: {0}")]
    Hash(#[from] HashError),
    #[error("failed to prepare scratch directory {}: {source}", path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
