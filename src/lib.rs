pub mod manifest;
pub mod locator;
pub mod fetch;
pub mod extract;
pub mod dirhash;
pub mod verify;
pub mod error;
pub mod config;
pub mod logging;
pub mod check;

pub use config::VerifyConfig;
pub use dirhash::{hash_dir, Digest};
pub use error::{ExtractError, FetchError, HashError, ManifestError, VerifyError};
pub use extract::{extract_archive, ExtractedTree};
pub use fetch::{ArchiveFetcher, FetchedArchive, HttpFetcher};
pub use manifest::{Manifest, TargetKind, VerificationRecord};
pub use verify::{Report, RecordOutcome, VerificationOutcome, Verifier, VerifyEvent};
