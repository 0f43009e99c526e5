use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, warn};

use crate::dirhash::{hash_dir, Digest};
use crate::error::VerifyError;
use crate::extract::{extract_archive, DEFAULT_MAX_EXTRACTED_BYTES};
use crate::fetch::ArchiveFetcher;
use crate::manifest::VerificationRecord;

/// Result of verifying one content-archive record
#[derive(Debug)]
pub enum VerificationOutcome {
    Verified,
    Mismatch { expected: String, actual: Digest },
    Error(VerifyError),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified)
    }
}

/// A record paired with its outcome
#[derive(Debug)]
pub struct RecordOutcome {
    pub record: VerificationRecord,
    pub outcome: VerificationOutcome,
}

impl fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = self.record.module_id();
        match &self.outcome {
            VerificationOutcome::Verified => write!(f, "verified {}", id),
            VerificationOutcome::Mismatch { expected, actual } => write!(
                f,
                "warning: checksum mismatch for {}:\n  expected: {}\n  actual:   {}",
                id, expected, actual
            ),
            VerificationOutcome::Error(err) => write!(f, "warning: {}: {}", id, err),
        }
    }
}

/// Outcomes in manifest order plus the records that were not verified
#[derive(Debug, Default)]
pub struct Report {
    pub outcomes: Vec<RecordOutcome>,
    /// Declaration-file records; no verification scheme is applied to them
    pub skipped: Vec<VerificationRecord>,
}

impl Report {
    pub fn verified(&self) -> usize {
        self.count(|o| matches!(o, VerificationOutcome::Verified))
    }

    pub fn mismatched(&self) -> usize {
        self.count(|o| matches!(o, VerificationOutcome::Mismatch { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, VerificationOutcome::Error(_)))
    }

    /// True when every content archive verified
    pub fn all_verified(&self) -> bool {
        self.outcomes.iter().all(|o| o.outcome.is_verified())
    }

    fn count(&self, pred: impl Fn(&VerificationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.outcome)).count()
    }
}

/// Progress notification delivered on the calling thread
#[derive(Debug, Clone, Copy)]
pub enum VerifyEvent<'a> {
    /// A worker picked up the record
    Started(&'a VerificationRecord),
    /// The record's outcome is final
    Finished(&'a RecordOutcome),
}

enum Message {
    Started(usize),
    Finished(usize, RecordOutcome),
}

/// Runs fetch, extract and hash for each record and compares digests
pub struct Verifier<F> {
    fetcher: F,
    scratch_root: PathBuf,
    jobs: usize,
    keep_extracted: bool,
    max_extracted_bytes: u64,
}

impl<F: ArchiveFetcher> Verifier<F> {
    /// Create a verifier that extracts under `scratch_root`. The caller owns
    /// the scratch root and removes it once verification is done.
    pub fn new(fetcher: F, scratch_root: &Path) -> Self {
        Verifier {
            fetcher,
            scratch_root: scratch_root.to_path_buf(),
            jobs: 1,
            keep_extracted: false,
            max_extracted_bytes: DEFAULT_MAX_EXTRACTED_BYTES,
        }
    }

    /// Number of records verified concurrently (at least one)
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Leave each record's extracted tree in the scratch root
    pub fn keep_extracted(mut self, keep: bool) -> Self {
        self.keep_extracted = keep;
        self
    }

    /// Cap on the decompressed size of each archive
    pub fn with_max_extracted_bytes(mut self, max_bytes: u64) -> Self {
        self.max_extracted_bytes = max_bytes;
        self
    }

    pub fn verify_all(&self, records: &[VerificationRecord]) -> Report {
        self.verify_all_with(records, |_| {})
    }

    /// Verify every content-archive record, calling `on_event` when a record
    /// is picked up and when it finishes. Outcomes are returned in manifest
    /// order regardless of completion order.
    pub fn verify_all_with<C>(&self, records: &[VerificationRecord], mut on_event: C) -> Report
    where
        C: FnMut(VerifyEvent<'_>),
    {
        let (work, skipped): (Vec<&VerificationRecord>, Vec<&VerificationRecord>) =
            records.iter().partition(|r| r.is_content_archive());

        let mut slots: Vec<Option<RecordOutcome>> = work.iter().map(|_| None).collect();
        let next = AtomicUsize::new(0);
        let workers = self.jobs.min(work.len());

        thread::scope(|scope| {
            let (tx, rx) = mpsc::channel();
            for _ in 0..workers {
                let tx = tx.clone();
                let (next, work) = (&next, &work);
                scope.spawn(move || loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(&record) = work.get(index) else {
                        break;
                    };
                    if tx.send(Message::Started(index)).is_err() {
                        break;
                    }
                    let outcome = self.verify_record(index, record);
                    let done = RecordOutcome {
                        record: record.clone(),
                        outcome,
                    };
                    if tx.send(Message::Finished(index, done)).is_err() {
                        break;
                    }
                });
            }
            drop(tx);

            for message in rx {
                match message {
                    Message::Started(index) => on_event(VerifyEvent::Started(work[index])),
                    Message::Finished(index, done) => {
                        on_event(VerifyEvent::Finished(&done));
                        slots[index] = Some(done);
                    }
                }
            }
        });

        Report {
            outcomes: slots.into_iter().flatten().collect(),
            skipped: skipped.into_iter().cloned().collect(),
        }
    }

    /// Verify a single record in its own scratch subdirectory
    pub fn verify_record(&self, index: usize, record: &VerificationRecord) -> VerificationOutcome {
        let dir = self.record_dir(index, record);
        debug!(module = %record, dir = %dir.display(), "verifying");

        let result = self.compute_digest(record, &dir);

        if !self.keep_extracted {
            if let Err(err) = remove_dir_if_exists(&dir) {
                debug!(dir = %dir.display(), error = %err, "failed to remove scratch directory");
            }
        }

        match result {
            Ok(actual) if actual.matches(&record.expected_digest) => {
                debug!(module = %record, "verified");
                VerificationOutcome::Verified
            }
            Ok(actual) => {
                warn!(module = %record, expected = %record.expected_digest, actual = %actual, "checksum mismatch");
                VerificationOutcome::Mismatch {
                    expected: record.expected_digest.clone(),
                    actual,
                }
            }
            Err(err) => {
                warn!(module = %record, error = %err, "verification failed");
                VerificationOutcome::Error(err)
            }
        }
    }

    fn compute_digest(&self, record: &VerificationRecord, dir: &Path) -> Result<Digest, VerifyError> {
        let scratch = |source| VerifyError::Scratch {
            path: dir.to_path_buf(),
            source,
        };
        remove_dir_if_exists(dir).map_err(scratch)?;
        fs::create_dir_all(dir).map_err(scratch)?;

        let archive = self.fetcher.fetch(&record.module_path, &record.version)?;
        let tree = extract_archive(archive, dir, self.max_extracted_bytes)?;
        Ok(hash_dir(tree.root(), &record.module_id())?)
    }

    fn record_dir(&self, index: usize, record: &VerificationRecord) -> PathBuf {
        let name: String = record
            .module_id()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "@.-_".contains(c) { c } else { '_' })
            .collect();
        self.scratch_root.join(format!("{:04}-{}", index, name))
    }
}

fn remove_dir_if_exists(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
