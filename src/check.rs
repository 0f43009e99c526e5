use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::VerifyConfig;
use crate::fetch::HttpFetcher;
use crate::manifest::{Manifest, MANIFEST_FILE_NAME};
use crate::verify::{Report, VerificationOutcome, Verifier, VerifyEvent};

/// Options for a verification run
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// YAML config file
    pub config: Option<PathBuf>,
    /// Overrides `jobs` from the config
    pub jobs: Option<usize>,
    /// Overrides `timeout_secs` from the config
    pub timeout_secs: Option<u64>,
    /// Use this directory as scratch space and keep it afterwards
    pub keep_scratch: Option<PathBuf>,
    /// List declaration-file records that were not verified
    pub show_skipped: bool,
}

/// Scratch space for extracted archives, removed on drop unless kept
enum Scratch {
    Temp(TempDir),
    Kept(PathBuf),
}

impl Scratch {
    fn acquire(keep: Option<&Path>) -> Result<Self> {
        match keep {
            Some(dir) => {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create scratch directory: {}", dir.display()))?;
                Ok(Scratch::Kept(dir.to_path_buf()))
            }
            None => {
                let temp_dir = tempfile::Builder::new()
                    .prefix("sumverify-")
                    .tempdir()
                    .with_context(|| "Failed to create temporary directory")?;
                Ok(Scratch::Temp(temp_dir))
            }
        }
    }

    fn path(&self) -> &Path {
        match self {
            Scratch::Temp(dir) => dir.path(),
            Scratch::Kept(dir) => dir,
        }
    }
}

/// Locate the checksum manifest for a project directory or manifest path
pub fn resolve_manifest_path(target: &str) -> Result<PathBuf> {
    let path = Path::new(target);

    if !path.exists() {
        anyhow::bail!("Project directory does not exist: {}", path.display());
    }

    if path.is_dir() {
        let manifest = path.join(MANIFEST_FILE_NAME);
        if !manifest.is_file() {
            anyhow::bail!("{} file not found in: {}", MANIFEST_FILE_NAME, path.display());
        }
        Ok(manifest)
    } else {
        Ok(path.to_path_buf())
    }
}

/// Load configuration and apply command-line overrides
pub fn load_config(options: &CheckOptions) -> Result<VerifyConfig> {
    let mut config = match &options.config {
        Some(path) => VerifyConfig::from_file(path)?,
        None => VerifyConfig::default(),
    };

    if let Some(jobs) = options.jobs {
        config.jobs = jobs;
    }
    if let Some(timeout) = options.timeout_secs {
        config.timeout_secs = timeout;
    }
    config.validate()?;

    Ok(config)
}

/// Verify every module archive listed in a project's manifest.
///
/// Returns the report; per-record failures are warnings, not errors.
pub fn check_project(target: &str, options: &CheckOptions) -> Result<Report> {
    let manifest_path = resolve_manifest_path(target)?;
    let config = load_config(options)?;

    println!("sumverify - Verifying module checksums");
    println!("Manifest: {}", manifest_path.display());

    let manifest = Manifest::from_file(&manifest_path)
        .with_context(|| format!("Failed to parse {}", MANIFEST_FILE_NAME))?;

    let scratch = Scratch::acquire(options.keep_scratch.as_deref())?;
    let fetcher = HttpFetcher::new(&config).with_context(|| "Failed to create module fetcher")?;

    let verifier = Verifier::new(fetcher, scratch.path())
        .with_jobs(config.jobs)
        .keep_extracted(matches!(scratch, Scratch::Kept(_)))
        .with_max_extracted_bytes(config.max_extracted_bytes);

    let total = manifest.content_archives().count();
    println!("Checking {} modules with {} workers...", total, config.jobs.min(total.max(1)));

    let progress = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
        progress.set_style(style.progress_chars("=> "));
    }

    let report = verifier.verify_all_with(manifest.records(), |event| match event {
        VerifyEvent::Started(record) => {
            progress.println(format!("Checking {}...", record.module_id()));
            progress.set_message(record.module_id());
        }
        VerifyEvent::Finished(done) => {
            match &done.outcome {
                VerificationOutcome::Verified => {
                    progress.println(format!("Verified {}", done.record.module_id()));
                }
                _ => progress.println(format!("WARNING: {}", done)),
            }
            progress.inc(1);
        }
    });
    progress.finish_and_clear();

    print_summary(&report, options.show_skipped);

    if let Scratch::Kept(dir) = &scratch {
        println!("Extracted archives kept in: {}", dir.display());
    }

    Ok(report)
}

fn print_summary(report: &Report, show_skipped: bool) {
    if show_skipped {
        for record in &report.skipped {
            println!("Skipped {}", record);
        }
    }

    println!();
    println!("Summary:");
    println!("  Verified:   {}", report.verified());
    println!("  Mismatched: {}", report.mismatched());
    println!("  Errors:     {}", report.errored());
    println!("  Skipped:    {}", report.skipped.len());
}
