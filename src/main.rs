use clap::Parser;
use std::path::PathBuf;
use sumverify::check::{self, CheckOptions};
use sumverify::logging;

#[derive(Parser)]
#[command(name = "sumverify")]
#[command(about = "Verifies module archives against the checksums recorded in go.sum")]
#[command(version)]
struct Cli {
    /// Project directory containing go.sum, or the path of a go.sum file
    project: String,
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Number of modules verified concurrently
    #[arg(short, long)]
    jobs: Option<usize>,
    /// Per-download timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
    /// Extract into this directory and keep it afterwards
    #[arg(long, value_name = "DIR")]
    keep_scratch: Option<PathBuf>,
    /// List go.mod checksum records that were not verified
    #[arg(long)]
    show_skipped: bool,
    /// Exit with an error when any module fails verification
    #[arg(long)]
    strict: bool,
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init_logging(cli.verbose)?;

    let options = CheckOptions {
        config: cli.config,
        jobs: cli.jobs,
        timeout_secs: cli.timeout,
        keep_scratch: cli.keep_scratch,
        show_skipped: cli.show_skipped,
    };

    let report = check::check_project(&cli.project, &options)?;

    if cli.strict && !report.all_verified() {
        anyhow::bail!(
            "{} of {} modules failed verification",
            report.outcomes.len() - report.verified(),
            report.outcomes.len()
        );
    }

    Ok(())
}
