use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use qc_scanner::io::excel_read;
use qc_scanner::{Result, ScanConfig, ScanError, manifest, scan};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging()?;
    match cli.command {
        Command::Check(args) => execute_check(args),
        Command::Manifest(args) => execute_manifest(args),
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ScanError::Logging(error.to_string()))
}

fn execute_check(args: CheckArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ScanError::MissingInput(args.input));
    }

    let config = ScanConfig {
        results_dir: args.results_dir,
        save_results: args.save,
        plot_models: args.plot,
    };

    let dataset = excel_read::read_dataset(&args.input)?;
    let log = match args.target {
        CheckTarget::Working => scan::check_working(&dataset, &config)?,
        CheckTarget::Current => scan::check_current(&dataset, &config)?,
        CheckTarget::History => scan::check_history(&dataset)?,
    };

    for line in log.lines() {
        println!("{line}");
    }
    if config.save_results {
        scan::save_results(&log, &config)?;
    }

    Ok(())
}

fn execute_manifest(args: ManifestArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ScanError::MissingInput(args.input));
    }

    let manifest = manifest::read_manifest(&args.input)?;
    info!(
        sections = manifest.sections.len(),
        enabled = manifest.enabled_count(),
        disabled = manifest.disabled_count(),
        "manifest is well formed"
    );

    for section in &manifest.sections {
        println!("# {}", section.title.as_deref().unwrap_or("(untitled)"));
        for requirement in &section.requirements {
            println!("{requirement}");
        }
    }

    Ok(())
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Run quality checks against human-curated tracking datasets."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the check routines over a dataset workbook.
    Check(CheckArgs),
    /// Validate a dependency manifest's well-formedness.
    Manifest(ManifestArgs),
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Which part of the dataset to scan.
    #[arg(long, value_enum)]
    target: CheckTarget,

    /// Dataset workbook path.
    #[arg(long)]
    input: PathBuf,

    /// Directory reports and plots are written to.
    #[arg(long, default_value = "results")]
    results_dir: PathBuf,

    /// Save JSON and Excel reports under the results directory.
    #[arg(long)]
    save: bool,

    /// Render forecast plots alongside the saved reports.
    #[arg(long)]
    plot: bool,
}

#[derive(clap::Args)]
struct ManifestArgs {
    /// Manifest file path.
    #[arg(long)]
    input: PathBuf,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum CheckTarget {
    Working,
    Current,
    History,
}

impl std::fmt::Display for CheckTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckTarget::Working => write!(f, "working"),
            CheckTarget::Current => write!(f, "current"),
            CheckTarget::History => write!(f, "history"),
        }
    }
}
