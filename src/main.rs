/*!
 * bagsmith CLI - Command Line Interface
 */

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use bagsmith::{
    bagit::{self, Bag},
    build,
    config::{BuilderConfig, LogLevel},
    error::{BuildError, EXIT_FATAL, EXIT_INTEGRITY, EXIT_SUCCESS},
    logging, BuildRequest, InformationPackage,
};

#[derive(Parser)]
#[command(name = "bagsmith")]
#[command(version, about = "Build and validate BagIt packages", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevelArg>,

    /// Write logs as JSON to this file instead of stdout
    #[arg(long = "log", value_name = "FILE", global = true)]
    log_file: Option<PathBuf>,

    /// Verbose output (debug level)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a bag from a payload directory
    Build(BuildArgs),

    /// Validate an existing bag
    Validate {
        /// Bag root directory
        bag: PathBuf,

        /// Hashing threads
        #[arg(long, default_value = "1")]
        workers: usize,
    },
}

#[derive(clap::Args)]
struct BuildArgs {
    /// Payload directory
    #[arg(short = 's', long = "source", value_name = "DIR", required_unless_present = "ie")]
    source: Option<PathBuf>,

    /// Target bag directory; with --ie and no --dest the package is bagged in place
    #[arg(short = 'd', long = "dest", value_name = "DIR", required_unless_present = "ie")]
    dest: Option<PathBuf>,

    /// Metadata directory to move into the bag as meta/
    #[arg(long = "meta", value_name = "DIR")]
    meta: Option<PathBuf>,

    /// Information package holding data/ and optionally meta/
    #[arg(long = "ie", value_name = "DIR", conflicts_with_all = ["source", "meta"])]
    ie: Option<PathBuf>,

    /// Payload manifest algorithm (repeatable)
    #[arg(long = "manifest", value_name = "ALG")]
    manifests: Vec<String>,

    /// Tag-manifest algorithm (repeatable)
    #[arg(long = "tagmanifest", value_name = "ALG")]
    tagmanifests: Vec<String>,

    /// Extra bag-info.txt field (repeatable)
    #[arg(long = "bag-info", value_name = "LABEL=VALUE", value_parser = parse_bag_info)]
    bag_info: Vec<(String, String)>,

    /// Overwrite an existing target directory
    #[arg(long)]
    exist_ok: bool,

    /// Hashing threads
    #[arg(long)]
    workers: Option<usize>,

    /// Append the build report to this JSON Lines file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevelArg> for LogLevel {
    fn from(arg: LogLevelArg) -> Self {
        match arg {
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Warn => LogLevel::Warn,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Trace => LogLevel::Trace,
        }
    }
}

fn parse_bag_info(raw: &str) -> std::result::Result<(String, String), String> {
    let (label, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected LABEL=VALUE, got '{}'", raw))?;
    let label = label.trim();
    if label.is_empty() {
        return Err("bag-info label must not be empty".to_string());
    }
    Ok((label.to_string(), value.trim().to_string()))
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            e.downcast_ref::<BuildError>()
                .map(BuildError::exit_code)
                .unwrap_or(EXIT_FATAL)
        }
    };
    std::process::exit(code);
}

fn run() -> anyhow::Result<i32> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => BuilderConfig::from_file(path)?,
        None => BuilderConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.log_level = level.into();
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }
    config.verbose |= cli.verbose;
    logging::init_logging(&config)?;

    match cli.command {
        Commands::Build(args) => run_build(config, args),
        Commands::Validate { bag, workers } => run_validate(&bag, workers),
    }
}

fn run_build(config: BuilderConfig, args: BuildArgs) -> anyhow::Result<i32> {
    let mut request = match (&args.ie, &args.source, &args.dest) {
        (Some(ie), _, None) => InformationPackage::open(ie)?
            .into_in_place_request()
            .with_config(&config),
        (Some(ie), _, Some(dest)) => InformationPackage::open(ie)?
            .into_request(dest)
            .with_config(&config)
            .with_exist_ok(args.exist_ok),
        (None, Some(source), Some(dest)) => {
            let request =
                BuildRequest::from_config(&config, source, dest).with_exist_ok(args.exist_ok);
            match &args.meta {
                Some(meta) => request.with_metadata_directory(meta),
                None => request,
            }
        }
        (None, None, _) => bail!("either --source or --ie is required"),
        (None, Some(_), None) => bail!("--dest is required with --source"),
    };
    if !args.manifests.is_empty() {
        request = request.with_payload_algorithms(&args.manifests);
    }
    if !args.tagmanifests.is_empty() {
        request = request.with_tagmanifest_algorithms(&args.tagmanifests);
    }
    for (label, value) in args.bag_info {
        request = request.with_bag_info(label, value);
    }
    if let Some(workers) = args.workers {
        request = request.with_workers(workers);
    }

    let report_path = args.report.or(config.report_path);

    match build(&request) {
        Ok(built) => {
            if let Some(path) = report_path {
                built
                    .report
                    .write_jsonl(&path)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            println!("Bag created: {}", built.bag.root().display());
            println!(
                "  payload manifests: {}",
                join_algorithms(built.plan.payload_algorithms())
            );
            println!(
                "  tag-manifests:     {}",
                join_algorithms(built.plan.tag_algorithms())
            );
            Ok(EXIT_SUCCESS)
        }
        Err(failure) => {
            if let Some(path) = report_path {
                failure
                    .report
                    .write_jsonl(&path)
                    .with_context(|| format!("writing report to {}", path.display()))?;
            }
            eprintln!("Error: {}", failure);
            if let BuildError::ValidationFailure(ref verdict) = failure.error {
                print_verdict(verdict);
            }
            if failure.error.leaves_partial_state() {
                eprintln!("Partial output kept in {}", failure.target().display());
            }
            Ok(failure.exit_code())
        }
    }
}

fn run_validate(path: &Path, workers: usize) -> anyhow::Result<i32> {
    let bag = Bag::open(path).with_context(|| format!("opening bag {}", path.display()))?;
    let verdict = bagit::validate(&bag, workers.max(1))
        .with_context(|| format!("validating {}", path.display()))?;

    if verdict.valid {
        println!("{} is valid", path.display());
        Ok(EXIT_SUCCESS)
    } else {
        println!("{} is invalid", path.display());
        print_verdict(&verdict);
        Ok(EXIT_INTEGRITY)
    }
}

fn print_verdict(verdict: &bagit::Verdict) {
    for problem in &verdict.problems {
        println!("  problem: {}", problem);
    }
    for violation in &verdict.violations {
        println!("  {}", violation);
    }
}

fn join_algorithms<I>(algorithms: I) -> String
where
    I: IntoIterator<Item = bagit::ChecksumAlgorithm>,
{
    algorithms
        .into_iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
