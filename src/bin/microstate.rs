//! Microstate CLI - Command-line interface for the microstate pipeline
//!
//! Commands:
//! - compute: Add running count and microstate columns to trial records
//! - summarize: Produce density or trend summaries for plotting
//! - validate: Report malformed records without computing
//! - config: Print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use microstate::config::parse_trial_list;
use microstate::{
    ComputeError, InputFormat, MicrostateProcessor, PipelineConfig, RecordAdapter, VERSION,
};

/// Microstate - per-trial behavioral stability scores
#[derive(Parser)]
#[command(name = "microstate")]
#[command(version = VERSION)]
#[command(about = "Compute and summarize microstate scores for repeated-choice experiments", long_about = None)]
struct Cli {
    /// JSON configuration file (column names, checkpoint trials, decision tag)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add new_count and microstate fields to every record
    Compute {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Output format
        #[arg(long, default_value = "csv")]
        output_format: RecordFormatArg,

        /// Decision tag that advances the running count
        #[arg(long)]
        tag: Option<String>,
    },

    /// Compute microstates and summarize them at checkpoint trials
    Summarize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Summary mode
        #[arg(long, default_value = "trend")]
        mode: SummaryModeArg,

        /// Comma-separated checkpoint trials, overriding the configuration
        #[arg(long)]
        trials: Option<String>,
    },

    /// Validate records without computing
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "csv")]
        input_format: InputFormatArg,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[derive(Clone, ValueEnum)]
enum InputFormatArg {
    /// Comma-separated values with a header row
    Csv,
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Csv => InputFormat::Csv,
            InputFormatArg::Ndjson => InputFormat::Ndjson,
            InputFormatArg::Json => InputFormat::Json,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum RecordFormatArg {
    /// Original columns plus new_count and microstate
    Csv,
    /// Newline-delimited JSON (one augmented record per line)
    Ndjson,
}

#[derive(Clone, ValueEnum)]
enum SummaryModeArg {
    /// Histogram per content, size, structure, run and trial
    Density,
    /// Histogram per content, structure and trial across sizes and runs
    CombinedDensity,
    /// Mean ± sd per content, structure, size and trial across runs
    Trend,
    /// Trend grouped into per-size series
    TrendSeries,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&ErrorReport::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compute {
            input,
            output,
            input_format,
            output_format,
            tag,
        } => cmd_compute(&input, &output, input_format, output_format, tag, config),
        Commands::Summarize {
            input,
            output,
            input_format,
            mode,
            trials,
        } => cmd_summarize(&input, &output, input_format, mode, trials.as_deref(), config),
        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json, &config),
        Commands::Config => {
            println!("{}", config.to_json()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            let config = PipelineConfig::from_json(&json)?;
            log::info!("loaded configuration from {}", path.display());
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn read_input(input: &Path) -> Result<String, CliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), CliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
        log::info!("wrote {}", output.display());
    }
    Ok(())
}

fn cmd_compute(
    input: &Path,
    output: &Path,
    input_format: InputFormatArg,
    output_format: RecordFormatArg,
    tag: Option<String>,
    mut config: PipelineConfig,
) -> Result<(), CliError> {
    if let Some(tag) = tag {
        config.new_behavior_tag = tag;
    }
    let processor = MicrostateProcessor::with_config(config)?;

    let input_data = read_input(input)?;
    let batch = processor.parse(&input_data, input_format.into())?;
    if batch.records.is_empty() {
        return Err(CliError::NoRecords);
    }

    let augmented = processor.augment(&batch)?;
    let output_data = match output_format {
        RecordFormatArg::Csv => processor.to_csv(&batch, &augmented)?,
        RecordFormatArg::Ndjson => processor.to_ndjson(&augmented)?,
    };

    write_output(output, &output_data)
}

fn cmd_summarize(
    input: &Path,
    output: &Path,
    input_format: InputFormatArg,
    mode: SummaryModeArg,
    trials: Option<&str>,
    mut config: PipelineConfig,
) -> Result<(), CliError> {
    if let Some(trials) = trials {
        config = config.with_trials(parse_trial_list(trials)?);
    }
    let processor = MicrostateProcessor::with_config(config)?;

    let input_data = read_input(input)?;
    let batch = processor.parse(&input_data, input_format.into())?;
    if batch.records.is_empty() {
        return Err(CliError::NoRecords);
    }

    let augmented = processor.augment(&batch)?;
    let report = match mode {
        SummaryModeArg::Density => processor.density_report(&augmented)?,
        SummaryModeArg::CombinedDensity => processor.combined_density_report(&augmented)?,
        SummaryModeArg::Trend => processor.trend_report(&augmented)?,
        SummaryModeArg::TrendSeries => processor.trend_series_report(&augmented)?,
    };

    write_output(output, &report)
}

fn cmd_validate(
    input: &Path,
    input_format: InputFormatArg,
    json: bool,
    config: &PipelineConfig,
) -> Result<(), CliError> {
    let input_data = read_input(input)?;
    let (total, issues) =
        RecordAdapter::validate(&input_data, input_format.into(), &config.columns)?;

    let report = ValidationReport {
        total_records: total,
        valid_records: total - issues.len(),
        invalid_records: issues.len(),
        errors: issues
            .into_iter()
            .map(|issue| ValidationErrorDetail {
                index: issue.index,
                participant_id: issue.participant_id,
                error: issue.reason,
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Valid records:   {}", report.valid_records);
        println!("Invalid records: {}", report.invalid_records);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Record {} (participant {}): {}",
                    err.index,
                    err.participant_id.as_deref().unwrap_or("unknown"),
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(CliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum CliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoRecords,
    ValidationFailed(usize),
}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        CliError::Io(e)
    }
}

impl From<ComputeError> for CliError {
    fn from(e: ComputeError) -> Self {
        CliError::Compute(e)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct ErrorReport {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<CliError> for ErrorReport {
    fn from(e: CliError) -> Self {
        match e {
            CliError::Io(e) => ErrorReport {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            CliError::Compute(e) => {
                let (code, hint) = match &e {
                    ComputeError::MalformedRecord { .. } => (
                        "MALFORMED_RECORD",
                        "Run 'microstate validate' to list every malformed record",
                    ),
                    ComputeError::MissingColumn(_) => (
                        "MISSING_COLUMN",
                        "Map input headers with the 'columns' section of --config",
                    ),
                    ComputeError::InvalidConfig(_) => {
                        ("INVALID_CONFIG", "Run 'microstate config' to see the defaults")
                    }
                    _ => ("PARSE_ERROR", "Check input format"),
                };
                ErrorReport {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            CliError::Json(e) => ErrorReport {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            CliError::NoRecords => ErrorReport {
                code: "NO_RECORDS".to_string(),
                message: "No records found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            CliError::ValidationFailed(count) => ErrorReport {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    participant_id: Option<String>,
    error: String,
}
