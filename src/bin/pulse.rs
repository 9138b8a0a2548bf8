//! Pulse CLI - Command-line interface for the readpulse engine
//!
//! Commands:
//! - track: Process tracking submissions into responses (batch mode)
//! - leaderboard: Rank users for a period from a state snapshot
//! - insight: Generate a forward-looking insight for a user
//! - validate: Validate tracking submissions against read.track.v1
//! - doctor: Diagnose engine health and state files
//! - schema: Print schema information

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

use readpulse::pipeline::EngagementProcessor;
use readpulse::schema::{TrackSubmission, SCHEMA_VERSION};
use readpulse::types::{Period, TrackResponse};
use readpulse::{EngineConfig, EngineError, ENGINE_VERSION, PRODUCER_NAME};

/// Pulse - reading engagement compute engine
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author = "Readpulse Team")]
#[command(version = ENGINE_VERSION)]
#[command(about = "Turn reading telemetry into scores, leaderboards, and insights", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process tracking submissions into responses (batch mode)
    Track {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long)]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "ndjson")]
        output_format: OutputFormat,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Load engine state from file
        #[arg(long)]
        load_state: Option<PathBuf>,

        /// Save engine state to file after processing
        #[arg(long)]
        save_state: Option<PathBuf>,
    },

    /// Rank users for a period from a state snapshot
    Leaderboard {
        /// Ranking period
        #[arg(long, default_value = "all-time")]
        period: PeriodArg,

        /// Maximum number of entries
        #[arg(long)]
        limit: Option<usize>,

        /// Engine state file
        #[arg(long)]
        state: PathBuf,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Generate a forward-looking insight for a user
    Insight {
        /// User to generate the insight for
        #[arg(long)]
        user: String,

        /// Engine state file
        #[arg(long)]
        state: PathBuf,

        /// Engine configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate tracking submissions against read.track.v1
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose engine health and state files
    Doctor {
        /// Check an engine state file
        #[arg(long)]
        state: Option<PathBuf>,

        /// Check an engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print schema information
    Schema {
        /// Schema to print (input or output)
        #[arg(value_enum)]
        schema_type: SchemaType,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one submission per line)
    Ndjson,
    /// JSON array of submissions
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one response per line)
    Ndjson,
    /// JSON array of responses
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum PeriodArg {
    Daily,
    Weekly,
    AllTime,
}

impl From<PeriodArg> for Period {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Daily => Period::Daily,
            PeriodArg::Weekly => Period::Weekly,
            PeriodArg::AllTime => Period::AllTime,
        }
    }
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Input schema (read.track.v1)
    Input,
    /// Output schema (read.response.v1)
    Output,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), PulseCliError> {
    match cli.command {
        Commands::Track {
            input,
            output,
            input_format,
            output_format,
            config,
            load_state,
            save_state,
        } => cmd_track(
            &input,
            &output,
            input_format,
            output_format,
            config.as_deref(),
            load_state.as_deref(),
            save_state.as_deref(),
        ),

        Commands::Leaderboard {
            period,
            limit,
            state,
            config,
        } => cmd_leaderboard(period, limit, &state, config.as_deref()),

        Commands::Insight {
            user,
            state,
            config,
        } => cmd_insight(&user, &state, config.as_deref()),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            state,
            config,
            json,
        } => cmd_doctor(state.as_deref(), config.as_deref(), json),

        Commands::Schema { schema_type } => cmd_schema(schema_type),
    }
}

fn cmd_track(
    input: &PathBuf,
    output: &PathBuf,
    input_format: InputFormat,
    output_format: OutputFormat,
    config: Option<&std::path::Path>,
    load_state: Option<&std::path::Path>,
    save_state: Option<&std::path::Path>,
) -> Result<(), PulseCliError> {
    let input_data = read_input(input)?;
    let submissions = parse_submissions(&input_data, &input_format)?;

    if submissions.is_empty() {
        return Err(PulseCliError::NoSubmissions);
    }

    let mut processor = build_processor(config)?;

    if let Some(state_path) = load_state {
        let state_json = fs::read_to_string(state_path)?;
        processor.load_state(&state_json)?;
    }

    let mut responses: Vec<TrackResponse> = Vec::new();
    for submission in submissions {
        let json = serde_json::to_string(&submission)?;
        responses.push(processor.track(&json)?);
    }

    if let Some(state_path) = save_state {
        fs::write(state_path, processor.save_state()?)?;
    }

    let output_data = format_output(&responses, &output_format)?;
    write_output(output, &output_data)?;

    Ok(())
}

fn cmd_leaderboard(
    period: PeriodArg,
    limit: Option<usize>,
    state: &std::path::Path,
    config: Option<&std::path::Path>,
) -> Result<(), PulseCliError> {
    let mut processor = build_processor(config)?;
    let state_json = fs::read_to_string(state)?;
    processor.load_state(&state_json)?;

    let response = processor.leaderboard(period.into(), limit);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_insight(
    user: &str,
    state: &std::path::Path,
    config: Option<&std::path::Path>,
) -> Result<(), PulseCliError> {
    let mut processor = build_processor(config)?;
    let state_json = fs::read_to_string(state)?;
    processor.load_state(&state_json)?;

    let response = processor.insight(user)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn cmd_validate(
    input: &PathBuf,
    input_format: InputFormat,
    json: bool,
) -> Result<(), PulseCliError> {
    let input_data = read_input(input)?;
    let submissions = parse_submissions(&input_data, &input_format)?;

    let errors: Vec<ValidationErrorDetail> = submissions
        .iter()
        .enumerate()
        .filter_map(|(idx, submission)| {
            submission.validate().err().map(|e| ValidationErrorDetail {
                index: idx,
                event_id: submission.event_id.clone(),
                error: e.to_string(),
            })
        })
        .collect();

    let report = ValidationReport {
        total_submissions: submissions.len(),
        valid_submissions: submissions.len() - errors.len(),
        invalid_submissions: errors.len(),
        errors,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total submissions:   {}", report.total_submissions);
        println!("Valid submissions:   {}", report.valid_submissions);
        println!("Invalid submissions: {}", report.invalid_submissions);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                println!(
                    "  - Submission {} (index {}): {}",
                    err.event_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_submissions > 0 {
        Err(PulseCliError::ValidationFailed(report.invalid_submissions))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    state: Option<&std::path::Path>,
    config: Option<&std::path::Path>,
    json: bool,
) -> Result<(), PulseCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "engine_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Readpulse version {}", ENGINE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "schema_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Input schema: {}", SCHEMA_VERSION),
    });

    if let Some(config_path) = config {
        checks.push(check_config_file(config_path));
    }

    if let Some(state_path) = state {
        checks.push(check_state_file(state_path));
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (interactive mode)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (streaming mode ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: ENGINE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Pulse Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(PulseCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn check_config_file(path: &std::path::Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Warning,
            message: "Config file does not exist".to_string(),
        };
    }
    match fs::read_to_string(path) {
        Ok(content) => match EngineConfig::from_json(&content) {
            Ok(_) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: "Config file valid".to_string(),
            },
            Err(e) => DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: format!("Invalid config: {}", e),
            },
        },
        Err(e) => DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read config file: {}", e),
        },
    }
}

fn check_state_file(path: &std::path::Path) -> DoctorCheck {
    if !path.exists() {
        return DoctorCheck {
            name: "state".to_string(),
            status: CheckStatus::Warning,
            message: "State file does not exist".to_string(),
        };
    }
    match fs::read_to_string(path) {
        Ok(content) => {
            let mut processor = EngagementProcessor::new();
            match processor.load_state(&content) {
                Ok(()) => DoctorCheck {
                    name: "state".to_string(),
                    status: CheckStatus::Ok,
                    message: format!(
                        "State file valid ({} events, {} profiles)",
                        processor.event_count(),
                        processor.profile_count()
                    ),
                },
                Err(e) => DoctorCheck {
                    name: "state".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid state file: {}", e),
                },
            }
        }
        Err(e) => DoctorCheck {
            name: "state".to_string(),
            status: CheckStatus::Error,
            message: format!("Cannot read state file: {}", e),
        },
    }
}

fn cmd_schema(schema_type: SchemaType) -> Result<(), PulseCliError> {
    match schema_type {
        SchemaType::Input => {
            println!("Input Schema: {}", SCHEMA_VERSION);
            println!();
            println!("A tracking submission is a JSON object:");
            println!();
            println!("  user_id             string   required; empty means unauthenticated");
            println!("  content_id          string   required; book or chapter id");
            println!("  session_duration    number   required; reading time in seconds");
            println!("  completed           bool     default false");
            println!("  pause_count         integer  default 0");
            println!("  pause_duration      number   default 0; seconds, <= session_duration");
            println!("  speed_changes       integer  default 0");
            println!("  atmosphere_changes  integer  default 0");
            println!("  timestamp           string   optional; RFC3339 session end time");
            println!("  event_id            string   optional; idempotency key for retries");
            println!();
            println!("Unrecognized fields are rejected.");
        }
        SchemaType::Output => {
            println!("Output Schema: read.response.v1");
            println!();
            println!("Track responses contain:");
            println!();
            println!("- success: true");
            println!("- tracked.session: {{ event_id, content_id, duration_sec, completed, ... }}");
            println!("- tracked.patterns: {{ pauses_per_min, pause_time_ratio, engagement_score, ... }}");
            println!("- tracked.learning: {{ signals, style, rolling_score, events_scored }}");
            println!("- meta: {{ producer, version, instance_id, computed_at_utc }}");
            println!();
            println!("Leaderboard responses contain:");
            println!();
            println!("- success: true");
            println!("- leaderboard: [{{ user_id, period, rank, score }}]");
            println!("- period: daily | weekly | all_time");
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &PathBuf) -> Result<String, PulseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &PathBuf, data: &str) -> Result<(), PulseCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_submissions(
    data: &str,
    format: &InputFormat,
) -> Result<Vec<TrackSubmission>, PulseCliError> {
    let submissions = match format {
        InputFormat::Ndjson => TrackSubmission::parse_ndjson(data)?,
        InputFormat::Json => serde_json::from_str(data)?,
    };
    Ok(submissions)
}

fn format_output(
    responses: &[TrackResponse],
    format: &OutputFormat,
) -> Result<String, PulseCliError> {
    match format {
        OutputFormat::Ndjson => {
            let mut lines: Vec<String> = Vec::new();
            for response in responses {
                lines.push(serde_json::to_string(response)?);
            }
            Ok(lines.join("\n") + "\n")
        }
        OutputFormat::Json => Ok(serde_json::to_string(responses)?),
        OutputFormat::JsonPretty => Ok(serde_json::to_string_pretty(responses)?),
    }
}

// Error types

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Engine(EngineError),
    Json(serde_json::Error),
    NoSubmissions,
    ValidationFailed(usize),
    DoctorFailed,
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<EngineError> for PulseCliError {
    fn from(e: EngineError) -> Self {
        PulseCliError::Engine(e)
    }
}

impl From<serde_json::Error> for PulseCliError {
    fn from(e: serde_json::Error) -> Self {
        PulseCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<PulseCliError> for CliError {
    fn from(e: PulseCliError) -> Self {
        match e {
            PulseCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            PulseCliError::Engine(e) => CliError {
                code: match e {
                    EngineError::AuthenticationRequired(_) => "AUTHENTICATION_REQUIRED",
                    EngineError::Validation(_) => "VALIDATION_ERROR",
                    EngineError::Parse(_) | EngineError::Json(_) => "PARSE_ERROR",
                    EngineError::Storage(_) => "STORAGE_ERROR",
                    EngineError::InsufficientData(_) => "INSUFFICIENT_DATA",
                    EngineError::Config(_) => "CONFIG_ERROR",
                }
                .to_string(),
                message: e.to_string(),
                hint: Some("Run 'pulse validate' for submission details".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoSubmissions => CliError {
                code: "NO_SUBMISSIONS".to_string(),
                message: "No submissions found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} submissions failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PulseCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_submissions: usize,
    valid_submissions: usize,
    invalid_submissions: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    event_id: Option<String>,
    error: String,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

fn build_processor(config: Option<&std::path::Path>) -> Result<EngagementProcessor, PulseCliError> {
    match config {
        Some(path) => {
            let config_json = fs::read_to_string(path)?;
            let config = EngineConfig::from_json(&config_json)?;
            Ok(EngagementProcessor::with_config(config)?)
        }
        None => Ok(EngagementProcessor::new()),
    }
}
