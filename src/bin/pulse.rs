//! Pulse CLI - Command-line interface for Spread Pulse
//!
//! Commands:
//! - stats: Compute behavior statistics from stored event rows
//! - ingest: Convert collector payloads into event rows
//! - validate: Validate collector payloads
//! - schema: Print wire, row and report contracts

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use spread_pulse::config::PulseConfig;
use spread_pulse::logging::init_logging;
use spread_pulse::schema::{EventName, EventRow, IngestAdapter, IngestPayload, SCHEMA_VERSION};
use spread_pulse::stats::encoder::REPORT_VERSION;
use spread_pulse::stats::{InMemoryEventStore, StatsProcessor, StatsWindow};
use spread_pulse::{ComputeError, PULSE_VERSION};
use tracing::info;

/// Pulse - Behavioral telemetry for tarot spread pages
#[derive(Parser)]
#[command(name = "pulse")]
#[command(author = "Synheart AI Inc")]
#[command(version = PULSE_VERSION)]
#[command(about = "Ingest spread interaction events and compute dashboard stats", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute behavior statistics from event rows
    Stats {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,

        /// Output format
        #[arg(long, default_value = "json")]
        output_format: OutputFormat,

        /// Trailing window in days (7, 14 or 30); defaults to the configured window
        #[arg(long)]
        window: Option<u32>,

        /// Evaluate the window as of this RFC 3339 instant instead of now
        #[arg(long)]
        now: Option<String>,
    },

    /// Convert collector payloads into event rows (NDJSON)
    Ingest {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Input format
        #[arg(long, default_value = "ndjson")]
        input_format: InputFormat,
    },

    /// Validate collector payloads
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

    /// Print schema information
    Schema {
        /// Schema to print
        #[arg(value_enum)]
        schema_type: SchemaType,

        /// Output as JSON schema
        #[arg(long)]
        json_schema: bool,
    },
}

#[derive(Clone, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// A JSON array of records (or a single payload object)
    Json,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, ValueEnum)]
enum SchemaType {
    /// Collector batch payload (pulse.ingest.v1)
    Ingest,
    /// Stored event row
    Row,
    /// Stats report (pulse.stats.v1)
    Report,
}

fn main() -> ExitCode {
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
    let config = match cli.config.as_deref() {
        Some(path) => PulseConfig::load(path)?,
        None => PulseConfig::default(),
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Stats {
            input,
            output,
            input_format,
            output_format,
            window,
            now,
        } => {
            let window = match window {
                Some(days) => StatsWindow::try_from(days)?,
                None => config.stats.default_window_days,
            };
            cmd_stats(
                &input,
                &output,
                input_format,
                output_format,
                window,
                now.as_deref(),
            )
        }

        Commands::Ingest {
            input,
            output,
            input_format,
        } => cmd_ingest(&input, &output, input_format),

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Schema {
            schema_type,
            json_schema,
        } => cmd_schema(schema_type, json_schema),
    }
}

fn cmd_stats(
    input: &Path,
    output: &Path,
    input_format: InputFormat,
    output_format: OutputFormat,
    window: StatsWindow,
    now: Option<&str>,
) -> Result<(), PulseCliError> {
    let input_data = read_input(input)?;

    let rows: Vec<EventRow> = match input_format {
        InputFormat::Ndjson => IngestAdapter::parse_rows_ndjson(&input_data)?,
        InputFormat::Json => IngestAdapter::parse_rows_array(&input_data)?,
    };

    let now = match now {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| PulseCliError::InvalidArgument(format!("--now {raw}: {e}")))?,
        None => Utc::now(),
    };

    info!(rows = rows.len(), window_days = window.days(), "computing stats");
    let processor = StatsProcessor::new(InMemoryEventStore::from_rows(rows));
    let report_json = processor.report_json(window, now)?;

    let output_data = match output_format {
        OutputFormat::Json => report_json + "\n",
        OutputFormat::JsonPretty => {
            let value: serde_json::Value = serde_json::from_str(&report_json)?;
            serde_json::to_string_pretty(&value)? + "\n"
        }
    };
    write_output(output, &output_data)
}

fn cmd_ingest(input: &Path, output: &Path, input_format: InputFormat) -> Result<(), PulseCliError> {
    let input_data = read_input(input)?;
    let payloads = parse_payloads(&input_data, input_format)?;

    if payloads.is_empty() {
        return Err(PulseCliError::NoPayloads);
    }

    let received_at = Utc::now();
    let mut lines: Vec<String> = Vec::new();
    for payload in &payloads {
        for row in IngestAdapter::to_rows(payload, received_at)? {
            lines.push(serde_json::to_string(&row)?);
        }
    }
    info!(payloads = payloads.len(), rows = lines.len(), "ingested payloads");

    let mut output_data = lines.join("\n");
    if !output_data.is_empty() {
        output_data.push('\n');
    }
    write_output(output, &output_data)
}

fn cmd_validate(input: &Path, input_format: InputFormat, json: bool) -> Result<(), PulseCliError> {
    let input_data = read_input(input)?;
    let payloads = parse_payloads(&input_data, input_format)?;

    let results = IngestAdapter::validate_payloads(&payloads);

    let report = ValidationReport {
        total_payloads: payloads.len(),
        valid_payloads: payloads.len() - results.len(),
        invalid_payloads: results.len(),
        errors: results
            .iter()
            .map(|r| ValidationErrorDetail {
                index: r.index,
                session_id: r.session_id.clone(),
                error: r.result.as_ref().map(|e| e.to_string()).unwrap_or_default(),
            })
            .collect(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total payloads:   {}", report.total_payloads);
        println!("Valid payloads:   {}", report.valid_payloads);
        println!("Invalid payloads: {}", report.invalid_payloads);

        if !report.errors.is_empty() {
            println!("\nErrors:");
            for err in &report.errors {
                let session = if err.session_id.is_empty() {
                    "<empty>"
                } else {
                    err.session_id.as_str()
                };
                println!(
                    "  - Payload {} (session {}): {}",
                    err.index, session, err.error
                );
            }
        }
    }

    if report.invalid_payloads > 0 {
        Err(PulseCliError::ValidationFailed(report.invalid_payloads))
    } else {
        Ok(())
    }
}

fn cmd_schema(schema_type: SchemaType, json_schema: bool) -> Result<(), PulseCliError> {
    let event_names: Vec<&str> = EventName::ALL.iter().map(|n| n.as_str()).collect();

    match schema_type {
        SchemaType::Ingest => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&ingest_json_schema(&event_names))?);
            } else {
                println!("Ingest Schema: {}", SCHEMA_VERSION);
                println!();
                println!("One batch per collector flush:");
                println!();
                println!("- sessionId: opaque session token (non-empty)");
                println!("- events: array of");
                println!("  - name: {}", event_names.join(", "));
                println!("  - timestamp: client clock, epoch milliseconds");
                println!("  - properties: free-form object, always carrying elapsed_ms");
            }
        }
        SchemaType::Row => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&row_json_schema())?);
            } else {
                println!("Event Row");
                println!();
                println!("- sessionId: session token from the payload");
                println!("- eventName: event name, matched by exact string");
                println!("- properties: event properties as a JSON string");
                println!("- timestamp: client timestamp, epoch milliseconds");
                println!("- createdAt: server receipt time (RFC 3339), drives window filtering");
            }
        }
        SchemaType::Report => {
            if json_schema {
                println!("{}", serde_json::to_string_pretty(&report_json_schema())?);
            } else {
                println!("Report Schema: {}", REPORT_VERSION);
                println!();
                println!("- reportVersion, producer {{ name, version, instanceId }}");
                println!("- windowDays: 7, 14 or 30; cutoffUtc, computedAtUtc");
                println!("- stats:");
                println!("  - sessionStats: {{ totalSessions, engagedSessions, bounceRate }}");
                println!("  - flipDistribution: [{{ flipCount, sessions, percentage }}] for 0..=3");
                println!("  - funnel: [{{ step, sessions, percentage, dropoff }}]");
                println!("  - readSpreadCtr: {{ eligible, clicked, ctr }}");
                println!("  - timeToFirstFlip: {{ avgMs, medianMs, sampleSize }}");
                println!("  - deviceBreakdown: {{ mobile, desktop, mobilePct, desktopPct }}");
            }
        }
    }

    Ok(())
}

// Helper functions

fn read_input(input: &Path) -> Result<String, PulseCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn write_output(output: &Path, data: &str) -> Result<(), PulseCliError> {
    if output.to_string_lossy() == "-" {
        print!("{}", data);
    } else {
        fs::write(output, data)?;
    }
    Ok(())
}

fn parse_payloads(
    input_data: &str,
    input_format: InputFormat,
) -> Result<Vec<IngestPayload>, PulseCliError> {
    Ok(match input_format {
        InputFormat::Ndjson => IngestAdapter::parse_payloads_ndjson(input_data)?,
        InputFormat::Json => IngestAdapter::parse_payloads(input_data)?,
    })
}

fn ingest_json_schema(event_names: &[&str]) -> serde_json::Value {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": SCHEMA_VERSION,
        "title": "Pulse ingest payload",
        "type": "object",
        "required": ["sessionId", "events"],
        "properties": {
            "sessionId": { "type": "string", "minLength": 1 },
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": ["name", "timestamp"],
                    "properties": {
                        "name": { "type": "string", "enum": event_names },
                        "timestamp": { "type": "integer", "minimum": 0 },
                        "properties": {
                            "type": "object",
                            "properties": {
                                "elapsed_ms": { "type": "number" }
                            }
                        }
                    }
                }
            }
        }
    })
}

fn row_json_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Pulse event row",
        "type": "object",
        "required": ["sessionId", "eventName", "properties", "timestamp", "createdAt"],
        "properties": {
            "sessionId": { "type": "string" },
            "eventName": { "type": "string" },
            "properties": { "type": "string", "description": "JSON-encoded properties object" },
            "timestamp": { "type": "integer" },
            "createdAt": { "type": "string", "format": "date-time" }
        }
    })
}

fn report_json_schema() -> serde_json::Value {
    let pct = serde_json::json!({ "type": "number" });
    let count = serde_json::json!({ "type": "integer", "minimum": 0 });

    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "$id": REPORT_VERSION,
        "title": "Pulse behavior stats report",
        "type": "object",
        "required": ["reportVersion", "producer", "windowDays", "cutoffUtc", "computedAtUtc", "stats"],
        "properties": {
            "reportVersion": { "type": "string" },
            "producer": {
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "version": { "type": "string" },
                    "instanceId": { "type": "string" }
                }
            },
            "windowDays": { "type": "integer", "enum": [7, 14, 30] },
            "cutoffUtc": { "type": "string", "format": "date-time" },
            "computedAtUtc": { "type": "string", "format": "date-time" },
            "stats": {
                "type": "object",
                "properties": {
                    "sessionStats": {
                        "type": "object",
                        "properties": {
                            "totalSessions": count,
                            "engagedSessions": count,
                            "bounceRate": pct
                        }
                    },
                    "flipDistribution": {
                        "type": "array",
                        "minItems": 4,
                        "maxItems": 4,
                        "items": {
                            "type": "object",
                            "properties": {
                                "flipCount": { "type": "integer", "minimum": 0, "maximum": 3 },
                                "sessions": count,
                                "percentage": pct
                            }
                        }
                    },
                    "funnel": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "step": { "type": "string" },
                                "sessions": count,
                                "percentage": pct,
                                "dropoff": pct
                            }
                        }
                    },
                    "readSpreadCtr": {
                        "type": "object",
                        "properties": {
                            "eligible": count,
                            "clicked": count,
                            "ctr": pct
                        }
                    },
                    "timeToFirstFlip": {
                        "type": "object",
                        "properties": {
                            "avgMs": pct,
                            "medianMs": pct,
                            "sampleSize": count
                        }
                    },
                    "deviceBreakdown": {
                        "type": "object",
                        "properties": {
                            "mobile": count,
                            "desktop": count,
                            "mobilePct": pct,
                            "desktopPct": pct
                        }
                    }
                }
            }
        }
    })
}

// Error handling

#[derive(Debug)]
enum PulseCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NoPayloads,
    ValidationFailed(usize),
    InvalidArgument(String),
}

impl From<io::Error> for PulseCliError {
    fn from(e: io::Error) -> Self {
        PulseCliError::Io(e)
    }
}

impl From<ComputeError> for PulseCliError {
    fn from(e: ComputeError) -> Self {
        PulseCliError::Compute(e)
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
            PulseCliError::Compute(ComputeError::InvalidWindow(days)) => CliError {
                code: "INVALID_WINDOW".to_string(),
                message: format!("Unsupported window: {} days", days),
                hint: Some("Use --window 7, 14 or 30".to_string()),
            },
            PulseCliError::Compute(ComputeError::Config(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check the --config file and RUST_LOG".to_string()),
            },
            PulseCliError::Compute(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'pulse schema' to see the expected input".to_string()),
            },
            PulseCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            PulseCliError::NoPayloads => CliError {
                code: "NO_PAYLOADS".to_string(),
                message: "No payloads found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            PulseCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} payloads failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            PulseCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: None,
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_payloads: usize,
    valid_payloads: usize,
    invalid_payloads: usize,
    errors: Vec<ValidationErrorDetail>,
}

#[derive(serde::Serialize)]
struct ValidationErrorDetail {
    index: usize,
    session_id: String,
    error: String,
}
