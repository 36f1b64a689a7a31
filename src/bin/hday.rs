//! hday CLI - Command-line interface for health-days
//!
//! Commands:
//! - summarize: Aggregate samples into a daily report
//! - sleep: Sleep list (time in bed, time asleep, efficiency per day)
//! - steps: Step count list
//! - chart: Chart series for a metric or category
//! - validate: Validate sample records
//! - doctor: Diagnose configuration
//! - schema: Print the input format

use chrono::{DateTime, Duration, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use health_days::encoder::{ReportEncoder, REPORT_VERSION};
use health_days::series::Series;
use health_days::source::SortOrder;
use health_days::{
    Category, DayCalendar, FileSource, FixedOffsetCalendar, HealthError, HealthPipeline,
    InMemorySource, MetricMap, RecordAdapter, RecordFormat, SampleQuery, SampleSource,
    ZonedCalendar, PRODUCER_NAME, SCHEMA_VERSION, VERSION,
};

/// hday - Day-bucketed sleep and step summaries
#[derive(Parser)]
#[command(name = "hday")]
#[command(version = VERSION)]
#[command(about = "Aggregate sleep and step samples by calendar day", long_about = None)]
struct Cli {
    /// Log level (error, warn, info, debug, trace); logs go to stderr
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate samples into a daily report
    Summarize {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Output format
        #[arg(long, default_value = "json-pretty")]
        output_format: OutputFormat,
    },

    /// Sleep list: time in bed, time asleep and efficiency per day
    Sleep {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Step count list
    Steps {
        #[command(flatten)]
        input: InputArgs,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Chart series (date,value) for a metric or a single category
    Chart {
        #[command(flatten)]
        input: InputArgs,

        /// Metric name from the metric map (e.g. time_asleep, steps)
        #[arg(long, conflicts_with = "category")]
        metric: Option<String>,

        /// Category name (e.g. asleep_deep)
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Validate sample records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (guessed from the file extension when omitted)
        #[arg(long)]
        input_format: Option<InputFormat>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration
    Doctor {
        /// Check an IANA timezone name
        #[arg(long)]
        timezone: Option<String>,

        /// Check a metric bindings file
        #[arg(long)]
        metrics: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the input record format
    Schema,
}

/// Input, day-boundary and query options shared by the aggregating commands
#[derive(Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    #[arg(short, long)]
    input: PathBuf,

    /// Input format (guessed from the file extension when omitted)
    #[arg(long)]
    input_format: Option<InputFormat>,

    /// IANA timezone for day boundaries (e.g. "America/New_York")
    #[arg(long, default_value = "UTC")]
    timezone: String,

    /// Fixed UTC offset for day boundaries (e.g. "+02:00"); overrides --timezone
    #[arg(long)]
    utc_offset: Option<String>,

    /// Metric bindings JSON file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Only samples starting at or after this date (YYYY-MM-DD) or RFC 3339 instant
    #[arg(long)]
    from: Option<String>,

    /// Only samples starting before this date (YYYY-MM-DD) or RFC 3339 instant
    #[arg(long)]
    until: Option<String>,

    /// Maximum number of samples to fetch
    #[arg(long)]
    limit: Option<usize>,

    /// Sample fetch order
    #[arg(long, default_value = "asc")]
    order: Order,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Newline-delimited JSON (one record per line)
    Ndjson,
    /// JSON array of records
    Json,
}

impl From<InputFormat> for RecordFormat {
    fn from(format: InputFormat) -> Self {
        match format {
            InputFormat::Ndjson => RecordFormat::Ndjson,
            InputFormat::Json => RecordFormat::Json,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Newline-delimited JSON (one day per line)
    Ndjson,
    /// Compact JSON report
    Json,
    /// Pretty-printed JSON report
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum Order {
    Asc,
    Desc,
}

impl From<Order> for SortOrder {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => SortOrder::Ascending,
            Order::Desc => SortOrder::Descending,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(&cli.log_level);

    match run(cli).await {
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

/// Initialise the global `tracing` subscriber on stderr
fn setup_logging(log_level: &str) {
    let filter = EnvFilter::try_new(log_level.to_lowercase())
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(false);

    tracing_subscriber::registry().with(filter).with(layer).init();
}

async fn run(cli: Cli) -> Result<(), HdayCliError> {
    match cli.command {
        Commands::Summarize {
            input,
            output,
            output_format,
        } => cmd_summarize(&input, &output, output_format).await,

        Commands::Sleep { input, json } => cmd_sleep(&input, json).await,

        Commands::Steps { input, json } => cmd_steps(&input, json).await,

        Commands::Chart {
            input,
            metric,
            category,
            json,
        } => cmd_chart(&input, metric, category, json).await,

        Commands::Validate {
            input,
            input_format,
            json,
        } => cmd_validate(&input, input_format, json),

        Commands::Doctor {
            timezone,
            metrics,
            json,
        } => cmd_doctor(timezone.as_deref(), metrics.as_deref(), json),

        Commands::Schema => {
            cmd_schema();
            Ok(())
        }
    }
}

async fn cmd_summarize(
    args: &InputArgs,
    output: &Path,
    output_format: OutputFormat,
) -> Result<(), HdayCliError> {
    let (pipeline, calendar) = build_pipeline(args)?;
    let query = build_query(args, SampleQuery::all(), calendar.as_ref())?;

    let snapshot = pipeline.refresh(&query).await?;
    info!(
        days = snapshot.aggregation.summaries.len(),
        anomalies = snapshot.aggregation.anomalies.total(),
        "summarized samples"
    );

    let report = pipeline.report();
    let output_data = match output_format {
        OutputFormat::Ndjson => {
            let mut lines = String::new();
            for day in &report.days {
                lines.push_str(&serde_json::to_string(day)?);
                lines.push('\n');
            }
            lines
        }
        OutputFormat::Json => serde_json::to_string(&report)?,
        OutputFormat::JsonPretty => serde_json::to_string_pretty(&report)?,
    };

    if output.to_string_lossy() == "-" {
        print!("{}", output_data);
    } else {
        fs::write(output, output_data)?;
    }

    Ok(())
}

async fn cmd_sleep(args: &InputArgs, json: bool) -> Result<(), HdayCliError> {
    let (pipeline, calendar) = build_pipeline(args)?;
    let query = build_query(args, SampleQuery::sleep(), calendar.as_ref())?;
    pipeline.refresh(&query).await?;

    let rows = pipeline.sleep_days();

    if json {
        let rows: Vec<SleepRow> = rows
            .iter()
            .map(|r| SleepRow {
                date: r.day,
                time_in_bed_minutes: r.time_in_bed.num_minutes(),
                time_asleep_minutes: r.time_asleep.num_minutes(),
                efficiency_pct: r.efficiency_pct,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{:<12}{:>10}{:>10}{:>12}", "DATE", "IN BED", "ASLEEP", "EFFICIENCY");
        for row in &rows {
            let efficiency = row
                .efficiency_pct
                .map(|e| format!("{:.1}%", e))
                .unwrap_or_else(|| "n/a".to_string());
            println!(
                "{:<12}{:>10}{:>10}{:>12}",
                row.day.format("%Y-%m-%d"),
                format_duration(row.time_in_bed),
                format_duration(row.time_asleep),
                efficiency
            );
        }
    }

    Ok(())
}

async fn cmd_steps(args: &InputArgs, json: bool) -> Result<(), HdayCliError> {
    let (pipeline, calendar) = build_pipeline(args)?;
    let query = build_query(args, SampleQuery::steps(), calendar.as_ref())?;
    pipeline.refresh(&query).await?;

    let rows = pipeline.step_days();

    if json {
        let rows: Vec<StepRow> = rows
            .iter()
            .map(|r| StepRow {
                date: r.day,
                steps: r.steps,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("{:<12}{:>10}", "DATE", "STEPS");
        for row in &rows {
            println!("{:<12}{:>10.0}", row.day.format("%Y-%m-%d"), row.steps);
        }
    }

    Ok(())
}

async fn cmd_chart(
    args: &InputArgs,
    metric: Option<String>,
    category: Option<String>,
    json: bool,
) -> Result<(), HdayCliError> {
    let (pipeline, calendar) = build_pipeline(args)?;
    let query = build_query(args, SampleQuery::all(), calendar.as_ref())?;
    pipeline.refresh(&query).await?;

    let series = match (metric, category) {
        (Some(metric), _) => pipeline.chart(&metric)?,
        (None, Some(category)) => {
            let category: Category = category.parse()?;
            Series::for_category(&pipeline.snapshot().aggregation.summaries, category)
        }
        (None, None) => {
            return Err(HdayCliError::InvalidArgument(
                "one of --metric or --category is required".to_string(),
            ))
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&series)?);
    } else {
        print!("{}", series.to_csv());
    }

    Ok(())
}

fn cmd_validate(
    input: &Path,
    input_format: Option<InputFormat>,
    json: bool,
) -> Result<(), HdayCliError> {
    let format = input_format
        .map(RecordFormat::from)
        .unwrap_or_else(|| RecordFormat::from_path(input));
    let records = RecordAdapter::parse(&read_input(input)?, format)?;

    let failures = RecordAdapter::validate_records(&records);

    let report = ValidationReport {
        total_records: records.len(),
        valid_records: records.len() - failures.len(),
        invalid_records: failures.len(),
        errors: failures
            .iter()
            .map(|f| ValidationErrorDetail {
                index: f.index,
                record_id: f.record_id.clone(),
                error: f.error.to_string(),
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
                    "  - Record {} (index {}): {}",
                    err.record_id.as_deref().unwrap_or("unknown"),
                    err.index,
                    err.error
                );
            }
        }
    }

    if report.invalid_records > 0 {
        Err(HdayCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn cmd_doctor(
    timezone: Option<&str>,
    metrics: Option<&Path>,
    json: bool,
) -> Result<(), HdayCliError> {
    let mut checks: Vec<DoctorCheck> = vec![
        DoctorCheck {
            name: "version".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} {}", PRODUCER_NAME, VERSION),
        },
        DoctorCheck {
            name: "schema_version".to_string(),
            status: CheckStatus::Ok,
            message: format!("Input: {}, output: {}", SCHEMA_VERSION, REPORT_VERSION),
        },
    ];

    if let Some(tz) = timezone {
        checks.push(match ZonedCalendar::from_name(tz) {
            Ok(calendar) => DoctorCheck {
                name: "timezone".to_string(),
                status: CheckStatus::Ok,
                message: format!("{} is a valid IANA timezone", calendar.name()),
            },
            Err(e) => DoctorCheck {
                name: "timezone".to_string(),
                status: CheckStatus::Error,
                message: e.to_string(),
            },
        });
    }

    if let Some(path) = metrics {
        let check = if !path.exists() {
            DoctorCheck {
                name: "metrics".to_string(),
                status: CheckStatus::Warning,
                message: "Metrics file does not exist; standard bindings apply".to_string(),
            }
        } else {
            match MetricMap::load(path) {
                Ok(map) => {
                    let unbound = map.unbound_list_metrics();
                    if unbound.is_empty() {
                        DoctorCheck {
                            name: "metrics".to_string(),
                            status: CheckStatus::Ok,
                            message: format!("Metrics file valid ({})", map.metrics().join(", ")),
                        }
                    } else {
                        DoctorCheck {
                            name: "metrics".to_string(),
                            status: CheckStatus::Warning,
                            message: format!(
                                "Metrics file valid but leaves {} unbound; sleep and steps output will be empty",
                                unbound.join(", ")
                            ),
                        }
                    }
                }
                Err(e) => DoctorCheck {
                    name: "metrics".to_string(),
                    status: CheckStatus::Error,
                    message: format!("Invalid metrics file: {}", e),
                },
            }
        };
        checks.push(check);
    }

    // Piped stdin is what `--input -` reads from
    let stdin_message = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (interactive mode)"
    } else {
        "stdin is a pipe (--input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_message.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("hday Doctor Report");
        println!("==================");
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
        Err(HdayCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

fn cmd_schema() {
    println!("Input Schema: {}", SCHEMA_VERSION);
    println!();
    println!("One JSON object per sample (NDJSON lines or a JSON array):");
    println!();
    println!("  schema_version  optional, defaults to {}", SCHEMA_VERSION);
    println!("  id              optional record identifier");
    println!("  category        one of: {}", category_names().join(", "));
    println!("  start, end      RFC 3339 instants; samples are bucketed by start");
    println!("  value           quantity, only for step_count");
    println!("  source          optional device or app name");
    println!();
    println!("Example:");
    println!(
        r#"  {{"category":"asleep","start":"2023-05-01T23:00:00Z","end":"2023-05-02T01:00:00Z"}}"#
    );
    println!();
    println!("Output Schema: {}", REPORT_VERSION);
}

// Helper functions

fn build_pipeline(
    args: &InputArgs,
) -> Result<(HealthPipeline, Arc<dyn DayCalendar>), HdayCliError> {
    let calendar: Arc<dyn DayCalendar> = match &args.utc_offset {
        Some(offset) => Arc::new(FixedOffsetCalendar::parse(offset)?),
        None => Arc::new(ZonedCalendar::from_name(&args.timezone)?),
    };

    let source: Arc<dyn SampleSource> = if args.input.to_string_lossy() == "-" {
        let format = args
            .input_format
            .map(RecordFormat::from)
            .unwrap_or(RecordFormat::Ndjson);
        let records = RecordAdapter::parse(&read_input(&args.input)?, format)?;
        Arc::new(InMemorySource::from_records(&records))
    } else {
        let mut source = FileSource::new(&args.input);
        if let Some(format) = args.input_format {
            source = source.with_format(format.into());
        }
        Arc::new(source)
    };

    let metrics = match &args.metrics {
        Some(path) => MetricMap::load(path)?,
        None => MetricMap::standard(),
    };

    let pipeline = HealthPipeline::new(source, calendar.clone()).with_metrics(metrics);
    Ok((pipeline, calendar))
}

fn build_query(
    args: &InputArgs,
    base: SampleQuery,
    calendar: &dyn DayCalendar,
) -> Result<SampleQuery, HdayCliError> {
    let from = args
        .from
        .as_deref()
        .map(|s| parse_bound(s, calendar))
        .transpose()?;
    let until = args
        .until
        .as_deref()
        .map(|s| parse_bound(s, calendar))
        .transpose()?;

    let mut query = base.between(from, until).with_order(args.order.into());
    if let Some(limit) = args.limit {
        query = query.with_limit(limit);
    }
    Ok(query)
}

/// RFC 3339 instant, or a date meaning the start of that day on `calendar`
fn parse_bound(s: &str, calendar: &dyn DayCalendar) -> Result<DateTime<Utc>, HealthError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|day| calendar.start_of_day(day))
        .map_err(|e| HealthError::DateParseError(format!("{}: {}", s, e)))
}

fn read_input(input: &Path) -> Result<String, io::Error> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        fs::read_to_string(input)
    }
}

fn format_duration(duration: Duration) -> String {
    let minutes = duration.num_minutes();
    format!("{}h {:02}m", minutes / 60, minutes % 60)
}

fn category_names() -> Vec<&'static str> {
    Category::ALL.iter().map(|c| c.as_str()).collect()
}

// Output types

#[derive(serde::Serialize)]
struct SleepRow {
    date: NaiveDate,
    time_in_bed_minutes: i64,
    time_asleep_minutes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    efficiency_pct: Option<f64>,
}

#[derive(serde::Serialize)]
struct StepRow {
    date: NaiveDate,
    steps: f64,
}

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
    record_id: Option<String>,
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
#[serde(rename_all = "lowercase")]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}

// Error types

#[derive(Debug)]
enum HdayCliError {
    Io(io::Error),
    Health(HealthError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    DoctorFailed,
    InvalidArgument(String),
}

impl From<io::Error> for HdayCliError {
    fn from(e: io::Error) -> Self {
        HdayCliError::Io(e)
    }
}

impl From<HealthError> for HdayCliError {
    fn from(e: HealthError) -> Self {
        HdayCliError::Health(e)
    }
}

impl From<serde_json::Error> for HdayCliError {
    fn from(e: serde_json::Error) -> Self {
        HdayCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<HdayCliError> for CliError {
    fn from(e: HdayCliError) -> Self {
        match e {
            HdayCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            HdayCliError::Health(e) => {
                let hint = match &e {
                    HealthError::InvalidTimezone(_) => "Use an IANA name such as Europe/Berlin",
                    HealthError::UnknownMetric(_) => "Run 'hday doctor --metrics <file>' to list metrics",
                    HealthError::UnknownCategory(_) => "Run 'hday schema' for the category list",
                    HealthError::Io(_) => "Check file paths and permissions",
                    _ => "Ensure input matches the health.sample.v1 schema",
                };
                CliError {
                    code: "HEALTH_ERROR".to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            HdayCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            HdayCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} records failed validation", count),
                hint: Some("Fix validation errors and retry".to_string()),
            },
            HdayCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            HdayCliError::InvalidArgument(msg) => CliError {
                code: "INVALID_ARGUMENT".to_string(),
                message: msg,
                hint: Some("Run with --help for usage".to_string()),
            },
        }
    }
}
