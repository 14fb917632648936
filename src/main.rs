//! CLI entry point for the course statistics tool.
//!
//! Loads an instructor's survey statistics from the backend, prints the
//! aggregated views, exports CSV, uploads exports to S3, and calls the
//! backend's administrative functions.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use course_stats::analyzers::view::StatsView;
use course_stats::analyzers::writetos3::upload_export;
use course_stats::config::AppConfig;
use course_stats::filters::{CourseFilter, Filters, RoundFilter, YearFilter};
use course_stats::infra::backend::{
    FunctionsClient, RestStatsClient, ShortUrlRequest, authed_client,
};
use course_stats::loader::{LoadOutcome, StatsLoader};
use course_stats::output::{append_records, export_records, print_json};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "course-stats")]
#[command(about = "Survey satisfaction statistics for training courses", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct Selection {
    /// Instructor to load (defaults to APP_INSTRUCTOR_ID)
    #[arg(short, long)]
    instructor: Option<String>,

    /// Education year, or "all"
    #[arg(long, default_value = "all")]
    year: YearFilter,

    /// Round number, "latest", or "all"
    #[arg(long, default_value = "all")]
    round: RoundFilter,

    /// Course name (case and whitespace insensitive), or "all"
    #[arg(long, default_value = "all")]
    course: CourseFilter,

    /// Merge test responses into the statistics
    #[arg(long, default_value_t = false)]
    include_test: bool,
}

impl Selection {
    fn filters(&self) -> Filters {
        Filters {
            year: self.year,
            round: self.round,
            course: self.course.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print summary metrics for the selection
    Summary {
        #[command(flatten)]
        selection: Selection,

        /// Print the full view as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print the per-round trend
    Trend {
        #[command(flatten)]
        selection: Selection,
    },
    /// Print the per-course breakdown
    Courses {
        #[command(flatten)]
        selection: Selection,
    },
    /// Print merged per-question statistics
    Questions {
        #[command(flatten)]
        selection: Selection,
    },
    /// Export the selected records to CSV
    Export {
        #[command(flatten)]
        selection: Selection,

        /// CSV file to write
        #[arg(short, long, default_value = "course_stats.csv")]
        output: PathBuf,

        /// Append to an existing file instead of replacing it
        #[arg(long, default_value_t = false)]
        append: bool,
    },
    /// Upload an exported CSV to S3
    Upload {
        /// Exported CSV file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Instructor the export belongs to
        #[arg(short, long)]
        instructor: String,

        /// S3 bucket name (e.g., "my-bucket")
        #[arg(long)]
        s3_bucket: String,

        /// Gzip compress the file before uploading
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Create a short URL for a survey
    ShortUrl {
        #[arg(long)]
        survey_id: String,

        #[arg(long)]
        original_url: Option<String>,

        #[arg(long)]
        expires_in_days: Option<u32>,
    },
    /// Delete a user account (admin only)
    DeleteUser {
        #[arg(long)]
        user_id: String,
    },
    /// Refresh the backend's materialized statistics views (admin only)
    RefreshCache,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/course_stats.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("course_stats.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive(LevelFilter::INFO.into()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(
            EnvFilter::from_env("RUST_LOG_JSON").add_directive(LevelFilter::DEBUG.into()),
        );

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().context("failed to load configuration")?;

    match cli.command {
        Commands::Summary { selection, json } => {
            let view = load_view(&config, &selection).await?;
            if json {
                print_json(&view)?;
                return Ok(());
            }
            if !view.has_data {
                info!("No survey data for this selection");
                return Ok(());
            }

            let s = &view.summary;
            info!(
                surveys = s.total_surveys,
                active = s.active_surveys,
                responses = s.total_responses,
                text_responses = s.total_text_responses,
                courses = s.course_count,
                instructors = s.instructor_count,
                avg_overall = ?s.averages.overall,
                avg_course = ?s.averages.course,
                avg_instructor = ?s.averages.instructor,
                avg_operation = ?s.averages.operation,
                last_response_at = ?s.last_response_at,
                "Summary"
            );
            let ratings: Vec<String> = view
                .rating_distribution
                .iter()
                .map(|(score, count)| format!("{score}:{count}"))
                .collect();
            info!(distribution = %ratings.join(" "), "Rating distribution");
        }
        Commands::Trend { selection } => {
            let view = load_view(&config, &selection).await?;
            for point in &view.trend {
                info!(
                    round = %point.label,
                    surveys = point.survey_count,
                    responses = point.response_count,
                    avg_overall = ?point.averages.overall,
                    "Trend point"
                );
            }
        }
        Commands::Courses { selection } => {
            let view = load_view(&config, &selection).await?;
            for course in &view.courses {
                info!(
                    course = %course.course_name,
                    rounds = course.rounds.len(),
                    instructors = course.instructor_count,
                    surveys = course.survey_count,
                    responses = course.response_count,
                    avg_overall = ?course.averages.overall,
                    "Course"
                );
            }
        }
        Commands::Questions { selection } => {
            let view = load_view(&config, &selection).await?;
            for question in &view.questions {
                info!(
                    question_id = %question.question_id,
                    question = %question.question_text,
                    answers = question.total_answers,
                    average = ?question.average,
                    text_answers = question.text_answers.len(),
                    "Question"
                );
            }
        }
        Commands::Export {
            selection,
            output,
            append,
        } => {
            let view = load_view(&config, &selection).await?;
            if append {
                append_records(&output, &view.records, selection.include_test)?;
            } else {
                export_records(&output, &view.records, selection.include_test)?;
            }
            info!(path = %output.display(), rows = view.records.len(), "Export complete");
        }
        Commands::Upload {
            input,
            instructor,
            s3_bucket,
            gzip,
        } => {
            config.context().ensure_can_view(&instructor)?;
            let aws = aws_config::load_from_env().await;
            let s3 = aws_sdk_s3::Client::new(&aws);
            let key = upload_export(&s3, &s3_bucket, &instructor, &input, gzip).await?;
            info!(bucket = %s3_bucket, key = %key, "Upload complete");
        }
        Commands::ShortUrl {
            survey_id,
            original_url,
            expires_in_days,
        } => {
            let functions = functions_client(&config)?;
            let short = functions
                .create_short_url(&ShortUrlRequest {
                    survey_id,
                    original_url,
                    expires_in_days,
                })
                .await?;
            info!(
                short_code = %short.short_code,
                short_url = ?short.short_url,
                expires_at = ?short.expires_at,
                "Short URL"
            );
        }
        Commands::DeleteUser { user_id } => {
            config.context().ensure_admin()?;
            functions_client(&config)?.delete_user(&user_id).await?;
        }
        Commands::RefreshCache => {
            config.context().ensure_admin()?;
            functions_client(&config)?.refresh_stats_cache().await?;
        }
    }

    Ok(())
}

/// Loads the selected instructor's records and derives every view from them.
#[tracing::instrument(skip_all, fields(instructor))]
async fn load_view(config: &AppConfig, selection: &Selection) -> Result<StatsView> {
    let ctx = config.context();
    let instructor = selection
        .instructor
        .clone()
        .or_else(|| config.user.instructor_id.clone())
        .context("no instructor given and APP_INSTRUCTOR_ID is not set")?;
    tracing::Span::current().record("instructor", instructor.as_str());

    ctx.ensure_can_view(&instructor)?;

    let http = authed_client(config, &ctx)?;
    let source = RestStatsClient::new(http, &config.backend_url, &config.stats_view);
    let loader = StatsLoader::new(source);

    match loader.load(&instructor).await {
        LoadOutcome::Loaded(count) => info!(records = count, "Records loaded"),
        LoadOutcome::Failed(error) => bail!("failed to load statistics: {error}"),
        LoadOutcome::Superseded => warn!("Load superseded"),
    }

    let records = loader.snapshot().records;
    Ok(StatsView::build(
        &records,
        &selection.filters(),
        selection.include_test,
    ))
}

fn functions_client(
    config: &AppConfig,
) -> Result<FunctionsClient<course_stats::infra::backend::AuthedClient>> {
    let http = authed_client(config, &config.context())?;
    Ok(FunctionsClient::new(http, &config.functions_url))
}
