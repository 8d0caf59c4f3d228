use crate::config::Log;
use std::error::Error;
use std::str::FromStr;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt, registry};

const LOG_FILE_PREFIX: &str = "argus";

pub fn setup_logging(cfg: &Log) -> Result<Option<WorkerGuard>, Box<dyn Error + Send + Sync>> {
    let filter = construct_env_filter(cfg);
    let stderr_layer = construct_stderr_layer(cfg);
    let (file_layer, guard) = construct_log_file_layer(cfg)?;

    Registry::default()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn construct_env_filter(cfg: &Log) -> EnvFilter {
    let mut filter = EnvFilter::builder()
        .with_default_directive(
            LevelFilter::from_str(&cfg.level)
                .unwrap_or(LevelFilter::INFO)
                .into(),
        )
        .from_env_lossy();

    for directive in &cfg.directives {
        match directive.parse() {
            Ok(directive) => {
                filter = filter.add_directive(directive);
            }

            Err(e) => {
                eprintln!("Skipping invalid log directive '{:?}': {}", directive, e);
            }
        }
    }

    filter
}

// stdout is reserved for the exposition output
fn construct_stderr_layer<S>(cfg: &Log) -> Option<Box<dyn Layer<S> + Send + Sync>>
where
    S: Subscriber + for<'a> registry::LookupSpan<'a>,
{
    if !cfg.enable_stderr {
        return None;
    }

    Some(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_level(true)
            .with_span_events(FmtSpan::NONE)
            .compact()
            .boxed(),
    )
}

fn construct_log_file_layer<S>(
    cfg: &Log,
) -> Result<
    (Option<Box<dyn Layer<S> + Send + Sync>>, Option<WorkerGuard>),
    Box<dyn Error + Send + Sync>,
>
where
    S: Subscriber + for<'a> registry::LookupSpan<'a>,
{
    if !cfg.enable_log_file {
        return Ok((None, None));
    }

    let Some(directory) = &cfg.log_file_directory else {
        eprintln!("No log file directory specified. Skipping log file configuration.");
        return Ok((None, None));
    };

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(cfg.max_log_files)
        .build(directory)
        .map_err(|e| {
            format!(
                "Failed to create file appender for directory [{}]. Error=[{}]",
                directory, e
            )
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .compact()
        .boxed();

    Ok((Some(layer), Some(guard)))
}
