use anyhow::{Context, Result};
use chrono::Local;
use std::path::Path;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_FILTER: &str = "warn,surf_agent=info,surf_chat=info";

/// Console logging, plus a file under `log_dir` when one is given.
///
/// - plain layer: only `target: "plain"` events, printed bare (narration)
/// - rich layer: everything else, filtered by `RUST_LOG`
/// - file layer: no ANSI, `surf-agent_<timestamp>.log`
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// life of the process.
pub(crate) fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let plain_fmt = tracing_subscriber::fmt::format()
        .without_time()
        .with_level(false)
        .with_target(false)
        .compact();
    let plain_layer = tracing_subscriber::fmt::layer()
        .event_format(plain_fmt)
        .with_filter(Targets::new().with_target("plain", LevelFilter::TRACE));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let rich_layer = tracing_subscriber::fmt::layer().with_filter(filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating log directory {}", dir.display()))?;
            let file_name = format!("surf-agent_{}.log", Local::now().format("%Y%m%d_%H%M%S"));
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let file_filter = EnvFilter::new("info")
                .add_directive("surf_agent=debug".parse()?)
                .add_directive("surf_chat=debug".parse()?);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(plain_layer)
        .with(rich_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(guard)
}
