//! Logging and tracing configuration
//!
//! Diagnostics go to stderr so they never interleave with the progress
//! lines printed on stdout. A run can additionally mirror everything into
//! a plain-text file.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing for the CLI (stderr logging)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate (DEBUG with `verbose`), WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(stderr_layer())
        .init();
}

/// Initialize tracing for a suite run, optionally mirrored to `run_log`
///
/// The returned guard must be held until the run finishes so buffered
/// lines are flushed to the file.
pub fn init_run(verbose: bool, run_log: Option<&Path>) -> Option<WorkerGuard> {
    let Some(path) = run_log else {
        init_cli(verbose);
        return None;
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let file_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "smoke-run.log".into());

    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Warning: Could not create run log directory: {}", e);
        init_cli(verbose);
        return None;
    }

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(file_layer)
        .with(stderr_layer())
        .init();

    Some(guard)
}

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("smoke=debug,warn")
        } else {
            EnvFilter::new("smoke=info,warn")
        }
    })
}

fn stderr_layer<S>() -> impl tracing_subscriber::Layer<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
}
