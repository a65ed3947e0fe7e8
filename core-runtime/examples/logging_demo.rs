//! Logging system demonstration
//!
//! This example shows how to use the logging infrastructure in different modes.
//!
//! Run with:
//! ```bash
//! # Pretty format (default in debug)
//! cargo run --example logging_demo
//!
//! # JSON format
//! cargo run --example logging_demo -- json
//!
//! # Compact format
//! cargo run --example logging_demo -- compact
//!
//! # With custom filter
//! cargo run --example logging_demo -- pretty "core_runtime=trace"
//! ```

use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LogLevel, LoggingConfig,
};
use std::env;
use tracing::{debug, error, info, instrument, span, trace, warn, Level};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let format = if args.len() > 1 {
        match args[1].as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Pretty,
        }
    } else {
        LogFormat::default()
    };

    let filter = args.get(2).cloned();

    // Initialize logging
    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_target(true);

    if let Some(f) = filter {
        config = config.with_filter(f);
    }

    init_logging(config).expect("Failed to initialize logging");

    info!("=== Logging System Demo ===");
    info!(format = ?format, "Logging initialized");

    // Demonstrate different log levels
    demo_log_levels();

    // Demonstrate structured logging
    demo_structured_logging();

    // Demonstrate spans for tracing
    demo_spans().await;

    // Demonstrate credential redaction
    demo_redaction();

    // Demonstrate instrumentation
    demo_instrumentation().await;

    info!("=== Demo Complete ===");
}

fn demo_log_levels() {
    let span = span!(Level::INFO, "log_levels");
    let _enter = span.enter();

    trace!("This is a TRACE level log");
    debug!("This is a DEBUG level log");
    info!("This is an INFO level log");
    warn!("This is a WARN level log");
    error!("This is an ERROR level log");
}

fn demo_structured_logging() {
    let span = span!(Level::INFO, "structured_logging");
    let _enter = span.enter();

    info!("Simple message without fields");

    info!(
        book_id = "12345",
        title = "Dune",
        duration_secs = 75600,
        "Book information"
    );

    info!(
        mapped_books = 42,
        pending_jobs = 1,
        match_rate = 0.95,
        "Engine metrics"
    );
}

async fn demo_spans() {
    let span = span!(Level::INFO, "sync_pass", kind = "progress_sync");
    let _enter = span.enter();

    info!("Starting sync pass");

    {
        let inner_span = span!(Level::DEBUG, "list_libraries");
        let _inner = inner_span.enter();

        debug!(count = 3, "Listed libraries from canonical server");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    {
        let inner_span = span!(Level::DEBUG, "sync_progress");
        let _inner = inner_span.enter();

        debug!(processed = 50, total = 150, "Syncing progress updates");
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
    }

    info!(books_synced = 150, "Sync pass completed");
}

fn demo_redaction() {
    let span = span!(Level::INFO, "credential_redaction");
    let _enter = span.enter();

    // These values will be automatically redacted by our helper
    let token = "secret_api_token_12345";
    let cookie = "_storygraph_session=abcdef";
    let path = "/home/user/.local/share/shelfsync/shelfsync.db";

    info!(
        api_token = %redact_if_sensitive("api_token", token),
        cookie = %redact_if_sensitive("session_cookie", cookie),
        database = %strip_path(path),
        "Sensitive data example"
    );

    // Best practice: Don't log sensitive values at all
    info!("Connection validated for platform");
    // Instead of: info!(api_token = token, "Connection validated")
}

#[instrument]
async fn demo_instrumentation() {
    info!("Instrumented function automatically creates spans");

    let books = vec!["Dune", "Project Hail Mary", "The Hobbit"];
    process_books(&books).await;
}

#[instrument(fields(count = books.len()))]
async fn process_books(books: &[&str]) {
    debug!("Processing books");

    for (idx, book) in books.iter().enumerate() {
        process_book(idx, book).await;
    }

    info!("All books processed");
}

#[instrument(fields(book_index = idx))]
async fn process_book(idx: usize, book: &str) {
    trace!(book = %book, "Processing individual book");
    tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
}
