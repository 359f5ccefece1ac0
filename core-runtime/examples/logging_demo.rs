//! Logging system demonstration
//!
//! Run with:
//! ```bash
//! cargo run -p core-runtime --example logging_demo
//! cargo run -p core-runtime --example logging_demo -- json
//! cargo run -p core-runtime --example logging_demo -- compact "core_playback=trace"
//! ```

use bridge_traits::logging::{ConsoleLogger, LogLevel};
use core_runtime::logging::{init_logging, redact_if_sensitive, LogFormat, LoggingConfig};
use std::env;
use std::sync::Arc;
use tracing::{debug, info, info_span, instrument, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), core_runtime::Error> {
    let args: Vec<String> = env::args().collect();

    let format = match args.get(1).map(String::as_str) {
        Some("json") => LogFormat::Json,
        Some("compact") => LogFormat::Compact,
        Some("pretty") => LogFormat::Pretty,
        _ => LogFormat::default(),
    };

    let mut config = LoggingConfig::default()
        .with_format(format)
        .with_level(LogLevel::Trace)
        .with_spans(true)
        .with_logger_sink(Arc::new(ConsoleLogger {
            min_level: LogLevel::Warn,
        }));

    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }

    init_logging(config)?;

    info!(target: "core_playback::demo", format = ?format, "Logging initialized");

    let session = info_span!(target: "core_playback::demo", "session", session_id = 1, track_id = "T1");
    let _entered = session.enter();

    let src = "https://cdn.example.org/audio/t1.webm?sig=abc";
    info!(
        target: "core_playback::demo",
        src = %redact_if_sensitive("src", src),
        "Opening track"
    );

    for index in 0..3u64 {
        fetch_segment(index * 262_144, (index + 1) * 262_144 - 1);
    }

    warn!(target: "core_playback::demo", "Segment request failed; mirrored to the console sink");
    Ok(())
}

#[instrument(target = "core_playback::demo", level = "debug")]
fn fetch_segment(start: u64, end: u64) {
    debug!(target: "core_playback::demo", len = end - start + 1, "Segment appended");
}
