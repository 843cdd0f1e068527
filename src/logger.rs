// SPDX-License-Identifier: MIT
//
// Copyright (C) 2024 Graylog SDK Contributors

use std::sync::OnceLock;

use time::macros::format_description;
use time::UtcOffset;
use tracing::Level;
use tracing_subscriber::fmt::time::OffsetTime;

static OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Capture the local UTC offset. Must be called before any threads are
/// started as the lookup is not reliable after that on some platforms.
pub fn init_offset() {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    let _ = OFFSET.set(offset);
}

pub fn init_logger(level: Level) {
    let level = match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    };

    let offset = OFFSET.get().copied().unwrap_or(UtcOffset::UTC);
    let timer = OffsetTime::new(
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"),
    );

    let builder = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(format!("{level},hyper=off,hyper_util=off,rustls=off"))
        .with_writer(std::io::stderr)
        .with_timer(timer);

    #[cfg(target_os = "windows")]
    let builder = builder.with_ansi(false);

    // Only fails if a subscriber was already installed, which is fine.
    let _ = tracing::subscriber::set_global_default(builder.finish());
}

/// Map the number of -v flags to a log level.
pub fn level_from_verbosity(verbosity: u8) -> Level {
    if verbosity > 1 {
        Level::TRACE
    } else if verbosity > 0 {
        Level::DEBUG
    } else {
        Level::INFO
    }
}
