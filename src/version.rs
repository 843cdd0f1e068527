// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

use std::sync::OnceLock;

use crate::prelude::*;

pub const VERSION: &str = std::env!("CARGO_PKG_VERSION");
pub const TARGET: Option<&str> = std::option_env!("TARGET");
pub const BUILD_REV: Option<&str> = std::option_env!("BUILD_REV");

pub fn version() -> &'static str {
    VERSION
}

pub fn target() -> &'static str {
    TARGET.unwrap_or("unknown")
}

pub fn build_rev() -> &'static str {
    BUILD_REV.map(str::trim).unwrap_or("unknown")
}

/// Value sent in the X-Requested-By header.
pub fn user_agent() -> String {
    format!("graylog-sdk/{}", VERSION)
}

pub fn log_version() {
    debug!(
        "This is graylog-search version {} (rev: {}); {}",
        version(),
        build_rev(),
        target(),
    );
}

pub fn long_version() -> &'static str {
    static LONG_VERSION: OnceLock<String> = OnceLock::new();
    LONG_VERSION.get_or_init(|| format!("{} (rev {}); {}", version(), build_rev(), target()))
}
