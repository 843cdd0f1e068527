// SPDX-FileCopyrightText: (C) 2024 Graylog SDK Contributors
// SPDX-License-Identifier: MIT

//! Client for the Graylog search API.
//!
//! Two protocols are supported: the legacy `search/universal/absolute`
//! endpoints ([`legacy::LegacyGraylogSearch`]) and the views search API
//! ([`search::GraylogSearch`]), where requests are assembled from typed
//! builders and the results decoded back into typed values.

// Clippy suppressions.
#![allow(clippy::needless_return)]
#![allow(clippy::redundant_field_names)]

pub mod client;
pub mod config;
pub mod datetime;
pub mod error;
pub mod legacy;
pub mod logger;
pub mod page;
pub(crate) mod prelude;
pub mod querystring;
pub mod search;
pub mod version;

pub use client::{Client, ClientBuilder, Transport};
pub use error::{BuildError, GraylogError, Result};
pub use legacy::LegacyGraylogSearch;
pub use page::Page;
pub use querystring::GraylogQuery;
pub use search::GraylogSearch;
