// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Input Validation
//!
//! Pure syntax checks applied to operator input before anything reaches the
//! registry or the container runtime. Every check returns `bool` and never
//! panics on malformed input.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Reject bad names, ports, memory specs, versions and URLs early

use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Lowest port an operator may publish a server on.
pub const MIN_SERVER_PORT: u16 = 1024;

/// Longest accepted logical server name.
pub const MAX_SERVER_NAME_LEN: usize = 32;

// Anchored at both ends; a start-only anchor would accept "ok name!".
static SERVER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]{1,32}$").expect("static regex"));

static MEMORY_SPEC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+[GMgm]$").expect("static regex"));

static MINECRAFT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+(\.\d+)?$").expect("static regex"));

/// `true` iff `name` is 1–32 characters drawn from `[A-Za-z0-9_-]`.
pub fn validate_server_name(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_SERVER_NAME_LEN && SERVER_NAME.is_match(name)
}

/// `true` iff `port` lies in the unprivileged range `1024..=65535`.
///
/// Takes an `i64` so that out-of-range operator input (`65536`, `-1`) can be
/// rejected instead of failing to parse.
pub fn validate_port(port: i64) -> bool {
    (i64::from(MIN_SERVER_PORT)..=i64::from(u16::MAX)).contains(&port)
}

/// `true` for memory specs such as `2G` or `512m`.
pub fn validate_memory_spec(spec: &str) -> bool {
    MEMORY_SPEC.is_match(spec)
}

/// `true` for release versions such as `1.20` or `1.20.4`.
pub fn validate_minecraft_version(version: &str) -> bool {
    MINECRAFT_VERSION.is_match(version)
}

/// `true` iff `url` is an http(s) URL with a host whose path ends in `.zip`.
pub fn validate_modpack_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }

    if parsed.host_str().map_or(true, str::is_empty) {
        return false;
    }

    parsed.path().to_ascii_lowercase().ends_with(".zip")
}
