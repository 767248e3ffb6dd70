// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Blockyard core
//!
//! Provisions, supervises, and tears down game-server containers on behalf of
//! chat operators.
//!
//! # Architecture
//!
//! - **Domain:** records, templates, validation, permissions, runtime contract
//! - **Application:** the lifecycle manager, modpack resolver, log delivery
//! - **Infrastructure:** Docker runtime, JSON documents, modpack HTTP client
//! - **Presentation:** chat command surface and reply formatting

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
