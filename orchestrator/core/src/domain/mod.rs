// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer
//!
//! Server records, templates, the runtime contract and the pure rules
//! (validation and permissions) the lifecycle manager enforces.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Types and contracts shared by every other layer

pub mod errors;
pub mod validation;
pub mod permissions;
pub mod template;
pub mod server;
pub mod runtime;
pub mod repository;
pub mod modpack;
pub mod config;
