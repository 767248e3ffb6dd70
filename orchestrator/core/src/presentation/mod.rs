// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`blockyard-core`)
//!
//! Chat command surface that translates operator commands into lifecycle
//! service calls. No business logic lives here; all real work is delegated to
//! `crate::application`.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`commands`] | `!command` parsing, dispatch, paced log delivery |
//! | [`reply`] | Reply payloads (text, embeds) and the sink they are sent to |

pub mod commands;
pub mod reply;

pub use commands::{Command, CommandError, CommandHandler};
pub use reply::{Embed, EmbedColor, EmbedField, Reply, ReplySink};
