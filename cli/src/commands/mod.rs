// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Blockyard CLI

pub mod config;
pub mod console;
pub mod templates;

pub use self::config::ConfigCommand;
pub use self::console::ConsoleArgs;
pub use self::templates::TemplatesCommand;
