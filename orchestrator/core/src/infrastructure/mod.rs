// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod repositories;
pub mod runtime;
pub mod modpack_client;

pub use modpack_client::HttpModpackSource;
pub use repositories::{InMemoryDocumentStore, JsonFileStore};
pub use runtime::DockerRuntime;
