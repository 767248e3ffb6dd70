// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod delivery;
pub mod lifecycle;
pub mod modpack;
pub mod registry;
pub mod server;
pub mod templates;

// Re-export use cases for convenience
pub use delivery::{chunk_text, deliver_paced, ChunkSink};
pub use lifecycle::StandardServerLifecycleService;
pub use modpack::{extract_metadata, ModpackResolver};
pub use registry::ServerRegistry;
pub use server::{
    CreateServerRequest, CreatedServer, LogOutput, MemoryUsage, ServerDetails,
    ServerLifecycleService, ServerSummary, TemplateSummary,
};
pub use templates::TemplateStore;
