// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command surface tests: parse a chat line, run it, inspect the replies.

mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use blockyard_core::presentation::{CommandHandler, Reply, ReplySink};
use common::{admin, nobody, Harness};
use tokio::time::Instant;

#[derive(Default)]
struct CollectingSink {
    replies: Mutex<Vec<(Reply, Instant)>>,
}

impl CollectingSink {
    fn texts(&self) -> Vec<String> {
        self.replies
            .lock()
            .unwrap()
            .iter()
            .map(|(r, _)| r.to_string())
            .collect()
    }

    fn clear(&self) {
        self.replies.lock().unwrap().clear();
    }
}

#[async_trait]
impl ReplySink for CollectingSink {
    async fn send(&self, reply: Reply) -> anyhow::Result<()> {
        self.replies.lock().unwrap().push((reply, Instant::now()));
        Ok(())
    }
}

async fn setup() -> (Harness, CommandHandler, Arc<CollectingSink>) {
    let h = Harness::new().await;
    let handler = CommandHandler::new(h.service.clone(), &h.config.logs);
    (h, handler, Arc::new(CollectingSink::default()))
}

#[tokio::test]
async fn test_create_and_list_replies() {
    let (_h, handler, sink) = setup().await;

    let task = handler
        .handle_line(&admin(), "!create_server survival vanilla", sink.clone())
        .await;
    assert!(task.is_none());
    let texts = sink.texts();
    assert_eq!(texts.len(), 1);
    assert!(texts[0].contains("Server Created"));
    assert!(texts[0].contains("auto"));

    sink.clear();
    handler.handle_line(&admin(), "!list_servers", sink.clone()).await;
    let texts = sink.texts();
    assert!(texts[0].contains("🟢 survival"));
    assert!(texts[0].contains("Template: vanilla"));
}

#[tokio::test]
async fn test_templates_listing_shows_type_and_memory() {
    let (_h, handler, sink) = setup().await;

    handler.handle_line(&admin(), "!list_templates", sink.clone()).await;
    let text = &sink.texts()[0];
    assert!(text.contains("Available Server Templates"));
    assert!(text.contains("Type: FABRIC"));
    assert!(text.contains("Memory: 2G"));
}

#[tokio::test]
async fn test_errors_become_failure_replies() {
    let (_h, handler, sink) = setup().await;

    handler.handle_line(&admin(), "!remove_server ghost", sink.clone()).await;
    handler.handle_line(&nobody(), "!list_servers", sink.clone()).await;
    handler.handle_line(&admin(), "!explode", sink.clone()).await;

    let texts = sink.texts();
    assert_eq!(texts[0], "❌ Server 'ghost' not found.");
    assert!(texts[1].starts_with("❌ You don't have permission"));
    assert_eq!(texts[2], "❌ Unknown command 'explode'");
}

#[tokio::test]
async fn test_logs_over_limit_reply() {
    let (_h, handler, sink) = setup().await;
    handler
        .handle_line(&admin(), "!create_server survival vanilla", sink.clone())
        .await;
    sink.clear();

    let task = handler
        .handle_line(&admin(), "!server_logs survival 150", sink.clone())
        .await;
    assert!(task.is_none());
    assert_eq!(sink.texts(), vec!["❌ Maximum 100 lines allowed".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_long_logs_are_chunked_and_paced() {
    let (h, handler, sink) = setup().await;
    handler
        .handle_line(&admin(), "!create_server survival vanilla", sink.clone())
        .await;
    sink.clear();

    let line = "[12:00:00] [Server thread/INFO]: Preparing spawn area: 42%\n";
    h.runtime.set_logs(line.repeat(80));

    let task = handler
        .handle_line(&admin(), "!server_logs survival 80", sink.clone())
        .await
        .expect("log delivery task");
    let delivered = task.await.unwrap();

    let expected_chunks = (line.len() * 80).div_ceil(1900);
    assert_eq!(delivered, expected_chunks);

    let replies = sink.replies.lock().unwrap();
    // header plus one fenced reply per chunk
    assert_eq!(replies.len(), expected_chunks + 1);
    assert!(replies[0].0.to_string().contains("Last 80 lines of 'survival'"));

    let mut rebuilt = String::new();
    for (reply, _) in &replies[1..] {
        let text = reply.to_string();
        assert!(text.starts_with("```\n") && text.ends_with("\n```"));
        let body = &text[4..text.len() - 4];
        assert!(body.chars().count() <= 1900);
        rebuilt.push_str(body);
    }
    assert_eq!(rebuilt, line.repeat(80));

    for pair in replies[1..].windows(2) {
        assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(1));
    }
}

#[tokio::test]
async fn test_empty_logs_reply() {
    let (_h, handler, sink) = setup().await;
    handler
        .handle_line(&admin(), "!create_server survival vanilla", sink.clone())
        .await;
    sink.clear();

    let task = handler
        .handle_line(&admin(), "!server_logs survival", sink.clone())
        .await;
    assert!(task.is_none());
    assert_eq!(sink.texts(), vec!["No logs available for 'survival'.".to_string()]);
}

#[tokio::test]
async fn test_status_reply_includes_memory() {
    let (_h, handler, sink) = setup().await;
    handler
        .handle_line(&admin(), "!create_server survival vanilla", sink.clone())
        .await;
    sink.clear();

    handler.handle_line(&admin(), "!server_status survival", sink.clone()).await;
    let text = &sink.texts()[0];
    assert!(text.contains("Server Status: survival"));
    assert!(text.contains("512.3 MB / 2048.0 MB"));
    assert!(text.contains("Created by:\n  steve"));
}
