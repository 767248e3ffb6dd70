// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::warn;

/// Destination for long output that must be split into several messages.
#[async_trait]
pub trait ChunkSink: Send + Sync {
    async fn send_chunk(&self, chunk: String) -> anyhow::Result<()>;
}

/// Split `text` into consecutive pieces of at most `max_chars` characters.
///
/// Splits on character boundaries, never inside a multi-byte code point.
/// Empty input yields no chunks.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;

    for c in text.chars() {
        if count == max_chars {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(c);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Deliver chunks in order on a background task, pausing `delay` between
/// consecutive sends. A failed send is logged and delivery stops.
pub fn deliver_paced(
    sink: Arc<dyn ChunkSink>,
    chunks: Vec<String>,
    delay: Duration,
) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut delivered = 0;
        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = sink.send_chunk(chunk).await {
                warn!(index, "Failed to deliver output chunk: {}", e);
                break;
            }
            delivered += 1;
        }
        delivered
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(String, Instant)>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl ChunkSink for RecordingSink {
        async fn send_chunk(&self, chunk: String) -> anyhow::Result<()> {
            let mut sent = self.sent.lock().await;
            if Some(sent.len()) == self.fail_after {
                anyhow::bail!("channel closed");
            }
            sent.push((chunk, Instant::now()));
            Ok(())
        }
    }

    #[test]
    fn test_chunk_text_sizes() {
        let text = "a".repeat(4000);
        let chunks = chunk_text(&text, 1900);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].len(), 1900);
        assert_eq!(chunks[1].len(), 1900);
        assert_eq!(chunks[2].len(), 200);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunk_text_respects_char_boundaries() {
        let text = "é".repeat(5);
        let chunks = chunk_text(&text, 2);
        assert_eq!(chunks, vec!["éé", "éé", "é"]);
    }

    #[test]
    fn test_chunk_text_empty() {
        assert!(chunk_text("", 1900).is_empty());
        assert_eq!(chunk_text("short", 1900), vec!["short"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_delivery_keeps_order_and_spacing() {
        let sink = Arc::new(RecordingSink::default());
        let chunks = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let delivered = deliver_paced(sink.clone(), chunks, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(delivered, 3);

        let sent = sink.sent.lock().await;
        let texts: Vec<&str> = sent.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
        for pair in sent.windows(2) {
            assert!(pair[1].1 - pair[0].1 >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_paced_delivery_stops_on_failure() {
        let sink = Arc::new(RecordingSink {
            fail_after: Some(1),
            ..Default::default()
        });
        let chunks = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let delivered = deliver_paced(sink.clone(), chunks, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(delivered, 1);
    }
}
