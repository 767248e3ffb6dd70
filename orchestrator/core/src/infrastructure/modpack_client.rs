// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Modpack HTTP Client
//!
//! `reqwest`-backed [`ModpackSource`]. HEAD requests carry their own short
//! timeout; downloads use a longer one and are streamed so that an archive
//! over the size cap is abandoned as soon as the cap is crossed.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE, LAST_MODIFIED};
use reqwest::Client;
use std::time::Duration;
use crate::domain::modpack::{ModpackError, ModpackHead, ModpackSource};

pub struct HttpModpackSource {
    client: Client,
    head_timeout: Duration,
    download_timeout: Duration,
}

impl HttpModpackSource {
    pub fn new(head_timeout: Duration, download_timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            head_timeout,
            download_timeout,
        }
    }

    fn map_error(url: &str, timeout: Duration, err: reqwest::Error) -> ModpackError {
        if err.is_timeout() {
            ModpackError::Timeout {
                url: url.to_string(),
                seconds: timeout.as_secs(),
            }
        } else {
            ModpackError::Request {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }
}

fn header_str(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ModpackSource for HttpModpackSource {
    async fn head(&self, url: &str) -> Result<ModpackHead, ModpackError> {
        let response = self
            .client
            .head(url)
            .timeout(self.head_timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(url, self.head_timeout, e))?;

        Ok(ModpackHead {
            status: response.status().as_u16(),
            content_type: header_str(&response, CONTENT_TYPE),
            content_disposition: header_str(&response, CONTENT_DISPOSITION),
            content_length: header_str(&response, CONTENT_LENGTH).and_then(|v| v.parse().ok()),
            last_modified: header_str(&response, LAST_MODIFIED),
        })
    }

    async fn download(&self, url: &str, max_bytes: u64) -> Result<Bytes, ModpackError> {
        let response = self
            .client
            .get(url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| Self::map_error(url, self.download_timeout, e))?;

        if !response.status().is_success() {
            return Err(ModpackError::Request {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(ModpackError::TooLarge {
                url: url.to_string(),
                limit: max_bytes,
            });
        }

        let mut body = BytesMut::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Self::map_error(url, self.download_timeout, e))?;
            if (body.len() + chunk.len()) as u64 > max_bytes {
                return Err(ModpackError::TooLarge {
                    url: url.to_string(),
                    limit: max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body.freeze())
    }
}
