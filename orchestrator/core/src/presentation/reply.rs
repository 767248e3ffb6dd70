// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use std::fmt;
use async_trait::async_trait;
use crate::domain::errors::ServerError;
use crate::domain::server::ServerStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedColor {
    Blue,
    Green,
    Orange,
    Red,
}

impl EmbedColor {
    pub fn for_status(status: ServerStatus) -> Self {
        match status {
            ServerStatus::Running => Self::Green,
            ServerStatus::Created => Self::Blue,
            ServerStatus::Stopped => Self::Orange,
            ServerStatus::NotFound | ServerStatus::Error => Self::Red,
        }
    }

    /// RGB value as chat platforms expect it.
    pub fn rgb(self) -> u32 {
        match self {
            Self::Blue => 0x3498db,
            Self::Green => 0x2ecc71,
            Self::Orange => 0xe67e22,
            Self::Red => 0xe74c3c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub title: String,
    pub description: Option<String>,
    pub color: EmbedColor,
    pub fields: Vec<EmbedField>,
}

impl Embed {
    pub fn new(title: impl Into<String>, color: EmbedColor) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }
}

/// A formatted payload for the chat gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Embed(Embed),
}

impl Reply {
    pub fn text(message: impl Into<String>) -> Self {
        Self::Text(message.into())
    }

    pub fn success(message: impl AsRef<str>) -> Self {
        Self::Text(format!("✅ {}", message.as_ref()))
    }

    pub fn failure(err: &ServerError) -> Self {
        Self::Text(err.user_message())
    }

    pub fn code_block(content: &str) -> Self {
        Self::Text(format!("```\n{}\n```", content))
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Embed(embed) => {
                writeln!(f, "== {} ==", embed.title)?;
                if let Some(description) = &embed.description {
                    writeln!(f, "{}", description)?;
                }
                for field in &embed.fields {
                    writeln!(f, "{}:", field.name)?;
                    for line in field.value.lines() {
                        writeln!(f, "  {}", line)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// Where replies for one command invocation go.
#[async_trait]
pub trait ReplySink: Send + Sync {
    async fn send(&self, reply: Reply) -> anyhow::Result<()>;
}
