// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Command-level error taxonomy
//!
//! Every lifecycle operation returns `Result<_, ServerError>`. The variants are
//! terminal for the single command that produced them; none of them is ever
//! allowed to take the host process down.
//!
//! | Variant | Raised when | Reaches the runtime? |
//! |---------|-------------|----------------------|
//! | `Validation` | bad operator input, duplicate names | never |
//! | `NotFound` | unknown template, server or container | maybe (container) |
//! | `Permission` | role/ownership check failed | never |
//! | `Runtime` | container engine call failed | yes |
//! | `Persistence` | document write failed on a path that must report it | n/a |

use crate::domain::repository::RepositoryError;
use crate::domain::runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Permission(String),

    #[error("Error {operation} '{target}': {source}")]
    Runtime {
        operation: &'static str,
        target: String,
        #[source]
        source: RuntimeError,
    },

    #[error("Persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

impl ServerError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn permission_denied() -> Self {
        Self::Permission("You don't have permission to use this command.".to_string())
    }

    pub fn runtime(operation: &'static str, target: impl Into<String>, source: RuntimeError) -> Self {
        Self::Runtime {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Short machine-readable kind, used in logs and reply formatting.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Permission(_) => "permission",
            Self::Runtime { .. } => "runtime",
            Self::Persistence(_) => "persistence",
        }
    }

    /// Human-readable message suitable for a chat reply.
    pub fn user_message(&self) -> String {
        format!("❌ {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_error_names_operation_and_target() {
        let err = ServerError::runtime(
            "starting server",
            "survival",
            RuntimeError::OperationFailed("daemon unreachable".to_string()),
        );
        assert_eq!(err.kind(), "runtime");
        assert_eq!(
            err.user_message(),
            "❌ Error starting server 'survival': Runtime operation failed: daemon unreachable"
        );
    }

    #[test]
    fn test_permission_message() {
        let err = ServerError::permission_denied();
        assert_eq!(err.kind(), "permission");
        assert!(err.user_message().contains("don't have permission"));
    }
}
