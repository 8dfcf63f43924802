// SPDX-FileCopyrightText: 2026 Tbmux Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the tbmux proxy.

use thiserror::Error;

/// The primary error type used across all tbmux crates.
#[derive(Debug, Error)]
pub enum TbmuxError {
    /// Configuration errors (invalid TOML, missing required fields, bad paths).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, query failure, bad row data).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient upstream errors: transport failures, 5xx responses,
    /// `ok:false` envelopes, malformed bodies. Callers retry with backoff.
    #[error("upstream error: {message}")]
    Upstream {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The upstream rejected a control call with a 4xx status. The auth
    /// token is almost certainly invalid, so polling terminates the process.
    #[error("upstream rejected request: HTTP {status}")]
    UpstreamFatal { status: u16 },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TbmuxError {
    /// Wraps an arbitrary error as a storage error.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TbmuxError::Storage {
            source: Box::new(source),
        }
    }

    /// Wraps an arbitrary error as a transient upstream error.
    pub fn upstream<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        TbmuxError::Upstream {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_context() {
        let err = TbmuxError::UpstreamFatal { status: 401 };
        assert_eq!(err.to_string(), "upstream rejected request: HTTP 401");

        let err = TbmuxError::storage(std::io::Error::other("disk gone"));
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn upstream_wraps_source() {
        let err = TbmuxError::upstream("poll failed", std::io::Error::other("refused"));
        assert!(err.to_string().contains("poll failed"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
