// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Scanwerk.

use thiserror::Error;

/// Top-level error type for all Scanwerk operations.
///
/// Only the input errors (`InvalidImage`, `UnsupportedContentType`) ever cross
/// the scanner boundary. `TransformFailure` and `Reader` are raised inside the
/// cascade and absorbed there.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Input errors --
    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    // -- Cascade internals --
    #[error("image transform failed: {0}")]
    TransformFailure(String),

    #[error("symbol reader failed: {0}")]
    Reader(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScanError {
    /// Whether the error was caused by the caller's input rather than by the
    /// scanner itself.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScanError::InvalidImage(_) | ScanError::UnsupportedContentType(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
