// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Scanwerk code scanner.

use serde::{Deserialize, Serialize};

/// One recognised symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecodedCode {
    /// Symbology as reported by the reader, e.g. `QRCODE` or `CODE128`.
    #[serde(rename = "type")]
    pub symbol_type: String,
    /// Decoded text content. Never empty once part of a result.
    #[serde(rename = "data")]
    pub payload: String,
}

impl DecodedCode {
    pub fn new(symbol_type: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            symbol_type: symbol_type.into(),
            payload: payload.into(),
        }
    }

    /// Shorthand for a QR code, the only symbology the grid detector reports.
    pub fn qr(payload: impl Into<String>) -> Self {
        Self::new(QR_SYMBOL_TYPE, payload)
    }
}

/// Symbology name used for QR codes.
pub const QR_SYMBOL_TYPE: &str = "QRCODE";

/// The decoding approaches of the cascade, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Multi-symbology reader on the unmodified image.
    Direct,
    /// QR-only grid detector on the unmodified image.
    Secondary,
    /// Both readers retried against a battery of enhanced variants.
    Preprocess,
}

impl StrategyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Direct => "direct",
            StrategyKind::Secondary => "secondary",
            StrategyKind::Preprocess => "preprocess",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Image transforms of the preprocessing battery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    Contrast,
    OtsuThreshold,
    AdaptiveThreshold,
    Sharpen,
    Brightness,
}

impl TransformKind {
    /// The standard battery, in the order it is applied.
    pub const BATTERY: [TransformKind; 5] = [
        TransformKind::Contrast,
        TransformKind::OtsuThreshold,
        TransformKind::AdaptiveThreshold,
        TransformKind::Sharpen,
        TransformKind::Brightness,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Contrast => "contrast",
            TransformKind::OtsuThreshold => "otsu_threshold",
            TransformKind::AdaptiveThreshold => "adaptive_threshold",
            TransformKind::Sharpen => "sharpen",
            TransformKind::Brightness => "brightness",
        }
    }
}

impl std::fmt::Display for TransformKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeResult {
    /// Unique codes in discovery order.
    pub codes: Vec<DecodedCode>,
    /// Strategy that produced the first non-empty result, if any.
    pub strategy_used: Option<StrategyKind>,
    /// Transform that made the preprocessing strategy succeed.
    pub transform_used: Option<TransformKind>,
}

impl DecodeResult {
    /// A result with no codes — a valid image without a readable symbol.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate over the decoded payloads.
    pub fn payloads(&self) -> impl Iterator<Item = &str> {
        self.codes.iter().map(|code| code.payload.as_str())
    }
}

/// An uploaded image as handed over by the request layer.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Raw encoded image bytes.
    pub bytes: Vec<u8>,
    /// Declared MIME type, if the transport supplied one.
    pub content_type: Option<String>,
}

impl ScanRequest {
    pub fn new(bytes: Vec<u8>, content_type: Option<String>) -> Self {
        Self {
            bytes,
            content_type,
        }
    }

    /// Whether the declared content type marks the upload as an image.
    pub fn declares_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|mime| mime.trim().to_ascii_lowercase().starts_with("image/"))
    }
}
