// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable messages and the response envelope handed to the transport.
//
// Every scanner outcome is mapped to plain English and a response class. A
// valid image without a readable code is a success with an advisory message,
// never an error.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::types::{DecodeResult, DecodedCode};

/// Advisory attached to a successful scan that found nothing.
pub const NO_CODE_ADVISORY: &str =
    "No QR codes or barcodes found in the image. Please ensure the code is clear and well-lit.";

/// Response class the transport should map to a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseClass {
    /// The request was handled, with or without codes.
    Success,
    /// The caller sent something we cannot scan.
    ClientError,
    /// Something broke on our side.
    ServerError,
}

impl ResponseClass {
    pub fn http_status(&self) -> u16 {
        match self {
            ResponseClass::Success => 200,
            ResponseClass::ClientError => 400,
            ResponseClass::ServerError => 500,
        }
    }
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary, shown to the uploader.
    pub message: String,
    /// What the uploader should try next.
    pub suggestion: String,
    /// How the transport should classify the failure.
    pub class: ResponseClass,
}

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        ScanError::InvalidImage(_) => HumanError {
            message: "Invalid image file. Please upload a valid image (JPG, PNG, etc.)".into(),
            suggestion: "Take a new photo or screenshot of the code and upload that instead.".into(),
            class: ResponseClass::ClientError,
        },

        ScanError::UnsupportedContentType(mime) => HumanError {
            message: "File must be an image.".into(),
            suggestion: format!("Upload a JPG, PNG, BMP or similar picture. (Received: {mime})"),
            class: ResponseClass::ClientError,
        },

        ScanError::TransformFailure(detail) | ScanError::Reader(detail) => HumanError {
            message: "An error occurred while processing the image.".into(),
            suggestion: format!("Try again with a different picture. ({detail})"),
            class: ResponseClass::ServerError,
        },

        ScanError::Config(detail) => HumanError {
            message: "The scanner is misconfigured.".into(),
            suggestion: format!("Check the scanner settings file. ({detail})"),
            class: ResponseClass::ServerError,
        },

        ScanError::Io(io_err) => HumanError {
            message: "The image could not be read.".into(),
            suggestion: format!("Check the file exists and is readable. ({io_err})"),
            class: ResponseClass::ServerError,
        },

        ScanError::Serialization(json_err) => HumanError {
            message: "The scanner settings could not be read.".into(),
            suggestion: format!("Check the settings file is valid JSON. ({json_err})"),
            class: ResponseClass::ServerError,
        },
    }
}

/// JSON envelope returned to the uploader.
///
/// Success: `{ "codes": [...], "count": n }`, plus `"message"` when nothing
/// was found. Failure: `{ "error": "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codes: Option<Vec<DecodedCode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanResponse {
    /// Wrap a scan outcome. An empty outcome still counts as success.
    pub fn from_result(result: &DecodeResult) -> Self {
        let message = result.is_empty().then(|| NO_CODE_ADVISORY.to_string());
        Self {
            codes: Some(result.codes.clone()),
            count: Some(result.count()),
            message,
            error: None,
        }
    }

    /// Wrap a failure, returning the envelope and its response class.
    pub fn from_error(err: &ScanError) -> (Self, ResponseClass) {
        let human = humanize_error(err);
        let response = Self {
            codes: None,
            count: None,
            message: None,
            error: Some(human.message),
        };
        (response, human.class)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
