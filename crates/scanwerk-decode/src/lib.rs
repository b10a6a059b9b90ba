// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanwerk-decode — QR code and barcode decoding for Scanwerk.
//
// Provides image loading and enhancement (contrast, brightness, sharpness),
// the preprocessing battery (Otsu and Gaussian adaptive binarization), the
// symbol readers, and the strategy cascade that ties them together.

pub mod decode;
pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `scanwerk_decode::CodeScanner` etc.
pub use decode::CodeScanner;
pub use decode::reader::SymbolReader;
pub use decode::strategy::DecodeStrategy;
pub use image::processor::ImageProcessor;
pub use scan::enhance::Transform;
