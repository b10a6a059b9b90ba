// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Symbol readers — the decoder backends the strategies drive.
//
// Two backends are available, each behind its own cargo feature:
//
// - `rxing` — multi-symbology reader (ZXing port). Finds every symbol in the
//   image: QR, Data Matrix, Aztec, PDF417, Code 128/39/93, EAN/UPC, ...
// - `rqrr`  — QR-only detector working from finder-pattern geometry. Copes
//   with perspective and damage differently from the multi-format reader.

use std::sync::Arc;

use image::DynamicImage;
use scanwerk_core::DecodedCode;
use scanwerk_core::error::ScanError;

/// A decoder backend.
///
/// Implementations return an empty list when the image holds no symbol they
/// can read. `Err` is reserved for the backend itself misbehaving.
pub trait SymbolReader: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    fn read(&self, image: &DynamicImage) -> Result<Vec<DecodedCode>, ScanError>;
}

/// The multi-symbology reader, when compiled in.
pub fn primary_reader() -> Option<Arc<dyn SymbolReader>> {
    #[cfg(feature = "rxing")]
    {
        Some(Arc::new(MultiFormatReader))
    }
    #[cfg(not(feature = "rxing"))]
    {
        None
    }
}

/// The QR grid detector, when compiled in.
pub fn qr_grid_reader() -> Option<Arc<dyn SymbolReader>> {
    #[cfg(feature = "rqrr")]
    {
        Some(Arc::new(QrGridReader))
    }
    #[cfg(not(feature = "rqrr"))]
    {
        None
    }
}

/// Normalise a symbology name: `QR_CODE` -> `QRCODE`, `code 128` -> `CODE128`.
pub fn normalize_symbology(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Smallest side, in pixels, an image needs before a reader is run on it.
/// Anything narrower cannot hold a symbol and trips up the rxing detectors.
pub const MIN_SYMBOL_SIDE: u32 = 8;

#[cfg(any(feature = "rxing", feature = "rqrr"))]
fn is_degenerate(image: &DynamicImage) -> bool {
    image.width() < MIN_SYMBOL_SIDE || image.height() < MIN_SYMBOL_SIDE
}

// -- rxing --------------------------------------------------------------------

#[cfg(feature = "rxing")]
pub use self::multi_format::MultiFormatReader;

#[cfg(feature = "rxing")]
mod multi_format {
    use std::collections::HashMap;

    use image::DynamicImage;
    use rxing::common::CharacterSet;
    use rxing::{
        BarcodeFormat, DecodeHintType, DecodeHintValue, Exceptions, RXingResult,
        RXingResultMetadataType, RXingResultMetadataValue,
    };
    use scanwerk_core::DecodedCode;
    use scanwerk_core::error::ScanError;
    use tracing::{debug, instrument};

    use super::{SymbolReader, is_degenerate, normalize_symbology};
    use crate::decode::text::{decode_payload, reconcile_text};

    /// Multi-symbology reader backed by `rxing`.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct MultiFormatReader;

    impl SymbolReader for MultiFormatReader {
        fn name(&self) -> &'static str {
            "rxing"
        }

        #[instrument(skip_all, fields(reader = "rxing"))]
        fn read(&self, image: &DynamicImage) -> Result<Vec<DecodedCode>, ScanError> {
            if is_degenerate(image) {
                debug!(
                    width = image.width(),
                    height = image.height(),
                    "Image too small to hold a symbol"
                );
                return Ok(Vec::new());
            }

            let luma = image.to_luma8();
            let (width, height) = luma.dimensions();

            // Byte-mode text is always rendered as ISO-8859-1, so it maps
            // one-to-one back onto the raw byte segments.
            let mut hints = HashMap::from([(
                DecodeHintType::CHARACTER_SET,
                DecodeHintValue::CharacterSet("ISO-8859-1".to_owned()),
            )]);
            let results = match rxing::helpers::detect_multiple_in_luma_with_hints(
                luma.into_raw(),
                width,
                height,
                &mut hints,
            ) {
                Ok(results) => results,
                Err(Exceptions::NotFoundException(..)) => return Ok(Vec::new()),
                Err(err) => return Err(ScanError::Reader(format!("rxing: {err}"))),
            };

            let codes: Vec<DecodedCode> = results.iter().filter_map(to_decoded_code).collect();
            debug!(found = codes.len(), "rxing pass complete");
            Ok(codes)
        }
    }

    fn to_decoded_code(result: &RXingResult) -> Option<DecodedCode> {
        let text = result.getText();
        let raw = byte_segments(result);
        let payload = match kanji_bytes(result, &raw) {
            Some(bytes) => decode_payload(&bytes),
            None => reconcile_text(text, &raw),
        };
        if payload.is_empty() {
            return None;
        }
        let symbology = normalize_symbology(&format!("{:?}", result.getBarcodeFormat()));
        Some(DecodedCode::new(symbology, payload))
    }

    /// Concatenated byte-mode segments, empty if the reader recorded none.
    fn byte_segments(result: &RXingResult) -> Vec<u8> {
        match result
            .getRXingResultMetadata()
            .get(&RXingResultMetadataType::BYTE_SEGMENTS)
        {
            Some(RXingResultMetadataValue::ByteSegments(segments)) => segments.concat(),
            _ => Vec::new(),
        }
    }

    /// Shift_JIS bytes behind a QR code's Kanji-mode text.
    ///
    /// rxing renders Kanji segments as text and keeps no bytes for them. A QR
    /// code without byte segments whose text is not plain ASCII can only hold
    /// Kanji segments (numeric and alphanumeric modes are ASCII), so encoding
    /// the text back to Shift_JIS recovers the payload bytes exactly.
    fn kanji_bytes(result: &RXingResult, raw: &[u8]) -> Option<Vec<u8>> {
        let text = result.getText();
        let is_qr = *result.getBarcodeFormat() == BarcodeFormat::QR_CODE;
        if !is_qr || !raw.is_empty() || text.is_ascii() {
            return None;
        }
        CharacterSet::Shift_JIS.encode(text).ok()
    }
}

// -- rqrr ---------------------------------------------------------------------

#[cfg(feature = "rqrr")]
pub use self::qr_grid::QrGridReader;

#[cfg(feature = "rqrr")]
mod qr_grid {
    use image::DynamicImage;
    use rqrr::PreparedImage;
    use scanwerk_core::DecodedCode;
    use scanwerk_core::error::ScanError;
    use tracing::{debug, instrument};

    use super::{SymbolReader, is_degenerate};
    use crate::decode::text::decode_payload;

    /// QR-only grid detector backed by `rqrr`. Reports at most one code.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct QrGridReader;

    impl SymbolReader for QrGridReader {
        fn name(&self) -> &'static str {
            "rqrr"
        }

        #[instrument(skip_all, fields(reader = "rqrr"))]
        fn read(&self, image: &DynamicImage) -> Result<Vec<DecodedCode>, ScanError> {
            if is_degenerate(image) {
                return Ok(Vec::new());
            }

            let luma = image.to_luma8();
            let (width, height) = luma.dimensions();

            let mut prepared =
                PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                    luma.get_pixel(x as u32, y as u32).0[0]
                });
            let grids = prepared.detect_grids();
            debug!(grids = grids.len(), "QR grids detected");

            for grid in &grids {
                let mut raw = Vec::new();
                match grid.decode_to(&mut raw) {
                    Ok(_) if !raw.is_empty() => {
                        return Ok(vec![DecodedCode::qr(decode_payload(&raw))]);
                    }
                    Ok(_) => debug!("QR grid decoded to an empty payload"),
                    Err(err) => debug!(error = %err, "QR grid failed to decode"),
                }
            }

            Ok(Vec::new())
        }
    }
}
