// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end tests for the decode cascade, using QR codes rendered on the fly.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, GrayImage, Luma};
use qrcode::bits::Bits;
use qrcode::{EcLevel, QrCode, Version};
use scanwerk_core::error::ScanError;
use scanwerk_core::{
    DecodedCode, ResponseClass, ScanConfig, ScanRequest, ScanResponse, StrategyKind, TransformKind,
};
use scanwerk_decode::decode::reader::{primary_reader, qr_grid_reader};
use scanwerk_decode::decode::strategy::{DirectStrategy, PreprocessStrategy, SecondaryStrategy};
use scanwerk_decode::scan::standard_battery;
use scanwerk_decode::{CodeScanner, DecodeStrategy, ImageProcessor, SymbolReader};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn render_qr(payload: &[u8]) -> GrayImage {
    QrCode::new(payload)
        .expect("payload fits in a QR code")
        .render::<Luma<u8>>()
        .build()
}

/// Force a single byte-mode segment, bypassing the encoder's mode selection.
fn render_qr_byte_mode(payload: &[u8]) -> GrayImage {
    let mut bits = Bits::new(Version::Normal(1));
    bits.push_byte_data(payload).expect("payload fits in version 1");
    bits.push_terminator(EcLevel::M).expect("terminator fits");
    QrCode::with_bits(bits, EcLevel::M)
        .expect("valid QR code")
        .render::<Luma<u8>>()
        .build()
}

fn png_bytes(image: GrayImage) -> Vec<u8> {
    ImageProcessor::from_dynamic(DynamicImage::ImageLuma8(image))
        .to_png_bytes()
        .expect("PNG encoding")
}

/// Two codes side by side on one white canvas.
fn render_pair(left: &[u8], right: &[u8]) -> GrayImage {
    let a = render_qr(left);
    let b = render_qr(right);
    let gap = 40;
    let width = a.width() + gap + b.width();
    let height = a.height().max(b.height());
    let mut canvas = GrayImage::from_pixel(width, height, Luma([255u8]));
    image::imageops::overlay(&mut canvas, &a, 0, 0);
    image::imageops::overlay(&mut canvas, &b, (a.width() + gap) as i64, 0);
    canvas
}

/// Squeeze an image's gray levels into `[low, high]`.
fn squeeze_levels(image: &GrayImage, low: u8, high: u8) -> GrayImage {
    let span = (high - low) as f32 / 255.0;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let v = image.get_pixel(x, y).0[0] as f32;
        Luma([(low as f32 + v * span).round() as u8])
    })
}

fn luma_range(image: &DynamicImage) -> u8 {
    let gray = image.to_luma8();
    let min = gray.pixels().map(|p| p.0[0]).min().unwrap_or(0);
    let max = gray.pixels().map(|p| p.0[0]).max().unwrap_or(0);
    max - min
}

/// Reader that refuses images whose gray levels span less than `min_range`,
/// and otherwise answers with a real reader when one is compiled in.
struct ContrastGatedReader {
    min_range: u8,
    inner: Option<Arc<dyn SymbolReader>>,
    answer: DecodedCode,
    calls: AtomicUsize,
}

impl SymbolReader for ContrastGatedReader {
    fn name(&self) -> &'static str {
        "contrast-gated"
    }

    fn read(&self, image: &DynamicImage) -> Result<Vec<DecodedCode>, ScanError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if luma_range(image) < self.min_range {
            return Ok(Vec::new());
        }
        match &self.inner {
            Some(reader) => reader.read(image),
            None => Ok(vec![self.answer.clone()]),
        }
    }
}

// ---------------------------------------------------------------------------
// Real readers
// ---------------------------------------------------------------------------

#[cfg(feature = "rxing")]
#[test]
fn clean_qr_decodes_via_direct_strategy() {
    let png = png_bytes(render_qr(b"https://example.com"));
    let result = CodeScanner::shared().scan_bytes(&png).unwrap();

    assert_eq!(result.codes, vec![DecodedCode::qr("https://example.com")]);
    assert_eq!(result.strategy_used, Some(StrategyKind::Direct));

    let json = serde_json::to_value(ScanResponse::from_result(&result)).unwrap();
    assert_eq!(
        json,
        serde_json::json!({
            "codes": [{ "type": "QRCODE", "data": "https://example.com" }],
            "count": 1
        })
    );
}

#[cfg(any(feature = "rxing", feature = "rqrr"))]
#[test]
fn repeated_scans_are_identical() {
    let png = png_bytes(render_pair(b"first", b"second"));
    let scanner = CodeScanner::shared();
    let once = scanner.scan_bytes(&png).unwrap();
    let twice = scanner.scan_bytes(&png).unwrap();
    assert!(!once.is_empty());
    assert_eq!(once, twice);
}

#[cfg(any(feature = "rxing", feature = "rqrr"))]
#[test]
fn binary_payload_is_escaped_not_dropped() {
    let png = png_bytes(render_qr(&[0x00, 0x01, 0xFE, 0xFF, 0x80]));
    let result = CodeScanner::shared().scan_bytes(&png).unwrap();

    assert_eq!(result.count(), 1);
    assert_eq!(result.codes[0].symbol_type, "QRCODE");
    assert_eq!(result.codes[0].payload, r"\x00\x01\xfe\xff\x80");
}

#[cfg(feature = "rxing")]
#[test]
fn two_distinct_codes_are_both_reported_once() {
    let png = png_bytes(render_pair(b"https://example.com/left", b"https://example.com/right"));
    let result = CodeScanner::shared().scan_bytes(&png).unwrap();

    assert_eq!(result.count(), 2);
    let mut payloads: Vec<&str> = result.payloads().collect();
    payloads.sort_unstable();
    assert_eq!(
        payloads,
        vec!["https://example.com/left", "https://example.com/right"]
    );
}

#[cfg(feature = "rqrr")]
#[test]
fn grid_detector_alone_reads_clean_qr() {
    let reader = scanwerk_decode::decode::reader::qr_grid_reader().unwrap();
    let scanner = CodeScanner::new(vec![Box::new(SecondaryStrategy::new(reader))]);
    let result = scanner
        .scan_bytes(&png_bytes(render_qr(b"grid only")))
        .unwrap();

    assert_eq!(result.codes, vec![DecodedCode::qr("grid only")]);
    assert_eq!(result.strategy_used, Some(StrategyKind::Secondary));
}

#[cfg(any(feature = "rxing", feature = "rqrr"))]
#[test]
fn transparent_background_code_still_decodes() {
    let qr = render_qr(b"on glass");
    // Dark modules opaque, light modules fully transparent black.
    let rgba = image::RgbaImage::from_fn(qr.width(), qr.height(), |x, y| {
        if qr.get_pixel(x, y).0[0] < 128 {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([0, 0, 0, 0])
        }
    });
    let result = CodeScanner::shared().scan_image(&DynamicImage::ImageRgba8(rgba));
    assert_eq!(result.codes, vec![DecodedCode::qr("on glass")]);
}

// ---------------------------------------------------------------------------
// Cascade behaviour
// ---------------------------------------------------------------------------

#[test]
fn image_without_code_is_advisory_success() {
    let png = png_bytes(GrayImage::from_pixel(160, 120, Luma([230u8])));
    let result = CodeScanner::shared().scan_bytes(&png).unwrap();
    assert!(result.is_empty());

    let json = serde_json::to_value(ScanResponse::from_result(&result)).unwrap();
    assert_eq!(json["codes"], serde_json::json!([]));
    assert_eq!(json["count"], 0);
    assert!(json["message"].is_string());
}

#[test]
fn text_file_is_client_error() {
    let err = CodeScanner::shared()
        .scan_bytes(b"name,qty\nwidget,3\n")
        .unwrap_err();
    assert!(matches!(err, ScanError::InvalidImage(_)));

    let (response, class) = ScanResponse::from_error(&err);
    assert_eq!(class, ResponseClass::ClientError);
    assert!(response.error.is_some());
    assert!(response.codes.is_none());
}

#[test]
fn request_with_image_content_type_is_scanned() {
    let request = ScanRequest::new(
        png_bytes(GrayImage::from_pixel(32, 32, Luma([255u8]))),
        Some("image/png".into()),
    );
    assert!(CodeScanner::shared().scan_request(&request).unwrap().is_empty());
}

#[test]
fn low_contrast_code_needs_contrast_transform() {
    let faint = squeeze_levels(&render_qr(b"https://example.com/faint"), 110, 146);
    let gated = |inner: Option<Arc<dyn SymbolReader>>| {
        Arc::new(ContrastGatedReader {
            min_range: 60,
            inner,
            answer: DecodedCode::qr("https://example.com/faint"),
            calls: AtomicUsize::new(0),
        })
    };
    let primary = gated(primary_reader());
    let detector = gated(qr_grid_reader());

    let strategies: Vec<Box<dyn DecodeStrategy>> = vec![
        Box::new(DirectStrategy::new(primary.clone())),
        Box::new(SecondaryStrategy::new(detector.clone())),
        Box::new(PreprocessStrategy::new(
            standard_battery(&ScanConfig::default()),
            vec![
                primary.clone() as Arc<dyn SymbolReader>,
                detector.clone() as Arc<dyn SymbolReader>,
            ],
        )),
    ];
    let result = CodeScanner::new(strategies).scan_image(&DynamicImage::ImageLuma8(faint));

    assert_eq!(result.codes, vec![DecodedCode::qr("https://example.com/faint")]);
    assert_eq!(result.strategy_used, Some(StrategyKind::Preprocess));
    assert_eq!(result.transform_used, Some(TransformKind::Contrast));
    // Direct and the contrast variant for the primary slot; Secondary and at
    // most the contrast variant for the detector slot.
    assert_eq!(primary.calls.load(Ordering::SeqCst), 2);
    assert!((1..=2).contains(&detector.calls.load(Ordering::SeqCst)));
}

// ---------------------------------------------------------------------------
// Payload text across readers
// ---------------------------------------------------------------------------

/// Decode `image` with Direct and Secondary separately.
#[cfg(all(feature = "rxing", feature = "rqrr"))]
fn direct_and_secondary(image: GrayImage) -> (Vec<DecodedCode>, Vec<DecodedCode>) {
    let image = DynamicImage::ImageLuma8(image);
    let direct = DirectStrategy::new(primary_reader().unwrap()).attempt(&image);
    let secondary = SecondaryStrategy::new(qr_grid_reader().unwrap()).attempt(&image);
    (direct.codes, secondary.codes)
}

#[cfg(all(feature = "rxing", feature = "rqrr"))]
#[test]
fn byte_mode_shift_jis_lookalike_is_escaped_by_both_strategies() {
    let (direct, secondary) = direct_and_secondary(render_qr_byte_mode(&[0x82, 0xA0, 0x82, 0xA2]));

    assert_eq!(direct, vec![DecodedCode::qr(r"\x82\xa0\x82\xa2")]);
    assert_eq!(direct, secondary);
}

#[cfg(all(feature = "rxing", feature = "rqrr"))]
#[test]
fn kanji_mode_payload_matches_across_strategies() {
    // The encoder picks Kanji mode for these Shift_JIS byte pairs.
    for payload in [[0x82, 0xA0, 0x82, 0xA2], [0x81, 0x40, 0x9F, 0xFC]] {
        let (direct, secondary) = direct_and_secondary(render_qr(&payload));
        assert_eq!(direct.len(), 1, "{payload:02x?}");
        assert_eq!(direct, secondary, "{payload:02x?}");
    }
}

#[cfg(all(feature = "rxing", feature = "rqrr"))]
#[test]
fn byte_mode_utf8_keeps_its_text() {
    let (direct, secondary) = direct_and_secondary(render_qr_byte_mode("grüße ✓".as_bytes()));

    assert_eq!(direct, vec![DecodedCode::qr("grüße ✓")]);
    assert_eq!(direct, secondary);
}
