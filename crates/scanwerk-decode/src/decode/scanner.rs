// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Code scanner — runs the strategy cascade over an uploaded image.

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use image::DynamicImage;
use scanwerk_core::error::ScanError;
use scanwerk_core::{DecodeResult, DecodedCode, ScanConfig, ScanRequest, StrategyKind};
use tracing::{debug, info, instrument};

use crate::decode::reader::{SymbolReader, primary_reader, qr_grid_reader};
use crate::decode::strategy::{
    DecodeStrategy, DirectStrategy, PreprocessStrategy, SecondaryStrategy,
};
use crate::image::processor::ImageProcessor;
use crate::scan::enhance::standard_battery;

/// Decodes QR codes and barcodes from images.
///
/// Holds an ordered list of strategies and tries them in turn until one finds
/// at least one code. Later strategies are never run once an earlier one has
/// succeeded. The scanner keeps no state between calls and can be shared
/// across threads.
///
/// ```ignore
/// let result = CodeScanner::shared().scan_bytes(&upload)?;
/// for code in &result.codes {
///     println!("{}: {}", code.symbol_type, code.payload);
/// }
/// ```
pub struct CodeScanner {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl CodeScanner {
    // -- Construction ---------------------------------------------------------

    /// Build a scanner from an explicit cascade, tried in the given order.
    pub fn new(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build the standard Direct -> Secondary -> Preprocess cascade from the
    /// readers compiled into this build.
    ///
    /// A strategy whose reader is unavailable (or that `config` disables) is
    /// left out of the list; the cascade itself does not care why.
    #[instrument(skip_all)]
    pub fn with_available_strategies(config: &ScanConfig) -> Self {
        let primary = primary_reader();
        let detector = qr_grid_reader();
        let mut strategies: Vec<Box<dyn DecodeStrategy>> = Vec::new();

        if let Some(reader) = &primary {
            strategies.push(Box::new(DirectStrategy::new(Arc::clone(reader))));
        }
        if let Some(reader) = detector.as_ref().filter(|_| config.enable_secondary) {
            strategies.push(Box::new(SecondaryStrategy::new(Arc::clone(reader))));
        }

        let readers: Vec<Arc<dyn SymbolReader>> =
            primary.iter().chain(detector.iter()).cloned().collect();
        if config.enable_preprocess && !readers.is_empty() {
            strategies.push(Box::new(PreprocessStrategy::new(
                standard_battery(config),
                readers,
            )));
        }

        let scanner = Self::new(strategies);
        info!(strategies = ?scanner.strategy_kinds(), "Code scanner ready");
        scanner
    }

    /// Process-wide scanner with the default configuration, built on first use.
    pub fn shared() -> &'static CodeScanner {
        static SHARED: OnceLock<CodeScanner> = OnceLock::new();
        SHARED.get_or_init(|| CodeScanner::with_available_strategies(&ScanConfig::default()))
    }

    // -- Accessors ------------------------------------------------------------

    /// The cascade, in the order it is tried.
    pub fn strategy_kinds(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    // -- Scanning -------------------------------------------------------------

    /// Scan an upload, checking its declared content type first.
    #[instrument(skip_all, fields(content_type = ?request.content_type, data_len = request.bytes.len()))]
    pub fn scan_request(&self, request: &ScanRequest) -> Result<DecodeResult, ScanError> {
        if !request.declares_image() {
            let declared = request.content_type.clone().unwrap_or_else(|| "none".into());
            return Err(ScanError::UnsupportedContentType(declared));
        }
        self.scan_bytes(&request.bytes)
    }

    /// Scan encoded image bytes (JPEG, PNG, BMP, ...).
    ///
    /// Fails only with [`ScanError::InvalidImage`] when the bytes are not an
    /// image. An image without any readable code is an empty result.
    #[instrument(skip_all, fields(data_len = data.len()))]
    pub fn scan_bytes(&self, data: &[u8]) -> Result<DecodeResult, ScanError> {
        let image = ImageProcessor::from_bytes(data)?.into_dynamic();
        Ok(self.scan_image(&image))
    }

    /// Scan an already-decoded image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn scan_image(&self, image: &DynamicImage) -> DecodeResult {
        let canonical = ImageProcessor::from_dynamic(image.clone())
            .to_canonical_rgb()
            .into_dynamic();

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let attempt = strategy.attempt(&canonical);
            if attempt.codes.is_empty() {
                debug!(strategy = %kind, "Strategy found nothing");
                continue;
            }

            let codes = dedup_by_payload(attempt.codes);
            info!(
                strategy = %kind,
                transform = ?attempt.transform,
                found = codes.len(),
                "Codes decoded"
            );
            return DecodeResult {
                codes,
                strategy_used: Some(kind),
                transform_used: attempt.transform,
            };
        }

        info!("No code found in image");
        DecodeResult::empty()
    }
}

/// Keep the first code for every distinct payload, preserving discovery order.
/// Empty payloads are dropped.
fn dedup_by_payload(codes: Vec<DecodedCode>) -> Vec<DecodedCode> {
    let mut seen = HashSet::new();
    codes
        .into_iter()
        .filter(|code| !code.payload.is_empty() && seen.insert(code.payload.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::strategy::Attempt;
    use image::{GrayImage, Luma, RgbImage};
    use scanwerk_core::TransformKind;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Strategy with a canned attempt and a call counter.
    struct CountingStrategy {
        kind: StrategyKind,
        attempt: Attempt,
        calls: Arc<AtomicUsize>,
    }

    impl DecodeStrategy for CountingStrategy {
        fn kind(&self) -> StrategyKind {
            self.kind
        }

        fn attempt(&self, _image: &DynamicImage) -> Attempt {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.attempt.clone()
        }
    }

    fn counting(kind: StrategyKind, attempt: Attempt) -> (Box<dyn DecodeStrategy>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let strategy = CountingStrategy {
            kind,
            attempt,
            calls: Arc::clone(&calls),
        };
        (Box::new(strategy), calls)
    }

    fn blank() -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_pixel(16, 16, Luma([255u8])))
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_order() {
        let codes = vec![
            DecodedCode::qr("a"),
            DecodedCode::new("CODE128", "b"),
            DecodedCode::new("CODE128", "a"),
            DecodedCode::qr("c"),
            DecodedCode::qr("b"),
        ];
        assert_eq!(
            dedup_by_payload(codes),
            vec![
                DecodedCode::qr("a"),
                DecodedCode::new("CODE128", "b"),
                DecodedCode::qr("c"),
            ]
        );
    }

    #[test]
    fn direct_hit_short_circuits_the_cascade() {
        let (direct, direct_calls) =
            counting(StrategyKind::Direct, Attempt::hit(vec![DecodedCode::qr("x")]));
        let (secondary, secondary_calls) = counting(StrategyKind::Secondary, Attempt::miss());
        let (preprocess, preprocess_calls) = counting(StrategyKind::Preprocess, Attempt::miss());

        let scanner = CodeScanner::new(vec![direct, secondary, preprocess]);
        let result = scanner.scan_image(&blank());

        assert_eq!(result.strategy_used, Some(StrategyKind::Direct));
        assert_eq!(direct_calls.load(Ordering::SeqCst), 1);
        assert_eq!(secondary_calls.load(Ordering::SeqCst), 0);
        assert_eq!(preprocess_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn falls_through_to_first_strategy_with_codes() {
        let (direct, _) = counting(StrategyKind::Direct, Attempt::miss());
        let (secondary, _) = counting(StrategyKind::Secondary, Attempt::miss());
        let (preprocess, _) = counting(
            StrategyKind::Preprocess,
            Attempt {
                codes: vec![DecodedCode::qr("dup"), DecodedCode::qr("dup")],
                transform: Some(TransformKind::Sharpen),
            },
        );

        let result = CodeScanner::new(vec![direct, secondary, preprocess]).scan_image(&blank());
        assert_eq!(result.codes, vec![DecodedCode::qr("dup")]);
        assert_eq!(result.strategy_used, Some(StrategyKind::Preprocess));
        assert_eq!(result.transform_used, Some(TransformKind::Sharpen));
    }

    #[test]
    fn all_misses_give_empty_result() {
        let (direct, _) = counting(StrategyKind::Direct, Attempt::miss());
        let result = CodeScanner::new(vec![direct]).scan_image(&blank());
        assert_eq!(result, DecodeResult::empty());
    }

    #[test]
    fn non_image_bytes_are_invalid_image() {
        let scanner = CodeScanner::new(Vec::new());
        let err = scanner.scan_bytes(b"%PDF-1.7 definitely not a raster").unwrap_err();
        assert!(matches!(err, ScanError::InvalidImage(_)));
    }

    #[test]
    fn request_without_image_content_type_is_rejected() {
        let scanner = CodeScanner::new(Vec::new());
        let request = ScanRequest::new(vec![1, 2, 3], Some("text/plain".into()));
        assert!(matches!(
            scanner.scan_request(&request),
            Err(ScanError::UnsupportedContentType(mime)) if mime == "text/plain"
        ));
    }

    #[test]
    fn strategies_see_canonical_rgb() {
        struct ColorProbe(Mutex<Option<image::ColorType>>);
        impl DecodeStrategy for Arc<ColorProbe> {
            fn kind(&self) -> StrategyKind {
                StrategyKind::Direct
            }
            fn attempt(&self, image: &DynamicImage) -> Attempt {
                *self.0.lock().unwrap() = Some(image.color());
                Attempt::miss()
            }
        }

        let probe = Arc::new(ColorProbe(Mutex::new(None)));
        let scanner = CodeScanner::new(vec![Box::new(Arc::clone(&probe))]);
        scanner.scan_image(&blank());
        assert_eq!(*probe.0.lock().unwrap(), Some(image::ColorType::Rgb8));
    }

    #[test]
    fn standard_cascade_order() {
        let kinds = CodeScanner::with_available_strategies(&ScanConfig::default()).strategy_kinds();
        let mut expected = Vec::new();
        if cfg!(feature = "rxing") {
            expected.push(StrategyKind::Direct);
        }
        if cfg!(feature = "rqrr") {
            expected.push(StrategyKind::Secondary);
        }
        if cfg!(any(feature = "rxing", feature = "rqrr")) {
            expected.push(StrategyKind::Preprocess);
        }
        assert_eq!(kinds, expected);
    }

    #[test]
    fn config_can_disable_fallbacks() {
        let config = ScanConfig {
            enable_secondary: false,
            enable_preprocess: false,
            ..ScanConfig::default()
        };
        let kinds = CodeScanner::with_available_strategies(&config).strategy_kinds();
        assert!(!kinds.contains(&StrategyKind::Secondary));
        assert!(!kinds.contains(&StrategyKind::Preprocess));
    }

    #[test]
    fn plain_image_without_code_is_empty_success() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(120, 80, image::Rgb([200, 180, 40])));
        let result = CodeScanner::shared().scan_image(&img);
        assert!(result.is_empty());
        assert!(result.strategy_used.is_none());
    }
}
