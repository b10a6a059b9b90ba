// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decode strategies — the steps of the cascade.
//
// Every strategy turns the canonical image into zero or more codes and never
// fails: reader errors, reader panics, and transform failures are logged here
// and count as "nothing found".

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use image::DynamicImage;
use scanwerk_core::{DecodedCode, StrategyKind, TransformKind};
use tracing::{debug, instrument, warn};

use crate::decode::reader::SymbolReader;
use crate::scan::enhance::Transform;

/// What one strategy produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attempt {
    pub codes: Vec<DecodedCode>,
    /// Transform the codes were found on, for strategies that transform.
    pub transform: Option<TransformKind>,
}

impl Attempt {
    pub fn miss() -> Self {
        Self::default()
    }

    pub fn hit(codes: Vec<DecodedCode>) -> Self {
        Self {
            codes,
            transform: None,
        }
    }
}

/// One step of the cascade.
pub trait DecodeStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn attempt(&self, image: &DynamicImage) -> Attempt;
}

/// Run a reader, turning errors and panics into an empty result.
pub(crate) fn guarded_read(reader: &dyn SymbolReader, image: &DynamicImage) -> Vec<DecodedCode> {
    // Readers may panic on degenerate grids; treat that as a miss.
    match catch_unwind(AssertUnwindSafe(|| reader.read(image))) {
        Ok(Ok(codes)) => codes
            .into_iter()
            .filter(|code| !code.payload.is_empty())
            .collect(),
        Ok(Err(err)) => {
            warn!(reader = reader.name(), error = %err, "Reader failed; treating as no result");
            Vec::new()
        }
        Err(_) => {
            warn!(reader = reader.name(), "Reader panicked; treating as no result");
            Vec::new()
        }
    }
}

// -- Direct -------------------------------------------------------------------

/// Multi-symbology reader on the unmodified image.
pub struct DirectStrategy {
    reader: Arc<dyn SymbolReader>,
}

impl DirectStrategy {
    pub fn new(reader: Arc<dyn SymbolReader>) -> Self {
        Self { reader }
    }
}

impl DecodeStrategy for DirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Direct
    }

    #[instrument(skip_all, fields(strategy = "direct", reader = self.reader.name()))]
    fn attempt(&self, image: &DynamicImage) -> Attempt {
        Attempt::hit(guarded_read(self.reader.as_ref(), image))
    }
}

// -- Secondary ----------------------------------------------------------------

/// QR-only detector on the unmodified image. Reports at most one code.
pub struct SecondaryStrategy {
    reader: Arc<dyn SymbolReader>,
}

impl SecondaryStrategy {
    pub fn new(reader: Arc<dyn SymbolReader>) -> Self {
        Self { reader }
    }
}

impl DecodeStrategy for SecondaryStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Secondary
    }

    #[instrument(skip_all, fields(strategy = "secondary", reader = self.reader.name()))]
    fn attempt(&self, image: &DynamicImage) -> Attempt {
        let mut codes = guarded_read(self.reader.as_ref(), image);
        codes.truncate(1);
        Attempt::hit(codes)
    }
}

// -- Preprocess ---------------------------------------------------------------

/// Apply each transform of the battery to the original image and retry every
/// reader on the variant, stopping at the first (transform, reader) pair that
/// finds anything.
pub struct PreprocessStrategy {
    transforms: Vec<Box<dyn Transform>>,
    /// Readers in the order they are tried on each variant.
    readers: Vec<Arc<dyn SymbolReader>>,
}

impl PreprocessStrategy {
    pub fn new(transforms: Vec<Box<dyn Transform>>, readers: Vec<Arc<dyn SymbolReader>>) -> Self {
        Self {
            transforms,
            readers,
        }
    }
}

impl DecodeStrategy for PreprocessStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Preprocess
    }

    #[instrument(skip_all, fields(strategy = "preprocess", transforms = self.transforms.len()))]
    fn attempt(&self, image: &DynamicImage) -> Attempt {
        for transform in &self.transforms {
            let kind = transform.kind();
            let variant = match transform.apply(image) {
                Ok(variant) => variant,
                Err(err) => {
                    warn!(transform = %kind, error = %err, "Transform failed; skipping");
                    continue;
                }
            };

            for reader in &self.readers {
                let codes = guarded_read(reader.as_ref(), &variant);
                if !codes.is_empty() {
                    debug!(transform = %kind, reader = reader.name(), found = codes.len(), "Variant decoded");
                    return Attempt {
                        codes,
                        transform: Some(kind),
                    };
                }
            }
            debug!(transform = %kind, "No code on variant");
        }

        Attempt::miss()
    }
}
