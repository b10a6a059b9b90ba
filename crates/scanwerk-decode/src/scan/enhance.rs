// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Preprocessing transforms — contrast, global (Otsu) and local (Gaussian)
// binarization, sharpening, and brightening of code images that the readers
// could not decode as-is.

use image::{DynamicImage, GrayImage, Luma};
use imageproc::contrast::{ThresholdType, otsu_level, threshold};
use imageproc::filter::gaussian_blur_f32;
use scanwerk_core::error::ScanError;
use scanwerk_core::{ScanConfig, TransformKind};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;

/// One step of the preprocessing battery.
///
/// A transform always starts from the original image; transforms are never
/// chained. Failing is allowed: the battery skips the variant and moves on.
pub trait Transform: Send + Sync {
    fn kind(&self) -> TransformKind;

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError>;
}

/// Build the standard five-step battery, in application order.
pub fn standard_battery(config: &ScanConfig) -> Vec<Box<dyn Transform>> {
    vec![
        Box::new(ContrastBoost {
            factor: config.contrast_factor,
        }),
        Box::new(OtsuBinarize),
        Box::new(AdaptiveBinarize {
            sigma: config.adaptive_sigma(),
            offset: config.adaptive_offset,
        }),
        Box::new(SharpnessBoost {
            factor: config.sharpness_factor,
        }),
        Box::new(BrightnessBoost {
            factor: config.brightness_factor,
        }),
    ]
}

/// Contrast enhancement around the mean gray level.
#[derive(Debug, Clone, Copy)]
pub struct ContrastBoost {
    pub factor: f32,
}

impl Transform for ContrastBoost {
    fn kind(&self) -> TransformKind {
        TransformKind::Contrast
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError> {
        ensure_non_empty(image, self.kind())?;
        Ok(ImageProcessor::from_dynamic(image.clone())
            .enhance_contrast(self.factor)
            .into_dynamic())
    }
}

/// Grayscale conversion followed by a global threshold chosen with Otsu's
/// method.
#[derive(Debug, Clone, Copy)]
pub struct OtsuBinarize;

impl Transform for OtsuBinarize {
    fn kind(&self) -> TransformKind {
        TransformKind::OtsuThreshold
    }

    #[instrument(skip_all)]
    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError> {
        ensure_non_empty(image, self.kind())?;

        let gray = image.to_luma8();
        let level = otsu_level(&gray);
        debug!(level, "Otsu level computed");

        // Pixels at or below the level go black.
        Ok(DynamicImage::ImageLuma8(threshold(
            &gray,
            level,
            ThresholdType::Binary,
        )))
    }
}

/// Grayscale conversion followed by a local threshold: a pixel turns white
/// when it is brighter than the Gaussian-weighted mean of its neighbourhood
/// minus `offset`.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveBinarize {
    /// Standard deviation of the neighbourhood weighting.
    pub sigma: f32,
    /// Constant subtracted from the weighted mean.
    pub offset: i32,
}

impl Transform for AdaptiveBinarize {
    fn kind(&self) -> TransformKind {
        TransformKind::AdaptiveThreshold
    }

    #[instrument(skip_all, fields(sigma = self.sigma, offset = self.offset))]
    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError> {
        ensure_non_empty(image, self.kind())?;
        if !self.sigma.is_finite() || self.sigma <= 0.0 {
            return Err(ScanError::TransformFailure(format!(
                "adaptive threshold needs a positive sigma, got {}",
                self.sigma
            )));
        }

        let gray = image.to_luma8();
        let local_mean = gaussian_blur_f32(&gray, self.sigma);

        let (width, height) = gray.dimensions();
        let mut output = GrayImage::new(width, height);
        for (x, y, pixel) in gray.enumerate_pixels() {
            let cutoff = local_mean.get_pixel(x, y).0[0] as i32 - self.offset;
            let binary = if pixel.0[0] as i32 > cutoff { 255u8 } else { 0u8 };
            output.put_pixel(x, y, Luma([binary]));
        }

        Ok(DynamicImage::ImageLuma8(output))
    }
}

/// Sharpness enhancement against a 3x3 smoothed copy.
#[derive(Debug, Clone, Copy)]
pub struct SharpnessBoost {
    pub factor: f32,
}

impl Transform for SharpnessBoost {
    fn kind(&self) -> TransformKind {
        TransformKind::Sharpen
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError> {
        ensure_non_empty(image, self.kind())?;
        Ok(ImageProcessor::from_dynamic(image.clone())
            .enhance_sharpness(self.factor)
            .into_dynamic())
    }
}

/// Brightness enhancement away from black.
#[derive(Debug, Clone, Copy)]
pub struct BrightnessBoost {
    pub factor: f32,
}

impl Transform for BrightnessBoost {
    fn kind(&self) -> TransformKind {
        TransformKind::Brightness
    }

    fn apply(&self, image: &DynamicImage) -> Result<DynamicImage, ScanError> {
        ensure_non_empty(image, self.kind())?;
        Ok(ImageProcessor::from_dynamic(image.clone())
            .enhance_brightness(self.factor)
            .into_dynamic())
    }
}

fn ensure_non_empty(image: &DynamicImage, kind: TransformKind) -> Result<(), ScanError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(ScanError::TransformFailure(format!(
            "{kind} cannot be applied to an empty image"
        )));
    }
    Ok(())
}

// -- Tests --------------------------------------------------------------------
