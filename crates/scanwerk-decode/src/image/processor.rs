// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — canonical RGB loading and contrast/brightness/sharpness
// enhancement. Operates on in-memory images using the `image` crate.

use image::{DynamicImage, ImageError, ImageFormat, Rgb, RgbImage, Rgba};
use scanwerk_core::error::ScanError;
use tracing::{debug, info, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations are non-destructive: each method consumes `self` and returns a
/// new `ImageProcessor` wrapping the transformed image, enabling method chaining.
///
/// The enhancement operations blend the image away from a degenerate version
/// of itself (mean gray for contrast, black for brightness, a smoothed copy
/// for sharpness). A factor of 1.0 is a no-op; factors above 1.0 strengthen
/// the effect.
///
/// ```ignore
/// let variant = ImageProcessor::from_bytes(&upload)?
///     .to_canonical_rgb()
///     .enhance_contrast(2.0)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Load an image from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, ScanError> {
        let img = image::open(path.as_ref()).map_err(|err| match err {
            ImageError::IoError(io_err) => ScanError::Io(io_err),
            other => ScanError::InvalidImage(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                other
            )),
        })?;
        info!(width = img.width(), height = img.height(), "Image loaded");
        Ok(Self { image: img })
    }

    /// Create a processor from raw encoded bytes (JPEG, PNG, BMP, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, ScanError> {
        let img = image::load_from_memory(data).map_err(|err| {
            ScanError::InvalidImage(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Convert to 8-bit RGB, the representation every reader and transform
    /// works from.
    ///
    /// Images with an alpha channel are composited onto white first, so a code
    /// drawn on a transparent background keeps a light quiet zone instead of
    /// collapsing to black.
    #[instrument(skip(self))]
    pub fn to_canonical_rgb(self) -> Self {
        let rgb = if self.image.color().has_alpha() {
            debug!("Flattening alpha onto white");
            flatten_onto_white(&self.image)
        } else {
            self.image.to_rgb8()
        };
        Self {
            image: DynamicImage::ImageRgb8(rgb),
        }
    }

    /// Scale every channel away from the mean gray level by `factor`.
    #[instrument(skip(self), fields(factor))]
    pub fn enhance_contrast(self, factor: f32) -> Self {
        let mean = mean_luma(&self.image);
        debug!(factor, mean, "Enhancing contrast");

        let rgb = self.image.to_rgb8();
        let contrasted = map_channels(&rgb, |channel| blend(mean, channel as f32, factor));
        Self {
            image: DynamicImage::ImageRgb8(contrasted),
        }
    }

    /// Scale every channel away from black by `factor`.
    #[instrument(skip(self), fields(factor))]
    pub fn enhance_brightness(self, factor: f32) -> Self {
        debug!(factor, "Enhancing brightness");

        let rgb = self.image.to_rgb8();
        let brightened = map_channels(&rgb, |channel| blend(0.0, channel as f32, factor));
        Self {
            image: DynamicImage::ImageRgb8(brightened),
        }
    }

    /// Scale every pixel away from its 3x3 smoothed value by `factor`.
    ///
    /// The smoothing kernel weights the centre 5 and each neighbour 1. Border
    /// pixels have no full neighbourhood and are left unchanged.
    #[instrument(skip(self), fields(factor))]
    pub fn enhance_sharpness(self, factor: f32) -> Self {
        debug!(factor, "Enhancing sharpness");

        let rgb = self.image.to_rgb8();
        let (width, height) = rgb.dimensions();
        if width < 3 || height < 3 {
            return Self {
                image: DynamicImage::ImageRgb8(rgb),
            };
        }

        let mut output = rgb.clone();
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let mut sums = [0f32; 3];
                for dy in 0..3 {
                    for dx in 0..3 {
                        let weight = if dx == 1 && dy == 1 { 5.0 } else { 1.0 };
                        let Rgb(px) = *rgb.get_pixel(x + dx - 1, y + dy - 1);
                        for (sum, &channel) in sums.iter_mut().zip(px.iter()) {
                            *sum += weight * channel as f32;
                        }
                    }
                }
                let Rgb(original) = *rgb.get_pixel(x, y);
                let mut sharpened = [0u8; 3];
                for c in 0..3 {
                    let smoothed = sums[c] / 13.0;
                    sharpened[c] = blend(smoothed, original[c] as f32, factor);
                }
                output.put_pixel(x, y, Rgb(sharpened));
            }
        }

        Self {
            image: DynamicImage::ImageRgb8(output),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>, ScanError> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ScanError::TransformFailure(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// Write the image to a file. The format is inferred from the file extension.
    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), ScanError> {
        self.image.save(path.as_ref()).map_err(|err| match err {
            ImageError::IoError(io_err) => ScanError::Io(io_err),
            other => ScanError::TransformFailure(format!(
                "failed to save image to {}: {}",
                path.as_ref().display(),
                other
            )),
        })
    }
}

/// `degenerate + factor * (value - degenerate)`, rounded and clamped to a byte.
fn blend(degenerate: f32, value: f32, factor: f32) -> u8 {
    let val = degenerate + factor * (value - degenerate);
    val.round().clamp(0.0, 255.0) as u8
}

/// Apply `f` to every colour channel of an RGB image.
fn map_channels(rgb: &RgbImage, f: impl Fn(u8) -> u8) -> RgbImage {
    let mut output = rgb.clone();
    for pixel in output.pixels_mut() {
        let Rgb([r, g, b]) = *pixel;
        *pixel = Rgb([f(r), f(g), f(b)]);
    }
    output
}

/// Mean luminance of the image, rounded to the nearest integer level.
fn mean_luma(image: &DynamicImage) -> f32 {
    let gray = image.to_luma8();
    let total = gray.width() as u64 * gray.height() as u64;
    if total == 0 {
        return 128.0;
    }
    let sum: u64 = gray.pixels().map(|px| px.0[0] as u64).sum();
    (sum as f64 / total as f64).round() as f32
}

/// Composite an image with alpha onto an opaque white canvas.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let over_white = |channel: u8| -> u8 {
            ((channel as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        Rgb([over_white(r), over_white(g), over_white(b)])
    })
}
