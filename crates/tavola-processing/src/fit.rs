//! Cover-fit resizing
//!
//! Cover fit scales the source so it fully covers the target box, then
//! center-crops the overflow: aspect fill without letterboxing.

use image::{DynamicImage, GenericImageView};

pub struct CoverFit;

impl CoverFit {
    /// Select filter type based on the downscale ratio; heavier downscales
    /// tolerate cheaper filters.
    pub fn select_filter(
        orig_width: u32,
        orig_height: u32,
        new_width: u32,
        new_height: u32,
    ) -> image::imageops::FilterType {
        let width_ratio = orig_width as f32 / new_width as f32;
        let height_ratio = orig_height as f32 / new_height as f32;
        let max_ratio = width_ratio.max(height_ratio);

        if max_ratio > 2.0 {
            image::imageops::FilterType::Triangle
        } else if max_ratio > 1.5 {
            image::imageops::FilterType::CatmullRom
        } else {
            image::imageops::FilterType::Lanczos3
        }
    }

    /// Scale `img` to fully cover `width`x`height`, then crop the overflow
    /// centered. The output is always exactly the target size.
    pub fn cover(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
        let (orig_width, orig_height) = img.dimensions();

        let scale_x = width as f64 / orig_width as f64;
        let scale_y = height as f64 / orig_height as f64;
        let scale = scale_x.max(scale_y);

        // Ceil so rounding never leaves the scaled image short of the box.
        let scaled_width = ((orig_width as f64 * scale).ceil() as u32).max(width);
        let scaled_height = ((orig_height as f64 * scale).ceil() as u32).max(height);

        let filter = Self::select_filter(orig_width, orig_height, scaled_width, scaled_height);
        let scaled = img.resize_exact(scaled_width, scaled_height, filter);

        let x = (scaled_width - width) / 2;
        let y = (scaled_height - height) / 2;
        scaled.crop_imm(x, y, width, height)
    }
}
