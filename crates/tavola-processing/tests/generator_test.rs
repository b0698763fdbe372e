use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage};
use tavola_core::PresetSet;
use tavola_processing::{sweep, DerivativeGenerator, GeneratorError};
use tempfile::tempdir;

fn write_source_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 90])
    });
    DynamicImage::ImageRgb8(img)
        .save_with_format(path, image::ImageFormat::Jpeg)
        .unwrap();
}

fn standard_generator() -> DerivativeGenerator {
    DerivativeGenerator::new(PresetSet::standard(), 85, 80.0)
}

#[test]
fn test_generate_full_derivative_set() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("dish.jpg");
    write_source_jpeg(&input, 1024, 768);
    let out_dir = dir.path().join("media/general");

    let derivatives = standard_generator()
        .generate(&input, &out_dir, "dish.jpg")
        .unwrap();

    assert_eq!(derivatives.len(), 6);

    let expected = [
        ("thumbnail", "thumbnail_dish.jpg", (150, 150)),
        ("small", "small_dish.jpg", (400, 300)),
        ("medium", "medium_dish.jpg", (800, 600)),
        ("large", "large_dish.jpg", (1200, 900)),
        ("hero", "hero_dish.jpg", (1920, 1080)),
        ("webp", "webp_dish.webp", (800, 600)),
    ];
    for (label, filename, dims) in expected {
        let path = derivatives.get(label).unwrap();
        assert_eq!(path, &out_dir.join(filename));
        assert_eq!(image::image_dimensions(path).unwrap(), dims);
    }
}

#[test]
fn test_regenerate_overwrites_without_orphans() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("dish.jpg");
    write_source_jpeg(&input, 640, 480);
    let out_dir = dir.path().join("out");

    let generator = standard_generator();
    generator.generate(&input, &out_dir, "dish.jpg").unwrap();
    generator.generate(&input, &out_dir, "dish.jpg").unwrap();

    let entries = std::fs::read_dir(&out_dir).unwrap().count();
    assert_eq!(entries, 6);
}

#[test]
fn test_corrupt_input_fails_with_no_partial_outputs() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("broken.jpg");
    std::fs::write(&input, b"definitely not a jpeg").unwrap();
    let out_dir = dir.path().join("out");

    let result = standard_generator().generate(&input, &out_dir, "broken.jpg");
    assert!(matches!(result, Err(GeneratorError::Decode { .. })));

    // No output directory contents survive a failed generation.
    let leftover = std::fs::read_dir(&out_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    assert_eq!(leftover, 0);
}

#[test]
fn test_missing_input_fails() {
    let dir = tempdir().unwrap();
    let result = standard_generator().generate(
        &dir.path().join("gone.jpg"),
        &dir.path().join("out"),
        "gone.jpg",
    );
    assert!(matches!(result, Err(GeneratorError::ReadSource { .. })));
}

#[test]
fn test_png_input_produces_jpeg_derivatives() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("dish.png");
    let img = RgbImage::from_pixel(500, 500, Rgb([20, 120, 20]));
    DynamicImage::ImageRgb8(img)
        .save_with_format(&input, image::ImageFormat::Png)
        .unwrap();
    let out_dir = dir.path().join("out");

    let derivatives = standard_generator()
        .generate(&input, &out_dir, "dish.png")
        .unwrap();

    // Sized derivatives keep the caller's base filename but hold JPEG bytes.
    let medium = std::fs::read(derivatives.get("medium").unwrap()).unwrap();
    assert_eq!(
        image::guess_format(&medium).unwrap(),
        image::ImageFormat::Jpeg
    );

    let webp = std::fs::read(derivatives.get("webp").unwrap()).unwrap();
    assert_eq!(
        image::guess_format(&webp).unwrap(),
        image::ImageFormat::WebP
    );
    assert!(derivatives
        .get("webp")
        .unwrap()
        .ends_with("webp_dish.webp"));
}

#[test]
fn test_custom_preset_table() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("dish.jpg");
    write_source_jpeg(&input, 640, 480);
    let out_dir = dir.path().join("out");

    let presets = PresetSet::parse("card:320x200").unwrap();
    let derivatives = DerivativeGenerator::new(presets, 85, 80.0)
        .generate(&input, &out_dir, "dish.jpg")
        .unwrap();

    // One sized preset plus the always-on WebP rendition.
    assert_eq!(derivatives.len(), 2);
    assert_eq!(
        image::image_dimensions(derivatives.get("card").unwrap()).unwrap(),
        (320, 200)
    );
}

#[test]
fn test_sweep_expired_derivatives() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("dish.jpg");
    write_source_jpeg(&input, 320, 240);
    let out_dir = dir.path().join("out");

    standard_generator()
        .generate(&input, &out_dir, "dish.jpg")
        .unwrap();

    let stats = sweep(&out_dir, 0).unwrap();
    assert_eq!(stats.removed, 6);
    assert_eq!(std::fs::read_dir(&out_dir).unwrap().count(), 0);

    // Sweeping again over the now-empty directory is a no-op.
    let stats = sweep(&out_dir, 0).unwrap();
    assert_eq!(stats.scanned, 0);
}
