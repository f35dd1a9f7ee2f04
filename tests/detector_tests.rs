mod common;

use common::{add_filled_square, synthetic_drawing, uniform_image};
use drawing_diff::config::DiffConfig;
use drawing_diff::error::DiffError;
use drawing_diff::pipeline::ChangeDetector;
use image::Rgb;

#[test]
fn identical_images_yield_no_changes() {
    let drawing = synthetic_drawing(320, 240, 5);
    let result = ChangeDetector::default().detect(&drawing, &drawing).unwrap();
    assert_eq!(result.change_count(), 0);
}

#[test]
fn identical_uniform_images_yield_no_changes() {
    let image = uniform_image(200, 200, 128);
    let result = ChangeDetector::default().detect(&image, &image).unwrap();
    assert_eq!(result.change_count(), 0);
}

#[test]
fn single_pixel_difference_is_filtered_out() {
    let reference = uniform_image(200, 200, 0);
    let mut modified = reference.clone();
    modified.put_pixel(100, 100, Rgb([255, 255, 255]));

    let result = ChangeDetector::default()
        .detect(&reference, &modified)
        .unwrap();
    assert_eq!(result.change_count(), 0);
}

#[test]
fn solid_square_is_detected_with_enclosing_box() {
    let reference = uniform_image(200, 200, 30);
    let mut modified = reference.clone();
    add_filled_square(&mut modified, 90, 90, 20, 230);

    let result = ChangeDetector::default()
        .detect(&reference, &modified)
        .unwrap();

    assert_eq!(result.change_count(), 1);

    let region = &result.regions[0];
    assert!(region.x <= 90 && region.y <= 90);
    assert!(region.x + region.width as i32 >= 110);
    assert!(region.y + region.height as i32 >= 110);
    assert!(region.area > 100.0);
}

#[test]
fn lowering_the_threshold_never_loses_the_region() {
    let reference = uniform_image(200, 200, 30);
    let mut modified = reference.clone();
    add_filled_square(&mut modified, 60, 60, 30, 150);

    let count_at = |threshold: u8| {
        let config = DiffConfig {
            threshold,
            ..DiffConfig::default()
        };
        ChangeDetector::new(config)
            .detect(&reference, &modified)
            .unwrap()
            .change_count()
    };

    // Difference inside the square is 120: visible at the default threshold,
    // invisible above it.
    let sensitive = count_at(30);
    let strict = count_at(200);

    assert_eq!(sensitive, 1);
    assert_eq!(strict, 0);
    assert!(sensitive >= strict);
}

#[test]
fn dimension_mismatch_is_rejected() {
    let reference = uniform_image(100, 100, 0);
    let modified = uniform_image(90, 100, 0);

    let result = ChangeDetector::default().detect(&reference, &modified);
    assert!(matches!(
        result,
        Err(DiffError::DimensionMismatch { .. })
    ));
}

#[test]
fn annotation_draws_the_highlight_color() {
    let reference = uniform_image(200, 200, 30);
    let mut modified = reference.clone();
    add_filled_square(&mut modified, 90, 90, 20, 230);

    let result = ChangeDetector::default()
        .detect(&reference, &modified)
        .unwrap();

    let region = &result.regions[0];
    let corner = result
        .annotated
        .get_pixel(region.x as u32, region.y as u32);
    assert_eq!(*corner, Rgb([255, 0, 0]));
}

#[test]
fn detection_is_deterministic() {
    let reference = synthetic_drawing(320, 240, 13);
    let mut modified = reference.clone();
    add_filled_square(&mut modified, 120, 80, 25, 220);

    let detector = ChangeDetector::default();
    let first = detector.detect(&reference, &modified).unwrap();
    let second = detector.detect(&reference, &modified).unwrap();

    assert_eq!(first.regions, second.regions);
    assert_eq!(first.annotated.as_raw(), second.annotated.as_raw());
}
