#![allow(dead_code)]

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;

/// Strokes never come closer than this to the canvas border, so a small
/// translation moves only background past the edge.
pub const STROKE_MARGIN: u32 = 20;

/// Deterministic LCG so test fixtures are reproducible without pulling a
/// crate-level RNG into every test.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(2862933555777941757).wrapping_add(3037000493))
    }

    pub fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    /// Uniform value in `[lo, hi)`; requires `hi > lo`.
    pub fn range(&mut self, lo: u32, hi: u32) -> u32 {
        lo + self.next_u32() % (hi - lo)
    }
}

/// A dark-background synthetic drawing: bright line segments and small
/// rectangles scattered at LCG-chosen positions. Dense enough in corners and
/// distinctive neighbourhoods to drive the feature detector.
pub fn synthetic_drawing(width: u32, height: u32, seed: u64) -> RgbImage {
    assert!(width > 3 * STROKE_MARGIN && height > 3 * STROKE_MARGIN);

    let mut image = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let mut rng = Lcg::new(seed);

    let strokes = (width * height / 600).max(40);
    for _ in 0..strokes {
        let shade = 140 + (rng.next_u32() % 100) as u8;
        let color = Rgb([shade, shade, shade]);

        match rng.next_u32() % 3 {
            0 => {
                let len = rng.range(6, 21);
                let x = rng.range(STROKE_MARGIN, width - STROKE_MARGIN - len);
                let y = rng.range(STROKE_MARGIN, height - STROKE_MARGIN);
                draw_line_segment_mut(
                    &mut image,
                    (x as f32, y as f32),
                    ((x + len) as f32, y as f32),
                    color,
                );
            }
            1 => {
                let len = rng.range(6, 21);
                let x = rng.range(STROKE_MARGIN, width - STROKE_MARGIN);
                let y = rng.range(STROKE_MARGIN, height - STROKE_MARGIN - len);
                draw_line_segment_mut(
                    &mut image,
                    (x as f32, y as f32),
                    (x as f32, (y + len) as f32),
                    color,
                );
            }
            _ => {
                let size = rng.range(4, 13);
                let x = rng.range(STROKE_MARGIN, width - STROKE_MARGIN - size);
                let y = rng.range(STROKE_MARGIN, height - STROKE_MARGIN - size);
                draw_hollow_rect_mut(
                    &mut image,
                    Rect::at(x as i32, y as i32).of_size(size, size),
                    color,
                );
            }
        }
    }

    image
}

/// Copy of `image` with all content shifted by `(dx, dy)`; uncovered pixels
/// stay black, matching the warp border fill.
pub fn translate_image(image: &RgbImage, dx: i32, dy: i32) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let sx = x as i64 - dx as i64;
        let sy = y as i64 - dy as i64;
        if sx >= 0 && sy >= 0 && (sx as u32) < image.width() && (sy as u32) < image.height() {
            *image.get_pixel(sx as u32, sy as u32)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

pub fn add_filled_square(image: &mut RgbImage, x: i32, y: i32, size: u32, shade: u8) {
    draw_filled_rect_mut(
        image,
        Rect::at(x, y).of_size(size, size),
        Rgb([shade, shade, shade]),
    );
}

pub fn uniform_image(width: u32, height: u32, shade: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([shade, shade, shade]))
}
