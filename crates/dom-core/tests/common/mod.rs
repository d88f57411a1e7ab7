//! Shared helpers for the integration tests.

#![allow(dead_code)]

use skia_safe::{surfaces, AlphaType, Canvas, Color, ColorSpace, ColorType, ImageInfo, Surface};

/// An RGBA8888 raster surface that can be sampled pixel by pixel.
pub struct Raster {
    surface: Surface,
    info: ImageInfo,
}

impl Raster {
    pub fn new(width: i32, height: i32) -> Self {
        let info = ImageInfo::new(
            (width, height),
            ColorType::RGBA8888,
            AlphaType::Premul,
            Some(ColorSpace::new_srgb()),
        );
        let mut surface =
            surfaces::raster(&info, None, None).expect("Failed to create Skia surface");
        surface.canvas().clear(Color::TRANSPARENT);
        Self { surface, info }
    }

    pub fn canvas(&mut self) -> &Canvas {
        self.surface.canvas()
    }

    pub fn pixel(&mut self, x: i32, y: i32) -> [u8; 4] {
        let info = self.info.with_dimensions((1, 1));
        let mut pixel = [0u8; 4];
        assert!(
            self.surface.read_pixels(&info, &mut pixel, 4, (x, y)),
            "Failed to read pixel ({}, {})",
            x,
            y
        );
        pixel
    }
}

pub const RED: [u8; 4] = [255, 0, 0, 255];
pub const GREEN: [u8; 4] = [0, 255, 0, 255];
pub const BLUE: [u8; 4] = [0, 0, 255, 255];
pub const CLEAR: [u8; 4] = [0, 0, 0, 0];

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}
