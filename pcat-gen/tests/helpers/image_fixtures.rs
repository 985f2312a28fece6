//! Image Test Fixture Generator
//!
//! Small solid-colour PNGs whose colour is derived from a key, so every tile
//! of a composed catalog can be told apart.

use image::{ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;

/// Fixture edge length in pixels
pub const FIXTURE_SIZE: u32 = 16;

/// Deterministic colour for a key
pub fn shade_for(key: &str) -> Rgba<u8> {
    let sum = key.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    Rgba([
        (sum & 0xff) as u8,
        ((sum >> 8) & 0xff) as u8,
        ((sum >> 16) & 0xff) as u8,
        255,
    ])
}

/// Solid PNG for a key
pub fn png_bytes(key: &str) -> Vec<u8> {
    let image = RgbaImage::from_pixel(FIXTURE_SIZE, FIXTURE_SIZE, shade_for(key));
    let mut buffer = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .expect("fixture PNG encodes");
    buffer
}
