use std::sync::Arc;

use anyhow::Context;

use crate::foundation::error::{SmilError, SmilResult};

/// Decoded raster image in premultiplied RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8 pixels.
    pub rgba8_premul: Arc<Vec<u8>>,
}

impl RasterImage {
    pub fn from_premul(width: u32, height: u32, rgba8_premul: Vec<u8>) -> SmilResult<Self> {
        let expected = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4);
        if width == 0 || height == 0 || rgba8_premul.len() != expected {
            return Err(SmilError::validation(format!(
                "image of {width}x{height} needs {expected} bytes, got {}",
                rgba8_premul.len()
            )));
        }
        Ok(Self {
            width,
            height,
            rgba8_premul: Arc::new(rgba8_premul),
        })
    }

    /// Placeholder drawn for images that failed to load: a grey and white
    /// 8x8 checkerboard.
    pub fn broken() -> Self {
        let mut px = Vec::with_capacity(8 * 8 * 4);
        for y in 0..8u32 {
            for x in 0..8u32 {
                let v = if (x / 4 + y / 4) % 2 == 0 { 0xc0 } else { 0xff };
                px.extend_from_slice(&[v, v, v, 0xff]);
            }
        }
        Self {
            width: 8,
            height: 8,
            rgba8_premul: Arc::new(px),
        }
    }

    pub fn is_broken_placeholder(&self) -> bool {
        *self == Self::broken()
    }
}

pub fn decode_image(bytes: &[u8]) -> SmilResult<RasterImage> {
    let dyn_img = image::load_from_memory(bytes).context("decode image from memory")?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    let mut rgba8_premul = rgba.into_raw();
    premultiply_rgba8_in_place(&mut rgba8_premul);

    RasterImage::from_premul(width, height, rgba8_premul)
}

fn premultiply_rgba8_in_place(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(4) {
        let a = px[3] as u16;
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = ((*c as u16 * a + 127) / 255) as u8;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
