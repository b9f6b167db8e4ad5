use crate::{
    foundation::error::{SmilError, SmilResult},
    render::tile::Tile,
};

pub type PremulRgba8 = [u8; 4];

/// Source-over of one premultiplied pixel.
pub fn over(dst: PremulRgba8, src: PremulRgba8) -> PremulRgba8 {
    let sa = src[3];
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let inv = 255u16 - u16::from(sa);
    let mut out = [0u8; 4];
    for i in 0..4 {
        out[i] = add_sat_u8(src[i], mul_div255(u16::from(dst[i]), inv));
    }
    out
}

/// Row range `[x0, x1) x [y0, y1)` of `tile` clipped to a `width` x `height` buffer.
fn clip(tile: &Tile, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
    let bounds = Tile::new(0, 0, width as i32, height as i32);
    let t = tile.intersection(&bounds)?;
    Some((
        t.x as usize,
        t.y as usize,
        (t.max_x + 1) as usize,
        (t.max_y + 1) as usize,
    ))
}

fn check_len(buf: &[u8], width: u32, height: u32) -> SmilResult<()> {
    if buf.len() != width as usize * height as usize * 4 {
        return Err(SmilError::render(format!(
            "rgba8 buffer of {} bytes does not match {width}x{height}",
            buf.len()
        )));
    }
    Ok(())
}

/// Sets every pixel of `tile` to `rgba`.
pub fn fill_tile(dst: &mut [u8], width: u32, height: u32, tile: &Tile, rgba: PremulRgba8) -> SmilResult<()> {
    check_len(dst, width, height)?;
    let Some((x0, y0, x1, y1)) = clip(tile, width, height) else {
        return Ok(());
    };
    let stride = width as usize * 4;
    for y in y0..y1 {
        let row = &mut dst[y * stride + x0 * 4..y * stride + x1 * 4];
        for px in row.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
    }
    Ok(())
}

/// Composites `src` over `dst` inside `tile` only.
pub fn over_tile_in_place(
    dst: &mut [u8],
    src: &[u8],
    width: u32,
    height: u32,
    tile: &Tile,
) -> SmilResult<()> {
    check_len(dst, width, height)?;
    check_len(src, width, height)?;
    let Some((x0, y0, x1, y1)) = clip(tile, width, height) else {
        return Ok(());
    };
    let stride = width as usize * 4;
    for y in y0..y1 {
        let range = y * stride + x0 * 4..y * stride + x1 * 4;
        for (d, s) in dst[range.clone()]
            .chunks_exact_mut(4)
            .zip(src[range].chunks_exact(4))
        {
            let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

fn mul_div255(x: u16, y: u16) -> u8 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u8
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
