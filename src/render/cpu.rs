use std::{collections::HashMap, sync::Arc};

use crate::{
    assets::decode::RasterImage,
    foundation::{
        core::{Affine, BezPath, Rect, Rgba8, Viewport},
        error::{SmilError, SmilResult},
    },
    render::{
        composite::{fill_tile, over_tile_in_place},
        graphics::{FrameRGBA, RenderGraphics},
        tile::Tile,
    },
};

/// Offscreen canvas rasterized with `vello_cpu`.
///
/// Each pass draws into a scratch pixmap which is then composited into the
/// offscreen buffer inside the pass tiles only, so pixels outside the dirty
/// region keep their previous content.
pub struct CpuGraphics {
    viewport: Viewport,
    width: u16,
    height: u16,
    offscreen: vello_cpu::Pixmap,
    scratch: vello_cpu::Pixmap,
    ctx: Option<vello_cpu::RenderContext>,
    tiles: Vec<Tile>,
    image_cache: HashMap<usize, (Arc<Vec<u8>>, vello_cpu::Image)>,
}

impl std::fmt::Debug for CpuGraphics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuGraphics")
            .field("viewport", &self.viewport)
            .field("tiles", &self.tiles)
            .field("cached_images", &self.image_cache.len())
            .finish()
    }
}

fn surface_size(viewport: Viewport) -> SmilResult<(u16, u16)> {
    let w: u16 = viewport
        .width
        .try_into()
        .map_err(|_| SmilError::render("canvas width exceeds u16"))?;
    let h: u16 = viewport
        .height
        .try_into()
        .map_err(|_| SmilError::render("canvas height exceeds u16"))?;
    Ok((w, h))
}

impl CpuGraphics {
    pub fn new(viewport: Viewport) -> SmilResult<Self> {
        let (width, height) = surface_size(viewport)?;
        Ok(Self {
            viewport,
            width,
            height,
            offscreen: vello_cpu::Pixmap::new(width, height),
            scratch: vello_cpu::Pixmap::new(width, height),
            ctx: None,
            tiles: Vec::new(),
            image_cache: HashMap::new(),
        })
    }

    fn with_ctx_mut<R>(&mut self, f: impl FnOnce(&mut vello_cpu::RenderContext) -> R) -> SmilResult<R> {
        let ctx = self
            .ctx
            .as_mut()
            .ok_or_else(|| SmilError::render("draw call outside of a paint pass"))?;
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        Ok(f(ctx))
    }

    fn image_paint_for(&mut self, image: &RasterImage) -> SmilResult<vello_cpu::Image> {
        let key = Arc::as_ptr(&image.rgba8_premul) as usize;
        if let Some((_, paint)) = self.image_cache.get(&key) {
            return Ok(paint.clone());
        }
        let pixmap = image_premul_bytes_to_pixmap(&image.rgba8_premul, image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        // The cache keeps the bytes alive so the address cannot be reused.
        self.image_cache
            .insert(key, (Arc::clone(&image.rgba8_premul), paint.clone()));
        Ok(paint)
    }
}

impl RenderGraphics for CpuGraphics {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) -> SmilResult<()> {
        if viewport == self.viewport {
            return Ok(());
        }
        let (width, height) = surface_size(viewport)?;
        self.viewport = viewport;
        self.width = width;
        self.height = height;
        self.offscreen = vello_cpu::Pixmap::new(width, height);
        self.scratch = vello_cpu::Pixmap::new(width, height);
        self.ctx = None;
        Ok(())
    }

    fn begin(&mut self, tiles: &[Tile], clear: Rgba8) -> SmilResult<()> {
        let (w, h) = (u32::from(self.width), u32::from(self.height));
        let premul = clear.premultiplied();
        for t in tiles {
            fill_tile(self.offscreen.data_as_u8_slice_mut(), w, h, t, premul)?;
        }
        clear_pixmap(&mut self.scratch, [0, 0, 0, 0]);
        self.tiles = tiles.to_vec();
        match self.ctx.as_mut() {
            Some(ctx) => ctx.reset(),
            None => self.ctx = Some(vello_cpu::RenderContext::new(self.width, self.height)),
        }
        Ok(())
    }

    fn fill_path(&mut self, transform: Affine, path: &BezPath, color: Rgba8) -> SmilResult<()> {
        let cpu_path = bezpath_to_cpu(path);
        self.with_ctx_mut(|ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, color.a,
            ));
            ctx.fill_path(&cpu_path);
        })
    }

    fn stroke_path(
        &mut self,
        transform: Affine,
        path: &BezPath,
        color: Rgba8,
        width: f64,
    ) -> SmilResult<()> {
        let cpu_path = bezpath_to_cpu(path);
        self.with_ctx_mut(|ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_stroke(vello_cpu::kurbo::Stroke::new(width));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, color.a,
            ));
            ctx.stroke_path(&cpu_path);
        })
    }

    fn draw_image(
        &mut self,
        transform: Affine,
        image: &RasterImage,
        dest: Rect,
        opacity: f32,
    ) -> SmilResult<()> {
        if dest.width() <= 0.0 || dest.height() <= 0.0 || opacity <= 0.0 {
            return Ok(());
        }
        let paint = self.image_paint_for(image)?;
        let (w, h) = (f64::from(image.width), f64::from(image.height));
        let placement = transform
            * Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(dest.width() / w, dest.height() / h);
        self.with_ctx_mut(|ctx| {
            ctx.set_transform(affine_to_cpu(placement));
            ctx.set_paint(paint);
            if opacity < 1.0 {
                ctx.push_opacity_layer(opacity);
            }
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
            if opacity < 1.0 {
                ctx.pop_layer();
            }
        })
    }

    fn finish(&mut self) -> SmilResult<()> {
        let mut ctx = self
            .ctx
            .take()
            .ok_or_else(|| SmilError::render("finish without begin"))?;
        ctx.flush();
        ctx.render_to_pixmap(&mut self.scratch);
        self.ctx = Some(ctx);

        let (w, h) = (u32::from(self.width), u32::from(self.height));
        for t in std::mem::take(&mut self.tiles) {
            over_tile_in_place(
                self.offscreen.data_as_u8_slice_mut(),
                self.scratch.data_as_u8_slice(),
                w,
                h,
                &t,
            )?;
        }
        Ok(())
    }

    fn frame(&self) -> Option<FrameRGBA> {
        Some(FrameRGBA {
            width: u32::from(self.width),
            height: u32::from(self.height),
            data: self.offscreen.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn clear_pixmap(pixmap: &mut vello_cpu::Pixmap, rgba: [u8; 4]) {
    let data = pixmap.data_as_u8_slice_mut();
    for px in data.chunks_exact_mut(4) {
        px.copy_from_slice(&rgba);
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn point_to_cpu(p: crate::foundation::core::Point) -> vello_cpu::kurbo::Point {
    vello_cpu::kurbo::Point::new(p.x, p.y)
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(point_to_cpu(p)),
            PathEl::LineTo(p) => out.line_to(point_to_cpu(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(point_to_cpu(p1), point_to_cpu(p2)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to(point_to_cpu(p1), point_to_cpu(p2), point_to_cpu(p3));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> SmilResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| SmilError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| SmilError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(SmilError::render("image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
