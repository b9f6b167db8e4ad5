use crate::{
    assets::decode::RasterImage,
    foundation::{
        core::{Affine, BezPath, Rect, Rgba8, Viewport},
        error::SmilResult,
    },
    render::tile::Tile,
};

/// Rendered frame in row-major RGBA8.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Pixel at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.data.get(i..i + 4).map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Straight-alpha copy, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        if !self.premultiplied {
            return self.data.clone();
        }
        let mut out = self.data.clone();
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// Drawing primitives the canvas needs from a render backend. Geometry
/// arrives already resolved to user space plus a device transform.
pub trait RenderGraphics: Send {
    fn viewport(&self) -> Viewport;

    fn set_viewport(&mut self, viewport: Viewport) -> SmilResult<()>;

    /// Starts a paint pass limited to `tiles`, cleared to `clear` first.
    fn begin(&mut self, tiles: &[Tile], clear: Rgba8) -> SmilResult<()>;

    fn fill_path(&mut self, transform: Affine, path: &BezPath, color: Rgba8) -> SmilResult<()>;

    fn stroke_path(
        &mut self,
        transform: Affine,
        path: &BezPath,
        color: Rgba8,
        width: f64,
    ) -> SmilResult<()>;

    /// Draws `image` stretched over `dest` (user space).
    fn draw_image(
        &mut self,
        transform: Affine,
        image: &RasterImage,
        dest: Rect,
        opacity: f32,
    ) -> SmilResult<()>;

    /// Ends the pass started by [`RenderGraphics::begin`].
    fn finish(&mut self) -> SmilResult<()>;

    /// Snapshot of the offscreen buffer, if the backend keeps one.
    fn frame(&self) -> Option<FrameRGBA>;
}

/// One recorded call on [`RecordingGraphics`].
#[derive(Clone, Debug, PartialEq)]
pub enum DrawCall {
    Begin { tiles: Vec<Tile>, clear: Rgba8 },
    Fill { transform: Affine, bounds: Rect, color: Rgba8 },
    Stroke { transform: Affine, bounds: Rect, color: Rgba8, width: f64 },
    Image { transform: Affine, dest: Rect, broken: bool, opacity: f32 },
    Finish,
}

/// Render collaborator that only records what it was asked to draw.
#[derive(Clone, Debug)]
pub struct RecordingGraphics {
    viewport: Viewport,
    calls: Vec<DrawCall>,
}

impl RecordingGraphics {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of completed paint passes recorded so far.
    pub fn pass_count(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, DrawCall::Finish))
            .count()
    }
}

impl RenderGraphics for RecordingGraphics {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_viewport(&mut self, viewport: Viewport) -> SmilResult<()> {
        self.viewport = viewport;
        Ok(())
    }

    fn begin(&mut self, tiles: &[Tile], clear: Rgba8) -> SmilResult<()> {
        self.calls.push(DrawCall::Begin {
            tiles: tiles.to_vec(),
            clear,
        });
        Ok(())
    }

    fn fill_path(&mut self, transform: Affine, path: &BezPath, color: Rgba8) -> SmilResult<()> {
        use kurbo::Shape;
        self.calls.push(DrawCall::Fill {
            transform,
            bounds: path.bounding_box(),
            color,
        });
        Ok(())
    }

    fn stroke_path(
        &mut self,
        transform: Affine,
        path: &BezPath,
        color: Rgba8,
        width: f64,
    ) -> SmilResult<()> {
        use kurbo::Shape;
        self.calls.push(DrawCall::Stroke {
            transform,
            bounds: path.bounding_box(),
            color,
            width,
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        transform: Affine,
        image: &RasterImage,
        dest: Rect,
        opacity: f32,
    ) -> SmilResult<()> {
        self.calls.push(DrawCall::Image {
            transform,
            dest,
            broken: image.is_broken_placeholder(),
            opacity,
        });
        Ok(())
    }

    fn finish(&mut self) -> SmilResult<()> {
        self.calls.push(DrawCall::Finish);
        Ok(())
    }

    fn frame(&self) -> Option<FrameRGBA> {
        None
    }
}
