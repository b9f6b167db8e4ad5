use std::collections::HashMap;

use crate::{
    assets::decode::RasterImage,
    foundation::{
        core::{NodeId, Rgba8},
        error::SmilResult,
    },
    model::scene::{NodeKind, SceneModel},
    render::{dirty::DirtyRegion, graphics::RenderGraphics},
};

/// Image lookup used while painting. `None` means the image is still
/// loading; the node is skipped and repainted once the image arrives.
pub trait ImageResolver {
    fn resolve(&self, href: &str) -> Option<RasterImage>;
}

impl ImageResolver for HashMap<String, RasterImage> {
    fn resolve(&self, href: &str) -> Option<RasterImage> {
        self.get(href).cloned()
    }
}

/// Resolver for scenes without images. Every lookup yields the broken-image
/// placeholder.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoImages;

impl ImageResolver for NoImages {
    fn resolve(&self, _href: &str) -> Option<RasterImage> {
        Some(RasterImage::broken())
    }
}

/// Outcome of one paint pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PaintStats {
    pub tiles: usize,
    pub painted_nodes: usize,
    pub skipped_nodes: usize,
}

/// Repaints `region`: clears its tiles and draws, in paint order, every
/// rendering node whose device tile meets one of them. Painted nodes get
/// their tile recorded for the next dirty pass.
#[tracing::instrument(skip(scene, gfx, images))]
pub fn paint_region(
    scene: &mut SceneModel,
    gfx: &mut dyn RenderGraphics,
    region: &DirtyRegion,
    clear: Rgba8,
    images: &dyn ImageResolver,
) -> SmilResult<PaintStats> {
    let tiles = region.tiles();
    let mut stats = PaintStats {
        tiles: tiles.len(),
        ..PaintStats::default()
    };
    if tiles.is_empty() {
        return Ok(stats);
    }

    gfx.begin(&tiles, clear)?;
    for id in scene.paint_order() {
        let Some(tile) = scene.rendering_tile(id) else {
            scene.record_rendered(id, None);
            continue;
        };
        if !tiles.iter().any(|t| t.intersects(&tile)) {
            stats.skipped_nodes += 1;
            continue;
        }
        // Recorded even when not drawable yet, so the later paint clears it.
        if paint_node(scene, gfx, id, images)? {
            stats.painted_nodes += 1;
        }
        scene.record_rendered(id, Some(tile));
    }
    gfx.finish()?;
    tracing::debug!(
        tiles = stats.tiles,
        painted = stats.painted_nodes,
        skipped = stats.skipped_nodes,
        "paint pass"
    );
    Ok(stats)
}

fn paint_node(
    scene: &SceneModel,
    gfx: &mut dyn RenderGraphics,
    id: NodeId,
    images: &dyn ImageResolver,
) -> SmilResult<bool> {
    let transform = scene.device_transform(id);
    let kind = scene.kind(id)?;
    if kind == NodeKind::Image {
        let image = match scene.href(id) {
            Some(href) => match images.resolve(&href) {
                Some(img) => img,
                None => return Ok(false),
            },
            None => RasterImage::broken(),
        };
        if image.is_broken_placeholder() {
            tracing::warn!(node = ?id, "drawing broken image placeholder");
        }
        gfx.draw_image(transform, &image, scene.image_rect(id), scene.group_opacity(id))?;
        return Ok(true);
    }

    let Some(path) = scene.shape(id) else {
        return Ok(false);
    };
    if kind != NodeKind::Line
        && let Some(color) = scene.fill_color(id)
    {
        gfx.fill_path(transform, &path, color)?;
    }
    if let Some((color, width)) = scene.stroke(id) {
        gfx.stroke_path(transform, &path, color, width)?;
    }
    Ok(true)
}

#[cfg(test)]
#[path = "../../tests/unit/render/paint.rs"]
mod tests;
