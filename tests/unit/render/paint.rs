use super::*;
use crate::{
    foundation::core::Viewport,
    model::traits::TraitId,
    render::{
        dirty::{DEFAULT_TILE_MIN_SIZE, DirtyAreaManager},
        graphics::{DrawCall, RecordingGraphics},
    },
};

fn rect(m: &mut SceneModel, id: &str, x: &str, y: &str) -> NodeId {
    let n = m.insert(m.root(), NodeKind::Rect, Some(id)).unwrap();
    m.set_trait_str(n, TraitId::X, x).unwrap();
    m.set_trait_str(n, TraitId::Y, y).unwrap();
    m.set_trait_str(n, TraitId::Width, "20").unwrap();
    m.set_trait_str(n, TraitId::Height, "20").unwrap();
    n
}

fn pass(
    m: &mut SceneModel,
    dam: &mut DirtyAreaManager,
    gfx: &mut RecordingGraphics,
    images: &dyn ImageResolver,
) -> PaintStats {
    m.collect_dirty_areas(dam);
    let region = dam.take_dirty_region();
    paint_region(m, gfx, &region, Rgba8::WHITE, images).unwrap()
}

#[test]
fn only_nodes_under_dirty_tiles_are_repainted() {
    let mut m = SceneModel::new(Viewport::new(200, 200).unwrap());
    let a = rect(&mut m, "a", "10", "10");
    let b = rect(&mut m, "b", "150", "150");
    let mut dam = DirtyAreaManager::new(m.viewport(), DEFAULT_TILE_MIN_SIZE).unwrap();
    let mut gfx = RecordingGraphics::new(m.viewport());

    let first = pass(&mut m, &mut dam, &mut gfx, &NoImages);
    assert_eq!(first.painted_nodes, 2);
    assert!(m.last_rendered_tile(a).is_some());
    assert!(m.last_rendered_tile(b).is_some());
    gfx.take_calls();

    m.set_trait_str(a, TraitId::Fill, "red").unwrap();
    let second = pass(&mut m, &mut dam, &mut gfx, &NoImages);
    assert_eq!(second.painted_nodes, 1);
    assert_eq!(second.skipped_nodes, 1);
    let fills: Vec<_> = gfx
        .calls()
        .iter()
        .filter_map(|c| match c {
            DrawCall::Fill { color, .. } => Some(*color),
            _ => None,
        })
        .collect();
    assert_eq!(fills, vec![Rgba8::rgb(255, 0, 0)]);
    assert_eq!(gfx.pass_count(), 1);
}

#[test]
fn clean_region_draws_nothing() {
    let mut m = SceneModel::new(Viewport::new(100, 100).unwrap());
    rect(&mut m, "a", "0", "0");
    let mut dam = DirtyAreaManager::new(m.viewport(), DEFAULT_TILE_MIN_SIZE).unwrap();
    let mut gfx = RecordingGraphics::new(m.viewport());
    pass(&mut m, &mut dam, &mut gfx, &NoImages);
    gfx.take_calls();

    let stats = pass(&mut m, &mut dam, &mut gfx, &NoImages);
    assert_eq!(stats, PaintStats::default());
    assert!(gfx.calls().is_empty());
}

#[test]
fn images_draw_when_resolved_and_wait_otherwise() {
    let mut m = SceneModel::new(Viewport::new(100, 100).unwrap());
    let img = m.insert(m.root(), NodeKind::Image, Some("i")).unwrap();
    m.set_trait_str(img, TraitId::Width, "30").unwrap();
    m.set_trait_str(img, TraitId::Height, "30").unwrap();
    m.set_trait_str(img, TraitId::Href, "pic.png").unwrap();
    let mut dam = DirtyAreaManager::new(m.viewport(), DEFAULT_TILE_MIN_SIZE).unwrap();
    let mut gfx = RecordingGraphics::new(m.viewport());

    let loading: HashMap<String, RasterImage> = HashMap::new();
    let stats = pass(&mut m, &mut dam, &mut gfx, &loading);
    assert_eq!(stats.painted_nodes, 0);
    assert!(m.last_rendered_tile(img).is_some());

    m.set_trait_str(img, TraitId::Href, "missing.png").unwrap();
    gfx.take_calls();
    let stats = pass(&mut m, &mut dam, &mut gfx, &NoImages);
    assert_eq!(stats.painted_nodes, 1);
    assert!(gfx.calls().iter().any(|c| matches!(
        c,
        DrawCall::Image { broken: true, dest, .. } if *dest == crate::foundation::core::Rect::new(0.0, 0.0, 30.0, 30.0)
    )));
}
