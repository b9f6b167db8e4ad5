use super::*;

fn manager(w: u32, h: u32) -> DirtyAreaManager {
    DirtyAreaManager::new(Viewport::new(w, h).unwrap(), DEFAULT_TILE_MIN_SIZE).unwrap()
}

#[test]
fn first_pass_repaints_everything() {
    let mut dam = manager(200, 200);
    assert!(dam.has_pending());
    assert_eq!(dam.take_dirty_region(), DirtyRegion::Full(Tile::new(0, 0, 200, 200)));
    assert!(!dam.has_pending());
    assert_eq!(dam.take_dirty_region(), DirtyRegion::Clean);
}

#[test]
fn small_change_hits_one_leaf_tile() {
    let mut dam = manager(200, 200);
    dam.take_dirty_region();

    dam.add(Tile::new(5, 5, 10, 10));
    let region = dam.take_dirty_region();
    // 200 / 4 >= 40, so the root splits twice into 50x50 leaves
    assert_eq!(region, DirtyRegion::Tiles(vec![Tile::new(0, 0, 50, 50)]));
}

#[test]
fn straddling_change_hits_neighbouring_leaves() {
    let mut dam = manager(200, 200);
    dam.take_dirty_region();

    dam.add(Tile::new(45, 10, 10, 10));
    let tiles = dam.take_dirty_region().tiles();
    assert_eq!(tiles.len(), 2);
    assert!(tiles.contains(&Tile::new(0, 0, 50, 50)));
    assert!(tiles.contains(&Tile::new(50, 0, 50, 50)));
}

#[test]
fn full_quadrant_collapses_into_its_parent() {
    let mut dam = manager(200, 200);
    dam.take_dirty_region();

    dam.add(Tile::new(0, 0, 100, 100));
    assert_eq!(
        dam.take_dirty_region(),
        DirtyRegion::Tiles(vec![Tile::new(0, 0, 100, 100)])
    );

    dam.add(Tile::new(-10, -10, 500, 500));
    assert!(dam.take_dirty_region().is_full());
}

#[test]
fn small_viewports_use_a_single_tile() {
    let mut dam = manager(60, 60);
    dam.take_dirty_region();
    dam.add(Tile::new(1, 1, 2, 2));
    assert!(dam.take_dirty_region().is_full());
}

#[test]
fn viewport_change_and_invalidate_force_full_repaint() {
    let mut dam = manager(200, 200);
    dam.take_dirty_region();
    dam.set_viewport(Viewport::new(300, 200).unwrap());
    assert_eq!(dam.take_dirty_region(), DirtyRegion::Full(Tile::new(0, 0, 300, 200)));

    dam.invalidate();
    assert!(dam.take_dirty_region().is_full());
    assert!(dam.set_tile_min_size(0).is_err());
}

#[test]
fn offscreen_areas_are_ignored() {
    let mut dam = manager(200, 200);
    dam.take_dirty_region();
    dam.add(Tile::new(400, 400, 10, 10));
    assert_eq!(dam.take_dirty_region(), DirtyRegion::Clean);
}
