use super::*;

#[test]
fn dirty_flag_is_reported_once() {
    let mut rm = RenderingManager::new();
    assert!(rm.mark_dirty());
    assert!(!rm.mark_dirty());
    rm.rendered(Some(Tile::new(0, 0, 4, 4)));
    assert!(!rm.is_dirty());
    assert_eq!(rm.last_rendered_tile(), Some(Tile::new(0, 0, 4, 4)));
    assert_eq!(rm.take_last_rendered_tile(), Some(Tile::new(0, 0, 4, 4)));
    assert_eq!(rm.last_rendered_tile(), None);
}
