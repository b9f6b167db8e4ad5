use super::*;

#[test]
fn over_src_alpha_0_is_noop() {
    let dst = [10, 20, 30, 40];
    let src = [255, 255, 255, 0];
    assert_eq!(over(dst, src), dst);
}

#[test]
fn over_src_opaque_replaces_dst() {
    let dst = [0, 0, 0, 255];
    let src = [255, 0, 0, 255];
    assert_eq!(over(dst, src), src);
}

#[test]
fn tile_ops_leave_outside_pixels_alone() {
    let (w, h) = (4u32, 4u32);
    let mut dst = vec![0u8; 64];
    fill_tile(&mut dst, w, h, &Tile::new(1, 1, 2, 2), [9, 9, 9, 255]).unwrap();
    assert_eq!(&dst[0..4], &[0, 0, 0, 0]);
    assert_eq!(&dst[(4 + 1) * 4..(4 + 1) * 4 + 4], &[9, 9, 9, 255]);

    let src = vec![255u8; 64];
    over_tile_in_place(&mut dst, &src, w, h, &Tile::new(3, 3, 5, 5)).unwrap();
    assert_eq!(&dst[60..64], &[255, 255, 255, 255]);
    assert_eq!(&dst[56..60], &[0, 0, 0, 0]);
    assert!(fill_tile(&mut dst[..4], w, h, &Tile::new(0, 0, 1, 1), [0; 4]).is_err());
}

#[test]
fn over_blends_translucent_premultiplied_source() {
    let dst = [0, 0, 255, 255];
    let src = [128, 0, 0, 128];
    assert_eq!(over(dst, src), [128, 0, 127, 255]);
}
