use super::*;

fn full_rect(w: f64, h: f64) -> BezPath {
    use kurbo::Shape;
    Rect::new(0.0, 0.0, w, h).to_path(0.1)
}

#[test]
fn full_pass_paints_and_clears() {
    let vp = Viewport::new(16, 16).unwrap();
    let mut gfx = CpuGraphics::new(vp).unwrap();
    gfx.begin(&[Tile::viewport(vp)], Rgba8::WHITE).unwrap();
    gfx.fill_path(Affine::IDENTITY, &full_rect(8.0, 8.0), Rgba8::rgb(255, 0, 0))
        .unwrap();
    gfx.finish().unwrap();

    let frame = gfx.frame().unwrap();
    assert_eq!((frame.width, frame.height), (16, 16));
    assert_eq!(frame.pixel(2, 2), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(12, 12), Some([255, 255, 255, 255]));
}

#[test]
fn partial_pass_keeps_pixels_outside_its_tiles() {
    let vp = Viewport::new(16, 16).unwrap();
    let mut gfx = CpuGraphics::new(vp).unwrap();
    gfx.begin(&[Tile::viewport(vp)], Rgba8::WHITE).unwrap();
    gfx.finish().unwrap();

    gfx.begin(&[Tile::new(0, 0, 8, 8)], Rgba8::WHITE).unwrap();
    gfx.fill_path(Affine::IDENTITY, &full_rect(16.0, 16.0), Rgba8::rgb(0, 0, 255))
        .unwrap();
    gfx.finish().unwrap();

    let frame = gfx.frame().unwrap();
    assert_eq!(frame.pixel(4, 4), Some([0, 0, 255, 255]));
    assert_eq!(frame.pixel(12, 12), Some([255, 255, 255, 255]));
}

#[test]
fn images_are_scaled_into_their_rectangle() {
    let vp = Viewport::new(16, 16).unwrap();
    let mut gfx = CpuGraphics::new(vp).unwrap();
    let green = RasterImage::from_premul(2, 2, [0u8, 255, 0, 255].repeat(4)).unwrap();
    gfx.begin(&[Tile::viewport(vp)], Rgba8::WHITE).unwrap();
    gfx.draw_image(Affine::IDENTITY, &green, Rect::new(0.0, 0.0, 16.0, 8.0), 1.0)
        .unwrap();
    gfx.finish().unwrap();

    let frame = gfx.frame().unwrap();
    assert_eq!(frame.pixel(8, 3), Some([0, 255, 0, 255]));
    assert_eq!(frame.pixel(8, 12), Some([255, 255, 255, 255]));
}

#[test]
fn draw_outside_pass_is_an_error() {
    let vp = Viewport::new(4, 4).unwrap();
    let mut gfx = CpuGraphics::new(vp).unwrap();
    assert!(gfx
        .fill_path(Affine::IDENTITY, &full_rect(4.0, 4.0), Rgba8::BLACK)
        .is_err());
    assert!(gfx.finish().is_err());
    assert!(CpuGraphics::new(Viewport::new(70_000, 4).unwrap()).is_err());
}
