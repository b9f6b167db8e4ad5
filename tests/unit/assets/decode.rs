use std::io::Cursor;

use super::*;

pub(crate) fn png_bytes(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_png_premultiplies() {
    let buf = png_bytes(1, 1, vec![100, 50, 200, 128]);
    let img = decode_image(&buf).unwrap();
    assert_eq!((img.width, img.height), (1, 1));
    assert_eq!(
        img.rgba8_premul.as_slice(),
        &[
            ((100u16 * 128 + 127) / 255) as u8,
            ((50u16 * 128 + 127) / 255) as u8,
            ((200u16 * 128 + 127) / 255) as u8,
            128u8
        ]
    );
}

#[test]
fn garbage_is_an_error() {
    assert!(decode_image(b"not an image").is_err());
}

#[test]
fn placeholder_is_recognisable() {
    let b = RasterImage::broken();
    assert_eq!(b.rgba8_premul.len(), 8 * 8 * 4);
    assert!(b.is_broken_placeholder());
    let other = RasterImage::from_premul(1, 1, vec![0, 0, 0, 0]).unwrap();
    assert!(!other.is_broken_placeholder());
    assert!(RasterImage::from_premul(2, 2, vec![0; 4]).is_err());
}
