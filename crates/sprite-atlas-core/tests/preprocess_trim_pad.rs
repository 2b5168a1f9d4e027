use image::{Rgba, RgbaImage};
use sprite_atlas_core::preprocess::{ProcessOptions, pad_border, process_region};
use sprite_atlas_core::{ImageBuffer, PadMode, Rect};

/// `size × size` transparent image with an opaque gradient square at (`at`, `at`).
fn framed_square(size: u32, at: u32, side: u32) -> ImageBuffer {
    let mut img = RgbaImage::new(size, size);
    for y in at..at + side {
        for x in at..at + side {
            img.put_pixel(x, y, Rgba([(x * 10) as u8, (y * 10) as u8, 7, 255]));
        }
    }
    ImageBuffer::from_rgba(img)
}

fn opts(trim: bool, pad: u32, pad_mode: PadMode) -> ProcessOptions<'static> {
    ProcessOptions {
        trim,
        pad,
        pad_mode,
        premultiply: false,
        additive: false,
        diced: false,
        islands: None,
    }
}

#[test]
fn trim_keeps_only_visible_pixels() {
    let src = framed_square(20, 5, 10);
    let (buf, content) =
        process_region(&src, Rect::new(0, 0, 20, 20), &opts(true, 0, PadMode::Extend)).expect("visible");
    assert_eq!(buf.dimensions(), (10, 10));
    assert_eq!(content, Rect::new(5, 5, 10, 10));
    assert_eq!(buf.get_pixel(0, 0), src.get_pixel(5, 5));
    assert_eq!(buf.get_pixel(9, 9), src.get_pixel(14, 14));
}

#[test]
fn untrimmed_region_is_kept_whole() {
    let src = framed_square(20, 5, 10);
    let (buf, content) =
        process_region(&src, Rect::new(0, 0, 20, 20), &opts(false, 0, PadMode::Extend)).expect("region");
    assert_eq!(buf.dimensions(), (20, 20));
    assert_eq!(content, Rect::new(0, 0, 20, 20));
}

#[test]
fn fully_transparent_region_trims_to_nothing() {
    let src = ImageBuffer::new(8, 8);
    assert!(process_region(&src, Rect::new(0, 0, 8, 8), &opts(true, 2, PadMode::Extend)).is_none());
    assert!(process_region(&src, Rect::new(0, 0, 8, 8), &opts(false, 0, PadMode::Extend)).is_some());
}

#[test]
fn extend_padding_repeats_edges() {
    let src = framed_square(20, 5, 10);
    let (buf, _) =
        process_region(&src, Rect::new(0, 0, 20, 20), &opts(true, 2, PadMode::Extend)).expect("visible");
    assert_eq!(buf.dimensions(), (14, 14));
    // Corners take the nearest content corner.
    assert_eq!(buf.get_pixel(0, 0), buf.get_pixel(2, 2));
    assert_eq!(buf.get_pixel(13, 13), buf.get_pixel(11, 11));
    // Edges repeat the adjacent content row/column.
    assert_eq!(buf.get_pixel(0, 5), buf.get_pixel(2, 5));
    assert_eq!(buf.get_pixel(13, 7), buf.get_pixel(11, 7));
    assert_eq!(buf.get_pixel(5, 13), buf.get_pixel(5, 11));
    assert_eq!(buf.get_pixel(6, 1), buf.get_pixel(6, 2));
}

#[test]
fn no_padding_mode_leaves_border_transparent() {
    let src = framed_square(8, 0, 8);
    let (buf, _) =
        process_region(&src, Rect::new(0, 0, 8, 8), &opts(true, 1, PadMode::None)).expect("visible");
    assert_eq!(buf.dimensions(), (10, 10));
    for i in 0..10 {
        assert_eq!(buf.get_pixel(i, 0)[3], 0);
        assert_eq!(buf.get_pixel(0, i)[3], 0);
        assert_eq!(buf.get_pixel(i, 9)[3], 0);
        assert_eq!(buf.get_pixel(9, i)[3], 0);
    }
    assert_eq!(buf.get_pixel(1, 1), src.get_pixel(0, 0));
}

#[test]
fn tile_x_wraps_columns_and_extends_rows() {
    let mut buf = ImageBuffer::new(5, 5);
    for y in 1..4 {
        for x in 1..4 {
            buf.put_pixel(x, y, [x as u8 * 40, y as u8 * 40, 0, 255]);
        }
    }
    pad_border(&mut buf, 1, PadMode::TileX);
    // Left border takes the rightmost content column, right border the leftmost.
    assert_eq!(buf.get_pixel(0, 2), buf.get_pixel(3, 2));
    assert_eq!(buf.get_pixel(4, 2), buf.get_pixel(1, 2));
    // Top and bottom extend.
    assert_eq!(buf.get_pixel(2, 0), buf.get_pixel(2, 1));
    assert_eq!(buf.get_pixel(2, 4), buf.get_pixel(2, 3));
}

#[test]
fn tile_y_wraps_rows_and_extends_columns() {
    let mut buf = ImageBuffer::new(5, 5);
    for y in 1..4 {
        for x in 1..4 {
            buf.put_pixel(x, y, [x as u8 * 40, y as u8 * 40, 0, 255]);
        }
    }
    pad_border(&mut buf, 1, PadMode::TileY);
    // Top border takes the bottom content row, bottom border the top one.
    assert_eq!(buf.get_pixel(2, 0), buf.get_pixel(2, 3));
    assert_eq!(buf.get_pixel(2, 4), buf.get_pixel(2, 1));
    // Left and right extend.
    assert_eq!(buf.get_pixel(0, 2), buf.get_pixel(1, 2));
    assert_eq!(buf.get_pixel(4, 2), buf.get_pixel(3, 2));
    assert_ne!(buf.get_pixel(2, 0), buf.get_pixel(2, 1));
}

#[test]
fn tile_xy_wraps_both_axes() {
    let mut buf = ImageBuffer::new(5, 5);
    for y in 1..4 {
        for x in 1..4 {
            buf.put_pixel(x, y, [x as u8 * 40, y as u8 * 40, 0, 255]);
        }
    }
    pad_border(&mut buf, 1, PadMode::TileXY);
    assert_eq!(buf.get_pixel(2, 0), buf.get_pixel(2, 3));
    assert_eq!(buf.get_pixel(2, 4), buf.get_pixel(2, 1));
    assert_eq!(buf.get_pixel(0, 0), buf.get_pixel(3, 3));
}

#[test]
fn premultiply_scales_color_by_alpha() {
    let src = ImageBuffer::from_pixel(2, 2, [200, 100, 50, 128]);
    let o = ProcessOptions {
        premultiply: true,
        ..opts(false, 0, PadMode::Extend)
    };
    let (buf, _) = process_region(&src, Rect::new(0, 0, 2, 2), &o).expect("region");
    assert_eq!(buf.get_pixel(0, 0), [100, 50, 25, 128]);
}

#[test]
fn additive_premultiply_zeroes_alpha() {
    let src = ImageBuffer::from_pixel(2, 2, [200, 100, 50, 128]);
    let o = ProcessOptions {
        premultiply: true,
        additive: true,
        ..opts(false, 0, PadMode::Extend)
    };
    let (buf, _) = process_region(&src, Rect::new(0, 0, 2, 2), &o).expect("region");
    assert_eq!(buf.get_pixel(1, 1), [100, 50, 25, 0]);
}

#[test]
fn trim_within_subregion_reports_source_coordinates() {
    let src = framed_square(20, 5, 10);
    let (buf, content) =
        process_region(&src, Rect::new(10, 10, 10, 10), &opts(true, 0, PadMode::Extend)).expect("visible");
    assert_eq!(content, Rect::new(10, 10, 5, 5));
    assert_eq!(buf.get_pixel(0, 0), src.get_pixel(10, 10));
}
