use crate::image_buffer::ImageBuffer;
use crate::model::{AtlasPage, Rect};
use crate::packer::PageLayout;
use tracing::debug;

/// Blit `src` into `canvas` with its top-left at (dx, dy).
///
/// Rotated blits transpose the texture in the bottom-up (UV) frame: pixel (x, y)
/// of a `w × h` source lands at (dx + h - 1 - y, dy + w - 1 - x). Pixels falling
/// outside the canvas are dropped.
pub fn blit(src: &ImageBuffer, canvas: &mut ImageBuffer, dx: u32, dy: u32, rotated: bool) {
    let (sw, sh) = src.dimensions();
    if !rotated {
        canvas.copy_from(src, Rect::new(0, 0, sw, sh), dx, dy);
        return;
    }
    let (cw, ch) = canvas.dimensions();
    for y in 0..sh {
        let tx = dx + (sh - 1 - y);
        if tx >= cw {
            continue;
        }
        for x in 0..sw {
            let ty = dy + (sw - 1 - x);
            if ty < ch {
                canvas.put_pixel(tx, ty, src.get_pixel(x, y));
            }
        }
    }
}

/// Builds transparent pages and blits every placed texture into them.
///
/// `texture_for(index)` yields the pixels for an atlas index; indices without
/// pixels leave their slot transparent.
pub fn composite<'a, F>(layouts: &[PageLayout], texture_for: F) -> Vec<AtlasPage>
where
    F: Fn(usize) -> Option<&'a ImageBuffer>,
{
    layouts
        .iter()
        .enumerate()
        .map(|(page, layout)| {
            let mut pixels = ImageBuffer::new(layout.width, layout.height);
            for r in &layout.rects {
                if let Some(src) = texture_for(r.index) {
                    blit(src, &mut pixels, r.x, r.y, r.rotated);
                }
            }
            debug!(page, width = layout.width, height = layout.height, "composited page");
            AtlasPage {
                width: layout.width,
                height: layout.height,
                pixels,
                occupancy: layout.occupancy,
                rects: layout.rects.clone(),
            }
        })
        .collect()
}
