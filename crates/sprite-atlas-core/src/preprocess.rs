use crate::config::BuildConfig;
use crate::error::AtlasError;
use crate::image_buffer::ImageBuffer;
use crate::model::Rect;
use crate::source::{Anchor, DiceFilter, GeometryIsland, PadMode, SourceEntry};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A trimmed, padded texture ready for packing: one per plain entry or one per dice tile.
#[derive(Debug, Clone)]
pub struct ProcessedTexture {
    pub pixels: ImageBuffer,
    /// Index of the originating `SourceEntry`.
    pub source_index: usize,
    /// True for dice tiles.
    pub is_split: bool,
    /// Content rectangle in source pixels (top-left origin), excluding padding.
    pub split_rect: Rect,
    pub pad: u32,
    pub allow_rotation: bool,
    /// Dense slot in the atlas; shared by duplicates.
    pub atlas_index: usize,
    /// Atlas index of the texture this one merged into.
    pub duplicate_of: Option<usize>,
    pub content_hash: Option<String>,
    /// Transparent stand-in for a region with nothing visible.
    pub blank: bool,
    /// Packed size recorded before the pixels are released.
    width: u32,
    height: u32,
}

impl ProcessedTexture {
    pub fn new(pixels: ImageBuffer, source_index: usize, split_rect: Rect, pad: u32) -> Self {
        let (width, height) = pixels.dimensions();
        Self {
            pixels,
            source_index,
            is_split: false,
            split_rect,
            pad,
            allow_rotation: true,
            atlas_index: 0,
            duplicate_of: None,
            content_hash: None,
            blank: false,
            width,
            height,
        }
    }

    /// Padded width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Padded height.
    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }

    /// Frees the pixel buffer; dimensions stay available for geometry.
    pub fn release(&mut self) {
        self.pixels = ImageBuffer::new(0, 0);
    }
}

/// Per-entry settings after resolving missing sources, regions and global switches.
#[derive(Debug, Clone)]
pub struct PreparedSource {
    /// Region-extracted, rescaled source pixels.
    pub image: Arc<ImageBuffer>,
    pub trim: bool,
    pub dice: bool,
    pub dice_unit_w: i32,
    pub dice_unit_h: i32,
    pub dice_filter: DiceFilter,
    pub pad: u32,
    pub pad_mode: PadMode,
    pub additive: bool,
    pub anchor: Anchor,
    pub allow_rotation: bool,
    /// Islands already scaled into processed-source pixels.
    pub islands: Option<Vec<GeometryIsland>>,
}

impl PreparedSource {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Resolves source images for a batch of entries.
///
/// Entries sharing one image and region share one prepared `Arc`, so reference
/// identity survives region extraction and rescaling.
pub struct SourceResolver<'a> {
    cfg: &'a BuildConfig,
    placeholder: Arc<ImageBuffer>,
    cache: HashMap<(usize, Option<Rect>), Arc<ImageBuffer>>,
}

impl<'a> SourceResolver<'a> {
    pub fn new(cfg: &'a BuildConfig) -> Self {
        Self {
            cfg,
            placeholder: Arc::new(ImageBuffer::new(1, 1)),
            cache: HashMap::new(),
        }
    }

    /// Resolves one entry. Missing or empty sources come back with a `MissingSource` warning.
    pub fn resolve(&mut self, index: usize, entry: &SourceEntry) -> (PreparedSource, Option<AtlasError>) {
        match self.load(entry) {
            Some(image) => (self.prepared(entry, image), None),
            None => {
                warn!(index, name = %entry.name, "source image missing, using placeholder");
                let prepared = PreparedSource {
                    image: Arc::clone(&self.placeholder),
                    trim: false,
                    dice: false,
                    dice_unit_w: 0,
                    dice_unit_h: 0,
                    dice_filter: DiceFilter::All,
                    pad: self.cfg.base_padding() + entry.extra_padding,
                    pad_mode: entry.pad_mode,
                    additive: false,
                    anchor: Anchor::MiddleCenter,
                    allow_rotation: entry.allow_rotation,
                    islands: None,
                };
                (prepared, Some(AtlasError::MissingSource { index }))
            }
        }
    }

    fn load(&mut self, entry: &SourceEntry) -> Option<Arc<ImageBuffer>> {
        let image = entry.image.as_ref()?;
        if image.is_empty() {
            return None;
        }
        let rescale = self.cfg.effective_rescale();
        if entry.region.is_none() && rescale == 1.0 {
            return Some(Arc::clone(image));
        }
        let key = (Arc::as_ptr(image) as usize, entry.region);
        if let Some(hit) = self.cache.get(&key) {
            return Some(Arc::clone(hit));
        }
        let mut buf = match entry.region {
            Some(r) => image.sub_image(r),
            None => (**image).clone(),
        };
        if buf.is_empty() {
            return None;
        }
        if rescale != 1.0 {
            buf = buf.rescaled(rescale);
        }
        let out = Arc::new(buf);
        self.cache.insert(key, Arc::clone(&out));
        Some(out)
    }

    fn prepared(&self, entry: &SourceEntry, image: Arc<ImageBuffer>) -> PreparedSource {
        let rescale = self.cfg.effective_rescale();
        let islands = if entry.dice {
            None
        } else {
            entry.custom_geometry.as_ref().map(|islands| {
                islands
                    .iter()
                    .map(|isl| GeometryIsland::new(isl.points.iter().map(|p| *p * rescale).collect()))
                    .collect()
            })
        };
        PreparedSource {
            image,
            trim: self.cfg.trim && entry.trim,
            dice: entry.dice,
            dice_unit_w: entry.dice_unit_w,
            dice_unit_h: entry.dice_unit_h,
            dice_filter: entry.dice_filter,
            pad: self.cfg.base_padding() + entry.extra_padding,
            pad_mode: entry.pad_mode,
            additive: entry.additive && self.cfg.premultiplied_alpha,
            anchor: entry.anchor,
            allow_rotation: entry.allow_rotation,
            islands,
        }
    }
}

/// Options for processing a single region.
#[derive(Debug, Clone, Copy)]
pub struct ProcessOptions<'a> {
    pub trim: bool,
    pub pad: u32,
    pub pad_mode: PadMode,
    pub premultiply: bool,
    pub additive: bool,
    /// Dice tiles pad from the surrounding source pixels instead of `pad_mode`.
    pub diced: bool,
    pub islands: Option<&'a [GeometryIsland]>,
}

/// Trims, pads and optionally premultiplies `region` of `src`.
///
/// Returns the padded buffer and the content rectangle in source pixels, or `None`
/// when trimming is on and the region is fully transparent.
pub fn process_region(
    src: &ImageBuffer,
    region: Rect,
    opts: &ProcessOptions<'_>,
) -> Option<(ImageBuffer, Rect)> {
    let (cols, rows, visible) = src.alpha_coverage(region);
    if opts.trim && visible == 0 {
        return None;
    }

    let content = if !opts.trim {
        region
    } else if let Some(islands) = opts.islands.filter(|i| i.iter().any(|isl| !isl.points.is_empty())) {
        island_bounds(islands, region)
    } else {
        // `visible > 0` guarantees at least one flag in each direction.
        let x0 = cols.iter().position(|&c| c).unwrap_or(0) as u32;
        let x1 = cols.iter().rposition(|&c| c).unwrap_or(0) as u32;
        let y0 = rows.iter().position(|&r| r).unwrap_or(0) as u32;
        let y1 = rows.iter().rposition(|&r| r).unwrap_or(0) as u32;
        Rect::new(region.x + x0, region.y + y0, x1 - x0 + 1, y1 - y0 + 1)
    };

    let pad = opts.pad;
    let mut out = ImageBuffer::new(content.w + 2 * pad, content.h + 2 * pad);
    out.copy_from(src, content, pad, pad);

    if opts.diced {
        pad_from_source(&mut out, src, content, pad);
        if opts.premultiply {
            out.premultiply_alpha(opts.additive);
        }
    } else {
        if opts.premultiply {
            out.premultiply_alpha(opts.additive);
        }
        pad_border(&mut out, pad, opts.pad_mode);
    }

    Some((out, content))
}

/// Bounds of the (already rescaled) island points, clamped to `region`.
fn island_bounds(islands: &[GeometryIsland], region: Rect) -> Rect {
    let (mut x0, mut y0, mut x1, mut y1) = (i64::MAX, i64::MAX, i64::MIN, i64::MIN);
    for p in islands.iter().flat_map(|isl| isl.points.iter()) {
        x0 = x0.min(p.x.floor() as i64);
        y0 = y0.min(p.y.floor() as i64);
        x1 = x1.max(p.x.ceil() as i64);
        y1 = y1.max(p.y.ceil() as i64);
    }
    let max_x = region.w as i64 - 1;
    let max_y = region.h as i64 - 1;
    let x1 = x1.clamp(0, max_x);
    let y1 = y1.clamp(0, max_y);
    let x0 = x0.clamp(0, x1);
    let y0 = y0.clamp(0, y1);
    Rect::new(
        region.x + x0 as u32,
        region.y + y0 as u32,
        (x1 - x0 + 1) as u32,
        (y1 - y0 + 1) as u32,
    )
}

/// Row/column a border cell copies from, or `None` for a transparent cell.
fn border_source(i: u32, pad: u32, inner: u32, wrap: bool, mode: PadMode) -> Option<u32> {
    if mode == PadMode::None {
        return None;
    }
    let rel = i as i64 - pad as i64;
    let src = if wrap {
        rel.rem_euclid(inner as i64)
    } else {
        rel.clamp(0, inner as i64 - 1)
    };
    Some(pad + src as u32)
}

/// Fills the `pad`-wide border of `buf` around its centred content.
/// Rows are filled first across the full width, then columns over the full height.
pub fn pad_border(buf: &mut ImageBuffer, pad: u32, mode: PadMode) {
    if pad == 0 || mode == PadMode::None {
        return;
    }
    let (w, h) = buf.dimensions();
    let inner_w = w - 2 * pad;
    let inner_h = h - 2 * pad;
    if inner_w == 0 || inner_h == 0 {
        return;
    }

    for y in (0..pad).chain(h - pad..h) {
        if let Some(from) = border_source(y, pad, inner_h, mode.wraps_y(), mode) {
            buf.copy_row(from, y);
        }
    }
    for x in (0..pad).chain(w - pad..w) {
        if let Some(from) = border_source(x, pad, inner_w, mode.wraps_x(), mode) {
            buf.copy_column(from, x);
        }
    }
}

/// Fills the border of a dice tile with the source pixels around `content`, clamped to the source.
fn pad_from_source(buf: &mut ImageBuffer, src: &ImageBuffer, content: Rect, pad: u32) {
    if pad == 0 {
        return;
    }
    let (w, h) = buf.dimensions();
    let ox = content.x as i64 - pad as i64;
    let oy = content.y as i64 - pad as i64;
    for y in 0..h {
        let interior_row = y >= pad && y < h - pad;
        let mut x = 0;
        while x < w {
            if interior_row && x == pad {
                x = w - pad;
                continue;
            }
            let px = src.get_pixel_clamped(ox + x as i64, oy + y as i64);
            buf.put_pixel(x, y, px);
            x += 1;
        }
    }
}

/// Processes one entry into its textures: zero or more dice tiles, or exactly one
/// texture for plain entries (a padded transparent texel when nothing is visible).
pub fn process_entry(index: usize, prepared: &PreparedSource, cfg: &BuildConfig) -> Vec<ProcessedTexture> {
    let src = prepared.image.as_ref();
    let (w, h) = src.dimensions();
    let opts = ProcessOptions {
        trim: prepared.trim,
        pad: prepared.pad,
        pad_mode: prepared.pad_mode,
        premultiply: cfg.premultiplied_alpha,
        additive: prepared.additive,
        diced: false,
        islands: prepared.islands.as_deref(),
    };

    if !prepared.dice {
        let mut tex = match process_region(src, Rect::new(0, 0, w, h), &opts) {
            Some((pixels, content)) => ProcessedTexture::new(pixels, index, content, prepared.pad),
            None => {
                let mut pixels = ImageBuffer::new(1 + 2 * prepared.pad, 1 + 2 * prepared.pad);
                pad_border(&mut pixels, prepared.pad, prepared.pad_mode);
                let mut tex =
                    ProcessedTexture::new(pixels, index, Rect::new(w / 2, h / 2, 1, 1), prepared.pad);
                tex.blank = true;
                tex
            }
        };
        tex.allow_rotation = prepared.allow_rotation;
        return vec![tex];
    }

    dice_entry(index, prepared, cfg, &opts)
}

fn dice_entry(
    index: usize,
    prepared: &PreparedSource,
    cfg: &BuildConfig,
    opts: &ProcessOptions<'_>,
) -> Vec<ProcessedTexture> {
    let src = prepared.image.as_ref();
    let (w, h) = src.dimensions();
    let (unit_w, unit_h) = dice_units(prepared, cfg);
    let tile_opts = ProcessOptions {
        diced: true,
        islands: None,
        ..*opts
    };

    let mut out = Vec::new();
    for sx in (0..w).step_by(unit_w as usize) {
        for sy in (0..h).step_by(unit_h as usize) {
            let cell = Rect::new(sx, sy, unit_w.min(w - sx), unit_h.min(h - sy));
            if prepared.trim {
                let keep = match prepared.dice_filter {
                    DiceFilter::All => true,
                    DiceFilter::SolidOnly => src.is_fully_opaque(cell),
                    DiceFilter::TransparentOnly => !src.is_fully_opaque(cell),
                };
                if !keep {
                    continue;
                }
            }
            if let Some((pixels, content)) = process_region(src, cell, &tile_opts) {
                let mut tex = ProcessedTexture::new(pixels, index, content, prepared.pad);
                tex.is_split = true;
                tex.allow_rotation = prepared.allow_rotation;
                out.push(tex);
            }
        }
    }
    out
}

/// Dice cell size in processed-source pixels; non-positive units span the image.
pub fn dice_units(prepared: &PreparedSource, cfg: &BuildConfig) -> (u32, u32) {
    let rescale = cfg.effective_rescale();
    let unit = |raw: i32, full: u32| {
        let scaled = (raw as f32 * rescale) as i64;
        if scaled <= 0 { full } else { scaled as u32 }
    };
    (
        unit(prepared.dice_unit_w, prepared.width()),
        unit(prepared.dice_unit_h, prepared.height()),
    )
}
