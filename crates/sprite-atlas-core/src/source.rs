use crate::image_buffer::ImageBuffer;
use crate::model::Rect;
use glam::Vec2;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

/// How the padding border around a processed texture is filled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PadMode {
    /// Transparent border.
    None,
    /// Border repeats the nearest interior row/column.
    #[default]
    Extend,
    /// Left/right wrap around, top/bottom extend.
    TileX,
    /// Top/bottom wrap around, left/right extend.
    TileY,
    /// Both axes wrap around.
    TileXY,
}

impl PadMode {
    pub fn wraps_x(self) -> bool {
        matches!(self, PadMode::TileX | PadMode::TileXY)
    }
    pub fn wraps_y(self) -> bool {
        matches!(self, PadMode::TileY | PadMode::TileXY)
    }
}

impl FromStr for PadMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "extend" => Ok(Self::Extend),
            "tilex" | "tile_x" => Ok(Self::TileX),
            "tiley" | "tile_y" => Ok(Self::TileY),
            "tilexy" | "tile_xy" => Ok(Self::TileXY),
            _ => Err(()),
        }
    }
}

/// Which dice cells survive. Ignored when trimming is off.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DiceFilter {
    #[default]
    All,
    /// Keep fully opaque cells only.
    SolidOnly,
    /// Keep cells carrying any transparency.
    TransparentOnly,
}

/// Pivot of a sprite in source-pixel space (top-left origin).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    UpperLeft,
    UpperCenter,
    UpperRight,
    MiddleLeft,
    #[default]
    MiddleCenter,
    MiddleRight,
    LowerLeft,
    LowerCenter,
    LowerRight,
    /// Pixel position in unscaled source units.
    Custom(f32, f32),
}

impl Anchor {
    /// Resolves the pivot for a `width × height` source already rescaled by `rescale`.
    pub fn resolve(self, width: u32, height: u32, rescale: f32) -> Vec2 {
        let (w, h) = (width, height);
        let (x, y) = match self {
            Anchor::UpperLeft => (0, 0),
            Anchor::UpperCenter => (w / 2, 0),
            Anchor::UpperRight => (w, 0),
            Anchor::MiddleLeft => (0, h / 2),
            Anchor::MiddleCenter => (w / 2, h / 2),
            Anchor::MiddleRight => (w, h / 2),
            Anchor::LowerLeft => (0, h),
            Anchor::LowerCenter => (w / 2, h),
            Anchor::LowerRight => (w, h),
            Anchor::Custom(x, y) => return Vec2::new(x, y) * rescale,
        };
        Vec2::new(x as f32, y as f32)
    }
}

/// One polygon outline of a custom sprite shape, in source pixels (top-left origin).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GeometryIsland {
    pub points: Vec<Vec2>,
}

impl GeometryIsland {
    pub fn new(points: Vec<Vec2>) -> Self {
        Self { points }
    }
}

impl From<Vec<Vec2>> for GeometryIsland {
    fn from(points: Vec<Vec2>) -> Self {
        Self { points }
    }
}

/// One input image plus its packing parameters.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: String,
    /// `None` marks a missing source; it builds from a transparent placeholder.
    pub image: Option<Arc<ImageBuffer>>,
    /// Sub-rectangle of `image` used instead of the whole image (sprite sheets).
    pub region: Option<Rect>,
    pub trim: bool,
    pub pad_mode: PadMode,
    /// Added to the global padding.
    pub extra_padding: u32,
    pub dice: bool,
    pub dice_unit_w: i32,
    pub dice_unit_h: i32,
    pub dice_filter: DiceFilter,
    pub additive: bool,
    pub anchor: Anchor,
    pub scale: (f32, f32),
    pub custom_geometry: Option<Vec<GeometryIsland>>,
    pub allow_rotation: bool,
    pub double_sided: bool,
}

impl SourceEntry {
    pub fn new(name: impl Into<String>, image: Arc<ImageBuffer>) -> Self {
        Self {
            name: name.into(),
            image: Some(image),
            region: None,
            trim: true,
            pad_mode: PadMode::default(),
            extra_padding: 0,
            dice: false,
            dice_unit_w: 0,
            dice_unit_h: 0,
            dice_filter: DiceFilter::default(),
            additive: false,
            anchor: Anchor::default(),
            scale: (1.0, 1.0),
            custom_geometry: None,
            allow_rotation: true,
            double_sided: false,
        }
    }

    pub fn from_rgba(name: impl Into<String>, rgba: RgbaImage) -> Self {
        Self::new(name, Arc::new(ImageBuffer::from_rgba(rgba)))
    }

    /// Entry whose image could not be loaded.
    pub fn missing(name: impl Into<String>) -> Self {
        let mut e = Self::new(name, Arc::new(ImageBuffer::new(1, 1)));
        e.image = None;
        e
    }

    pub fn with_region(mut self, region: Rect) -> Self {
        self.region = Some(region);
        self
    }
    pub fn with_trim(mut self, v: bool) -> Self {
        self.trim = v;
        self
    }
    pub fn with_pad_mode(mut self, v: PadMode) -> Self {
        self.pad_mode = v;
        self
    }
    pub fn with_extra_padding(mut self, v: u32) -> Self {
        self.extra_padding = v;
        self
    }
    /// Enables dicing with the given cell size; non-positive units span the whole image.
    pub fn with_dice(mut self, unit_w: i32, unit_h: i32) -> Self {
        self.dice = true;
        self.dice_unit_w = unit_w;
        self.dice_unit_h = unit_h;
        self
    }
    pub fn with_dice_filter(mut self, v: DiceFilter) -> Self {
        self.dice_filter = v;
        self
    }
    pub fn with_additive(mut self, v: bool) -> Self {
        self.additive = v;
        self
    }
    pub fn with_anchor(mut self, v: Anchor) -> Self {
        self.anchor = v;
        self
    }
    pub fn with_scale(mut self, sx: f32, sy: f32) -> Self {
        self.scale = (sx, sy);
        self
    }
    pub fn with_custom_geometry(mut self, islands: Vec<GeometryIsland>) -> Self {
        self.custom_geometry = Some(islands);
        self
    }
    pub fn with_allow_rotation(mut self, v: bool) -> Self {
        self.allow_rotation = v;
        self
    }
    pub fn with_double_sided(mut self, v: bool) -> Self {
        self.double_sided = v;
        self
    }

    pub fn is_missing(&self) -> bool {
        self.image.is_none()
    }
}
