use crate::error::{AtlasError, Result};
use crate::image_buffer::ImageBuffer;
use glam::{Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle (pixels). `x,y` is top-left; `w,h` are sizes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
    /// Inclusive right edge coordinate (`x + w - 1`).
    pub fn right(&self) -> u32 {
        self.x + self.w.saturating_sub(1)
    }
    /// Inclusive bottom edge coordinate (`y + h - 1`).
    pub fn bottom(&self) -> u32 {
        self.y + self.h.saturating_sub(1)
    }
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }
    /// Returns true if `r` is fully inside `self` (inclusive edges).
    pub fn contains(&self, r: &Rect) -> bool {
        r.x >= self.x && r.y >= self.y && r.right() <= self.right() && r.bottom() <= self.bottom()
    }
    /// True if the two rectangles share at least one pixel.
    pub fn intersects(&self, r: &Rect) -> bool {
        !(self.x >= r.x + r.w || r.x >= self.x + self.w || self.y >= r.y + r.h || r.y >= self.y + self.h)
    }
}

/// Placement of one processed texture on an atlas page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackedRect {
    /// Atlas index of the processed texture (dense, post-dedup).
    pub index: usize,
    pub page: usize,
    pub x: u32,
    pub y: u32,
    /// Placed width (post-rotation).
    pub w: u32,
    /// Placed height (post-rotation).
    pub h: u32,
    /// True if the texture was rotated 90° when placed.
    pub rotated: bool,
}

impl PackedRect {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}

/// One composited atlas page.
#[derive(Debug, Clone)]
pub struct AtlasPage {
    pub width: u32,
    pub height: u32,
    pub pixels: ImageBuffer,
    /// Packed area / page area.
    pub occupancy: f32,
    pub rects: Vec<PackedRect>,
}

/// Axis-aligned bounds stored as center + full size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Bounds {
    pub center: Vec3,
    pub size: Vec3,
}

impl Bounds {
    pub fn from_min_max(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (max + min) / 2.0,
            size: max - min,
        }
    }

    /// Bounds of a point set; empty sets produce zero bounds.
    pub fn from_points(points: &[Vec3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let (min, max) = points
            .iter()
            .fold((Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)), |(lo, hi), p| {
                (lo.min(*p), hi.max(*p))
            });
        Self::from_min_max(min, max)
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.size / 2.0
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.size / 2.0
    }
}

/// Contiguous index range of a sprite drawn with one atlas page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MaterialRun {
    pub page: usize,
    pub first_index: usize,
    pub index_count: usize,
}

/// Final mesh and atlas mapping of one source entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpriteDefinition {
    pub name: String,
    pub positions: Vec<Vec3>,
    /// Atlas UVs (`v` up).
    pub uvs: Vec<Vec2>,
    /// UVs remapped to 0..1 over the sprite's own UV bounding box.
    pub normalized_uvs: Vec<Vec2>,
    pub indices: Vec<u32>,
    /// Empty unless normal generation is enabled.
    pub normals: Vec<Vec3>,
    /// Empty unless tangent generation is enabled.
    pub tangents: Vec<Vec4>,
    pub bounds: Bounds,
    pub untrimmed_bounds: Bounds,
    /// Size of one source pixel in world units.
    pub texel_size: Vec2,
    /// Page of the first material run.
    pub material_page: usize,
    pub material_runs: Vec<MaterialRun>,
    /// True if the (single) placement is rotated in the atlas.
    pub flipped: bool,
    /// True for triangulated custom geometry.
    pub complex_geometry: bool,
    /// True if the sprite maps onto the transparent placeholder texel.
    pub placeholder: bool,
}

/// A named run of consecutive sprites played back as an animation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub first_frame: usize,
    pub frame_count: usize,
    pub fps: f32,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, first_frame: usize, frame_count: usize, fps: f32) -> Self {
        Self {
            name: name.into(),
            first_frame,
            frame_count,
            fps,
        }
    }

    /// Playback length in seconds.
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 / self.fps
    }

    /// The sprite run referenced by this clip, if it is in range.
    pub fn frames<'a>(&self, sprites: &'a [SpriteDefinition]) -> Option<&'a [SpriteDefinition]> {
        sprites.get(self.first_frame..self.first_frame.checked_add(self.frame_count)?)
    }
}

/// Statistics about a finished build.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BuildStats {
    pub num_pages: usize,
    pub num_sprites: usize,
    /// Distinct textures placed in the atlas.
    pub num_textures: usize,
    /// Processed textures that were merged into another slot.
    pub num_duplicates: usize,
    pub total_page_area: u64,
    pub used_area: u64,
    /// used_area / total_page_area (0.0 to 1.0).
    pub occupancy: f64,
    pub max_page_width: u32,
    pub max_page_height: u32,
    pub num_rotated: usize,
}

impl BuildStats {
    /// Computes statistics from composited pages.
    pub fn from_pages(pages: &[AtlasPage], num_sprites: usize, num_duplicates: usize) -> Self {
        let mut num_textures = 0;
        let mut total_page_area = 0u64;
        let mut used_area = 0u64;
        let mut max_page_width = 0u32;
        let mut max_page_height = 0u32;
        let mut num_rotated = 0;

        for page in pages {
            total_page_area += page.width as u64 * page.height as u64;
            max_page_width = max_page_width.max(page.width);
            max_page_height = max_page_height.max(page.height);
            for r in &page.rects {
                num_textures += 1;
                used_area += r.rect().area();
                if r.rotated {
                    num_rotated += 1;
                }
            }
        }

        let occupancy = if total_page_area > 0 {
            used_area as f64 / total_page_area as f64
        } else {
            0.0
        };

        Self {
            num_pages: pages.len(),
            num_sprites,
            num_textures,
            num_duplicates,
            total_page_area,
            used_area,
            occupancy,
            max_page_width,
            max_page_height,
            num_rotated,
        }
    }

    /// Returns a human-readable summary of the statistics.
    pub fn summary(&self) -> String {
        format!(
            "Pages: {}, Sprites: {}, Textures: {}, Duplicates: {}, Occupancy: {:.2}%, Rotated: {}",
            self.num_pages,
            self.num_sprites,
            self.num_textures,
            self.num_duplicates,
            self.occupancy * 100.0,
            self.num_rotated,
        )
    }

    /// Returns wasted space in pixels.
    pub fn wasted_area(&self) -> u64 {
        self.total_page_area.saturating_sub(self.used_area)
    }
}

/// Result of a successful build: atlas pages plus one sprite per input entry.
#[derive(Debug, Clone)]
pub struct SpriteCollection {
    pub pages: Vec<AtlasPage>,
    /// Indexed by original input order.
    pub sprites: Vec<SpriteDefinition>,
    pub clips: Vec<AnimationClip>,
    /// Recoverable problems met during the build.
    pub warnings: Vec<AtlasError>,
    pub stats: BuildStats,
}

impl SpriteCollection {
    /// Registers an animation clip after checking it references existing sprites.
    pub fn add_clip(&mut self, clip: AnimationClip) -> Result<()> {
        if clip.frame_count == 0 {
            return Err(AtlasError::InvalidClip(format!(
                "clip '{}' has no frames",
                clip.name
            )));
        }
        if !clip.fps.is_finite() || clip.fps <= 0.0 {
            return Err(AtlasError::InvalidClip(format!(
                "clip '{}' has invalid frame rate {}",
                clip.name, clip.fps
            )));
        }
        if clip.frames(&self.sprites).is_none() {
            return Err(AtlasError::InvalidClip(format!(
                "clip '{}' references sprites {}..{} but only {} exist",
                clip.name,
                clip.first_frame,
                clip.first_frame.saturating_add(clip.frame_count),
                self.sprites.len()
            )));
        }
        self.clips.push(clip);
        Ok(())
    }

    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Finds the placement of an atlas index across pages.
    pub fn placement(&self, index: usize) -> Option<&PackedRect> {
        self.pages
            .iter()
            .flat_map(|p| p.rects.iter())
            .find(|r| r.index == index)
    }
}
