use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum number of pages a build may spill into when multiple pages are allowed.
pub const MAX_ATLAS_PAGES: usize = 64;

/// Padding used when `pad_amount` is unset and the atlas is sampled with filtering.
pub const DEFAULT_FILTERED_PAD: u32 = 2;

/// Texture sampling mode the atlas is built for. Only affects the default padding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    Point,
    Bilinear,
    Trilinear,
}

impl FromStr for FilterMode {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "point" => Ok(Self::Point),
            "bilinear" => Ok(Self::Bilinear),
            "trilinear" => Ok(Self::Trilinear),
            _ => Err(()),
        }
    }
}

/// Which vertex attributes are generated besides positions and UVs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NormalGeneration {
    None,
    Normals,
    NormalsAndTangents,
}

impl FromStr for NormalGeneration {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "normals" => Ok(Self::Normals),
            "normals_and_tangents" | "tangents" => Ok(Self::NormalsAndTangents),
            _ => Err(()),
        }
    }
}

/// Global parameters of a sprite collection build.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Maximum page width in pixels.
    pub max_width: u32,
    /// Maximum page height in pixels.
    pub max_height: u32,
    /// Pages are exactly this size; disables the optimal size search and `force_square`.
    #[serde(default)]
    pub force_size: Option<(u32, u32)>,
    /// Keep pages square while searching for the optimal size.
    #[serde(default)]
    pub force_square: bool,
    /// Spill into up to `MAX_ATLAS_PAGES` pages instead of failing when one page is full.
    #[serde(default)]
    pub allow_multiple_pages: bool,
    /// Allow 90° rotations for placements where beneficial.
    pub allow_rotation: bool,

    /// Global trimming switch; entries trim only when this and their own flag are set.
    pub trim: bool,
    /// Multiply RGB by alpha while preprocessing. Additive entries require it.
    #[serde(default)]
    pub premultiplied_alpha: bool,
    /// Merge processed textures with identical pixels into one atlas slot.
    #[serde(default = "default_remove_duplicates")]
    pub remove_duplicates: bool,

    /// Base padding in pixels. `None` derives it from `filter_mode`.
    #[serde(default)]
    pub pad_amount: Option<u32>,
    #[serde(default = "default_filter_mode")]
    pub filter_mode: FilterMode,

    /// Resample sources by this factor before processing (values >= 0.999 mean no resampling).
    #[serde(default = "default_one")]
    pub global_texture_rescale: f32,
    /// Uniform scale applied to all sprite geometry.
    #[serde(default = "default_one")]
    pub global_scale: f32,
    /// Orthographic half-height of the target camera.
    #[serde(default = "default_one")]
    pub ortho_size: f32,
    /// Target screen height in pixels matching `ortho_size`.
    #[serde(default = "default_target_height")]
    pub target_height: f32,

    #[serde(default = "default_normal_generation")]
    pub normal_generation: NormalGeneration,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            max_width: 1024,
            max_height: 1024,
            force_size: None,
            force_square: false,
            allow_multiple_pages: false,
            allow_rotation: true,
            trim: true,
            premultiplied_alpha: false,
            remove_duplicates: default_remove_duplicates(),
            pad_amount: None,
            filter_mode: default_filter_mode(),
            global_texture_rescale: default_one(),
            global_scale: default_one(),
            ortho_size: default_one(),
            target_height: default_target_height(),
            normal_generation: default_normal_generation(),
        }
    }
}

impl BuildConfig {
    /// Validates the configuration parameters.
    ///
    /// Returns an error if:
    /// - Page dimensions (maximum or forced) are zero
    /// - A scale factor is zero, negative or not finite
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::AtlasError;

        if self.max_width == 0 || self.max_height == 0 {
            return Err(AtlasError::InvalidDimensions {
                width: self.max_width,
                height: self.max_height,
            });
        }
        if let Some((w, h)) = self.force_size {
            if w == 0 || h == 0 {
                return Err(AtlasError::InvalidDimensions {
                    width: w,
                    height: h,
                });
            }
        }

        let scales = [
            ("global_texture_rescale", self.global_texture_rescale),
            ("global_scale", self.global_scale),
            ("ortho_size", self.ortho_size),
            ("target_height", self.target_height),
        ];
        for (name, v) in scales {
            if !v.is_finite() || v <= 0.0 {
                return Err(AtlasError::InvalidConfig(format!(
                    "{name} must be a positive finite number, got {v}"
                )));
            }
        }
        if self.global_texture_rescale > 1.0 {
            return Err(AtlasError::InvalidConfig(format!(
                "global_texture_rescale only downsamples (<= 1.0), got {}",
                self.global_texture_rescale
            )));
        }

        Ok(())
    }

    /// Parses a JSON config document and validates it.
    pub fn from_json_str(s: &str) -> crate::error::Result<Self> {
        let cfg: BuildConfig = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Page size the packer starts from (forced size or maximum size).
    pub fn page_size(&self) -> (u32, u32) {
        self.force_size.unwrap_or((self.max_width, self.max_height))
    }

    pub fn max_pages(&self) -> usize {
        if self.allow_multiple_pages {
            MAX_ATLAS_PAGES
        } else {
            1
        }
    }

    /// Base padding before per-entry extra padding is added.
    pub fn base_padding(&self) -> u32 {
        match self.pad_amount {
            Some(p) => p,
            None if self.filter_mode == FilterMode::Point => 0,
            None => DEFAULT_FILTERED_PAD,
        }
    }

    /// Rescale factor actually applied; near-1 values snap to exactly 1.
    pub fn effective_rescale(&self) -> f32 {
        if self.global_texture_rescale < 0.999 {
            self.global_texture_rescale
        } else {
            1.0
        }
    }

    /// World units per source pixel.
    pub fn world_scale(&self) -> f32 {
        (2.0 * self.ortho_size / self.target_height) * self.global_scale / self.effective_rescale()
    }
}

fn default_remove_duplicates() -> bool {
    true
}
fn default_filter_mode() -> FilterMode {
    FilterMode::Bilinear
}
fn default_one() -> f32 {
    1.0
}
fn default_target_height() -> f32 {
    2.0
}
fn default_normal_generation() -> NormalGeneration {
    NormalGeneration::None
}

/// Builder for `BuildConfig` for ergonomic construction.
#[derive(Debug, Default, Clone)]
pub struct BuildConfigBuilder {
    cfg: BuildConfig,
}

impl BuildConfigBuilder {
    pub fn new() -> Self {
        Self {
            cfg: BuildConfig::default(),
        }
    }
    pub fn with_max_dimensions(mut self, w: u32, h: u32) -> Self {
        self.cfg.max_width = w;
        self.cfg.max_height = h;
        self
    }
    pub fn force_size(mut self, v: Option<(u32, u32)>) -> Self {
        self.cfg.force_size = v;
        self
    }
    pub fn force_square(mut self, v: bool) -> Self {
        self.cfg.force_square = v;
        self
    }
    pub fn allow_multiple_pages(mut self, v: bool) -> Self {
        self.cfg.allow_multiple_pages = v;
        self
    }
    pub fn allow_rotation(mut self, v: bool) -> Self {
        self.cfg.allow_rotation = v;
        self
    }
    pub fn trim(mut self, v: bool) -> Self {
        self.cfg.trim = v;
        self
    }
    pub fn premultiplied_alpha(mut self, v: bool) -> Self {
        self.cfg.premultiplied_alpha = v;
        self
    }
    pub fn remove_duplicates(mut self, v: bool) -> Self {
        self.cfg.remove_duplicates = v;
        self
    }
    pub fn pad_amount(mut self, v: Option<u32>) -> Self {
        self.cfg.pad_amount = v;
        self
    }
    pub fn filter_mode(mut self, v: FilterMode) -> Self {
        self.cfg.filter_mode = v;
        self
    }
    pub fn global_texture_rescale(mut self, v: f32) -> Self {
        self.cfg.global_texture_rescale = v;
        self
    }
    pub fn global_scale(mut self, v: f32) -> Self {
        self.cfg.global_scale = v;
        self
    }
    pub fn ortho_size(mut self, v: f32) -> Self {
        self.cfg.ortho_size = v;
        self
    }
    pub fn target_height(mut self, v: f32) -> Self {
        self.cfg.target_height = v;
        self
    }
    pub fn normal_generation(mut self, v: NormalGeneration) -> Self {
        self.cfg.normal_generation = v;
        self
    }
    pub fn build(self) -> BuildConfig {
        self.cfg
    }
}

impl BuildConfig {
    /// Create a fluent builder for `BuildConfig`.
    pub fn builder() -> BuildConfigBuilder {
        BuildConfigBuilder::new()
    }
}
