//! Core library for building sprite collections.
//!
//! - Preprocessing: alpha trimming, padding (extend / tile), dicing, premultiplied alpha
//! - Dedup: source-reference pass plus an XxHash64 content pass with dense atlas indices
//! - Packing: MaxRects (BAF/BLSF/BSSF/BL portfolio) with page size search and multi-page spill
//! - Geometry: per-sprite quads or triangulated custom islands with atlas UVs, bounds and normals
//!
//! Quick example:
//! ```no_run
//! use image::{Rgba, RgbaImage};
//! use sprite_atlas_core::prelude::*;
//! # fn main() -> Result<(), AtlasError> {
//! let entries = vec![
//!     SourceEntry::from_rgba("a", RgbaImage::from_pixel(16, 16, Rgba([255, 0, 0, 255]))),
//!     SourceEntry::from_rgba("b", RgbaImage::from_pixel(8, 24, Rgba([0, 255, 0, 255]))),
//! ];
//! let cfg = BuildConfig::builder().with_max_dimensions(256, 256).build();
//! let builder = AtlasBuilder::new(cfg);
//! let collection = builder.build(&entries)?;
//! println!("{}", collection.stats.summary());
//! # Ok(()) }
//! ```

pub mod compositing;
pub mod config;
pub mod dedup;
pub mod error;
pub mod geometry;
pub mod image_buffer;
pub mod model;
pub mod packer;
pub mod pipeline;
pub mod preprocess;
pub mod source;
pub mod triangulate;

pub use config::*;
pub use error::*;
pub use image_buffer::*;
pub use model::*;
pub use packer::*;
pub use pipeline::*;
pub use source::*;

/// Convenience prelude for common types.
/// Importing `sprite_atlas_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{BuildConfig, BuildConfigBuilder, FilterMode, NormalGeneration};
    pub use crate::error::AtlasError;
    pub use crate::image_buffer::ImageBuffer;
    pub use crate::model::{
        AnimationClip, AtlasPage, Bounds, BuildStats, MaterialRun, PackedRect, Rect,
        SpriteCollection, SpriteDefinition,
    };
    pub use crate::pipeline::AtlasBuilder;
    pub use crate::source::{Anchor, DiceFilter, GeometryIsland, PadMode, SourceEntry};
}
