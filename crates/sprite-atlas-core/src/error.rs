use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AtlasError {
    /// Soft failure: the entry is replaced by a transparent placeholder.
    #[error("Source image missing for entry {index}")]
    MissingSource { index: usize },
    /// `index` is the source entry when returned by `AtlasBuilder::build`, and the
    /// position in the input slice when returned by `pack_pages`.
    #[error(
        "Texture {index} ({width}x{height}) does not fit a {max_width}x{max_height} atlas page"
    )]
    RectTooLarge {
        index: usize,
        width: u32,
        height: u32,
        max_width: u32,
        max_height: u32,
    },
    #[error("Out of atlas space: placed {placed}/{total} textures in {max_pages} page(s)")]
    CapacityExceeded {
        placed: usize,
        total: usize,
        max_pages: usize,
    },
    #[error("A build is already in progress on this builder")]
    ReentrantBuild,
    /// Soft failure: the island is skipped, the sprite keeps its remaining islands.
    #[error("Sprite {sprite}: geometry island {island} is degenerate ({points} points)")]
    InvalidGeometry {
        sprite: usize,
        island: usize,
        points: usize,
    },
    #[error("Invalid atlas dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Invalid animation clip: {0}")]
    InvalidClip(String),
    #[error("JSON error: {0}")]
    Json(String),
}

impl AtlasError {
    /// True for errors that degrade a single sprite instead of failing the build.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AtlasError::MissingSource { .. } | AtlasError::InvalidGeometry { .. }
        )
    }
}

impl From<serde_json::Error> for AtlasError {
    fn from(e: serde_json::Error) -> Self {
        AtlasError::Json(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AtlasError>;
