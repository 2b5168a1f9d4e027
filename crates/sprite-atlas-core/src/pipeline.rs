use crate::config::BuildConfig;
use crate::dedup;
use crate::error::{AtlasError, Result};
use crate::geometry::{GeometryBuilder, SpriteSource, TexturePlacement};
use crate::model::{BuildStats, PackedRect, Rect, SpriteCollection};
use crate::packer::{PackInput, PackOptions, PageLayout, pack_pages};
use crate::preprocess::{PreparedSource, ProcessedTexture, SourceResolver, process_entry};
use crate::source::SourceEntry;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, instrument};

/// Callback invoked with the result of every successful build.
pub type BuildObserver = Arc<dyn Fn(&SpriteCollection) + Send + Sync>;

/// Builds sprite collections from source entries.
///
/// A builder runs one build at a time: a build requested while another is in
/// progress (including from inside an observer) fails with `ReentrantBuild`.
pub struct AtlasBuilder {
    config: BuildConfig,
    busy: AtomicBool,
    observers: Mutex<Vec<BuildObserver>>,
}

/// Clears the busy flag when dropped.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AtlasBuilder {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            busy: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn is_building(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Registers a post-build observer.
    ///
    /// Observers registered from inside another observer run from the next build on.
    pub fn subscribe<F>(&self, observer: F)
    where
        F: Fn(&SpriteCollection) + Send + Sync + 'static,
    {
        self.observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(Arc::new(observer));
    }

    fn claim(&self) -> Result<BuildGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AtlasError::ReentrantBuild)?;
        Ok(BuildGuard(&self.busy))
    }

    /// Runs the whole pipeline: preprocess, dedup, pack, composite, geometry.
    ///
    /// Returns one sprite per entry, in input order. Packing failures abort the build
    /// without exposing partial pages; missing sources and degenerate geometry islands
    /// are reported in `SpriteCollection::warnings` instead.
    #[instrument(skip_all, fields(entries = entries.len()))]
    pub fn build(&self, entries: &[SourceEntry]) -> Result<SpriteCollection> {
        let _guard = self.claim()?;
        self.config.validate()?;
        let collection = build_collection(&self.config, entries)?;
        debug!(summary = %collection.stats.summary(), "build finished");

        // The lock is released before the calls; observers may subscribe.
        let observers = self
            .observers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        for observer in &observers {
            observer(&collection);
        }
        Ok(collection)
    }
}

/// Textures of every entry plus the bookkeeping that maps entries to atlas slots.
struct Catalog {
    prepared: Vec<PreparedSource>,
    textures: Vec<ProcessedTexture>,
    /// Positions in `textures` used by each entry.
    entry_textures: Vec<Vec<usize>>,
    warnings: Vec<AtlasError>,
    reference_duplicates: usize,
}

fn catalog(cfg: &BuildConfig, entries: &[SourceEntry]) -> Catalog {
    let mut resolver = SourceResolver::new(cfg);
    let mut warnings = Vec::new();
    let prepared: Vec<PreparedSource> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| {
            let (p, warning) = resolver.resolve(i, e);
            warnings.extend(warning);
            p
        })
        .collect();

    let reference = dedup::find_reference_duplicates(&prepared);
    let mut textures: Vec<ProcessedTexture> = Vec::new();
    let mut entry_textures: Vec<Vec<usize>> = Vec::with_capacity(entries.len());
    for (i, p) in prepared.iter().enumerate() {
        if let Some(original) = reference[i] {
            let shared = entry_textures[original].clone();
            entry_textures.push(shared);
            continue;
        }
        let mut own = Vec::new();
        for mut tex in process_entry(i, p, cfg) {
            tex.atlas_index = textures.len();
            own.push(textures.len());
            textures.push(tex);
        }
        entry_textures.push(own);
    }

    Catalog {
        prepared,
        textures,
        entry_textures,
        warnings,
        reference_duplicates: reference.iter().filter(|r| r.is_some()).count(),
    }
}

fn build_collection(cfg: &BuildConfig, entries: &[SourceEntry]) -> Result<SpriteCollection> {
    let Catalog {
        prepared,
        mut textures,
        entry_textures,
        mut warnings,
        reference_duplicates,
    } = catalog(cfg, entries);

    let merged = if cfg.remove_duplicates {
        dedup::remove_duplicates(&mut textures)
    } else {
        0
    };

    // Texture position for every atlas index.
    let slots: Vec<usize> = textures
        .iter()
        .enumerate()
        .filter(|(_, t)| !t.is_duplicate())
        .map(|(pos, _)| pos)
        .collect();
    debug_assert!(slots
        .iter()
        .enumerate()
        .all(|(index, &pos)| textures[pos].atlas_index == index));

    let mut inputs: Vec<PackInput> = slots
        .iter()
        .map(|&pos| {
            let t = &textures[pos];
            PackInput::new(t.width(), t.height(), t.allow_rotation)
        })
        .collect();
    let placeholder_index = if entry_textures.iter().any(Vec::is_empty) {
        inputs.push(PackInput::new(1, 1, false));
        Some(inputs.len() - 1)
    } else {
        None
    };
    debug!(
        textures = textures.len(),
        unique = slots.len(),
        reference_duplicates,
        merged,
        "preprocessed"
    );

    let layouts = pack_pages(&inputs, &PackOptions::from_config(cfg))
        .map_err(|e| with_entry_index(e, &slots, &textures))?;
    let placements = index_placements(&layouts, inputs.len());

    let pages = crate::compositing::composite(&layouts, |index| {
        slots.get(index).map(|&pos| &textures[pos].pixels)
    });
    for tex in &mut textures {
        tex.release();
    }

    let placement_of = |index: usize, split_rect: Rect, pad: u32, blank: bool| -> Option<TexturePlacement> {
        let (packed, page_width, page_height) = placements.get(index).copied().flatten()?;
        Some(TexturePlacement {
            split_rect,
            pad,
            packed,
            page_width,
            page_height,
            blank,
        })
    };
    let placeholder = placeholder_index
        .and_then(|index| placement_of(index, Rect::new(0, 0, 1, 1), 0, true));

    let geometry = GeometryBuilder::new(cfg);
    let mut sprites = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let own = entry_textures[i]
            .iter()
            .filter_map(|&pos| {
                let t = &textures[pos];
                placement_of(t.atlas_index, t.split_rect, t.pad, t.blank)
            })
            .collect();
        let (sprite, sprite_warnings) = geometry.build(&SpriteSource {
            index: i,
            name: &entry.name,
            prepared: &prepared[i],
            scale: entry.scale,
            double_sided: entry.double_sided,
            placements: own,
            placeholder,
        });
        warnings.extend(sprite_warnings);
        sprites.push(sprite);
    }

    let stats = BuildStats::from_pages(&pages, sprites.len(), reference_duplicates + merged);
    Ok(SpriteCollection {
        pages,
        sprites,
        clips: Vec::new(),
        warnings,
        stats,
    })
}

/// Placement and page size for every packed index.
fn index_placements(layouts: &[PageLayout], count: usize) -> Vec<Option<(PackedRect, u32, u32)>> {
    let mut out = vec![None; count];
    for layout in layouts {
        for r in &layout.rects {
            out[r.index] = Some((*r, layout.width, layout.height));
        }
    }
    out
}

/// Rewrites a pack-input index in `RectTooLarge` to the index of the source entry.
fn with_entry_index(err: AtlasError, slots: &[usize], textures: &[ProcessedTexture]) -> AtlasError {
    match err {
        AtlasError::RectTooLarge {
            index,
            width,
            height,
            max_width,
            max_height,
        } => AtlasError::RectTooLarge {
            index: slots.get(index).map_or(index, |&pos| textures[pos].source_index),
            width,
            height,
            max_width,
            max_height,
        },
        other => other,
    }
}
