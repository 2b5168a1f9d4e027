use crate::config::BuildConfig;
use crate::error::{AtlasError, Result};
use crate::model::{PackedRect, Rect};
use tracing::{debug, instrument};

pub mod maxrects;

pub use maxrects::{MaxRectsHeuristic, MaxRectsPacker};

/// A scored placement proposal for one rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// Placed rectangle (post-rotation size).
    pub rect: Rect,
    pub rotated: bool,
    /// Lower is better; compared lexicographically.
    pub score: (i32, i32),
}

/// A packer places rectangles into a single bin.
///
/// Implementations must never produce overlapping placements or placements
/// outside the bin.
pub trait Packer {
    /// Best placement for a `w × h` rectangle, or `None` if it does not fit.
    fn find(&self, w: u32, h: u32, allow_rotation: bool) -> Option<Candidate>;
    /// Commits a candidate previously returned by `find`.
    fn place(&mut self, candidate: &Candidate);
    fn used_area(&self) -> u64;
    fn bin_area(&self) -> u64;

    fn can_pack(&self, w: u32, h: u32, allow_rotation: bool) -> bool {
        self.find(w, h, allow_rotation).is_some()
    }

    fn pack(&mut self, w: u32, h: u32, allow_rotation: bool) -> Option<Candidate> {
        let c = self.find(w, h, allow_rotation)?;
        self.place(&c);
        Some(c)
    }

    /// Repeatedly places the globally best-scoring remaining rectangle.
    /// Returns `(input position, placement)` pairs in placement order.
    fn pack_batch(&mut self, rects: &[PackInput]) -> Vec<(usize, Candidate)> {
        let mut remaining: Vec<usize> = (0..rects.len()).collect();
        let mut out = Vec::with_capacity(rects.len());
        while !remaining.is_empty() {
            let mut best: Option<(usize, Candidate)> = None;
            for (slot, &i) in remaining.iter().enumerate() {
                let r = &rects[i];
                if let Some(c) = self.find(r.w, r.h, r.allow_rotation) {
                    if best.as_ref().is_none_or(|(_, b)| c.score < b.score) {
                        best = Some((slot, c));
                    }
                }
            }
            let Some((slot, c)) = best else { break };
            self.place(&c);
            out.push((remaining.remove(slot), c));
        }
        out
    }

    fn occupancy(&self) -> f32 {
        let area = self.bin_area();
        if area == 0 {
            0.0
        } else {
            self.used_area() as f32 / area as f32
        }
    }
}

/// One rectangle to pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackInput {
    pub w: u32,
    pub h: u32,
    pub allow_rotation: bool,
}

impl PackInput {
    pub fn new(w: u32, h: u32, allow_rotation: bool) -> Self {
        Self {
            w,
            h,
            allow_rotation,
        }
    }
}

/// Page constraints for `pack_pages`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackOptions {
    pub page_width: u32,
    pub page_height: u32,
    pub max_pages: usize,
    /// Shrink pages while they stay more than half empty.
    pub optimize_size: bool,
    pub force_square: bool,
    /// Global rotation switch; each input also carries its own flag.
    pub allow_rotation: bool,
}

impl PackOptions {
    pub fn from_config(cfg: &BuildConfig) -> Self {
        let (mut page_width, mut page_height) = cfg.page_size();
        let forced = cfg.force_size.is_some();
        let force_square = cfg.force_square && !forced;
        if force_square {
            let side = page_width.min(page_height);
            page_width = side;
            page_height = side;
        }
        Self {
            page_width,
            page_height,
            max_pages: cfg.max_pages(),
            optimize_size: !forced,
            force_square,
            allow_rotation: cfg.allow_rotation,
        }
    }
}

/// Placements of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub width: u32,
    pub height: u32,
    pub rects: Vec<PackedRect>,
    pub occupancy: f32,
}

/// Result of packing one candidate page size with the best heuristic.
struct Trial {
    width: u32,
    height: u32,
    placed: Vec<(usize, Candidate)>,
    used_area: u64,
    all_used: bool,
}

impl Trial {
    fn occupancy(&self) -> f32 {
        self.used_area as f32 / (self.width as u64 * self.height as u64) as f32
    }

    fn wasted_area(&self) -> u64 {
        (self.width as u64 * self.height as u64).saturating_sub(self.used_area)
    }
}

/// Packs `inputs` in the given order into up to `opts.max_pages` pages.
///
/// `PackedRect::index` is the position of the rectangle in `inputs`.
#[instrument(skip_all)]
pub fn pack_pages(inputs: &[PackInput], opts: &PackOptions) -> Result<Vec<PageLayout>> {
    let inputs: Vec<PackInput> = inputs
        .iter()
        .map(|r| PackInput::new(r.w, r.h, r.allow_rotation && opts.allow_rotation))
        .collect();

    for (index, r) in inputs.iter().enumerate() {
        let fits = r.w <= opts.page_width && r.h <= opts.page_height;
        let fits_rotated = r.allow_rotation && r.h <= opts.page_width && r.w <= opts.page_height;
        if !fits && !fits_rotated {
            return Err(AtlasError::RectTooLarge {
                index,
                width: r.w,
                height: r.h,
                max_width: opts.page_width,
                max_height: opts.page_height,
            });
        }
    }

    let total = inputs.len();
    let mut remaining: Vec<usize> = (0..total).collect();
    let mut pages: Vec<PageLayout> = Vec::new();

    while !remaining.is_empty() {
        if pages.len() >= opts.max_pages {
            return Err(AtlasError::CapacityExceeded {
                placed: total - remaining.len(),
                total,
                max_pages: opts.max_pages,
            });
        }
        let rects: Vec<PackInput> = remaining.iter().map(|&i| inputs[i]).collect();
        let trial = search_page_size(&rects, opts);
        if trial.placed.is_empty() {
            return Err(AtlasError::CapacityExceeded {
                placed: total - remaining.len(),
                total,
                max_pages: opts.max_pages,
            });
        }

        let page = pages.len();
        let occupancy = trial.occupancy();
        let mut taken = vec![false; rects.len()];
        let mut placed = Vec::with_capacity(trial.placed.len());
        for (pos, c) in &trial.placed {
            taken[*pos] = true;
            placed.push(PackedRect {
                index: remaining[*pos],
                page,
                x: c.rect.x,
                y: c.rect.y,
                w: c.rect.w,
                h: c.rect.h,
                rotated: c.rotated,
            });
        }
        debug!(
            page,
            width = trial.width,
            height = trial.height,
            placed = placed.len(),
            occupancy,
            "packed page"
        );
        remaining = remaining
            .iter()
            .zip(&taken)
            .filter(|(_, t)| !**t)
            .map(|(i, _)| *i)
            .collect();
        pages.push(PageLayout {
            width: trial.width,
            height: trial.height,
            rects: placed,
            occupancy,
        });
    }

    Ok(pages)
}

/// Tries every heuristic on a `width × height` bin; the least wasted area wins, first on ties.
fn best_trial(rects: &[PackInput], width: u32, height: u32) -> Trial {
    let mut best: Option<Trial> = None;
    for heuristic in MaxRectsHeuristic::PORTFOLIO {
        let mut packer = MaxRectsPacker::new(width, height, heuristic);
        let placed = packer.pack_batch(rects);
        let trial = Trial {
            width,
            height,
            all_used: placed.len() == rects.len(),
            used_area: packer.used_area(),
            placed,
        };
        if best
            .as_ref()
            .is_none_or(|b| trial.wasted_area() < b.wasted_area())
        {
            best = Some(trial);
        }
    }
    best.unwrap_or(Trial {
        width,
        height,
        placed: Vec::new(),
        used_area: 0,
        all_used: rects.is_empty(),
    })
}

/// Shrinks the page while everything still fits and the page stays at most half full.
fn search_page_size(rects: &[PackInput], opts: &PackOptions) -> Trial {
    let (mut w, mut h) = (opts.page_width, opts.page_height);
    let mut previous: Option<Trial> = None;
    let mut pass = 1;
    loop {
        let trial = best_trial(rects, w, h);
        let occupancy = trial.occupancy();
        let first_pass_full = pass == 1 && occupancy > 0.5;
        let later_pass_full = pass > 1 && occupancy > 0.5 && trial.all_used;
        if !opts.optimize_size || first_pass_full || later_pass_full {
            return trial;
        }
        if !trial.all_used {
            // The last shrink lost rects: go back to the previous size.
            return previous.unwrap_or(trial);
        }

        let (nw, nh) = if opts.force_square {
            (w / 2, h / 2)
        } else if w < h {
            (w, h / 2)
        } else {
            (w / 2, h)
        };
        let (nw, nh) = (nw.max(1), nh.max(1));
        if (nw, nh) == (w, h) {
            return trial;
        }
        w = nw;
        h = nh;
        previous = Some(trial);
        pass += 1;
    }
}
