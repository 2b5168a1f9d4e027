use crate::image_buffer::ImageBuffer;
use crate::preprocess::{PreparedSource, ProcessedTexture};
use std::collections::HashMap;
use std::hash::Hasher;
use std::sync::Arc;
use tracing::debug;
use twox_hash::XxHash64;

/// Content hash of a processed texture: RGBA bytes followed by width and height
/// as 24-bit little-endian values, rendered as 16 hex digits.
pub fn content_hash(pixels: &ImageBuffer) -> String {
    let mut hasher = XxHash64::with_seed(0);
    if pixels.is_empty() {
        hasher.write(&[0]);
    } else {
        hasher.write(pixels.as_bytes());
        hasher.write(&pixels.width().to_le_bytes()[..3]);
        hasher.write(&pixels.height().to_le_bytes()[..3]);
    }
    format!("{:016x}", hasher.finish())
}

/// True if two prepared sources would preprocess to the same texture because they
/// reference the same image with the same processing settings.
fn same_reference(a: &PreparedSource, b: &PreparedSource) -> bool {
    Arc::ptr_eq(&a.image, &b.image)
        && a.trim == b.trim
        && a.pad == b.pad
        && a.pad_mode == b.pad_mode
        && a.additive == b.additive
        && a.islands == b.islands
}

/// Cheap pass: for each non-diced entry, the earliest entry sharing its source reference.
///
/// Runs before preprocessing, so duplicates never get a pixel buffer or an atlas index.
pub fn find_reference_duplicates(prepared: &[PreparedSource]) -> Vec<Option<usize>> {
    let mut out: Vec<Option<usize>> = vec![None; prepared.len()];
    for j in 0..prepared.len() {
        if prepared[j].dice {
            continue;
        }
        out[j] = (0..j).find(|&i| out[i].is_none() && !prepared[i].dice && same_reference(&prepared[i], &prepared[j]));
    }
    let dupes = out.iter().filter(|d| d.is_some()).count();
    if dupes > 0 {
        debug!(dupes, "reference duplicates");
    }
    out
}

/// Strict pass: merges non-split textures with identical pixels into one atlas slot.
///
/// The later texture is marked as a duplicate of the earlier one, its buffer is
/// released and every atlas index above the removed slot shifts down by one.
/// Returns the number of merged textures.
pub fn remove_duplicates(textures: &mut [ProcessedTexture]) -> usize {
    for tex in textures.iter_mut().filter(|t| !t.is_split && !t.is_duplicate()) {
        tex.content_hash = Some(content_hash(&tex.pixels));
    }

    let mut by_hash: HashMap<String, Vec<usize>> = HashMap::new();
    let mut merged = 0;
    for j in 0..textures.len() {
        let Some(hash) = textures[j].content_hash.clone() else {
            continue;
        };
        let candidates = by_hash.entry(hash).or_default();
        let original = candidates
            .iter()
            .copied()
            .find(|&i| textures[i].pixels == textures[j].pixels);
        match original {
            Some(i) => {
                let removed = textures[j].atlas_index;
                let target = textures[i].atlas_index;
                for tex in textures.iter_mut() {
                    if tex.atlas_index > removed {
                        tex.atlas_index -= 1;
                    }
                }
                let dup = &mut textures[j];
                dup.atlas_index = target;
                dup.duplicate_of = Some(target);
                dup.release();
                merged += 1;
            }
            None => candidates.push(j),
        }
    }
    if merged > 0 {
        debug!(merged, "content duplicates");
    }
    merged
}
