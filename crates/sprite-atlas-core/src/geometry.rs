use crate::config::{BuildConfig, NormalGeneration};
use crate::error::AtlasError;
use crate::model::{Bounds, MaterialRun, PackedRect, Rect, SpriteDefinition};
use crate::preprocess::PreparedSource;
use crate::source::GeometryIsland;
use crate::triangulate::triangulate;
use glam::{Vec2, Vec3, Vec4};
use tracing::warn;

/// Inset applied to quad UVs, in pixels, to keep bilinear taps inside the slot.
const UV_INSET_PX: f32 = 0.001;

/// Vertex order within a quad: bottom-left, bottom-right, top-left, top-right.
const QUAD_INDICES: [u32; 6] = [0, 3, 1, 2, 3, 0];

/// Where one processed texture of a sprite ended up in the atlas.
#[derive(Debug, Clone, Copy)]
pub struct TexturePlacement {
    /// Content rectangle in source pixels (top-left origin).
    pub split_rect: Rect,
    pub pad: u32,
    pub packed: PackedRect,
    pub page_width: u32,
    pub page_height: u32,
    /// The texture is the transparent stand-in for an invisible source.
    pub blank: bool,
}

impl TexturePlacement {
    /// Atlas UV corners `(u0, v0)` (bottom-left of the slot) and `(u1, v1)` (top-right), inset.
    fn uv_rect(&self) -> (Vec2, Vec2) {
        let (w, h) = (self.page_width as f32, self.page_height as f32);
        let (tx, ty) = self.content_origin();
        let tw = self.packed.w.saturating_sub(2 * self.pad) as f32;
        let th = self.packed.h.saturating_sub(2 * self.pad) as f32;
        let (eu, ev) = (UV_INSET_PX / w, UV_INSET_PX / h);
        (
            Vec2::new(tx / w + eu, 1.0 - (ty + th) / h + ev),
            Vec2::new((tx + tw) / w - eu, 1.0 - ty / h - ev),
        )
    }

    /// Top-left of the unpadded content on the page.
    fn content_origin(&self) -> (f32, f32) {
        (
            (self.packed.x + self.pad) as f32,
            (self.packed.y + self.pad) as f32,
        )
    }
}

/// Everything needed to build the mesh of one source entry.
#[derive(Debug, Clone)]
pub struct SpriteSource<'a> {
    pub index: usize,
    pub name: &'a str,
    pub prepared: &'a PreparedSource,
    pub scale: (f32, f32),
    pub double_sided: bool,
    /// Empty placements make the sprite fall back to `placeholder`.
    pub placements: Vec<TexturePlacement>,
    pub placeholder: Option<TexturePlacement>,
}

/// Mesh under construction.
#[derive(Default)]
struct Mesh {
    positions: Vec<Vec3>,
    uvs: Vec<Vec2>,
    indices: Vec<u32>,
    runs: Vec<MaterialRun>,
}

impl Mesh {
    fn push_quad(&mut self, corners: [Vec2; 4], uvs: [Vec2; 4], page: usize) {
        let base = self.positions.len() as u32;
        self.positions
            .extend(corners.iter().map(|c| c.extend(0.0)));
        self.uvs.extend(uvs);
        let first_index = self.indices.len();
        self.indices.extend(QUAD_INDICES.iter().map(|i| base + i));
        self.extend_run(page, first_index, QUAD_INDICES.len());
    }

    fn extend_run(&mut self, page: usize, first_index: usize, count: usize) {
        match self.runs.last_mut() {
            Some(run) if run.page == page => run.index_count += count,
            _ => self.runs.push(MaterialRun {
                page,
                first_index,
                index_count: count,
            }),
        }
    }
}

/// Converts placements plus sprite parameters into `SpriteDefinition`s.
#[derive(Debug, Clone, Copy)]
pub struct GeometryBuilder {
    world_scale: f32,
    rescale: f32,
    global_scale: f32,
    normals: NormalGeneration,
}

impl GeometryBuilder {
    pub fn new(cfg: &BuildConfig) -> Self {
        Self {
            world_scale: cfg.world_scale(),
            rescale: cfg.effective_rescale(),
            global_scale: cfg.global_scale,
            normals: cfg.normal_generation,
        }
    }

    /// Builds the sprite; degenerate islands are skipped and reported in the returned warnings.
    pub fn build(&self, src: &SpriteSource<'_>) -> (SpriteDefinition, Vec<AtlasError>) {
        let prepared = src.prepared;
        let (tex_w, tex_h) = (prepared.width() as f32, prepared.height() as f32);
        let (sx, sy) = src.scale;
        let k = self.world_scale;

        let anchor = prepared
            .anchor
            .resolve(prepared.width(), prepared.height(), self.rescale);
        let pos0 = Vec2::new(-anchor.x * sx * k, -(tex_h * sy - anchor.y * sy) * k);
        let pos1 = pos0 + Vec2::new(tex_w * sx * k, tex_h * sy * k);

        let mut warnings = Vec::new();
        let mut mesh = Mesh::default();
        let mut flipped = false;
        let mut complex_geometry = false;
        let mut placeholder = false;

        let quad_frame = QuadFrame {
            pos0,
            pos1,
            tex_w,
            tex_h,
        };

        if src.placements.is_empty() {
            placeholder = true;
            if let Some(p) = &src.placeholder {
                let mut p = *p;
                p.split_rect = Rect::new(prepared.width() / 2, prepared.height() / 2, 1, 1);
                quad_frame.push(&mut mesh, &p);
            }
        } else if prepared.dice {
            let mut ordered = src.placements.clone();
            ordered.sort_by_key(|p| p.packed.page);
            for p in &ordered {
                quad_frame.push(&mut mesh, p);
            }
        } else {
            let p = &src.placements[0];
            flipped = p.packed.rotated;
            let islands = prepared.islands.as_deref().filter(|_| !p.blank);
            if let Some(islands) = islands {
                complex_geometry =
                    self.push_islands(&mut mesh, &mut warnings, src.index, islands, p, &quad_frame, (sx, sy));
            }
            if !complex_geometry {
                quad_frame.push(&mut mesh, p);
                if src.double_sided {
                    push_back_face(&mut mesh, p.packed.page);
                }
            }
        }

        let bounds = Bounds::from_points(&mesh.positions);
        let untrimmed_bounds = Bounds::from_min_max(pos0.extend(0.0), pos1.extend(0.0));

        let (normals, tangents) = self.vertex_frames(&mesh);
        let normalized_uvs = normalized_uvs(&mesh.uvs);
        let texel_size = Vec2::new(
            k * sx / self.global_scale * self.rescale,
            k * sy / self.global_scale * self.rescale,
        );

        let def = SpriteDefinition {
            name: src.name.to_string(),
            material_page: mesh.runs.first().map_or(0, |r| r.page),
            positions: mesh.positions,
            uvs: mesh.uvs,
            normalized_uvs,
            indices: mesh.indices,
            normals,
            tangents,
            bounds,
            untrimmed_bounds,
            texel_size,
            material_runs: mesh.runs,
            flipped,
            complex_geometry,
            placeholder,
        };
        (def, warnings)
    }

    /// Appends every valid island; returns false when none survived.
    #[allow(clippy::too_many_arguments)]
    fn push_islands(
        &self,
        mesh: &mut Mesh,
        warnings: &mut Vec<AtlasError>,
        sprite: usize,
        islands: &[GeometryIsland],
        p: &TexturePlacement,
        frame: &QuadFrame,
        (sx, sy): (f32, f32),
    ) -> bool {
        let k = self.world_scale;
        let (page_w, page_h) = (p.page_width as f32, p.page_height as f32);
        let (tx, ty) = p.content_origin();
        let (eu, ev) = (UV_INSET_PX / page_w, UV_INSET_PX / page_h);
        let r = p.split_rect;
        let (rx, ry, rw, rh) = (r.x as f32, r.y as f32, r.w as f32, r.h as f32);
        let mut any = false;

        for (island_index, island) in islands.iter().enumerate() {
            let local: Vec<Vec2> = island
                .points
                .iter()
                .map(|pt| Vec2::new(pt.x, frame.tex_h - pt.y))
                .collect();
            let Some(triangles) = triangulate(&local) else {
                warn!(sprite, island = island_index, points = island.points.len(), "skipping degenerate geometry island");
                warnings.push(AtlasError::InvalidGeometry {
                    sprite,
                    island: island_index,
                    points: island.points.len(),
                });
                continue;
            };

            let base = mesh.positions.len() as u32;
            for (pt, l) in island.points.iter().zip(&local) {
                let pos = Vec2::new(l.x * sx, l.y * sy) * k + frame.pos0;
                mesh.positions.push(pos.extend(0.0));
                let uv = if p.packed.rotated {
                    Vec2::new(
                        (tx + (ry + rh - pt.y)) / page_w + eu,
                        1.0 - (ty + rw - (pt.x - rx)) / page_h + ev,
                    )
                } else {
                    Vec2::new(
                        (tx + pt.x - rx) / page_w + eu,
                        1.0 - (ty + pt.y - ry) / page_h + ev,
                    )
                };
                mesh.uvs.push(uv);
            }
            let first_index = mesh.indices.len();
            mesh.indices
                .extend(triangles.iter().flat_map(|t| t.iter().map(|i| base + i)));
            mesh.extend_run(p.packed.page, first_index, triangles.len() * 3);
            any = true;
        }
        any
    }

    fn vertex_frames(&self, mesh: &Mesh) -> (Vec<Vec3>, Vec<Vec4>) {
        if self.normals == NormalGeneration::None {
            return (Vec::new(), Vec::new());
        }
        let mut normals = vec![Vec3::ZERO; mesh.positions.len()];
        for tri in mesh.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            let n = (mesh.positions[b] - mesh.positions[a]).cross(mesh.positions[c] - mesh.positions[a]);
            normals[a] += n;
            normals[b] += n;
            normals[c] += n;
        }
        for n in &mut normals {
            *n = n.normalize_or_zero();
        }
        let tangents = if self.normals == NormalGeneration::NormalsAndTangents {
            vec![Vec4::new(1.0, 0.0, 0.0, 1.0); mesh.positions.len()]
        } else {
            Vec::new()
        };
        (normals, tangents)
    }
}

/// Untrimmed quad extents of a sprite plus its processed source size.
struct QuadFrame {
    pos0: Vec2,
    pos1: Vec2,
    tex_w: f32,
    tex_h: f32,
}

impl QuadFrame {
    /// Appends the quad covering `p.split_rect`, mapped onto its atlas slot.
    fn push(&self, mesh: &mut Mesh, p: &TexturePlacement) {
        let r = p.split_rect;
        let x0 = r.x as f32 / self.tex_w;
        let x1 = (r.x + r.w) as f32 / self.tex_w;
        let y0 = (self.tex_h - (r.y + r.h) as f32) / self.tex_h;
        let y1 = (self.tex_h - r.y as f32) / self.tex_h;
        let bl = lerp2(self.pos0, self.pos1, x0, y0);
        let tr = lerp2(self.pos0, self.pos1, x1, y1);
        let corners = [bl, Vec2::new(tr.x, bl.y), Vec2::new(bl.x, tr.y), tr];

        let (v0, v1) = p.uv_rect();
        let uvs = if p.packed.rotated {
            [v0, Vec2::new(v0.x, v1.y), Vec2::new(v1.x, v0.y), v1]
        } else {
            [v0, Vec2::new(v1.x, v0.y), Vec2::new(v0.x, v1.y), v1]
        };
        mesh.push_quad(corners, uvs, p.packed.page);
    }
}

/// Per-axis interpolation between two corners.
fn lerp2(a: Vec2, b: Vec2, tx: f32, ty: f32) -> Vec2 {
    Vec2::new(a.x + (b.x - a.x) * tx, a.y + (b.y - a.y) * ty)
}

/// Appends the first quad's vertices in order 3, 1, 2, 0 as a reversed back face.
fn push_back_face(mesh: &mut Mesh, page: usize) {
    let order = [3usize, 1, 2, 0];
    let corners = order.map(|i| mesh.positions[i].truncate());
    let uvs = order.map(|i| mesh.uvs[i]);
    mesh.push_quad(corners, uvs, page);
}

/// Remaps UVs onto 0..1 over their own bounding box.
pub fn normalized_uvs(uvs: &[Vec2]) -> Vec<Vec2> {
    if uvs.is_empty() {
        return Vec::new();
    }
    let (min, max) = uvs
        .iter()
        .fold((Vec2::splat(f32::MAX), Vec2::splat(f32::MIN)), |(lo, hi), uv| {
            (lo.min(*uv), hi.max(*uv))
        });
    let range = max - min;
    let axis = |v: f32, lo: f32, span: f32| {
        if span > 0.0 { ((v - lo) / span).clamp(0.0, 1.0) } else { 0.0 }
    };
    uvs.iter()
        .map(|uv| Vec2::new(axis(uv.x, min.x, range.x), axis(uv.y, min.y, range.y)))
        .collect()
}
