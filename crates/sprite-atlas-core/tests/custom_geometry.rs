use glam::{Vec2, Vec3};
use image::{Rgba, RgbaImage};
use sprite_atlas_core::triangulate::{signed_area2, triangulate};
use sprite_atlas_core::{
    AtlasBuilder, AtlasError, BuildConfig, GeometryIsland, NormalGeneration, SourceEntry,
    SpriteDefinition,
};

fn island(points: &[(f32, f32)]) -> GeometryIsland {
    GeometryIsland::new(points.iter().map(|&(x, y)| Vec2::new(x, y)).collect())
}

fn triangle_area2(s: &SpriteDefinition, tri: &[u32]) -> f32 {
    let p = |i: u32| s.positions[i as usize].truncate();
    signed_area2(&[p(tri[0]), p(tri[1]), p(tri[2])])
}

fn opaque(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([90, 120, 150, 255]))
}

fn no_pad() -> BuildConfig {
    BuildConfig::builder().pad_amount(Some(0)).build()
}

#[test]
fn triangulates_convex_and_concave_outlines_clockwise() {
    let l_shape = [
        Vec2::new(0.0, 0.0),
        Vec2::new(2.0, 0.0),
        Vec2::new(2.0, 1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(1.0, 2.0),
        Vec2::new(0.0, 2.0),
    ];
    let reversed: Vec<Vec2> = l_shape.iter().rev().copied().collect();

    for outline in [l_shape.to_vec(), reversed] {
        let tris = triangulate(&outline).expect("simple polygon");
        assert_eq!(tris.len(), outline.len() - 2);
        let mut total = 0.0;
        for t in &tris {
            let a2 = signed_area2(&[
                outline[t[0] as usize],
                outline[t[1] as usize],
                outline[t[2] as usize],
            ]);
            assert!(a2 < 0.0, "triangle {t:?} is not clockwise");
            total += a2.abs();
        }
        assert!((total - 2.0 * 3.0).abs() < 1e-5);
    }
}

#[test]
fn degenerate_outlines_are_rejected() {
    assert!(triangulate(&[Vec2::ZERO, Vec2::X]).is_none());
    assert!(triangulate(&[Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]).is_none());
    assert!(triangulate(&[]).is_none());
}

#[test]
fn island_replaces_the_quad() {
    let entry = SourceEntry::from_rgba("tri", opaque(8, 8))
        .with_custom_geometry(vec![island(&[(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)])]);
    let c = AtlasBuilder::new(no_pad()).build(&[entry]).expect("build");
    let s = &c.sprites[0];

    assert!(s.complex_geometry);
    assert_eq!(s.positions.len(), 3);
    assert_eq!(s.indices.len(), 3);
    assert_eq!(s.positions[0], Vec3::new(-4.0, 4.0, 0.0));
    assert_eq!(s.positions[1], Vec3::new(4.0, 4.0, 0.0));
    assert_eq!(s.positions[2], Vec3::new(-4.0, -4.0, 0.0));
    assert!(triangle_area2(s, &s.indices) < 0.0);
    assert_eq!(s.untrimmed_bounds.center, Vec3::ZERO);
    assert_eq!(s.untrimmed_bounds.size, Vec3::new(8.0, 8.0, 0.0));

    let eps = 0.001 / 8.0;
    assert!((s.uvs[2] - Vec2::splat(eps)).abs().max_element() < 1e-5);
    assert!((s.uvs[1] - Vec2::new(1.0 + eps, 1.0 + eps)).abs().max_element() < 1e-5);
}

#[test]
fn degenerate_island_is_skipped_with_warning() {
    let entry = SourceEntry::from_rgba("mixed", opaque(8, 8)).with_custom_geometry(vec![
        island(&[(0.0, 0.0), (8.0, 0.0), (8.0, 8.0), (0.0, 8.0)]),
        island(&[(1.0, 1.0), (2.0, 2.0)]),
    ]);
    let c = AtlasBuilder::new(no_pad()).build(&[entry]).expect("build");
    let s = &c.sprites[0];

    assert!(s.complex_geometry);
    assert_eq!(s.indices.len(), 6);
    for tri in s.indices.chunks_exact(3) {
        assert!(triangle_area2(s, tri) < 0.0);
    }
    assert_eq!(
        c.warnings,
        vec![AtlasError::InvalidGeometry {
            sprite: 0,
            island: 1,
            points: 2,
        }]
    );
    assert!(c.warnings[0].is_recoverable());
}

#[test]
fn all_islands_degenerate_falls_back_to_quad() {
    let entry = SourceEntry::from_rgba("flat", opaque(8, 8)).with_custom_geometry(vec![island(&[
        (0.0, 0.0),
        (4.0, 4.0),
        (8.0, 8.0),
    ])]);
    let c = AtlasBuilder::new(no_pad()).build(&[entry]).expect("build");
    let s = &c.sprites[0];
    assert!(!s.complex_geometry);
    assert_eq!(s.positions.len(), 4);
    assert_eq!(c.warnings.len(), 1);
}

#[test]
fn islands_define_the_trim_bounds() {
    let entry = SourceEntry::from_rgba("inner", opaque(16, 16)).with_custom_geometry(vec![island(&[
        (4.0, 4.0),
        (12.0, 4.0),
        (12.0, 12.0),
        (4.0, 12.0),
    ])]);
    let c = AtlasBuilder::new(no_pad()).build(&[entry]).expect("build");
    let placed = c.placement(0).expect("placed");
    assert_eq!((placed.w, placed.h), (9, 9));

    // Mesh bounds follow the island, untrimmed bounds keep the whole source frame.
    let s = &c.sprites[0];
    assert!(s.complex_geometry);
    assert_eq!(s.bounds.size, Vec3::new(8.0, 8.0, 0.0));
    assert_eq!(s.untrimmed_bounds.center, Vec3::ZERO);
    assert_eq!(s.untrimmed_bounds.size, Vec3::new(16.0, 16.0, 0.0));
}

#[test]
fn diced_entries_ignore_custom_geometry() {
    let entry = SourceEntry::from_rgba("diced", opaque(8, 8))
        .with_dice(4, 8)
        .with_custom_geometry(vec![island(&[(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)])]);
    let c = AtlasBuilder::new(no_pad()).build(&[entry]).expect("build");
    let s = &c.sprites[0];
    assert!(!s.complex_geometry);
    assert_eq!(s.positions.len(), 8);
}

#[test]
fn island_normals_face_negative_z() {
    let cfg = BuildConfig::builder()
        .pad_amount(Some(0))
        .normal_generation(NormalGeneration::Normals)
        .build();
    let entry = SourceEntry::from_rgba("lit", opaque(8, 8))
        .with_custom_geometry(vec![island(&[(0.0, 0.0), (8.0, 0.0), (0.0, 8.0)])]);
    let c = AtlasBuilder::new(cfg).build(&[entry]).expect("build");
    assert!(c.sprites[0]
        .normals
        .iter()
        .all(|n| (*n - Vec3::NEG_Z).length() < 1e-5));
}

#[test]
fn rotated_island_uvs_sample_their_source_pixels() {
    let mut img = RgbaImage::new(16, 8);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Rgba([x as u8 * 15 + 1, y as u8 * 30 + 1, 77, 255]);
    }
    let corners = [(0.5, 0.5), (15.5, 0.5), (15.5, 7.5), (0.5, 7.5)];
    let entry = SourceEntry::from_rgba("wide", img.clone()).with_custom_geometry(vec![island(&corners)]);
    let cfg = BuildConfig::builder()
        .with_max_dimensions(8, 16)
        .pad_amount(Some(0))
        .build();
    let c = AtlasBuilder::new(cfg).build(&[entry]).expect("build");

    let placed = c.placement(0).expect("placed");
    assert!(placed.rotated);
    let s = &c.sprites[0];
    assert!(s.flipped && s.complex_geometry);
    assert_eq!(s.uvs.len(), corners.len());

    let page = &c.pages[placed.page];
    let (w, h) = (page.width as f32, page.height as f32);
    for (uv, &(x, y)) in s.uvs.iter().zip(&corners) {
        let px = (uv.x * w).floor() as u32;
        let py = ((1.0 - uv.y) * h).floor() as u32;
        assert_eq!(
            page.pixels.get_pixel(px, py),
            img.get_pixel(x as u32, y as u32).0,
            "uv {uv:?} of source point ({x}, {y})"
        );
    }
}
