//! Ear-clipping triangulation of simple polygons.

use glam::Vec2;

const AREA_EPSILON: f32 = 1e-6;

/// Twice the signed area of a polygon; positive for counter-clockwise outlines (y up).
pub fn signed_area2(points: &[Vec2]) -> f32 {
    let n = points.len();
    (0..n)
        .map(|i| points[i].perp_dot(points[(i + 1) % n]))
        .sum()
}

fn cross(a: Vec2, b: Vec2, c: Vec2) -> f32 {
    (b - a).perp_dot(c - a)
}

/// True if `p` lies inside or on the counter-clockwise triangle `abc`.
fn in_triangle(p: Vec2, a: Vec2, b: Vec2, c: Vec2) -> bool {
    cross(a, b, p) >= 0.0 && cross(b, c, p) >= 0.0 && cross(c, a, p) >= 0.0
}

/// Triangulates a simple polygon given in a y-up frame.
///
/// Triangles are returned as index triples wound clockwise (negative signed area),
/// whatever the outline's own orientation. Returns `None` for fewer than three
/// points or a zero-area outline.
pub fn triangulate(points: &[Vec2]) -> Option<Vec<[u32; 3]>> {
    if points.len() < 3 {
        return None;
    }
    let area2 = signed_area2(points);
    if area2.abs() <= AREA_EPSILON {
        return None;
    }

    // Clip ears on a counter-clockwise ring, then reverse each triangle.
    let mut ring: Vec<usize> = (0..points.len()).collect();
    if area2 < 0.0 {
        ring.reverse();
    }

    let mut out = Vec::with_capacity(points.len() - 2);
    while ring.len() > 3 {
        let n = ring.len();
        let ear = (0..n).find(|&i| is_ear(points, &ring, i)).unwrap_or(0);
        let a = ring[(ear + n - 1) % n];
        let b = ring[ear];
        let c = ring[(ear + 1) % n];
        out.push([c as u32, b as u32, a as u32]);
        ring.remove(ear);
    }
    out.push([ring[2] as u32, ring[1] as u32, ring[0] as u32]);
    Some(out)
}

fn is_ear(points: &[Vec2], ring: &[usize], i: usize) -> bool {
    let n = ring.len();
    let ia = ring[(i + n - 1) % n];
    let ib = ring[i];
    let ic = ring[(i + 1) % n];
    let (a, b, c) = (points[ia], points[ib], points[ic]);
    if cross(a, b, c) <= AREA_EPSILON {
        return false;
    }
    ring.iter()
        .filter(|&&j| j != ia && j != ib && j != ic)
        .all(|&j| {
            let p = points[j];
            p == a || p == b || p == c || !in_triangle(p, a, b, c)
        })
}
