use super::{Candidate, Packer};
use crate::model::Rect;
use serde::{Deserialize, Serialize};

/// Free-rectangle choice rule of the MaxRects packer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MaxRectsHeuristic {
    BestAreaFit,
    BestShortSideFit,
    BestLongSideFit,
    BottomLeft,
    ContactPoint,
}

impl MaxRectsHeuristic {
    /// Heuristics tried for every candidate page size, in tie-break order.
    pub const PORTFOLIO: [MaxRectsHeuristic; 4] = [
        MaxRectsHeuristic::BestAreaFit,
        MaxRectsHeuristic::BestLongSideFit,
        MaxRectsHeuristic::BestShortSideFit,
        MaxRectsHeuristic::BottomLeft,
    ];
}

pub struct MaxRectsPacker {
    bin: Rect,
    free: Vec<Rect>,
    used: Vec<Rect>,
    heuristic: MaxRectsHeuristic,
}

impl MaxRectsPacker {
    pub fn new(width: u32, height: u32, heuristic: MaxRectsHeuristic) -> Self {
        let bin = Rect::new(0, 0, width, height);
        Self {
            bin,
            free: vec![bin],
            used: Vec::new(),
            heuristic,
        }
    }

    pub fn width(&self) -> u32 {
        self.bin.w
    }

    pub fn height(&self) -> u32 {
        self.bin.h
    }

    fn rect_right_ex(r: &Rect) -> u32 {
        r.x + r.w
    }
    fn rect_bottom_ex(r: &Rect) -> u32 {
        r.y + r.h
    }

    fn place_rect(&mut self, node: &Rect) {
        // split all free rectangles that intersect with node
        let mut new_free: Vec<Rect> = Vec::new();
        for fr in self.free.iter() {
            if !fr.intersects(node) {
                new_free.push(*fr);
                continue;
            }
            let fr_x2 = Self::rect_right_ex(fr);
            let fr_y2 = Self::rect_bottom_ex(fr);
            let n_x2 = Self::rect_right_ex(node);
            let n_y2 = Self::rect_bottom_ex(node);

            // above
            if node.y > fr.y {
                new_free.push(Rect::new(fr.x, fr.y, fr.w, node.y - fr.y));
            }
            // below
            if n_y2 < fr_y2 {
                new_free.push(Rect::new(fr.x, n_y2, fr.w, fr_y2 - n_y2));
            }
            // left
            if node.x > fr.x {
                new_free.push(Rect::new(fr.x, fr.y, node.x - fr.x, fr.h));
            }
            // right
            if n_x2 < fr_x2 {
                new_free.push(Rect::new(n_x2, fr.y, fr_x2 - n_x2, fr.h));
            }
        }

        self.free = new_free;
        self.prune_free_list();
        self.used.push(*node);
    }

    fn prune_free_list(&mut self) {
        let mut i = 0;
        while i < self.free.len() {
            let mut j = i + 1;
            let a = self.free[i];
            let a_right = Self::rect_right_ex(&a);
            let a_bottom = Self::rect_bottom_ex(&a);
            let mut remove_i = false;
            while j < self.free.len() {
                let b = self.free[j];
                let b_right = Self::rect_right_ex(&b);
                let b_bottom = Self::rect_bottom_ex(&b);
                // if a inside b
                if a.x >= b.x && a.y >= b.y && a_right <= b_right && a_bottom <= b_bottom {
                    remove_i = true;
                    break;
                }
                // if b inside a
                if b.x >= a.x && b.y >= a.y && b_right <= a_right && b_bottom <= a_bottom {
                    self.free.remove(j);
                    continue;
                }
                j += 1;
            }
            if remove_i {
                self.free.remove(i);
            } else {
                i += 1;
            }
        }
    }

    fn score(&self, fr: &Rect, w: u32, h: u32) -> (i32, i32) {
        let leftover_h = fr.w as i32 - w as i32;
        let leftover_v = fr.h as i32 - h as i32;
        let short_fit = leftover_h.abs().min(leftover_v.abs());
        let long_fit = leftover_h.abs().max(leftover_v.abs());
        let area_fit = (fr.area() as i64 - (w as i64 * h as i64)) as i32;
        match self.heuristic {
            MaxRectsHeuristic::BestAreaFit => (area_fit, short_fit),
            MaxRectsHeuristic::BestShortSideFit => (short_fit, long_fit),
            MaxRectsHeuristic::BestLongSideFit => (long_fit, short_fit),
            MaxRectsHeuristic::BottomLeft => ((fr.y + h) as i32, fr.x as i32),
            MaxRectsHeuristic::ContactPoint => {
                // maximize contact score: use negative for minimization
                let contact = self.contact_point_score(fr.x, fr.y, w, h);
                (-(contact as i32), area_fit)
            }
        }
    }

    fn find_position(&self, w: u32, h: u32, allow_rotation: bool) -> Option<Candidate> {
        let mut best: Option<Candidate> = None;
        let mut best_top = u32::MAX; // tie-break: prefer smaller top side (y + h)
        let mut best_left = u32::MAX; // then prefer smaller x

        let mut consider = |fr: &Rect, pw: u32, ph: u32, rotated: bool| {
            let score = self.score(fr, pw, ph);
            let top = fr.y.saturating_add(ph);
            let better = match &best {
                None => true,
                Some(b) => {
                    score < b.score
                        || (score == b.score
                            && (top < best_top || (top == best_top && fr.x < best_left)))
                }
            };
            if better {
                best_top = top;
                best_left = fr.x;
                best = Some(Candidate {
                    rect: Rect::new(fr.x, fr.y, pw, ph),
                    rotated,
                    score,
                });
            }
        };

        for fr in &self.free {
            if fr.w >= w && fr.h >= h {
                consider(fr, w, h, false);
            }
            if allow_rotation && w != h && fr.w >= h && fr.h >= w {
                consider(fr, h, w, true);
            }
        }
        best
    }

    fn contact_point_score(&self, x: u32, y: u32, w: u32, h: u32) -> u32 {
        let node = Rect::new(x, y, w, h);
        let mut score = 0u32;
        // contact with borders
        if node.x == 0 {
            score += node.h;
        }
        if node.y == 0 {
            score += node.w;
        }
        if node.x + node.w == self.bin.w {
            score += node.h;
        }
        if node.y + node.h == self.bin.h {
            score += node.w;
        }

        // contact with used rectangles
        for u in &self.used {
            // vertical contact (left/right edges)
            if node.x == u.x + u.w || u.x == node.x + node.w {
                score += overlap_1d(node.y, node.y + node.h, u.y, u.y + u.h);
            }
            // horizontal contact (top/bottom edges)
            if node.y == u.y + u.h || u.y == node.y + node.h {
                score += overlap_1d(node.x, node.x + node.w, u.x, u.x + u.w);
            }
        }
        score
    }

    pub fn free_list_len(&self) -> usize {
        self.free.len()
    }
}

fn overlap_1d(a1: u32, a2: u32, b1: u32, b2: u32) -> u32 {
    let start = a1.max(b1);
    let end = a2.min(b2);
    end.saturating_sub(start)
}

impl Packer for MaxRectsPacker {
    fn find(&self, w: u32, h: u32, allow_rotation: bool) -> Option<Candidate> {
        if w == 0 || h == 0 {
            return None;
        }
        self.find_position(w, h, allow_rotation)
    }

    fn place(&mut self, candidate: &Candidate) {
        self.place_rect(&candidate.rect);
    }

    fn used_area(&self) -> u64 {
        self.used.iter().map(Rect::area).sum()
    }

    fn bin_area(&self) -> u64 {
        self.bin.area()
    }
}
