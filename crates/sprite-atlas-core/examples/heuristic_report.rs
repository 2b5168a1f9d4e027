use rand::{Rng, SeedableRng};
use sprite_atlas_core::packer::{MaxRectsHeuristic, MaxRectsPacker, Packer};
use std::time::Instant;

fn run(n: usize, heuristic: MaxRectsHeuristic, seed: u64) {
    let mut p = MaxRectsPacker::new(2048, 2048, heuristic);
    let mut placed = 0usize;
    let mut free_sum: u64 = 0;

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let start = Instant::now();
    for _ in 0..n {
        let w: u32 = rng.gen_range(4..=96);
        let h: u32 = rng.gen_range(4..=96);
        if p.pack(w, h, true).is_some() {
            placed += 1;
            free_sum += p.free_list_len() as u64;
        } else {
            break;
        }
    }
    let elapsed = start.elapsed();
    let avg_free = if placed > 0 {
        free_sum as f64 / placed as f64
    } else {
        0.0
    };
    println!(
        "{:?} placed={} occ={:.2}% avg_free={:.1} time={}ms",
        heuristic,
        placed,
        p.occupancy() * 100.0,
        avg_free,
        elapsed.as_millis()
    );
}

fn main() {
    for (n, seed) in [(1000, 1337), (5000, 4242)] {
        println!("N={n}");
        for heuristic in MaxRectsHeuristic::PORTFOLIO {
            run(n, heuristic, seed);
        }
        run(n, MaxRectsHeuristic::ContactPoint, seed);
        println!();
    }
}
