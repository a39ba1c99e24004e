//! Macro-step throughput across lattice sizes.
//!
//! Use with `--release` for meaningful results.

#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use gas_life::hashgas::{HashGasConfig, HashGasLattice};
use gas_life::lattice::GasLattice;
use std::time::Instant;

const TEMPERATURE: f64 = 0.1;
const SEED: u64 = 0x5EED_1234_ABCD_EF01;
/// Reference stepping is skipped above this side length.
const REFERENCE_MAX_SIDE: usize = 512;
/// Without the step cache the recursion fans out 13 ways per level, so only
/// small lattices finish in reasonable time.
const NO_MEMO_MAX_SIDE: usize = 64;

fn bench_hash(size: usize, ticks: u64, config: HashGasConfig) -> (f64, u64, usize) {
    let lattice = GasLattice::random(size, TEMPERATURE, SEED).expect("failed to seed lattice");
    let mut hash =
        HashGasLattice::build_with_config(&lattice, config).expect("failed to build snapshot");

    let start = Instant::now();
    let advanced = hash.advance_at_least(ticks);
    let total_ms = start.elapsed().as_secs_f64() * 1000.0;
    (total_ms, advanced, hash.stats().nodes)
}

fn bench_reference(size: usize, ticks: u64) -> f64 {
    let mut lattice = GasLattice::random(size, TEMPERATURE, SEED).expect("failed to seed lattice");
    let start = Instant::now();
    lattice.step_n(ticks);
    start.elapsed().as_secs_f64() * 1000.0
}

fn main() {
    let scales: &[(usize, u64)] = &[
        (64, 1_024),
        (128, 1_024),
        (256, 2_048),
        (512, 2_048),
        (1024, 4_096),
    ];

    println!(
        "{:<10} {:>8} {:>12} {:>12} {:>12} {:>10}",
        "Grid", "Ticks", "Hash(ms)", "NoMemo(ms)", "Ref(ms)", "Nodes"
    );
    println!("{}", "-".repeat(70));

    for &(size, ticks) in scales {
        let (hash_ms, advanced, nodes) = bench_hash(size, ticks, HashGasConfig::default());
        let plain = if size <= NO_MEMO_MAX_SIDE {
            let config = HashGasConfig::default().memoize(false).intern(false);
            format!("{:.1}", bench_hash(size, ticks, config).0)
        } else {
            "-".to_string()
        };
        let reference = if size <= REFERENCE_MAX_SIDE {
            format!("{:.1}", bench_reference(size, advanced))
        } else {
            "-".to_string()
        };
        println!(
            "{:<10} {:>8} {:>12.1} {:>12} {:>12} {:>10}",
            format!("{}x{}", size, size),
            advanced,
            hash_ms,
            plain,
            reference,
            nodes
        );
    }
}
