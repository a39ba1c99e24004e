#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use gas_life::hashgas::{HashGasConfig, HashGasLattice};
use gas_life::lattice::{GasLattice, Lattice, LatticeConfig, particle_count};
use std::time::{Duration, Instant};

const DEFAULT_SIZE: usize = 64;
const DEFAULT_TEMPERATURE: f64 = 0.1;
const DEFAULT_ADVANCES: u32 = 8;
const DEFAULT_SEED: u64 = 0x5EED_1234_ABCD_EF01;

struct MainArgs {
    size: usize,
    temperature: f64,
    advances: u32,
    seed: u64,
    check: bool,
    lattice: LatticeConfig,
    hash: HashGasConfig,
}

fn parse_args() -> MainArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut parsed = MainArgs {
        size: DEFAULT_SIZE,
        temperature: DEFAULT_TEMPERATURE,
        advances: DEFAULT_ADVANCES,
        seed: DEFAULT_SEED,
        check: false,
        lattice: LatticeConfig::default(),
        hash: HashGasConfig::default(),
    };
    let next_arg = |i: usize, flag: &str| -> &str {
        args.get(i)
            .map(String::as_str)
            .unwrap_or_else(|| panic!("{flag} requires a value"))
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--size" => {
                i += 1;
                parsed.size = next_arg(i, "--size")
                    .parse()
                    .expect("--size requires a positive integer");
            }
            "--temperature" => {
                i += 1;
                parsed.temperature = next_arg(i, "--temperature")
                    .parse()
                    .expect("--temperature requires a number in [0, 1]");
            }
            "--advances" => {
                i += 1;
                parsed.advances = next_arg(i, "--advances")
                    .parse()
                    .expect("--advances requires a non-negative integer");
            }
            "--seed" => {
                i += 1;
                parsed.seed = next_arg(i, "--seed")
                    .parse()
                    .expect("--seed requires an unsigned integer");
            }
            "--threads" => {
                i += 1;
                let n: usize = next_arg(i, "--threads")
                    .parse()
                    .expect("--threads requires a positive integer");
                parsed.lattice = parsed.lattice.thread_count(n);
            }
            "--no-memoize" => parsed.hash = parsed.hash.memoize(false),
            "--no-intern" => parsed.hash = parsed.hash.intern(false),
            "--check" => parsed.check = true,
            other => panic!(
                "unknown argument: {other}\nusage: gas-life [--size N] [--temperature T] [--advances K] [--seed S] [--threads N] [--no-memoize] [--no-intern] [--check]"
            ),
        }
        i += 1;
    }
    parsed
}

fn mismatches(oracle: &GasLattice, hash: &HashGasLattice) -> usize {
    let n = oracle.size();
    let mut count = 0;
    for y in 0..n {
        for x in 0..n {
            if oracle.at(x, y) != hash.cell_at(x, y) {
                count += 1;
            }
        }
    }
    count
}

fn main() {
    let args = parse_args();
    let mut oracle =
        GasLattice::random_with_config(args.size, args.temperature, args.seed, args.lattice)
            .expect("failed to seed lattice");
    let mut hash =
        HashGasLattice::build_with_config(&oracle, args.hash).expect("failed to build snapshot");
    let particles = particle_count(&oracle);
    println!(
        "Lattice {0}x{0}, {particles} particles, seed level {1}",
        args.size,
        hash.level()
    );

    let mut hash_total = Duration::ZERO;
    let mut oracle_total = Duration::ZERO;
    for advance in 1..=args.advances {
        let start = Instant::now();
        let ticks = hash.advance();
        let hash_phase = start.elapsed();
        hash_total += hash_phase;
        let hash_ms = hash_phase.as_secs_f64() * 1000.0;

        if args.check {
            let start = Instant::now();
            oracle.step_n(ticks);
            let oracle_phase = start.elapsed();
            oracle_total += oracle_phase;
            let oracle_ms = oracle_phase.as_secs_f64() * 1000.0;
            let bad = mismatches(&oracle, &hash);
            let status = if bad == 0 { "MATCH" } else { "MISMATCH" };
            println!(
                "Advance {advance}: +{ticks} ticks (t = {}), level {} [{status}]",
                hash.elapsed_ticks(),
                hash.level()
            );
            println!("  HashGas: {hash_ms:.3} ms | Reference: {oracle_ms:.3} ms | mismatched cells: {bad}");
        } else {
            println!(
                "Advance {advance}: +{ticks} ticks (t = {}), level {}, {hash_ms:.3} ms",
                hash.elapsed_ticks(),
                hash.level()
            );
        }
    }

    let hash_total_ms = hash_total.as_secs_f64() * 1000.0;
    println!("\n--- Summary ({} ticks) ---", hash.elapsed_ticks());
    println!("HashGas: {hash_total_ms:.3} ms total");
    if args.check {
        let oracle_total_ms = oracle_total.as_secs_f64() * 1000.0;
        let speedup = oracle_total_ms / hash_total_ms;
        println!("Reference: {oracle_total_ms:.3} ms total");
        println!("Speedup (Reference / HashGas): {speedup:.2}x");
    }
    println!("Particles: {} (seeded {particles})", particle_count(&hash));
    print!("{}", hash.stats());
}
