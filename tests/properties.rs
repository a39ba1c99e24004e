use gas_life::hashgas::HashGasLattice;
use gas_life::lattice::{Cell, GasLattice, Lattice, particle_count};
use proptest::prelude::*;

fn arb_cell() -> impl Strategy<Value = Cell> {
    prop_oneof![
        9 => (0u8..16).prop_map(Cell::new),
        1 => Just(Cell::WALL),
    ]
}

fn arb_grid() -> impl Strategy<Value = Vec<Vec<Cell>>> {
    prop::sample::select(vec![2usize, 4, 8, 16])
        .prop_flat_map(|n| prop::collection::vec(prop::collection::vec(arb_cell(), n), n))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn accelerated_matches_reference(rows in arb_grid(), advances in 1usize..=4) {
        let mut oracle = GasLattice::from_rows(&rows).unwrap();
        let mut hash = HashGasLattice::build(&oracle).unwrap();
        let n = rows.len();

        for _ in 0..advances {
            hash.advance();
        }
        oracle.step_n(hash.elapsed_ticks());

        for y in 0..n {
            for x in 0..n {
                prop_assert_eq!(hash.cell_at(x, y), oracle.at(x, y), "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn advance_conserves_particles(rows in arb_grid(), advances in 1usize..=3) {
        let oracle = GasLattice::from_rows(&rows).unwrap();
        let initial = particle_count(&oracle);
        let mut hash = HashGasLattice::build(&oracle).unwrap();
        for _ in 0..advances {
            hash.advance();
            prop_assert_eq!(particle_count(&hash), initial);
        }
    }

    #[test]
    fn region_invariant_holds(n in 1usize..40, advances in 1usize..6) {
        let lattice = GasLattice::new(n).unwrap();
        let mut hash = HashGasLattice::build(&lattice).unwrap();
        for _ in 0..advances {
            hash.advance();
            let side = 1usize << hash.level();
            let (ox, oy) = hash.origin();
            prop_assert!(ox + hash.width() <= side);
            prop_assert!(oy + hash.height() <= side);
        }
    }
}
