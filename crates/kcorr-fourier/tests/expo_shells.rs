use std::collections::HashSet;
use std::f64::consts::PI;

use approx::assert_relative_eq;
use kcorr_core::rng::RngHandle;
use kcorr_core::trajectory::Cell;
use kcorr_fourier::{EngineKind, ExpoTable, Partner, ShellCatalogue, ShellSpec, SphericalShells};
use num_complex::Complex64;

fn k0(side: f64) -> [f64; 3] {
    [2.0 * PI / side; 3]
}

fn direct_phase(k0: [f64; 3], n: [i32; 3], r: [f64; 3]) -> Complex64 {
    let arg = (0..3).map(|axis| n[axis] as f64 * k0[axis] * r[axis]).sum::<f64>();
    Complex64::from_polar(1.0, arg)
}

#[test]
fn half_width_covers_kmax() {
    assert_eq!(ExpoTable::half_width(k0(10.0), 10.1), 17);
    assert_eq!(ExpoTable::half_width([1.0, 0.5, 2.0], 3.0), 7);
}

#[test]
fn phases_factorise_per_axis() {
    let k0 = k0(10.0);
    let positions = [[0.3, -1.7, 4.2], [-4.9, 2.2, 0.01], [1.0, 1.0, -3.3]];
    let table = ExpoTable::tabulate(k0, 4.0, &[&positions[..]]).expect("table");
    assert_eq!(table.samples(), 1);
    assert_eq!(table.particles(), 3);
    for n in [[2, -1, 3], [0, 0, 1], [-3, 4, -2], [6, 0, -6]] {
        assert!(table.covers(n));
        let columns = table.columns(n);
        for (particle, r) in positions.iter().enumerate() {
            let expected = direct_phase(k0, n, *r);
            let phase = table.phase(0, particle, columns);
            assert_relative_eq!(phase.re, expected.re, epsilon = 1e-10);
            assert_relative_eq!(phase.im, expected.im, epsilon = 1e-10);
        }
    }
}

#[test]
fn negative_indices_are_conjugates() {
    let table = ExpoTable::tabulate(k0(7.0), 3.0, &[&[[1.3, -0.4, 2.9]][..]]).expect("table");
    let plus = table.phase(0, 0, table.columns([2, 1, 3]));
    let minus = table.phase(0, 0, table.columns([-2, -1, -3]));
    assert_relative_eq!(plus.re, minus.re, epsilon = 1e-12);
    assert_relative_eq!(plus.im, -minus.im, epsilon = 1e-12);
}

#[test]
fn density_sums_weighted_phases() {
    let k0 = k0(5.0);
    let positions = [[0.1, 0.2, 0.3], [1.1, -2.0, 0.7]];
    let table = ExpoTable::tabulate(k0, 3.0, &[&positions[..]]).expect("table");
    let n = [1, 2, -1];
    let weights = [0.5, -2.0];
    let expected = direct_phase(k0, n, positions[0]) * 0.5 - direct_phase(k0, n, positions[1]) * 2.0;
    let rho = table.density(0, n, Some(&weights[..]));
    assert_relative_eq!(rho.re, expected.re, epsilon = 1e-10);
    assert_relative_eq!(rho.im, expected.im, epsilon = 1e-10);
}

#[test]
fn ragged_blocks_are_rejected() {
    let first = [[0.0; 3], [1.0; 3]];
    let second = [[0.0; 3]];
    let err = ExpoTable::tabulate(k0(10.0), 2.0, &[&first[..], &second[..]]).expect_err("ragged");
    assert_eq!(err.info().code, "ragged-block");
}

#[test]
fn partner_resolves_shared_to_first() {
    let first = vec![1, 2, 3];
    let shared: Partner<Vec<i32>> = Partner::Shared;
    assert!(shared.is_shared());
    assert!(std::ptr::eq(shared.resolve(&first), &first));
    let distinct = Partner::Distinct(vec![4]);
    assert_eq!(distinct.resolve(&first), &vec![4]);
}

#[test]
fn shells_hold_vectors_within_dk() {
    let cell = Cell::cubic(10.0);
    let k0 = cell.fundamental_wave_vector();
    let shells = SphericalShells::build(&cell, &[1.0, 2.0, 3.0], 0.1).expect("shells");
    assert_eq!(shells.shells().len(), 3);
    for shell in shells.shells() {
        assert!(!shell.vectors.is_empty());
        for n in &shell.vectors {
            assert_ne!(*n, [0, 0, 0]);
            let norm = (0..3)
                .map(|axis| (n[axis] as f64 * k0[axis]).powi(2))
                .sum::<f64>()
                .sqrt();
            assert!((norm - shell.norm).abs() < 0.1, "vector {n:?} outside shell {}", shell.norm);
        }
    }
}

#[test]
fn first_shell_has_six_axis_vectors() {
    let cell = Cell::cubic(10.0);
    let radius = 2.0 * PI / 10.0;
    let shells = SphericalShells::build(&cell, &[radius], 0.01).expect("shells");
    let vectors: HashSet<[i32; 3]> = shells.shells()[0].vectors.iter().copied().collect();
    let expected: HashSet<[i32; 3]> = [
        [1, 0, 0],
        [-1, 0, 0],
        [0, 1, 0],
        [0, -1, 0],
        [0, 0, 1],
        [0, 0, -1],
    ]
    .into_iter()
    .collect();
    assert_eq!(vectors, expected);
}

#[test]
fn decimation_is_deterministic_and_bounded() {
    let cell = Cell::cubic(10.0);
    let shells = SphericalShells::build(&cell, &[3.0, 5.0], 0.1).expect("shells");
    let first = shells.select(4, &mut RngHandle::from_seed(9));
    let again = shells.select(4, &mut RngHandle::from_seed(9));
    assert_eq!(first, again);
    for (selected, full) in first.shells.iter().zip(shells.shells()) {
        assert_eq!(selected.vectors.len(), 4usize.min(full.vectors.len()));
        let unique: HashSet<_> = selected.vectors.iter().collect();
        assert_eq!(unique.len(), selected.vectors.len());
        assert!(selected.vectors.iter().all(|n| full.vectors.contains(n)));
    }

    let everything = shells.select(10_000, &mut RngHandle::from_seed(1));
    for (selected, full) in everything.shells.iter().zip(shells.shells()) {
        assert_eq!(selected.vectors, full.vectors);
    }
}

#[test]
fn empty_shells_are_skipped_by_selection() {
    let cell = Cell::cubic(10.0);
    let shells = SphericalShells::build(&cell, &[0.2, 3.0], 0.05).expect("shells");
    assert!(shells.shells()[0].vectors.is_empty());
    let selection = shells.select(5, &mut RngHandle::from_seed(3));
    assert_eq!(selection.shells.len(), 1);
    assert_eq!(selection.shells[0].slot, 1);
}

#[test]
fn shell_defaults_follow_the_engine() {
    let k0 = Cell::cubic(10.0).fundamental_wave_vector();
    let spec = ShellSpec::default();

    let sk = spec.resolve(EngineKind::StructureFactor, k0).expect("sk");
    assert_eq!(sk.radii.len(), 30);
    assert_relative_eq!(sk.radii[0], k0[0]);
    assert_relative_eq!(sk.radii[29], 15.0, epsilon = 1e-12);
    assert_eq!(sk.nk, 20);

    let fskt = spec.resolve(EngineKind::SelfScattering, k0).expect("fskt");
    assert_eq!(fskt.radii, (1..=10_i32).map(f64::from).collect::<Vec<_>>());
    assert_eq!(fskt.nk, 8);

    let fkt = spec.resolve(EngineKind::Collective, k0).expect("fkt");
    assert_eq!(fkt.nk, 100);
    assert_relative_eq!(fkt.dk, 0.1);
}
