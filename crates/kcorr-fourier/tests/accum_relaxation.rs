use approx::assert_relative_eq;
use kcorr_fourier::{
    extract_relaxation, first_crossing, DynamicCurve, LagAccumulator, ShellCurve, StaticAccumulator,
    StaticSums, INVERSE_E,
};
use num_complex::Complex64;
use proptest::prelude::*;

type Contribution = (usize, i64, i32, u64);

fn accumulate(contributions: &[Contribution]) -> LagAccumulator {
    let mut accumulator = LagAccumulator::new(3);
    for (shell, delta, value, count) in contributions {
        accumulator.add(*shell, *delta, f64::from(*value), *count);
    }
    accumulator
}

proptest! {
    #[test]
    fn merge_is_order_independent(
        contributions in prop::collection::vec((0usize..3, 0i64..6, -100i32..100, 1u64..5), 0..60),
        split in 1usize..6,
    ) {
        let chunks: Vec<LagAccumulator> = contributions.chunks(split).map(accumulate).collect();
        let forward = chunks.iter().cloned().fold(LagAccumulator::new(3), LagAccumulator::merge);
        let backward = chunks.iter().rev().cloned().fold(LagAccumulator::new(3), LagAccumulator::merge);
        let whole = accumulate(&contributions);
        prop_assert_eq!(&forward, &backward);
        prop_assert_eq!(&forward, &whole);
    }
}

#[test]
fn empty_buckets_never_produce_means() {
    let mut accumulator = LagAccumulator::new(2);
    accumulator.add(0, 0, 4.0, 2);
    accumulator.add(0, 3, 1.0, 4);
    assert_eq!(accumulator.means(0), vec![(0, 2.0), (3, 0.25)]);
    assert!(accumulator.means(1).is_empty());
}

#[test]
fn static_fluctuation_subtracts_mean_densities() {
    let mut accumulator = StaticAccumulator::new(2);
    accumulator.add(
        0,
        &StaticSums {
            cross: Complex64::new(10.0, 1.0),
            first: Complex64::new(2.0, 0.0),
            second: Complex64::new(2.0, 0.0),
            count: 2,
        },
    );
    let other = {
        let mut other = StaticAccumulator::new(2);
        other.add(
            0,
            &StaticSums {
                cross: Complex64::new(2.0, -1.0),
                first: Complex64::new(0.0, 0.0),
                second: Complex64::new(0.0, 0.0),
                count: 2,
            },
        );
        other
    };
    let merged = accumulator.merge(other);
    let sums = merged.slot(0).expect("slot");
    assert_eq!(sums.count, 4);
    assert_relative_eq!(sums.fluctuation().expect("value"), 3.0 - 0.25);
    assert!(merged.slot(1).expect("slot").fluctuation().is_none());
}

#[test]
fn exponential_decay_gives_its_time_constant() {
    let tau = 2.0;
    let times: Vec<f64> = (0..400).map(|i| i as f64 * 0.025).collect();
    let values: Vec<f64> = times.iter().map(|t| (-t / tau).exp()).collect();
    let crossing = first_crossing(&times, &values, INVERSE_E).expect("crossing");
    assert_relative_eq!(crossing, tau, epsilon = 1e-3);
}

#[test]
fn flat_curve_has_no_crossing() {
    let times = [0.0, 1.0, 2.0, 3.0];
    let values = [1.0, 0.9, 0.8, 0.7];
    assert!(first_crossing(&times, &values, INVERSE_E).is_none());
    assert!(first_crossing(&[], &[], INVERSE_E).is_none());
}

#[test]
fn rising_curve_has_no_crossing() {
    let times = [0.0, 1.0, 2.0];
    assert!(first_crossing(&times, &[0.0, 0.5, 0.9], INVERSE_E).is_none());
    assert!(first_crossing(&times, &[INVERSE_E, 0.2, 0.1], INVERSE_E).is_none());
}

#[test]
fn crossing_interpolates_linearly_and_skips_nan() {
    let times = [0.0, 1.0, 2.0, 3.0];
    let values = [1.0, f64::NAN, 0.5, 0.0];
    let crossing = first_crossing(&times, &values, 0.25).expect("crossing");
    assert_relative_eq!(crossing, 2.5);

    let exact = first_crossing(&times, &[1.0, 0.25, 0.1, 0.0], 0.25).expect("exact");
    assert_relative_eq!(exact, 1.0);
}

#[test]
fn relaxation_is_isolated_per_shell() {
    let times: Vec<f64> = (0..50_i32).map(f64::from).collect();
    let decaying = ShellCurve {
        norm: 2.0,
        times: times.clone(),
        values: times.iter().map(|t| (-t / 5.0).exp()).collect(),
        unnormalized: times.iter().map(|t| (-t / 5.0).exp()).collect(),
        normalized: true,
    };
    let stuck = ShellCurve {
        norm: 1.0,
        times: times.clone(),
        values: vec![1.0; times.len()],
        unnormalized: vec![1.0; times.len()],
        normalized: true,
    };
    let curve = DynamicCurve {
        shells: vec![stuck, decaying],
    };
    let record = extract_relaxation(&curve);
    assert_eq!(record.entries.len(), 2);
    assert!(record.tau(1.0).is_none());
    let tau = record.tau(2.0).expect("tau");
    assert!((tau - 5.0).abs() < 0.1, "tau {tau}");
}

#[test]
fn unnormalized_shells_have_no_relaxation_time() {
    let times = vec![0.0, 1.0, 2.0];
    let values = vec![1.0, 0.3, 0.1];
    let curve = DynamicCurve {
        shells: vec![ShellCurve {
            norm: 3.0,
            times,
            values: values.clone(),
            unnormalized: values,
            normalized: false,
        }],
    };
    let record = extract_relaxation(&curve);
    assert_eq!(record.entries.len(), 1);
    assert!(record.tau(3.0).is_none());
}
