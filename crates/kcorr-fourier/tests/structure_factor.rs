use std::sync::Arc;

use approx::assert_relative_eq;
use kcorr_core::synthetic::{ideal_gas, with_twin_species, IdealGasSpec};
use kcorr_core::trajectory::{Cell, Frame, InMemoryTrajectory, Trajectory};
use kcorr_core::{CancelToken, FilterPair, ParticleFilter, ScalarField};
use kcorr_fourier::{
    CorrelationConfig, EngineKind, ShellSpec, StaticCurve, StructureFactor,
    StructureFactorOptimized,
};

fn gas(particles: usize, frames: usize, seed: u64) -> InMemoryTrajectory {
    ideal_gas(&IdealGasSpec {
        particles,
        frames,
        side: 10.0,
        sigma: 1.0,
        timestep: 1.0,
        species: 1,
        seed,
    })
    .expect("ideal gas")
}

fn sk_config(radii: Vec<f64>) -> CorrelationConfig {
    let mut config = CorrelationConfig::new(EngineKind::StructureFactor);
    config.shells = ShellSpec::with_radii(radii);
    config
}

fn assert_points_close(left: &StaticCurve, right: &StaticCurve) {
    assert_eq!(left.points.len(), right.points.len());
    for (a, b) in left.points.iter().zip(&right.points) {
        assert_eq!(a.norm, b.norm);
        assert_relative_eq!(a.value, b.value, max_relative = 1e-9);
    }
}

#[test]
fn ideal_gas_structure_factor_is_flat() {
    let trajectory: Arc<dyn Trajectory> = Arc::new(gas(500, 20, 21));
    let engine = StructureFactor::new(trajectory, &sk_config(vec![4.0, 5.0, 6.0]), None)
        .expect("engine");
    assert_eq!(engine.particle_counts(), (500.0, 500.0));
    let curve = engine.compute(&CancelToken::new()).expect("compute");
    assert_eq!(curve.points.len(), 3);
    for point in &curve.points {
        assert!((point.value - 1.0).abs() < 0.35, "S({}) = {}", point.norm, point.value);
        assert_relative_eq!(point.unnormalized, point.value * 500.0, max_relative = 1e-12);
    }
    let mean = curve.points.iter().map(|point| point.value).sum::<f64>() / 3.0;
    assert!((mean - 1.0).abs() < 0.15, "mean S = {mean}");
}

#[test]
fn cross_structure_factor_of_twins_matches_one_species() {
    let twin: Arc<dyn Trajectory> = Arc::new(with_twin_species(&gas(80, 6, 4)).expect("twin"));
    let mut config = sk_config(vec![3.0, 5.0]);
    config.filters = FilterPair::single(ParticleFilter::Species { id: 0 });
    let single = StructureFactor::new(twin.clone(), &config, None)
        .expect("single")
        .compute(&CancelToken::new())
        .expect("compute");

    config.filters = FilterPair::cross(
        ParticleFilter::Species { id: 0 },
        ParticleFilter::Species { id: 1 },
    );
    let engine = StructureFactor::new(twin, &config, None).expect("cross");
    assert_eq!(engine.particle_counts(), (80.0, 80.0));
    let cross = engine.compute(&CancelToken::new()).expect("compute");
    assert_points_close(&single, &cross);
}

#[cfg(feature = "native-kernel")]
#[test]
fn optimized_matches_reference() {
    let trajectory: Arc<dyn Trajectory> = Arc::new(gas(120, 8, 9));
    let mut config = sk_config(vec![2.0, 4.0, 7.0]);
    config.threads = Some(2);
    let reference = StructureFactor::new(trajectory.clone(), &config, None)
        .expect("reference")
        .compute(&CancelToken::new())
        .expect("compute");
    let optimized = StructureFactorOptimized::new(
        trajectory,
        &config,
        None,
        kcorr_fourier::default_kernel(),
    )
    .expect("optimized");
    assert!(!optimized.kernel_info().name.is_empty());
    let curve = optimized.compute(&CancelToken::new()).expect("compute");
    assert_points_close(&reference, &curve);
}

#[test]
fn optimized_without_kernel_is_a_backend_error() {
    let trajectory: Arc<dyn Trajectory> = Arc::new(gas(10, 2, 1));
    let err = StructureFactorOptimized::new(trajectory, &sk_config(vec![2.0]), None, None)
        .err()
        .expect("missing kernel");
    assert_eq!(err.info().code, "missing-accelerated-backend");
    assert!(matches!(err, kcorr_core::CorrError::Backend(_)));
}

#[test]
fn opposite_charges_on_twins_cancel() {
    let twin = with_twin_species(&gas(50, 4, 13)).expect("twin");
    let half = 50;
    let charges: Vec<Vec<f64>> = twin
        .frames()
        .iter()
        .map(|_| {
            let mut values = vec![1.0; half];
            values.extend(std::iter::repeat(-1.0).take(half));
            values
        })
        .collect();
    let field = ScalarField::centered("charge", twin.steps().to_vec(), charges).expect("field");
    let engine = StructureFactor::new(Arc::new(twin), &sk_config(vec![2.0, 4.0]), Some(field))
        .expect("engine");
    let curve = engine.compute(&CancelToken::new()).expect("compute");
    assert_eq!(curve.points.len(), 2);
    for point in &curve.points {
        assert!(point.value.abs() < 1e-9, "S({}) = {}", point.norm, point.value);
    }
}

#[test]
fn unsynced_field_is_rejected() {
    let trajectory = gas(10, 3, 2);
    let steps: Vec<i64> = trajectory.steps().iter().map(|step| step + 1).collect();
    let field = ScalarField::centered("q", steps, vec![vec![1.0; 10]; 3]).expect("field");
    let err = StructureFactor::new(Arc::new(trajectory), &sk_config(vec![2.0]), Some(field))
        .err()
        .expect("unsynced");
    assert_eq!(err.info().code, "field-not-synced");
}

#[test]
fn empty_species_selection_is_rejected() {
    let mut config = sk_config(vec![2.0]);
    config.filters = FilterPair::single(ParticleFilter::Species { id: 7 });
    let err = StructureFactor::new(Arc::new(gas(10, 3, 2)), &config, None)
        .err()
        .expect("empty");
    assert_eq!(err.info().code, "empty-selection");
}

#[test]
fn variable_cell_rebuilds_wave_vectors() {
    let frames: Vec<Frame> = gas(100, 6, 17)
        .frames()
        .iter()
        .enumerate()
        .map(|(index, frame)| Frame {
            cell: if index % 2 == 0 {
                Cell::cubic(10.0)
            } else {
                Cell::cubic(10.5)
            },
            ..frame.clone()
        })
        .collect();
    let trajectory: Arc<dyn Trajectory> =
        Arc::new(InMemoryTrajectory::new(frames, 1.0).expect("trajectory"));
    assert!(trajectory.is_cell_variable().expect("cells"));
    let curve = StructureFactor::new(trajectory, &sk_config(vec![4.0, 5.0, 6.0]), None)
        .expect("engine")
        .compute(&CancelToken::new())
        .expect("compute");
    assert_eq!(curve.points.len(), 3);
    assert!(curve.points.iter().all(|point| point.value.is_finite()));
}

#[test]
fn block_periodic_frames_are_sampled_once_per_block() {
    let pattern = [0, 1, 2, 4, 8];
    let base = gas(60, 20, 23);
    let periodic: Vec<Frame> = base
        .frames()
        .iter()
        .enumerate()
        .map(|(index, frame)| Frame {
            step: (index / 5) as i64 * 16 + pattern[index % 5],
            ..frame.clone()
        })
        .collect();
    let block_starts: Vec<Frame> = periodic.iter().step_by(5).cloned().collect();
    let periodic = InMemoryTrajectory::new(periodic, 1.0)
        .expect("trajectory")
        .with_block_period(5)
        .expect("periodic");
    let block_starts = InMemoryTrajectory::new(block_starts, 1.0).expect("trajectory");

    let config = sk_config(vec![3.0, 5.0]);
    let cancel = CancelToken::new();
    let sampled = StructureFactor::new(Arc::new(periodic), &config, None)
        .expect("periodic")
        .compute(&cancel)
        .expect("compute");
    let reference = StructureFactor::new(Arc::new(block_starts), &config, None)
        .expect("starts")
        .compute(&cancel)
        .expect("compute");
    assert_points_close(&reference, &sampled);
}

#[test]
fn cancelled_structure_factor_stops() {
    let engine = StructureFactor::new(Arc::new(gas(10, 3, 2)), &sk_config(vec![2.0]), None)
        .expect("engine");
    let token = CancelToken::new();
    token.cancel();
    assert!(engine.compute(&token).expect_err("cancelled").is_cancelled());
}
