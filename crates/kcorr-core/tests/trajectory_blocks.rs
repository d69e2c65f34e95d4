use approx::assert_relative_eq;
use kcorr_core::synthetic::{ideal_gas, with_twin_species, IdealGasSpec};
use kcorr_core::trajectory::{check_block_period, Cell, Frame, InMemoryTrajectory, Trajectory};
use kcorr_core::{CorrError, FilterPair, ParticleFilter, ScalarField};
use proptest::prelude::*;

fn log_block_steps(blocks: usize) -> Vec<i64> {
    let pattern = [0, 1, 2, 4, 8];
    let mut steps = Vec::new();
    for block in 0..blocks {
        for offset in pattern {
            steps.push(block as i64 * 16 + offset);
        }
    }
    steps
}

fn frames_for(steps: &[i64], positions: Vec<[f64; 3]>) -> Vec<Frame> {
    steps
        .iter()
        .map(|step| Frame {
            step: *step,
            cell: Cell::cubic(4.0),
            positions: positions.clone(),
            species: Vec::new(),
            velocities: None,
        })
        .collect()
}

#[test]
fn periodic_blocks_are_accepted() {
    let steps = log_block_steps(4);
    check_block_period(&steps, 5).expect("periodic");
    check_block_period(&steps[..13], 5).expect("trailing partial block");
}

#[test]
fn broken_block_is_rejected() {
    let mut steps = log_block_steps(3);
    steps[7] += 1;
    let err = check_block_period(&steps, 5).unwrap_err();
    assert!(matches!(err, CorrError::Config(ref info) if info.code == "block-period-mismatch"));
}

#[test]
fn restarted_steps_are_rejected_for_any_period() {
    for period in [1, 3] {
        let err = check_block_period(&[0, 1, 2, 0, 1, 2], period).unwrap_err();
        assert!(matches!(err, CorrError::Config(ref info) if info.code == "block-period-mismatch"));
    }
}

#[test]
fn trajectory_rejects_wrong_block_period() {
    let steps = log_block_steps(3);
    let frames = frames_for(&steps, vec![[0.0; 3]]);
    let trajectory = InMemoryTrajectory::new(frames, 1.0).expect("trajectory");
    assert!(trajectory.clone().with_block_period(4).is_err());
    let trajectory = trajectory.with_block_period(5).expect("period 5");
    assert_eq!(trajectory.block_period(), 5);
    assert_relative_eq!(trajectory.total_time(), 40.0);
}

#[test]
fn unfolding_removes_periodic_jumps() {
    let cell = Cell::cubic(4.0);
    let xs = [1.8, -1.9, -1.5];
    let frames = xs
        .iter()
        .enumerate()
        .map(|(step, x)| Frame {
            step: step as i64,
            cell,
            positions: vec![[*x, 0.0, 0.0]],
            species: Vec::new(),
            velocities: None,
        })
        .collect();
    let trajectory = InMemoryTrajectory::new(frames, 1.0).expect("trajectory");
    let unfolded = trajectory.unfolded_positions(2).expect("unfolded");
    assert_relative_eq!(unfolded[0][0], 2.5, epsilon = 1e-12);
    assert!(!trajectory.is_cell_variable().unwrap());
}

#[test]
fn grand_canonical_trajectories_cannot_unfold() {
    let mut frames = frames_for(&[0, 1], vec![[0.0; 3]]);
    frames[1].positions.push([1.0, 1.0, 1.0]);
    let trajectory = InMemoryTrajectory::new(frames, 1.0).expect("trajectory");
    assert!(trajectory.unfolded_positions(0).is_err());
}

#[test]
fn twin_species_duplicates_particles() {
    let spec = IdealGasSpec {
        particles: 3,
        frames: 2,
        side: 5.0,
        sigma: 0.1,
        timestep: 1.0,
        species: 1,
        seed: 5,
    };
    let base = ideal_gas(&spec).expect("synthetic");
    let twins = with_twin_species(&base).expect("twins");
    let species = twins.species(1).unwrap();
    let positions = twins.positions(1).unwrap();
    let first = ParticleFilter::Species { id: 0 }.apply(species, positions);
    let second = ParticleFilter::Species { id: 1 }.apply(species, positions);
    assert_eq!(first, second);
    assert_eq!(FilterPair::single(ParticleFilter::All).distinct_second(), None);
}

#[test]
fn field_is_centered_and_checked() {
    let frames = frames_for(&[0, 1], vec![[0.0; 3], [1.0; 3]]);
    let trajectory = InMemoryTrajectory::new(frames, 1.0).expect("trajectory");
    let field = ScalarField::centered("energy", vec![0, 1], vec![vec![1.0, 3.0], vec![5.0, 7.0]])
        .expect("field");
    assert_relative_eq!(field.frame(0).unwrap()[0], -3.0);
    field.check_sync(&trajectory).expect("synced");

    let shifted = ScalarField::centered("energy", vec![0, 2], vec![vec![1.0, 3.0], vec![5.0, 7.0]])
        .expect("field");
    assert!(shifted.check_sync(&trajectory).is_err());
}

proptest! {
    #[test]
    fn uniform_steps_are_periodic_for_any_period(stride in 1i64..10, len in 1usize..60, period in 1usize..8) {
        let steps: Vec<i64> = (0..len as i64).map(|i| i * stride).collect();
        prop_assert!(check_block_period(&steps, period).is_ok());
    }
}
