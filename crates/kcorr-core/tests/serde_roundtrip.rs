use kcorr_core::provenance::{RunProvenance, SchemaVersion};
use kcorr_core::synthetic::{ideal_gas, IdealGasSpec};
use kcorr_core::trajectory::{InMemoryTrajectory, Trajectory, TrajectoryFile};
use kcorr_core::{FilterPair, ParticleFilter};

#[test]
fn provenance_round_trip_json() {
    let provenance = RunProvenance {
        config_hash: "config".into(),
        trajectory: "traj.json".into(),
        frames: 10,
        seed: 99,
        created_at: "2023-10-31T00:00:00Z".into(),
        tool_versions: [("kcorr-core".into(), "0.1.0".into())].into_iter().collect(),
    };
    let json = serde_json::to_string_pretty(&provenance).expect("serialize");
    let decoded: RunProvenance = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, provenance);
    assert_eq!(SchemaVersion::default(), SchemaVersion::new(1, 0, 0));
}

#[test]
fn trajectory_file_round_trip() {
    let spec = IdealGasSpec {
        particles: 4,
        frames: 3,
        side: 5.0,
        sigma: 0.1,
        timestep: 0.5,
        species: 2,
        seed: 11,
    };
    let trajectory = ideal_gas(&spec).expect("synthetic");
    let json = serde_json::to_string(&trajectory.to_file()).expect("serialize");
    let file: TrajectoryFile = serde_json::from_str(&json).expect("deserialize");
    let restored = InMemoryTrajectory::new(file.frames, file.timestep).expect("rebuild");
    assert_eq!(restored.steps(), trajectory.steps());
    assert_eq!(restored.positions(2).unwrap(), trajectory.positions(2).unwrap());
    assert_eq!(restored.species(1).unwrap(), &[0, 1, 0, 1]);
}

#[test]
fn filters_use_tagged_representation() {
    let pair = FilterPair::cross(ParticleFilter::All, ParticleFilter::Species { id: 2 });
    let json = serde_json::to_string(&pair).expect("serialize");
    assert!(json.contains("\"type\":\"species\""));
    let decoded: FilterPair = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, pair);
}
