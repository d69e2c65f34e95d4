#![deny(missing_docs)]
#![doc = "Core trajectory, filter, error and seeding types shared by the kcorr crates."]

pub mod cancel;
pub mod errors;
pub mod field;
pub mod filter;
/// Content hashing helpers.
pub mod hash;
pub mod provenance;
pub mod rng;
pub mod serde;
pub mod synthetic;
pub mod trajectory;

pub use cancel::CancelToken;
pub use errors::{CorrError, ErrorInfo};
pub use field::ScalarField;
pub use filter::{FilterPair, ParticleFilter};
pub use hash::stable_hash_string;
pub use provenance::{RunProvenance, SchemaVersion};
pub use rng::{derive_substream_seed, RngHandle};
pub use trajectory::{check_block_period, Cell, Frame, InMemoryTrajectory, Trajectory};
