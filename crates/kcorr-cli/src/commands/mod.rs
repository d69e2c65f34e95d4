pub mod analyze;
pub mod synth;
