//! Species filters selecting the particles entering a correlation.

use serde::{Deserialize, Serialize};

/// Selects a subset of particles in every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ParticleFilter {
    /// Every particle.
    #[default]
    All,
    /// Only particles of one species.
    Species {
        /// Species identifier to retain.
        id: u32,
    },
}

impl ParticleFilter {
    /// Returns true when the particle of the given species passes the filter.
    pub fn accepts(&self, species: u32) -> bool {
        match self {
            ParticleFilter::All => true,
            ParticleFilter::Species { id } => *id == species,
        }
    }

    /// Copies the values belonging to particles passing the filter.
    pub fn apply<T: Copy>(&self, species: &[u32], values: &[T]) -> Vec<T> {
        match self {
            ParticleFilter::All => values.to_vec(),
            ParticleFilter::Species { .. } => species
                .iter()
                .zip(values.iter())
                .filter(|(id, _)| self.accepts(**id))
                .map(|(_, value)| *value)
                .collect(),
        }
    }

    /// Short label used in output tags.
    pub fn tag(&self) -> String {
        match self {
            ParticleFilter::All => "all".to_string(),
            ParticleFilter::Species { id } => format!("species{id}"),
        }
    }
}

/// The one or two filters of a correlation.
///
/// A missing second filter, or one equal to the first, means both bodies of
/// the correlation are the same particle set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct FilterPair {
    /// Filter applied to the first body.
    #[serde(default)]
    pub first: ParticleFilter,
    /// Optional filter applied to the second body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub second: Option<ParticleFilter>,
}

impl FilterPair {
    /// Both bodies select the same particles.
    pub fn single(filter: ParticleFilter) -> Self {
        Self {
            first: filter,
            second: None,
        }
    }

    /// Cross correlation between two filters.
    pub fn cross(first: ParticleFilter, second: ParticleFilter) -> Self {
        Self {
            first,
            second: Some(second),
        }
    }

    /// Returns the distinct second filter, or `None` when both bodies coincide.
    pub fn distinct_second(&self) -> Option<ParticleFilter> {
        match self.second {
            Some(second) if second != self.first => Some(second),
            _ => None,
        }
    }

    /// Tag describing the pair in output file names.
    pub fn tag(&self) -> String {
        match self.distinct_second() {
            Some(second) => format!("{}-{}", self.first.tag(), second.tag()),
            None => match self.first {
                ParticleFilter::All => String::new(),
                other => other.tag(),
            },
        }
    }
}
