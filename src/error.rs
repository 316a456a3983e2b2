use std::{path::PathBuf, sync::Arc};

use thiserror::Error;

/// Result type used by experiment definition loading.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading experiment definitions.
///
/// Assignment itself never fails: [`Client::experiment_variant`](crate::Client::experiment_variant)
/// resolves every failure to variant `0`.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// The experiment definitions file does not exist.
    #[error("experiments file not found at: {}", .0.display())]
    DefinitionsNotFound(PathBuf),

    /// An I/O error while reading the definitions.
    #[error(transparent)]
    // std::io::Error is not clonable, so we're wrapping it in an Arc.
    Io(Arc<std::io::Error>),

    /// Definitions are not valid JSON or do not match the expected shape.
    #[error("error parsing experiment definitions")]
    DefinitionParse(#[source] Arc<serde_json::Error>),

    /// An experiment has an empty `variants` list.
    #[error("experiment {experiment:?} has no variants")]
    EmptyVariants {
        /// Name of the offending experiment.
        experiment: String,
    },

    /// An experiment has a negative or non-finite weight.
    #[error("experiment {experiment:?} has invalid weight {weight}")]
    InvalidWeight {
        /// Name of the offending experiment.
        experiment: String,
        /// The weight as authored.
        weight: f64,
    },

    /// An experiment's weights do not add up to a finite total.
    #[error("experiment {experiment:?} has weights summing to a non-finite total")]
    InvalidTotalWeight {
        /// Name of the offending experiment.
        experiment: String,
    },

    /// An experiment has a negative or non-finite `maxAgeDays`.
    #[error("experiment {experiment:?} has invalid maxAgeDays {days}")]
    InvalidMaxAge {
        /// Name of the offending experiment.
        experiment: String,
        /// The lifetime as authored.
        days: f64,
    },
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::DefinitionParse(Arc::new(value))
    }
}
