//! Client-side A/B experiment assignment with persisted, nested experiments.
//!
//! # Overview
//!
//! The crate revolves around a [`Client`] that assigns the current visitor to a variant of a named
//! experiment. Experiments come from a static definition set ([`Experiments`]) and either carry
//! explicit variant weights or nest further experiments, in which case the parent's variant picks
//! which nested experiment is active. Assignment results in a `u32` variant index.
//!
//! Assignments are persisted through a [`KeyValueStore`] (conventionally browser cookies) under
//! `abs_<experiment>` and reused until they expire.
//!
//! # Reporting
//!
//! An [`AnalyticsSink`] can be provided to receive one [`TrackEvent`] per experiment/variant pair.
//! Reported pairs are remembered under `abs_reported`, so an assignment that is re-resolved on
//! every page view is reported once.
//!
//! ```
//! # use ab_segment::{ClientConfig, ExperimentOptions, Experiments, TrackEvent};
//! let experiments = Experiments::from_json_str(r#"[
//!     { "name": "hero-banner", "variants": [1, 1, 2], "maxAgeDays": 30 }
//! ]"#).unwrap();
//! let client = ClientConfig::from_experiments(experiments)
//!     .analytics(|event: TrackEvent| {
//!         println!("{:?}", event);
//!     })
//!     .to_client();
//!
//! let variant = client.experiment_variant("hero-banner", &ExperimentOptions::default());
//! # assert!(variant < 3);
//! ```
//!
//! # Error Handling
//!
//! Assignment never fails: every failure mode (unknown experiment, disabled client, failed draw)
//! resolves to variant `0`. Errors, represented by the [`Error`] enum, are only returned while
//! loading experiment definitions.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages. Consider integrating a `log`-compatible logger implementation for better visibility
//! into assignment decisions.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod analytics;
mod assignment_store;
mod client;
mod config;
mod distribution;
mod error;
mod experiment;
mod query;
mod reported;
mod selector;
mod store;

pub use analytics::{AnalyticsSink, TrackEvent};
pub use assignment_store::{storage_key, AssignmentStore, STORAGE_PREFIX};
pub use client::{Client, ExperimentOptions, Segment};
pub use config::ClientConfig;
pub use distribution::calculate_distribution;
pub use error::{Error, Result};
pub use experiment::{
    find_experiment, ExperimentNode, Experiments, FoundExperiment, ResolvedVariant, Variants,
};
pub use query::{NoQuery, QuerySource};
pub use reported::ReportDeduplicator;
pub use selector::{draw_with_retries, weighted_random, RandomSource, ThreadRandom};
pub use store::{InMemoryStore, KeyValueStore};
