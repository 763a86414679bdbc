//! A deterministic, seedable implementation of NEAT
//! (NeuroEvolution of Augmenting Topologies).
//!
//! `neatwork` evolves both the weights and the topology of
//! feed-forward networks. Genomes are flat maps of connection genes
//! keyed by innovation number, the population is partitioned into
//! species by a compatibility distance, and each generation the
//! weakest slice of every species is culled before the survivors
//! breed the next one through crossover and mutation.
//!
//! Every stochastic decision of a run is drawn from one seeded
//! stream, so two runs with the same seed, settings and fitness
//! function produce bit-identical populations.
//!
//! A host supplies two strategies: a [`FitnessFunction`] that scores
//! candidate networks, and an [`ActivationFunction`] applied at
//! every non-input node (any `Fn(f32) -> f32` works).
//!
//! # Example: evolving XOR
//! ```no_run
//! use neatwork::{Evolution, FitnessFunction};
//! use neatwork::networks::Network;
//! use std::num::NonZeroUsize;
//!
//! struct Xor;
//!
//! impl FitnessFunction for Xor {
//!     fn fitness(&mut self, network: &Network<'_>) -> f32 {
//!         let cases = [
//!             ([0.0, 0.0], 0.0),
//!             ([0.0, 1.0], 1.0),
//!             ([1.0, 0.0], 1.0),
//!             ([1.0, 1.0], 0.0),
//!         ];
//!         let mut error = 0.0;
//!         for (input, expected) in cases {
//!             error += (network.calculate(&input)[0] - expected).abs();
//!         }
//!         (4.0 - error).powf(2.0)
//!     }
//! }
//!
//! fn sigmoid(x: f32) -> f32 {
//!     1.0 / (1.0 + (-4.9 * x).exp())
//! }
//!
//! fn main() -> Result<(), neatwork::EvolutionError> {
//!     let mut evolution = Evolution::new(
//!         NonZeroUsize::new(2).unwrap(),
//!         NonZeroUsize::new(1).unwrap(),
//!         sigmoid as fn(f32) -> f32,
//!         Xor,
//!     );
//!     evolution.set_seed(2016);
//!     let champion = evolution.train_to_fitness(NonZeroUsize::new(150).unwrap(), 15.0)?;
//!     println!("{}", champion);
//!     Ok(())
//! }
//! ```

pub mod genomics;
pub mod networks;
pub mod populations;

mod config;
mod errors;
mod evolution;
mod rng;
mod strategies;

pub use config::Settings;
pub use errors::{EvolutionError, SettingsError};
pub use evolution::Evolution;
pub use rng::EvolutionRng;
pub use strategies::{ActivationFunction, FitnessFunction};

/// Identifier of a historical structural innovation. Issued
/// consecutively from zero by [`genomics::History`], so an id is
/// also its own ordinal.
pub type Innovation = usize;

/// Identifier of a network node. Node ids are positive; inputs are
/// `1..=input_count`, outputs follow them, and hidden nodes take
/// the next free id at their creation.
pub type NodeId = usize;
