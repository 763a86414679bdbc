use crate::errors::SettingsError;

use serde::{Deserialize, Serialize};

/// All tunable parameters of a training run.
///
/// Every field is a plain `f32` with a documented default, available
/// through [`Settings::default`]. Settings are validated once at the
/// start of training by [`validate`](Settings::validate); invalid
/// values are rejected there rather than mid-run.
///
/// # Examples
/// ```
/// use neatwork::Settings;
///
/// let mut settings = Settings::default();
/// settings.species_compatibility_distance = 1.2;
/// settings.mutation_new_node_chance = 0.05;
/// assert!(settings.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Chance that a gene disabled in exactly one parent is
    /// disabled in the child. [default: 0.75]
    pub gene_disable_chance: f32,
    /// Chance that a new genome has its weights mutated. [default: 0.8]
    pub mutation_weight_chance: f32,
    /// Chance that a weight mutation reassigns every weight
    /// instead of perturbing them. [default: 0.1]
    pub mutation_weight_random_chance: f32,
    /// Half-width of the uniform perturbation applied to each
    /// weight by a non-reassigning weight mutation. [default: 0.25]
    pub mutation_weight_max_disturbance: f32,
    /// Half-width of the uniform range from which fresh weights
    /// are drawn. [default: 1.0]
    pub mutation_weight_random_range: f32,
    /// Chance that a new genome receives an add-connection
    /// mutation. [default: 0.05]
    pub mutation_new_connection_chance: f32,
    /// Chance that a new genome receives an add-node
    /// mutation. [default: 0.03]
    pub mutation_new_node_chance: f32,
    /// Coefficient of the excess-gene term of the compatibility
    /// distance. [default: 1.0]
    pub distance_excess_weight: f32,
    /// Coefficient of the disjoint-gene term of the compatibility
    /// distance. [default: 1.0]
    pub distance_disjoint_weight: f32,
    /// Coefficient of the average-weight-difference term of the
    /// compatibility distance. [default: 0.4]
    pub distance_weights_weight: f32,
    /// Distance at or below which a genome joins a species.
    /// [default: 0.8]
    pub species_compatibility_distance: f32,
    /// Fraction of each species removed before breeding,
    /// worst-first. [default: 0.85]
    pub generation_elimination_percentage: f32,
    /// Chance that a new genome is bred by crossover rather than
    /// by mutating a clone of a single survivor. [default: 0.75]
    pub breed_cross_chance: f32,
}

impl Settings {
    /// Checks that every probability lies within `[0, 1]`, that the
    /// elimination percentage lies within `(0, 1]`, and that both
    /// random-range widths are positive.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let probabilities = [
            ("gene_disable_chance", self.gene_disable_chance),
            ("mutation_weight_chance", self.mutation_weight_chance),
            (
                "mutation_weight_random_chance",
                self.mutation_weight_random_chance,
            ),
            (
                "mutation_new_connection_chance",
                self.mutation_new_connection_chance,
            ),
            ("mutation_new_node_chance", self.mutation_new_node_chance),
            ("breed_cross_chance", self.breed_cross_chance),
        ];
        for (setting, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::ProbabilityOutOfRange { setting, value });
            }
        }
        let percentage = self.generation_elimination_percentage;
        if !(percentage > 0.0 && percentage <= 1.0) {
            return Err(SettingsError::EliminationPercentageOutOfRange { value: percentage });
        }
        let ranges = [
            (
                "mutation_weight_max_disturbance",
                self.mutation_weight_max_disturbance,
            ),
            (
                "mutation_weight_random_range",
                self.mutation_weight_random_range,
            ),
        ];
        for (setting, value) in ranges {
            if !(value > 0.0) {
                return Err(SettingsError::NonPositiveRange { setting, value });
            }
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings {
            gene_disable_chance: 0.75,
            mutation_weight_chance: 0.8,
            mutation_weight_random_chance: 0.1,
            mutation_weight_max_disturbance: 0.25,
            mutation_weight_random_range: 1.0,
            mutation_new_connection_chance: 0.05,
            mutation_new_node_chance: 0.03,
            distance_excess_weight: 1.0,
            distance_disjoint_weight: 1.0,
            distance_weights_weight: 0.4,
            species_compatibility_distance: 0.8,
            generation_elimination_percentage: 0.85,
            breed_cross_chance: 0.75,
        }
    }
}
