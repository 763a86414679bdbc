use crate::config::Settings;
use crate::errors::EvolutionError;
use crate::genomics::{Genome, History};
use crate::populations::{Population, PopulationManager};
use crate::rng::EvolutionRng;
use crate::strategies::{ActivationFunction, FitnessFunction};

use std::num::NonZeroUsize;

/// A complete training run: population, innovation registry, random
/// stream, settings and the host's strategies, wired together.
///
/// Hosts either call [`train_to_fitness`](Evolution::train_to_fitness)
/// and wait for a champion, or drive the loop themselves with
/// [`initialize`](Evolution::initialize) and
/// [`advance_generation`](Evolution::advance_generation).
pub struct Evolution<A, F> {
    input_count: NonZeroUsize,
    output_count: NonZeroUsize,
    settings: Settings,
    activation: A,
    fitness: F,
    history: History,
    rng: EvolutionRng,
    manager: PopulationManager,
}

impl<A, F> Evolution<A, F>
where
    A: ActivationFunction,
    F: FitnessFunction,
{
    /// Creates a run for networks with the given input and output
    /// arity, using default [`Settings`] and seed 0.
    pub fn new(
        input_count: NonZeroUsize,
        output_count: NonZeroUsize,
        activation: A,
        fitness: F,
    ) -> Evolution<A, F> {
        Evolution {
            input_count,
            output_count,
            settings: Settings::default(),
            activation,
            fitness,
            history: History::new(),
            rng: EvolutionRng::seeded(0),
            manager: PopulationManager::new(),
        }
    }

    /// Reseeds the random stream.
    ///
    /// # Panics
    /// Panics if the population was already initialized; a seed
    /// change mid-run would break reproducibility without being
    /// reproducible itself.
    pub fn set_seed(&mut self, seed: u64) {
        assert!(
            !self.manager.is_initialized(),
            "set_seed() must be called before initialize()"
        );
        self.rng = EvolutionRng::seeded(seed);
    }

    /// Returns the run's settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the run's settings for modification. Settings are
    /// validated when the population is initialized.
    pub fn settings_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }

    /// Returns the current generation number.
    pub fn generation(&self) -> usize {
        self.manager.generation()
    }

    /// Returns the current population.
    pub fn population(&self) -> &Population {
        self.manager.population()
    }

    /// Returns the best genome of the last completed generation,
    /// or `None` before the first [`advance_generation`](Evolution::advance_generation).
    pub fn champion(&self) -> Option<&Genome> {
        self.manager.champion()
    }

    /// Validates the settings and builds the first generation.
    pub fn initialize(&mut self, population_size: NonZeroUsize) -> Result<(), EvolutionError> {
        self.settings
            .validate()
            .map_err(EvolutionError::InvalidSettings)?;
        self.manager.initialize(
            self.input_count,
            self.output_count,
            population_size,
            &mut self.history,
            &self.settings,
            &mut self.rng,
        );
        Ok(())
    }

    /// Replaces the current generation with the next one.
    ///
    /// # Panics
    /// Panics if [`initialize`](Evolution::initialize) was never
    /// called.
    pub fn advance_generation(&mut self) -> Result<(), EvolutionError> {
        let Evolution {
            manager,
            fitness,
            activation,
            history,
            settings,
            rng,
            ..
        } = self;
        manager.new_generation(fitness, &*activation, history, settings, rng)
    }

    /// Runs generations until the champion's fitness reaches
    /// `target_fitness`, then returns a copy of that champion.
    ///
    /// Each transition reports its champion through
    /// [`FitnessFunction::generation_finished`]. The returned genome
    /// is a breeding copy: its structure is the champion's, its
    /// fitness cache is empty.
    pub fn train_to_fitness(
        &mut self,
        population_size: NonZeroUsize,
        target_fitness: f32,
    ) -> Result<Genome, EvolutionError> {
        self.initialize(population_size)?;
        loop {
            self.advance_generation()?;
            let champion = self
                .manager
                .champion()
                .expect("a completed generation has a champion");
            let best = champion.fitness().expect("the champion is evaluated");
            if best >= target_fitness {
                self.log_summary(best);
                return Ok(champion.breeding_clone());
            }
        }
    }

    fn log_summary(&self, best: f32) {
        let champion = match self.manager.champion() {
            Some(champion) => champion,
            None => return,
        };
        let enabled = champion.genes().filter(|g| g.enabled()).count();
        log::info!(
            "target reached in generation {} with fitness {:.4}",
            self.manager.generation(),
            best
        );
        log::info!(
            "the champion has {} hidden nodes and {} enabled connections",
            champion.hidden_nodes().len(),
            enabled
        );
        for gene in champion.genes() {
            log::debug!("  ~ {}", gene);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use crate::networks::Network;

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    /// Scores a network by how strongly its outputs react to a
    /// fixed probe input.
    struct ProbeFitness;

    impl FitnessFunction for ProbeFitness {
        fn fitness(&mut self, network: &Network<'_>) -> f32 {
            network
                .calculate(&[0.5, -0.25])
                .iter()
                .map(|v| v.abs())
                .sum()
        }
    }

    /// Every network scores the same, so no species ever improves.
    struct ConstantFitness(f32);

    impl FitnessFunction for ConstantFitness {
        fn fitness(&mut self, _network: &Network<'_>) -> f32 {
            self.0
        }
    }

    fn identity(x: f32) -> f32 {
        x
    }

    fn population_dump<A, F>(evolution: &Evolution<A, F>) -> Vec<String>
    where
        A: ActivationFunction,
        F: FitnessFunction,
    {
        let population = evolution.population();
        let mut dump = Vec::new();
        for species in population.all_species() {
            for &member in species.members() {
                dump.push(format!(
                    "{} {:?}",
                    species.id(),
                    population.genome(member)
                ));
            }
        }
        dump
    }

    #[test]
    fn identical_seeds_replay_identically() {
        let run = || {
            let mut evolution = Evolution::new(
                size(2),
                size(1),
                identity as fn(f32) -> f32,
                ProbeFitness,
            );
            evolution.set_seed(42);
            evolution.initialize(size(30)).unwrap();
            for _ in 0..3 {
                evolution.advance_generation().unwrap();
            }
            (
                population_dump(&evolution),
                format!("{:?}", evolution.champion().unwrap()),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn different_seeds_diverge() {
        let run = |seed| {
            let mut evolution = Evolution::new(
                size(2),
                size(1),
                identity as fn(f32) -> f32,
                ProbeFitness,
            );
            evolution.set_seed(seed);
            evolution.initialize(size(30)).unwrap();
            evolution.advance_generation().unwrap();
            population_dump(&evolution)
        };
        assert_ne!(run(1), run(2));
    }

    #[test]
    fn evolved_genomes_stay_acyclic() {
        let mut evolution = Evolution::new(
            size(2),
            size(1),
            identity as fn(f32) -> f32,
            ProbeFitness,
        );
        evolution.set_seed(7);
        // Aggressive structural mutation to exercise the cycle
        // check.
        evolution.settings_mut().mutation_new_connection_chance = 1.0;
        evolution.settings_mut().mutation_new_node_chance = 0.5;
        evolution.initialize(size(40)).unwrap();
        for _ in 0..5 {
            evolution.advance_generation().unwrap();
        }

        let population = evolution.population();
        for species in population.all_species() {
            for &member in species.members() {
                let genome = population.genome(member);
                for &node in &genome.hidden_nodes() {
                    assert!(
                        !reaches_itself(genome, node),
                        "cycle through node {} in genome {}",
                        node,
                        genome
                    );
                }
            }
        }
    }

    fn reaches_itself(genome: &Genome, start: usize) -> bool {
        fn walk(genome: &Genome, node: usize, start: usize, depth: usize) -> bool {
            if depth > 0 && node == start {
                return true;
            }
            if depth > genome.gene_count() {
                return false;
            }
            genome
                .genes()
                .filter(|g| g.from() == node)
                .any(|g| walk(genome, g.to(), start, depth + 1))
        }
        walk(genome, start, start, 0)
    }

    #[test]
    fn stagnant_lone_species_dies_out() {
        let mut evolution = Evolution::new(
            size(2),
            size(1),
            identity as fn(f32) -> f32,
            ConstantFitness(7.0),
        );
        evolution.set_seed(3);
        // Keep everything in one species so its death empties the
        // population.
        evolution.settings_mut().species_compatibility_distance = 1e9;
        evolution.initialize(size(20)).unwrap();

        for _ in 1..=15 {
            evolution.advance_generation().unwrap();
        }
        match evolution.advance_generation() {
            Err(EvolutionError::AllSpeciesExtinct { generation }) => {
                assert_eq!(generation, 17);
            }
            other => panic!("expected extinction, got {:?}", other),
        }
    }

    #[test]
    fn train_to_fitness_returns_a_champion_copy() {
        let mut evolution = Evolution::new(
            size(2),
            size(1),
            identity as fn(f32) -> f32,
            ConstantFitness(1.0),
        );
        evolution.set_seed(5);
        let champion = evolution.train_to_fitness(size(10), 0.5).unwrap();
        assert_eq!(champion.fitness(), None);
        assert!(champion.gene_count() >= 2);
        assert_eq!(evolution.champion().unwrap().fitness(), Some(1.0));
    }

    #[test]
    fn invalid_settings_are_rejected_at_initialization() {
        let mut evolution = Evolution::new(
            size(1),
            size(1),
            identity as fn(f32) -> f32,
            ConstantFitness(1.0),
        );
        evolution.settings_mut().breed_cross_chance = -0.5;
        match evolution.initialize(size(10)) {
            Err(EvolutionError::InvalidSettings(SettingsError::ProbabilityOutOfRange {
                setting,
                ..
            })) => assert_eq!(setting, "breed_cross_chance"),
            other => panic!("expected a settings error, got {:?}", other),
        }
    }
}
