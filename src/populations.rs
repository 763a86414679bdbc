//! Population storage and the generation transition.
//!
//! All genomes live in one arena owned by [`Population`]; species
//! reference their members by [`GenomeId`]. [`PopulationManager`]
//! drives the generational replacement: evaluate, cull, drop
//! stagnant and unproductive species, then refill the population
//! from the survivors' breeding pools.

mod species;

pub use species::{Species, SpeciesId};

use crate::config::Settings;
use crate::errors::EvolutionError;
use crate::genomics::{mutation, Gene, Genome, History};
use crate::networks::Network;
use crate::rng::EvolutionRng;
use crate::strategies::{ActivationFunction, FitnessFunction};
use crate::NodeId;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;

/// Number of consecutive stagnant generations after which a species
/// is removed.
const STAGNATION_LIMIT: usize = 15;

/// Identifier of a genome in the population arena. Never reused
/// within a run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GenomeId(pub(crate) usize);

impl fmt::Display for GenomeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The arena of all living genomes, partitioned into species.
///
/// Species hold ordered id lists rather than genomes, so members can
/// be moved, culled and swept without touching genome storage. The
/// arena itself is a hash map and is never iterated to make an
/// algorithmic decision; every deterministic walk goes through the
/// species' ordered member lists.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Population {
    genomes: HashMap<GenomeId, Genome, RandomState>,
    species: Vec<Species>,
    next_genome: usize,
    next_species: usize,
}

impl Population {
    /// Creates an empty population.
    pub fn new() -> Population {
        Population {
            genomes: HashMap::default(),
            species: Vec::new(),
            next_genome: 0,
            next_species: 0,
        }
    }

    /// Returns the genome with the given id.
    ///
    /// # Panics
    /// Panics if the id does not refer to a living genome.
    pub fn genome(&self, id: GenomeId) -> &Genome {
        self.genomes
            .get(&id)
            .unwrap_or_else(|| panic!("no genome with id {} in the arena", id))
    }

    fn genome_mut(&mut self, id: GenomeId) -> &mut Genome {
        self.genomes
            .get_mut(&id)
            .unwrap_or_else(|| panic!("no genome with id {} in the arena", id))
    }

    /// Iterates over all current species, in founding order.
    pub fn all_species(&self) -> impl Iterator<Item = &Species> {
        self.species.iter()
    }

    /// Returns the total number of living members across all
    /// species.
    pub fn size(&self) -> usize {
        self.species.iter().map(|s| s.members().len()).sum()
    }

    fn species_by_id(&self, id: SpeciesId) -> &Species {
        self.species
            .iter()
            .find(|s| s.id() == id)
            .unwrap_or_else(|| panic!("no species with id {}", id))
    }

    fn species_by_id_mut(&mut self, id: SpeciesId) -> &mut Species {
        self.species
            .iter_mut()
            .find(|s| s.id() == id)
            .unwrap_or_else(|| panic!("no species with id {}", id))
    }

    fn store(&mut self, genome: Genome) -> GenomeId {
        let id = GenomeId(self.next_genome);
        self.next_genome += 1;
        self.genomes.insert(id, genome);
        id
    }

    /// Classifies `genome` into the first species whose
    /// representative is within the compatibility distance, founding
    /// a new species around it if none is.
    pub(crate) fn add_genome(&mut self, mut genome: Genome, settings: &Settings) -> GenomeId {
        let compatible = self
            .species
            .iter()
            .find(|s| {
                Genome::distance(self.genome(s.representative()), &genome, settings)
                    <= settings.species_compatibility_distance
            })
            .map(|s| s.id());
        match compatible {
            Some(species_id) => {
                genome.set_species(species_id);
                let id = self.store(genome);
                self.species_by_id_mut(species_id).add_member(id);
                id
            }
            None => {
                let species_id = SpeciesId(self.next_species);
                self.next_species += 1;
                genome.set_species(species_id);
                let id = self.store(genome);
                self.species.push(Species::new(species_id, id));
                id
            }
        }
    }

    /// Adds `genome` directly to an existing species, bypassing
    /// classification. Used for the clone path of refilling, which
    /// returns children to their parent's species.
    pub(crate) fn insert_into_species(
        &mut self,
        mut genome: Genome,
        species_id: SpeciesId,
    ) -> GenomeId {
        genome.set_species(species_id);
        let id = self.store(genome);
        self.species_by_id_mut(species_id).add_member(id);
        id
    }

    /// Breeds a child from two evaluated members of the same
    /// species and classifies it into the population.
    ///
    /// The fitter parent dominates the crossover (ties go to `b`).
    /// The child is renumbered onto any already-living duplicate
    /// topology, mutated, and then speciated from scratch.
    ///
    /// # Panics
    /// Panics if the parents belong to different species or either
    /// is unevaluated.
    pub(crate) fn cross_and_add(
        &mut self,
        a: GenomeId,
        b: GenomeId,
        history: &mut History,
        settings: &Settings,
        rng: &mut EvolutionRng,
    ) -> GenomeId {
        let (dominant, weaker) = {
            let genome_a = self.genome(a);
            let genome_b = self.genome(b);
            assert_eq!(
                genome_a.species(),
                genome_b.species(),
                "genomes must share a species to be crossed"
            );
            let fitness_a = genome_a
                .fitness()
                .expect("parents must be evaluated before breeding");
            let fitness_b = genome_b
                .fitness()
                .expect("parents must be evaluated before breeding");
            if fitness_a > fitness_b {
                (a, b)
            } else {
                (b, a)
            }
        };
        let mut child = Genome::cross(self.genome(dominant), self.genome(weaker), settings, rng);
        child.fix_duplicates(self);
        mutation::mutate(&mut child, history, settings, rng);
        self.add_genome(child, settings)
    }

    /// Mean cached fitness of a species' current members.
    fn average_fitness(&self, species_id: SpeciesId) -> f32 {
        let members = self.species_by_id(species_id).members();
        assert!(!members.is_empty(), "species {} has no members", species_id);
        let total: f32 = members
            .iter()
            .map(|&id| {
                self.genome(id)
                    .fitness()
                    .expect("species averages require evaluated members")
            })
            .sum();
        total / members.len() as f32
    }

    /// Id of the best-performing living genome, walking species in
    /// founding order and members in insertion order; the first
    /// maximum wins ties.
    fn champion_id(&self) -> Option<GenomeId> {
        let mut best: Option<(GenomeId, f32)> = None;
        for species in &self.species {
            for &member in species.members() {
                let fitness = self
                    .genome(member)
                    .fitness()
                    .expect("champion lookup requires evaluated members");
                match best {
                    Some((_, record)) if fitness <= record => {}
                    _ => best = Some((member, fitness)),
                }
            }
        }
        best.map(|(id, _)| id)
    }
}

impl Default for Population {
    fn default() -> Population {
        Population::new()
    }
}

/// First rank removed by elimination: a species of `size` ranked
/// members (best first) keeps ranks `0..start` and loses the rest.
fn elimination_start(size: usize, percentage: f32) -> usize {
    let removed = (size as f32 * percentage).ceil();
    (size as f32 - removed).floor() as usize + 1
}

/// Drives the generational replacement of a [`Population`].
pub struct PopulationManager {
    population: Population,
    population_size: usize,
    generation: usize,
    champion: Option<GenomeId>,
}

impl PopulationManager {
    /// Creates a manager with an empty population, at generation 1.
    pub fn new() -> PopulationManager {
        PopulationManager {
            population: Population::new(),
            population_size: 0,
            generation: 1,
            champion: None,
        }
    }

    /// Returns the current generation number. The initial
    /// population is generation 1.
    pub fn generation(&self) -> usize {
        self.generation
    }

    /// Returns the managed population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Returns the best genome of the last completed generation.
    pub fn champion(&self) -> Option<&Genome> {
        self.champion.map(|id| self.population.genome(id))
    }

    pub(crate) fn is_initialized(&self) -> bool {
        !self.population.genomes.is_empty()
    }

    /// Builds the first generation: one fully-connected template
    /// genome is created (issuing each connection's innovation
    /// number once), then cloned per member with every weight
    /// re-randomized. The whole population starts with a single
    /// topology and a shared set of innovation numbers.
    ///
    /// # Panics
    /// Panics if the population was already initialized.
    pub(crate) fn initialize(
        &mut self,
        input_count: NonZeroUsize,
        output_count: NonZeroUsize,
        population_size: NonZeroUsize,
        history: &mut History,
        settings: &Settings,
        rng: &mut EvolutionRng,
    ) {
        assert!(
            !self.is_initialized(),
            "initialize() may only be called once, for the first generation"
        );
        self.population_size = population_size.get();

        let inputs: Vec<NodeId> = (1..=input_count.get()).collect();
        let first_output = input_count.get() + 1;
        let outputs: Vec<NodeId> = (first_output..first_output + output_count.get()).collect();

        let range = settings.mutation_weight_random_range;
        let mut template = Genome::new(&inputs, &outputs);
        for &from in &inputs {
            for &to in &outputs {
                template.add_gene(&Gene::new(
                    history.next(),
                    from,
                    to,
                    rng.range(-range, range),
                    true,
                ));
            }
        }

        for _ in 0..self.population_size {
            let mut genome = template.breeding_clone();
            for gene in genome.genes_mut() {
                gene.set_weight(rng.range(-range, range));
            }
            self.population.add_genome(genome, settings);
        }
    }

    /// Replaces the current generation with the next one.
    ///
    /// Evaluates every member, culls the worst slice of each
    /// species, removes species that stagnated past the limit or
    /// earned no breeding allocation, then refills the population
    /// from the survivors' breeding pools by crossover or mutated
    /// cloning. Species left empty are dropped, survivors drift to
    /// a random representative, and the old generation is swept
    /// from the arena.
    ///
    /// # Panics
    /// Panics if the population was never initialized.
    pub(crate) fn new_generation<F: FitnessFunction>(
        &mut self,
        fitness: &mut F,
        activation: &dyn ActivationFunction,
        history: &mut History,
        settings: &Settings,
        rng: &mut EvolutionRng,
    ) -> Result<(), EvolutionError> {
        assert!(
            self.is_initialized(),
            "initialize() must be called before advancing a generation"
        );
        self.generation += 1;

        // Evaluate and rank every species' members, best first.
        // Ties keep their insertion order.
        let species_ids: Vec<SpeciesId> =
            self.population.species.iter().map(|s| s.id()).collect();
        let mut ranked: HashMap<SpeciesId, Vec<GenomeId>, RandomState> = HashMap::default();
        let mut old_generation: Vec<GenomeId> = Vec::new();
        for &species_id in &species_ids {
            let mut members = self.population.species_by_id(species_id).members().to_vec();
            for &member in &members {
                self.ensure_fitness(member, fitness, activation);
            }
            members.sort_by(|&a, &b| {
                let fitness_a = self.population.genome(a).fitness().expect("evaluated above");
                let fitness_b = self.population.genome(b).fitness().expect("evaluated above");
                fitness_b.partial_cmp(&fitness_a).expect("fitness is finite")
            });
            old_generation.extend_from_slice(&members);
            ranked.insert(species_id, members);
        }

        // Breeding allocations are proportional to each species'
        // share of this sum, which is taken before any elimination.
        let average_sum: f32 = species_ids
            .iter()
            .map(|&id| self.population.average_fitness(id))
            .sum();

        let mut doomed: Vec<SpeciesId> = Vec::new();
        for &species_id in &species_ids {
            let best = &ranked[&species_id];
            let start = elimination_start(best.len(), settings.generation_elimination_percentage);
            debug_assert!(start >= 1 && start <= best.len());
            for &culled in &best[start.min(best.len())..] {
                self.population.species_by_id_mut(species_id).remove_member(culled);
            }

            let species = self.population.species_by_id_mut(species_id);
            species.mark_failed_generation();
            if species.failed_generations() > STAGNATION_LIMIT {
                log::debug!(
                    "species {} went extinct after {} generations without improvement",
                    species_id,
                    STAGNATION_LIMIT
                );
                doomed.push(species_id);
                continue;
            }

            // The species' own average is taken after its
            // elimination, so only survivors count toward it.
            let average = self.population.average_fitness(species_id);
            let breeds_allowed =
                (average / average_sum * self.population_size as f32).floor() - 1.0;
            if breeds_allowed < 1.0 {
                log::debug!("species {} went extinct without a breeding allocation", species_id);
                doomed.push(species_id);
            }
        }
        self.population.species.retain(|s| !doomed.contains(&s.id()));

        log::info!(
            "building generation {}: {} species, {} members surviving",
            self.generation,
            self.population.species.len(),
            self.population.size()
        );
        if self.population.species.is_empty() {
            return Err(EvolutionError::AllSpeciesExtinct {
                generation: self.generation,
            });
        }

        // Snapshot each survivor's breeding pool and clear its
        // membership; parents stay in the arena until the sweep.
        let mut pools: HashMap<SpeciesId, Vec<GenomeId>, RandomState> = HashMap::default();
        for species in &mut self.population.species {
            pools.insert(species.id(), species.take_members());
        }

        let mut filled = 0;
        while filled < self.population_size {
            let index = rng.index(self.population.species.len());
            let species_id = self.population.species[index].id();
            // Species founded by a child speciating away mid-refill
            // have no pool and are skipped without using a slot.
            let pool = match pools.get(&species_id) {
                Some(pool) => pool,
                None => continue,
            };
            if rng.success(settings.breed_cross_chance) {
                let father = pool[rng.index(pool.len())];
                let mother = pool[rng.index(pool.len())];
                self.population
                    .cross_and_add(father, mother, history, settings, rng);
            } else {
                let source = pool[rng.index(pool.len())];
                let mut child = self.population.genome(source).breeding_clone();
                mutation::mutate(&mut child, history, settings, rng);
                self.population.insert_into_species(child, species_id);
            }
            filled += 1;
        }

        self.population.species.retain(|s| !s.members().is_empty());
        for index in 0..self.population.species.len() {
            let members = self.population.species[index].members();
            let representative = members[rng.index(members.len())];
            self.population.species[index].set_representative(representative);
        }

        // The old generation is no longer reachable from any
        // species list.
        for member in old_generation {
            self.population.genomes.remove(&member);
        }

        let new_members: Vec<GenomeId> = self
            .population
            .species
            .iter()
            .flat_map(|s| s.members().iter().copied())
            .collect();
        for member in new_members {
            self.ensure_fitness(member, fitness, activation);
        }
        self.champion = self.population.champion_id();
        if let Some(champion) = self.champion {
            let genome = self.population.genome(champion);
            log::info!(
                "generation {} champion: fitness {:.4} in species {}",
                self.generation,
                genome.fitness().expect("champion is evaluated"),
                genome.species().expect("champion has a species")
            );
            fitness.generation_finished(&Network::new(genome, activation));
        }
        Ok(())
    }

    /// Evaluates a member if it has no cached fitness, updating its
    /// species' record (and resetting its stagnation counter) on
    /// improvement.
    fn ensure_fitness<F: FitnessFunction>(
        &mut self,
        member: GenomeId,
        fitness: &mut F,
        activation: &dyn ActivationFunction,
    ) -> f32 {
        if let Some(value) = self.population.genome(member).fitness() {
            return value;
        }
        let value = fitness.fitness(&Network::new(self.population.genome(member), activation));
        let genome = self.population.genome_mut(member);
        genome.assign_fitness(value);
        let species_id = genome
            .species()
            .expect("members belong to a species before evaluation");
        let species = self.population.species_by_id_mut(species_id);
        if value > species.highest_fitness() {
            species.record_improvement(value);
        }
        value
    }
}

impl Default for PopulationManager {
    fn default() -> PopulationManager {
        PopulationManager::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_gene_genome(weight: f32) -> Genome {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, weight, true));
        genome
    }

    #[test]
    fn elimination_keeps_the_top_ranks() {
        // 10 members at 85%: ceil(8.5) = 9 removed, ranks 0 and 1
        // survive.
        assert_eq!(elimination_start(10, 0.85), 2);
        // A lone member survives its own species' elimination.
        assert_eq!(elimination_start(1, 0.85), 1);
        // Even at 100% the best member is kept.
        assert_eq!(elimination_start(10, 1.0), 1);
        assert_eq!(elimination_start(4, 0.5), 3);
    }

    #[test]
    fn compatible_genomes_share_a_species() {
        let settings = Settings::default();
        let mut population = Population::new();
        let a = population.add_genome(single_gene_genome(0.5), &settings);
        let b = population.add_genome(single_gene_genome(0.6), &settings);
        assert_eq!(population.all_species().count(), 1);
        assert_eq!(
            population.genome(a).species(),
            population.genome(b).species()
        );
    }

    #[test]
    fn incompatible_genomes_found_a_new_species() {
        let settings = Settings::default();
        let mut population = Population::new();
        // 0.4 * |10 - (-10)| = 8.0, far past the default threshold.
        let a = population.add_genome(single_gene_genome(10.0), &settings);
        let b = population.add_genome(single_gene_genome(-10.0), &settings);
        assert_eq!(population.all_species().count(), 2);
        assert_ne!(
            population.genome(a).species(),
            population.genome(b).species()
        );
        let ids: Vec<SpeciesId> = population.all_species().map(|s| s.id()).collect();
        assert_eq!(ids, vec![SpeciesId(0), SpeciesId(1)]);
    }

    #[test]
    fn champion_is_the_first_maximum() {
        let settings = Settings::default();
        let mut population = Population::new();
        let ids: Vec<GenomeId> = [1.0, 3.0, 3.0, 2.0]
            .iter()
            .map(|&f| {
                let id = population.add_genome(single_gene_genome(0.5), &settings);
                population.genome_mut(id).assign_fitness(f);
                id
            })
            .collect();
        assert_eq!(population.champion_id(), Some(ids[1]));
    }

    #[test]
    fn duplicate_topologies_are_renumbered_onto_the_incumbent() {
        let settings = Settings::default();
        let mut population = Population::new();
        let mut incumbent = Genome::new(&[1], &[2]);
        incumbent.add_gene(&Gene::new(0, 1, 3, 0.5, true));
        incumbent.add_gene(&Gene::new(1, 3, 2, 0.5, true));
        population.add_genome(incumbent, &settings);

        // Same topology rebuilt later under different ids.
        let mut rebuilt = Genome::new(&[1], &[2]);
        rebuilt.add_gene(&Gene::new(4, 1, 3, -0.25, true));
        rebuilt.add_gene(&Gene::new(7, 3, 2, 0.75, true));
        rebuilt.fix_duplicates(&population);

        let ids: Vec<_> = rebuilt.genes().map(|g| g.innovation()).collect();
        assert_eq!(ids, vec![0, 1]);
        // Weights and endpoints are untouched by renumbering.
        assert_eq!(rebuilt.gene(0).unwrap().weight(), -0.25);
        assert_eq!(rebuilt.gene(0).unwrap().endpoints(), (1, 3));
        assert_eq!(rebuilt.gene(1).unwrap().weight(), 0.75);
    }

    #[test]
    fn initialization_builds_a_single_species_of_shared_topology() {
        let settings = Settings::default();
        let mut history = History::new();
        let mut rng = EvolutionRng::seeded(1);
        let mut manager = PopulationManager::new();
        manager.initialize(
            NonZeroUsize::new(3).unwrap(),
            NonZeroUsize::new(2).unwrap(),
            NonZeroUsize::new(20).unwrap(),
            &mut history,
            &settings,
            &mut rng,
        );

        assert_eq!(manager.generation(), 1);
        assert_eq!(manager.population().size(), 20);
        // A shared topology with weights within one random range of
        // each other always lands inside the default threshold.
        assert_eq!(manager.population().all_species().count(), 1);
        // 3 inputs fully connected to 2 outputs.
        assert_eq!(history.issued(), 6);
        for species in manager.population().all_species() {
            for &member in species.members() {
                let genome = manager.population().genome(member);
                assert_eq!(genome.inputs(), &[1, 2, 3]);
                assert_eq!(genome.outputs(), &[4, 5]);
                assert_eq!(genome.gene_count(), 6);
                assert_eq!(genome.highest_innovation(), 5);
            }
        }
    }
}
