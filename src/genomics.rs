//! Genetic representation of networks.
//!
//! A [`Genome`] is a flat, ordered map of connection [`Gene`]s keyed
//! by innovation number. Nodes are implicit: the node set of a genome
//! is whatever its genes' endpoints mention, plus the declared input
//! and output nodes, which always exist. [`History`] is the shared
//! registry that keeps innovation numbers globally consistent within
//! a run.

mod genes;
mod history;
pub(crate) mod mutation;

pub use genes::Gene;
pub use history::History;

use crate::config::Settings;
use crate::populations::{Population, SpeciesId};
use crate::rng::EvolutionRng;
use crate::{Innovation, NodeId};

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A network blueprint: declared input/output nodes plus an ordered
/// map of connection genes.
///
/// A genome starts out mutable. The first fitness assignment freezes
/// it: from then on any structural write panics, so a cached fitness
/// can never describe a genome it was not measured on. Breeding works
/// on fresh copies obtained through [`breeding_clone`](Genome::breeding_clone),
/// which strips the fitness cache and the species assignment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Genome {
    genes: BTreeMap<Innovation, Gene>,
    input_nodes: Vec<NodeId>,
    output_nodes: Vec<NodeId>,
    species: Option<SpeciesId>,
    fitness: Option<f32>,
}

impl Genome {
    /// Creates a genome with the given input and output nodes
    /// and no genes.
    ///
    /// # Panics
    /// Panics if a node id is zero or declared twice.
    pub fn new(inputs: &[NodeId], outputs: &[NodeId]) -> Genome {
        let mut genome = Genome {
            genes: BTreeMap::new(),
            input_nodes: Vec::with_capacity(inputs.len()),
            output_nodes: Vec::with_capacity(outputs.len()),
            species: None,
            fitness: None,
        };
        for &node in inputs {
            genome.add_input_node(node);
        }
        for &node in outputs {
            genome.add_output_node(node);
        }
        genome
    }

    /// Declares an input node.
    ///
    /// # Panics
    /// Panics if the id is zero, already declared, or the genome
    /// is frozen.
    pub fn add_input_node(&mut self, node: NodeId) {
        self.assert_unfrozen("add_input_node");
        assert!(node > 0, "node ids must be positive");
        assert!(
            !self.input_nodes.contains(&node) && !self.output_nodes.contains(&node),
            "node {} is already declared",
            node
        );
        self.input_nodes.push(node);
    }

    /// Declares an output node.
    ///
    /// # Panics
    /// Panics if the id is zero, already declared, or the genome
    /// is frozen.
    pub fn add_output_node(&mut self, node: NodeId) {
        self.assert_unfrozen("add_output_node");
        assert!(node > 0, "node ids must be positive");
        assert!(
            !self.input_nodes.contains(&node) && !self.output_nodes.contains(&node),
            "node {} is already declared",
            node
        );
        self.output_nodes.push(node);
    }

    /// Inserts a copy of `gene` into the genome.
    ///
    /// # Panics
    /// Panics if the genome is frozen or already carries a gene
    /// with the same innovation number.
    pub fn add_gene(&mut self, gene: &Gene) {
        self.insert_gene(gene.clone());
    }

    /// Inserts a copy of `gene` inherited from a crossover of
    /// `parent1` and `parent2`.
    ///
    /// When both parents carry the gene's id and exactly one of the
    /// two copies is disabled, the child's copy is disabled with the
    /// configured chance, regardless of which copy was inherited.
    pub(crate) fn add_gene_inheriting(
        &mut self,
        gene: &Gene,
        parent1: &Genome,
        parent2: &Genome,
        settings: &Settings,
        rng: &mut EvolutionRng,
    ) {
        let mut inherited = gene.clone();
        let id = inherited.innovation();
        if let (Some(copy1), Some(copy2)) = (parent1.genes.get(&id), parent2.genes.get(&id)) {
            if copy1.enabled() != copy2.enabled() {
                inherited.set_enabled(!rng.success(settings.gene_disable_chance));
            }
        }
        self.insert_gene(inherited);
    }

    fn insert_gene(&mut self, gene: Gene) {
        self.assert_unfrozen("add_gene");
        assert!(
            !self.genes.contains_key(&gene.innovation()),
            "genome already carries a gene with innovation number {}",
            gene.innovation()
        );
        self.genes.insert(gene.innovation(), gene);
    }

    /// Iterates over all genes in increasing innovation order.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    pub(crate) fn genes_mut(&mut self) -> impl Iterator<Item = &mut Gene> {
        self.genes.values_mut()
    }

    /// Returns the gene with the given innovation number, if any.
    pub fn gene(&self, innovation: Innovation) -> Option<&Gene> {
        self.genes.get(&innovation)
    }

    pub(crate) fn gene_mut(&mut self, innovation: Innovation) -> Option<&mut Gene> {
        self.genes.get_mut(&innovation)
    }

    /// Returns the number of genes in the genome.
    pub fn gene_count(&self) -> usize {
        self.genes.len()
    }

    /// Returns the highest innovation number present in the genome.
    ///
    /// # Panics
    /// Panics if the genome has no genes. Every genome in a run is
    /// born fully connected, so an empty gene map is a programming
    /// error.
    pub fn highest_innovation(&self) -> Innovation {
        *self
            .genes
            .keys()
            .next_back()
            .expect("genes may not be empty")
    }

    /// Returns the declared input nodes, in declaration order.
    pub fn inputs(&self) -> &[NodeId] {
        &self.input_nodes
    }

    /// Returns the declared output nodes, in declaration order.
    pub fn outputs(&self) -> &[NodeId] {
        &self.output_nodes
    }

    pub(crate) fn is_input(&self, node: NodeId) -> bool {
        self.input_nodes.contains(&node)
    }

    pub(crate) fn is_output(&self, node: NodeId) -> bool {
        self.output_nodes.contains(&node)
    }

    pub(crate) fn is_hidden(&self, node: NodeId) -> bool {
        !self.is_input(node) && !self.is_output(node)
    }

    /// Returns every node the genome mentions, in increasing id
    /// order: the declared inputs and outputs plus every gene
    /// endpoint.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .input_nodes
            .iter()
            .chain(self.output_nodes.iter())
            .copied()
            .collect();
        for gene in self.genes.values() {
            nodes.push(gene.from());
            nodes.push(gene.to());
        }
        nodes.sort_unstable();
        nodes.dedup();
        nodes
    }

    /// Returns every hidden node, in increasing id order.
    pub fn hidden_nodes(&self) -> Vec<NodeId> {
        self.all_nodes()
            .into_iter()
            .filter(|&node| self.is_hidden(node))
            .collect()
    }

    /// Returns the highest node id the genome mentions.
    pub fn highest_node(&self) -> NodeId {
        *self.all_nodes().last().expect("genome has no nodes")
    }

    /// Returns all `(from, to)` pairs in increasing innovation
    /// order, disabled genes included.
    pub fn all_connections(&self) -> Vec<(NodeId, NodeId)> {
        self.genes.values().map(|g| g.endpoints()).collect()
    }

    /// Returns the endpoint pairs of all enabled genes.
    pub fn active_connections(&self) -> HashSet<(NodeId, NodeId), RandomState> {
        self.genes
            .values()
            .filter(|g| g.enabled())
            .map(|g| g.endpoints())
            .collect()
    }

    /// Returns the cached fitness, or `None` if the genome has not
    /// been evaluated yet.
    pub fn fitness(&self) -> Option<f32> {
        self.fitness
    }

    /// Caches the genome's fitness and freezes it.
    ///
    /// # Panics
    /// Panics if `value` is not finite or a fitness was assigned
    /// before.
    pub(crate) fn assign_fitness(&mut self, value: f32) {
        assert!(value.is_finite(), "fitness must be finite, got {}", value);
        assert!(
            self.fitness.is_none(),
            "fitness may only be assigned once"
        );
        self.fitness = Some(value);
    }

    /// Returns the species this genome belongs to, if it has been
    /// classified.
    pub fn species(&self) -> Option<SpeciesId> {
        self.species
    }

    pub(crate) fn set_species(&mut self, species: SpeciesId) {
        self.assert_unfrozen("set_species");
        assert!(
            self.species.is_none(),
            "species may only be assigned once"
        );
        self.species = Some(species);
    }

    fn assert_unfrozen(&self, operation: &str) {
        assert!(
            self.fitness.is_none(),
            "{}() on a frozen genome: its fitness has already been measured",
            operation
        );
    }

    /// Returns a deep copy suitable for breeding: genes and node
    /// declarations are copied, the fitness cache and the species
    /// assignment are reset.
    pub fn breeding_clone(&self) -> Genome {
        Genome {
            genes: self.genes.clone(),
            input_nodes: self.input_nodes.clone(),
            output_nodes: self.output_nodes.clone(),
            species: None,
            fitness: None,
        }
    }

    /// Computes the compatibility distance between two genomes:
    ///
    /// `d = c1 * E / N + c2 * D / N + c3 * W`
    ///
    /// where `E` counts excess genes, `D` disjoint genes, `W` is the
    /// mean absolute weight difference over matching genes (zero if
    /// none match), and `N` is the gene count of the longer genome.
    /// A one-sided innovation number within the shorter genome's
    /// range is disjoint; beyond it, excess.
    ///
    /// # Examples
    /// ```
    /// use neatwork::genomics::{Gene, Genome};
    /// use neatwork::Settings;
    ///
    /// let settings = Settings::default();
    /// let mut a = Genome::new(&[1, 2], &[3]);
    /// a.add_gene(&Gene::new(0, 1, 3, 1.0, true));
    /// let mut b = Genome::new(&[1, 2], &[3]);
    /// b.add_gene(&Gene::new(0, 1, 3, -1.0, true));
    /// b.add_gene(&Gene::new(1, 2, 3, 2.0, true));
    ///
    /// // One excess gene out of N = 2, plus 0.4 * |1 - (-1)|.
    /// let d = Genome::distance(&a, &b, &settings);
    /// assert!((d - 1.3).abs() < 1e-6);
    /// assert_eq!(d, Genome::distance(&b, &a, &settings));
    /// ```
    ///
    /// # Panics
    /// Panics if either genome has no genes.
    pub fn distance(a: &Genome, b: &Genome, settings: &Settings) -> f32 {
        // Ties on the highest id fall back to the gene count, so the
        // longest/shortest selection is order-independent and the
        // distance stays symmetric.
        let (longest, shortest) = if (a.highest_innovation(), a.genes.len())
            >= (b.highest_innovation(), b.genes.len())
        {
            (a, b)
        } else {
            (b, a)
        };
        let shortest_max = shortest.highest_innovation();

        let mut excess = 0.0_f32;
        let mut disjoint = 0.0_f32;
        let mut weight_difference = 0.0_f32;
        let mut matching = 0_usize;
        for id in 0..=longest.highest_innovation() {
            match (longest.genes.get(&id), shortest.genes.get(&id)) {
                (Some(long_gene), Some(short_gene)) => {
                    weight_difference += (long_gene.weight() - short_gene.weight()).abs();
                    matching += 1;
                }
                (Some(_), None) | (None, Some(_)) => {
                    if id <= shortest_max {
                        disjoint += 1.0;
                    } else {
                        excess += 1.0;
                    }
                }
                (None, None) => {}
            }
        }
        let average_weight_difference = if matching == 0 {
            0.0
        } else {
            weight_difference / matching as f32
        };

        let n = longest.genes.len() as f32;
        settings.distance_excess_weight * excess / n
            + settings.distance_disjoint_weight * disjoint / n
            + settings.distance_weights_weight * average_weight_difference
    }

    /// Crosses two genomes, walking the dominant parent's gene set.
    ///
    /// For every innovation number the dominant parent carries, the
    /// child inherits either parent's copy by fair coin when both
    /// carry it, or the dominant copy alone otherwise. Genes unique
    /// to the weaker parent are dropped. The child takes the
    /// dominant parent's input/output declarations and belongs to no
    /// species yet.
    ///
    /// # Panics
    /// Panics if the parents belong to different species or either
    /// has no genes.
    pub(crate) fn cross(
        dominant: &Genome,
        other: &Genome,
        settings: &Settings,
        rng: &mut EvolutionRng,
    ) -> Genome {
        assert_eq!(
            dominant.species, other.species,
            "genomes must share a species to be crossed"
        );
        assert!(
            !dominant.genes.is_empty() && !other.genes.is_empty(),
            "genes may not be empty"
        );
        let mut child = Genome::new(&dominant.input_nodes, &dominant.output_nodes);
        for id in 0..=dominant.highest_innovation() {
            let dominant_copy = match dominant.genes.get(&id) {
                Some(gene) => gene,
                None => continue,
            };
            let inherited = match other.genes.get(&id) {
                Some(other_copy) => {
                    if rng.index(2) == 0 {
                        dominant_copy
                    } else {
                        other_copy
                    }
                }
                None => dominant_copy,
            };
            child.add_gene_inheriting(inherited, dominant, other, settings, rng);
        }
        child
    }

    /// Renumbers this genome onto the innovation ids of an existing
    /// population member with the exact same ordered connection
    /// list, if one exists.
    ///
    /// Crossover and mutation can rebuild a topology that already
    /// evolved elsewhere under different ids; aligning the ids keeps
    /// the distance and crossover walks meaningful. Only current
    /// members are consulted. Weights and enabled flags are kept.
    pub(crate) fn fix_duplicates(&mut self, population: &Population) {
        self.assert_unfrozen("fix_duplicates");
        let own_connections = self.all_connections();
        for species in population.all_species() {
            for &member in species.members() {
                let other = population.genome(member);
                if other.all_connections() != own_connections {
                    continue;
                }
                let ids: Vec<Innovation> = other.genes.keys().copied().collect();
                let genes: Vec<Gene> = self.genes.values().cloned().collect();
                self.genes.clear();
                for (id, mut gene) in ids.into_iter().zip(genes) {
                    gene.set_innovation(id);
                    self.genes.insert(id, gene);
                }
                return;
            }
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, gene) in self.genes.values().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}", gene)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::populations::SpeciesId;

    fn paired(weight_a: f32, weight_b: f32) -> (Genome, Genome) {
        let mut a = Genome::new(&[1, 2], &[3]);
        a.add_gene(&Gene::new(0, 1, 3, weight_a, true));
        a.add_gene(&Gene::new(1, 2, 3, 0.5, true));
        let mut b = Genome::new(&[1, 2], &[3]);
        b.add_gene(&Gene::new(0, 1, 3, weight_b, true));
        b.add_gene(&Gene::new(1, 2, 3, 0.5, true));
        (a, b)
    }

    #[test]
    fn genes_iterate_in_innovation_order() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(7, 1, 2, 0.1, true));
        genome.add_gene(&Gene::new(2, 1, 3, 0.2, true));
        genome.add_gene(&Gene::new(5, 3, 2, 0.3, true));
        let ids: Vec<_> = genome.genes().map(|g| g.innovation()).collect();
        assert_eq!(ids, vec![2, 5, 7]);
        assert_eq!(genome.highest_innovation(), 7);
    }

    #[test]
    #[should_panic(expected = "innovation number")]
    fn duplicate_innovation_is_rejected() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, 0.1, true));
        genome.add_gene(&Gene::new(0, 1, 2, 0.9, true));
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn frozen_genome_rejects_structural_writes() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, 0.1, true));
        genome.assign_fitness(1.0);
        genome.add_gene(&Gene::new(1, 1, 3, 0.2, true));
    }

    #[test]
    #[should_panic(expected = "frozen")]
    fn frozen_genome_rejects_species_assignment() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, 0.1, true));
        genome.assign_fitness(1.0);
        genome.set_species(SpeciesId(0));
    }

    #[test]
    #[should_panic(expected = "finite")]
    fn non_finite_fitness_is_rejected() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, 0.1, true));
        genome.assign_fitness(f32::NAN);
    }

    #[test]
    fn breeding_clone_resets_cache_and_species() {
        let mut genome = Genome::new(&[1], &[2]);
        genome.add_gene(&Gene::new(0, 1, 2, 0.1, true));
        genome.set_species(SpeciesId(3));
        genome.assign_fitness(2.0);
        let copy = genome.breeding_clone();
        assert_eq!(copy.fitness(), None);
        assert_eq!(copy.species(), None);
        assert_eq!(copy.gene_count(), 1);
        // The copy is structurally independent and thaws.
        let mut copy = copy;
        copy.add_gene(&Gene::new(1, 1, 3, 0.2, true));
        assert_eq!(genome.gene_count(), 1);
    }

    #[test]
    fn nodes_are_implicit_in_gene_endpoints() {
        let mut genome = Genome::new(&[1, 2], &[3]);
        genome.add_gene(&Gene::new(0, 1, 4, 0.1, true));
        genome.add_gene(&Gene::new(1, 4, 3, 0.2, true));
        assert_eq!(genome.all_nodes(), vec![1, 2, 3, 4]);
        assert_eq!(genome.hidden_nodes(), vec![4]);
        assert_eq!(genome.highest_node(), 4);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let settings = Settings::default();
        let (a, b) = paired(1.0, -0.5);
        assert_eq!(Genome::distance(&a, &a, &settings), 0.0);
        assert_eq!(
            Genome::distance(&a, &b, &settings),
            Genome::distance(&b, &a, &settings)
        );
    }

    #[test]
    fn distance_is_symmetric_on_equal_highest_innovation() {
        // Same highest id, different gene counts: the tie must not
        // make N depend on argument order.
        let settings = Settings::default();
        let mut a = Genome::new(&[1, 2], &[3]);
        a.add_gene(&Gene::new(0, 1, 3, 0.5, true));
        a.add_gene(&Gene::new(5, 2, 3, 0.5, true));
        let mut b = Genome::new(&[1, 2], &[3]);
        b.add_gene(&Gene::new(0, 1, 3, 0.5, true));
        b.add_gene(&Gene::new(1, 2, 3, 0.5, true));
        b.add_gene(&Gene::new(5, 2, 3, 0.5, true));

        let ab = Genome::distance(&a, &b, &settings);
        let ba = Genome::distance(&b, &a, &settings);
        assert_eq!(ab, ba);
        // One disjoint gene (id 1) over N = 3 genes, no weight term.
        assert!((ab - settings.distance_disjoint_weight / 3.0).abs() < 1e-6);
    }

    #[test]
    fn distance_with_no_matching_genes_has_no_weight_term() {
        let settings = Settings::default();
        let mut a = Genome::new(&[1], &[2]);
        a.add_gene(&Gene::new(0, 1, 2, 100.0, true));
        let mut b = Genome::new(&[1], &[2]);
        b.add_gene(&Gene::new(1, 1, 2, -100.0, true));
        // One disjoint (id 0, within b's range) and one excess
        // (id 1, beyond a's range), N = 1, no weight term.
        let d = Genome::distance(&a, &b, &settings);
        let expected =
            settings.distance_excess_weight + settings.distance_disjoint_weight;
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn crossover_takes_ids_from_the_dominant_parent_only() {
        let settings = Settings::default();
        let mut rng = EvolutionRng::seeded(11);

        let mut dominant = Genome::new(&[1, 2], &[3]);
        dominant.add_gene(&Gene::new(0, 1, 3, 0.25, true));
        dominant.add_gene(&Gene::new(1, 2, 3, 0.75, true));
        dominant.set_species(SpeciesId(0));

        let mut weaker = Genome::new(&[1, 2], &[3]);
        weaker.add_gene(&Gene::new(0, 1, 3, -0.25, true));
        weaker.add_gene(&Gene::new(2, 2, 4, 0.5, true));
        weaker.set_species(SpeciesId(0));

        let child = Genome::cross(&dominant, &weaker, &settings, &mut rng);

        let ids: Vec<_> = child.genes().map(|g| g.innovation()).collect();
        assert_eq!(ids, vec![0, 1]);
        // Shared id 0 carries one parent's weight verbatim, never a blend.
        let w = child.gene(0).unwrap().weight();
        assert!(w == 0.25 || w == -0.25);
        // Id 1 is unique to the dominant parent and copied as-is.
        assert_eq!(child.gene(1).unwrap().weight(), 0.75);
        // Id 2 is unique to the weaker parent and dropped.
        assert!(child.gene(2).is_none());
        assert_eq!(child.species(), None);
    }

    #[test]
    fn crossover_is_asymmetric_in_the_dominant_parent() {
        let settings = Settings::default();
        let mut rng = EvolutionRng::seeded(11);

        let mut a = Genome::new(&[1, 2], &[3]);
        a.add_gene(&Gene::new(0, 1, 3, 0.25, true));
        a.set_species(SpeciesId(0));

        let mut b = Genome::new(&[1, 2], &[3]);
        b.add_gene(&Gene::new(0, 1, 3, -0.25, true));
        b.add_gene(&Gene::new(1, 2, 3, 0.5, true));
        b.set_species(SpeciesId(0));

        let child_of_a = Genome::cross(&a, &b, &settings, &mut rng);
        let child_of_b = Genome::cross(&b, &a, &settings, &mut rng);
        assert_eq!(child_of_a.gene_count(), 1);
        assert_eq!(child_of_b.gene_count(), 2);
    }

    #[test]
    fn genome_serializes_with_full_gene_map() {
        let (genome, _) = paired(1.0, 1.0);
        let json = serde_json::to_string(&genome).unwrap();
        let restored: Genome = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.gene_count(), genome.gene_count());
        assert_eq!(
            restored.all_connections(),
            genome.all_connections()
        );
        assert_eq!(restored.inputs(), genome.inputs());
    }
}
