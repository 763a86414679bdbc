//! The three mutation operators.
//!
//! Every new genome passes through [`mutate`] exactly once. Each
//! operator rolls its own gate, so a single genome can receive any
//! combination of add-node, add-connection and weight mutations.

use super::{Gene, Genome, History};
use crate::config::Settings;
use crate::rng::EvolutionRng;
use crate::NodeId;

/// Upper bound on candidate draws for an add-connection mutation
/// before it is abandoned for this genome.
const ADD_CONNECTION_ATTEMPTS: usize = 40;

/// Applies the mutation pipeline to a freshly bred genome.
pub(crate) fn mutate(
    genome: &mut Genome,
    history: &mut History,
    settings: &Settings,
    rng: &mut EvolutionRng,
) {
    if rng.success(settings.mutation_new_node_chance) {
        add_node(genome, history, rng);
    }
    if rng.success(settings.mutation_new_connection_chance) {
        // A genome that has no room for another edge is left as-is.
        add_connection(genome, history, settings, rng);
    }
    if rng.success(settings.mutation_weight_chance) {
        mutate_weights(genome, settings, rng);
    }
}

/// Splits a random existing gene: the old gene is disabled and
/// replaced by two genes routed through a fresh hidden node. The
/// incoming half gets weight 1, the outgoing half inherits the old
/// weight, so the network's function is (nearly) preserved.
pub(crate) fn add_node(genome: &mut Genome, history: &mut History, rng: &mut EvolutionRng) {
    let index = rng.index(genome.gene_count());
    let (id, from, to, weight) = {
        let gene = genome.genes().nth(index).expect("index is in range");
        (gene.innovation(), gene.from(), gene.to(), gene.weight())
    };
    genome
        .gene_mut(id)
        .expect("gene was just looked up")
        .set_enabled(false);

    let new_node = genome.highest_node() + 1;
    genome.add_gene(&Gene::new(history.next(), from, new_node, 1.0, true));
    genome.add_gene(&Gene::new(history.next(), new_node, to, weight, true));
}

/// Tries to connect two previously unconnected nodes with a new
/// gene, forward-only. Candidate pairs are drawn at random; a pair
/// is rejected if it is a self-loop, duplicates an existing
/// connection (disabled ones included), or would close a cycle.
/// Gives up after a bounded number of attempts, returning `false`.
pub(crate) fn add_connection(
    genome: &mut Genome,
    history: &mut History,
    settings: &Settings,
    rng: &mut EvolutionRng,
) -> bool {
    let existing = genome.all_connections();
    let all_nodes = genome.all_nodes();
    let sources: Vec<NodeId> = all_nodes
        .iter()
        .copied()
        .filter(|&n| !genome.is_output(n))
        .collect();

    for _ in 0..ADD_CONNECTION_ATTEMPTS {
        let from = *rng.pick(&sources);
        let targets: Vec<NodeId> = all_nodes
            .iter()
            .copied()
            .filter(|&n| !genome.is_input(n) && n != from)
            .collect();
        if targets.is_empty() {
            continue;
        }
        let to = *rng.pick(&targets);
        if existing.contains(&(from, to)) {
            continue;
        }
        if creates_cycle(genome, (from, to), history) {
            continue;
        }
        let range = settings.mutation_weight_random_range;
        genome.add_gene(&Gene::new(
            history.next(),
            from,
            to,
            rng.range(-range, range),
            true,
        ));
        return true;
    }
    false
}

/// Mutates the genome's weights: with the configured chance every
/// weight is reassigned uniformly within the random range, otherwise
/// every weight is perturbed by a uniform disturbance.
pub(crate) fn mutate_weights(genome: &mut Genome, settings: &Settings, rng: &mut EvolutionRng) {
    if rng.success(settings.mutation_weight_random_chance) {
        let range = settings.mutation_weight_random_range;
        for gene in genome.genes_mut() {
            gene.set_weight(rng.range(-range, range));
        }
    } else {
        let disturbance = settings.mutation_weight_max_disturbance;
        for gene in genome.genes_mut() {
            let weight = gene.weight() + rng.range(-disturbance, disturbance);
            gene.set_weight(weight);
        }
    }
}

/// Checks whether adding `candidate` would make the network cyclic.
///
/// A probe copy of the genome receives the candidate edge under the
/// next free innovation number (the registry extends to cover it),
/// then every hidden node is walked backward over all gene edges. A
/// node is only rejected when it reappears on its own current path;
/// visited nodes are popped on backtrack, so diamonds do not count
/// as cycles.
pub(crate) fn creates_cycle(
    genome: &Genome,
    candidate: (NodeId, NodeId),
    history: &mut History,
) -> bool {
    let mut probe = genome.breeding_clone();
    let probe_id = history.get(probe.highest_innovation() + 1);
    probe.add_gene(&Gene::new(probe_id, candidate.0, candidate.1, 0.0, true));

    let mut path = Vec::new();
    probe
        .hidden_nodes()
        .into_iter()
        .any(|node| on_own_path(&probe, node, &mut path))
}

fn on_own_path(genome: &Genome, node: NodeId, path: &mut Vec<NodeId>) -> bool {
    if path.contains(&node) {
        return true;
    }
    path.push(node);
    let cyclic = genome
        .genes()
        .filter(|gene| gene.to() == node)
        .map(|gene| gene.from())
        .collect::<Vec<_>>()
        .into_iter()
        .any(|from| !genome.is_input(from) && on_own_path(genome, from, path));
    path.pop();
    cyclic
}
