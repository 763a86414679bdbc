//! Phenotype evaluation.
//!
//! A [`Network`] is a cheap, borrowed view of a genome that can be
//! fed input vectors. No separate phenotype structure is built; the
//! genome's enabled genes are the network.

use crate::genomics::Genome;
use crate::strategies::ActivationFunction;
use crate::NodeId;

use ahash::RandomState;

use std::collections::HashMap;

/// A feed-forward view of a genome.
///
/// Output values are resolved by backward recursion: the value of a
/// node is the activation of the weighted sum of its enabled
/// incoming connections. Node values are memoized per call, so
/// shared substructure is evaluated once. Genomes are kept acyclic
/// by construction, which is what makes the recursion well-founded.
///
/// # Examples
/// ```
/// use neatwork::genomics::{Gene, Genome};
/// use neatwork::networks::Network;
///
/// let mut genome = Genome::new(&[1, 2], &[3]);
/// genome.add_gene(&Gene::new(0, 1, 3, 2.0, true));
/// genome.add_gene(&Gene::new(1, 2, 3, 0.5, true));
///
/// let identity = |x: f32| x;
/// let network = Network::new(&genome, &identity);
/// assert_eq!(network.calculate(&[1.0, 2.0]), vec![3.0]);
/// ```
pub struct Network<'a> {
    genome: &'a Genome,
    activation: &'a dyn ActivationFunction,
}

impl<'a> Network<'a> {
    /// Creates a view of `genome` evaluated under `activation`.
    pub fn new(genome: &'a Genome, activation: &'a dyn ActivationFunction) -> Network<'a> {
        Network { genome, activation }
    }

    /// Returns the underlying genome.
    pub fn genome(&self) -> &Genome {
        self.genome
    }

    /// Feeds `input` through the network and returns one value per
    /// declared output node, in declaration order.
    ///
    /// The i-th input value is bound to the i-th declared input
    /// node.
    ///
    /// # Panics
    /// Panics if `input` does not have exactly one value per
    /// declared input node.
    pub fn calculate(&self, input: &[f32]) -> Vec<f32> {
        assert_eq!(
            input.len(),
            self.genome.inputs().len(),
            "expected {} input values, got {}",
            self.genome.inputs().len(),
            input.len()
        );
        let mut memo: HashMap<NodeId, f32, RandomState> = HashMap::default();
        self.genome
            .outputs()
            .iter()
            .map(|&output| self.resolve(output, input, &mut memo))
            .collect()
    }

    fn resolve(
        &self,
        node: NodeId,
        input: &[f32],
        memo: &mut HashMap<NodeId, f32, RandomState>,
    ) -> f32 {
        if let Some(position) = self.genome.inputs().iter().position(|&n| n == node) {
            return input[position];
        }
        if let Some(&value) = memo.get(&node) {
            return value;
        }
        let mut sum = 0.0;
        for gene in self.genome.genes() {
            if gene.enabled() && gene.to() == node {
                sum += gene.weight() * self.resolve(gene.from(), input, memo);
            }
        }
        let value = self.activation.apply(sum);
        memo.insert(node, value);
        value
    }
}
