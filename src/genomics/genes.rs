use crate::{Innovation, NodeId};

use serde::{Deserialize, Serialize};

use std::fmt;

/// A single weighted connection between two nodes.
///
/// Genes are identified by their innovation number, which is the
/// global coordinate crossover and distance use to line genomes up.
/// A disabled gene stays in the genome and keeps competing during
/// crossover, it just contributes nothing to network evaluation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gene {
    innovation: Innovation,
    from: NodeId,
    to: NodeId,
    weight: f32,
    enabled: bool,
}

impl Gene {
    /// Creates a new gene.
    ///
    /// # Examples
    /// ```
    /// use neatwork::genomics::Gene;
    ///
    /// let gene = Gene::new(0, 1, 3, 0.5, true);
    /// assert_eq!(gene.innovation(), 0);
    /// assert_eq!(gene.endpoints(), (1, 3));
    /// ```
    pub fn new(innovation: Innovation, from: NodeId, to: NodeId, weight: f32, enabled: bool) -> Gene {
        Gene {
            innovation,
            from,
            to,
            weight,
            enabled,
        }
    }

    /// Returns the gene's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.innovation
    }

    /// Rewrites the gene's innovation number.
    ///
    /// Only used when a genome is renumbered onto an equivalent
    /// topology that evolved earlier; the owning map must be
    /// re-keyed by the caller.
    pub(crate) fn set_innovation(&mut self, innovation: Innovation) {
        self.innovation = innovation;
    }

    /// Returns the id of the node this connection leaves.
    pub fn from(&self) -> NodeId {
        self.from
    }

    /// Returns the id of the node this connection enters.
    pub fn to(&self) -> NodeId {
        self.to
    }

    /// Returns both endpoints as a `(from, to)` pair.
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.from, self.to)
    }

    /// Returns the connection weight.
    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f32) {
        self.weight = weight;
    }

    /// Returns whether the connection takes part in
    /// network evaluation.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(
                f,
                "{}[{}->{}, {:.3}]",
                self.innovation, self.from, self.to, self.weight
            )
        } else {
            write!(
                f,
                "({}[{}->{}, {:.3}])",
                self.innovation, self.from, self.to, self.weight
            )
        }
    }
}
