use super::GenomeId;

use serde::{Deserialize, Serialize};

use std::fmt;

/// Identifier of a species. Never reused within a run.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SpeciesId(pub(crate) usize);

impl fmt::Display for SpeciesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reproductively isolated group of genomes.
///
/// Membership is an ordered list of arena ids; the representative is
/// the member against which compatibility is measured, re-drawn at
/// random every generation so the species can drift. A species also
/// tracks the best fitness any member ever reached and how many
/// generations have passed since that record improved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Species {
    id: SpeciesId,
    members: Vec<GenomeId>,
    representative: GenomeId,
    highest_fitness: f32,
    failed_generations: usize,
}

impl Species {
    /// Founds a species around its first member.
    pub(crate) fn new(id: SpeciesId, representative: GenomeId) -> Species {
        Species {
            id,
            members: vec![representative],
            representative,
            highest_fitness: 0.0,
            failed_generations: 0,
        }
    }

    /// Returns the species' id.
    pub fn id(&self) -> SpeciesId {
        self.id
    }

    /// Returns the current members, in insertion order.
    pub fn members(&self) -> &[GenomeId] {
        &self.members
    }

    /// Returns the member new genomes are compared against.
    pub fn representative(&self) -> GenomeId {
        self.representative
    }

    /// Returns the best fitness any member ever reached.
    pub fn highest_fitness(&self) -> f32 {
        self.highest_fitness
    }

    /// Returns how many consecutive generations have passed without
    /// the record improving.
    pub fn failed_generations(&self) -> usize {
        self.failed_generations
    }

    pub(crate) fn add_member(&mut self, member: GenomeId) {
        self.members.push(member);
    }

    pub(crate) fn remove_member(&mut self, member: GenomeId) {
        if let Some(position) = self.members.iter().position(|&m| m == member) {
            self.members.remove(position);
        }
    }

    /// Empties the member list and returns it, preserving order.
    pub(crate) fn take_members(&mut self) -> Vec<GenomeId> {
        std::mem::take(&mut self.members)
    }

    pub(crate) fn set_representative(&mut self, member: GenomeId) {
        self.representative = member;
    }

    /// Records a new fitness record and resets the stagnation
    /// counter.
    pub(crate) fn record_improvement(&mut self, fitness: f32) {
        self.highest_fitness = fitness;
        self.failed_generations = 0;
    }

    pub(crate) fn mark_failed_generation(&mut self) {
        self.failed_generations += 1;
    }
}
