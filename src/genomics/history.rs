use crate::Innovation;

use serde::{Deserialize, Serialize};

/// The registry of all innovation numbers issued during a
/// training run.
///
/// Innovation numbers are issued consecutively from zero, so an id
/// doubles as its own ordinal: "the i-th structural innovation" is a
/// stable coordinate for the whole run. One `History` belongs to one
/// run; tests construct a fresh one.
///
/// # Examples
/// ```
/// use neatwork::genomics::History;
///
/// let mut history = History::new();
/// assert_eq!(history.next(), 0);
/// assert_eq!(history.next(), 1);
/// // Asking for an id extends the registry up to it.
/// assert_eq!(history.get(4), 4);
/// assert_eq!(history.issued(), 5);
/// assert_eq!(history.next(), 5);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    issued: usize,
}

impl History {
    /// Creates an empty registry.
    pub fn new() -> History {
        History { issued: 0 }
    }

    /// Issues the next innovation number.
    pub fn next(&mut self) -> Innovation {
        let id = self.issued;
        self.issued += 1;
        id
    }

    /// Returns the innovation number at `index`, issuing new
    /// numbers until it exists.
    pub fn get(&mut self, index: usize) -> Innovation {
        while self.issued <= index {
            self.next();
        }
        index
    }

    /// Returns how many innovation numbers have been issued so far.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_consecutive_from_zero() {
        let mut history = History::new();
        for expected in 0..10 {
            assert_eq!(history.next(), expected);
        }
    }

    #[test]
    fn get_extends_without_renumbering() {
        let mut history = History::new();
        let a = history.next();
        let b = history.get(3);
        assert_eq!((a, b), (0, 3));
        // Earlier ids are untouched by the extension.
        assert_eq!(history.get(0), 0);
        assert_eq!(history.get(3), 3);
        assert_eq!(history.issued(), 4);
        assert_eq!(history.next(), 4);
    }
}
