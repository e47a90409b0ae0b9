use crate::reference::Reference;
use serde::{Deserialize, Serialize};

/// How much one interval claims of another.
///
/// This is the coarse classification used to place nodes in the tree: a
/// parent must [`CONTAIN`][Dominance::CONTAIN] its children, siblings must
/// be pairwise [`NONE`][Dominance::NONE], and [`SHARE`][Dominance::SHARE]
/// marks an illegal overlap.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum Dominance {
    /// The intervals are identical.
    EXACT,
    /// The second interval contains the first.
    CONTAIN,
    /// The second interval is a part of the first.
    PART,
    /// The intervals overlap without containment.
    SHARE,
    /// The intervals are disjoint.
    NONE,
}

impl Dominance {
    /// Classify the interval `[i, j)` against the interval `[s, e)`.
    pub fn compute(i: usize, j: usize, s: usize, e: usize) -> Self {
        Relation::compute(i, j, s, e).dominance()
    }

    /// Classify the first Reference against the second.
    #[inline]
    pub fn of(reference: Reference, other: Reference) -> Self {
        Self::compute(reference.position, reference.end(), other.position, other.end())
    }

    /// Return the Dominance of the second interval against the first.
    pub fn opposite(&self) -> Self {
        match self {
            Dominance::EXACT => Dominance::EXACT,
            Dominance::CONTAIN => Dominance::PART,
            Dominance::PART => Dominance::CONTAIN,
            Dominance::SHARE => Dominance::SHARE,
            Dominance::NONE => Dominance::NONE,
        }
    }
}

/// The fine-grained classification of one interval against another.
///
/// Where [`Dominance`] answers "may these nest", Relation also answers
/// "in which direction", which the tree uses to keep siblings in document
/// order.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
pub enum Relation {
    /// The intervals are identical.
    SAME,
    /// The second interval strictly contains the first.
    CONTAINER,
    /// The first interval strictly contains the second.
    FRAGMENT,
    /// The intervals start together and the second extends further.
    AHEAD,
    /// The intervals start together and the first extends further.
    START,
    /// The intervals end together and the second starts earlier.
    BEHIND,
    /// The intervals end together and the first starts earlier.
    END,
    /// The intervals overlap and the first starts earlier.
    OVERFLOW,
    /// The intervals overlap and the second starts earlier.
    UNDERFLOW,
    /// The second interval starts exactly where the first ends.
    NEXT,
    /// The second interval ends exactly where the first starts.
    PREVIOUS,
    /// The second interval is strictly after the first.
    AFTER,
    /// The second interval is strictly before the first.
    BEFORE,
}

impl Relation {
    /// Classify the interval `[i, j)` against the interval `[s, e)`.
    ///
    /// Intervals are well formed by construction (`i <= j`, `s <= e`),
    /// since every Reference is built from a position and a length.
    pub fn compute(i: usize, j: usize, s: usize, e: usize) -> Self {
        if j == s {
            Relation::NEXT
        } else if i == e {
            Relation::PREVIOUS
        } else if j < s {
            Relation::AFTER
        } else if e < i {
            Relation::BEFORE
        } else if s < i && j < e {
            Relation::CONTAINER
        } else if i == s && j < e {
            Relation::AHEAD
        } else if s < i && j == e {
            Relation::BEHIND
        } else if i == s && j == e {
            Relation::SAME
        } else if i < s && e < j {
            Relation::FRAGMENT
        } else if i == s {
            Relation::START
        } else if i < s && j == e {
            Relation::END
        } else if i < s {
            Relation::OVERFLOW
        } else {
            Relation::UNDERFLOW
        }
    }

    /// Classify the first Reference against the second.
    #[inline]
    pub fn of(reference: Reference, other: Reference) -> Self {
        Self::compute(reference.position, reference.end(), other.position, other.end())
    }

    /// Return the Relation of the second interval against the first.
    pub fn opposite(&self) -> Self {
        match self {
            Relation::SAME => Relation::SAME,
            Relation::CONTAINER => Relation::FRAGMENT,
            Relation::FRAGMENT => Relation::CONTAINER,
            Relation::AHEAD => Relation::START,
            Relation::START => Relation::AHEAD,
            Relation::BEHIND => Relation::END,
            Relation::END => Relation::BEHIND,
            Relation::OVERFLOW => Relation::UNDERFLOW,
            Relation::UNDERFLOW => Relation::OVERFLOW,
            Relation::NEXT => Relation::PREVIOUS,
            Relation::PREVIOUS => Relation::NEXT,
            Relation::AFTER => Relation::BEFORE,
            Relation::BEFORE => Relation::AFTER,
        }
    }

    /// Return the Dominance this Relation collapses to.
    pub fn dominance(&self) -> Dominance {
        match self {
            Relation::SAME => Dominance::EXACT,
            Relation::CONTAINER => Dominance::CONTAIN,
            Relation::AHEAD => Dominance::CONTAIN,
            Relation::BEHIND => Dominance::CONTAIN,
            Relation::FRAGMENT => Dominance::PART,
            Relation::START => Dominance::PART,
            Relation::END => Dominance::PART,
            Relation::OVERFLOW => Dominance::SHARE,
            Relation::UNDERFLOW => Dominance::SHARE,
            Relation::NEXT => Dominance::NONE,
            Relation::PREVIOUS => Dominance::NONE,
            Relation::AFTER => Dominance::NONE,
            Relation::BEFORE => Dominance::NONE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Dominance, Relation};

    #[test]
    fn test_compute_table() {
        assert_eq!(Relation::compute(0, 3, 3, 6), Relation::NEXT);
        assert_eq!(Relation::compute(3, 6, 0, 3), Relation::PREVIOUS);
        assert_eq!(Relation::compute(0, 2, 4, 6), Relation::AFTER);
        assert_eq!(Relation::compute(4, 6, 0, 2), Relation::BEFORE);
        assert_eq!(Relation::compute(2, 4, 0, 6), Relation::CONTAINER);
        assert_eq!(Relation::compute(0, 4, 0, 6), Relation::AHEAD);
        assert_eq!(Relation::compute(2, 6, 0, 6), Relation::BEHIND);
        assert_eq!(Relation::compute(0, 6, 0, 6), Relation::SAME);
        assert_eq!(Relation::compute(0, 6, 2, 4), Relation::FRAGMENT);
        assert_eq!(Relation::compute(0, 6, 0, 4), Relation::START);
        assert_eq!(Relation::compute(0, 6, 2, 6), Relation::END);
        assert_eq!(Relation::compute(0, 4, 2, 6), Relation::OVERFLOW);
        assert_eq!(Relation::compute(2, 6, 0, 4), Relation::UNDERFLOW);
    }

    #[test]
    fn test_opposite_symmetry() {
        // Every pair of intervals over a small grid must agree with its
        // mirror image through opposite().
        let bounds = 0..6usize;
        for i in bounds.clone() {
            for j in i..6 {
                for s in bounds.clone() {
                    for e in s..6 {
                        let forward = Relation::compute(i, j, s, e);
                        let backward = Relation::compute(s, e, i, j);
                        assert_eq!(forward.opposite(), backward, "({i},{j}) vs ({s},{e})");
                        assert_eq!(
                            forward.dominance().opposite(),
                            backward.dominance(),
                            "({i},{j}) vs ({s},{e})"
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_dominance_exact_and_none() {
        for i in 0..5usize {
            for j in i..5 {
                for s in 0..5usize {
                    for e in s..5 {
                        let dominance = Dominance::compute(i, j, s, e);
                        assert_eq!(dominance == Dominance::EXACT, i == s && j == e);
                        assert_eq!(
                            dominance == Dominance::NONE,
                            j == s || i == e || j < s || e < i
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_opposite_involution() {
        let relations = [
            Relation::SAME,
            Relation::CONTAINER,
            Relation::FRAGMENT,
            Relation::AHEAD,
            Relation::START,
            Relation::BEHIND,
            Relation::END,
            Relation::OVERFLOW,
            Relation::UNDERFLOW,
            Relation::NEXT,
            Relation::PREVIOUS,
            Relation::AFTER,
            Relation::BEFORE,
        ];
        for relation in relations {
            assert_eq!(relation.opposite().opposite(), relation);
        }
    }
}
