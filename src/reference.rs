use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::Range,
};

/// A half-open interval `[position, position + length)` within some document.
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
pub struct Reference {
    /// The beginning of the interval, inclusive.
    pub position: usize,
    /// The number of characters in the interval.
    pub length: usize,
}

impl Reference {
    /// Create a new Reference from the given position and length.
    #[inline]
    pub fn new(position: usize, length: usize) -> Self {
        Self { position, length }
    }

    /// The end of the interval, exclusive.
    #[inline]
    pub fn end(&self) -> usize {
        self.position + self.length
    }

    /// Return true when the interval covers no characters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Return a Reference spanning from the beginning of this interval to
    /// the end of the other.
    pub fn combine(&self, other: Reference) -> Self {
        let position = self.position.min(other.position);
        let end = self.end().max(other.end());

        Self {
            position,
            length: end - position,
        }
    }

    /// Return the literal text of this interval within the given source.
    #[inline]
    pub fn literal<'source>(&self, source: &'source str) -> &'source str {
        &source[self.position..self.end()]
    }
}

impl From<Range<usize>> for Reference {
    fn from(value: Range<usize>) -> Self {
        Self {
            position: value.start,
            length: value.end - value.start,
        }
    }
}

impl From<Reference> for Range<usize> {
    fn from(value: Reference) -> Self {
        value.position..value.end()
    }
}

impl Display for Reference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "[{}, {})", self.position, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::Reference;

    #[test]
    fn test_range_round_trip() {
        let reference = Reference::from(3..9);

        assert_eq!(reference.position, 3);
        assert_eq!(reference.length, 6);
        assert_eq!(reference.end(), 9);
    }

    #[test]
    fn test_combine() {
        let left = Reference::from(2..5);
        let right = Reference::from(8..11);

        assert_eq!(left.combine(right), Reference::from(2..11));
        assert_eq!(right.combine(left), Reference::from(2..11));
    }

    #[test]
    fn test_literal() {
        let source = "hello there";

        assert_eq!(Reference::from(6..11).literal(source), "there");
    }
}
