pub mod enclosure;
pub mod pattern;

pub use enclosure::EnclosureParser;
pub use pattern::PatternParser;

use crate::{
    environment::Compilation,
    log::Error,
    tree::{Proto, TreeId},
};

/// Describes a type that can extract new sub-trees from a compilation.
///
/// A parser never mutates the tree itself: it returns the protos it found
/// together with the trees they were found in, and the driver commits
/// them through [`Forest::offer`][crate::Forest::offer].
pub trait Parser {
    /// Parse the given tree, returning the protos to offer.
    fn parse(&self, compilation: &Compilation, tree: TreeId) -> Result<Vec<(TreeId, Proto)>, Error>;
}

impl<F> Parser for F
where
    F: Fn(&Compilation, TreeId) -> Result<Vec<(TreeId, Proto)>, Error>,
{
    fn parse(&self, compilation: &Compilation, tree: TreeId) -> Result<Vec<(TreeId, Proto)>, Error> {
        self(compilation, tree)
    }
}

/// A driver that applies the inner parser to the given tree and every
/// descendant of it.
pub struct HierarchyParser {
    inner: Box<dyn Parser>,
}

/// Apply the given parser to every tree in the hierarchy.
pub fn hierarchy(inner: impl Parser + 'static) -> HierarchyParser {
    HierarchyParser {
        inner: Box::new(inner),
    }
}

impl Parser for HierarchyParser {
    fn parse(&self, compilation: &Compilation, tree: TreeId) -> Result<Vec<(TreeId, Proto)>, Error> {
        let mut buffer = Vec::new();
        for node in compilation.forest().collect(tree) {
            buffer.extend(self.inner.parse(compilation, node)?);
        }
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::{hierarchy, Parser, PatternParser};
    use crate::{document::Document, environment::Compilation};

    #[test]
    fn test_hierarchy_reaches_descendants() {
        let mut compilation =
            Compilation::new(Document::new("test", "a [b] c")).unwrap();
        let squares = hierarchy(PatternParser::simple(r"\[[^\]]*\]", "squares", 0));
        let letters = hierarchy(PatternParser::simple(r"[a-z]", "letter", 0));

        let root = compilation.forest().root();
        for (target, proto) in squares.parse(&compilation, root).unwrap() {
            compilation.forest_mut().offer(target, proto).unwrap();
        }
        // The letter parser must find `b` inside the squares tree, not
        // just the letters at the root.
        let found = letters.parse(&compilation, root).unwrap();
        assert_eq!(found.len(), 3);
    }
}
