pub mod operator;
pub mod query;

pub use operator::BinaryOperatorAnalyzer;
pub use query::Query;

use crate::{environment::Compilation, log::Error, tree::TreeId};

/// Describes a type that can rewrite or enrich the tree after parsing.
///
/// An analyzer returns `true` when it modified the tree; the analysis
/// phase repeats until a full pass modifies nothing.
pub trait Analyzer {
    /// Analyze the given tree.
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> Result<bool, Error>;
}

impl<F> Analyzer for F
where
    F: Fn(&mut Compilation, TreeId) -> Result<bool, Error>,
{
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> Result<bool, Error> {
        self(compilation, tree)
    }
}

/// A driver that applies the inner analyzer to the given tree and every
/// descendant of it.
pub struct HierarchyAnalyzer {
    inner: Box<dyn Analyzer>,
}

/// Apply the given analyzer to every tree in the hierarchy.
pub fn hierarchy(inner: impl Analyzer + 'static) -> HierarchyAnalyzer {
    HierarchyAnalyzer {
        inner: Box::new(inner),
    }
}

impl Analyzer for HierarchyAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> Result<bool, Error> {
        let mut modified = false;
        // The snapshot is taken up front; trees created by the inner
        // analyzer are picked up on the next fixed point pass.
        for node in compilation.forest().collect(tree) {
            modified |= self.inner.analyze(compilation, node)?;
        }
        Ok(modified)
    }
}

/// A driver that applies the inner analyzer only to trees matching the
/// query.
pub struct FilterAnalyzer {
    query: Query,
    inner: Box<dyn Analyzer>,
}

/// Apply the given analyzer to the trees matching the query.
pub fn filter(query: Query, inner: impl Analyzer + 'static) -> FilterAnalyzer {
    FilterAnalyzer {
        query,
        inner: Box::new(inner),
    }
}

impl Analyzer for FilterAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> Result<bool, Error> {
        if self.query.test(compilation.forest(), tree) {
            self.inner.analyze(compilation, tree)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{filter, hierarchy, Analyzer};
    use crate::{
        analyze::query::is,
        document::Document,
        environment::Compilation,
        tree::{Proto, TreeId},
    };

    #[test]
    fn test_filter_limits_the_target() {
        let mut compilation = Compilation::new(Document::new("test", "ab")).unwrap();
        let root = compilation.forest().root();
        compilation
            .forest_mut()
            .offer(root, Proto::new("letter", 0, 0..1))
            .unwrap();
        compilation
            .forest_mut()
            .offer(root, Proto::new("digit", 0, 1..2))
            .unwrap();

        let renamed = hierarchy(filter(
            is("letter"),
            |compilation: &mut Compilation, tree: TreeId| -> Result<bool, crate::log::Error> {
                compilation.forest_mut().sketch_mut(tree).set_kind("seen");
                Ok(true)
            },
        ));

        assert!(renamed.analyze(&mut compilation, root).unwrap());
        let kinds: Vec<_> = compilation
            .forest()
            .children(root)
            .into_iter()
            .map(|id| compilation.forest().kind(id).to_string())
            .collect();
        assert_eq!(kinds, vec!["seen", "digit"]);
    }
}
