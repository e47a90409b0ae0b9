use crate::tree::{Forest, TreeId};
use std::rc::Rc;

/// A predicate over trees, used to pick the targets of an analyzer.
#[derive(Clone)]
pub struct Query(Rc<dyn Fn(&Forest, TreeId) -> bool>);

impl Query {
    /// Create a Query from the given predicate.
    pub fn new(f: impl Fn(&Forest, TreeId) -> bool + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Test the Query against the given tree.
    pub fn test(&self, forest: &Forest, tree: TreeId) -> bool {
        (self.0)(forest, tree)
    }
}

/// Match trees of the given kind.
pub fn is<K>(kind: K) -> Query
where
    K: Into<String>,
{
    let kind = kind.into();
    Query::new(move |forest, tree| forest.kind(tree) == kind)
}

/// Match trees whose parent matches the given query.
///
/// A tree without a parent does not match.
pub fn parent(query: Query) -> Query {
    Query::new(move |forest, tree| {
        forest
            .parent(tree)
            .map(|parent| query.test(forest, parent))
            .unwrap_or(false)
    })
}

/// Match trees that do not match the given query.
pub fn not(query: Query) -> Query {
    Query::new(move |forest, tree| !query.test(forest, tree))
}

/// Match trees matching both queries.
pub fn and(left: Query, right: Query) -> Query {
    Query::new(move |forest, tree| left.test(forest, tree) && right.test(forest, tree))
}

/// Match trees matching either query.
pub fn or(left: Query, right: Query) -> Query {
    Query::new(move |forest, tree| left.test(forest, tree) || right.test(forest, tree))
}

/// Match every tree.
pub fn any() -> Query {
    Query::new(|_, _| true)
}

#[cfg(test)]
mod tests {
    use super::{and, any, is, not, or, parent};
    use crate::{sketch::Sketch, tree::Forest, tree::Proto};

    #[test]
    fn test_combinators() {
        let mut forest = Forest::new(Sketch::new("document"), 10);
        let root = forest.root();
        let outer = forest.offer(root, Proto::new("outer", 0, 0..8)).unwrap();
        let inner = forest.offer(root, Proto::new("inner", 0, 2..4)).unwrap();

        assert!(is("outer").test(&forest, outer.id));
        assert!(not(is("outer")).test(&forest, inner.id));
        assert!(parent(is("outer")).test(&forest, inner.id));
        assert!(!parent(any()).test(&forest, root));
        assert!(and(is("inner"), parent(is("outer"))).test(&forest, inner.id));
        assert!(or(is("ghost"), is("inner")).test(&forest, inner.id));
    }
}
