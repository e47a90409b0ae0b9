use crate::tree::TreeId;
use serde::{Deserialize, Serialize};

/// The typed label attached to a tree node.
///
/// A sketch carries the `kind` of the node (a free-form dotted string such
/// as `operator:pair` or `enclosure:quotes`), a `weight` used to break ties
/// when two sketches claim the same interval, and a named component map
/// linking roles such as `key`, `parameter`, `sign`, `left`, `right`,
/// `open`, `close` and `body` to the trees filling them.
///
/// The component map preserves insertion order and places no uniqueness
/// requirement on names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sketch {
    /// The kind of the node.
    kind: String,
    /// The tie breaker used when two sketches cover the same interval.
    ///
    /// A heavier sketch nests deeper.
    weight: i32,
    /// Named components, in insertion order.
    components: Vec<(String, TreeId)>,
}

impl Sketch {
    /// Create a new Sketch with the given kind and a weight of zero.
    pub fn new<T>(kind: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            kind: kind.into(),
            weight: 0,
            components: Vec::new(),
        }
    }

    /// Set the weight of the Sketch.
    ///
    /// Returns the `Sketch`, so additional methods may be chained.
    pub fn weighted(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// Return the kind of the Sketch.
    #[inline]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Replace the kind of the Sketch.
    pub fn set_kind<T>(&mut self, kind: T)
    where
        T: Into<String>,
    {
        self.kind = kind.into();
    }

    /// Return the weight of the Sketch.
    #[inline]
    pub fn weight(&self) -> i32 {
        self.weight
    }

    /// Return the tree filling the component with the given name.
    pub fn component(&self, name: &str) -> Option<TreeId> {
        self.components
            .iter()
            .find(|(role, _)| role == name)
            .map(|(_, id)| *id)
    }

    /// Assign the tree filling the component with the given name.
    ///
    /// An existing component with the same name is replaced in place,
    /// keeping its position in the insertion order.
    pub fn set_component<T>(&mut self, name: T, id: TreeId)
    where
        T: Into<String>,
    {
        let name = name.into();
        match self.components.iter_mut().find(|(role, _)| *role == name) {
            Some(entry) => entry.1 = id,
            None => self.components.push((name, id)),
        }
    }

    /// Return the components of the Sketch in insertion order.
    pub fn components(&self) -> impl Iterator<Item = (&str, TreeId)> {
        self.components.iter().map(|(role, id)| (role.as_str(), *id))
    }
}

#[cfg(test)]
mod tests {
    use super::Sketch;
    use crate::tree::TreeId;

    #[test]
    fn test_component_order() {
        let mut sketch = Sketch::new("command");
        sketch.set_component("key", TreeId(1));
        sketch.set_component("parameter", TreeId(2));

        let roles: Vec<_> = sketch.components().map(|(role, _)| role).collect();
        assert_eq!(roles, vec!["key", "parameter"]);
    }

    #[test]
    fn test_component_replace() {
        let mut sketch = Sketch::new("command");
        sketch.set_component("key", TreeId(1));
        sketch.set_component("key", TreeId(3));

        assert_eq!(sketch.component("key"), Some(TreeId(3)));
        assert_eq!(sketch.components().count(), 1);
    }

    #[test]
    fn test_weighted() {
        let sketch = Sketch::new("operator:pair").weighted(2);

        assert_eq!(sketch.kind(), "operator:pair");
        assert_eq!(sketch.weight(), 2);
    }
}
