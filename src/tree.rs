use crate::{
    log::{Error, OVERLAPPING_TREES},
    reference::Reference,
    relation::Dominance,
    sketch::Sketch,
};
use serde::{Deserialize, Serialize};

/// A stable handle to a node within a [`Forest`].
#[derive(Debug, PartialEq, Eq, Hash, Copy, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TreeId(pub usize);

/// A detached tree template produced by a parser or analyzer, waiting to
/// be offered into a [`Forest`].
///
/// A proto may carry named component sub-protos; offering the proto offers
/// the components inside it and records them in the container's
/// [`Sketch`] component map.
#[derive(Debug, Clone)]
pub struct Proto {
    /// The interval the node will cover.
    pub reference: Reference,
    /// The label the node will carry.
    pub sketch: Sketch,
    /// Named component templates, offered within this node.
    components: Vec<(String, Proto)>,
}

impl Proto {
    /// Create a new Proto with the given kind, weight and interval.
    pub fn new<K, R>(kind: K, weight: i32, reference: R) -> Self
    where
        K: Into<String>,
        R: Into<Reference>,
    {
        Self {
            reference: reference.into(),
            sketch: Sketch::new(kind).weighted(weight),
            components: Vec::new(),
        }
    }

    /// Add a named component template.
    ///
    /// Returns the `Proto`, so additional methods may be chained.
    pub fn component<T>(mut self, name: T, proto: Proto) -> Self
    where
        T: Into<String>,
    {
        self.components.push((name.into(), proto));
        self
    }
}

/// The result of offering a [`Proto`] to a [`Forest`].
#[derive(Debug, PartialEq, Copy, Clone)]
pub struct Offered {
    /// The node the proto landed on.
    ///
    /// When the offer was an idempotent repeat, this is the node that
    /// already covered the proto.
    pub id: TreeId,
    /// True when the offer changed the forest.
    pub modified: bool,
}

/// One node in a [`Forest`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Node {
    reference: Reference,
    sketch: Sketch,
    parent: Option<TreeId>,
    first_child: Option<TreeId>,
    next: Option<TreeId>,
    previous: Option<TreeId>,
}

/// The tree overlay of one document: an arena of typed, interval-anchored
/// nodes with a strict sibling-and-containment discipline.
///
/// The root node always covers the whole document. Children are kept in
/// document order, every parent interval covers its children, and sibling
/// intervals never overlap; [`offer`][Forest::offer] enforces all of this
/// on every insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forest {
    nodes: Vec<Node>,
}

impl Forest {
    /// Create a new Forest whose root carries the given sketch and covers
    /// `[0, length)`.
    pub fn new(sketch: Sketch, length: usize) -> Self {
        Self {
            nodes: vec![Node {
                reference: Reference::new(0, length),
                sketch,
                parent: None,
                first_child: None,
                next: None,
                previous: None,
            }],
        }
    }

    /// Return the root of the Forest.
    #[inline]
    pub fn root(&self) -> TreeId {
        TreeId(0)
    }

    /// Return the interval covered by the given node.
    #[inline]
    pub fn reference(&self, id: TreeId) -> Reference {
        self.nodes[id.0].reference
    }

    /// Return the sketch of the given node.
    #[inline]
    pub fn sketch(&self, id: TreeId) -> &Sketch {
        &self.nodes[id.0].sketch
    }

    /// Return a mutable reference to the sketch of the given node.
    #[inline]
    pub fn sketch_mut(&mut self, id: TreeId) -> &mut Sketch {
        &mut self.nodes[id.0].sketch
    }

    /// Return the kind of the given node.
    #[inline]
    pub fn kind(&self, id: TreeId) -> &str {
        self.nodes[id.0].sketch.kind()
    }

    /// Return the parent of the given node.
    #[inline]
    pub fn parent(&self, id: TreeId) -> Option<TreeId> {
        self.nodes[id.0].parent
    }

    /// Return the following sibling of the given node.
    #[inline]
    pub fn next(&self, id: TreeId) -> Option<TreeId> {
        self.nodes[id.0].next
    }

    /// Return the preceding sibling of the given node.
    #[inline]
    pub fn previous(&self, id: TreeId) -> Option<TreeId> {
        self.nodes[id.0].previous
    }

    /// Return the first child of the given node.
    #[inline]
    pub fn first_child(&self, id: TreeId) -> Option<TreeId> {
        self.nodes[id.0].first_child
    }

    /// Return the tree filling the named component of the given node.
    #[inline]
    pub fn component(&self, id: TreeId, name: &str) -> Option<TreeId> {
        self.nodes[id.0].sketch.component(name)
    }

    /// Return a snapshot of the immediate children of the given node, in
    /// document order.
    pub fn children(&self, id: TreeId) -> Vec<TreeId> {
        let mut buffer = Vec::new();
        let mut cursor = self.first_child(id);
        while let Some(child) = cursor {
            buffer.push(child);
            cursor = self.next(child);
        }
        buffer
    }

    /// Return the given node and every descendant of it, depth first in
    /// document order.
    pub fn collect(&self, id: TreeId) -> Vec<TreeId> {
        let mut buffer = Vec::new();
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            buffer.push(node);
            let mut children = self.children(node);
            children.reverse();
            stack.extend(children);
        }
        buffer
    }

    /// Return the sub-intervals of the given node's span that are not
    /// covered by any of its children.
    ///
    /// These are the unparsed regions a pattern parser may claim, and the
    /// raw gaps a flattening compiler reprints.
    pub fn unreserved(&self, id: TreeId) -> Vec<Reference> {
        let reference = self.reference(id);
        let mut gaps = Vec::new();
        let mut position = reference.position;

        for child in self.children(id) {
            let covered = self.reference(child);
            if covered.position > position {
                gaps.push(Reference::from(position..covered.position));
            }
            position = covered.end();
        }
        if position < reference.end() {
            gaps.push(Reference::from(position..reference.end()));
        }

        gaps
    }

    /// Offer the given proto into the subtree of `target`, placing it at
    /// the correct depth and re-parenting existing descendants as needed,
    /// then offer and record its components.
    ///
    /// Offering an identical proto twice is an idempotent no-op, which is
    /// what lets the parse fixed point terminate.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the proto overlaps an existing node
    /// without containment, claims an occupied interval at the same
    /// weight with a different kind, or falls outside the target's span.
    pub fn offer(&mut self, target: TreeId, proto: Proto) -> Result<Offered, Error> {
        let Proto {
            reference,
            sketch,
            components,
        } = proto;
        let offered = self.offer_node(target, reference, sketch)?;

        let mut modified = offered.modified;
        for (role, sub) in components {
            let inner = self.offer(offered.id, sub)?;
            modified |= inner.modified;
            self.sketch_mut(offered.id).set_component(role, inner.id);
        }

        Ok(Offered {
            id: offered.id,
            modified,
        })
    }

    fn offer_node(
        &mut self,
        target: TreeId,
        reference: Reference,
        sketch: Sketch,
    ) -> Result<Offered, Error> {
        match Dominance::of(self.reference(target), reference) {
            Dominance::EXACT => self.wedge(target, reference, sketch),
            Dominance::PART => self.place(target, reference, sketch),
            Dominance::SHARE => Err(self.error_overlap(target, reference, &sketch)),
            Dominance::CONTAIN | Dominance::NONE => {
                Err(Error::build("tree offered outside its ancestor").help(format!(
                    "a `{}` tree at {} cannot be offered to the tree at {}",
                    sketch.kind(),
                    reference,
                    self.reference(target),
                )))
            }
        }
    }

    /// Resolve an offer whose interval exactly matches an existing node.
    ///
    /// The heavier sketch nests deeper: a heavier offer wedges below the
    /// node (adopting its children), a lighter offer wedges above it
    /// (taking its place under its parent).
    fn wedge(
        &mut self,
        target: TreeId,
        reference: Reference,
        sketch: Sketch,
    ) -> Result<Offered, Error> {
        let held = self.nodes[target.0].sketch.weight();

        if sketch.weight() > held {
            let id = self.push_node(reference, sketch);
            let adopted = self.nodes[target.0].first_child.take();
            self.nodes[id.0].first_child = adopted;
            let mut cursor = adopted;
            while let Some(child) = cursor {
                self.nodes[child.0].parent = Some(id);
                cursor = self.nodes[child.0].next;
            }
            self.nodes[id.0].parent = Some(target);
            self.nodes[target.0].first_child = Some(id);

            Ok(Offered { id, modified: true })
        } else if sketch.weight() < held {
            let parent = self.parent(target).ok_or_else(|| {
                Error::build("tree offered over the root").help(format!(
                    "a `{}` tree cannot wrap the root of the document",
                    sketch.kind(),
                ))
            })?;
            let id = self.push_node(reference, sketch);
            let previous = self.nodes[target.0].previous.take();
            let next = self.nodes[target.0].next.take();
            self.attach(parent, previous, next, id);
            self.nodes[target.0].parent = Some(id);
            self.nodes[id.0].first_child = Some(target);

            Ok(Offered { id, modified: true })
        } else if sketch.kind() == self.kind(target) {
            Ok(Offered {
                id: target,
                modified: false,
            })
        } else {
            Err(self.error_overlap(target, reference, &sketch))
        }
    }

    /// Place a node strictly inside the span of `target`.
    fn place(
        &mut self,
        target: TreeId,
        reference: Reference,
        sketch: Sketch,
    ) -> Result<Offered, Error> {
        let mut cursor = self.first_child(target);

        while let Some(child) = cursor {
            match Dominance::of(self.reference(child), reference) {
                Dominance::EXACT => return self.wedge(child, reference, sketch),
                Dominance::PART => return self.place(child, reference, sketch),
                Dominance::CONTAIN => return self.adopt(target, child, reference, sketch),
                Dominance::SHARE => return Err(self.error_overlap(child, reference, &sketch)),
                Dominance::NONE => {
                    if reference.end() <= self.reference(child).position {
                        let id = self.push_node(reference, sketch);
                        self.attach(target, self.previous(child), Some(child), id);
                        return Ok(Offered { id, modified: true });
                    }
                    cursor = self.next(child);
                }
            }
        }

        let id = self.push_node(reference, sketch);
        let last = self.children(target).last().copied();
        self.attach(target, last, None, id);
        Ok(Offered { id, modified: true })
    }

    /// Insert a node in place of the contiguous run of existing children
    /// it contains, re-parenting the run under it.
    fn adopt(
        &mut self,
        target: TreeId,
        first: TreeId,
        reference: Reference,
        sketch: Sketch,
    ) -> Result<Offered, Error> {
        let mut last = first;
        let mut after = self.next(first);
        while let Some(sibling) = after {
            match Dominance::of(self.reference(sibling), reference) {
                Dominance::CONTAIN => {
                    last = sibling;
                    after = self.next(sibling);
                }
                Dominance::NONE => break,
                _ => return Err(self.error_overlap(sibling, reference, &sketch)),
            }
        }

        let id = self.push_node(reference, sketch);
        let previous = self.nodes[first.0].previous.take();
        let next = self.nodes[last.0].next.take();
        self.attach(target, previous, next, id);

        self.nodes[id.0].first_child = Some(first);
        let mut cursor = Some(first);
        while let Some(child) = cursor {
            self.nodes[child.0].parent = Some(id);
            cursor = self.nodes[child.0].next;
        }

        Ok(Offered { id, modified: true })
    }

    /// Link a detached node into a sibling chain.
    fn attach(
        &mut self,
        parent: TreeId,
        previous: Option<TreeId>,
        next: Option<TreeId>,
        id: TreeId,
    ) {
        self.nodes[id.0].parent = Some(parent);
        self.nodes[id.0].previous = previous;
        self.nodes[id.0].next = next;
        match previous {
            Some(previous) => self.nodes[previous.0].next = Some(id),
            None => self.nodes[parent.0].first_child = Some(id),
        }
        if let Some(next) = next {
            self.nodes[next.0].previous = Some(id);
        }
    }

    fn push_node(&mut self, reference: Reference, sketch: Sketch) -> TreeId {
        let id = TreeId(self.nodes.len());
        self.nodes.push(Node {
            reference,
            sketch,
            parent: None,
            first_child: None,
            next: None,
            previous: None,
        });
        id
    }

    fn error_overlap(&self, held: TreeId, reference: Reference, sketch: &Sketch) -> Error {
        Error::build(OVERLAPPING_TREES).help(format!(
            "a `{}` tree at {} overlaps the `{}` tree at {}",
            sketch.kind(),
            reference,
            self.kind(held),
            self.reference(held),
        ))
    }
}
