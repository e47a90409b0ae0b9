use crate::{
    environment::Compilation,
    log::Error,
    parse::Parser,
    reference::Reference,
    tree::{Proto, TreeId},
};
use regex::Regex;

/// A constructor turning the capture groups of a match into a proto.
///
/// Index zero is the whole match; a group that did not participate is
/// `None`. Returning `None` skips the match.
pub type Constructor = dyn Fn(&[Option<Reference>]) -> Option<Proto>;

/// A parser that claims every regex match within the unparsed regions of
/// a tree.
///
/// Matches that touch an area already covered by a child tree are left
/// alone; combined with the idempotence of
/// [`offer`][crate::Forest::offer], this is what makes repeated passes
/// converge.
pub struct PatternParser {
    pattern: Regex,
    constructor: Box<Constructor>,
}

impl PatternParser {
    /// Create a new PatternParser with the given pattern and constructor.
    pub fn new(
        pattern: Regex,
        constructor: impl Fn(&[Option<Reference>]) -> Option<Proto> + 'static,
    ) -> Self {
        Self {
            pattern,
            constructor: Box::new(constructor),
        }
    }

    /// Create a PatternParser that wraps every match in a single node of
    /// the given kind and weight.
    ///
    /// # Panics
    ///
    /// Panics when the pattern does not compile; patterns are dialect
    /// constants, so a failure here is a programming error.
    pub fn simple<K>(pattern: &str, kind: K, weight: i32) -> Self
    where
        K: Into<String>,
    {
        let kind = kind.into();
        Self::new(
            Regex::new(pattern).expect("dialect pattern must compile"),
            move |groups| {
                groups[0].map(|reference| Proto::new(kind.clone(), weight, reference))
            },
        )
    }
}

impl Parser for PatternParser {
    fn parse(&self, compilation: &Compilation, tree: TreeId) -> Result<Vec<(TreeId, Proto)>, Error> {
        let source = compilation.source()?;
        let gaps = compilation.forest().unreserved(tree);
        let mut buffer = Vec::new();

        // The pattern runs over the whole source so anchors keep their
        // meaning; only matches inside an unparsed region are claimed.
        for captures in self.pattern.captures_iter(source) {
            let whole = captures.get(0).expect("group zero always participates");
            let inside = gaps
                .iter()
                .any(|gap| gap.position <= whole.start() && whole.end() <= gap.end());
            if !inside || whole.start() == whole.end() {
                continue;
            }

            let groups: Vec<Option<Reference>> = (0..captures.len())
                .map(|index| {
                    captures
                        .get(index)
                        .map(|group| Reference::from(group.start()..group.end()))
                })
                .collect();

            if let Some(proto) = (self.constructor)(&groups) {
                buffer.push((tree, proto));
            }
        }

        Ok(buffer)
    }
}
