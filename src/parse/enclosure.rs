use crate::{
    environment::Compilation,
    log::Error,
    parse::Parser,
    reference::Reference,
    tree::{Proto, TreeId},
};
use regex::Regex;

/// A constructor turning a matched pair of anchors into a proto.
///
/// Receives the whole enclosure, the open anchor, the close anchor and
/// the body between them (possibly empty).
pub type Constructor = dyn Fn(Reference, Reference, Reference, Reference) -> Proto;

/// A parser that claims balanced open/close pairs within the unparsed
/// regions of a tree.
///
/// The scan runs left to right with a depth counter that only tracks its
/// own language; other enclosures do not affect the balance. Each pass
/// claims the outermost pairs of a region, and the hierarchy recursion of
/// the fixed point finds nested pairs inside the freshly created bodies.
///
/// When the open and close patterns are identical (string quotes, for
/// example) consecutive matches pair up instead.
pub struct EnclosureParser {
    open: Regex,
    close: Regex,
    constructor: Box<Constructor>,
}

impl EnclosureParser {
    /// Create a new EnclosureParser from the given anchor patterns and
    /// constructor.
    pub fn new(
        open: Regex,
        close: Regex,
        constructor: impl Fn(Reference, Reference, Reference, Reference) -> Proto + 'static,
    ) -> Self {
        Self {
            open,
            close,
            constructor: Box::new(constructor),
        }
    }

    /// Create an EnclosureParser with fixed child kinds: the container
    /// takes the given kind, and the anchors and body take `kind:open`,
    /// `kind:close` and `kind:body`.
    ///
    /// The body is one weight lighter than the container, so an enclosure
    /// that exactly fills a body still nests inside it.
    ///
    /// # Panics
    ///
    /// Panics when a pattern does not compile; patterns are dialect
    /// constants, so a failure here is a programming error.
    pub fn scope<K>(kind: K, weight: i32, open: &str, close: &str) -> Self
    where
        K: Into<String>,
    {
        let kind = kind.into();
        Self::new(
            Regex::new(open).expect("dialect pattern must compile"),
            Regex::new(close).expect("dialect pattern must compile"),
            move |whole, open, close, body| {
                Proto::new(kind.clone(), weight, whole)
                    .component("open", Proto::new(format!("{kind}:open"), weight, open))
                    .component("close", Proto::new(format!("{kind}:close"), weight, close))
                    .component("body", Proto::new(format!("{kind}:body"), weight - 1, body))
            },
        )
    }

    /// Collect the matches of a pattern that fall entirely inside one of
    /// the given gaps.
    fn anchors(&self, pattern: &Regex, source: &str, gaps: &[Reference]) -> Vec<Reference> {
        pattern
            .find_iter(source)
            .filter(|found| {
                gaps.iter()
                    .any(|gap| gap.position <= found.start() && found.end() <= gap.end())
            })
            .map(|found| Reference::from(found.start()..found.end()))
            .collect()
    }
}

impl Parser for EnclosureParser {
    fn parse(&self, compilation: &Compilation, tree: TreeId) -> Result<Vec<(TreeId, Proto)>, Error> {
        let source = compilation.source()?;
        let gaps = compilation.forest().unreserved(tree);
        let mut buffer = Vec::new();

        let mut emit = |open: Reference, close: Reference| {
            let whole = open.combine(close);
            let body = Reference::from(open.end()..close.position);
            buffer.push((tree, (self.constructor)(whole, open, close, body)));
        };

        if self.open.as_str() == self.close.as_str() {
            // One language for both anchors: consecutive matches pair up.
            let anchors = self.anchors(&self.open, source, &gaps);
            for pair in anchors.chunks(2) {
                if let [open, close] = pair {
                    emit(*open, *close);
                }
            }
        } else {
            let opens = self.anchors(&self.open, source, &gaps);
            let closes = self.anchors(&self.close, source, &gaps);
            let mut opens = opens.into_iter().peekable();
            let mut closes = closes.into_iter().peekable();

            let mut depth = 0usize;
            let mut outermost = None;
            loop {
                // Take whichever anchor comes first in the document.
                let next_open = opens.peek().copied();
                let next_close = closes.peek().copied();
                match (next_open, next_close) {
                    (Some(open), close)
                        if close.map_or(true, |close| open.position < close.position) =>
                    {
                        opens.next();
                        if depth == 0 {
                            outermost = Some(open);
                        }
                        depth += 1;
                    }
                    (_, Some(close)) => {
                        closes.next();
                        if depth == 1 {
                            if let Some(open) = outermost.take() {
                                emit(open, close);
                            }
                        }
                        depth = depth.saturating_sub(1);
                    }
                    (None, None) => break,
                    _ => break,
                }
            }
        }

        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::EnclosureParser;
    use crate::{document::Document, environment::Compilation, parse::Parser};

    #[test]
    fn test_outermost_pair() {
        let compilation = Compilation::new(Document::new("test", "a (b (c) d) e")).unwrap();
        let parser = EnclosureParser::scope("parens", 0, r"\(", r"\)");

        let found = parser
            .parse(&compilation, compilation.forest().root())
            .unwrap();
        assert_eq!(found.len(), 1);
        let (_, proto) = &found[0];
        assert_eq!((proto.reference.position, proto.reference.end()), (2, 11));
    }

    #[test]
    fn test_sibling_pairs() {
        let compilation = Compilation::new(Document::new("test", "(a) (b)")).unwrap();
        let parser = EnclosureParser::scope("parens", 0, r"\(", r"\)");

        let found = parser
            .parse(&compilation, compilation.forest().root())
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn test_identical_anchors_pair_consecutively() {
        let compilation = Compilation::new(Document::new("test", r#"a "b" c "d" e"#)).unwrap();
        let parser = EnclosureParser::scope("quotes", 0, "\"", "\"");

        let found = parser
            .parse(&compilation, compilation.forest().root())
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(
            (found[0].1.reference.position, found[0].1.reference.end()),
            (2, 5)
        );
    }

    #[test]
    fn test_nested_found_by_recursion() {
        let mut compilation = Compilation::new(Document::new("test", "((x))")).unwrap();
        let parser = EnclosureParser::scope("parens", 0, r"\(", r"\)");
        let root = compilation.forest().root();

        // First pass claims the outer pair.
        for (target, proto) in parser.parse(&compilation, root).unwrap() {
            compilation.forest_mut().offer(target, proto).unwrap();
        }
        // The outer body is now a tree of its own; scanning it claims the
        // inner pair.
        let outer = compilation.forest().children(root)[0];
        let body = compilation.forest().component(outer, "body").unwrap();
        let found = parser.parse(&compilation, body).unwrap();

        assert_eq!(found.len(), 1);
        assert_eq!(
            (found[0].1.reference.position, found[0].1.reference.end()),
            (1, 4)
        );
    }

    #[test]
    fn test_stray_close_is_ignored() {
        let compilation = Compilation::new(Document::new("test", ") (a)")).unwrap();
        let parser = EnclosureParser::scope("parens", 0, r"\(", r"\)");

        let found = parser
            .parse(&compilation, compilation.forest().root())
            .unwrap();
        assert_eq!(found.len(), 1);
    }
}
