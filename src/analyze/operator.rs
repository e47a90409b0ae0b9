use crate::{
    analyze::Analyzer,
    environment::Compilation,
    log::Error,
    reference::Reference,
    tree::{Proto, TreeId},
};

/// An analyzer that wraps a matched operator symbol together with both of
/// its sibling neighbors into a container tree.
///
/// The container receives three components: `sign` (the symbol itself),
/// and `left` and `right` wrappers spanning everything between the
/// container edges and the symbol. The neighbors end up inside the
/// wrappers, so compiling a wrapper compiles the operand.
///
/// A symbol missing either neighbor is skipped; a later analyzer or the
/// compiler decides whether that is an error.
pub struct BinaryOperatorAnalyzer {
    /// The kind of the container tree.
    kind: String,
    /// The weight of the container tree.
    weight: i32,
    /// The kind of the operand wrappers.
    operand_kind: String,
    /// The weight of the operand wrappers.
    operand_weight: i32,
}

/// Wrap matched symbols in a container of the given kind, with operand
/// wrappers of the given kind.
pub fn operator<K, O>(
    kind: K,
    weight: i32,
    operand_kind: O,
    operand_weight: i32,
) -> BinaryOperatorAnalyzer
where
    K: Into<String>,
    O: Into<String>,
{
    BinaryOperatorAnalyzer {
        kind: kind.into(),
        weight,
        operand_kind: operand_kind.into(),
        operand_weight,
    }
}

impl Analyzer for BinaryOperatorAnalyzer {
    fn analyze(&self, compilation: &mut Compilation, tree: TreeId) -> Result<bool, Error> {
        let forest = compilation.forest();
        let (previous, next) = match (forest.previous(tree), forest.next(tree)) {
            (Some(previous), Some(next)) => (previous, next),
            _ => return Ok(false),
        };
        let parent = match forest.parent(tree) {
            Some(parent) => parent,
            None => return Ok(false),
        };

        let sign = forest.reference(tree);
        let whole = forest.reference(previous).combine(forest.reference(next));
        let left = Reference::from(whole.position..sign.position);
        let right = Reference::from(sign.end()..whole.end());

        let proto = Proto::new(&self.kind, self.weight, whole)
            .component(
                "left",
                Proto::new(&self.operand_kind, self.operand_weight, left),
            )
            .component(
                "right",
                Proto::new(&self.operand_kind, self.operand_weight, right),
            );

        let offered = compilation.forest_mut().offer(parent, proto)?;
        compilation
            .forest_mut()
            .sketch_mut(offered.id)
            .set_component("sign", tree);

        Ok(offered.modified)
    }
}

#[cfg(test)]
mod tests {
    use super::operator;
    use crate::{
        analyze::{filter, hierarchy, query, Analyzer},
        document::Document,
        environment::Compilation,
        parse::{hierarchy as parse_hierarchy, Parser, PatternParser},
    };

    #[test]
    fn test_wraps_neighbors() {
        let mut compilation = binary_compilation("12 + 345");

        let adder = hierarchy(filter(
            query::and(query::is("symbol:plus"), query::parent(query::not(query::is("operator:add")))),
            operator("operator:add", 0, "parameter", -1),
        ));
        let root = compilation.forest().root();
        assert!(adder.analyze(&mut compilation, root).unwrap());

        let forest = compilation.forest();
        let wrapper = forest.children(root)[0];
        assert_eq!(forest.kind(wrapper), "operator:add");
        assert_eq!((forest.reference(wrapper).position, forest.reference(wrapper).end()), (0, 8));

        let left = forest.component(wrapper, "left").unwrap();
        let right = forest.component(wrapper, "right").unwrap();
        let sign = forest.component(wrapper, "sign").unwrap();
        assert_eq!(forest.kind(sign), "symbol:plus");
        // The operands were adopted into the wrappers.
        assert_eq!(forest.children(left).len(), 1);
        assert_eq!(forest.children(right).len(), 1);

        // A second pass finds the symbol already wrapped and stops.
        assert!(!adder.analyze(&mut compilation, root).unwrap());
    }

    #[test]
    fn test_missing_neighbor_is_skipped() {
        let mut compilation = binary_compilation("+ 345");

        let adder = hierarchy(filter(
            query::is("symbol:plus"),
            operator("operator:add", 0, "parameter", -1),
        ));
        let root = compilation.forest().root();
        assert!(!adder.analyze(&mut compilation, root).unwrap());
    }

    /// Parse numbers and plus symbols over the given source.
    fn binary_compilation(source: &str) -> Compilation {
        let mut compilation = Compilation::new(Document::new("test", source)).unwrap();
        let root = compilation.forest().root();
        for parser in [
            parse_hierarchy(PatternParser::simple(r"\d+", "number", 0)),
            parse_hierarchy(PatternParser::simple(r"\+", "symbol:plus", 0)),
        ] {
            for (target, proto) in parser.parse(&compilation, root).unwrap() {
                compilation.forest_mut().offer(target, proto).unwrap();
            }
        }
        compilation
    }
}
