//! The operator specs: binary-operator analyzers wrapping symbols and
//! their neighbors into operator trees.
//!
//! Registry order is precedence: the multiplicative family runs before
//! the additive family, and pairs bind loosest of all. An earlier
//! analyzer reaching its fixed point first means its operators sit
//! deeper in the tree.

use crate::{
    analyze::{filter, hierarchy, operator::operator, query},
    dialect::{kind, weight},
    spec::Spec,
};

/// The `*` operator.
pub fn multiplier() -> Spec {
    binary("operator:multiplier", kind::ASTERISK, kind::OPERATOR_MULTIPLY)
}

/// The `/` operator.
pub fn divider() -> Spec {
    binary("operator:divider", kind::SLASH, kind::OPERATOR_DIVIDE)
}

/// The `%` operator.
pub fn remainder() -> Spec {
    binary("operator:remainder", kind::PERCENT, kind::OPERATOR_REMAINDER)
}

/// The `+` operator.
pub fn adder() -> Spec {
    binary("operator:adder", kind::PLUS, kind::OPERATOR_ADD)
}

/// The `-` operator.
pub fn subtractor() -> Spec {
    binary("operator:subtractor", kind::MINUS, kind::OPERATOR_SUBTRACT)
}

/// The `:` operator.
pub fn pair() -> Spec {
    binary("operator:pair", kind::COLON, kind::OPERATOR_PAIR)
}

/// An operator spec wrapping the given symbol kind into the given
/// container kind.
fn binary(name: &str, symbol_kind: &'static str, container_kind: &'static str) -> Spec {
    Spec::new(name).with_analyzer(hierarchy(filter(
        query::and(
            query::is(symbol_kind),
            query::not(query::parent(query::is(container_kind))),
        ),
        operator(container_kind, weight::ATOM, kind::PARAMETER, weight::OPERAND),
    )))
}

#[cfg(test)]
mod tests {
    use crate::{
        dialect::{expression, kind},
        document::Document,
        engine::Engine,
    };

    #[test]
    fn test_precedence_shapes_the_tree() {
        let engine = Engine::new().with_all(expression());
        let compilation = engine.compile(Document::new("test", "1 + 2 * 3")).unwrap();

        let forest = compilation.forest();
        let top = forest.children(forest.root())[0];
        assert_eq!(forest.kind(top), kind::OPERATOR_ADD);

        // The multiplication nests inside the adder's right operand.
        let right = forest.component(top, "right").unwrap();
        let inner = forest.children(right)[0];
        assert_eq!(forest.kind(inner), kind::OPERATOR_MULTIPLY);
    }
}
