//! The syntax specs: pattern and enclosure parsers producing the atom
//! trees the analyzers and compilers work over.

use crate::{
    dialect::{kind, weight},
    parse::{hierarchy, EnclosureParser, PatternParser},
    spec::Spec,
    tree::Proto,
};
use regex::Regex;

/// Double-quoted strings, escape aware.
///
/// The whole string is one pattern match so an escaped quote cannot end
/// it; the anchors and body become components like any other enclosure.
pub fn quotes() -> Spec {
    let pattern = Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("dialect pattern must compile");
    Spec::new("syntax:quotes").with_parser(hierarchy(PatternParser::new(pattern, |groups| {
        let whole = groups[0]?;
        let body = groups[1]?;
        Some(
            Proto::new(kind::QUOTES, weight::ATOM, whole)
                .component(
                    "open",
                    Proto::new(
                        format!("{}:open", kind::QUOTES),
                        weight::ATOM,
                        whole.position..whole.position + 1,
                    ),
                )
                .component(
                    "close",
                    Proto::new(
                        format!("{}:close", kind::QUOTES),
                        weight::ATOM,
                        whole.end() - 1..whole.end(),
                    ),
                )
                .component(
                    "body",
                    Proto::new(format!("{}:body", kind::QUOTES), weight::OPERAND, body),
                ),
        )
    })))
}

/// Parenthesis enclosures.
pub fn parentheses() -> Spec {
    Spec::new("syntax:parentheses").with_parser(hierarchy(EnclosureParser::scope(
        kind::PARENTHESES,
        weight::ATOM,
        r"\(",
        r"\)",
    )))
}

/// Square-bracket enclosures.
pub fn squares() -> Spec {
    Spec::new("syntax:squares").with_parser(hierarchy(EnclosureParser::scope(
        kind::SQUARES,
        weight::ATOM,
        r"\[",
        r"\]",
    )))
}

/// Curly-brace enclosures.
pub fn braces() -> Spec {
    Spec::new("syntax:braces").with_parser(hierarchy(EnclosureParser::scope(
        kind::BRACES,
        weight::ATOM,
        r"\{",
        r"\}",
    )))
}

/// Integer and decimal number literals.
pub fn numbers() -> Spec {
    Spec::new("syntax:numbers").with_parser(hierarchy(PatternParser::simple(
        r"\b\d+(?:\.\d+)?\b",
        kind::NUMBER,
        weight::ATOM,
    )))
}

/// Identifier words.
pub fn words() -> Spec {
    Spec::new("syntax:words").with_parser(hierarchy(PatternParser::simple(
        r"\b[A-Za-z_][A-Za-z0-9_]*\b",
        kind::WORD,
        weight::ATOM,
    )))
}

pub fn plus() -> Spec {
    symbol("syntax:plus", kind::PLUS, r"\+")
}

pub fn minus() -> Spec {
    symbol("syntax:minus", kind::MINUS, r"-")
}

pub fn asterisk() -> Spec {
    symbol("syntax:asterisk", kind::ASTERISK, r"\*")
}

pub fn slash() -> Spec {
    symbol("syntax:slash", kind::SLASH, r"/")
}

pub fn percent() -> Spec {
    symbol("syntax:percent", kind::PERCENT, r"%")
}

pub fn colon() -> Spec {
    symbol("syntax:colon", kind::COLON, r":")
}

pub fn comma() -> Spec {
    symbol("syntax:comma", kind::COMMA, r",")
}

/// A single-character symbol spec.
fn symbol(name: &str, symbol_kind: &'static str, pattern: &str) -> Spec {
    Spec::new(name).with_parser(hierarchy(PatternParser::simple(
        pattern,
        symbol_kind,
        weight::ATOM,
    )))
}
