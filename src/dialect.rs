//! The built-in template dialect: hash commands, square-bracket
//! injections, and an expression language over numbers, strings, arrays,
//! objects and binary operators.
//!
//! Everything here is plain [`Spec`] composition over the engine
//! frameworks; a consumer can pick individual specs, reorder them, or mix
//! in their own.

pub mod command;
pub mod flow;
pub mod operator;
pub mod parameter;
pub mod syntax;

use crate::{
    compile::{Compiler, FlattenCompiler, KindCompiler, ReprintCompiler},
    environment::Compilation,
    instruction::{Instruction, Op},
    log::Error,
    spec::Spec,
    tree::TreeId,
};

/// The kind strings of the built-in dialect.
pub mod kind {
    pub const NUMBER: &str = "number";
    pub const WORD: &str = "word";

    pub const PLUS: &str = "symbol:plus";
    pub const MINUS: &str = "symbol:minus";
    pub const ASTERISK: &str = "symbol:asterisk";
    pub const SLASH: &str = "symbol:slash";
    pub const PERCENT: &str = "symbol:percent";
    pub const COLON: &str = "symbol:colon";
    pub const COMMA: &str = "symbol:comma";

    pub const QUOTES: &str = "enclosure:quotes";
    pub const PARENTHESES: &str = "enclosure:parentheses";
    pub const SQUARES: &str = "enclosure:squares";
    pub const BRACES: &str = "enclosure:braces";

    /// The wrapper kind of operator operands and command parameters.
    pub const PARAMETER: &str = "parameter";

    pub const OPERATOR_ADD: &str = "operator:add";
    pub const OPERATOR_SUBTRACT: &str = "operator:subtract";
    pub const OPERATOR_MULTIPLY: &str = "operator:multiply";
    pub const OPERATOR_DIVIDE: &str = "operator:divide";
    pub const OPERATOR_REMAINDER: &str = "operator:remainder";
    pub const OPERATOR_PAIR: &str = "operator:pair";

    pub const COMMAND_DEFINE: &str = "command:define";
    pub const COMMAND_DECLARE: &str = "command:declare";
    pub const COMMAND_UNDEF: &str = "command:undef";
    pub const COMMAND_IF: &str = "command:if";
    pub const COMMAND_IFDEF: &str = "command:ifdef";
    pub const COMMAND_IFNDEF: &str = "command:ifndef";
    pub const COMMAND_ELIF: &str = "command:elif";
    pub const COMMAND_ELSE: &str = "command:else";
    pub const COMMAND_ENDIF: &str = "command:endif";
    pub const COMMAND_FOR: &str = "command:for";
    pub const COMMAND_ENDFOR: &str = "command:endfor";
    pub const COMMAND_INCLUDE: &str = "command:include";

    pub const FLOW_IF: &str = "flow:if";
    pub const FLOW_FOR: &str = "flow:for";
}

/// The weight tiers of the built-in dialect.
pub mod weight {
    /// Atoms, symbols, enclosures, commands and flow containers.
    pub const ATOM: i32 = 0;
    /// Operand wrappers and enclosure bodies sit one step lighter, so an
    /// equal-span atom nests inside its wrapper.
    pub const OPERAND: i32 = -1;
}

/// The full template dialect: commands, flow contexts, injections and raw
/// text, over the shared expression syntax.
pub fn standard() -> Vec<Spec> {
    let mut specs = vec![
        command::define(),
        command::declare(),
        command::undef(),
        command::if_(),
        command::ifdef(),
        command::ifndef(),
        command::elif(),
        command::else_(),
        command::endif(),
        command::for_(),
        command::endfor(),
        command::include(),
    ];
    specs.extend(expression_syntax());
    specs.push(flow::conditional());
    specs.push(flow::iteration());
    specs.push(injection());
    specs.push(document());
    specs
}

/// The expression dialect: the whole document is one parameter, and its
/// value is printed.
pub fn expression() -> Vec<Spec> {
    let mut specs = expression_syntax();
    specs.push(expression_root());
    specs
}

/// The syntax and operator specs shared by both bundles, in precedence
/// order.
fn expression_syntax() -> Vec<Spec> {
    vec![
        syntax::quotes(),
        syntax::parentheses(),
        syntax::squares(),
        syntax::braces(),
        syntax::numbers(),
        syntax::words(),
        syntax::asterisk(),
        syntax::slash(),
        syntax::percent(),
        syntax::plus(),
        syntax::minus(),
        syntax::colon(),
        syntax::comma(),
        operator::multiplier(),
        operator::divider(),
        operator::remainder(),
        operator::adder(),
        operator::subtractor(),
        operator::pair(),
    ]
}

/// Square-bracket injections: `[param]` prints the parameter's value at
/// document level.
fn injection() -> Spec {
    Spec::new("injection").with_compiler(KindCompiler::new(
        kind::SQUARES,
        |_root: &dyn Compiler, compilation: &Compilation, tree: TreeId| -> Result<Option<Instruction>, Error> {
            let body = parameter::body_of(compilation, tree)?;
            let instruction = parameter::compile(compilation, body)?;
            Ok(Some(Instruction::traced(
                Op::PrintEval {
                    instruction: instruction.boxed(),
                },
                compilation.trace(tree),
            )))
        },
    ))
}

/// The document compiler: flatten every tree, reprinting raw gaps and
/// unrecognized leaves.
///
/// This accepts any tree, so it must sit last in the registry.
fn document() -> Spec {
    Spec::new("document").with_compiler(FlattenCompiler::new(ReprintCompiler))
}

/// The expression root compiler: compile the root as one parameter and
/// print its value.
fn expression_root() -> Spec {
    Spec::new("expression").with_compiler(
        |_root: &dyn Compiler, compilation: &Compilation, tree: TreeId| -> Result<Option<Instruction>, Error> {
            if compilation.forest().parent(tree).is_some() {
                return Ok(None);
            }
            let instruction = parameter::compile(compilation, tree)?;
            Ok(Some(Instruction::traced(
                Op::PrintEval {
                    instruction: instruction.boxed(),
                },
                compilation.trace(tree),
            )))
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{expression, standard};
    use crate::{document::Document, engine::Engine, environment::Environment};

    #[test]
    fn test_expression_arithmetic() {
        assert_eq!(run_expression("1 + 2 * (3 + 5)"), "17");
    }

    #[test]
    fn test_expression_precedence_chain() {
        assert_eq!(run_expression("10 - 2 * 3"), "4");
        assert_eq!(run_expression("8 / 2 + 1"), "5");
        assert_eq!(run_expression("9 % 4"), "1");
    }

    #[test]
    fn test_expression_concatenation() {
        assert_eq!(run_expression(r#""a" + "b""#), "ab");
        assert_eq!(run_expression(r#"1 + "a""#), "1a");
    }

    #[test]
    fn test_expression_object() {
        assert_eq!(run_expression("{a:1,b:2}"), r#"{"a":"1","b":"2"}"#);
    }

    #[test]
    fn test_expression_array() {
        assert_eq!(run_expression("[1,2,3]"), r#"["1","2","3"]"#);
    }

    #[test]
    fn test_expression_pair_value() {
        assert_eq!(run_expression("{a:1+2}"), r#"{"a":"3"}"#);
    }

    #[test]
    fn test_define_and_branch() {
        // The newline after each command line belongs to the command, so
        // command lines print nothing; the body newline prints.
        assert_eq!(run_standard("#define X 5\n#if X\nok\n#endif"), "ok\n");
    }

    #[test]
    fn test_for_loop() {
        assert_eq!(run_standard("#for I [1,2,3]\n[I]\n#endfor"), "1\n2\n3\n");
    }

    #[test]
    fn test_ifdef_else() {
        assert_eq!(run_standard("#ifdef Y\nA\n#else\nB\n#endif"), "B\n");
    }

    #[test]
    fn test_declare_evaluates() {
        assert_eq!(run_standard("#declare X 2+3\n[X]"), "5");
    }

    #[test]
    fn test_elif_chain() {
        let source = "#define X 2\n#if X % 2\nodd\n#elif X\neven\n#else\nzero\n#endif";
        assert_eq!(run_standard(source), "even\n");
    }

    #[test]
    fn test_nested_contexts() {
        let source = "#define A 1\n#if A\n#for I [1,2]\n<[I]>\n#endfor\n#endif";
        assert_eq!(run_standard(source), "<1>\n<2>\n");
    }

    #[test]
    fn test_undef() {
        let source = "#define X 5\n#undef X\n#ifdef X\nyes\n#else\nno\n#endif";
        assert_eq!(run_standard(source), "no\n");
    }

    #[test]
    fn test_ifndef() {
        assert_eq!(run_standard("#ifndef Y\nmissing\n#endif"), "missing\n");
    }

    #[test]
    fn test_raw_text_passes_through() {
        assert_eq!(run_standard("hello there, 1 + 1 world"), "hello there, 1 + 1 world");
    }

    #[test]
    fn test_include() {
        let engine = Engine::new().with_all(standard());
        let mut environment = Environment::new();
        engine
            .load(&mut environment, Document::new("header", "=[T]=\n"))
            .unwrap();
        engine
            .load(
                &mut environment,
                Document::new("main", "#define T x\n#include \"header\"\ndone"),
            )
            .unwrap();

        assert_eq!(environment.execute("main").unwrap(), "=x=\ndone");
    }

    #[test]
    fn test_unclosed_if_fails() {
        let engine = Engine::new().with_all(standard());
        assert!(engine.compile(Document::new("main", "#if X\nok")).is_err());
    }

    #[test]
    fn test_else_outside_context_fails() {
        let engine = Engine::new().with_all(standard());
        assert!(engine.compile(Document::new("main", "#else\n")).is_err());
    }

    #[test]
    fn test_double_else_fails() {
        let engine = Engine::new().with_all(standard());
        let source = "#if X\na\n#else\nb\n#else\nc\n#endif";
        assert!(engine.compile(Document::new("main", source)).is_err());
    }

    #[test]
    fn test_determinism() {
        let engine = Engine::new().with_all(standard());
        let mut environment = Environment::new();
        engine
            .load(
                &mut environment,
                Document::new("main", "#define X 3\n[X * X]"),
            )
            .unwrap();

        let first = environment.execute("main").unwrap();
        let second = environment.execute("main").unwrap();
        assert_eq!(first, "9");
        assert_eq!(first, second);
    }

    #[test]
    fn test_environment_round_trip_still_executes() {
        let engine = Engine::new().with_all(standard());
        let mut environment = Environment::new();
        engine
            .load(&mut environment, Document::new("main", "#define X 5\n[X]"))
            .unwrap();

        let text = serde_json::to_string(&environment).unwrap();
        let back: Environment = serde_json::from_str(&text).unwrap();
        assert_eq!(back.execute("main").unwrap(), "5");
    }

    /// Compile and execute one document through the expression bundle.
    fn run_expression(source: &str) -> String {
        run(expression(), source)
    }

    /// Compile and execute one document through the template bundle.
    fn run_standard(source: &str) -> String {
        run(standard(), source)
    }

    fn run(specs: Vec<crate::spec::Spec>, source: &str) -> String {
        let engine = Engine::new().with_all(specs);
        let mut environment = Environment::new();
        engine
            .load(&mut environment, Document::new("main", source))
            .unwrap();
        environment.execute("main").unwrap()
    }
}
