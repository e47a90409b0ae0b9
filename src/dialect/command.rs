//! The command specs: hash-prefixed lines parsed into command trees with
//! `key` and `parameter` components.
//!
//! A command occupies its whole line *including the trailing newline*, so
//! command lines never emit a line break into the output.

use crate::{
    compile::{Compiler, KindCompiler},
    dialect::{kind, parameter, weight},
    environment::Compilation,
    instruction::{Instruction, Op},
    log::{Error, MISSING_COMPONENTS},
    parse::{hierarchy, PatternParser},
    spec::Spec,
    tree::{Proto, TreeId},
};
use regex::Regex;

/// The argument shape of a command.
enum Shape {
    /// No arguments, like `#endif`.
    Bare,
    /// One address, like `#undef X`.
    Key,
    /// One parameter, like `#if X % 2`.
    Param,
    /// An address then a parameter, like `#define X 5`.
    KeyParam,
}

/// `#define NAME value`: evaluate the value and define the address.
pub fn define() -> Spec {
    command("command:define", "define", kind::COMMAND_DEFINE, Shape::KeyParam)
        .with_compiler(define_compiler(kind::COMMAND_DEFINE))
}

/// `#declare NAME value`: same contract as define.
pub fn declare() -> Spec {
    command("command:declare", "declare", kind::COMMAND_DECLARE, Shape::KeyParam)
        .with_compiler(define_compiler(kind::COMMAND_DECLARE))
}

/// `#undef NAME`: drop the address from the heap and the definitions.
pub fn undef() -> Spec {
    command("command:undef", "undef", kind::COMMAND_UNDEF, Shape::Key).with_compiler(
        KindCompiler::new(
            kind::COMMAND_UNDEF,
            |_root: &dyn Compiler, compilation: &Compilation, tree: TreeId| -> Result<Option<Instruction>, Error> {
                let address = key_of(compilation, tree)?;
                Ok(Some(Instruction::traced(
                    Op::Free { address },
                    compilation.trace(tree),
                )))
            },
        ),
    )
}

/// `#include name`: execute another loaded document in place.
pub fn include() -> Spec {
    command("command:include", "include", kind::COMMAND_INCLUDE, Shape::Param).with_compiler(
        KindCompiler::new(
            kind::COMMAND_INCLUDE,
            |_root: &dyn Compiler, compilation: &Compilation, tree: TreeId| -> Result<Option<Instruction>, Error> {
                let name = match compilation.forest().component(tree, "parameter") {
                    Some(parameter) => parameter::compile(compilation, parameter)?,
                    None => return Err(error_missing(compilation, tree, "a document name")),
                };
                Ok(Some(Instruction::traced(
                    Op::Import { name: name.boxed() },
                    compilation.trace(tree),
                )))
            },
        ),
    )
}

/// `#if parameter`: opens a conditional context.
pub fn if_() -> Spec {
    command("command:if", "if", kind::COMMAND_IF, Shape::Param)
}

/// `#ifdef NAME`: conditional on the address being defined.
pub fn ifdef() -> Spec {
    command("command:ifdef", "ifdef", kind::COMMAND_IFDEF, Shape::Key)
}

/// `#ifndef NAME`: conditional on the address being undefined.
pub fn ifndef() -> Spec {
    command("command:ifndef", "ifndef", kind::COMMAND_IFNDEF, Shape::Key)
}

/// `#elif parameter`: an alternate branch of a conditional context.
pub fn elif() -> Spec {
    command("command:elif", "elif", kind::COMMAND_ELIF, Shape::Param)
}

/// `#else`: the fallback branch of a conditional context.
pub fn else_() -> Spec {
    command("command:else", "else", kind::COMMAND_ELSE, Shape::Bare)
}

/// `#endif`: closes a conditional context.
pub fn endif() -> Spec {
    command("command:endif", "endif", kind::COMMAND_ENDIF, Shape::Bare)
}

/// `#for NAME iterable`: opens an iteration context.
pub fn for_() -> Spec {
    command("command:for", "for", kind::COMMAND_FOR, Shape::KeyParam)
}

/// `#endfor`: closes an iteration context.
pub fn endfor() -> Spec {
    command("command:endfor", "endfor", kind::COMMAND_ENDFOR, Shape::Bare)
}

/// Build a command spec: a line-anchored pattern parser producing a
/// command tree with `key`/`parameter` components per the shape.
fn command(name: &str, word: &str, command_kind: &'static str, shape: Shape) -> Spec {
    let has_key = matches!(shape, Shape::Key | Shape::KeyParam);
    let pattern = match shape {
        Shape::Bare => format!(r"(?m)^#{word}[ \t]*(?:\n|$)"),
        Shape::Key => format!(r"(?m)^#{word}[ \t]+([A-Za-z_]\w*)[ \t]*(?:\n|$)"),
        Shape::Param => format!(r"(?m)^#{word}(?:[ \t]+([^\n]*?))?[ \t]*(?:\n|$)"),
        Shape::KeyParam => {
            format!(r"(?m)^#{word}[ \t]+([A-Za-z_]\w*)(?:[ \t]+([^\n]*?))?[ \t]*(?:\n|$)")
        }
    };
    let pattern = Regex::new(&pattern).expect("dialect pattern must compile");

    Spec::new(name).with_parser(hierarchy(PatternParser::new(pattern, move |groups| {
        let whole = groups[0]?;
        let mut proto = Proto::new(command_kind, weight::ATOM, whole);

        let mut index = 1;
        if has_key {
            let key = groups.get(index).copied().flatten()?;
            proto = proto.component("key", Proto::new(kind::WORD, weight::ATOM, key));
            index += 1;
        }
        if let Some(param) = groups.get(index).copied().flatten() {
            if !param.is_empty() {
                proto = proto.component(
                    "parameter",
                    Proto::new(kind::PARAMETER, weight::OPERAND, param),
                );
            }
        }

        Some(proto)
    })))
}

/// The shared compiler of `#define` and `#declare`: evaluate the
/// parameter (empty when absent) and store it at the key.
fn define_compiler(command_kind: &'static str) -> KindCompiler {
    KindCompiler::new(
        command_kind,
        |_root: &dyn Compiler, compilation: &Compilation, tree: TreeId| -> Result<Option<Instruction>, Error> {
            let address = key_of(compilation, tree)?;
            let instruction = match compilation.forest().component(tree, "parameter") {
                Some(parameter) => parameter::compile(compilation, parameter)?,
                None => Instruction::new(Op::Idle),
            };
            Ok(Some(Instruction::traced(
                Op::Define {
                    address,
                    instruction: instruction.boxed(),
                },
                compilation.trace(tree),
            )))
        },
    )
}

/// Read the key component of a command.
pub(crate) fn key_of(compilation: &Compilation, tree: TreeId) -> Result<String, Error> {
    match compilation.forest().component(tree, "key") {
        Some(key) => Ok(compilation.read(key)?.to_string()),
        None => Err(error_missing(compilation, tree, "an address")),
    }
}

fn error_missing(compilation: &Compilation, tree: TreeId, what: &str) -> Error {
    let mut error = Error::build(format!(
        "Command `{}` is {MISSING_COMPONENTS}",
        compilation.forest().kind(tree)
    ))
    .document(compilation.document().name())
    .help(format!("the command requires {what}"));
    if let Ok(source) = compilation.source() {
        error = error.pointer(source, compilation.forest().reference(tree));
    }
    error
}

#[cfg(test)]
mod tests {
    use super::define;
    use crate::{document::Document, environment::Compilation};

    #[test]
    fn test_define_parses_key_and_parameter() {
        let mut compilation =
            Compilation::new(Document::new("test", "#define X 5\nrest")).unwrap();
        let root = compilation.forest().root();
        let spec = define();
        let parser = spec.parser().unwrap();

        for (target, proto) in parser.parse(&compilation, root).unwrap() {
            compilation.forest_mut().offer(target, proto).unwrap();
        }

        let command = compilation.forest().children(root)[0];
        // The command owns its trailing newline.
        assert_eq!(compilation.read(command).unwrap(), "#define X 5\n");
        let key = compilation.forest().component(command, "key").unwrap();
        let parameter = compilation
            .forest()
            .component(command, "parameter")
            .unwrap();
        assert_eq!(compilation.read(key).unwrap(), "X");
        assert_eq!(compilation.read(parameter).unwrap(), "5");
    }

    #[test]
    fn test_define_without_value() {
        let mut compilation = Compilation::new(Document::new("test", "#define X")).unwrap();
        let root = compilation.forest().root();
        let spec = define();
        let parser = spec.parser().unwrap();

        for (target, proto) in parser.parse(&compilation, root).unwrap() {
            compilation.forest_mut().offer(target, proto).unwrap();
        }

        let command = compilation.forest().children(root)[0];
        assert!(compilation.forest().component(command, "parameter").is_none());
    }
}
