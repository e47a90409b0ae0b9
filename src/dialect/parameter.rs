//! Compilation of parameters: the expression context used by command
//! arguments, operator operands, enclosure bodies and injections.
//!
//! A compiled parameter always evaluates to exactly one value: it opens a
//! frame, compiles its items into it, and glues the frame shut.

use crate::{
    dialect::kind,
    environment::Compilation,
    instruction::{Instruction, Op},
    log::{Error, MISSING_COMPONENTS, UNRECOGNIZED_PARAMETER},
    tree::TreeId,
};

/// Compile the given tree as a parameter.
///
/// # Errors
///
/// Returns an [`Error`] when the tree holds text no syntax spec claimed,
/// or an operator is missing components.
pub fn compile(compilation: &Compilation, tree: TreeId) -> Result<Instruction, Error> {
    let mut children = vec![Instruction::new(Op::PushFrame)];

    // Anything between the parsed items must be whitespace; a parameter
    // has no raw text.
    for gap in compilation.forest().unreserved(tree) {
        let text = gap.literal(compilation.source()?);
        if !text.trim().is_empty() {
            return Err(Error::build(UNRECOGNIZED_PARAMETER)
                .document(compilation.document().name())
                .pointer(compilation.source()?, gap)
                .help("this text is not part of any recognized parameter syntax"));
        }
    }

    for child in compilation.forest().children(tree) {
        if let Some(instruction) = item(compilation, child)? {
            children.push(instruction);
        }
    }

    children.push(Instruction::new(Op::GlueFrame));
    Ok(Instruction::traced(
        Op::Block { children },
        compilation.trace(tree),
    ))
}

/// Compile one item of a parameter.
fn item(compilation: &Compilation, tree: TreeId) -> Result<Option<Instruction>, Error> {
    let trace = compilation.trace(tree);
    let instruction = match compilation.forest().kind(tree) {
        kind::NUMBER => Instruction::traced(
            Op::PushConst {
                text: compilation.read(tree)?.to_string(),
            },
            trace,
        ),
        kind::WORD => Instruction::traced(
            Op::Access {
                address: Some(compilation.read(tree)?.to_string()),
            },
            trace,
        ),
        kind::QUOTES => {
            let body = body_of(compilation, tree)?;
            Instruction::traced(
                Op::PushConst {
                    text: unescape(compilation.read(body)?),
                },
                trace,
            )
        }
        kind::PARENTHESES => {
            let body = body_of(compilation, tree)?;
            compile(compilation, body)?
        }
        kind::SQUARES => {
            let body = body_of(compilation, tree)?;
            Instruction::traced(
                Op::Block {
                    children: vec![compile(compilation, body)?, Instruction::new(Op::CastArray)],
                },
                trace,
            )
        }
        kind::BRACES => {
            let body = body_of(compilation, tree)?;
            Instruction::traced(
                Op::Block {
                    children: vec![compile(compilation, body)?, Instruction::new(Op::CastObject)],
                },
                trace,
            )
        }
        kind::OPERATOR_ADD => operator(compilation, tree, Op::Sum)?,
        kind::OPERATOR_SUBTRACT => operator(compilation, tree, Op::Difference)?,
        kind::OPERATOR_MULTIPLY => operator(compilation, tree, Op::Product)?,
        kind::OPERATOR_DIVIDE => operator(compilation, tree, Op::Quotient)?,
        kind::OPERATOR_REMAINDER => operator(compilation, tree, Op::Remainder)?,
        kind::OPERATOR_PAIR => operator(compilation, tree, Op::BuildPair)?,
        kind::COMMA => Instruction::traced(Op::Idle, trace),
        other => {
            return Err(Error::build(UNRECOGNIZED_PARAMETER)
                .document(compilation.document().name())
                .pointer(
                    compilation.source()?,
                    compilation.forest().reference(tree),
                )
                .help(format!("a `{other}` tree cannot appear in a parameter")))
        }
    };
    Ok(Some(instruction))
}

/// Compile an operator tree: both operands, then the combining opcode.
fn operator(compilation: &Compilation, tree: TreeId, op: Op) -> Result<Instruction, Error> {
    let forest = compilation.forest();
    let (left, right) = match (forest.component(tree, "left"), forest.component(tree, "right")) {
        (Some(left), Some(right)) => (left, right),
        _ => {
            let sign = match forest.component(tree, "sign") {
                Some(sign) => compilation.read(sign)?.to_string(),
                None => "?".to_string(),
            };
            return Err(Error::build(format!("Operator `{sign}` is {MISSING_COMPONENTS}"))
                .document(compilation.document().name())
                .pointer(compilation.source()?, forest.reference(tree))
                .help("both sides of a binary operator must hold a parameter"));
        }
    };

    Ok(Instruction::traced(
        Op::Block {
            children: vec![
                compile(compilation, left)?,
                compile(compilation, right)?,
                Instruction::traced(op, compilation.trace(tree)),
            ],
        },
        compilation.trace(tree),
    ))
}

/// Return the body component of an enclosure tree.
pub(crate) fn body_of(compilation: &Compilation, tree: TreeId) -> Result<TreeId, Error> {
    compilation.forest().component(tree, "body").ok_or_else(|| {
        Error::build(format!(
            "Enclosure `{}` is {MISSING_COMPONENTS}",
            compilation.forest().kind(tree)
        ))
        .document(compilation.document().name())
    })
}

/// Resolve the escape sequences of a quoted string body.
fn unescape(text: &str) -> String {
    let mut buffer = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            buffer.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => buffer.push('\n'),
            Some('t') => buffer.push('\t'),
            Some(other) => buffer.push(other),
            None => buffer.push('\\'),
        }
    }
    buffer
}
