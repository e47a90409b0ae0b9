//! The flow specs: processors that fold flat command runs into nested
//! context trees, and compilers that lower those contexts into branch and
//! repeat instructions.

use crate::{
    compile::{flatten_range, Compiler, KindCompiler, ReprintCompiler},
    dialect::{command, kind, parameter, weight},
    environment::Compilation,
    instruction::{Instruction, Op},
    log::{
        Error, DOUBLE_ELSE, ELIF_OUTSIDE_IF, ELSE_OUTSIDE_IF, ENDFOR_OUTSIDE_FOR,
        ENDIF_OUTSIDE_IF, MISSING_COMPONENTS, UNCLOSED_FOR, UNCLOSED_IF,
    },
    reference::Reference,
    spec::Spec,
    tree::{Proto, TreeId},
};

/// The conditional context: wraps `#if`/`#ifdef`/`#ifndef` ... `#endif`
/// runs into `flow:if` trees and compiles them into nested branches.
pub fn conditional() -> Spec {
    Spec::new("flow:if")
        .with_processor(process_if)
        .with_compiler(KindCompiler::new(kind::FLOW_IF, compile_if))
}

/// The iteration context: wraps `#for` ... `#endfor` runs into
/// `flow:for` trees and compiles them into repeat instructions.
pub fn iteration() -> Spec {
    Spec::new("flow:for")
        .with_processor(process_for)
        .with_compiler(KindCompiler::new(kind::FLOW_FOR, compile_for))
}

/// What a context scan decided to do.
enum Action {
    /// The context spans the whole tree: re-kind it in place.
    SetKind(TreeId),
    /// Wrap the context span in a new tree offered to the target.
    Wrap(TreeId, Reference),
}

/// Fold one `#if ... #endif` run per pass.
///
/// The last unmatched opener pairs with the first closer, so inner
/// contexts fold before the outer ones; the fixed point folds them all.
fn process_if(compilation: &mut Compilation) -> Result<bool, Error> {
    let action = {
        let forest = compilation.forest();
        let source = compilation.source()?;
        let name = compilation.document().name();
        let mut action = None;

        'trees: for tree in forest.collect(forest.root()) {
            if forest.kind(tree) == kind::FLOW_IF {
                continue;
            }
            let mut if_tree: Option<TreeId> = None;
            let mut else_tree: Option<TreeId> = None;

            for child in forest.children(tree) {
                match forest.kind(child) {
                    kind::COMMAND_IF | kind::COMMAND_IFDEF | kind::COMMAND_IFNDEF => {
                        if_tree = Some(child);
                        else_tree = None;
                    }
                    kind::COMMAND_ELIF => {
                        if if_tree.is_none() {
                            return Err(error_context(ELIF_OUTSIDE_IF, name, source, forest, child));
                        }
                    }
                    kind::COMMAND_ELSE => {
                        if if_tree.is_none() {
                            return Err(error_context(ELSE_OUTSIDE_IF, name, source, forest, child));
                        }
                        if else_tree.is_some() {
                            return Err(error_context(DOUBLE_ELSE, name, source, forest, child));
                        }
                        else_tree = Some(child);
                    }
                    kind::COMMAND_ENDIF => match if_tree {
                        Some(opener) => {
                            let span = forest
                                .reference(opener)
                                .combine(forest.reference(child));
                            action = Some(if span == forest.reference(tree) {
                                Action::SetKind(tree)
                            } else {
                                Action::Wrap(tree, span)
                            });
                            break 'trees;
                        }
                        None => {
                            return Err(error_context(ENDIF_OUTSIDE_IF, name, source, forest, child))
                        }
                    },
                    _ => {}
                }
            }

            if let Some(opener) = if_tree {
                return Err(error_context(UNCLOSED_IF, name, source, forest, opener));
            }
        }
        action
    };

    apply(compilation, action, kind::FLOW_IF)
}

/// Fold one `#for ... #endfor` run per pass.
fn process_for(compilation: &mut Compilation) -> Result<bool, Error> {
    let action = {
        let forest = compilation.forest();
        let source = compilation.source()?;
        let name = compilation.document().name();
        let mut action = None;

        'trees: for tree in forest.collect(forest.root()) {
            if forest.kind(tree) == kind::FLOW_FOR {
                continue;
            }
            let mut for_tree: Option<TreeId> = None;

            for child in forest.children(tree) {
                match forest.kind(child) {
                    kind::COMMAND_FOR => for_tree = Some(child),
                    kind::COMMAND_ENDFOR => match for_tree {
                        Some(opener) => {
                            let span = forest
                                .reference(opener)
                                .combine(forest.reference(child));
                            action = Some(if span == forest.reference(tree) {
                                Action::SetKind(tree)
                            } else {
                                Action::Wrap(tree, span)
                            });
                            break 'trees;
                        }
                        None => {
                            return Err(error_context(
                                ENDFOR_OUTSIDE_FOR,
                                name,
                                source,
                                forest,
                                child,
                            ))
                        }
                    },
                    _ => {}
                }
            }

            if let Some(opener) = for_tree {
                return Err(error_context(UNCLOSED_FOR, name, source, forest, opener));
            }
        }
        action
    };

    apply(compilation, action, kind::FLOW_FOR)
}

fn apply(
    compilation: &mut Compilation,
    action: Option<Action>,
    flow_kind: &str,
) -> Result<bool, Error> {
    match action {
        None => Ok(false),
        Some(Action::SetKind(tree)) => {
            compilation.forest_mut().sketch_mut(tree).set_kind(flow_kind);
            Ok(true)
        }
        Some(Action::Wrap(tree, span)) => {
            compilation
                .forest_mut()
                .offer(tree, Proto::new(flow_kind, weight::ATOM, span))?;
            Ok(true)
        }
    }
}

/// Lower a conditional context into nested branches, built right to left
/// so the innermost otherwise is the `#else` body (or nothing).
fn compile_if(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
) -> Result<Option<Instruction>, Error> {
    let forest = compilation.forest();

    struct Part {
        command: TreeId,
        body: Vec<TreeId>,
    }
    let mut branches: Vec<Part> = Vec::new();
    let mut otherwise: Option<Part> = None;
    let mut end = None;

    for child in forest.children(tree) {
        match forest.kind(child) {
            kind::COMMAND_IF | kind::COMMAND_IFDEF | kind::COMMAND_IFNDEF | kind::COMMAND_ELIF => {
                branches.push(Part {
                    command: child,
                    body: Vec::new(),
                });
            }
            kind::COMMAND_ELSE => {
                otherwise = Some(Part {
                    command: child,
                    body: Vec::new(),
                });
            }
            kind::COMMAND_ENDIF => {
                end = Some(child);
                break;
            }
            _ => match &mut otherwise {
                Some(part) => part.body.push(child),
                None => match branches.last_mut() {
                    Some(part) => part.body.push(child),
                    None => {}
                },
            },
        }
    }

    let end = end.ok_or_else(|| {
        Error::build(UNCLOSED_IF).document(compilation.document().name())
    })?;

    // Each body spans from the end of its own command to the start of
    // the next one.
    let mut boundary = forest.reference(end).position;
    let mut assembled: Option<Instruction> = match &otherwise {
        Some(part) => {
            let span = Reference::from(forest.reference(part.command).end()..boundary);
            boundary = forest.reference(part.command).position;
            Some(body_block(root, compilation, &part.body, span)?)
        }
        None => None,
    };

    for part in branches.iter().rev() {
        let span = Reference::from(forest.reference(part.command).end()..boundary);
        boundary = forest.reference(part.command).position;

        let condition = condition_of(compilation, part.command)?;
        let then = body_block(root, compilation, &part.body, span)?;
        assembled = Some(Instruction::traced(
            Op::Branch {
                condition: condition.boxed(),
                then: then.boxed(),
                otherwise: assembled.map(Instruction::boxed),
            },
            compilation.trace(part.command),
        ));
    }

    match assembled {
        Some(instruction) => Ok(Some(instruction)),
        None => Err(Error::build(format!(
            "Conditional context is {MISSING_COMPONENTS}"
        ))
        .document(compilation.document().name())
        .help("a conditional context must open with `#if`, `#ifdef` or `#ifndef`")),
    }
}

/// Lower an iteration context into a repeat instruction.
fn compile_for(
    root: &dyn Compiler,
    compilation: &Compilation,
    tree: TreeId,
) -> Result<Option<Instruction>, Error> {
    let forest = compilation.forest();
    let children = forest.children(tree);

    let opener = children
        .first()
        .copied()
        .filter(|child| forest.kind(*child) == kind::COMMAND_FOR)
        .ok_or_else(|| {
            Error::build(format!("Iteration context is {MISSING_COMPONENTS}"))
                .document(compilation.document().name())
                .help("an iteration context must open with `#for`")
        })?;
    let end = children
        .iter()
        .copied()
        .find(|child| forest.kind(*child) == kind::COMMAND_ENDFOR)
        .ok_or_else(|| {
            Error::build(UNCLOSED_FOR).document(compilation.document().name())
        })?;

    let address = command::key_of(compilation, opener)?;
    let iterable = match forest.component(opener, "parameter") {
        Some(parameter) => parameter::compile(compilation, parameter)?,
        None => {
            return Err(Error::build(format!(
                "Command `{}` is {MISSING_COMPONENTS}",
                kind::COMMAND_FOR
            ))
            .document(compilation.document().name())
            .pointer(compilation.source()?, forest.reference(opener))
            .help("the command requires an iterable parameter"))
        }
    };

    let body: Vec<TreeId> = children
        .into_iter()
        .filter(|child| *child != opener && *child != end)
        .take_while(|child| forest.reference(*child).end() <= forest.reference(end).position)
        .collect();
    let span = Reference::from(forest.reference(opener).end()..forest.reference(end).position);
    let body = body_block(root, compilation, &body, span)?;

    Ok(Some(Instruction::traced(
        Op::Repeat {
            address,
            iterable: iterable.boxed(),
            body: body.boxed(),
        },
        compilation.trace(tree),
    )))
}

/// Compile a run of body trees, reprinting the raw gaps between them.
fn body_block(
    root: &dyn Compiler,
    compilation: &Compilation,
    children: &[TreeId],
    span: Reference,
) -> Result<Instruction, Error> {
    let trace = crate::instruction::Trace {
        document: compilation.document().name().to_string(),
        reference: span,
        kind: "flow:body".to_string(),
    };
    flatten_range(root, compilation, &ReprintCompiler, children, span, trace)
}

/// Build the condition instruction of a branch command.
fn condition_of(compilation: &Compilation, command: TreeId) -> Result<Instruction, Error> {
    let forest = compilation.forest();
    let trace = compilation.trace(command);
    match forest.kind(command) {
        kind::COMMAND_IFDEF => {
            let address = command::key_of(compilation, command)?;
            Ok(Instruction::traced(Op::IsDefined { address }, trace))
        }
        kind::COMMAND_IFNDEF => {
            let address = command::key_of(compilation, command)?;
            Ok(Instruction::traced(Op::IsUndefined { address }, trace))
        }
        _ => match forest.component(command, "parameter") {
            Some(parameter) => parameter::compile(compilation, parameter),
            None => Err(Error::build(format!(
                "Command `{}` is {MISSING_COMPONENTS}",
                forest.kind(command)
            ))
            .document(compilation.document().name())
            .pointer(compilation.source()?, forest.reference(command))
            .help("the command requires a condition parameter")),
        },
    }
}

fn error_context(
    reason: &str,
    name: &str,
    source: &str,
    forest: &crate::tree::Forest,
    tree: TreeId,
) -> Error {
    Error::build(reason)
        .document(name)
        .pointer(source, forest.reference(tree))
}

#[cfg(test)]
mod tests {
    use crate::{
        dialect::{kind, standard},
        document::Document,
        engine::Engine,
    };

    #[test]
    fn test_context_folds_innermost_first() {
        let engine = Engine::new().with_all(standard());
        let source = "#if A\n#if B\nx\n#endif\n#endif";
        let compilation = engine.compile(Document::new("test", source)).unwrap();

        let forest = compilation.forest();
        // The whole document is the outer context, re-kinded in place.
        assert_eq!(forest.kind(forest.root()), kind::FLOW_IF);

        let inner = forest
            .children(forest.root())
            .into_iter()
            .find(|child| forest.kind(*child) == kind::FLOW_IF)
            .expect("the inner context must fold into its own tree");
        let inner_children = forest.children(inner);
        assert_eq!(forest.kind(inner_children[0]), kind::COMMAND_IF);
    }

    #[test]
    fn test_elif_outside_context_fails() {
        let engine = Engine::new().with_all(standard());
        assert!(engine.compile(Document::new("test", "#elif X\n")).is_err());
    }

    #[test]
    fn test_endfor_outside_context_fails() {
        let engine = Engine::new().with_all(standard());
        assert!(engine.compile(Document::new("test", "#endfor\n")).is_err());
    }
}
