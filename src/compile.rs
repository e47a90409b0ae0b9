use crate::{
    environment::Compilation,
    instruction::{Instruction, Op, Trace},
    log::Error,
    reference::Reference,
    tree::TreeId,
};

/// Describes a type that can lower a tree into an instruction.
///
/// The first argument is the root compiler of the whole registry; a
/// compiler recurses through it so every spec gets a chance at every
/// sub-tree. Returning `None` means "not mine", letting a fallback try
/// the next compiler in order.
pub trait Compiler {
    /// Compile the given tree, or decline it.
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error>;
}

impl<F> Compiler for F
where
    F: Fn(&dyn Compiler, &Compilation, TreeId) -> Result<Option<Instruction>, Error>,
{
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        self(root, compilation, tree)
    }
}

/// A compiler that only fires on trees of one kind.
pub struct KindCompiler {
    kind: String,
    inner: Box<dyn Compiler>,
}

impl KindCompiler {
    /// Create a new KindCompiler over the given kind.
    pub fn new<K>(kind: K, inner: impl Compiler + 'static) -> Self
    where
        K: Into<String>,
    {
        Self {
            kind: kind.into(),
            inner: Box::new(inner),
        }
    }
}

impl Compiler for KindCompiler {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        if compilation.forest().kind(tree) == self.kind {
            self.inner.compile(root, compilation, tree)
        } else {
            Ok(None)
        }
    }
}

/// A compiler that tries its sub-compilers in order and returns the first
/// result.
pub struct FallbackCompiler {
    compilers: Vec<Box<dyn Compiler>>,
}

impl FallbackCompiler {
    /// Create a new FallbackCompiler over the given compilers.
    pub fn new(compilers: Vec<Box<dyn Compiler>>) -> Self {
        Self { compilers }
    }
}

impl Compiler for FallbackCompiler {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        for compiler in &self.compilers {
            if let Some(instruction) = compiler.compile(root, compilation, tree)? {
                return Ok(Some(instruction));
            }
        }
        Ok(None)
    }
}

/// A compiler that compiles the children of a tree, picking the first
/// matching sub-compiler for each child and skipping unmatched children.
pub struct FirstCompileCompiler {
    compilers: Vec<Box<dyn Compiler>>,
}

impl FirstCompileCompiler {
    /// Create a new FirstCompileCompiler over the given compilers.
    pub fn new(compilers: Vec<Box<dyn Compiler>>) -> Self {
        Self { compilers }
    }
}

impl Compiler for FirstCompileCompiler {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        let mut children = Vec::new();
        for child in compilation.forest().children(tree) {
            for compiler in &self.compilers {
                if let Some(instruction) = compiler.compile(root, compilation, child)? {
                    children.push(instruction);
                    break;
                }
            }
        }
        Ok(Some(Instruction::traced(
            Op::Block { children },
            compilation.trace(tree),
        )))
    }
}

/// A compiler that lowers a tree into a block: children go through the
/// root compiler (falling back to the leaf compiler), and the raw gaps
/// between them are reprinted as constant text.
pub struct FlattenCompiler {
    leaf: Box<dyn Compiler>,
}

impl FlattenCompiler {
    /// Create a new FlattenCompiler with the given leaf compiler.
    pub fn new(leaf: impl Compiler + 'static) -> Self {
        Self {
            leaf: Box::new(leaf),
        }
    }
}

impl Compiler for FlattenCompiler {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        let children = compilation.forest().children(tree);
        let span = compilation.forest().reference(tree);
        let block = flatten_range(
            root,
            compilation,
            self.leaf.as_ref(),
            &children,
            span,
            compilation.trace(tree),
        )?;
        Ok(Some(block))
    }
}

/// Build a block over a run of sibling trees within a span: each tree
/// goes through the root compiler (falling back to the leaf compiler and
/// then to a reprint), and the gaps of raw text between them become
/// constant prints.
pub fn flatten_range(
    root: &dyn Compiler,
    compilation: &Compilation,
    leaf: &dyn Compiler,
    children: &[TreeId],
    span: Reference,
    trace: Trace,
) -> Result<Instruction, Error> {
    let source = compilation.source()?;
    let mut instructions = Vec::new();
    let mut position = span.position;

    let mut reprint = |from: usize, to: usize, instructions: &mut Vec<Instruction>| {
        if to > from {
            instructions.push(Instruction::new(Op::PrintText {
                text: source[from..to].to_string(),
            }));
        }
    };

    for child in children {
        let covered = compilation.forest().reference(*child);
        reprint(position, covered.position, &mut instructions);
        position = covered.end();

        match root.compile(root, compilation, *child)? {
            Some(instruction) => instructions.push(instruction),
            None => match leaf.compile(root, compilation, *child)? {
                Some(instruction) => instructions.push(instruction),
                None => reprint(covered.position, covered.end(), &mut instructions),
            },
        }
    }
    reprint(position, span.end(), &mut instructions);

    Ok(Instruction::traced(
        Op::Block {
            children: instructions,
        },
        trace,
    ))
}

/// A compiler that requires its inner compiler to match.
pub struct MandatoryCompiler {
    inner: Box<dyn Compiler>,
}

impl MandatoryCompiler {
    /// Create a new MandatoryCompiler over the given compiler.
    pub fn new(inner: impl Compiler + 'static) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }
}

impl Compiler for MandatoryCompiler {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        match self.inner.compile(root, compilation, tree)? {
            Some(instruction) => Ok(Some(instruction)),
            None => Err(Error::build("unable to compile tree")
                .document(compilation.document().name())
                .pointer(compilation.source()?, compilation.forest().reference(tree))
                .help(format!(
                    "no compiler recognized the `{}` tree",
                    compilation.forest().kind(tree)
                ))),
        }
    }
}

/// A compiler that turns every tree into an idle instruction.
pub struct ToIdleCompiler;

impl Compiler for ToIdleCompiler {
    fn compile(
        &self,
        _root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        Ok(Some(Instruction::traced(Op::Idle, compilation.trace(tree))))
    }
}

/// A compiler that pushes the literal text of every tree as a constant.
pub struct ToPushConstCompiler;

impl Compiler for ToPushConstCompiler {
    fn compile(
        &self,
        _root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        Ok(Some(Instruction::traced(
            Op::PushConst {
                text: compilation.read(tree)?.to_string(),
            },
            compilation.trace(tree),
        )))
    }
}

/// A compiler that reprints the literal text of every tree to the
/// console.
pub struct ReprintCompiler;

impl Compiler for ReprintCompiler {
    fn compile(
        &self,
        _root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        Ok(Some(Instruction::traced(
            Op::PrintText {
                text: compilation.read(tree)?.to_string(),
            },
            compilation.trace(tree),
        )))
    }
}

/// A compiler that declines every tree.
pub struct EmptyCompiler;

impl Compiler for EmptyCompiler {
    fn compile(
        &self,
        _root: &dyn Compiler,
        _compilation: &Compilation,
        _tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Compiler, EmptyCompiler, FallbackCompiler, FirstCompileCompiler, FlattenCompiler,
        KindCompiler, MandatoryCompiler, ReprintCompiler, ToIdleCompiler, ToPushConstCompiler,
    };
    use crate::{
        document::Document,
        environment::{Compilation, Environment},
        instruction::Op,
        memory::Memory,
        tree::Proto,
    };

    #[test]
    fn test_kind_compiler_declines_other_kinds() {
        let compilation = leaf_compilation();
        let compiler = KindCompiler::new("number", ToPushConstCompiler);
        let root = compilation.forest().root();
        let child = compilation.forest().children(root)[0];

        assert!(compiler
            .compile(&EmptyCompiler, &compilation, root)
            .unwrap()
            .is_none());
        assert!(compiler
            .compile(&EmptyCompiler, &compilation, child)
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_fallback_takes_first_match() {
        let compilation = leaf_compilation();
        let child = compilation.forest().children(compilation.forest().root())[0];
        let compiler = FallbackCompiler::new(vec![
            Box::new(EmptyCompiler),
            Box::new(KindCompiler::new("number", ToIdleCompiler)),
            Box::new(ToPushConstCompiler),
        ]);

        let instruction = compiler
            .compile(&EmptyCompiler, &compilation, child)
            .unwrap()
            .unwrap();
        assert_eq!(instruction.op(), &Op::Idle);
    }

    #[test]
    fn test_first_compile_over_children() {
        let compilation = leaf_compilation();
        let compiler = FirstCompileCompiler::new(vec![Box::new(KindCompiler::new(
            "number",
            ToPushConstCompiler,
        ))]);

        let instruction = compiler
            .compile(&EmptyCompiler, &compilation, compilation.forest().root())
            .unwrap()
            .unwrap();
        match instruction.op() {
            Op::Block { children } => assert_eq!(children.len(), 1),
            other => panic!("expected a block, got {other:?}"),
        }
    }

    #[test]
    fn test_mandatory_rejects_unmatched() {
        let compilation = leaf_compilation();
        let compiler = MandatoryCompiler::new(EmptyCompiler);

        let result = compiler.compile(&EmptyCompiler, &compilation, compilation.forest().root());
        assert!(result.is_err());
    }

    #[test]
    fn test_flatten_reprints_gaps() {
        let compilation = leaf_compilation();
        let compiler = FlattenCompiler::new(ReprintCompiler);

        let instruction = compiler
            .compile(&EmptyCompiler, &compilation, compilation.forest().root())
            .unwrap()
            .unwrap();

        // Executing the block reprints the whole source: the gaps as
        // constants, and the number through the leaf compiler.
        let environment = Environment::new();
        let mut memory = Memory::new();
        instruction.exec(&environment, &mut memory).unwrap();
        assert_eq!(memory.console(), "before 42 after");
    }

    /// A compilation holding one `number` tree between raw gaps.
    fn leaf_compilation() -> Compilation {
        let mut compilation = Compilation::new(Document::new("test", "before 42 after")).unwrap();
        let root = compilation.forest().root();
        compilation
            .forest_mut()
            .offer(root, Proto::new("number", 0, 7..9))
            .unwrap();
        compilation
    }
}
