use crate::{
    compile::Compiler,
    document::Document,
    environment::{Compilation, Environment},
    instruction::Instruction,
    log::Error,
    spec::Spec,
    tree::TreeId,
};

/// The cap on fixed point passes; a pipeline that keeps modifying the
/// tree past this is not converging.
const FIXED_POINT_LIMIT: usize = 1024;

/// Drives documents through the compilation pipeline: parse to a fixed
/// point, analyze to a fixed point, process to a fixed point, then lower
/// the tree into one instruction.
///
/// The engine owns the spec registry; everything it produces lands in an
/// [`Environment`], which is where execution happens.
///
/// # Examples
///
/// ```
/// use jamplate::{dialect, Document, Engine, Environment};
///
/// let engine = Engine::new().with_all(dialect::standard());
/// let mut environment = Environment::new();
/// engine
///     .load(&mut environment, Document::new("main", "#define X 5\n[X]"))
///     .unwrap();
///
/// assert_eq!(environment.execute("main").unwrap(), "5");
/// ```
#[derive(Default)]
pub struct Engine {
    specs: Vec<Spec>,
}

impl Engine {
    /// Create a new Engine with no specs.
    pub fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Add a spec to the registry.
    pub fn add(&mut self, spec: Spec) {
        self.specs.push(spec);
    }

    /// Add a spec to the registry.
    ///
    /// Returns the Engine, so additional methods may be chained.
    pub fn with(mut self, spec: Spec) -> Self {
        self.add(spec);
        self
    }

    /// Add a sequence of specs to the registry, keeping their order.
    ///
    /// Returns the Engine, so additional methods may be chained.
    pub fn with_all<I>(mut self, specs: I) -> Self
    where
        I: IntoIterator<Item = Spec>,
    {
        self.specs.extend(specs);
        self
    }

    /// Compile the given document and register the result in the
    /// environment under the document's name.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when any pipeline phase fails.
    pub fn load(&self, environment: &mut Environment, document: Document) -> Result<(), Error> {
        let compilation = self.compile(document)?;
        environment.insert(compilation);
        Ok(())
    }

    /// Run the whole pipeline over the given document.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when any pipeline phase fails.
    pub fn compile(&self, document: Document) -> Result<Compilation, Error> {
        let mut compilation = Compilation::new(document)?;
        self.parse(&mut compilation)?;
        self.analyze(&mut compilation)?;
        self.process(&mut compilation)?;
        let instruction = self.lower(&compilation)?;
        compilation.set_instruction(instruction);
        Ok(compilation)
    }

    /// Run every spec parser over the compilation until a full pass
    /// produces no new tree.
    fn parse(&self, compilation: &mut Compilation) -> Result<(), Error> {
        let root = compilation.forest().root();
        for _ in 0..FIXED_POINT_LIMIT {
            let mut modified = false;
            for spec in &self.specs {
                if let Some(parser) = spec.parser() {
                    for (target, proto) in parser.parse(compilation, root)? {
                        modified |= compilation.forest_mut().offer(target, proto)?.modified;
                    }
                }
            }
            if !modified {
                return Ok(());
            }
        }
        Err(self.error_divergence(compilation, "parsing"))
    }

    /// Run every spec analyzer over the compilation until a full pass
    /// modifies nothing.
    fn analyze(&self, compilation: &mut Compilation) -> Result<(), Error> {
        let root = compilation.forest().root();
        for _ in 0..FIXED_POINT_LIMIT {
            let mut modified = false;
            for spec in &self.specs {
                if let Some(analyzer) = spec.analyzer() {
                    modified |= analyzer.analyze(compilation, root)?;
                }
            }
            if !modified {
                return Ok(());
            }
        }
        Err(self.error_divergence(compilation, "analysis"))
    }

    /// Run every spec processor over the compilation until a full pass
    /// modifies nothing.
    fn process(&self, compilation: &mut Compilation) -> Result<(), Error> {
        for _ in 0..FIXED_POINT_LIMIT {
            let mut modified = false;
            for spec in &self.specs {
                if let Some(processor) = spec.processor() {
                    modified |= processor.process(compilation)?;
                }
            }
            if !modified {
                return Ok(());
            }
        }
        Err(self.error_divergence(compilation, "processing"))
    }

    /// Lower the enriched tree into a single root instruction through the
    /// spec compilers, in registry order.
    fn lower(&self, compilation: &Compilation) -> Result<Instruction, Error> {
        // The registry itself is the root compiler, so spec compilers can
        // recurse through the whole fallback chain.
        let registry = Registry { specs: &self.specs };
        match registry.compile(&registry, compilation, compilation.forest().root())? {
            Some(instruction) => Ok(instruction),
            None => Err(Error::build("no compiler matched the document")
                .document(compilation.document().name())
                .help("register a spec with a root compiler, such as the document spec")),
        }
    }

    fn error_divergence(&self, compilation: &Compilation, phase: &str) -> Error {
        Error::build("fixed point did not converge")
            .document(compilation.document().name())
            .help(format!(
                "{phase} kept modifying the tree after {FIXED_POINT_LIMIT} passes, \
                a spec is likely re-offering fresh trees every pass"
            ))
    }
}

/// The fallback chain over every spec compiler, in registry order.
struct Registry<'a> {
    specs: &'a [Spec],
}

impl Compiler for Registry<'_> {
    fn compile(
        &self,
        root: &dyn Compiler,
        compilation: &Compilation,
        tree: TreeId,
    ) -> Result<Option<Instruction>, Error> {
        for spec in self.specs {
            if let Some(compiler) = spec.compiler() {
                if let Some(instruction) = compiler.compile(root, compilation, tree)? {
                    return Ok(Some(instruction));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::Engine;
    use crate::{dialect, document::Document};

    #[test]
    fn test_parse_fixed_point_is_stable() {
        let engine = Engine::new().with_all(dialect::standard());
        let mut compilation = engine
            .compile(Document::new("main", "#define X 5\n#if X\n[X * 2]\n#endif"))
            .unwrap();

        // One more pass over a converged tree must not modify it.
        let specs = dialect::standard();
        let root = compilation.forest().root();
        for spec in &specs {
            if let Some(parser) = spec.parser() {
                for (target, proto) in parser.parse(&compilation, root).unwrap() {
                    let offered = compilation.forest_mut().offer(target, proto).unwrap();
                    assert!(!offered.modified, "spec `{}` re-offered a tree", spec.name());
                }
            }
        }
    }

    #[test]
    fn test_compile_requires_a_root_compiler() {
        // Syntax specs alone carry no compiler at all.
        let engine = Engine::new().with(dialect::syntax::numbers());
        assert!(engine.compile(Document::new("main", "1")).is_err());
    }
}
