use crate::{analyze::Analyzer, compile::Compiler, environment::Compilation, log::Error, parse::Parser};

/// Describes a type that can rewrite a whole compilation between the
/// analysis and compile phases.
///
/// A processor returns `true` when it modified the compilation; the
/// process phase repeats until a full pass modifies nothing.
pub trait Processor {
    /// Process the given compilation.
    fn process(&self, compilation: &mut Compilation) -> Result<bool, Error>;
}

impl<F> Processor for F
where
    F: Fn(&mut Compilation) -> Result<bool, Error>,
{
    fn process(&self, compilation: &mut Compilation) -> Result<bool, Error> {
        self(compilation)
    }
}

/// A named bundle of pipeline functions: the only extension surface of
/// the engine.
///
/// A spec provides any subset of a parser, an analyzer, a processor and a
/// compiler. The order specs are registered in is meaningful: analyzers
/// run in registry order within each pass (which is what encodes operator
/// precedence), and the first compiler to accept a tree wins.
pub struct Spec {
    name: String,
    parser: Option<Box<dyn Parser>>,
    analyzer: Option<Box<dyn Analyzer>>,
    processor: Option<Box<dyn Processor>>,
    compiler: Option<Box<dyn Compiler>>,
}

impl Spec {
    /// Create a new empty Spec with the given name.
    pub fn new<T>(name: T) -> Self
    where
        T: Into<String>,
    {
        Self {
            name: name.into(),
            parser: None,
            analyzer: None,
            processor: None,
            compiler: None,
        }
    }

    /// Set the parser of the Spec.
    ///
    /// Returns the `Spec`, so additional methods may be chained.
    pub fn with_parser(mut self, parser: impl Parser + 'static) -> Self {
        self.parser = Some(Box::new(parser));
        self
    }

    /// Set the analyzer of the Spec.
    ///
    /// Returns the `Spec`, so additional methods may be chained.
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzer = Some(Box::new(analyzer));
        self
    }

    /// Set the processor of the Spec.
    ///
    /// Returns the `Spec`, so additional methods may be chained.
    pub fn with_processor(mut self, processor: impl Processor + 'static) -> Self {
        self.processor = Some(Box::new(processor));
        self
    }

    /// Set the compiler of the Spec.
    ///
    /// Returns the `Spec`, so additional methods may be chained.
    pub fn with_compiler(mut self, compiler: impl Compiler + 'static) -> Self {
        self.compiler = Some(Box::new(compiler));
        self
    }

    /// Return the name of the Spec.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the parser of the Spec, if it has one.
    pub fn parser(&self) -> Option<&dyn Parser> {
        self.parser.as_deref()
    }

    /// Return the analyzer of the Spec, if it has one.
    pub fn analyzer(&self) -> Option<&dyn Analyzer> {
        self.analyzer.as_deref()
    }

    /// Return the processor of the Spec, if it has one.
    pub fn processor(&self) -> Option<&dyn Processor> {
        self.processor.as_deref()
    }

    /// Return the compiler of the Spec, if it has one.
    pub fn compiler(&self) -> Option<&dyn Compiler> {
        self.compiler.as_deref()
    }
}
