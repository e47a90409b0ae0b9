use crate::{
    document::Document,
    instruction::{Instruction, Trace},
    log::Error,
    memory::Memory,
    sketch::Sketch,
    tree::{Forest, TreeId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind carried by the root tree of every compilation.
pub const DOCUMENT_KIND: &str = "document";

/// The weight of the root tree.
///
/// The root sits below every possible weight so a tree spanning the whole
/// document (an expression that fills it, a flow context that closes on
/// the last line) still nests inside the root instead of fighting it.
pub const ROOT_WEIGHT: i32 = i32::MIN;

/// One document together with its tree overlay and, once the pipeline has
/// finished, its compiled instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Compilation {
    document: Document,
    forest: Forest,
    instruction: Option<Instruction>,
}

impl Compilation {
    /// Create a new Compilation over the given document, with a root tree
    /// spanning the whole content.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the document is a shell.
    pub fn new(document: Document) -> Result<Self, Error> {
        let length = document.len()?;
        Ok(Self {
            document,
            forest: Forest::new(Sketch::new(DOCUMENT_KIND).weighted(ROOT_WEIGHT), length),
            instruction: None,
        })
    }

    /// Return the document of the Compilation.
    #[inline]
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Return the tree overlay of the Compilation.
    #[inline]
    pub fn forest(&self) -> &Forest {
        &self.forest
    }

    /// Return a mutable reference to the tree overlay.
    #[inline]
    pub fn forest_mut(&mut self) -> &mut Forest {
        &mut self.forest
    }

    /// Return the source text of the document.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the document is a shell.
    #[inline]
    pub fn source(&self) -> Result<&str, Error> {
        self.document.content()
    }

    /// Return the literal text covered by the given tree.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the document is a shell.
    pub fn read(&self, tree: TreeId) -> Result<&str, Error> {
        Ok(self.forest.reference(tree).literal(self.source()?))
    }

    /// Build a diagnostic trace for the given tree.
    pub fn trace(&self, tree: TreeId) -> Trace {
        Trace {
            document: self.document.name().to_string(),
            reference: self.forest.reference(tree),
            kind: self.forest.kind(tree).to_string(),
        }
    }

    /// Return the compiled instruction, if compilation has finished.
    #[inline]
    pub fn instruction(&self) -> Option<&Instruction> {
        self.instruction.as_ref()
    }

    /// Set the compiled instruction.
    pub fn set_instruction(&mut self, instruction: Instruction) {
        self.instruction = Some(instruction);
    }
}

/// The compilation registry an instruction tree executes within.
///
/// The environment is the persistent half of the engine: it can be
/// serialized and read back, at which point its documents are shells
/// (name only) but its instructions remain executable.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Environment {
    compilations: HashMap<String, Compilation>,
}

impl Environment {
    /// Create a new empty Environment.
    pub fn new() -> Self {
        Self {
            compilations: HashMap::new(),
        }
    }

    /// Register a compilation under its document name, replacing any
    /// previous compilation of the same document.
    pub fn insert(&mut self, compilation: Compilation) {
        self.compilations
            .insert(compilation.document().name().to_string(), compilation);
    }

    /// Return the compilation of the document with the given name.
    pub fn compilation(&self, name: &str) -> Option<&Compilation> {
        self.compilations.get(name)
    }

    /// Return the compiled instruction of the document with the given
    /// name.
    pub fn instruction(&self, name: &str) -> Option<&Instruction> {
        self.compilations
            .get(name)
            .and_then(|compilation| compilation.instruction())
    }

    /// Execute the compilation with the given name against a fresh
    /// memory and return the console text it printed.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no such compilation exists or it was
    /// never compiled, and propagates execution errors.
    pub fn execute(&self, name: &str) -> Result<String, Error> {
        let mut memory = Memory::new();
        self.execute_into(name, &mut memory)?;
        Ok(memory.take_console())
    }

    /// Execute the compilation with the given name against the given
    /// memory.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when no such compilation exists or it was
    /// never compiled, and propagates execution errors.
    pub fn execute_into(&self, name: &str, memory: &mut Memory) -> Result<(), Error> {
        let compilation = self.compilation(name).ok_or_else(|| {
            Error::state("unknown compilation")
                .help(format!("no document named `{name}` was loaded"))
        })?;
        let instruction = compilation.instruction().ok_or_else(|| {
            Error::state("compilation is not compiled")
                .document(name)
                .help("load the document through an engine before executing it")
        })?;
        instruction.exec(self, memory)
    }
}

#[cfg(test)]
mod tests {
    use super::{Compilation, Environment};
    use crate::{
        document::Document,
        instruction::{Instruction, Op},
    };

    #[test]
    fn test_execute_requires_instruction() {
        let mut environment = Environment::new();
        environment.insert(Compilation::new(Document::new("main", "x")).unwrap());

        assert!(environment.execute("ghost").is_err());
        assert!(environment.execute("main").is_err());
    }

    #[test]
    fn test_execute_prints() {
        let mut environment = Environment::new();
        let mut compilation = Compilation::new(Document::new("main", "x")).unwrap();
        compilation.set_instruction(Instruction::new(Op::PrintText {
            text: "hello".to_string(),
        }));
        environment.insert(compilation);

        assert_eq!(environment.execute("main").unwrap(), "hello");
    }

    #[test]
    fn test_import_between_compilations() {
        let mut environment = Environment::new();

        let mut other = Compilation::new(Document::new("other", "y")).unwrap();
        other.set_instruction(Instruction::new(Op::PrintText {
            text: "from other".to_string(),
        }));
        environment.insert(other);

        let mut main = Compilation::new(Document::new("main", "x")).unwrap();
        main.set_instruction(Instruction::new(Op::Import {
            name: Instruction::new(Op::PushConst {
                text: "other".to_string(),
            })
            .boxed(),
        }));
        environment.insert(main);

        assert_eq!(environment.execute("main").unwrap(), "from other");
    }

    #[test]
    fn test_serialize_round_trip() {
        let mut environment = Environment::new();
        let mut compilation = Compilation::new(Document::new("main", "source")).unwrap();
        compilation.set_instruction(Instruction::new(Op::PrintText {
            text: "persisted".to_string(),
        }));
        environment.insert(compilation);

        let text = serde_json::to_string(&environment).unwrap();
        let back: Environment = serde_json::from_str(&text).unwrap();

        // The document came back as a shell, but the instruction still
        // executes.
        assert!(back.compilation("main").unwrap().source().is_err());
        assert_eq!(back.execute("main").unwrap(), "persisted");
    }
}
