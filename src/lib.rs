//! Jamplate - Template Processing Engine
//!
//! Documents are overlaid with a tree of typed, interval-anchored nodes,
//! then driven through a pipeline of fixed point phases: pattern-driven
//! parsing, tree-rewriting analysis and processing, and compilation into
//! a stack machine instruction tree executed against a [`Memory`].
//!
//! The pipeline is assembled from [`Spec`][spec::Spec] bundles; the
//! [`dialect`] module ships the built-in hash-command template language
//! and expression language.
//!
//! ```
//! use jamplate::{dialect, Document, Engine, Environment};
//!
//! let engine = Engine::new().with_all(dialect::standard());
//! let mut environment = Environment::new();
//! engine
//!     .load(
//!         &mut environment,
//!         Document::new("main", "#for I [1,2,3]\n[I]\n#endfor"),
//!     )
//!     .unwrap();
//!
//! assert_eq!(environment.execute("main").unwrap(), "1\n2\n3\n");
//! ```

mod document;
mod engine;
mod environment;
mod instruction;
mod memory;
mod reference;
mod relation;
mod sketch;
mod tree;
mod value;

pub mod analyze;
pub mod compile;
pub mod dialect;
pub mod log;
pub mod parse;
pub mod spec;

pub use document::Document;
pub use engine::Engine;
pub use environment::{Compilation, Environment};
pub use instruction::{Instruction, Op, Trace};
pub use log::{Error, ErrorKind};
pub use memory::{Memory, DEFINE};
pub use reference::Reference;
pub use relation::{Dominance, Relation};
pub use sketch::Sketch;
pub use tree::{Forest, Offered, Proto, TreeId};
pub use value::{Pipe, Value};
