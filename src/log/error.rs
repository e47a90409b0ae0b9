use std::fmt::{Debug, Display, Formatter, Result};

use crate::{log::Visual, reference::Reference};

use super::{Pointer, RED, RESET};

pub const OVERLAPPING_TREES: &str = "overlapping trees";
pub const MISSING_COMPONENTS: &str = "missing some components";
pub const UNRECOGNIZED_PARAMETER: &str = "Unrecognized parameter";
pub const UNCLOSED_IF: &str = "Unclosed if context";
pub const UNCLOSED_FOR: &str = "Unclosed for context";
pub const ELIF_OUTSIDE_IF: &str = "Elif command outside if context";
pub const ELSE_OUTSIDE_IF: &str = "Else command outside if context";
pub const ENDIF_OUTSIDE_IF: &str = "Endif command outside if context";
pub const ENDFOR_OUTSIDE_FOR: &str = "Endfor command outside for context";
pub const DOUBLE_ELSE: &str = "Double Else commands in one if context";

/// The stage an [`Error`] belongs to.
#[derive(Debug, PartialEq, Eq, Copy, Clone)]
pub enum ErrorKind {
    /// Raised while parsing, analyzing or compiling a tree.
    Compile,
    /// Raised while executing an instruction against memory.
    Execution,
    /// Raised by input and output failures.
    Io,
    /// Raised by operations on state that does not support them, such as
    /// reading the content of a deserialized document.
    State,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        match self {
            ErrorKind::Compile => write!(f, "compile error"),
            ErrorKind::Execution => write!(f, "execution error"),
            ErrorKind::Io => write!(f, "io error"),
            ErrorKind::State => write!(f, "state error"),
        }
    }
}

/// An error type that provides a brief description of the problem, and
/// optionally supports adding more contextual "help" text and a
/// visualization to illustrate it.
///
/// # Examples
///
/// Creating an [`Error`] that includes a [`Visual`] of type [`Pointer`]:
///
/// ```
/// use jamplate::{log::Error, Reference};
///
/// let source = "#define X";
/// let error = Error::build("missing some components")
///     .pointer(source, Reference::from(0..9))
///     .document("template.jam")
///     .help("expected a value after the address");
/// ```
///
/// When printed with `println!("{:#}", error)` the [`Error`] renders the
/// reason, an arrow to `template.jam:1:1`, the offending line with a
/// highlight under it, and the help text.
pub struct Error {
    /// The stage this [`Error`] belongs to.
    kind: ErrorKind,
    /// Describes the cause of the [`Error`].
    reason: String,
    /// The name of the document that the [`Error`] comes from.
    document: Option<String>,
    /// A visualization to help illustrate the [`Error`].
    visual: Option<Box<dyn Visual>>,
    /// Additional information to display with the [`Error`].
    help: Option<String>,
}

impl Error {
    /// Create a new [`Error`] of kind [`ErrorKind::Compile`] with the
    /// given reason text.
    ///
    /// The additional fields may be populated using the various methods
    /// defined on `Error`.
    pub fn build<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::of(ErrorKind::Compile, reason)
    }

    /// Create a new [`Error`] of kind [`ErrorKind::Execution`].
    pub fn execution<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::of(ErrorKind::Execution, reason)
    }

    /// Create a new [`Error`] of kind [`ErrorKind::Io`].
    pub fn io<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::of(ErrorKind::Io, reason)
    }

    /// Create a new [`Error`] of kind [`ErrorKind::State`].
    pub fn state<T>(reason: T) -> Self
    where
        T: Into<String>,
    {
        Self::of(ErrorKind::State, reason)
    }

    /// Create a new [`Error`] with the given kind and reason text.
    pub fn of<T>(kind: ErrorKind, reason: T) -> Self
    where
        T: Into<String>,
    {
        Error {
            kind,
            reason: reason.into(),
            document: None,
            visual: None,
            help: None,
        }
    }

    /// Return the kind of the [`Error`].
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Return the reason text of the [`Error`].
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Set the document text, which is the name of the document that the
    /// error is related to.
    pub fn document<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.document = Some(text.into());
        self
    }

    /// Return the name of the related document, if one was set.
    #[inline]
    pub fn get_document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    /// Set the [`Visual`], which is a visualization that helps illustrate
    /// the cause of the error.
    pub fn visual(mut self, visual: impl Visual + 'static) -> Self {
        self.visual = Some(Box::new(visual));
        self
    }

    /// Set the visualization to a new [`Pointer`] over the given source
    /// text and [`Reference`].
    pub fn pointer<T>(mut self, source: &str, reference: T) -> Self
    where
        T: Into<Reference>,
    {
        self.visual = Some(Box::new(Pointer::new(source, reference.into())));
        self
    }

    /// Set the help text, which is some additional contextual information
    /// to accompany the reason text.
    pub fn help<T>(mut self, text: T) -> Self
    where
        T: Into<String>,
    {
        self.help = Some(text.into());
        self
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        if !f.alternate() {
            writeln!(f, "{self:#}")?;
        }

        f.debug_struct("Error")
            .field("kind", &self.kind)
            .field("reason", &self.reason)
            .field("document", &self.document)
            .field("help", &self.help)
            .finish()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let header = format!("{RED}{}{RESET}", self.kind);
        write!(f, "{header}: {}", self.reason)?;

        if let Some(visual) = &self.visual {
            if f.alternate() {
                return visual.display(f, self.document.as_deref(), self.help.as_deref());
            }
        }

        Ok(())
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.reason == other.reason
            && self.help == other.help
            && self.document == other.document
    }
}

impl std::error::Error for Error {}
