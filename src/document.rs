use crate::log::Error;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    hash::{Hash, Hasher},
    sync::Arc,
};

/// A named unit of source text.
///
/// Equality and hashing depend on the name only, so two documents with the
/// same name are interchangeable as map keys even when one of them is a
/// deserialized shell.
///
/// # Examples
///
/// ```
/// use jamplate::Document;
///
/// let document = Document::new("greeting", "hello");
///
/// assert_eq!(document.name(), "greeting");
/// assert_eq!(document.content().unwrap(), "hello");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// The identity of the document.
    name: String,
    /// The source text.
    ///
    /// Not serialized; a document read back from persisted state is a
    /// shell that refuses content access.
    #[serde(skip)]
    content: Option<Arc<str>>,
}

impl Document {
    /// Create a new Document with the given name and content.
    pub fn new<N, C>(name: N, content: C) -> Self
    where
        N: Into<String>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            content: Some(Arc::from(content.into().as_str())),
        }
    }

    /// Create a shell Document with the given name and no content.
    ///
    /// Shells compare equal to live documents with the same name, but all
    /// content operations on them fail.
    pub fn shell<N>(name: N) -> Self
    where
        N: Into<String>,
    {
        Self {
            name: name.into(),
            content: None,
        }
    }

    /// Return the name of the Document.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the length of the content in bytes.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the Document is a shell.
    pub fn len(&self) -> Result<usize, Error> {
        Ok(self.content()?.len())
    }

    /// Return true when the content is empty.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the Document is a shell.
    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.content()?.is_empty())
    }

    /// Open a reader over the content of the Document.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the Document is a shell.
    pub fn reader(&self) -> Result<impl std::io::Read + '_, Error> {
        Ok(std::io::Cursor::new(self.content()?.as_bytes()))
    }

    /// Return the content of the Document.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`] when the Document is a shell, which happens
    /// when it was deserialized rather than created with content.
    pub fn content(&self) -> Result<&str, Error> {
        match &self.content {
            Some(content) => Ok(content),
            None => Err(Error::state("document content is unavailable")
                .document(&self.name)
                .help(
                    "this document is a deserialized shell, only the name survives \
                    persistence, reload the original source to read content",
                )),
        }
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Document {}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}
