//! Transformation Engine Seam
//!
//! XSLT execution itself lives outside this crate. An engine plugs in by
//! implementing these traits; the compiler only orchestrates.

use std::sync::Arc;

use thiserror::Error;

use crate::config::CompilerConfiguration;
use crate::document::{ParseError, XmlDocument};
use crate::resolver::{ResolveError, StylesheetResolver};

#[derive(Debug, Error)]
pub enum EngineError {
    /// A stylesheet or document referenced via include/import/document()
    /// could not be located.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stylesheet rejected: {0}")]
    Stylesheet(String),

    #[error("XSLT error: {0}")]
    Transform(String),
}

/// A parsed stylesheet ready to hand to an engine.
#[derive(Debug, Clone)]
pub struct Stylesheet {
    /// Root-relative path the stylesheet was resolved from.
    pub system_id: String,
    pub document: XmlDocument,
}

/// Entry point of an XSLT engine. Must be safe to share; each compile asks
/// for its own factory.
pub trait XsltEngine: Send + Sync {
    fn new_factory(
        &self,
        config: &CompilerConfiguration,
        resolver: Arc<dyn StylesheetResolver>,
    ) -> Box<dyn TransformerFactory>;
}

/// Per-compile engine state. Includes and imports found inside stylesheets
/// are resolved through the resolver the factory was created with.
pub trait TransformerFactory {
    fn new_transformer(&self, stylesheet: &Stylesheet) -> Result<Box<dyn Transformer>, EngineError>;

    /// Compile a stylesheet tree into a reusable executable.
    fn new_templates(&self, stylesheet: &XmlDocument) -> Result<Arc<dyn Executable>, EngineError>;
}

/// A single-use compiled stylesheet.
pub trait Transformer {
    fn transform(&self, source: &XmlDocument) -> Result<XmlDocument, EngineError>;
}

/// A compiled, thread-safe stylesheet that can be applied many times.
pub trait Executable: Send + Sync {
    fn apply(&self, source: &XmlDocument) -> Result<XmlDocument, EngineError>;
}
