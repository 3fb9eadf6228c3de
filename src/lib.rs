//! Schematron Templates - Rules In, Compiled Validator Out
//!
//! # Guarantees
//! 1. Stages Run In Fixed Order: include, abstract, SVRL
//! 2. Trees Stay In Memory Between Stages
//! 3. One Error Type Leaves The Compiler
//! 4. Resources Resolve Inside One Root
//!
//! The XSLT engine is supplied by the caller through [`engine::XsltEngine`].

pub mod config;
pub mod charset;
pub mod wellformed;
pub mod document;
pub mod resolver;
pub mod engine;
pub mod pipeline;
pub mod templates;
pub mod hashing;
pub mod compiler;

pub use config::CompilerConfiguration;
pub use document::{Element, Node, ParseError, XmlDocument};
pub use resolver::{DirectoryResolver, EmbeddedResolver, ResolveError, ResolvedStylesheet, StylesheetResolver};
pub use engine::{EngineError, Executable, Stylesheet, Transformer, TransformerFactory, XsltEngine};
pub use pipeline::{CapturingObserver, NoopObserver, PipelineObserver, PipelineStage};
pub use templates::CompiledTemplate;
pub use compiler::{CompileStep, SchematronConfigurationError, StageError, TemplateCompiler};

pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Conventional name of the directory holding the ISO XSLT2 pipeline
/// stylesheets. Point a [`DirectoryResolver`] at it.
pub const SCHEMATRON_TEMPLATES_ROOT_DIR: &str = "iso-schematron-xslt2";
