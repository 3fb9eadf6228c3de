//! Template Compiler - Single Entry Point
//!
//! Runs a Schematron rules document through the fixed ISO pipeline and
//! compiles the result. Every failure, whichever step it came from, surfaces
//! as one [`SchematronConfigurationError`].

use std::fmt;
use std::io::Read;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

use crate::config::CompilerConfiguration;
use crate::document::XmlDocument;
use crate::engine::{EngineError, Stylesheet, TransformerFactory, XsltEngine};
use crate::hashing::template_fingerprint;
use crate::pipeline::{NoopObserver, PipelineObserver, PipelineStage};
use crate::resolver::{ResolveError, StylesheetResolver};
use crate::templates::CompiledTemplate;

/// Where in the compile a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileStep {
    Stage(PipelineStage),
    /// Compiling the final tree into a template.
    Templates,
}

impl fmt::Display for CompileStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileStep::Stage(stage) => write!(f, "stage {}", stage),
            CompileStep::Templates => f.write_str("template compilation"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StageError {
    #[error("Resource not found")]
    ResourceNotFound(#[source] ResolveError),

    #[error("Stylesheet compilation failed")]
    StylesheetCompilation(#[source] EngineError),

    #[error("Transformation failed")]
    Transformation(#[source] EngineError),

    #[error("Template compilation failed")]
    TemplateCompilation(#[source] EngineError),
}

impl StageError {
    // An engine that cannot find an included stylesheet reports a resolve
    // error; that is a missing resource no matter which call raised it. A
    // resource that exists but cannot be read stays with the failing call.
    fn stylesheet(err: EngineError) -> Self {
        match err {
            EngineError::Resolve(e @ ResolveError::NotFound(_)) => StageError::ResourceNotFound(e),
            e => StageError::StylesheetCompilation(e),
        }
    }

    fn transformation(err: EngineError) -> Self {
        match err {
            EngineError::Resolve(e @ ResolveError::NotFound(_)) => StageError::ResourceNotFound(e),
            e => StageError::Transformation(e),
        }
    }

    fn templates(err: EngineError) -> Self {
        match err {
            EngineError::Resolve(e @ ResolveError::NotFound(_)) => StageError::ResourceNotFound(e),
            e => StageError::TemplateCompilation(e),
        }
    }
}

#[derive(Debug, Error)]
#[error("Schematron configuration error in {step}")]
pub struct SchematronConfigurationError {
    pub step: CompileStep,
    #[source]
    pub cause: StageError,
}

impl SchematronConfigurationError {
    fn new(step: CompileStep, cause: StageError) -> Self {
        Self { step, cause }
    }

    pub fn stage(&self) -> Option<PipelineStage> {
        match self.step {
            CompileStep::Stage(stage) => Some(stage),
            CompileStep::Templates => None,
        }
    }

    pub fn is_resource_not_found(&self) -> bool {
        matches!(self.cause, StageError::ResourceNotFound(_))
    }

    /// The full cause chain, outermost first, joined with `: `. `Display`
    /// only names the failing step.
    pub fn chain(&self) -> String {
        let mut parts = vec![self.to_string()];
        let mut source = std::error::Error::source(self);
        while let Some(err) = source {
            parts.push(err.to_string());
            source = err.source();
        }
        parts.join(": ")
    }
}

/// Compiles Schematron rules into [`CompiledTemplate`]s.
///
/// Holds no per-call state: build one and share it, or build one per call.
/// Each compile gets its own [`TransformerFactory`] and its own trees, so
/// concurrent calls never see each other's intermediate results.
#[derive(Clone)]
pub struct TemplateCompiler {
    engine: Arc<dyn XsltEngine>,
    resolver: Arc<dyn StylesheetResolver>,
    config: CompilerConfiguration,
}

impl TemplateCompiler {
    pub fn new(engine: Arc<dyn XsltEngine>, resolver: Arc<dyn StylesheetResolver>) -> Self {
        Self {
            engine,
            resolver,
            config: CompilerConfiguration::default(),
        }
    }

    pub fn with_config(mut self, config: CompilerConfiguration) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &CompilerConfiguration {
        &self.config
    }

    pub fn compile<R: Read>(&self, rules: R) -> Result<CompiledTemplate, SchematronConfigurationError> {
        self.compile_with_observer(rules, &mut NoopObserver)
    }

    /// Same as [`compile`](Self::compile), notifying `observer` around every
    /// pipeline stage.
    pub fn compile_with_observer<R: Read>(
        &self,
        rules: R,
        observer: &mut dyn PipelineObserver,
    ) -> Result<CompiledTemplate, SchematronConfigurationError> {
        let compile_id = Uuid::new_v4();
        let span = tracing::info_span!("schematron_compile", %compile_id);
        let _entered = span.enter();

        match self.run(compile_id, rules, observer) {
            Ok(template) => {
                tracing::info!("Compiled Schematron template {}", template.fingerprint());
                Ok(template)
            }
            Err(err) => {
                tracing::error!(step = %err.step, "{}", err.chain());
                Err(err)
            }
        }
    }

    fn run<R: Read>(
        &self,
        compile_id: Uuid,
        rules: R,
        observer: &mut dyn PipelineObserver,
    ) -> Result<CompiledTemplate, SchematronConfigurationError> {
        let factory = self
            .engine
            .new_factory(&self.config, Arc::clone(&self.resolver));

        let mut source = self.read_rules(rules).map_err(|e| {
            SchematronConfigurationError::new(
                CompileStep::Stage(PipelineStage::IncludeExpand),
                StageError::Transformation(e),
            )
        })?;

        for stage in PipelineStage::ALL {
            observer.on_stage_start(stage);
            let started = Instant::now();

            source = self
                .run_stage(factory.as_ref(), stage, &source)
                .map_err(|cause| SchematronConfigurationError::new(CompileStep::Stage(stage), cause))?;

            tracing::debug!(
                "Stage {} produced <{}> in {}ms",
                stage,
                source.root.name,
                started.elapsed().as_millis()
            );
            observer.on_stage_complete(stage, &source);
        }

        let executable = factory.new_templates(&source).map_err(|e| {
            SchematronConfigurationError::new(CompileStep::Templates, StageError::templates(e))
        })?;
        let fingerprint = template_fingerprint(&self.config, &source).map_err(|e| {
            SchematronConfigurationError::new(
                CompileStep::Templates,
                StageError::TemplateCompilation(EngineError::Stylesheet(e.to_string())),
            )
        })?;

        Ok(CompiledTemplate::new(compile_id, source, executable, fingerprint))
    }

    fn read_rules<R: Read>(&self, mut rules: R) -> Result<XmlDocument, EngineError> {
        let mut bytes = vec![];
        rules.read_to_end(&mut bytes)?;
        Ok(XmlDocument::parse_bytes(&bytes, self.config.source_line_numbering)?)
    }

    fn run_stage(
        &self,
        factory: &dyn TransformerFactory,
        stage: PipelineStage,
        source: &XmlDocument,
    ) -> Result<XmlDocument, StageError> {
        let stylesheet = self.load_stylesheet(stage)?;
        let transformer = factory
            .new_transformer(&stylesheet)
            .map_err(StageError::stylesheet)?;
        transformer
            .transform(source)
            .map_err(StageError::transformation)
    }

    fn load_stylesheet(&self, stage: PipelineStage) -> Result<Stylesheet, StageError> {
        let (system_id, bytes) = self
            .resolver
            .resolve(stage.stylesheet(), None)
            .and_then(|resolved| resolved.read_bytes())
            .map_err(|e| match e {
                ResolveError::NotFound(_) => StageError::ResourceNotFound(e),
                e => StageError::StylesheetCompilation(EngineError::Resolve(e)),
            })?;

        let document = XmlDocument::parse_bytes(&bytes, self.config.source_line_numbering)
            .map_err(|e| StageError::StylesheetCompilation(e.into()))?
            .with_base_uri(system_id.clone());

        Ok(Stylesheet { system_id, document })
    }
}
