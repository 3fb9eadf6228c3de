//! Compiled Templates - Reusable Validation Programs

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::document::XmlDocument;
use crate::engine::{EngineError, Executable};

/// The output of a successful compile: the final SVRL-generating stylesheet
/// and the engine's compiled form of it.
///
/// Cheap to clone and safe to share across threads. Nothing is cached
/// between compiles; use [`CompiledTemplate::fingerprint`] as a key if you
/// cache templates yourself.
#[derive(Clone)]
pub struct CompiledTemplate {
    id: Uuid,
    compiled_at: DateTime<Utc>,
    fingerprint: String,
    stylesheet: Arc<XmlDocument>,
    executable: Arc<dyn Executable>,
}

impl CompiledTemplate {
    /// `id` is the compile id the template was logged under.
    pub fn new(
        id: Uuid,
        stylesheet: XmlDocument,
        executable: Arc<dyn Executable>,
        fingerprint: String,
    ) -> Self {
        Self {
            id,
            compiled_at: Utc::now(),
            fingerprint,
            stylesheet: Arc::new(stylesheet),
            executable,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn compiled_at(&self) -> DateTime<Utc> {
        self.compiled_at
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// The stylesheet produced by the last pipeline stage.
    pub fn stylesheet(&self) -> &XmlDocument {
        &self.stylesheet
    }

    /// Run the compiled rules against a document, producing an SVRL report.
    pub fn apply(&self, document: &XmlDocument) -> Result<XmlDocument, EngineError> {
        self.executable.apply(document)
    }
}

impl fmt::Debug for CompiledTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledTemplate")
            .field("id", &self.id)
            .field("compiled_at", &self.compiled_at)
            .field("fingerprint", &self.fingerprint)
            .field("stylesheet_root", &self.stylesheet.root.name)
            .finish_non_exhaustive()
    }
}
