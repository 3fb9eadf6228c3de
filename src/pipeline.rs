//! ISO Schematron Pipeline - Fixed Stage Order
//!
//! include expansion -> abstract pattern expansion -> SVRL generation.
//! The order never varies.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::document::XmlDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineStage {
    IncludeExpand,
    AbstractExpand,
    SvrlGenerate,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 3] = [
        PipelineStage::IncludeExpand,
        PipelineStage::AbstractExpand,
        PipelineStage::SvrlGenerate,
    ];

    /// Stylesheet path relative to the resource root.
    pub fn stylesheet(&self) -> &'static str {
        match self {
            PipelineStage::IncludeExpand => "iso_dsdl_include.xsl",
            PipelineStage::AbstractExpand => "iso_abstract_expand.xsl",
            PipelineStage::SvrlGenerate => "iso_svrl_for_xslt2.xsl",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::IncludeExpand => "include-expand",
            PipelineStage::AbstractExpand => "abstract-expand",
            PipelineStage::SvrlGenerate => "svrl-generate",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives notifications at stage boundaries. Useful for timing, for
/// capturing intermediate trees while debugging a rules document, and in
/// tests.
pub trait PipelineObserver {
    fn on_stage_start(&mut self, _stage: PipelineStage) {}

    /// `result` is the tree the stage produced; it becomes the next stage's
    /// source.
    fn on_stage_complete(&mut self, _stage: PipelineStage, _result: &XmlDocument) {}
}

pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Keeps a copy of every intermediate tree in stage order.
#[derive(Debug, Default)]
pub struct CapturingObserver {
    pub started: Vec<PipelineStage>,
    pub results: Vec<(PipelineStage, XmlDocument)>,
}

impl CapturingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result(&self, stage: PipelineStage) -> Option<&XmlDocument> {
        self.results.iter().find(|(s, _)| *s == stage).map(|(_, d)| d)
    }
}

impl PipelineObserver for CapturingObserver {
    fn on_stage_start(&mut self, stage: PipelineStage) {
        self.started.push(stage);
    }

    fn on_stage_complete(&mut self, stage: PipelineStage, result: &XmlDocument) {
        self.results.push((stage, result.clone()));
    }
}
