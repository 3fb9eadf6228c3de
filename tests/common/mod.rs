//! Stub XSLT engine for exercising the compiler without a real XSLT
//! processor.
//!
//! Each pipeline stylesheet carries a `mode` attribute on its root telling
//! the stub what to do. Stages stamp the tree they produce so a stage run
//! out of order fails loudly.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use schematron_templates::{
    CompilerConfiguration, Element, EmbeddedResolver, EngineError, Executable, Node, Stylesheet,
    StylesheetResolver, Transformer, TransformerFactory, XmlDocument, XsltEngine,
};

pub const INCLUDE_XSL: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0" mode="include"/>"#;
pub const ABSTRACT_XSL: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0" mode="abstract"/>"#;
pub const SVRL_XSL: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0" mode="svrl">
  <xsl:include href="lib/skeleton.xsl"/>
</xsl:stylesheet>"#;
pub const SKELETON_XSL: &str = r#"<xsl:stylesheet xmlns:xsl="http://www.w3.org/1999/XSL/Transform" version="2.0" mode="fragment"/>"#;

pub const EMPTY_RULES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron" queryBinding="xslt2">
  <sch:title>No patterns</sch:title>
</sch:schema>
"#;

pub fn rules_with_pattern(id: &str) -> String {
    format!(
        r#"<sch:schema xmlns:sch="http://purl.oclc.org/dsdl/schematron" queryBinding="xslt2">
  <sch:pattern id="{id}">
    <sch:rule context="/order">
      <sch:assert test="@id">order must have an id</sch:assert>
    </sch:rule>
  </sch:pattern>
</sch:schema>
"#
    )
}

/// Resolver populated with a working pipeline.
pub fn pipeline_resources() -> EmbeddedResolver {
    EmbeddedResolver::new()
        .with("iso_dsdl_include.xsl", INCLUDE_XSL)
        .and_then(|r| r.with("iso_abstract_expand.xsl", ABSTRACT_XSL))
        .and_then(|r| r.with("iso_svrl_for_xslt2.xsl", SVRL_XSL))
        .and_then(|r| r.with("lib/skeleton.xsl", SKELETON_XSL))
        .expect("pipeline paths are root-relative")
}

#[derive(Default)]
pub struct StubEngine {
    /// System ids of stylesheets, in the order they were applied.
    pub applied: Arc<Mutex<Vec<String>>>,
    pub factories_created: Arc<Mutex<usize>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn applied(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }
}

impl XsltEngine for StubEngine {
    fn new_factory(
        &self,
        config: &CompilerConfiguration,
        resolver: Arc<dyn StylesheetResolver>,
    ) -> Box<dyn TransformerFactory> {
        *self.factories_created.lock().unwrap() += 1;
        Box::new(StubFactory {
            resolver,
            line_numbers: config.source_line_numbering,
            applied: Arc::clone(&self.applied),
        })
    }
}

struct StubFactory {
    resolver: Arc<dyn StylesheetResolver>,
    line_numbers: bool,
    applied: Arc<Mutex<Vec<String>>>,
}

impl StubFactory {
    fn load(&self, href: &str, base: Option<&str>) -> Result<XmlDocument, EngineError> {
        let (system_id, bytes) = self.resolver.resolve(href, base)?.read_bytes()?;
        Ok(XmlDocument::parse_bytes(&bytes, self.line_numbers)?.with_base_uri(system_id))
    }
}

impl TransformerFactory for StubFactory {
    fn new_transformer(&self, stylesheet: &Stylesheet) -> Result<Box<dyn Transformer>, EngineError> {
        let root = &stylesheet.document.root;
        if root.local_name() != "stylesheet" {
            return Err(EngineError::Stylesheet(format!("{} is not a stylesheet", stylesheet.system_id)));
        }
        for include in root.child_elements().filter(|e| e.local_name() == "include") {
            let href = include
                .attribute("href")
                .ok_or_else(|| EngineError::Stylesheet("xsl:include without href".into()))?;
            self.load(href, Some(&stylesheet.system_id))?;
        }
        let mode = root
            .attribute("mode")
            .ok_or_else(|| EngineError::Stylesheet("missing mode".into()))?
            .to_string();

        Ok(Box::new(StubTransformer {
            mode,
            system_id: stylesheet.system_id.clone(),
            resolver: Arc::clone(&self.resolver),
            line_numbers: self.line_numbers,
            applied: Arc::clone(&self.applied),
        }))
    }

    fn new_templates(&self, stylesheet: &XmlDocument) -> Result<Arc<dyn Executable>, EngineError> {
        if stylesheet.root.local_name() != "stylesheet" {
            return Err(EngineError::Stylesheet(format!(
                "<{}> is not a stylesheet",
                stylesheet.root.name
            )));
        }
        let patterns = stylesheet
            .descendants()
            .filter(|e| e.local_name() == "pattern")
            .filter_map(|e| e.attribute("id").map(str::to_string))
            .collect();
        Ok(Arc::new(StubExecutable { patterns }))
    }
}

struct StubTransformer {
    mode: String,
    system_id: String,
    resolver: Arc<dyn StylesheetResolver>,
    line_numbers: bool,
    applied: Arc<Mutex<Vec<String>>>,
}

impl StubTransformer {
    fn expand_includes(&self, element: &Element, base: Option<&str>) -> Result<Element, EngineError> {
        let mut out = Element {
            children: vec![],
            ..element.clone()
        };
        for child in &element.children {
            match child {
                Node::Element(e) if e.local_name() == "include" => {
                    let href = e
                        .attribute("href")
                        .ok_or_else(|| EngineError::Transform("sch:include without href".into()))?;
                    let (system_id, bytes) = self.resolver.resolve(href, base)?.read_bytes()?;
                    let included = XmlDocument::parse_bytes(&bytes, self.line_numbers)?;
                    out.children.push(Node::Element(
                        self.expand_includes(&included.root, Some(&system_id))?,
                    ));
                }
                Node::Element(e) => out.children.push(Node::Element(self.expand_includes(e, base)?)),
                other => out.children.push(other.clone()),
            }
        }
        Ok(out)
    }

    fn require_stamp(source: &XmlDocument, expected: &str) -> Result<(), EngineError> {
        match source.root.attribute("stage") {
            Some(stamp) if stamp == expected => Ok(()),
            other => Err(EngineError::Transform(format!(
                "expected input from {}, got {:?}",
                expected, other
            ))),
        }
    }
}

impl Transformer for StubTransformer {
    fn transform(&self, source: &XmlDocument) -> Result<XmlDocument, EngineError> {
        self.applied.lock().unwrap().push(self.system_id.clone());

        match self.mode.as_str() {
            "include" => {
                if source.root.local_name() != "schema" {
                    return Err(EngineError::Transform(format!(
                        "<{}> is not a Schematron schema",
                        source.root.name
                    )));
                }
                let mut root = self.expand_includes(&source.root, source.base_uri.as_deref())?;
                root.set_attribute("stage", "include");
                Ok(XmlDocument::new(root))
            }
            "abstract" => {
                Self::require_stamp(source, "include")?;
                let mut out = source.clone();
                out.root.set_attribute("stage", "abstract");
                Ok(out)
            }
            "svrl" => {
                Self::require_stamp(source, "abstract")?;
                let root = Element::new("xsl:stylesheet")
                    .with_attribute("xmlns:xsl", "http://www.w3.org/1999/XSL/Transform")
                    .with_attribute("version", "2.0")
                    .with_child(source.root.clone());
                Ok(XmlDocument::new(root))
            }
            "not-a-stylesheet" => Ok(XmlDocument::new(Element::new("svrl:garbage"))),
            "fail" => Err(EngineError::Transform(format!("{} aborted", self.system_id))),
            other => Err(EngineError::Transform(format!("unknown mode {}", other))),
        }
    }
}

struct StubExecutable {
    patterns: Vec<String>,
}

impl Executable for StubExecutable {
    fn apply(&self, _source: &XmlDocument) -> Result<XmlDocument, EngineError> {
        let mut report = Element::new("svrl:schematron-output")
            .with_attribute("xmlns:svrl", "http://purl.oclc.org/dsdl/svrl");
        for id in &self.patterns {
            report = report.with_child(Element::new("svrl:active-pattern").with_attribute("id", id.as_str()));
        }
        Ok(XmlDocument::new(report))
    }
}
