//! Stylesheet Resolution
//!
//! Pipeline stylesheets reference their siblings by relative path. Every
//! lookup is scoped to one resource root so the pipeline works no matter
//! where the process was started from.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Stylesheet not found: {0}")]
    NotFound(String),

    #[error("Invalid resource path: {0}")]
    InvalidPath(String),

    #[error("Failed to read stylesheet {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// A located stylesheet, positioned at its first byte.
pub struct ResolvedStylesheet {
    /// Root-relative path; pass it back as `base` when resolving references
    /// found inside this stylesheet.
    pub system_id: String,
    pub reader: Box<dyn Read + Send>,
}

impl ResolvedStylesheet {
    /// Drain the stream. Bytes are returned undecoded; the XML parser picks
    /// the character encoding.
    pub fn read_bytes(mut self) -> Result<(String, Vec<u8>), ResolveError> {
        let mut content = vec![];
        match self.reader.read_to_end(&mut content) {
            Ok(_) => Ok((self.system_id, content)),
            Err(source) => Err(ResolveError::Io { path: self.system_id, source }),
        }
    }
}

impl std::fmt::Debug for ResolvedStylesheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedStylesheet")
            .field("system_id", &self.system_id)
            .finish_non_exhaustive()
    }
}

/// Maps a stylesheet reference to bytes inside one resource root.
pub trait StylesheetResolver: Send + Sync {
    /// `base` is the system id of the referencing stylesheet, or `None` to
    /// resolve against the root itself.
    fn resolve(&self, href: &str, base: Option<&str>) -> Result<ResolvedStylesheet, ResolveError>;
}

/// Normalize `href` against the directory of `base` into a root-relative,
/// `/`-separated path. Returns `None` for anything that leaves the root:
/// URIs with a scheme, `..` past the top, or an empty reference.
pub fn resolve_reference(href: &str, base: Option<&str>) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || has_scheme(href) || href.starts_with('\\') {
        return None;
    }

    let mut segments: Vec<&str> = vec![];
    if !href.starts_with('/') {
        if let Some(base) = base {
            segments.extend(base.split('/').filter(|s| !s.is_empty()));
            // drop the file name
            segments.pop();
        }
    }

    for segment in href.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        None
    } else {
        Some(segments.join("/"))
    }
}

fn has_scheme(href: &str) -> bool {
    match href.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        None => false,
    }
}

/// Resolves against a directory on disk.
#[derive(Debug, Clone)]
pub struct DirectoryResolver {
    root: PathBuf,
}

impl DirectoryResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl StylesheetResolver for DirectoryResolver {
    fn resolve(&self, href: &str, base: Option<&str>) -> Result<ResolvedStylesheet, ResolveError> {
        let system_id = resolve_reference(href, base)
            .ok_or_else(|| ResolveError::NotFound(href.to_string()))?;

        let mut path = self.root.clone();
        path.extend(system_id.split('/'));

        // symlinks may point anywhere; the target must still sit under the root
        let (root, path) = match (self.root.canonicalize(), path.canonicalize()) {
            (Ok(root), Ok(path)) => (root, path),
            _ => return Err(ResolveError::NotFound(system_id)),
        };
        if !path.starts_with(&root) || !path.is_file() {
            return Err(ResolveError::NotFound(system_id));
        }

        match File::open(&path) {
            Ok(file) => Ok(ResolvedStylesheet { system_id, reader: Box::new(file) }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(ResolveError::NotFound(system_id)),
            Err(source) => Err(ResolveError::Io { path: system_id, source }),
        }
    }
}

/// Resolves against resources registered in memory, e.g. stylesheets
/// bundled with `include_bytes!`.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedResolver {
    resources: HashMap<String, Arc<[u8]>>,
}

impl EmbeddedResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource under a root-relative path. Paths that would
    /// leave the root are refused.
    pub fn insert(&mut self, path: &str, content: impl Into<Vec<u8>>) -> Result<(), ResolveError> {
        let key = resolve_reference(path, None).ok_or_else(|| ResolveError::InvalidPath(path.to_string()))?;
        self.resources.insert(key, Arc::from(content.into()));
        Ok(())
    }

    pub fn with(mut self, path: &str, content: impl Into<Vec<u8>>) -> Result<Self, ResolveError> {
        self.insert(path, content)?;
        Ok(self)
    }

    pub fn contains(&self, path: &str) -> bool {
        resolve_reference(path, None).map_or(false, |k| self.resources.contains_key(&k))
    }
}

impl StylesheetResolver for EmbeddedResolver {
    fn resolve(&self, href: &str, base: Option<&str>) -> Result<ResolvedStylesheet, ResolveError> {
        let system_id = resolve_reference(href, base)
            .ok_or_else(|| ResolveError::NotFound(href.to_string()))?;
        let content = self
            .resources
            .get(&system_id)
            .ok_or_else(|| ResolveError::NotFound(system_id.clone()))?;
        Ok(ResolvedStylesheet {
            system_id,
            reader: Box::new(Cursor::new(Arc::clone(content))),
        })
    }
}
