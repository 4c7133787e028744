//! Template loading for `include`.
//!
//! The engine never touches the file system itself; hosts plug in a
//! [`TemplateLoader`].

use indexmap::IndexMap;

/// A loader could not produce the requested template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LoadError {
    pub message: String,
}

impl LoadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Resolves an include path to template source.
pub trait TemplateLoader: Send + Sync {
    fn load(&self, path: &str) -> Result<String, LoadError>;
}

impl<F> TemplateLoader for F
where
    F: Fn(&str) -> Result<String, LoadError> + Send + Sync,
{
    fn load(&self, path: &str) -> Result<String, LoadError> {
        self(path)
    }
}

/// Loader that refuses everything. The default for a new engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLoader;

impl TemplateLoader for NoLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        Err(LoadError::new(format!("no template loader configured for '{path}'")))
    }
}

/// In-memory templates keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    templates: IndexMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.templates.insert(path.into(), source.into());
    }

    /// Builder form of [`MemoryLoader::insert`].
    pub fn with(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }
}

impl TemplateLoader for MemoryLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        self.templates
            .get(path)
            .cloned()
            .ok_or_else(|| LoadError::new(format!("template not found: {path}")))
    }
}
