//! Lookup of templates by library and name.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::template::Template;

/// Identifies a registered template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId {
    /// The template library.
    pub lib: ArcStr,
    /// The template name within the library.
    pub name: ArcStr,
}

impl TemplateId {
    /// Creates a template id.
    pub fn new(lib: impl Into<ArcStr>, name: impl Into<ArcStr>) -> Self {
        Self {
            lib: lib.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.lib, self.name)
    }
}

/// A map from [`TemplateId`] to template implementations.
#[derive(Clone, Default)]
pub struct TemplateRegistry {
    templates: HashMap<TemplateId, Arc<dyn Template>>,
}

impl fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.templates.keys()).finish()
    }
}

impl TemplateRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `template` under `id`, replacing any previous registration.
    pub fn register<T: Template>(&mut self, id: TemplateId, template: T) -> &mut Self {
        self.templates.insert(id, Arc::new(template));
        self
    }

    /// Looks up the template registered as `id`.
    pub fn get(&self, id: &TemplateId) -> Result<Arc<dyn Template>> {
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| Error::UnknownTemplate(arcstr::format!("{id}")))
    }

    /// Returns `true` if `id` is registered.
    pub fn contains(&self, id: &TemplateId) -> bool {
        self.templates.contains_key(id)
    }

    /// The number of registered templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
