//! Database configuration, read from TOML.

use std::io::Write;
use std::path::Path;

use arcstr::ArcStr;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{RoutingGrid, RoutingLayer, ViaRule};
use crate::render::{GenericRenderer, NativeRenderer, Renderer};

/// Settings of a [`TemplateDb`](crate::db::TemplateDb).
///
/// # Example
///
/// ```
/// # use laygen::config::{DbConfig, RenderBackend};
/// let config = DbConfig::from_toml_str(r#"
///     lib_name = "amp_gen"
///     backend = "native"
/// "#).unwrap();
/// assert_eq!(config.lib_name, "amp_gen");
/// assert_eq!(config.backend, RenderBackend::Native);
/// assert_eq!(config.pin_purpose, "pin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// The library all generated cells are placed in.
    pub lib_name: ArcStr,
    /// Prepended to the base name of every generated cell.
    pub name_prefix: ArcStr,
    /// The layer purpose of pin geometry.
    pub pin_purpose: ArcStr,
    /// Draw a pin rectangle under every pin label.
    pub make_pin_rect: bool,
    /// The renderer used by [`TemplateDb::batch_layout`](crate::db::TemplateDb::batch_layout).
    pub backend: RenderBackend,
    /// The default routing grid.
    pub grid: Option<GridConfig>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            lib_name: arcstr::literal!("laygen"),
            name_prefix: ArcStr::default(),
            pin_purpose: arcstr::literal!("pin"),
            make_pin_rect: true,
            backend: RenderBackend::default(),
            grid: None,
        }
    }
}

impl DbConfig {
    /// Parses a configuration from a TOML string.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Reads a configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), "reading database configuration");
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// A serializable description of a [`RoutingGrid`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridConfig {
    /// The physical size of one resolution unit.
    pub resolution: Decimal,
    /// The routing layers.
    pub layers: Vec<RoutingLayer>,
    /// Via rules between adjacent layers.
    #[serde(default)]
    pub vias: Vec<ViaRule>,
}

impl GridConfig {
    /// Validates the description and builds the grid.
    pub fn build(&self) -> Result<RoutingGrid> {
        RoutingGrid::new(self.resolution, self.layers.clone(), self.vias.clone())
    }
}

/// Which renderer writes generated cells.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderBackend {
    /// Human readable JSON.
    #[default]
    Generic,
    /// Compact binary flexbuffers.
    Native,
}

impl RenderBackend {
    /// Creates a renderer of this kind writing to `writer`.
    pub fn renderer<'w, W: Write + 'w>(self, writer: W) -> Box<dyn Renderer + 'w> {
        match self {
            RenderBackend::Generic => Box::new(GenericRenderer::new(writer)),
            RenderBackend::Native => Box::new(NativeRenderer::new(writer)),
        }
    }
}
