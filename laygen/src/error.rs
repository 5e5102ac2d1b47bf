//! Error types and error handling utilities.

use std::sync::Arc;

use arcstr::ArcStr;
use geometry::span::Span;
use rust_decimal::Decimal;

use crate::grid::LayerId;

/// A result type returning layout generation errors.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The error type for layout generation functions.
///
/// None of these are transient: every variant describes a contract violation
/// by the caller or a template, and is propagated to the outermost request.
#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    /// A required parameter was absent and has no default.
    #[error("parameter `{name}` not specified ({description})")]
    MissingParameter {
        /// The parameter name.
        name: ArcStr,
        /// The parameter description from the template's parameter info.
        description: ArcStr,
    },
    /// A parameter value has no canonical hashable form.
    #[error("parameter `{0}` cannot be canonicalized")]
    UnhashableParameter(ArcStr),
    /// A parameter has a different type than requested.
    #[error("parameter `{name}` is not {expected}")]
    InvalidParameter {
        /// The parameter name.
        name: ArcStr,
        /// The expected kind of value.
        expected: &'static str,
    },
    /// A requested top-level cell name is already in use.
    #[error("cell name `{0}` is already used")]
    DuplicateCellName(ArcStr),
    /// A net was given a different label or visibility than before.
    #[error("conflicting pin specification for net `{net}`: {reason}")]
    ConflictingPortSpec {
        /// The net name.
        net: ArcStr,
        /// What differed.
        reason: String,
    },
    /// Geometry on an unexpected layer was passed to a connection operation.
    #[error("wire on layer {found} cannot be used with layer {target}")]
    LayerMismatch {
        /// The layer the operation works on.
        target: LayerId,
        /// The offending layer.
        found: LayerId,
    },
    /// Wires of different widths were passed to a width-matched operation.
    #[error("wire width {found} does not match width {expected}")]
    WidthMismatch {
        /// The width of the first wire.
        expected: u32,
        /// The offending width.
        found: u32,
    },
    /// Two distinct wire footprints collide.
    #[error("wire interval {span:?} on layer {layer} overlaps existing wires")]
    OverlappingWires {
        /// The layer of the wires.
        layer: LayerId,
        /// The perpendicular interval of the offending wire.
        span: Span,
    },
    /// A finalized template was mutated.
    #[error("template `{0}` is already finalized")]
    FinalizedMutation(ArcStr),
    /// The array box does not produce a legal template size.
    #[error("invalid template size: {0}")]
    InvalidSize(String),
    /// No template is registered under the given identifier.
    #[error("no template registered as `{0}`")]
    UnknownTemplate(ArcStr),
    /// A template transitively requested itself while drawing.
    #[error("template `{0}` depends on itself")]
    CyclicTemplate(ArcStr),
    /// The routing grid description is inconsistent.
    #[error("invalid routing grid: {0}")]
    InvalidGrid(String),
    /// Wires cannot be moved by an orientation that swaps the x and y axes.
    #[error("orientation {0:?} changes routing direction")]
    UnsupportedOrientation(geometry::orientation::Orientation),
    /// An unknown layer was referenced.
    #[error("layer `{0}` does not exist")]
    LayerNotFound(String),
    /// A coordinate or interval is not aligned to the routing grid.
    #[error("off grid: {0}")]
    OffGrid(String),
    /// A port lookup failed.
    #[error("port not found: {0}")]
    PortNotFound(String),
    /// `batch_layout` received a different number of names than templates.
    #[error("template list has {templates} entries but name list has {names}")]
    NameListMismatch {
        /// Number of templates.
        templates: usize,
        /// Number of names.
        names: usize,
    },
    /// A physical coordinate cannot be represented in resolution units.
    #[error("coordinate {0} cannot be represented in resolution units")]
    InvalidCoord(Decimal),
    /// An I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] Arc<std::io::Error>),
    /// A JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] Arc<serde_json::Error>),
    /// A flexbuffers serialization error.
    #[error("flexbuffers error: {0}")]
    Flexbuffers(#[from] Arc<flexbuffers::SerializationError>),
    /// A configuration parse error.
    #[error("invalid configuration: {0}")]
    Toml(#[from] Arc<toml::de::Error>),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(Arc::new(value))
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(Arc::new(value))
    }
}

impl From<flexbuffers::SerializationError> for Error {
    fn from(value: flexbuffers::SerializationError) -> Self {
        Self::Flexbuffers(Arc::new(value))
    }
}

impl From<toml::de::Error> for Error {
    fn from(value: toml::de::Error) -> Self {
        Self::Toml(Arc::new(value))
    }
}
