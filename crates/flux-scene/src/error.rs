//! Error types for scene construction.

use flux_ir::{EntityClass, IrError};
use flux_nurbs::NurbsError;
use flux_tessellate::TessellateError;
use thiserror::Error;

/// Failure to build one primitive.
///
/// Raised by builders and solvers; the assembler records it against the
/// element and carries on with its siblings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// A required field is absent.
    #[error("{primitive} is missing required field `{field}`")]
    MissingField {
        /// Canonical primitive name.
        primitive: String,
        /// Field name as spelled in JSON.
        field: &'static str,
    },

    /// A field is present but unusable.
    #[error("{primitive}: {message}")]
    InvalidField {
        /// Canonical primitive name.
        primitive: String,
        /// Description of the problem.
        message: String,
    },

    /// Malformed knot vector, degree or weights.
    #[error(transparent)]
    Knots(#[from] NurbsError),

    /// Arc or polygon solver failure.
    #[error(transparent)]
    Tessellate(#[from] TessellateError),

    /// A container holds a member of the wrong capability class.
    #[error("{container} may only contain {expected} primitives, found {found}")]
    Composition {
        /// Container primitive name.
        container: String,
        /// Class the container accepts.
        expected: EntityClass,
        /// Offending member primitive name.
        found: String,
    },

    /// No builder is registered for this primitive name.
    #[error("unsupported primitive `{0}`")]
    Unsupported(String),

    /// A brep was built without resolving it through a provider first.
    #[error("brep geometry has not been resolved")]
    BrepUnresolved,

    /// The brep provider reported a failure for this element.
    #[error("{name}: {message}")]
    Provider {
        /// Error name reported by the provider.
        name: String,
        /// Error message reported by the provider.
        message: String,
    },

    /// An orientation vector has zero length.
    #[error("cannot orient along zero-length `{0}` vector")]
    ZeroLengthVector(&'static str),
}

impl From<IrError> for GeometryError {
    fn from(e: IrError) -> Self {
        match e {
            IrError::MissingField { primitive, field } => {
                GeometryError::MissingField { primitive, field }
            }
            IrError::InvalidField { primitive, message } => {
                GeometryError::InvalidField { primitive, message }
            }
        }
    }
}

impl GeometryError {
    /// Shorthand for [`GeometryError::InvalidField`].
    pub fn invalid(primitive: &str, message: impl Into<String>) -> Self {
        GeometryError::InvalidField {
            primitive: primitive.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for primitive builders.
pub type Result<T> = std::result::Result<T, GeometryError>;

/// Structural failure of a whole build call.
#[derive(Error, Debug)]
pub enum SceneError {
    /// Input text is not JSON.
    #[error("invalid scene JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration could not be read.
    #[error("invalid configuration: {0}")]
    Config(String),
}
