use std::error::Error;
use std::fmt::{Display, Formatter};

/// Categories of shape inference error.
///
/// See [`ShapeError::kind`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ShapeErrorKind {
    /// The node's position in the graph violates the contract of its shape
    /// function, eg. an operator that needs exactly one input has several, a
    /// parent has not been resolved yet, or the node has no layer.
    ///
    /// This indicates a malformed graph rather than a malformed model.
    InvalidTopology,

    /// The layer type has no shape inference rule.
    NotSupported,

    /// The dimensions of a value cannot be derived statically, eg. because
    /// they are defined by an external data source.
    DimensionUndeterminable,

    /// A layer parameter needed to compute the shape is missing or invalid.
    InvalidParameter,

    /// The input shapes cannot be combined by this layer.
    IncompatibleShapes,
}

impl ShapeErrorKind {
    /// Return true if this error signals a programming or graph construction
    /// error upstream, rather than a property of the model being converted.
    pub fn is_fatal(self) -> bool {
        matches!(self, ShapeErrorKind::InvalidTopology)
    }

    fn description(self) -> &'static str {
        match self {
            ShapeErrorKind::InvalidTopology => "invalid topology",
            ShapeErrorKind::NotSupported => "not supported",
            ShapeErrorKind::DimensionUndeterminable => "undeterminable dimensions",
            ShapeErrorKind::InvalidParameter => "invalid parameter",
            ShapeErrorKind::IncompatibleShapes => "incompatible shapes",
        }
    }
}

/// Error raised when the output shape of a node cannot be computed.
#[derive(Clone, Debug, PartialEq)]
pub struct ShapeError {
    kind: ShapeErrorKind,
    message: String,
    node: Option<String>,
}

impl ShapeError {
    pub fn new(kind: ShapeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
        }
    }

    pub(crate) fn invalid_topology(message: impl Into<String>) -> Self {
        Self::new(ShapeErrorKind::InvalidTopology, message)
    }

    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(ShapeErrorKind::InvalidParameter, message)
    }

    pub(crate) fn undeterminable(message: impl Into<String>) -> Self {
        Self::new(ShapeErrorKind::DimensionUndeterminable, message)
    }

    /// Attach the name of the node this error relates to.
    ///
    /// If the error already names a node, that name is kept.
    pub fn with_node(mut self, name: &str) -> Self {
        if self.node.is_none() {
            self.node = Some(name.to_string());
        }
        self
    }

    /// Return the category of error.
    pub fn kind(&self) -> ShapeErrorKind {
        self.kind
    }

    /// Return the explanation of what went wrong.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The name of the graph node that this error relates to, if known.
    pub fn node(&self) -> Option<&str> {
        self.node.as_deref()
    }
}

impl Display for ShapeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if let Some(node) = self.node.as_deref() {
            write!(f, "in node \"{}\": ", node)?;
        }
        write!(f, "{}: {}", self.kind.description(), self.message)
    }
}

impl Error for ShapeError {}

#[cfg(test)]
mod tests {
    use super::{ShapeError, ShapeErrorKind};

    #[test]
    fn test_display() {
        let err = ShapeError::new(ShapeErrorKind::NotSupported, "no rule for Slice");
        assert_eq!(err.to_string(), "not supported: no rule for Slice");

        let err = err.with_node("slice1").with_node("other");
        assert_eq!(err.node(), Some("slice1"));
        assert_eq!(
            err.to_string(),
            "in node \"slice1\": not supported: no rule for Slice"
        );
    }

    #[test]
    fn test_is_fatal() {
        assert!(ShapeErrorKind::InvalidTopology.is_fatal());
        assert!(!ShapeErrorKind::NotSupported.is_fatal());
        assert!(!ShapeErrorKind::DimensionUndeterminable.is_fatal());
    }
}
