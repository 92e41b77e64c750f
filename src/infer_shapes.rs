//! Shape function catalogue and the shape functions which don't depend on
//! layer parameters.

use crate::error::{ShapeError, ShapeErrorKind};
use crate::node::ShapeNode;
use crate::ops;
use crate::options::InferOptions;
use crate::shape::Shape;

/// Layers whose output has the same shape as their first input, such as
/// activations and normalization.
pub fn identity<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    node.first_parent_shape()
}

/// Layers which produce a single value, such as losses and accuracy.
pub fn scalar<N: ShapeNode + ?Sized>(_node: &N) -> Result<Shape, ShapeError> {
    Ok(Shape::new(1, 1, 1, 1))
}

/// Fallback for layers with no shape inference rule. This always fails.
pub fn not_implemented<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer_type = node.layer().map(|l| l.kind.as_str()).unwrap_or("unknown");
    Err(ShapeError::new(
        ShapeErrorKind::NotSupported,
        format!("shape inference is not supported for {} layers", layer_type),
    ))
}

/// Catalogue of shape functions.
///
/// Many layer types share a shape function, so there is an M:1 mapping
/// between [`NodeKind`](crate::NodeKind)s and `ShapeFn`s. See
/// [`ShapeRegistry`](crate::ShapeRegistry) for the mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShapeFn {
    Convolution,
    Deconvolution,
    Pooling,
    InnerProduct,
    Identity,
    Scalar,
    Data,
    FixedShape,
    MemoryData,
    Concat,
    Reshape,
    Flatten,
    NotImplemented,
}

impl ShapeFn {
    /// Compute the output shape of `node`.
    ///
    /// Errors are annotated with the node's name.
    pub fn infer<N: ShapeNode + ?Sized>(
        self,
        node: &N,
        opts: &InferOptions,
    ) -> Result<Shape, ShapeError> {
        let shape = match self {
            ShapeFn::Convolution => ops::convolution(node),
            ShapeFn::Deconvolution => ops::deconvolution(node),
            ShapeFn::Pooling => ops::pooling(node),
            ShapeFn::InnerProduct => ops::inner_product(node),
            ShapeFn::Identity => identity(node),
            ShapeFn::Scalar => scalar(node),
            ShapeFn::Data => ops::data(node),
            ShapeFn::FixedShape => ops::fixed_shape(node),
            ShapeFn::MemoryData => ops::memory_data(node),
            ShapeFn::Concat => ops::concat(node, opts),
            ShapeFn::Reshape => ops::reshape(node, opts),
            ShapeFn::Flatten => ops::flatten(node),
            ShapeFn::NotImplemented => not_implemented(node),
        };
        shape.map_err(|err| err.with_node(node.name()))
    }
}
