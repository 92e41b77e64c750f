//! Shape functions for Caffe layer types.
//!
//! Each function computes the output shape of one family of layers from the
//! node's parameters and the shapes of its inputs. See
//! [`ShapeFn`](crate::ShapeFn) for the catalogue used for dispatch.

use crate::error::ShapeError;
use crate::layer::LayerParams;
use crate::node::ShapeNode;
use crate::shape::Shape;

mod conv_pool;
mod layout;

pub use conv_pool::{convolution, deconvolution, pooling};
pub use layout::{concat, flatten, reshape};

/// Build a shape from a declared list of dims, padding it with trailing 1s
/// to 4 dims.
///
/// Returns `None` if `dims` is empty.
fn shape_from_dims(dims: &[usize]) -> Result<Option<Shape>, ShapeError> {
    if dims.is_empty() {
        return Ok(None);
    }
    if dims.len() > Shape::NDIM {
        return Err(ShapeError::invalid_parameter(format!(
            "declared shape has {} dims, at most {} are supported",
            dims.len(),
            Shape::NDIM
        )));
    }
    let mut padded = [1; Shape::NDIM];
    padded[..dims.len()].copy_from_slice(dims);
    Ok(Some(padded.into()))
}

/// Graph inputs and data layers.
///
/// The shape is taken from the shape declared on the node if there is one,
/// or else from the first shape in the layer's input parameters. Layers which
/// read their dimensions from a dataset (eg. LMDB-backed `Data` layers)
/// have neither, and their shape cannot be determined.
pub fn data<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    if let Some(shape) = node.declared_shape().map(shape_from_dims).transpose()?.flatten() {
        return Ok(shape);
    }

    if let Some(layer) = node.layer()
        && let LayerParams::Input(params) = &layer.params
        && let Some(dims) = params.shapes.first()
        && let Some(shape) = shape_from_dims(dims)?
    {
        return Ok(shape);
    }

    Err(ShapeError::undeterminable(
        "cannot determine dimensions of data layer. The dimensions of data \
         layers are defined by their data source. Replace the layer with an \
         `Input` layer or declare the input shape explicitly.",
    ))
}

/// Layers which re-declare a fixed 4D shape, given as the target dims of a
/// reshape.
pub fn fixed_shape<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let LayerParams::Reshape(params) = &layer.params else {
        return Err(layer.params.mismatch("reshape"));
    };
    let &[batch, channels, height, width] = params.dims.as_slice() else {
        return Err(ShapeError::invalid_parameter(format!(
            "expected 4 target dims but found {}",
            params.dims.len()
        )));
    };

    let dims = [batch, channels, height, width].map(usize::try_from);
    match dims {
        [Ok(batch), Ok(channels), Ok(height), Ok(width)] => {
            Ok(Shape::new(batch, channels, height, width))
        }
        _ => Err(ShapeError::invalid_parameter(
            "fixed shape dims must be non-negative",
        )),
    }
}

/// `MemoryData` layers, which specify each dimension as a parameter.
pub fn memory_data<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    match &layer.params {
        LayerParams::MemoryData(params) => Ok(Shape::new(
            params.batch_size,
            params.channels,
            params.height,
            params.width,
        )),
        other => Err(other.mismatch("memory data")),
    }
}

/// Fully connected (`InnerProduct`) layer.
pub fn inner_product<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let input = node.only_parent_shape()?;
    let num_output = layer
        .params
        .num_output()
        .ok_or_else(|| ShapeError::invalid_parameter("inner product has no output count"))?;
    Ok(Shape::new(input.batch, num_output, 1, 1))
}

#[cfg(test)]
mod tests {
    use caffe_shapes_testing::TestCases;
    use smallvec::{SmallVec, smallvec};

    use super::{data, fixed_shape, inner_product, memory_data};
    use crate::error::ShapeErrorKind;
    use crate::layer::{
        InnerProductParams, InputParams, LayerParams, MemoryDataParams, NodeKind, ReshapeParams,
    };
    use crate::node::test_util::FakeNode;
    use crate::shape::Shape;

    #[test]
    fn test_data_declared_shape() {
        #[derive(Debug)]
        struct Case {
            declared: Vec<usize>,
            expected: Shape,
        }

        let cases = [
            Case {
                declared: [10, 3, 227, 227].into(),
                expected: Shape::new(10, 3, 227, 227),
            },
            Case {
                declared: [1, 3].into(),
                expected: Shape::new(1, 3, 1, 1),
            },
            Case {
                declared: [64].into(),
                expected: Shape::new(64, 1, 1, 1),
            },
        ];

        cases.test_each(|case| {
            let node = FakeNode {
                declared: Some(SmallVec::from_slice(&case.declared)),
                ..Default::default()
            };
            assert_eq!(data(&node), Ok(case.expected));
        });
    }

    #[test]
    fn test_data_input_params() {
        let mut node = FakeNode::new(
            NodeKind::Input,
            LayerParams::Input(InputParams {
                shapes: vec![smallvec![1, 3, 224, 224], smallvec![1, 1]],
            }),
        );
        assert_eq!(data(&node), Ok(Shape::new(1, 3, 224, 224)));

        // A declared shape takes precedence over layer parameters.
        node.declared = Some(smallvec![2, 3, 32, 32]);
        assert_eq!(data(&node), Ok(Shape::new(2, 3, 32, 32)));

        // An empty declared shape is ignored.
        node.declared = Some(smallvec![]);
        assert_eq!(data(&node), Ok(Shape::new(1, 3, 224, 224)));
    }

    #[test]
    fn test_data_undeterminable() {
        let nodes = [
            FakeNode::new(NodeKind::Data, LayerParams::None),
            FakeNode::new(NodeKind::Input, LayerParams::Input(InputParams::default())),
            FakeNode::default(),
        ];
        for node in nodes {
            let err = data(&node).err().unwrap();
            assert_eq!(err.kind(), ShapeErrorKind::DimensionUndeterminable);
        }

        let node = FakeNode {
            declared: Some(smallvec![1, 1, 1, 1, 1]),
            ..Default::default()
        };
        let err = data(&node).err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
    }

    #[test]
    fn test_fixed_shape() {
        let node = |dims: &[i64]| {
            FakeNode::new(
                NodeKind::Reshape,
                LayerParams::Reshape(ReshapeParams {
                    dims: SmallVec::from_slice(dims),
                }),
            )
        };

        assert_eq!(
            fixed_shape(&node(&[1, 2, 3, 4])),
            Ok(Shape::new(1, 2, 3, 4))
        );
        for dims in [&[1, 2, 3][..], &[1, -1, 3, 4][..]] {
            let err = fixed_shape(&node(dims)).err().unwrap();
            assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn test_memory_data() {
        let node = FakeNode::new(
            NodeKind::MemoryData,
            LayerParams::MemoryData(MemoryDataParams {
                batch_size: 64,
                channels: 1,
                height: 28,
                width: 28,
            }),
        );
        assert_eq!(memory_data(&node), Ok(Shape::new(64, 1, 28, 28)));
    }

    #[test]
    fn test_inner_product() {
        let node = FakeNode::new(
            NodeKind::InnerProduct,
            LayerParams::InnerProduct(InnerProductParams { num_output: 10 }),
        );
        assert_eq!(
            inner_product(&node.clone().with_parents(&[Shape::new(1, 512, 7, 7)])),
            Ok(Shape::new(1, 10, 1, 1))
        );

        let err = inner_product(&node).err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidTopology);

        let node = FakeNode::new(NodeKind::InnerProduct, LayerParams::None)
            .with_parents(&[Shape::new(1, 512, 7, 7)]);
        let err = inner_product(&node).err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
    }
}
