//! Static shape inference for Caffe layer graphs.
//!
//! Converting a Caffe model to another framework requires the output shape
//! of every layer, for example to size weight buffers or to choose between
//! equivalent operators in the target framework. Caffe itself only learns
//! these shapes by instantiating the network. This crate derives them
//! statically from the layer parameters and the declared input shapes.
//!
//! # Crate overview
//!
//! Every value has a fixed-rank [`Shape`] in NCHW order. Shapes are computed
//! per node by a shape function selected from the [`ShapeFn`] catalogue.
//! Many layer types share a shape function, eg. all activations use
//! [`ShapeFn::Identity`]. [`ShapeRegistry`] maps each [`NodeKind`] to its
//! function.
//!
//! Shape functions read from a node through the [`ShapeNode`] trait, so they
//! can be used with any graph representation whose nodes are visited with
//! parents before children. [`Graph`] is a simple implementation which does
//! this:
//!
//! ```
//! use caffe_shapes::{
//!     Graph, InferOptions, InnerProductParams, Layer, LayerParams, NodeKind, Shape,
//!     ShapeRegistry,
//! };
//!
//! let mut graph = Graph::new();
//! let data = graph.add_input("data", &[1, 512, 7, 7])?;
//! let fc = graph.add_layer(
//!     "fc",
//!     Layer::new(
//!         NodeKind::InnerProduct,
//!         LayerParams::InnerProduct(InnerProductParams { num_output: 10 }),
//!     ),
//!     &[data],
//! )?;
//!
//! graph.compute_output_shapes(&ShapeRegistry::with_default_fns(), &InferOptions::default())?;
//! assert_eq!(graph.output_shape(fc), Some(Shape::new(1, 10, 1, 1)));
//! # Ok::<_, caffe_shapes::ShapeError>(())
//! ```
//!
//! # Errors
//!
//! Shape functions fail with a [`ShapeError`]. Errors of kind
//! [`ShapeErrorKind::InvalidTopology`] mean the graph was malformed, eg. a
//! node was visited before its parents. Other kinds describe models whose
//! shapes cannot be inferred, such as layers that read their dimensions from
//! a dataset at runtime.

mod error;
mod graph;
mod infer_shapes;
mod kernel;
mod layer;
mod node;
pub mod ops;
mod options;
mod registry;
mod shape;

pub use error::{ShapeError, ShapeErrorKind};
pub use graph::{Graph, Node, NodeId};
pub use infer_shapes::{ShapeFn, identity, not_implemented, scalar};
pub use kernel::{
    FilterOutputShape, KernelParams, Rounding, SpatialFormula, UpsamplingOutputShape,
    kernel_value,
};
pub use layer::{
    ConcatParams, ConvolutionParams, InnerProductParams, InputParams, Layer, LayerParams,
    MemoryDataParams, NodeKind, PoolingParams, ReshapeParams, SpatialParams,
};
pub use node::ShapeNode;
pub use options::{ConcatCheck, InferOptions, OPTIONS_ENV_VAR, ReshapeDivision};
pub use registry::ShapeRegistry;
pub use shape::Shape;
