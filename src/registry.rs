use rustc_hash::FxHashMap;

use crate::infer_shapes::ShapeFn;
use crate::layer::NodeKind;

/// Maps layer types to the shape function used for them.
///
/// New registries are empty, so every layer type maps to
/// [`ShapeFn::NotImplemented`]. Use [`ShapeRegistry::with_default_fns`] for
/// a registry with the built-in mapping for Caffe layers, and
/// [`ShapeRegistry::register`] to add or override entries.
#[derive(Clone, Debug, Default)]
pub struct ShapeRegistry {
    fns: FxHashMap<NodeKind, ShapeFn>,
}

impl ShapeRegistry {
    /// Create a new empty registry.
    pub fn new() -> ShapeRegistry {
        ShapeRegistry::default()
    }

    /// Create a registry with the built-in shape function for every layer
    /// type.
    pub fn with_default_fns() -> ShapeRegistry {
        let mut reg = ShapeRegistry::new();
        for &kind in NodeKind::ALL {
            reg.register(kind, default_shape_fn(kind));
        }
        reg
    }

    /// Set the shape function for a layer type, replacing any existing entry.
    pub fn register(&mut self, kind: NodeKind, shape_fn: ShapeFn) {
        self.fns.insert(kind, shape_fn);
    }

    /// Return the shape function for a layer type.
    pub fn get(&self, kind: NodeKind) -> ShapeFn {
        self.fns
            .get(&kind)
            .copied()
            .unwrap_or(ShapeFn::NotImplemented)
    }
}

fn default_shape_fn(kind: NodeKind) -> ShapeFn {
    use NodeKind::*;

    match kind {
        Convolution => ShapeFn::Convolution,
        Deconvolution => ShapeFn::Deconvolution,
        Pooling => ShapeFn::Pooling,
        InnerProduct => ShapeFn::InnerProduct,
        Concat => ShapeFn::Concat,
        Reshape => ShapeFn::Reshape,
        Flatten => ShapeFn::Flatten,
        MemoryData => ShapeFn::MemoryData,
        Data | DummyData | HDF5Data | ImageData | Input => ShapeFn::Data,
        AbsVal | BatchNorm | Dropout | Eltwise | Exp | HDF5Output | LRN | Power | ReLU | Scale
        | Sigmoid | Softmax | TanH | Threshold => ShapeFn::Identity,
        Accuracy
        | ContrastiveLoss
        | EuclideanLoss
        | HingeLoss
        | InfogainLoss
        | MultinomialLogisticLoss
        | SigmoidCrossEntropyLoss
        | SoftmaxWithLoss => ShapeFn::Scalar,
        ArgMax | BNLL | Im2col | MVN | Silence | Split | Slice | WindowData => {
            ShapeFn::NotImplemented
        }
    }
}
