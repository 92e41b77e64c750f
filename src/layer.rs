//! Layer types and the parameters that shape inference reads from them.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::{ShapeError, ShapeErrorKind};
use crate::kernel::{KernelParams, kernel_value};

macro_rules! node_kinds {
    ($($kind:ident),* $(,)?) => {
        /// Caffe layer types.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($kind),*
        }

        impl NodeKind {
            /// All layer types, in declaration order.
            pub const ALL: &'static [NodeKind] = &[$(NodeKind::$kind),*];

            /// Return the layer type name used in Caffe model definitions.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(NodeKind::$kind => stringify!($kind)),*
                }
            }
        }
    };
}

node_kinds!(
    AbsVal,
    Accuracy,
    ArgMax,
    BatchNorm,
    BNLL,
    Concat,
    ContrastiveLoss,
    Convolution,
    Deconvolution,
    Data,
    Dropout,
    DummyData,
    EuclideanLoss,
    Eltwise,
    Exp,
    Flatten,
    HDF5Data,
    HDF5Output,
    HingeLoss,
    Im2col,
    ImageData,
    InfogainLoss,
    InnerProduct,
    Input,
    LRN,
    MemoryData,
    MultinomialLogisticLoss,
    MVN,
    Pooling,
    Power,
    ReLU,
    Reshape,
    Scale,
    Sigmoid,
    SigmoidCrossEntropyLoss,
    Silence,
    Softmax,
    SoftmaxWithLoss,
    Split,
    Slice,
    TanH,
    Threshold,
    WindowData,
);

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = ShapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ShapeError::new(
                    ShapeErrorKind::NotSupported,
                    format!("unknown layer type \"{}\"", s),
                )
            })
    }
}

/// Kernel size, stride and padding attributes of a convolution or pooling
/// layer.
///
/// Caffe allows each attribute to be given either per-axis (`kernel_h`,
/// `kernel_w`) or as a list that is shared by or indexed per spatial axis
/// (`kernel_size`). See [`kernel_value`] for how the two are combined.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpatialParams {
    pub kernel_size: SmallVec<[usize; 2]>,
    pub kernel_h: Option<usize>,
    pub kernel_w: Option<usize>,
    pub stride: SmallVec<[usize; 2]>,
    pub stride_h: Option<usize>,
    pub stride_w: Option<usize>,
    pub pad: SmallVec<[usize; 2]>,
    pub pad_h: Option<usize>,
    pub pad_w: Option<usize>,
}

impl SpatialParams {
    /// Create params with a square kernel and a uniform stride and padding.
    pub fn square(kernel: usize, stride: usize, pad: usize) -> Self {
        SpatialParams {
            kernel_size: [kernel].into_iter().collect(),
            stride: [stride].into_iter().collect(),
            pad: [pad].into_iter().collect(),
            ..Default::default()
        }
    }

    /// Resolve the kernel size, stride and padding for each spatial axis.
    pub fn kernel_parameters(&self) -> Result<KernelParams, ShapeError> {
        let kernel_h = kernel_value("kernel_h", self.kernel_h, &self.kernel_size, 0, None)?;
        let kernel_w = kernel_value("kernel_w", self.kernel_w, &self.kernel_size, 1, None)?;
        let stride_h = kernel_value("stride_h", self.stride_h, &self.stride, 0, Some(1))?;
        let stride_w = kernel_value("stride_w", self.stride_w, &self.stride, 1, Some(1))?;
        let pad_h = kernel_value("pad_h", self.pad_h, &self.pad, 0, Some(0))?;
        let pad_w = kernel_value("pad_w", self.pad_w, &self.pad, 1, Some(0))?;

        if stride_h == 0 || stride_w == 0 {
            return Err(ShapeError::invalid_parameter("stride must be non-zero"));
        }

        Ok(KernelParams {
            kernel_h,
            kernel_w,
            stride_h,
            stride_w,
            pad_h,
            pad_w,
        })
    }
}

/// Parameters of convolution and deconvolution layers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvolutionParams {
    /// Number of output channels. If unset, the input channel count is kept.
    pub num_output: Option<usize>,
    pub spatial: SpatialParams,
    pub dilation: SmallVec<[usize; 2]>,
}

impl ConvolutionParams {
    /// Return the dilation factor, which defaults to 1.
    ///
    /// Only the first value is used for both spatial axes.
    pub fn dilation(&self) -> Result<usize, ShapeError> {
        match kernel_value("dilation", None, &self.dilation, 0, Some(1))? {
            0 => Err(ShapeError::invalid_parameter("dilation must be non-zero")),
            dilation => Ok(dilation),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoolingParams {
    pub spatial: SpatialParams,

    /// Pool over the entire spatial extent of the input, ignoring the
    /// kernel, stride and padding attributes.
    pub global_pooling: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InnerProductParams {
    pub num_output: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConcatParams {
    /// Axis along which inputs are joined. Negative values count back from
    /// the last axis.
    pub axis: i32,
}

impl Default for ConcatParams {
    fn default() -> Self {
        ConcatParams { axis: 1 }
    }
}

/// Target dimensions of a reshape layer.
///
/// Each entry is `0` (copy the input size), `-1` (infer from the remaining
/// sizes) or a positive size.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReshapeParams {
    pub dims: SmallVec<[i64; 4]>,
}

/// Shapes declared by an `Input` or `DummyData` layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct InputParams {
    /// One shape per output of the layer. Only the first is used.
    pub shapes: Vec<SmallVec<[usize; 4]>>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MemoryDataParams {
    pub batch_size: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

/// Layer-specific parameters.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum LayerParams {
    #[default]
    None,
    Convolution(ConvolutionParams),
    Pooling(PoolingParams),
    InnerProduct(InnerProductParams),
    Concat(ConcatParams),
    Reshape(ReshapeParams),
    Input(InputParams),
    MemoryData(MemoryDataParams),
}

impl LayerParams {
    /// Return the explicit output channel count, if these parameters have one.
    pub fn num_output(&self) -> Option<usize> {
        match self {
            LayerParams::Convolution(params) => params.num_output,
            LayerParams::InnerProduct(params) => Some(params.num_output),
            _ => None,
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            LayerParams::None => "none",
            LayerParams::Convolution(_) => "convolution",
            LayerParams::Pooling(_) => "pooling",
            LayerParams::InnerProduct(_) => "inner product",
            LayerParams::Concat(_) => "concat",
            LayerParams::Reshape(_) => "reshape",
            LayerParams::Input(_) => "input",
            LayerParams::MemoryData(_) => "memory data",
        }
    }

    pub(crate) fn mismatch(&self, expected: &str) -> ShapeError {
        ShapeError::invalid_parameter(format!(
            "expected {} parameters but found {}",
            expected,
            self.variant_name()
        ))
    }
}

/// The operation performed by a graph node.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    pub kind: NodeKind,
    pub params: LayerParams,
}

impl Layer {
    pub fn new(kind: NodeKind, params: LayerParams) -> Layer {
        Layer { kind, params }
    }

    /// Create a layer which has no parameters.
    pub fn plain(kind: NodeKind) -> Layer {
        Layer::new(kind, LayerParams::None)
    }

    /// Return the kernel parameters of a convolution or pooling layer.
    pub fn kernel_parameters(&self) -> Result<KernelParams, ShapeError> {
        match &self.params {
            LayerParams::Convolution(params) => params.spatial.kernel_parameters(),
            LayerParams::Pooling(params) => params.spatial.kernel_parameters(),
            other => Err(other.mismatch("convolution or pooling")),
        }
    }
}
