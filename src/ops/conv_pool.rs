use crate::error::ShapeError;
use crate::kernel::{
    FilterOutputShape, KernelParams, Rounding, SpatialFormula, UpsamplingOutputShape,
};
use crate::layer::LayerParams;
use crate::node::ShapeNode;
use crate::shape::Shape;

fn spatial_dim(size: i64, axis: &str) -> Result<usize, ShapeError> {
    size.try_into().map_err(|_| {
        ShapeError::invalid_parameter(format!(
            "kernel does not fit the padded input ({} size would be {})",
            axis, size
        ))
    })
}

/// Compute the output shape of a single-input operator that slides a kernel
/// over the height and width axes of its input.
///
/// The batch size is kept. The channel count comes from the layer's
/// `num_output` parameter if set, otherwise it is kept too.
fn strided_kernel_shape<N: ShapeNode + ?Sized>(
    node: &N,
    kernel: &KernelParams,
    formula: &impl SpatialFormula,
) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let input = node.only_parent_shape()?;

    let (out_h, out_w) = formula.output_size(input.height, input.width, kernel)?;
    let channels = layer.params.num_output().unwrap_or(input.channels);

    Ok(Shape::new(
        input.batch,
        channels,
        spatial_dim(out_h, "height")?,
        spatial_dim(out_w, "width")?,
    ))
}

/// Convolution layer.
///
/// Output sizes are rounded down.
pub fn convolution<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let LayerParams::Convolution(params) = &layer.params else {
        return Err(layer.params.mismatch("convolution"));
    };
    let formula = FilterOutputShape::new(Rounding::Floor).with_dilation(params.dilation()?)?;
    strided_kernel_shape(node, &params.spatial.kernel_parameters()?, &formula)
}

/// Deconvolution (transposed convolution) layer.
///
/// The dilation must be valid but does not affect the output size.
pub fn deconvolution<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let LayerParams::Convolution(params) = &layer.params else {
        return Err(layer.params.mismatch("convolution"));
    };
    params.dilation()?;
    strided_kernel_shape(node, &params.spatial.kernel_parameters()?, &UpsamplingOutputShape)
}

/// Max and average pooling layers.
///
/// Output sizes are rounded up, so that a partial window at the end of an
/// axis produces an output.
pub fn pooling<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let LayerParams::Pooling(params) = &layer.params else {
        return Err(layer.params.mismatch("pooling"));
    };

    let kernel = if params.global_pooling {
        let input = node.only_parent_shape()?;
        KernelParams {
            kernel_h: input.height,
            kernel_w: input.width,
            stride_h: 1,
            stride_w: 1,
            pad_h: 0,
            pad_w: 0,
        }
    } else {
        params.spatial.kernel_parameters()?
    };

    strided_kernel_shape(node, &kernel, &FilterOutputShape::new(Rounding::Ceil))
}
