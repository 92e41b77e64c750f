use smallvec::SmallVec;

use crate::error::{ShapeError, ShapeErrorKind};
use crate::layer::LayerParams;
use crate::node::ShapeNode;
use crate::options::{ConcatCheck, InferOptions, ReshapeDivision};
use crate::shape::Shape;

/// Resolve an axis given as a value in `[-4, 3]` to an index in `[0, 4)`.
///
/// Negative axis values count backwards from the last dimension.
fn resolve_axis(axis: i32) -> Result<usize, ShapeError> {
    let ndim = Shape::NDIM as i32;
    if axis < -ndim || axis >= ndim {
        return Err(ShapeError::invalid_parameter(format!(
            "axis {} is out of range for a {}D shape",
            axis, ndim
        )));
    }
    let axis = if axis >= 0 { axis } else { ndim + axis };
    Ok(axis as usize)
}

/// Concat layer.
///
/// The output is the first input's shape with the concatenation axis
/// replaced by the sum of all inputs' sizes along that axis.
pub fn concat<N: ShapeNode + ?Sized>(
    node: &N,
    opts: &InferOptions,
) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let axis = match &layer.params {
        LayerParams::Concat(params) => params.axis,
        other => return Err(other.mismatch("concat")),
    };
    let axis = resolve_axis(axis)?;

    let mut out_shape = node.first_parent_shape()?.to_array();

    for i in 1..node.parent_count() {
        let input = node.resolved_parent_shape(i)?.to_array();

        if opts.concat_check == ConcatCheck::Strict
            && (0..Shape::NDIM).any(|dim| dim != axis && input[dim] != out_shape[dim])
        {
            return Err(ShapeError::new(
                ShapeErrorKind::IncompatibleShapes,
                format!(
                    "cannot concatenate {} with {} along axis {}",
                    Shape::from(input),
                    Shape::from(out_shape),
                    axis
                ),
            ));
        }

        out_shape[axis] = out_shape[axis].checked_add(input[axis]).ok_or_else(|| {
            ShapeError::invalid_parameter(format!("concatenated size overflows on axis {}", axis))
        })?;
    }

    Ok(out_shape.into())
}

/// Return the number of elements in one item of `shape`.
fn item_len(shape: Shape) -> Result<usize, ShapeError> {
    shape.item_len().ok_or_else(|| {
        ShapeError::invalid_parameter(format!("element count of {} overflows", shape))
    })
}

/// Reshape layer.
///
/// Each target dim after the first is either copied from the input (`0`),
/// inferred (`-1`) or given literally. Inferred dims take the input's
/// per-item size divided by the product of the copied and literal dims.
/// Axes past the end of the target list have size 1.
///
/// The batch size is always taken from the input. The first target dim is
/// validated like the others but its value is otherwise unused.
pub fn reshape<N: ShapeNode + ?Sized>(
    node: &N,
    opts: &InferOptions,
) -> Result<Shape, ShapeError> {
    let layer = node.require_layer()?;
    let LayerParams::Reshape(params) = &layer.params else {
        return Err(layer.params.mismatch("reshape"));
    };
    let input = node.only_parent_shape()?;

    if params.dims.len() > Shape::NDIM {
        return Err(ShapeError::invalid_parameter(format!(
            "reshape target has {} dims, at most {} are supported",
            params.dims.len(),
            Shape::NDIM
        )));
    }

    if let Some(&dim) = params.dims.iter().find(|&&dim| dim < -1) {
        return Err(ShapeError::invalid_parameter(format!(
            "invalid reshape target dim {}",
            dim
        )));
    }

    let in_dims = input.to_array();
    let mut out_dims = [input.batch, 1, 1, 1];
    let mut inferred = SmallVec::<[usize; 3]>::new();
    let mut known_size: usize = 1;

    for (j, &dim) in params.dims.iter().enumerate().skip(1) {
        out_dims[j] = match dim {
            -1 => {
                inferred.push(j);
                continue;
            }
            0 => in_dims[j],
            size => usize::try_from(size).map_err(|_| {
                ShapeError::invalid_parameter(format!("reshape target dim {} is too large", size))
            })?,
        };
        known_size = known_size.checked_mul(out_dims[j]).ok_or_else(|| {
            ShapeError::invalid_parameter(format!(
                "product of reshape target dims {:?} overflows",
                params.dims
            ))
        })?;
    }

    if !inferred.is_empty() {
        let total = item_len(input)?;
        if known_size == 0 {
            return Err(ShapeError::undeterminable(
                "cannot infer reshape dim because the other target dims have size zero",
            ));
        }
        if opts.reshape_division == ReshapeDivision::Exact && total % known_size != 0 {
            return Err(ShapeError::undeterminable(format!(
                "cannot infer reshape dim because input size {} is not divisible by {}",
                total, known_size
            )));
        }
        for j in inferred {
            out_dims[j] = total / known_size;
        }
    }

    Ok(out_dims.into())
}

/// Flatten layer.
///
/// Collapses the channel, height and width axes into the channel axis.
pub fn flatten<N: ShapeNode + ?Sized>(node: &N) -> Result<Shape, ShapeError> {
    let input = node.only_parent_shape()?;
    Ok(Shape::new(input.batch, item_len(input)?, 1, 1))
}
