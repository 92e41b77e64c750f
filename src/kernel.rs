//! Spatial output size formulas for strided kernel operators.

use crate::error::ShapeError;

/// Kernel size, stride and padding along the height and width axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelParams {
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub stride_h: usize,
    pub stride_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
}

/// Computes the output height and width of a strided kernel operator from
/// the input height and width.
///
/// Sizes are signed so that callers can detect kernels that do not fit the
/// padded input. Fails if the size cannot be represented as an `i64`.
pub trait SpatialFormula {
    fn output_size(
        &self,
        in_h: usize,
        in_w: usize,
        kernel: &KernelParams,
    ) -> Result<(i64, i64), ShapeError>;
}

/// Rounding applied to the quotient of a reducing kernel formula.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// Round towards negative infinity, as used by convolution.
    Floor,
    /// Round towards positive infinity, as used by pooling.
    Ceil,
}

impl Rounding {
    fn apply(self, x: f64) -> f64 {
        match self {
            Rounding::Floor => x.floor(),
            Rounding::Ceil => x.ceil(),
        }
    }
}

/// Output size of an operator which slides a kernel over its input
/// (convolution, pooling).
///
/// For each spatial axis:
///
/// ```text
/// out = round((in + 2 * (pad / dilation) - kernel) / stride + 1)
/// ```
///
/// `pad / dilation` uses real division, so a dilation that does not divide
/// the padding yields a fractional effective pad. Only the final quotient is
/// rounded.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterOutputShape {
    rounding: Rounding,
    dilation: usize,
}

impl FilterOutputShape {
    /// Create a formula with the given rounding mode and a dilation of 1.
    pub fn new(rounding: Rounding) -> Self {
        FilterOutputShape {
            rounding,
            dilation: 1,
        }
    }

    /// Set the dilation factor.
    ///
    /// Fails with [`InvalidParameter`](crate::ShapeErrorKind::InvalidParameter)
    /// if `dilation` is zero.
    pub fn with_dilation(self, dilation: usize) -> Result<Self, ShapeError> {
        if dilation == 0 {
            return Err(ShapeError::invalid_parameter("dilation must be non-zero"));
        }
        Ok(FilterOutputShape { dilation, ..self })
    }

    pub fn rounding(&self) -> Rounding {
        self.rounding
    }

    pub fn dilation(&self) -> usize {
        self.dilation
    }

    fn axis_size(&self, in_size: usize, kernel: usize, stride: usize, pad: usize) -> i64 {
        let effective_pad = pad as f64 / self.dilation as f64;
        let size = (in_size as f64 + 2. * effective_pad - kernel as f64) / stride as f64 + 1.;
        self.rounding.apply(size) as i64
    }
}

impl SpatialFormula for FilterOutputShape {
    fn output_size(
        &self,
        in_h: usize,
        in_w: usize,
        k: &KernelParams,
    ) -> Result<(i64, i64), ShapeError> {
        Ok((
            self.axis_size(in_h, k.kernel_h, k.stride_h, k.pad_h),
            self.axis_size(in_w, k.kernel_w, k.stride_w, k.pad_w),
        ))
    }
}

/// Output size of a transposed convolution, which expands its input.
///
/// For each spatial axis, `out = (in - 1) * stride - 2 * pad + kernel`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct UpsamplingOutputShape;

impl UpsamplingOutputShape {
    fn checked_axis_size(
        in_size: usize,
        kernel: usize,
        stride: usize,
        pad: usize,
    ) -> Option<i64> {
        let [in_size, kernel, stride, pad] =
            [in_size, kernel, stride, pad].map(|x| i64::try_from(x).ok());
        (in_size? - 1)
            .checked_mul(stride?)?
            .checked_sub(pad?.checked_mul(2)?)?
            .checked_add(kernel?)
    }

    fn axis_size(
        axis: &str,
        in_size: usize,
        kernel: usize,
        stride: usize,
        pad: usize,
    ) -> Result<i64, ShapeError> {
        Self::checked_axis_size(in_size, kernel, stride, pad).ok_or_else(|| {
            ShapeError::invalid_parameter(format!(
                "upsampled {} size overflows (input {}, kernel {}, stride {}, pad {})",
                axis, in_size, kernel, stride, pad
            ))
        })
    }
}

impl SpatialFormula for UpsamplingOutputShape {
    fn output_size(
        &self,
        in_h: usize,
        in_w: usize,
        k: &KernelParams,
    ) -> Result<(i64, i64), ShapeError> {
        Ok((
            Self::axis_size("height", in_h, k.kernel_h, k.stride_h, k.pad_h)?,
            Self::axis_size("width", in_w, k.kernel_w, k.stride_w, k.pad_w)?,
        ))
    }
}

/// Resolve a per-axis kernel attribute from Caffe's scalar and repeated
/// forms.
///
/// The scalar form (eg. `kernel_h`) wins if set. Otherwise a repeated value
/// with one element applies to every axis, and a longer one is indexed by
/// `axis`. If neither is set, `default` is used.
pub fn kernel_value(
    name: &str,
    scalar: Option<usize>,
    repeated: &[usize],
    axis: usize,
    default: Option<usize>,
) -> Result<usize, ShapeError> {
    if let Some(value) = scalar {
        return Ok(value);
    }
    match repeated {
        [] => default.ok_or_else(|| {
            ShapeError::invalid_parameter(format!("unable to determine kernel parameter {}", name))
        }),
        [value] => Ok(*value),
        values => values.get(axis).copied().ok_or_else(|| {
            ShapeError::invalid_parameter(format!(
                "{} has {} values but axis {} was requested",
                name,
                values.len(),
                axis
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use caffe_shapes_testing::TestCases;

    use super::{
        FilterOutputShape, KernelParams, Rounding, SpatialFormula, UpsamplingOutputShape,
        kernel_value,
    };
    use crate::error::ShapeErrorKind;

    fn square_kernel(kernel: usize, stride: usize, pad: usize) -> KernelParams {
        KernelParams {
            kernel_h: kernel,
            kernel_w: kernel,
            stride_h: stride,
            stride_w: stride,
            pad_h: pad,
            pad_w: pad,
        }
    }

    #[test]
    fn test_filter_output_shape() {
        #[derive(Debug)]
        struct Case {
            input: usize,
            kernel: KernelParams,
            rounding: Rounding,
            dilation: usize,
            expected: i64,
        }

        let cases = [
            // "Same" padding for a 3x3 kernel.
            Case {
                input: 10,
                kernel: square_kernel(3, 1, 1),
                rounding: Rounding::Floor,
                dilation: 1,
                expected: 10,
            },
            // Non-divisible stride rounds down for convolution...
            Case {
                input: 7,
                kernel: square_kernel(2, 2, 0),
                rounding: Rounding::Floor,
                dilation: 1,
                expected: 3,
            },
            // ... and up for pooling.
            Case {
                input: 7,
                kernel: square_kernel(2, 2, 0),
                rounding: Rounding::Ceil,
                dilation: 1,
                expected: 4,
            },
            // AlexNet conv1.
            Case {
                input: 227,
                kernel: square_kernel(11, 4, 0),
                rounding: Rounding::Floor,
                dilation: 1,
                expected: 55,
            },
            // Dilation divides the padding: (10 + 2 * 2 - 3) / 1 + 1
            Case {
                input: 10,
                kernel: square_kernel(3, 1, 4),
                rounding: Rounding::Floor,
                dilation: 2,
                expected: 12,
            },
            // Fractional effective pad: (10 + 2 * 0.5 - 3) / 2 + 1 = 5
            Case {
                input: 10,
                kernel: square_kernel(3, 2, 1),
                rounding: Rounding::Floor,
                dilation: 2,
                expected: 5,
            },
            // Kernel larger than the padded input.
            Case {
                input: 2,
                kernel: square_kernel(5, 1, 0),
                rounding: Rounding::Floor,
                dilation: 1,
                expected: -2,
            },
        ];

        cases.test_each(|case| {
            let formula = FilterOutputShape::new(case.rounding)
                .with_dilation(case.dilation)
                .unwrap();
            let (h, w) = formula
                .output_size(case.input, case.input, &case.kernel)
                .unwrap();
            assert_eq!(h, case.expected);
            assert_eq!(w, case.expected);
        });
    }

    #[test]
    fn test_filter_output_shape_zero_dilation() {
        let err = FilterOutputShape::new(Rounding::Floor)
            .with_dilation(0)
            .err()
            .unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
    }

    #[test]
    fn test_filter_output_shape_axes_are_independent() {
        let kernel = KernelParams {
            kernel_h: 3,
            kernel_w: 1,
            stride_h: 2,
            stride_w: 1,
            pad_h: 1,
            pad_w: 0,
        };
        let formula = FilterOutputShape::new(Rounding::Floor);
        assert_eq!(formula.output_size(32, 20, &kernel), Ok((16, 20)));
    }

    #[test]
    fn test_upsampling_output_shape() {
        let formula = UpsamplingOutputShape;
        assert_eq!(formula.output_size(4, 4, &square_kernel(2, 2, 0)), Ok((8, 8)));
        assert_eq!(formula.output_size(16, 8, &square_kernel(4, 2, 1)), Ok((32, 16)));

        // Kernel larger than the upsampled input.
        assert_eq!(formula.output_size(1, 1, &square_kernel(1, 1, 1)), Ok((-1, -1)));
    }

    #[test]
    fn test_upsampling_output_shape_overflow() {
        let formula = UpsamplingOutputShape;
        for kernel in [
            square_kernel(2, usize::MAX, 0),
            square_kernel(2, 1 << 40, 0),
            square_kernel(usize::MAX, 1, 0),
        ] {
            let err = formula.output_size(1 << 30, 4, &kernel).err().unwrap();
            assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
        }
    }

    #[test]
    fn test_kernel_value() {
        assert_eq!(kernel_value("kernel", Some(5), &[3], 0, None), Ok(5));
        assert_eq!(kernel_value("kernel", None, &[3], 1, None), Ok(3));
        assert_eq!(kernel_value("kernel", None, &[3, 7], 1, None), Ok(7));
        assert_eq!(kernel_value("stride", None, &[], 0, Some(1)), Ok(1));

        let err = kernel_value("kernel", None, &[], 0, None).err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);

        let err = kernel_value("pad", None, &[1, 2], 2, None).err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidParameter);
    }
}
