use std::fmt;

use serde::{Deserialize, Serialize};

/// Output dimensions of a layer, in NCHW order.
///
/// Every shape has exactly four axes. Lower-rank values (eg. the output of a
/// fully connected layer) use a size of 1 for the trailing axes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub batch: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    /// Number of axes in every shape.
    pub const NDIM: usize = 4;

    pub const fn new(batch: usize, channels: usize, height: usize, width: usize) -> Shape {
        Shape {
            batch,
            channels,
            height,
            width,
        }
    }

    /// Return the sizes of all axes as an array.
    pub const fn to_array(self) -> [usize; 4] {
        [self.batch, self.channels, self.height, self.width]
    }

    /// Return the size of the axis at `index`, or `None` if `index >= 4`.
    pub fn dim(&self, index: usize) -> Option<usize> {
        self.to_array().get(index).copied()
    }

    /// Return the number of elements in a single item of the batch, or `None`
    /// if it overflows `usize`.
    pub fn item_len(&self) -> Option<usize> {
        self.channels
            .checked_mul(self.height)?
            .checked_mul(self.width)
    }
}

impl From<[usize; 4]> for Shape {
    fn from([batch, channels, height, width]: [usize; 4]) -> Shape {
        Shape::new(batch, channels, height, width)
    }
}

impl From<Shape> for [usize; 4] {
    fn from(shape: Shape) -> [usize; 4] {
        shape.to_array()
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.batch, self.channels, self.height, self.width
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Shape;

    #[test]
    fn test_shape_array_conversion() {
        let shape = Shape::from([2, 3, 4, 5]);
        assert_eq!(shape, Shape::new(2, 3, 4, 5));
        assert_eq!(<[usize; 4]>::from(shape), [2, 3, 4, 5]);
        assert_eq!(shape.dim(1), Some(3));
        assert_eq!(shape.dim(4), None);
        assert_eq!(shape.item_len(), Some(60));
    }

    #[test]
    fn test_item_len_overflow() {
        let shape = Shape::new(1, usize::MAX, 2, 1);
        assert_eq!(shape.item_len(), None);
    }

    #[test]
    fn test_shape_display() {
        assert_eq!(Shape::new(1, 3, 224, 224).to_string(), "(1, 3, 224, 224)");
    }

    #[test]
    fn test_shape_serialize() {
        let json = serde_json::to_string(&Shape::new(1, 10, 1, 1)).unwrap();
        assert_eq!(json, r#"{"batch":1,"channels":10,"height":1,"width":1}"#);
    }
}
