use crate::error::ShapeError;
use crate::layer::Layer;
use crate::shape::Shape;

/// View of a graph node used by shape functions.
///
/// This is implemented by the owner of the graph. Shape functions only read
/// from the node; storing the computed shape is the caller's job.
pub trait ShapeNode {
    /// Name of the node, used in error messages.
    fn name(&self) -> &str;

    /// Number of nodes which feed into this one.
    fn parent_count(&self) -> usize;

    /// Return the output shape of the parent at `index`.
    ///
    /// Returns `None` if the index is out of range or the parent's shape has
    /// not been computed yet.
    fn parent_shape(&self, index: usize) -> Option<Shape>;

    /// Return the operation performed by this node, or `None` for
    /// placeholder nodes.
    fn layer(&self) -> Option<&Layer>;

    /// Shape declared on the node itself, for graph inputs which specify
    /// their dimensions separately from any layer (eg. Caffe's legacy
    /// `input_dim` fields). This may have fewer than 4 dims.
    fn declared_shape(&self) -> Option<&[usize]> {
        None
    }

    /// Return the shape of the parent at `index`, failing if it is unresolved.
    fn resolved_parent_shape(&self, index: usize) -> Result<Shape, ShapeError> {
        self.parent_shape(index).ok_or_else(|| {
            ShapeError::invalid_topology(format!(
                "output shape of input {} is not available yet",
                index
            ))
        })
    }

    /// Return the shape of the node's only parent.
    fn only_parent_shape(&self) -> Result<Shape, ShapeError> {
        match self.parent_count() {
            1 => self.resolved_parent_shape(0),
            n => Err(ShapeError::invalid_topology(format!(
                "expected exactly one input but found {}",
                n
            ))),
        }
    }

    /// Return the shape of the node's first parent.
    fn first_parent_shape(&self) -> Result<Shape, ShapeError> {
        if self.parent_count() == 0 {
            return Err(ShapeError::invalid_topology(
                "expected at least one input but found none",
            ));
        }
        self.resolved_parent_shape(0)
    }

    /// Return the node's layer, failing if this is a placeholder node.
    fn require_layer(&self) -> Result<&Layer, ShapeError> {
        self.layer()
            .ok_or_else(|| ShapeError::invalid_topology("node has no layer"))
    }
}


#[cfg(test)]
mod tests {
    use super::ShapeNode;
    use super::test_util::FakeNode;
    use crate::error::ShapeErrorKind;
    use crate::layer::{LayerParams, NodeKind};
    use crate::shape::Shape;

    #[test]
    fn test_only_parent_shape() {
        let a = Shape::new(1, 3, 8, 8);
        let b = Shape::new(1, 5, 8, 8);
        let node = FakeNode::new(NodeKind::ReLU, LayerParams::None);

        assert_eq!(
            node.clone().with_parents(&[a]).only_parent_shape(),
            Ok(a)
        );
        for parents in [&[][..], &[a, b][..]] {
            let err = node
                .clone()
                .with_parents(parents)
                .only_parent_shape()
                .err()
                .unwrap();
            assert_eq!(err.kind(), ShapeErrorKind::InvalidTopology);
        }
    }

    #[test]
    fn test_unresolved_parent() {
        let mut node = FakeNode::new(NodeKind::ReLU, LayerParams::None);
        node.parents = vec![None];
        let err = node.first_parent_shape().err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidTopology);
    }

    #[test]
    fn test_require_layer() {
        let node = FakeNode::default();
        let err = node.require_layer().err().unwrap();
        assert_eq!(err.kind(), ShapeErrorKind::InvalidTopology);
    }
}
