use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::ShapeError;
use crate::infer_shapes::ShapeFn;
use crate::layer::Layer;
use crate::node::ShapeNode;
use crate::options::InferOptions;
use crate::registry::ShapeRegistry;
use crate::shape::Shape;

/// ID of a node in a [`Graph`].
pub type NodeId = usize;

/// A layer or input in a [`Graph`].
#[derive(Clone, Debug)]
pub struct Node {
    name: String,
    layer: Option<Layer>,
    parents: SmallVec<[NodeId; 2]>,
    declared_shape: Option<SmallVec<[usize; 4]>>,
    output_shape: Option<Shape>,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layer(&self) -> Option<&Layer> {
        self.layer.as_ref()
    }

    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    /// Return the computed output shape, or `None` if shapes have not been
    /// computed yet.
    pub fn output_shape(&self) -> Option<Shape> {
        self.output_shape
    }
}

/// Node of a graph together with the graph, so parent shapes can be looked
/// up.
struct NodeRef<'a> {
    graph: &'a Graph,
    node: &'a Node,
}

impl ShapeNode for NodeRef<'_> {
    fn name(&self) -> &str {
        &self.node.name
    }

    fn parent_count(&self) -> usize {
        self.node.parents.len()
    }

    fn parent_shape(&self, index: usize) -> Option<Shape> {
        let id = *self.node.parents.get(index)?;
        self.graph.nodes.get(id)?.output_shape
    }

    fn layer(&self) -> Option<&Layer> {
        self.node.layer.as_ref()
    }

    fn declared_shape(&self) -> Option<&[usize]> {
        self.node.declared_shape.as_deref()
    }
}

/// A directed acyclic graph of layers.
///
/// A node's parents must be added before it, so the order in which nodes
/// were added is always a valid evaluation order.
#[derive(Clone, Debug, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    node_ids: FxHashMap<String, NodeId>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Graph {
        Graph::default()
    }

    fn push_node(&mut self, node: Node) -> Result<NodeId, ShapeError> {
        if self.node_ids.contains_key(&node.name) {
            return Err(ShapeError::invalid_topology(format!(
                "duplicate node name \"{}\"",
                node.name
            )));
        }
        if let Some(&parent) = node.parents.iter().find(|&&id| id >= self.nodes.len()) {
            return Err(ShapeError::invalid_topology(format!(
                "parent {} of node \"{}\" does not exist",
                parent, node.name
            )));
        }
        let id = self.nodes.len();
        self.node_ids.insert(node.name.clone(), id);
        self.nodes.push(node);
        Ok(id)
    }

    /// Add a graph input with declared dimensions.
    ///
    /// `dims` may have fewer than 4 entries, in which case the remaining
    /// dimensions have size 1.
    pub fn add_input(&mut self, name: &str, dims: &[usize]) -> Result<NodeId, ShapeError> {
        self.push_node(Node {
            name: name.to_string(),
            layer: None,
            parents: SmallVec::new(),
            declared_shape: Some(SmallVec::from_slice(dims)),
            output_shape: None,
        })
    }

    /// Add a layer whose inputs are the outputs of `parents`.
    ///
    /// Fails if any parent has not been added yet.
    pub fn add_layer(
        &mut self,
        name: &str,
        layer: Layer,
        parents: &[NodeId],
    ) -> Result<NodeId, ShapeError> {
        self.push_node(Node {
            name: name.to_string(),
            layer: Some(layer),
            parents: SmallVec::from_slice(parents),
            declared_shape: None,
            output_shape: None,
        })
    }

    /// Return the ID of the node with a given name.
    pub fn find_node(&self, name: &str) -> Option<NodeId> {
        self.node_ids.get(name).copied()
    }

    /// Retrieve a node by ID.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Iterate over nodes in the order they were added.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// Return the computed output shape of a node.
    pub fn output_shape(&self, id: NodeId) -> Option<Shape> {
        self.nodes.get(id)?.output_shape
    }

    /// Compute the output shape of every node whose shape is not yet known.
    ///
    /// Nodes are visited in the order they were added. Nodes with a layer use
    /// the shape function `registry` maps its type to, and nodes without one
    /// are treated as data inputs. Stops at the first node whose shape cannot
    /// be computed. Shapes computed before the failure are kept.
    pub fn compute_output_shapes(
        &mut self,
        registry: &ShapeRegistry,
        opts: &InferOptions,
    ) -> Result<(), ShapeError> {
        for id in 0..self.nodes.len() {
            let node = &self.nodes[id];
            if node.output_shape.is_some() {
                log::trace!("Skipping resolved node \"{}\"", node.name);
                continue;
            }

            let shape_fn = node
                .layer
                .as_ref()
                .map(|layer| registry.get(layer.kind))
                .unwrap_or(ShapeFn::Data);
            let shape = shape_fn.infer(&NodeRef { graph: self, node }, opts)?;

            log::debug!(
                "Resolved node \"{}\" ({:?}) to shape {}",
                node.name,
                shape_fn,
                shape
            );
            self.nodes[id].output_shape = Some(shape);
        }
        Ok(())
    }
}
